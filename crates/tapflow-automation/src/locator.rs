//! 요소 탐색기.
//!
//! 자동화 요청의 대상을 구체적인 노드 또는 화면 좌표로 해석한다.
//! 모든 "미발견"은 None으로 반환하며 에러를 던지지 않는다.
//! 치명적인지 여부는 오케스트레이터가 결정한다.

use tracing::debug;

use tapflow_core::models::geometry::Point;
use tapflow_core::models::node::{contains_ignore_case, NodeInfo};
use tapflow_core::ports::accessibility::NodeHandle;

use crate::tree::{FoundNode, TreeAccessor};

/// 앵커를 찾은 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorStrategy {
    /// 플랫폼 텍스트 인덱스
    ExactText,
    /// 콘텐츠 설명 일치 (대소문자 무시)
    ExactDescription,
    /// 텍스트/설명 부분 일치 재귀 탐색
    Fuzzy,
}

/// 요소 탐색기
#[derive(Clone)]
pub struct ElementLocator {
    tree: TreeAccessor,
}

impl ElementLocator {
    pub fn new(tree: TreeAccessor) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &TreeAccessor {
        &self.tree
    }

    /// 플랫폼 텍스트 인덱스 조회
    ///
    /// 인덱스 결과 중 텍스트가 정확히 같은 노드를 우선하고,
    /// 없으면 순회 순서상 첫 유효 노드를 반환한다.
    pub fn find_by_exact_text(&self, root: &NodeHandle, text: &str) -> Option<FoundNode> {
        if text.is_empty() {
            return None;
        }
        let candidates: Vec<FoundNode> = root
            .find_by_text(text)
            .into_iter()
            .filter_map(FoundNode::read)
            .collect();

        let position = candidates
            .iter()
            .position(|c| c.info.text_or_empty().eq_ignore_ascii_case(text))
            .unwrap_or(0);
        candidates.into_iter().nth(position)
    }

    /// 텍스트 또는 콘텐츠 설명 부분 일치 (대소문자 무시), 전위 순회 첫 노드
    pub fn find_by_fuzzy_match(&self, root: &NodeHandle, text: &str) -> Option<FoundNode> {
        if text.is_empty() {
            return None;
        }
        self.tree
            .depth_first_search(root, |info| info.contains_ignore_case(text))
    }

    /// 텍스트 모드 대상: 정확 → 퍼지
    pub fn find_text_target(&self, root: &NodeHandle, text: &str) -> Option<FoundNode> {
        self.find_by_exact_text(root, text)
            .or_else(|| self.find_by_fuzzy_match(root, text))
    }

    /// 앵커 탐색
    ///
    /// 텍스트 인덱스 → 콘텐츠 설명 일치 → 퍼지 순서로 시도하고,
    /// 먼저 성공한 전략의 결과를 쓴다. 빈 텍스트/설명은 해당 전략을 건너뛴다.
    pub fn find_anchor(
        &self,
        root: &NodeHandle,
        anchor_text: &str,
        anchor_description: &str,
    ) -> Option<(FoundNode, AnchorStrategy)> {
        if let Some(node) = self.find_by_exact_text(root, anchor_text) {
            debug!(anchor_text, "앵커 발견 (텍스트)");
            return Some((node, AnchorStrategy::ExactText));
        }

        if !anchor_description.is_empty() {
            let found = self.tree.depth_first_search(root, |info| {
                info.description_or_empty()
                    .to_lowercase()
                    .eq(&anchor_description.to_lowercase())
            });
            if let Some(node) = found {
                debug!(anchor_description, "앵커 발견 (콘텐츠 설명)");
                return Some((node, AnchorStrategy::ExactDescription));
            }
        }

        let fuzzy = self.tree.depth_first_search(root, |info| {
            (!anchor_text.is_empty() && info.contains_ignore_case(anchor_text))
                || (!anchor_description.is_empty()
                    && contains_ignore_case(info.description_or_empty(), anchor_description))
        });
        fuzzy.map(|node| {
            debug!(anchor_text, anchor_description, "앵커 발견 (부분 일치)");
            (node, AnchorStrategy::Fuzzy)
        })
    }

    /// 앵커 중심 + 오프셋 (화면 범위는 검증하지 않음)
    pub fn resolve_anchor_offset(anchor: &NodeInfo, offset_x: i32, offset_y: i32) -> Point {
        anchor.center().offset(offset_x, offset_y)
    }

    /// 첫 스크롤 가능 노드 (전위 순회)
    pub fn find_scrollable(&self, root: &NodeHandle) -> Option<FoundNode> {
        self.tree.depth_first_search(root, |info| info.scrollable)
    }

    /// 텍스트 모드 탭 좌표
    ///
    /// 노드가 클릭 가능하면 그 중심, 아니면 첫 클릭 가능 조상의 중심,
    /// 둘 다 없으면 노드 자신의 중심.
    pub fn clickable_target_point(&self, node: &FoundNode) -> Point {
        if node.info.clickable {
            return node.info.center();
        }

        let max_depth = self.tree.limits().max_depth;
        let mut current = node.handle.parent();
        let mut steps = 0;
        while let Some(parent) = current {
            if steps >= max_depth {
                break;
            }
            let Some(info) = parent.info() else {
                break;
            };
            if info.clickable {
                debug!(x = info.center().x, y = info.center().y, "클릭 가능한 조상 사용");
                return info.center();
            }
            current = parent.parent();
            steps += 1;
        }

        node.info.center()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::{NodeFixture, SimulatedDevice};
    use crate::tree::TraversalLimits;

    fn locator_for(root: NodeFixture) -> (ElementLocator, NodeHandle) {
        let device = SimulatedDevice::new();
        device.show("com.example", root);
        let tree = TreeAccessor::new(Arc::new(device), TraversalLimits::default());
        let root = tree.root().unwrap().handle;
        (ElementLocator::new(tree), root)
    }

    #[test]
    fn exact_text_preferred_over_fuzzy_only_match() {
        // 설명에만 "Submit"이 들어간 노드가 순회상 먼저 나온다
        let root = NodeFixture::new().with_children(vec![
            NodeFixture::new()
                .description("submit form")
                .bounds(0, 0, 10, 10),
            NodeFixture::new()
                .text("Submit")
                .clickable(true)
                .bounds(100, 200, 140, 230),
        ]);
        let (locator, root) = locator_for(root);

        let found = locator.find_text_target(&root, "Submit").unwrap();
        assert_eq!(found.info.text_or_empty(), "Submit");
    }

    #[test]
    fn exact_text_prefers_equal_text_among_index_results() {
        let root = NodeFixture::new().with_children(vec![
            NodeFixture::new().text("Submit order").bounds(0, 0, 10, 10),
            NodeFixture::new().text("Submit").bounds(20, 20, 30, 30),
        ]);
        let (locator, root) = locator_for(root);

        let found = locator.find_by_exact_text(&root, "Submit").unwrap();
        assert_eq!(found.info.text_or_empty(), "Submit");
    }

    #[test]
    fn fuzzy_matches_description_case_insensitively() {
        let root = NodeFixture::new().with_children(vec![NodeFixture::new()
            .description("Open SETTINGS")
            .bounds(0, 0, 10, 10)]);
        let (locator, root) = locator_for(root);

        assert!(locator.find_by_exact_text(&root, "settings").is_none());
        let found = locator.find_text_target(&root, "settings").unwrap();
        assert_eq!(found.info.description_or_empty(), "Open SETTINGS");
    }

    #[test]
    fn missing_target_is_none() {
        let (locator, root) = locator_for(NodeFixture::new().text("Hello"));
        assert!(locator.find_text_target(&root, "Bye").is_none());
        assert!(locator.find_text_target(&root, "").is_none());
        assert!(locator.find_anchor(&root, "", "").is_none());
    }

    #[test]
    fn anchor_text_wins_over_description_and_fuzzy() {
        let root = NodeFixture::new().with_children(vec![
            NodeFixture::new()
                .description("header")
                .bounds(0, 0, 10, 10),
            NodeFixture::new()
                .text("Sub Header line")
                .bounds(0, 20, 10, 30),
            NodeFixture::new().text("Header").bounds(0, 40, 100, 80),
        ]);
        let (locator, root) = locator_for(root);

        let (node, strategy) = locator.find_anchor(&root, "Header", "header").unwrap();
        assert_eq!(strategy, AnchorStrategy::ExactText);
        assert_eq!(node.info.text_or_empty(), "Header");
    }

    #[test]
    fn anchor_description_wins_over_fuzzy() {
        let root = NodeFixture::new().with_children(vec![
            NodeFixture::new()
                .description("Navigate up button")
                .bounds(0, 0, 10, 10),
            NodeFixture::new()
                .description("NAVIGATE UP")
                .bounds(0, 20, 10, 30),
        ]);
        let (locator, root) = locator_for(root);

        let (node, strategy) = locator.find_anchor(&root, "", "Navigate up").unwrap();
        assert_eq!(strategy, AnchorStrategy::ExactDescription);
        assert_eq!(node.info.description_or_empty(), "NAVIGATE UP");
    }

    #[test]
    fn anchor_falls_back_to_fuzzy() {
        let root = NodeFixture::new().with_children(vec![NodeFixture::new()
            .description("Main header area")
            .bounds(0, 0, 100, 120)]);
        let (locator, root) = locator_for(root);

        let (node, strategy) = locator.find_anchor(&root, "header", "").unwrap();
        assert_eq!(strategy, AnchorStrategy::Fuzzy);
        assert_eq!(
            ElementLocator::resolve_anchor_offset(&node.info, 0, 50),
            Point::new(50, 110)
        );
    }

    #[test]
    fn clickable_ancestor_is_tapped_for_plain_label() {
        let root = NodeFixture::new().with_children(vec![NodeFixture::new()
            .clickable(true)
            .bounds(0, 0, 200, 100)
            .with_children(vec![NodeFixture::new().text("Like").bounds(10, 10, 50, 30)])]);
        let (locator, root) = locator_for(root);

        let label = locator.find_text_target(&root, "Like").unwrap();
        assert_eq!(locator.clickable_target_point(&label), Point::new(100, 50));
    }

    #[test]
    fn node_center_used_without_clickable_ancestor() {
        let root = NodeFixture::new().with_children(vec![NodeFixture::new()
            .text("Like")
            .bounds(10, 10, 50, 30)]);
        let (locator, root) = locator_for(root);

        let label = locator.find_text_target(&root, "Like").unwrap();
        assert_eq!(locator.clickable_target_point(&label), Point::new(30, 20));
    }

    #[test]
    fn scrollable_search_is_pre_order() {
        let root = NodeFixture::new().with_children(vec![
            NodeFixture::new().text("title"),
            NodeFixture::new()
                .text("list")
                .scrollable(true)
                .with_children(vec![NodeFixture::new().text("inner").scrollable(true)]),
        ]);
        let (locator, root) = locator_for(root);

        let found = locator.find_scrollable(&root).unwrap();
        assert_eq!(found.info.text_or_empty(), "list");
    }
}
