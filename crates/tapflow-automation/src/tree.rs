//! 접근성 트리 접근자.
//!
//! 활성 창 루트 조회와 반복(명시적 스택) 전위 순회를 제공한다.
//! 깊이/방문 노드 상한으로 깊거나 순환하는 트리에서도 스택이 넘치지 않으며,
//! 무효화된 노드는 건너뛴다 (하위 트리 포함).

use std::sync::Arc;

use tracing::{debug, warn};

use tapflow_core::config::AutomationConfig;
use tapflow_core::models::node::NodeInfo;
use tapflow_core::ports::accessibility::{NodeHandle, WindowAccessor};

/// 순회 상한
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalLimits {
    /// 최대 깊이 (루트 = 0, 이 깊이의 노드까지 방문)
    pub max_depth: usize,
    /// 최대 방문 노드 수
    pub max_nodes: usize,
}

impl TraversalLimits {
    pub fn from_config(config: &AutomationConfig) -> Self {
        Self {
            max_depth: config.max_traversal_depth,
            max_nodes: config.max_traversal_nodes,
        }
    }
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self::from_config(&AutomationConfig::default())
    }
}

/// 매칭된 노드 — 핸들과 매칭 시점의 속성 스냅샷
#[derive(Clone)]
pub struct FoundNode {
    pub handle: NodeHandle,
    pub info: NodeInfo,
}

impl FoundNode {
    /// 핸들에서 속성을 읽어 생성 (무효 노드면 None)
    pub fn read(handle: NodeHandle) -> Option<Self> {
        let info = handle.info()?;
        Some(Self { handle, info })
    }
}

impl std::fmt::Debug for FoundNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoundNode").field("info", &self.info).finish()
    }
}

/// 접근성 트리 접근자
#[derive(Clone)]
pub struct TreeAccessor {
    window: Arc<dyn WindowAccessor>,
    limits: TraversalLimits,
}

impl TreeAccessor {
    pub fn new(window: Arc<dyn WindowAccessor>, limits: TraversalLimits) -> Self {
        Self { window, limits }
    }

    pub fn limits(&self) -> TraversalLimits {
        self.limits
    }

    /// 활성 창 루트
    ///
    /// 활성 창이 없거나 루트가 이미 무효화되었으면 None.
    /// 호출자는 이를 "지금은 자동화 불가"로 취급하고 즉시 재시도하지 않는다.
    pub fn root(&self) -> Option<FoundNode> {
        let Some(handle) = self.window.root_in_active_window() else {
            debug!("활성 창 루트 없음");
            return None;
        };
        let found = FoundNode::read(handle);
        if found.is_none() {
            debug!("활성 창 루트가 무효화됨");
        }
        found
    }

    /// 전위 순회 — 조건을 만족하는 첫 노드
    pub fn depth_first_search<P>(&self, root: &NodeHandle, mut predicate: P) -> Option<FoundNode>
    where
        P: FnMut(&NodeInfo) -> bool,
    {
        let mut found = None;
        self.walk(root, |node| {
            if predicate(&node.info) {
                found = Some(node);
                false
            } else {
                true
            }
        });
        found
    }

    /// 전위 순회 — 조건을 만족하는 모든 노드 (순회 순서)
    pub fn collect<P>(&self, root: &NodeHandle, mut predicate: P) -> Vec<FoundNode>
    where
        P: FnMut(&NodeInfo) -> bool,
    {
        let mut matches = Vec::new();
        self.walk(root, |node| {
            if predicate(&node.info) {
                matches.push(node);
            }
            true
        });
        matches
    }

    /// 순회 본체. `visit`가 false를 반환하면 중단한다.
    fn walk<V>(&self, root: &NodeHandle, mut visit: V)
    where
        V: FnMut(FoundNode) -> bool,
    {
        let mut stack: Vec<(NodeHandle, usize)> = vec![(Arc::clone(root), 0)];
        let mut visited = 0usize;

        while let Some((handle, depth)) = stack.pop() {
            if visited >= self.limits.max_nodes {
                warn!(
                    max_nodes = self.limits.max_nodes,
                    "트리 순회 노드 상한 도달 — 순회 중단"
                );
                return;
            }

            // 무효화된 노드는 하위 트리째 건너뜀
            let Some(info) = handle.info() else {
                continue;
            };
            visited += 1;

            if depth < self.limits.max_depth {
                let children: Vec<NodeHandle> =
                    (0..handle.child_count()).filter_map(|i| handle.child(i)).collect();
                for child in children.into_iter().rev() {
                    stack.push((child, depth + 1));
                }
            }

            if !visit(FoundNode { handle, info }) {
                return;
            }
        }
    }
}
