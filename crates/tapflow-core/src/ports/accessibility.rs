//! 접근성 트리 포트.
//!
//! 전면 앱의 접근성 트리를 노출한다. 노드 수명은 플랫폼 소유이며,
//! 트리 변경 시 언제든 무효화될 수 있다. 모든 접근은 `info()`로
//! 유효성을 먼저 확인해야 한다.

use std::sync::Arc;

use crate::models::node::{NodeAction, NodeInfo};

/// 공유 노드 핸들 — 탐색 동안만 빌려 쓰고 보관하지 않는다
pub type NodeHandle = Arc<dyn UiNode>;

/// 플랫폼 접근성 노드
///
/// 구현체: 실제 기기 바인딩, `tapflow_automation::device::MemoryNode` (시뮬레이터)
pub trait UiNode: Send + Sync {
    /// 노드 속성 스냅샷. 노드가 무효화되었으면 None
    fn info(&self) -> Option<NodeInfo>;

    /// 자식 수 (무효 노드는 0)
    fn child_count(&self) -> usize;

    /// `index`번째 자식
    fn child(&self, index: usize) -> Option<NodeHandle>;

    /// 부모 노드 (루트 또는 무효 노드는 None)
    fn parent(&self) -> Option<NodeHandle>;

    /// 플랫폼 텍스트 인덱스 조회 — 이 노드 하위에서 텍스트가 `text`를 포함하는 노드 목록
    ///
    /// 결과는 트리 순회 순서를 따른다.
    fn find_by_text(&self, text: &str) -> Vec<NodeHandle>;

    /// 접근성 액션 수행. 플랫폼이 수락하면 true
    fn perform_action(&self, action: NodeAction) -> bool;
}

/// 활성 창 접근자
pub trait WindowAccessor: Send + Sync {
    /// 현재 활성 창의 루트 노드 (활성 창이 없으면 None)
    fn root_in_active_window(&self) -> Option<NodeHandle>;
}
