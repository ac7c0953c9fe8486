//! 단축키 저장소 포트.
//!
//! 구현: `tapflow-storage` crate (`JsonShortcutStore`)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::shortcut::{ClickShortcut, EventGroup};

/// 단축키 / 이벤트 그룹 저장소
#[async_trait]
pub trait ShortcutStore: Send + Sync {
    // ============================================================
    // 단축키
    // ============================================================

    /// 단축키 추가
    async fn save_shortcut(&self, shortcut: &ClickShortcut) -> Result<(), CoreError>;

    /// 단축키 갱신 (없는 ID면 아무것도 하지 않음)
    async fn update_shortcut(&self, shortcut: &ClickShortcut) -> Result<(), CoreError>;

    /// 단축키 삭제
    async fn delete_shortcut(&self, id: &str) -> Result<(), CoreError>;

    async fn get_shortcut(&self, id: &str) -> Result<Option<ClickShortcut>, CoreError>;

    async fn list_shortcuts(&self) -> Result<Vec<ClickShortcut>, CoreError>;

    // ============================================================
    // 이벤트 그룹
    // ============================================================

    async fn save_group(&self, group: &EventGroup) -> Result<(), CoreError>;

    /// 그룹 갱신 (없는 ID면 아무것도 하지 않음)
    async fn update_group(&self, group: &EventGroup) -> Result<(), CoreError>;

    /// 그룹 삭제
    ///
    /// `delete_events`가 false면 소속 이벤트는 그룹에서 분리된다 (group_id 없음, 순서 0).
    async fn delete_group(&self, id: &str, delete_events: bool) -> Result<(), CoreError>;

    async fn get_group(&self, id: &str) -> Result<Option<EventGroup>, CoreError>;

    async fn list_groups(&self) -> Result<Vec<EventGroup>, CoreError>;

    // ============================================================
    // 그룹 소속
    // ============================================================

    /// 그룹 이벤트 목록 (order_in_group 오름차순)
    async fn events_for_group(&self, group_id: &str) -> Result<Vec<ClickShortcut>, CoreError>;

    /// 그룹에 속하지 않은 단축키 목록
    async fn standalone_events(&self) -> Result<Vec<ClickShortcut>, CoreError>;

    /// 이벤트를 그룹 끝에 추가 (순서 = 기존 최대 + 1, 빈 그룹이면 0)
    async fn add_event_to_group(&self, event_id: &str, group_id: &str) -> Result<(), CoreError>;

    /// 이벤트를 그룹에서 분리
    async fn remove_event_from_group(&self, event_id: &str) -> Result<(), CoreError>;

    /// 그룹 내 순서 재배치 (순서 = 목록 내 위치)
    async fn reorder_events_in_group(
        &self,
        group_id: &str,
        ordered_ids: &[String],
    ) -> Result<(), CoreError>;
}
