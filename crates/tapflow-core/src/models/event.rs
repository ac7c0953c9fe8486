//! 플랫폼 접근성 이벤트 모델.

use serde::{Deserialize, Serialize};

/// 접근성 이벤트 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessibilityEventType {
    /// 전면 창 변경 (앱 전환, 새 액티비티)
    WindowStateChanged,
    /// 창 내용 변경
    WindowContentChanged,
    /// 스크롤 위치 변경
    ViewScrolled,
    /// 그 밖의 이벤트 (클릭, 포커스 등)
    Other,
}

impl AccessibilityEventType {
    /// 클릭 가능 요소 스냅샷을 다시 만들 만한 이벤트인지
    pub fn refreshes_snapshot(self) -> bool {
        matches!(
            self,
            Self::WindowStateChanged | Self::WindowContentChanged | Self::ViewScrolled
        )
    }
}

/// 접근성 이벤트 — 발생 앱 패키지를 함께 전달
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityEvent {
    pub event_type: AccessibilityEventType,
    /// 이벤트를 발생시킨 앱 패키지 (플랫폼이 주지 않으면 None)
    pub package_name: Option<String>,
}

impl AccessibilityEvent {
    pub fn new(event_type: AccessibilityEventType, package_name: impl Into<String>) -> Self {
        Self {
            event_type,
            package_name: Some(package_name.into()),
        }
    }

    /// 전면 창 변경 이벤트
    pub fn window_state_changed(package_name: impl Into<String>) -> Self {
        Self::new(AccessibilityEventType::WindowStateChanged, package_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_refresh_event_types() {
        assert!(AccessibilityEventType::WindowStateChanged.refreshes_snapshot());
        assert!(AccessibilityEventType::WindowContentChanged.refreshes_snapshot());
        assert!(AccessibilityEventType::ViewScrolled.refreshes_snapshot());
        assert!(!AccessibilityEventType::Other.refreshes_snapshot());
    }
}
