//! 접근성 노드 속성 모델.
//!
//! 플랫폼 노드([`crate::ports::accessibility::UiNode`])에서 한 번에 읽어낸 속성 스냅샷.

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};

/// 노드 속성 스냅샷 — 노드가 유효한 시점에 원자적으로 읽은 값
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// 표시 텍스트
    #[serde(default)]
    pub text: Option<String>,
    /// 콘텐츠 설명 (accessibility label)
    #[serde(default)]
    pub content_description: Option<String>,
    /// 위젯 클래스 이름 (예: "android.widget.Button")
    #[serde(default)]
    pub class_name: Option<String>,
    /// 노드가 속한 앱 패키지
    #[serde(default)]
    pub package_name: Option<String>,
    /// 화면 경계
    #[serde(default)]
    pub bounds: Rect,
    /// 클릭 가능 여부
    #[serde(default)]
    pub clickable: bool,
    /// 스크롤 가능 여부
    #[serde(default)]
    pub scrollable: bool,
}

impl NodeInfo {
    /// 텍스트 (없으면 빈 문자열)
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// 콘텐츠 설명 (없으면 빈 문자열)
    pub fn description_or_empty(&self) -> &str {
        self.content_description.as_deref().unwrap_or("")
    }

    /// 경계 중심 좌표
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// 텍스트 또는 콘텐츠 설명이 `needle`을 대소문자 무시하고 포함하는지
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        contains_ignore_case(self.text_or_empty(), needle)
            || contains_ignore_case(self.description_or_empty(), needle)
    }
}

/// 노드에 수행할 수 있는 접근성 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeAction {
    Click,
    ScrollBackward,
    ScrollForward,
}

/// 대소문자 무시 부분 문자열 검사 (빈 needle은 불일치)
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// 클래스 이름의 마지막 `.` 이후 부분
pub fn short_class_name(class_name: &str) -> &str {
    class_name.rsplit('.').next().unwrap_or(class_name)
}
