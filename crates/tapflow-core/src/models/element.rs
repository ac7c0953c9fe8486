//! 클릭 가능 요소 스냅샷 모델.
//!
//! 실시간 검사기(Live Inspector)가 접근성 트리를 평탄화하여 만드는 값 타입.
//! 생성 이후 원본 노드와 아무 관계도 없다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use super::node::{short_class_name, NodeInfo};

/// 클릭 가능 요소 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickableElementSnapshot {
    /// 표시 텍스트 (텍스트 → 콘텐츠 설명 → 짧은 클래스 이름 순)
    pub display_text: String,
    /// 콘텐츠 설명
    pub content_description: String,
    /// 위젯 클래스 이름
    pub element_type: String,
    /// 중심 X
    pub center_x: i32,
    /// 중심 Y
    pub center_y: i32,
    /// 화면 경계
    pub bounds: Rect,
}

impl ClickableElementSnapshot {
    /// 노드 속성에서 스냅샷 생성
    ///
    /// 클릭 불가 노드, 표시 텍스트가 비었거나 크기가 0인 노드는 `None`.
    pub fn from_node(info: &NodeInfo) -> Option<Self> {
        if !info.clickable || info.bounds.is_empty() {
            return None;
        }
        let class_name = info.class_name.clone().unwrap_or_default();
        let display_text = if !info.text_or_empty().is_empty() {
            info.text_or_empty().to_string()
        } else if !info.description_or_empty().is_empty() {
            info.description_or_empty().to_string()
        } else {
            short_class_name(&class_name).to_string()
        };
        if display_text.is_empty() {
            return None;
        }
        let center = info.bounds.center();
        Some(Self {
            display_text,
            content_description: info.description_or_empty().to_string(),
            element_type: class_name,
            center_x: center.x,
            center_y: center.y,
            bounds: info.bounds,
        })
    }

    /// 목록 표시용 문자열: `"텍스트 (타입)"`
    pub fn display_string(&self) -> String {
        let element_type = short_class_name(&self.element_type).replace("AppCompat", "");
        format!("{} ({})", self.display_text, element_type)
    }

    /// `"left,top,right,bottom"` 경계 문자열
    pub fn bounds_string(&self) -> String {
        self.bounds.to_bounds_string()
    }
}

/// 스냅샷 내보내기 메시지 — 요소 목록 + 출처 앱
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementsUpdate {
    /// 스냅샷을 만든 앱 패키지
    pub package_name: String,
    /// 클릭 가능 요소 목록 (트리 전위 순회 순서)
    pub elements: Vec<ClickableElementSnapshot>,
    /// 스냅샷 시각
    pub captured_at: DateTime<Utc>,
}
