//! 자동화 요청 모델.
//!
//! 외부 호출자(UI, 스케줄러, 그룹 실행기)가 만들어 오케스트레이터에 넘기는 값.
//! 한 번 무장(arm)되면 변경되지 않으며, 실행 후 폐기된다.

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// 클릭 전 스크롤 방향
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScrollDirection {
    #[default]
    None,
    Top,
    Bottom,
}

impl ScrollDirection {
    /// 저장 형식 이름 (`NONE`, `TOP`, `BOTTOM`)
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Top => "TOP",
            Self::Bottom => "BOTTOM",
        }
    }

    /// 표시 이름
    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "No scroll",
            Self::Top => "Scroll to top",
            Self::Bottom => "Scroll to bottom",
        }
    }

    /// 이름 → 방향. 알 수 없는 이름은 `None`
    pub fn from_name(value: &str) -> Self {
        match value {
            "TOP" => Self::Top,
            "BOTTOM" => Self::Bottom,
            _ => Self::None,
        }
    }
}

impl From<String> for ScrollDirection {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<ScrollDirection> for String {
    fn from(value: ScrollDirection) -> Self {
        value.name().to_string()
    }
}

/// 클릭 대상 — 어떤 필드가 유효한지를 variant가 결정한다
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClickTarget {
    /// 고정 화면 좌표
    Coordinates { x: i32, y: i32 },
    /// 텍스트 매칭 (정확 → 퍼지)
    Text { text: String },
    /// 앵커 요소 기준 상대 오프셋
    Anchor {
        /// 앵커 텍스트 (빈 문자열이면 텍스트 전략 생략)
        #[serde(default)]
        text: String,
        /// 앵커 콘텐츠 설명 (빈 문자열이면 설명 전략 생략)
        #[serde(default)]
        description: String,
        #[serde(default)]
        offset_x: i32,
        #[serde(default)]
        offset_y: i32,
    },
}

impl ClickTarget {
    /// 로그용 모드 이름
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Coordinates { .. } => "coordinates",
            Self::Text { .. } => "text",
            Self::Anchor { .. } => "anchor",
        }
    }
}

/// 자동화 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationRequest {
    /// 요청 ID (UUID v4) — 로그와 결과 상관관계용
    pub request_id: String,
    /// 대상 앱 패키지
    pub target_app_id: String,
    /// 클릭 대상
    pub target: ClickTarget,
    /// 클릭 전 스크롤
    #[serde(default)]
    pub scroll_before_click: ScrollDirection,
    /// 더블 탭 여부 (두 번째 라운드 실행)
    #[serde(default)]
    pub double_tap: bool,
    /// 두 라운드 사이 지연 (밀리초)
    #[serde(default = "default_double_tap_delay_ms")]
    pub double_tap_delay_ms: u64,
}

/// 기본 더블 탭 지연
pub const DEFAULT_DOUBLE_TAP_DELAY_MS: u64 = 2_000;

fn default_double_tap_delay_ms() -> u64 {
    DEFAULT_DOUBLE_TAP_DELAY_MS
}

impl AutomationRequest {
    /// 새 요청 (더블 탭 없음, 스크롤 없음)
    pub fn new(target_app_id: impl Into<String>, target: ClickTarget) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            target_app_id: target_app_id.into(),
            target,
            scroll_before_click: ScrollDirection::None,
            double_tap: false,
            double_tap_delay_ms: DEFAULT_DOUBLE_TAP_DELAY_MS,
        }
    }

    /// 좌표 탭 요청
    pub fn coordinates(target_app_id: impl Into<String>, point: Point) -> Self {
        Self::new(
            target_app_id,
            ClickTarget::Coordinates {
                x: point.x,
                y: point.y,
            },
        )
    }

    /// 텍스트 탭 요청
    pub fn text(target_app_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(target_app_id, ClickTarget::Text { text: text.into() })
    }

    /// 앵커 텍스트 기준 오프셋 탭 요청
    pub fn anchor(
        target_app_id: impl Into<String>,
        anchor_text: impl Into<String>,
        offset_x: i32,
        offset_y: i32,
    ) -> Self {
        Self::new(
            target_app_id,
            ClickTarget::Anchor {
                text: anchor_text.into(),
                description: String::new(),
                offset_x,
                offset_y,
            },
        )
    }

    /// 더블 탭 설정
    pub fn with_double_tap(mut self, delay_ms: u64) -> Self {
        self.double_tap = true;
        self.double_tap_delay_ms = delay_ms;
        self
    }

    /// 클릭 전 스크롤 설정
    pub fn with_scroll(mut self, direction: ScrollDirection) -> Self {
        self.scroll_before_click = direction;
        self
    }
}
