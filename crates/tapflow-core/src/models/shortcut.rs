//! 저장된 단축키(이벤트)와 이벤트 그룹 모델.
//!
//! 저장 형식은 camelCase JSON 키를 사용하며,
//! 누락된 선택 필드는 기본값으로 복원된다 (구버전 데이터 호환).

use serde::{Deserialize, Deserializer, Serialize};

use super::request::{AutomationRequest, ClickTarget, ScrollDirection, DEFAULT_DOUBLE_TAP_DELAY_MS};

// ============================================================
// ScheduleInterval — 반복 실행 주기
// ============================================================

/// 반복 실행 주기
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScheduleInterval {
    #[default]
    None,
    EveryMinute,
    Every5Minutes,
    Every15Minutes,
    Every30Minutes,
    EveryHour,
    Every6Hours,
    Every12Hours,
    EveryDay,
}

impl ScheduleInterval {
    pub const ALL: [ScheduleInterval; 9] = [
        Self::None,
        Self::EveryMinute,
        Self::Every5Minutes,
        Self::Every15Minutes,
        Self::Every30Minutes,
        Self::EveryHour,
        Self::Every6Hours,
        Self::Every12Hours,
        Self::EveryDay,
    ];

    /// 저장 형식 이름
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::EveryMinute => "EVERY_MINUTE",
            Self::Every5Minutes => "EVERY_5_MINUTES",
            Self::Every15Minutes => "EVERY_15_MINUTES",
            Self::Every30Minutes => "EVERY_30_MINUTES",
            Self::EveryHour => "EVERY_HOUR",
            Self::Every6Hours => "EVERY_6_HOURS",
            Self::Every12Hours => "EVERY_12_HOURS",
            Self::EveryDay => "EVERY_DAY",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "No scheduling",
            Self::EveryMinute => "Every minute",
            Self::Every5Minutes => "Every 5 minutes",
            Self::Every15Minutes => "Every 15 minutes",
            Self::Every30Minutes => "Every 30 minutes",
            Self::EveryHour => "Every hour",
            Self::Every6Hours => "Every 6 hours",
            Self::Every12Hours => "Every 12 hours",
            Self::EveryDay => "Every day",
        }
    }

    /// 주기 (분). `None`은 0
    pub fn interval_minutes(self) -> u64 {
        match self {
            Self::None => 0,
            Self::EveryMinute => 1,
            Self::Every5Minutes => 5,
            Self::Every15Minutes => 15,
            Self::Every30Minutes => 30,
            Self::EveryHour => 60,
            Self::Every6Hours => 360,
            Self::Every12Hours => 720,
            Self::EveryDay => 1_440,
        }
    }

    /// 주기 Duration. `None`이면 None
    pub fn period(self) -> Option<std::time::Duration> {
        match self.interval_minutes() {
            0 => None,
            minutes => Some(std::time::Duration::from_secs(minutes * 60)),
        }
    }

    /// 이름 → 주기. 알 수 없는 이름은 `None`
    pub fn from_name(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|interval| interval.name() == value)
            .unwrap_or_default()
    }
}

impl From<String> for ScheduleInterval {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<ScheduleInterval> for String {
    fn from(value: ScheduleInterval) -> Self {
        value.name().to_string()
    }
}

// ============================================================
// ClickShortcut — 저장된 탭 이벤트
// ============================================================

/// 저장된 단축키 (그룹에 속하면 "이벤트")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickShortcut {
    pub id: String,
    pub name: String,
    /// 표시용 앱 이름
    pub app_name: String,
    /// 대상 앱 패키지
    pub package_name: String,
    pub use_coordinates: bool,
    #[serde(default)]
    pub target_text: String,
    #[serde(default = "unset_coordinate")]
    pub click_x: i32,
    #[serde(default = "unset_coordinate")]
    pub click_y: i32,
    #[serde(default)]
    pub double_click_enabled: bool,
    #[serde(default = "default_double_click_delay_ms")]
    pub double_click_delay_ms: u64,
    #[serde(default)]
    pub scheduling_enabled: bool,
    #[serde(default)]
    pub schedule_interval: ScheduleInterval,
    /// 소속 그룹 (null, 빈 문자열, "null"은 모두 없음)
    #[serde(default, deserialize_with = "deserialize_group_id")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub order_in_group: i32,
    /// 그룹 실행 시 다음 이벤트 전 추가 대기 (밀리초)
    #[serde(default)]
    pub delay_after_ms: u64,
    #[serde(default)]
    pub use_anchor: bool,
    #[serde(default)]
    pub anchor_text: String,
    #[serde(default)]
    pub anchor_content_description: String,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
    #[serde(default)]
    pub scroll_direction: ScrollDirection,
}

fn unset_coordinate() -> i32 {
    -1
}

fn default_double_click_delay_ms() -> u64 {
    DEFAULT_DOUBLE_TAP_DELAY_MS
}

fn deserialize_group_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|id| !id.is_empty() && id != "null"))
}

impl ClickShortcut {
    /// 좌표 단축키
    pub fn with_coordinates(
        id: impl Into<String>,
        name: impl Into<String>,
        package_name: impl Into<String>,
        x: i32,
        y: i32,
    ) -> Self {
        Self {
            use_coordinates: true,
            click_x: x,
            click_y: y,
            ..Self::blank(id, name, package_name)
        }
    }

    /// 텍스트 단축키
    pub fn with_text(
        id: impl Into<String>,
        name: impl Into<String>,
        package_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            target_text: text.into(),
            ..Self::blank(id, name, package_name)
        }
    }

    fn blank(id: impl Into<String>, name: impl Into<String>, package_name: impl Into<String>) -> Self {
        let package_name = package_name.into();
        Self {
            id: id.into(),
            name: name.into(),
            app_name: package_name.clone(),
            package_name,
            use_coordinates: false,
            target_text: String::new(),
            click_x: -1,
            click_y: -1,
            double_click_enabled: false,
            double_click_delay_ms: DEFAULT_DOUBLE_TAP_DELAY_MS,
            scheduling_enabled: false,
            schedule_interval: ScheduleInterval::None,
            group_id: None,
            order_in_group: 0,
            delay_after_ms: 0,
            use_anchor: false,
            anchor_text: String::new(),
            anchor_content_description: String::new(),
            offset_x: 0,
            offset_y: 0,
            scroll_direction: ScrollDirection::None,
        }
    }

    /// 스케줄이 실제로 유효한지 (활성 + 주기 있음)
    pub fn is_schedulable(&self) -> bool {
        self.scheduling_enabled && self.schedule_interval != ScheduleInterval::None
    }

    /// 자동화 요청으로 변환
    ///
    /// 우선순위: 앵커 → 유효 좌표 → 텍스트.
    /// 좌표 모드인데 좌표가 음수이고 텍스트도 없으면 좌표 대상 그대로 넘겨
    /// 오케스트레이터가 `InvalidTarget`으로 처리한다.
    pub fn to_request(&self) -> AutomationRequest {
        let target = if self.use_anchor {
            ClickTarget::Anchor {
                text: self.anchor_text.clone(),
                description: self.anchor_content_description.clone(),
                offset_x: self.offset_x,
                offset_y: self.offset_y,
            }
        } else if self.use_coordinates && self.click_x >= 0 && self.click_y >= 0 {
            ClickTarget::Coordinates {
                x: self.click_x,
                y: self.click_y,
            }
        } else if !self.target_text.is_empty() {
            ClickTarget::Text {
                text: self.target_text.clone(),
            }
        } else {
            ClickTarget::Coordinates {
                x: self.click_x,
                y: self.click_y,
            }
        };

        let mut request = AutomationRequest::new(self.package_name.clone(), target)
            .with_scroll(self.scroll_direction);
        request.double_tap = self.double_click_enabled;
        request.double_tap_delay_ms = self.double_click_delay_ms;
        request
    }

    /// 목록 표시용 설명
    pub fn description(&self) -> String {
        let click = if self.use_coordinates {
            format!("Tap at ({}, {}) in {}", self.click_x, self.click_y, self.app_name)
        } else {
            format!("Tap \"{}\" in {}", self.target_text, self.app_name)
        };
        if self.is_schedulable() {
            format!("{click} • {}", self.schedule_interval.display_name())
        } else {
            click
        }
    }
}

// ============================================================
// EventGroup — 순차 실행 이벤트 묶음
// ============================================================

/// 이벤트 그룹
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scheduling_enabled: bool,
    #[serde(default)]
    pub schedule_interval: ScheduleInterval,
    /// 생성 시각 (Unix epoch 밀리초)
    #[serde(default = "now_millis")]
    pub created_at: i64,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl EventGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scheduling_enabled: false,
            schedule_interval: ScheduleInterval::None,
            created_at: now_millis(),
        }
    }

    pub fn is_schedulable(&self) -> bool {
        self.scheduling_enabled && self.schedule_interval != ScheduleInterval::None
    }
}
