//! 애플리케이션 설정 구조체.
//!
//! 자동화 타이밍(정착 지연, 스크롤 대기, 제스처), 탭 표시 오버레이,
//! 실시간 요소 검사기, 저장소 경로, 스케줄러 설정을 정의한다.
//! `ConfigManager`가 JSON 파일로 로드/저장한다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::ports::overlay::MarkerStyle;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 자동화 엔진 설정
    #[serde(default)]
    pub automation: AutomationConfig,
    /// 탭 표시 오버레이 설정
    #[serde(default)]
    pub overlay: OverlayConfig,
    /// 실시간 요소 검사기 설정
    #[serde(default)]
    pub inspector: InspectorConfig,
    /// 단축키 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 주기 실행 스케줄러 설정
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

// ============================================================
// 자동화 설정
// ============================================================

/// 자동화 엔진 설정 — 고정 지연은 UI 렌더링 완료를 기다리는 휴리스틱
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// 대상 앱 전면 감지 후 행동까지 대기 (밀리초)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// 스크롤 후 대기 (밀리초)
    #[serde(default = "default_scroll_settle_delay_ms")]
    pub scroll_settle_delay_ms: u64,
    /// 탭 스트로크 지속 시간 (밀리초)
    #[serde(default = "default_tap_duration_ms")]
    pub tap_duration_ms: u64,
    /// 폴백 스와이프 지속 시간 (밀리초)
    #[serde(default = "default_swipe_duration_ms")]
    pub swipe_duration_ms: u64,
    /// 가장자리 스크롤 반복 횟수
    #[serde(default = "default_scroll_repeat_count")]
    pub scroll_repeat_count: u32,
    /// 제스처 API 최소 플랫폼 레벨 (Android N = 24)
    #[serde(default = "default_min_gesture_api_level")]
    pub min_gesture_api_level: u32,
    /// 트리 순회 최대 깊이
    #[serde(default = "default_max_traversal_depth")]
    pub max_traversal_depth: usize,
    /// 트리 순회 최대 방문 노드 수
    #[serde(default = "default_max_traversal_nodes")]
    pub max_traversal_nodes: usize,
    /// 제스처 완료 콜백 대기 상한 (밀리초)
    #[serde(default = "default_gesture_timeout_ms")]
    pub gesture_timeout_ms: u64,
    /// 무장 후 결과 대기 상한 (밀리초). 전면 이벤트를 놓치면 이 시간 뒤 `NotTriggered`
    #[serde(default = "default_arm_timeout_ms")]
    pub arm_timeout_ms: u64,
    /// 명령 큐 용량
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            scroll_settle_delay_ms: default_scroll_settle_delay_ms(),
            tap_duration_ms: default_tap_duration_ms(),
            swipe_duration_ms: default_swipe_duration_ms(),
            scroll_repeat_count: default_scroll_repeat_count(),
            min_gesture_api_level: default_min_gesture_api_level(),
            max_traversal_depth: default_max_traversal_depth(),
            max_traversal_nodes: default_max_traversal_nodes(),
            gesture_timeout_ms: default_gesture_timeout_ms(),
            arm_timeout_ms: default_arm_timeout_ms(),
            command_queue_capacity: default_command_queue_capacity(),
        }
    }
}

impl AutomationConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn scroll_settle_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_delay_ms)
    }

    pub fn gesture_timeout(&self) -> Duration {
        Duration::from_millis(self.gesture_timeout_ms)
    }

    pub fn arm_timeout(&self) -> Duration {
        Duration::from_millis(self.arm_timeout_ms)
    }
}

// ============================================================
// 오버레이 설정
// ============================================================

/// 탭 표시 오버레이 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 마커 표시 시간 (밀리초)
    #[serde(default = "default_overlay_duration_ms")]
    pub duration_ms: u64,
    #[serde(default)]
    pub marker: MarkerStyle,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: default_overlay_duration_ms(),
            marker: MarkerStyle::default(),
        }
    }
}

impl OverlayConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

// ============================================================
// 검사기 설정
// ============================================================

/// 실시간 요소 검사기 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// 시작 시 실시간 모니터링 활성화
    #[serde(default)]
    pub enabled: bool,
    /// 스냅샷 내보내기 최소 간격 (밀리초)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// 호스트 앱 패키지 — 이 앱의 스냅샷은 내보내지 않는다
    #[serde(default = "default_host_package")]
    pub host_package: String,
    /// 브로드캐스트 채널 용량
    #[serde(default = "default_inspector_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: default_debounce_ms(),
            host_package: default_host_package(),
            channel_capacity: default_inspector_channel_capacity(),
        }
    }
}

impl InspectorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ============================================================
// 저장소 / 스케줄러 설정
// ============================================================

/// 단축키 저장소 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 데이터 디렉토리 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// 저장 파일 이름
    #[serde(default = "default_storage_file_name")]
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            file_name: default_storage_file_name(),
        }
    }
}

/// 주기 실행 스케줄러 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 예약 직후 첫 실행 여부 (false면 한 주기 뒤 첫 실행)
    #[serde(default = "default_true")]
    pub run_immediately: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_immediately: true,
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 설정 값 검증
    ///
    /// 0이면 동작이 정의되지 않는 값(디바운스 창, 순회 상한, 스크롤 반복 등)을 거부한다.
    pub fn validate(&self) -> Result<(), CoreError> {
        let automation = &self.automation;
        if automation.max_traversal_depth == 0 {
            return Err(CoreError::validation(
                "automation.max_traversal_depth",
                "0보다 커야 합니다",
            ));
        }
        if automation.max_traversal_nodes == 0 {
            return Err(CoreError::validation(
                "automation.max_traversal_nodes",
                "0보다 커야 합니다",
            ));
        }
        if automation.scroll_repeat_count == 0 {
            return Err(CoreError::validation(
                "automation.scroll_repeat_count",
                "0보다 커야 합니다",
            ));
        }
        if automation.tap_duration_ms == 0 {
            return Err(CoreError::validation(
                "automation.tap_duration_ms",
                "0보다 커야 합니다",
            ));
        }
        if automation.arm_timeout_ms == 0 {
            return Err(CoreError::validation(
                "automation.arm_timeout_ms",
                "0보다 커야 합니다",
            ));
        }
        if automation.command_queue_capacity == 0 {
            return Err(CoreError::validation(
                "automation.command_queue_capacity",
                "0보다 커야 합니다",
            ));
        }
        if self.inspector.debounce_ms == 0 {
            return Err(CoreError::validation(
                "inspector.debounce_ms",
                "0보다 커야 합니다",
            ));
        }
        if self.inspector.channel_capacity == 0 {
            return Err(CoreError::validation(
                "inspector.channel_capacity",
                "0보다 커야 합니다",
            ));
        }
        if self.storage.file_name.trim().is_empty() {
            return Err(CoreError::validation(
                "storage.file_name",
                "비어 있을 수 없습니다",
            ));
        }
        Ok(())
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_settle_delay_ms() -> u64 {
    1_500
}
fn default_scroll_settle_delay_ms() -> u64 {
    800
}
fn default_tap_duration_ms() -> u64 {
    100
}
fn default_swipe_duration_ms() -> u64 {
    300
}
fn default_scroll_repeat_count() -> u32 {
    5
}
fn default_min_gesture_api_level() -> u32 {
    24
}
fn default_max_traversal_depth() -> usize {
    128
}
fn default_max_traversal_nodes() -> usize {
    10_000
}
fn default_gesture_timeout_ms() -> u64 {
    2_000
}
fn default_arm_timeout_ms() -> u64 {
    30_000
}
fn default_command_queue_capacity() -> usize {
    64
}
fn default_overlay_duration_ms() -> u64 {
    800
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_host_package() -> String {
    "com.example.clickapp".to_string()
}
fn default_inspector_channel_capacity() -> usize {
    16
}
fn default_storage_file_name() -> String {
    "shortcuts.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_timings() {
        let config = AppConfig::default_config();
        assert_eq!(config.automation.settle_delay(), Duration::from_millis(1_500));
        assert_eq!(config.automation.scroll_settle_delay(), Duration::from_millis(800));
        assert_eq!(config.automation.scroll_repeat_count, 5);
        assert_eq!(config.automation.min_gesture_api_level, 24);
        assert_eq!(config.overlay.duration(), Duration::from_millis(800));
        assert_eq!(config.overlay.marker.ring_radius, 40);
        assert_eq!(config.inspector.debounce(), Duration::from_millis(300));
        assert!(!config.inspector.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{"automation": {"settle_delay_ms": 10}, "inspector": {"enabled": true}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.automation.settle_delay_ms, 10);
        assert_eq!(config.automation.scroll_settle_delay_ms, 800);
        assert!(config.inspector.enabled);
        assert_eq!(config.inspector.host_package, "com.example.clickapp");
        assert_eq!(config.storage.file_name, "shortcuts.json");
    }

    #[test]
    fn empty_json_is_default() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default_config());
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut config = AppConfig::default_config();
        config.inspector.debounce_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(CoreError::Validation { ref field, .. }) if field == "inspector.debounce_ms"
        ));

        let mut config = AppConfig::default_config();
        config.automation.max_traversal_nodes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.automation.scroll_repeat_count = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.automation.arm_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
