//! # tapflow-automation
//!
//! 접근성 이벤트 구동 UI 자동화 엔진.
//! 대상 앱이 전면에 올라오면 좌표/텍스트/앵커 기준으로 요소를 찾아 탭 제스처를 실행하고,
//! 선택적으로 전면 앱의 클릭 가능 요소를 실시간으로 내보낸다.
//!
//! 플랫폼 접근은 전부 `tapflow_core::ports` trait 뒤에 있으며,
//! [`device::SimulatedDevice`]가 테스트와 CLI용 인메모리 구현을 제공한다.

pub mod device;
pub mod gesture;
pub mod inspector;
pub mod locator;
pub mod orchestrator;
pub mod overlay;
pub mod service;
pub mod tree;

pub use orchestrator::{ArmedRun, OrchestratorHandle, OrchestratorState};
pub use service::{AutomationService, PlatformPorts};
