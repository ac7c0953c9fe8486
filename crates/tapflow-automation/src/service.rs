//! 자동화 서비스 — 엔진 외부 진입점.
//!
//! 플랫폼 포트를 받아 트리 접근자, 탐색기, 디스패처, 오버레이, 오케스트레이터,
//! 검사기를 조립하고 `arm` / `open_target_application` / 이벤트 입력을 노출한다.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tapflow_core::config::AppConfig;
use tapflow_core::error::CoreError;
use tapflow_core::models::event::AccessibilityEvent;
use tapflow_core::models::outcome::{FailureReason, RunOutcome, RunStatus};
use tapflow_core::models::request::AutomationRequest;
use tapflow_core::ports::accessibility::WindowAccessor;
use tapflow_core::ports::gesture::GestureExecutor;
use tapflow_core::ports::launcher::AppLauncher;
use tapflow_core::ports::overlay::OverlayWindow;

use crate::gesture::{DispatchSettings, GestureDispatcher};
use crate::inspector::LiveInspector;
use crate::locator::ElementLocator;
use crate::orchestrator::{ArmedRun, Orchestrator, OrchestratorHandle};
use crate::overlay::TapIndicator;
use crate::tree::{TraversalLimits, TreeAccessor};

/// 엔진이 사용하는 플랫폼 포트 묶음
#[derive(Clone)]
pub struct PlatformPorts {
    pub window: Arc<dyn WindowAccessor>,
    pub gestures: Arc<dyn GestureExecutor>,
    /// None이면 탭 표시 없음
    pub overlay: Option<Arc<dyn OverlayWindow>>,
    pub launcher: Arc<dyn AppLauncher>,
}

/// 자동화 서비스
pub struct AutomationService {
    orchestrator: OrchestratorHandle,
    inspector: Arc<LiveInspector>,
    launcher: Arc<dyn AppLauncher>,
    arm_timeout: Duration,
    task: JoinHandle<()>,
}

impl AutomationService {
    /// 서비스 시작 (tokio 런타임 안에서 호출)
    pub fn start(ports: PlatformPorts, config: &AppConfig) -> Self {
        let tree = TreeAccessor::new(
            ports.window,
            TraversalLimits::from_config(&config.automation),
        );

        let mut dispatcher = GestureDispatcher::new(
            ports.gestures,
            DispatchSettings::from_config(&config.automation),
        );
        if let Some(overlay) = ports.overlay {
            let indicator = TapIndicator::new(overlay, config.overlay.clone());
            dispatcher = dispatcher.with_observer(Arc::new(indicator));
        }

        let inspector = Arc::new(LiveInspector::new(tree.clone(), config.inspector.clone()));
        let (orchestrator, task) =
            Orchestrator::spawn(ElementLocator::new(tree), dispatcher, &config.automation);

        info!(
            settle_delay_ms = config.automation.settle_delay_ms,
            overlay = config.overlay.enabled,
            inspector = inspector.is_enabled(),
            "자동화 서비스 시작"
        );

        Self {
            orchestrator,
            inspector,
            launcher: ports.launcher,
            arm_timeout: config.automation.arm_timeout(),
            task,
        }
    }

    /// 요청 무장
    pub async fn arm(&self, request: AutomationRequest) -> Result<ArmedRun, CoreError> {
        self.orchestrator.arm(request).await
    }

    /// 무장 해제
    pub async fn disarm(&self) -> Result<(), CoreError> {
        self.orchestrator.disarm().await
    }

    /// 대상 앱 실행. 성공 여부 반환
    pub async fn open_target_application(&self, app_id: &str) -> bool {
        match self.launcher.launch(app_id).await {
            Ok(()) => {
                debug!(app_id, "대상 앱 실행");
                true
            }
            Err(e) => {
                warn!(app_id, error = %e, "대상 앱 실행 실패");
                false
            }
        }
    }

    /// 플랫폼 접근성 이벤트 입력 — 블로킹하지 않는다
    pub fn on_accessibility_event(&self, event: AccessibilityEvent) {
        self.inspector.on_accessibility_event(&event);
        self.orchestrator.on_event(event);
    }

    /// 무장 → 앱 실행 → 결과 대기
    ///
    /// 앱 실행에 실패하면 요청을 해제하고 `LaunchFailed`를 반환한다.
    /// `arm_timeout` 안에 결과가 없으면 요청을 해제한다. 아직 무장 상태였다면
    /// `NotTriggered`, 이미 실행 중이었다면 그 실행의 결과를 기다려 반환한다.
    pub async fn run_request(&self, request: AutomationRequest) -> Result<RunOutcome, CoreError> {
        let app_id = request.target_app_id.clone();
        let mut run = self.arm(request).await?;

        if !self.open_target_application(&app_id).await {
            self.orchestrator.disarm_request(run.request_id()).await?;
            return Ok(RunOutcome::failed(run.request_id(), FailureReason::LaunchFailed));
        }

        if let Ok(outcome) = tokio::time::timeout(self.arm_timeout, run.wait()).await {
            return outcome;
        }

        warn!(
            request_id = %run.request_id(),
            app_id = %app_id,
            timeout_ms = self.arm_timeout.as_millis() as u64,
            "대상 앱 전면 이벤트 대기 시간 초과"
        );
        self.orchestrator.disarm_request(run.request_id()).await?;
        let outcome = run.wait().await?;
        if outcome.status == RunStatus::Disarmed {
            return Ok(RunOutcome::failed(outcome.request_id, FailureReason::NotTriggered));
        }
        Ok(outcome)
    }

    /// 이벤트 소스를 구독해 서비스로 전달하는 태스크 시작
    pub fn attach_event_source(
        &self,
        mut events: broadcast::Receiver<AccessibilityEvent>,
    ) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();
        let inspector = Arc::clone(&self.inspector);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        inspector.on_accessibility_event(&event);
                        orchestrator.on_event(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "접근성 이벤트 누락");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("접근성 이벤트 소스 종료");
        })
    }

    pub fn orchestrator(&self) -> &OrchestratorHandle {
        &self.orchestrator
    }

    pub fn inspector(&self) -> &Arc<LiveInspector> {
        &self.inspector
    }

    /// 오케스트레이터 태스크 중단
    pub fn shutdown(&self) {
        self.task.abort();
        info!("자동화 서비스 종료");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{NodeFixture, SimulatedDevice};
    use crate::orchestrator::OrchestratorState;
    use tapflow_core::models::geometry::Point;

    fn ports(device: &SimulatedDevice) -> PlatformPorts {
        PlatformPorts {
            window: Arc::new(device.clone()),
            gestures: Arc::new(device.clone()),
            overlay: Some(Arc::new(device.clone())),
            launcher: Arc::new(device.clone()),
        }
    }

    fn shop_device() -> SimulatedDevice {
        let device = SimulatedDevice::new();
        device.register_app(
            "com.example.shop",
            NodeFixture::new().with_children(vec![NodeFixture::new()
                .text("Submit")
                .clickable(true)
                .bounds(100, 200, 140, 230)]),
        );
        device
    }

    fn service(device: &SimulatedDevice) -> AutomationService {
        let service = AutomationService::start(ports(device), &AppConfig::default_config());
        service.attach_event_source(device.subscribe_events());
        service
    }

    #[tokio::test(start_paused = true)]
    async fn run_request_launches_and_taps() {
        let device = shop_device();
        let service = service(&device);

        let outcome = service
            .run_request(AutomationRequest::text("com.example.shop", "Submit"))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(device.launches(), vec!["com.example.shop".to_string()]);
        assert_eq!(device.tap_points(), vec![Point::new(120, 215)]);
        assert_eq!(device.marker(), Some(Point::new(120, 215)));
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_disarms() {
        let device = SimulatedDevice::new();
        let service = service(&device);

        let outcome = service
            .run_request(AutomationRequest::text("com.missing", "Submit"))
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Failed(FailureReason::LaunchFailed));
        service
            .orchestrator()
            .wait_for_state(OrchestratorState::Idle)
            .await
            .unwrap();

        // 이후 같은 앱의 이벤트가 와도 아무것도 하지 않는다
        device.show("com.missing", NodeFixture::new().text("Submit").clickable(true));
        service.on_accessibility_event(AccessibilityEvent::window_state_changed("com.missing"));
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        assert!(device.gestures().is_empty());
    }

    #[tokio::test]
    async fn open_target_application_reports_result() {
        let device = SimulatedDevice::new();
        device.register_app("com.example.app", NodeFixture::new());
        let service = service(&device);

        assert!(service.open_target_application("com.example.app").await);
        assert!(!service.open_target_application("com.nope").await);
    }

    #[tokio::test(start_paused = true)]
    async fn missed_foreground_event_times_out_as_not_triggered() {
        let device = shop_device();
        // 이벤트 소스를 연결하지 않아 실행 이벤트가 전달되지 않는다
        let service = AutomationService::start(ports(&device), &AppConfig::default_config());

        let started = tokio::time::Instant::now();
        let outcome = service
            .run_request(AutomationRequest::text("com.example.shop", "Submit"))
            .await
            .unwrap();

        assert_eq!(outcome.failure(), Some(FailureReason::NotTriggered));
        assert!(started.elapsed() >= Duration::from_millis(30_000));
        assert!(started.elapsed() < Duration::from_millis(31_000));
        assert_eq!(service.orchestrator().state(), OrchestratorState::Idle);

        // 해제된 뒤 늦게 온 이벤트는 무시된다
        service.on_accessibility_event(AccessibilityEvent::window_state_changed("com.example.shop"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(device.gestures().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_in_progress_at_timeout_still_reports_its_outcome() {
        let device = shop_device();
        let mut config = AppConfig::default_config();
        // 정착 지연(1500ms)보다 짧아 실행 도중에 시간 제한이 걸린다
        config.automation.arm_timeout_ms = 1_000;
        let service = AutomationService::start(ports(&device), &config);
        service.attach_event_source(device.subscribe_events());

        let outcome = service
            .run_request(AutomationRequest::text("com.example.shop", "Submit"))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(device.tap_points(), vec![Point::new(120, 215)]);
    }
}
