//! 자동화 오케스트레이터 — 접근성 이벤트 구동 상태 기계.
//!
//! 단일 tokio 태스크가 요청 상태를 전부 소유하고 `mpsc` 명령 큐를 소비한다.
//! 대상 앱 전면 이벤트를 받으면 정착 지연 → 탐색/탭 → (더블 탭이면) 지연 후 반복 → Idle.
//!
//! - 무장 중 재무장하면 이전 요청은 `Superseded`로 종료된다 (마지막 요청 우선).
//! - 실행 중에 들어온 명령은 큐에 남아 실행이 끝난 뒤 처리된다.
//!   진행 중인 실행은 중단되지 않으며, 두 실행이 겹치지 않는다.
//! - 모든 실패는 `RunOutcome`으로 무장한 호출자에게 전달되고 로그로도 남는다.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tapflow_core::config::AutomationConfig;
use tapflow_core::error::CoreError;
use tapflow_core::models::event::AccessibilityEvent;
use tapflow_core::models::geometry::Point;
use tapflow_core::models::outcome::{FailureReason, RunOutcome, RunStatus, TapRecord};
use tapflow_core::models::request::{AutomationRequest, ClickTarget, ScrollDirection};

use crate::gesture::GestureDispatcher;
use crate::locator::ElementLocator;
use crate::tree::FoundNode;

/// 오케스트레이터 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// 무장된 요청 없음
    Idle,
    /// 요청 수신, 대상 앱 전면 대기
    Armed,
    /// 대상 감지, 정착 지연 중
    Settling,
    /// 탐색 + 탭 실행 중
    Acting,
    /// 더블 탭 두 번째 라운드 대기
    AwaitingSecondTap,
}

impl OrchestratorState {
    /// 처리 대기 중인 요청이 있는지 (Idle 외 전부)
    pub fn is_pending(self) -> bool {
        self != Self::Idle
    }
}

enum Command {
    Arm {
        request: AutomationRequest,
        reply: oneshot::Sender<RunOutcome>,
    },
    Disarm {
        /// None이면 무조건 해제
        request_id: Option<String>,
    },
    Event(AccessibilityEvent),
}

struct ArmedRequest {
    request: AutomationRequest,
    reply: oneshot::Sender<RunOutcome>,
}

impl ArmedRequest {
    fn finish(self, status: RunStatus) {
        let outcome = RunOutcome::new(self.request.request_id.clone(), status);
        let _ = self.reply.send(outcome);
    }
}

// ============================================================
// 핸들
// ============================================================

/// 무장된 실행 — 최종 결과를 기다린다
#[derive(Debug)]
pub struct ArmedRun {
    request_id: String,
    receiver: oneshot::Receiver<RunOutcome>,
}

impl ArmedRun {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// 최종 결과 대기. 오케스트레이터가 종료되면 `ServiceStopped`
    pub async fn outcome(mut self) -> Result<RunOutcome, CoreError> {
        self.wait().await
    }

    /// `outcome`과 같지만 핸들을 소비하지 않는다 (시간 제한 후 재대기용)
    pub async fn wait(&mut self) -> Result<RunOutcome, CoreError> {
        (&mut self.receiver)
            .await
            .map_err(|_| CoreError::ServiceStopped)
    }
}

/// 오케스트레이터 핸들 (복제 가능)
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<OrchestratorState>,
}

impl OrchestratorHandle {
    /// 요청 무장
    pub async fn arm(&self, request: AutomationRequest) -> Result<ArmedRun, CoreError> {
        let (reply, receiver) = oneshot::channel();
        let request_id = request.request_id.clone();
        self.commands
            .send(Command::Arm { request, reply })
            .await
            .map_err(|_| CoreError::ServiceStopped)?;
        Ok(ArmedRun {
            request_id,
            receiver,
        })
    }

    /// 무장 해제 (실행 중인 시퀀스는 중단하지 않음)
    pub async fn disarm(&self) -> Result<(), CoreError> {
        self.commands
            .send(Command::Disarm { request_id: None })
            .await
            .map_err(|_| CoreError::ServiceStopped)
    }

    /// 특정 요청이 아직 무장 상태면 해제
    pub async fn disarm_request(&self, request_id: &str) -> Result<(), CoreError> {
        self.commands
            .send(Command::Disarm {
                request_id: Some(request_id.to_string()),
            })
            .await
            .map_err(|_| CoreError::ServiceStopped)
    }

    /// 접근성 이벤트 전달 — 블로킹하지 않는다. 큐가 가득 차면 버리고 false
    pub fn on_event(&self, event: AccessibilityEvent) -> bool {
        match self.commands.try_send(Command::Event(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("명령 큐 가득 참 — 접근성 이벤트 버림");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> OrchestratorState {
        *self.state.borrow()
    }

    /// 상태 변경 구독
    pub fn subscribe_state(&self) -> watch::Receiver<OrchestratorState> {
        self.state.clone()
    }

    /// 상태가 `target`이 될 때까지 대기
    pub async fn wait_for_state(&self, target: OrchestratorState) -> Result<(), CoreError> {
        let mut receiver = self.state.clone();
        receiver
            .wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| CoreError::ServiceStopped)
    }
}

// ============================================================
// Orchestrator
// ============================================================

/// 자동화 오케스트레이터 (태스크 본체)
pub struct Orchestrator {
    locator: ElementLocator,
    dispatcher: GestureDispatcher,
    settle_delay: Duration,
    scroll_settle_delay: Duration,
    gesture_timeout: Duration,
    state: watch::Sender<OrchestratorState>,
    commands: mpsc::Receiver<Command>,
}

impl Orchestrator {
    /// 오케스트레이터 태스크 시작 (tokio 런타임 안에서 호출)
    pub fn spawn(
        locator: ElementLocator,
        dispatcher: GestureDispatcher,
        config: &AutomationConfig,
    ) -> (OrchestratorHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(config.command_queue_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(OrchestratorState::Idle);

        let orchestrator = Self {
            locator,
            dispatcher,
            settle_delay: config.settle_delay(),
            scroll_settle_delay: config.scroll_settle_delay(),
            gesture_timeout: config.gesture_timeout(),
            state: state_tx,
            commands: command_rx,
        };
        let task = tokio::spawn(orchestrator.run());

        (
            OrchestratorHandle {
                commands: command_tx,
                state: state_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        info!("자동화 오케스트레이터 시작");
        let mut armed: Option<ArmedRequest> = None;

        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Arm { request, reply } => {
                    if let Some(previous) = armed.take() {
                        info!(
                            request_id = %previous.request.request_id,
                            "무장 요청 교체됨"
                        );
                        previous.finish(RunStatus::Superseded);
                    }
                    info!(
                        request_id = %request.request_id,
                        app_id = %request.target_app_id,
                        mode = request.target.mode_name(),
                        "자동화 요청 무장"
                    );
                    armed = Some(ArmedRequest { request, reply });
                    self.set_state(OrchestratorState::Armed);
                }
                Command::Disarm { request_id } => {
                    let matches = match (&armed, &request_id) {
                        (Some(current), Some(id)) => current.request.request_id == *id,
                        (Some(_), None) => true,
                        (None, _) => false,
                    };
                    if matches {
                        if let Some(current) = armed.take() {
                            info!(request_id = %current.request.request_id, "무장 해제");
                            current.finish(RunStatus::Disarmed);
                        }
                        self.set_state(OrchestratorState::Idle);
                    }
                }
                Command::Event(event) => {
                    let is_target = match (&armed, &event.package_name) {
                        (Some(current), Some(package)) => current.request.target_app_id == *package,
                        _ => false,
                    };
                    if !is_target {
                        continue;
                    }
                    if let Some(current) = armed.take() {
                        debug!(
                            request_id = %current.request.request_id,
                            event_type = ?event.event_type,
                            "대상 앱 감지"
                        );
                        let outcome = self.execute(&current.request).await;
                        self.set_state(OrchestratorState::Idle);
                        let _ = current.reply.send(outcome);
                    }
                }
            }
        }

        if let Some(current) = armed.take() {
            current.finish(RunStatus::Disarmed);
        }
        info!("자동화 오케스트레이터 종료");
    }

    fn set_state(&self, state: OrchestratorState) {
        self.state.send_replace(state);
    }

    /// 정착 지연 → 1라운드 → (더블 탭) 지연 → 2라운드
    async fn execute(&self, request: &AutomationRequest) -> RunOutcome {
        let request_id = request.request_id.as_str();
        let mut outcome = RunOutcome::new(request_id, RunStatus::Completed);

        self.set_state(OrchestratorState::Settling);
        tokio::time::sleep(self.settle_delay).await;

        let rounds: u8 = if request.double_tap { 2 } else { 1 };
        for round in 1..=rounds {
            if round > 1 {
                self.set_state(OrchestratorState::AwaitingSecondTap);
                debug!(
                    request_id,
                    delay_ms = request.double_tap_delay_ms,
                    "더블 탭 두 번째 라운드 대기"
                );
                tokio::time::sleep(Duration::from_millis(request.double_tap_delay_ms)).await;
            }

            self.set_state(OrchestratorState::Acting);
            match self.act(request, round).await {
                Ok(record) => outcome.taps.push(record),
                Err(reason) => {
                    warn!(request_id, round, %reason, "자동화 실행 실패");
                    outcome.status = RunStatus::Failed(reason);
                    return outcome;
                }
            }
        }

        info!(request_id, taps = outcome.taps.len(), "자동화 실행 완료");
        outcome
    }

    /// 한 라운드: 모드별 대상 해석 후 탭
    async fn act(&self, request: &AutomationRequest, round: u8) -> Result<TapRecord, FailureReason> {
        let point = match &request.target {
            ClickTarget::Coordinates { x, y } => {
                let point = Point::new(*x, *y);
                if !point.is_non_negative() {
                    return Err(FailureReason::InvalidTarget);
                }
                if request.scroll_before_click != ScrollDirection::None {
                    let root = self.locator.tree().root();
                    self.scroll(root.as_ref(), request.scroll_before_click).await;
                }
                point
            }
            ClickTarget::Text { text } => {
                let root = self.acquire_root()?;
                let root = if request.scroll_before_click != ScrollDirection::None {
                    self.scroll(Some(&root), request.scroll_before_click).await;
                    self.acquire_root()?
                } else {
                    root
                };
                let Some(node) = self.locator.find_text_target(&root.handle, text) else {
                    debug!(text = %text, "텍스트 대상 미발견");
                    return Err(FailureReason::NotFound);
                };
                self.locator.clickable_target_point(&node)
            }
            ClickTarget::Anchor {
                text,
                description,
                offset_x,
                offset_y,
            } => {
                let direction = match request.scroll_before_click {
                    ScrollDirection::Bottom => ScrollDirection::Bottom,
                    _ => ScrollDirection::Top,
                };
                let root = self.acquire_root()?;
                self.scroll(Some(&root), direction).await;

                // 스크롤 후 루트가 무효화되었을 수 있다
                let root = self.acquire_root()?;
                let Some((anchor, strategy)) = self.locator.find_anchor(&root.handle, text, description)
                else {
                    debug!(anchor_text = %text, anchor_description = %description, "앵커 미발견");
                    return Err(FailureReason::NotFound);
                };
                let point = ElementLocator::resolve_anchor_offset(&anchor.info, *offset_x, *offset_y);
                debug!(?strategy, x = point.x, y = point.y, "앵커 기준 탭 좌표");
                point
            }
        };

        self.tap(point, round).await
    }

    fn acquire_root(&self) -> Result<FoundNode, FailureReason> {
        self.locator
            .tree()
            .root()
            .ok_or(FailureReason::RootUnavailable)
    }

    async fn scroll(&self, root: Option<&FoundNode>, direction: ScrollDirection) {
        let scrollable = root.and_then(|root| self.locator.find_scrollable(&root.handle));
        let issued = self
            .dispatcher
            .scroll_to_edge(scrollable.as_ref().map(|n| &n.handle), direction);
        debug!(direction = direction.name(), issued, "클릭 전 스크롤");
        tokio::time::sleep(self.scroll_settle_delay).await;
    }

    async fn tap(&self, point: Point, round: u8) -> Result<TapRecord, FailureReason> {
        if !self.dispatcher.supports_gestures() {
            return Err(FailureReason::PlatformTooOld);
        }
        let pending = self.dispatcher.tap(point);
        if !pending.dispatched() {
            return Err(FailureReason::DispatchRejected);
        }
        let result = pending.wait(self.gesture_timeout).await;
        info!(x = point.x, y = point.y, round, completed = result.completed, "탭 실행");
        Ok(TapRecord {
            round,
            point,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::{NodeFixture, SimulatedDevice};
    use crate::gesture::DispatchSettings;
    use crate::tree::{TraversalLimits, TreeAccessor};

    fn spawn(device: &SimulatedDevice) -> OrchestratorHandle {
        let config = AutomationConfig::default();
        let tree = TreeAccessor::new(Arc::new(device.clone()), TraversalLimits::from_config(&config));
        let dispatcher = GestureDispatcher::new(
            Arc::new(device.clone()),
            DispatchSettings::from_config(&config),
        );
        let (handle, _task) = Orchestrator::spawn(ElementLocator::new(tree), dispatcher, &config);
        handle
    }

    #[tokio::test(start_paused = true)]
    async fn events_from_other_packages_are_ignored() {
        let device = SimulatedDevice::new();
        let handle = spawn(&device);

        let run = handle
            .arm(AutomationRequest::coordinates("com.target", Point::new(5, 5)))
            .await
            .unwrap();
        handle.wait_for_state(OrchestratorState::Armed).await.unwrap();

        handle.on_event(AccessibilityEvent::window_state_changed("com.other"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.state(), OrchestratorState::Armed);
        assert!(device.gestures().is_empty());

        handle.on_event(AccessibilityEvent::window_state_changed("com.target"));
        let outcome = run.outcome().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.tap_points(), vec![Point::new(5, 5)]);
        assert_eq!(handle.state(), OrchestratorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_precedes_tap() {
        let device = SimulatedDevice::new();
        let handle = spawn(&device);

        let run = handle
            .arm(AutomationRequest::coordinates("com.target", Point::new(5, 5)))
            .await
            .unwrap();
        let start = tokio::time::Instant::now();
        handle.on_event(AccessibilityEvent::window_state_changed("com.target"));
        run.outcome().await.unwrap();

        let gestures = device.gestures();
        assert!(gestures[0].at - start >= Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_supersedes_previous_request() {
        let device = SimulatedDevice::new();
        let handle = spawn(&device);

        let first = handle
            .arm(AutomationRequest::coordinates("com.a", Point::new(1, 1)))
            .await
            .unwrap();
        let second = handle
            .arm(AutomationRequest::coordinates("com.b", Point::new(2, 2)))
            .await
            .unwrap();

        assert_eq!(first.outcome().await.unwrap().status, RunStatus::Superseded);

        handle.on_event(AccessibilityEvent::window_state_changed("com.a"));
        handle.on_event(AccessibilityEvent::window_state_changed("com.b"));
        let outcome = second.outcome().await.unwrap();
        assert_eq!(outcome.tap_points(), vec![Point::new(2, 2)]);
        assert_eq!(device.tap_points(), vec![Point::new(2, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_resolves_armed_caller() {
        let device = SimulatedDevice::new();
        let handle = spawn(&device);

        let run = handle
            .arm(AutomationRequest::coordinates("com.a", Point::new(1, 1)))
            .await
            .unwrap();
        handle.disarm_request("some-other-id").await.unwrap();
        handle.disarm_request(run.request_id()).await.unwrap();

        assert_eq!(run.outcome().await.unwrap().status, RunStatus::Disarmed);
        assert_eq!(handle.state(), OrchestratorState::Idle);

        handle.on_event(AccessibilityEvent::window_state_changed("com.a"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(device.gestures().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn negative_coordinates_are_invalid() {
        let device = SimulatedDevice::new();
        let handle = spawn(&device);

        let run = handle
            .arm(AutomationRequest::coordinates("com.a", Point::new(-1, 10)))
            .await
            .unwrap();
        handle.on_event(AccessibilityEvent::window_state_changed("com.a"));

        let outcome = run.outcome().await.unwrap();
        assert_eq!(outcome.failure(), Some(FailureReason::InvalidTarget));
        assert!(device.gestures().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn old_platform_reports_platform_too_old() {
        let device = SimulatedDevice::new().with_api_level(21);
        device.show("com.a", NodeFixture::new().text("OK").bounds(0, 0, 10, 10));
        let handle = spawn(&device);

        let run = handle.arm(AutomationRequest::text("com.a", "OK")).await.unwrap();
        handle.on_event(AccessibilityEvent::window_state_changed("com.a"));

        let outcome = run.outcome().await.unwrap();
        assert_eq!(outcome.failure(), Some(FailureReason::PlatformTooOld));
        assert_eq!(handle.state(), OrchestratorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn arm_during_run_waits_for_current_sequence() {
        let device = SimulatedDevice::new();
        let handle = spawn(&device);

        let first = handle
            .arm(AutomationRequest::coordinates("com.a", Point::new(1, 1)).with_double_tap(1_000))
            .await
            .unwrap();
        handle.on_event(AccessibilityEvent::window_state_changed("com.a"));
        handle.wait_for_state(OrchestratorState::Settling).await.unwrap();

        // 실행 중 무장 — 현재 시퀀스가 끝난 뒤 처리된다
        let second = handle
            .arm(AutomationRequest::coordinates("com.a", Point::new(2, 2)))
            .await
            .unwrap();

        let outcome = first.outcome().await.unwrap();
        assert_eq!(outcome.tap_points(), vec![Point::new(1, 1), Point::new(1, 1)]);

        handle.wait_for_state(OrchestratorState::Armed).await.unwrap();
        handle.on_event(AccessibilityEvent::window_state_changed("com.a"));
        let outcome = second.outcome().await.unwrap();
        assert_eq!(outcome.tap_points(), vec![Point::new(2, 2)]);
        assert_eq!(
            device.tap_points(),
            vec![Point::new(1, 1), Point::new(1, 1), Point::new(2, 2)]
        );
    }
}
