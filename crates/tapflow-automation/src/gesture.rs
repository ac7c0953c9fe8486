//! 제스처 디스패처.
//!
//! 탭/스와이프 제스처를 만들어 플랫폼 제스처 실행기에 제출한다.
//! 제출 수락 여부는 즉시, 완료/취소는 [`PendingGesture::wait`]로 나중에 확인한다.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use tapflow_core::config::AutomationConfig;
use tapflow_core::models::geometry::Point;
use tapflow_core::models::gesture::{Gesture, GestureOutcome, GestureResult};
use tapflow_core::models::node::NodeAction;
use tapflow_core::models::request::ScrollDirection;
use tapflow_core::ports::accessibility::NodeHandle;
use tapflow_core::ports::gesture::{GestureExecutor, TapObserver};

/// 디스패처 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub tap_duration_ms: u64,
    pub swipe_duration_ms: u64,
    pub min_api_level: u32,
    pub scroll_repeat_count: u32,
}

impl DispatchSettings {
    pub fn from_config(config: &AutomationConfig) -> Self {
        Self {
            tap_duration_ms: config.tap_duration_ms,
            swipe_duration_ms: config.swipe_duration_ms,
            min_api_level: config.min_gesture_api_level,
            scroll_repeat_count: config.scroll_repeat_count,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&AutomationConfig::default())
    }
}

// ============================================================
// PendingGesture — 제출된 제스처의 완료 대기
// ============================================================

/// 제출된 제스처
#[derive(Debug)]
pub struct PendingGesture {
    receiver: Option<oneshot::Receiver<GestureOutcome>>,
}

impl PendingGesture {
    fn rejected() -> Self {
        Self { receiver: None }
    }

    /// 플랫폼이 제출을 수락했는지
    pub fn dispatched(&self) -> bool {
        self.receiver.is_some()
    }

    /// 완료/취소 콜백 대기
    ///
    /// 타임아웃이거나 플랫폼이 콜백 없이 제스처를 버리면 `dispatched`만 true인 결과.
    pub async fn wait(self, timeout: Duration) -> GestureResult {
        let Some(receiver) = self.receiver else {
            return GestureResult::rejected();
        };
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => GestureResult::from_outcome(outcome),
            Ok(Err(_)) => {
                debug!("제스처 콜백 없이 종료");
                GestureResult::pending()
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "제스처 완료 대기 타임아웃");
                GestureResult::pending()
            }
        }
    }
}

// ============================================================
// GestureDispatcher
// ============================================================

/// 제스처 디스패처 — API 레벨 게이트 + 탭 관찰자 알림 + 제출
#[derive(Clone)]
pub struct GestureDispatcher {
    executor: Arc<dyn GestureExecutor>,
    observer: Option<Arc<dyn TapObserver>>,
    settings: DispatchSettings,
}

impl GestureDispatcher {
    pub fn new(executor: Arc<dyn GestureExecutor>, settings: DispatchSettings) -> Self {
        Self {
            executor,
            observer: None,
            settings,
        }
    }

    /// 탭 관찰자 (오버레이) 연결
    pub fn with_observer(mut self, observer: Arc<dyn TapObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// 플랫폼이 제스처 API를 지원하는지
    pub fn supports_gestures(&self) -> bool {
        self.executor.api_level() >= self.settings.min_api_level
    }

    /// 단일 지점 탭
    pub fn tap(&self, point: Point) -> PendingGesture {
        if !self.supports_gestures() {
            warn!(
                api_level = self.executor.api_level(),
                min_api_level = self.settings.min_api_level,
                "제스처 API 미지원 — 탭 생략"
            );
            return PendingGesture::rejected();
        }

        if let Some(observer) = &self.observer {
            observer.on_tap(point);
        }

        let gesture = Gesture::tap(point, self.settings.tap_duration_ms);
        let pending = self.submit(&gesture);
        debug!(x = point.x, y = point.y, dispatched = pending.dispatched(), "탭 제출");
        pending
    }

    /// 직선 스와이프
    pub fn swipe(&self, start: Point, end: Point, duration_ms: u64) -> PendingGesture {
        if !self.supports_gestures() {
            warn!("제스처 API 미지원 — 스와이프 생략");
            return PendingGesture::rejected();
        }
        let pending = self.submit(&Gesture::swipe(start, end, duration_ms));
        debug!(
            from_y = start.y,
            to_y = end.y,
            dispatched = pending.dispatched(),
            "스와이프 제출"
        );
        pending
    }

    /// 가장자리 폴백 스와이프
    ///
    /// 화면 가로 중앙의 세로선, 높이 30%~70% 구간.
    /// 맨 위로는 아래로 끌고(30%→70%), 맨 아래로는 위로 끈다(70%→30%).
    pub fn edge_swipe(&self, direction: ScrollDirection) -> PendingGesture {
        let (width, height) = self.executor.display_size();
        let x = width / 2;
        let upper = Point::new(x, height * 3 / 10);
        let lower = Point::new(x, height * 7 / 10);
        match direction {
            ScrollDirection::Top => self.swipe(upper, lower, self.settings.swipe_duration_ms),
            ScrollDirection::Bottom => self.swipe(lower, upper, self.settings.swipe_duration_ms),
            ScrollDirection::None => PendingGesture::rejected(),
        }
    }

    /// 가장자리까지 스크롤
    ///
    /// 스크롤 가능 노드가 있으면 고정 횟수만큼 이산 스크롤 액션을 반복하고
    /// (가장자리 도달 여부는 감지하지 않음), 없거나 액션이 모두 거부되면 폴백 스와이프.
    /// 무언가 제출했으면 true.
    pub fn scroll_to_edge(&self, scrollable: Option<&NodeHandle>, direction: ScrollDirection) -> bool {
        let action = match direction {
            ScrollDirection::None => return false,
            ScrollDirection::Top => NodeAction::ScrollBackward,
            ScrollDirection::Bottom => NodeAction::ScrollForward,
        };

        if let Some(node) = scrollable {
            let accepted = (0..self.settings.scroll_repeat_count)
                .filter(|_| node.perform_action(action))
                .count();
            debug!(
                direction = direction.name(),
                accepted,
                repeat = self.settings.scroll_repeat_count,
                "스크롤 액션 반복"
            );
            if accepted > 0 {
                return true;
            }
        }

        debug!(direction = direction.name(), "스크롤 노드 없음 — 스와이프 폴백");
        self.edge_swipe(direction).dispatched()
    }

    fn submit(&self, gesture: &Gesture) -> PendingGesture {
        let (tx, rx) = oneshot::channel();
        let callback = Box::new(move |outcome: GestureOutcome| {
            debug!(?outcome, "제스처 콜백 수신");
            let _ = tx.send(outcome);
        });
        if self.executor.dispatch_gesture(gesture, callback) {
            PendingGesture { receiver: Some(rx) }
        } else {
            warn!("플랫폼이 제스처 제출을 거부");
            PendingGesture::rejected()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GestureBehavior, NodeFixture, SimulatedDevice};
    use parking_lot::Mutex;
    use tapflow_core::ports::accessibility::WindowAccessor;

    #[derive(Default)]
    struct RecordingObserver {
        taps: Mutex<Vec<Point>>,
    }

    impl TapObserver for RecordingObserver {
        fn on_tap(&self, point: Point) {
            self.taps.lock().push(point);
        }
    }

    fn dispatcher(device: &SimulatedDevice) -> GestureDispatcher {
        GestureDispatcher::new(Arc::new(device.clone()), DispatchSettings::default())
    }

    #[tokio::test]
    async fn tap_completes_and_notifies_observer() {
        let device = SimulatedDevice::new();
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = dispatcher(&device).with_observer(observer.clone());

        let pending = dispatcher.tap(Point::new(120, 215));
        assert!(pending.dispatched());
        let result = pending.wait(Duration::from_secs(1)).await;
        assert!(result.completed);

        assert_eq!(device.tap_points(), vec![Point::new(120, 215)]);
        assert_eq!(*observer.taps.lock(), vec![Point::new(120, 215)]);
        assert_eq!(device.gestures()[0].gesture.strokes[0].duration_ms, 100);
    }

    #[tokio::test]
    async fn old_platform_fails_closed() {
        let device = SimulatedDevice::new().with_api_level(23);
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = dispatcher(&device).with_observer(observer.clone());

        let pending = dispatcher.tap(Point::new(1, 1));
        assert!(!pending.dispatched());
        assert!(!pending.wait(Duration::from_millis(10)).await.dispatched);
        assert!(device.gestures().is_empty());
        assert!(observer.taps.lock().is_empty());
    }

    #[tokio::test]
    async fn rejected_dispatch_is_reported() {
        let device = SimulatedDevice::new().with_gesture_behavior(GestureBehavior::Reject);
        let pending = dispatcher(&device).tap(Point::new(5, 5));
        assert!(!pending.dispatched());
    }

    #[tokio::test]
    async fn cancelled_gesture_is_reported() {
        let device = SimulatedDevice::new().with_gesture_behavior(GestureBehavior::Cancel);
        let result = dispatcher(&device)
            .tap(Point::new(5, 5))
            .wait(Duration::from_secs(1))
            .await;
        assert!(result.dispatched && result.cancelled && !result.completed);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_gesture_times_out_as_pending() {
        let device = SimulatedDevice::new().with_gesture_behavior(GestureBehavior::Silent);
        let result = dispatcher(&device)
            .tap(Point::new(5, 5))
            .wait(Duration::from_millis(500))
            .await;
        assert_eq!(result, GestureResult::pending());
    }

    #[test]
    fn scroll_without_scrollable_node_swipes() {
        let device = SimulatedDevice::new().with_display_size(1000, 2000);
        let dispatcher = dispatcher(&device);

        assert!(dispatcher.scroll_to_edge(None, ScrollDirection::Top));
        assert!(dispatcher.scroll_to_edge(None, ScrollDirection::Bottom));
        assert!(!dispatcher.scroll_to_edge(None, ScrollDirection::None));

        let gestures = device.gestures();
        assert_eq!(gestures.len(), 2);
        let top = &gestures[0].gesture.strokes[0];
        assert_eq!(top.path, vec![Point::new(500, 600), Point::new(500, 1400)]);
        assert_eq!(top.duration_ms, 300);
        let bottom = &gestures[1].gesture.strokes[0];
        assert_eq!(bottom.path, vec![Point::new(500, 1400), Point::new(500, 600)]);
    }

    #[test]
    fn scroll_on_node_repeats_discrete_actions() {
        let device = SimulatedDevice::new();
        device.show(
            "com.example",
            NodeFixture::new().text("list").scrollable(true),
        );
        let root = device.root_in_active_window().unwrap();

        assert!(dispatcher(&device).scroll_to_edge(Some(&root), ScrollDirection::Top));
        let actions = device.actions();
        assert_eq!(actions.len(), 5);
        assert!(actions.iter().all(|a| a.action == NodeAction::ScrollBackward));
        assert!(device.gestures().is_empty());
    }
}
