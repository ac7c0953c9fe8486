//! 탭 위치 표시 오버레이.
//!
//! 디스패처의 탭 관찰자로 연결되어 마지막 탭 위치에 링 + 점 마커를 잠시 띄운다.
//! 항상 제거 후 추가하며, 자동 숨김 타이머는 자신이 띄운 세대의 마커만 제거한다.
//! 제스처 제출 결과에는 관여하지 않는다.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tapflow_core::config::OverlayConfig;
use tapflow_core::models::geometry::Point;
use tapflow_core::ports::gesture::TapObserver;
use tapflow_core::ports::overlay::OverlayWindow;

/// 탭 표시기
pub struct TapIndicator {
    window: Arc<dyn OverlayWindow>,
    config: OverlayConfig,
    /// 현재 표시 중인 마커 세대 (0 = 없음)
    generation: Arc<Mutex<u64>>,
}

impl TapIndicator {
    pub fn new(window: Arc<dyn OverlayWindow>, config: OverlayConfig) -> Self {
        Self {
            window,
            config,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    /// 마커 표시. 이전 마커는 먼저 제거한다. 표시된 세대 번호 반환
    pub fn show(&self, point: Point) -> Option<u64> {
        if !self.config.enabled {
            return None;
        }

        let generation = {
            let mut current = self.generation.lock();
            self.window.remove_marker();
            if !self.window.add_marker(point, &self.config.marker) {
                debug!(x = point.x, y = point.y, "오버레이 추가 실패 — 표시 생략");
                *current = 0;
                return None;
            }
            *current += 1;
            *current
        };

        self.schedule_hide(generation);
        Some(generation)
    }

    /// 현재 마커 즉시 제거
    pub fn hide(&self) {
        let mut current = self.generation.lock();
        if *current != 0 {
            self.window.remove_marker();
        }
        *current = 0;
    }

    fn schedule_hide(&self, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("런타임 없음 — 자동 숨김 생략");
            return;
        };
        let window = Arc::clone(&self.window);
        let state = Arc::clone(&self.generation);
        let duration = self.config.duration();
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let mut current = state.lock();
            if *current == generation {
                window.remove_marker();
                *current = 0;
                debug!(generation, "탭 마커 자동 숨김");
            }
        });
    }
}

impl TapObserver for TapIndicator {
    fn on_tap(&self, point: Point) {
        self.show(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{OverlayOp, SimulatedDevice};
    use std::time::Duration;

    fn indicator(device: &SimulatedDevice) -> TapIndicator {
        TapIndicator::new(Arc::new(device.clone()), OverlayConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn marker_auto_hides_after_duration() {
        let device = SimulatedDevice::new();
        let indicator = indicator(&device);

        indicator.show(Point::new(10, 20));
        assert_eq!(device.marker(), Some(Point::new(10, 20)));

        tokio::time::sleep(Duration::from_millis(799)).await;
        assert_eq!(device.marker(), Some(Point::new(10, 20)));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(device.marker(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_reshow_removes_before_add_and_keeps_newest() {
        let device = SimulatedDevice::new();
        let indicator = indicator(&device);

        indicator.show(Point::new(1, 1));
        tokio::time::sleep(Duration::from_millis(500)).await;
        indicator.show(Point::new(2, 2));

        // 첫 마커의 타이머가 만료되어도 두 번째 마커는 남는다
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(device.marker(), Some(Point::new(2, 2)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(device.marker(), None);

        let ops = device.overlay_ops();
        assert_eq!(ops[0], OverlayOp::Removed);
        assert_eq!(ops[1], OverlayOp::Added(Point::new(1, 1)));
        assert_eq!(ops[2], OverlayOp::Removed);
        assert_eq!(ops[3], OverlayOp::Added(Point::new(2, 2)));
        assert!(device.max_concurrent_markers() <= 1);
    }

    #[tokio::test]
    async fn disabled_indicator_does_nothing() {
        let device = SimulatedDevice::new();
        let config = OverlayConfig {
            enabled: false,
            ..OverlayConfig::default()
        };
        let indicator = TapIndicator::new(Arc::new(device.clone()), config);

        assert_eq!(indicator.show(Point::new(1, 1)), None);
        assert!(device.overlay_ops().is_empty());
    }

    #[tokio::test]
    async fn overlay_denied_is_tolerated() {
        let device = SimulatedDevice::new().with_overlay_allowed(false);
        let indicator = indicator(&device);

        assert_eq!(indicator.show(Point::new(1, 1)), None);
        assert_eq!(device.marker(), None);
        indicator.hide();
    }
}
