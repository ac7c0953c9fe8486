//! 제스처 실행기 포트.
//!
//! 절대 화면 좌표 제스처를 플랫폼에 제출한다.
//! 제출 여부는 즉시 반환되고, 완료/취소는 콜백으로 나중에 도착한다.

use crate::models::geometry::Point;
use crate::models::gesture::{Gesture, GestureOutcome};

/// 제스처 완료 콜백 — 플랫폼 스레드에서 한 번만 호출된다
pub type GestureCallback = Box<dyn FnOnce(GestureOutcome) + Send>;

/// 플랫폼 제스처 실행기
///
/// 구현체: 실제 기기 바인딩, `SimulatedDevice`, `NoOpGestureExecutor`
pub trait GestureExecutor: Send + Sync {
    /// 플랫폼 API 레벨
    fn api_level(&self) -> u32;

    /// 화면 크기 (가로, 세로 픽셀)
    fn display_size(&self) -> (i32, i32);

    /// 제스처 제출. 플랫폼이 수락하면 true (완료 여부 아님)
    ///
    /// 거부되면 `callback`은 호출되지 않는다.
    fn dispatch_gesture(&self, gesture: &Gesture, callback: GestureCallback) -> bool;
}

/// 탭 표시 관찰자 — 디스패처가 제출 직전에 탭 좌표를 알린다
///
/// 관찰자는 제출 결과에 영향을 주지 않는다.
pub trait TapObserver: Send + Sync {
    fn on_tap(&self, point: Point);
}
