//! 오버레이 창 포트.

use serde::{Deserialize, Serialize};

use crate::models::geometry::Point;

/// 탭 마커 모양 (링 + 점 + 흰 중심)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub ring_radius: u32,
    pub ring_stroke: u32,
    pub dot_radius: u32,
    pub center_radius: u32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            ring_radius: 40,
            ring_stroke: 6,
            dot_radius: 20,
            center_radius: 8,
        }
    }
}

/// 화면 위 오버레이 창 관리자
///
/// 한 번에 마커 하나만 존재한다. 새 마커 추가 전에 반드시 `remove_marker`를 호출한다.
pub trait OverlayWindow: Send + Sync {
    /// 마커 추가. 플랫폼이 오버레이를 허용하지 않으면 false
    fn add_marker(&self, point: Point, style: &MarkerStyle) -> bool;

    /// 현재 마커 제거 (없으면 무시)
    fn remove_marker(&self);
}
