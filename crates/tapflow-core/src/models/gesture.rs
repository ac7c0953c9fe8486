//! 제스처 모델.
//!
//! 플랫폼 제스처 실행기에 제출하는 스트로크 묘사와 실행 결과.

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// 단일 스트로크 — 경로를 따라 `duration_ms` 동안 누름
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stroke {
    /// 경로 점 목록 (한 점이면 탭)
    pub path: Vec<Point>,
    /// 제스처 시작 기준 지연 (밀리초)
    pub start_time_ms: u64,
    /// 스트로크 지속 시간 (밀리초)
    pub duration_ms: u64,
}

/// 제출할 제스처
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gesture {
    pub strokes: Vec<Stroke>,
}

impl Gesture {
    /// 단일 지점 탭
    pub fn tap(point: Point, duration_ms: u64) -> Self {
        Self {
            strokes: vec![Stroke {
                path: vec![point],
                start_time_ms: 0,
                duration_ms,
            }],
        }
    }

    /// 직선 스와이프
    pub fn swipe(start: Point, end: Point, duration_ms: u64) -> Self {
        Self {
            strokes: vec![Stroke {
                path: vec![start, end],
                start_time_ms: 0,
                duration_ms,
            }],
        }
    }

    /// 단일 지점 탭이면 그 좌표
    pub fn tap_point(&self) -> Option<Point> {
        match self.strokes.as_slice() {
            [stroke] if stroke.path.len() == 1 => Some(stroke.path[0]),
            _ => None,
        }
    }
}

/// 플랫폼 콜백이 알려주는 제스처 최종 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureOutcome {
    Completed,
    Cancelled,
}

/// 제스처 실행 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureResult {
    /// 플랫폼이 제출을 수락했는지
    pub dispatched: bool,
    /// 완료 콜백 수신
    pub completed: bool,
    /// 취소 콜백 수신
    pub cancelled: bool,
}

impl GestureResult {
    /// 제출 거부
    pub fn rejected() -> Self {
        Self::default()
    }

    /// 제출은 되었으나 콜백 미수신 (타임아웃 등)
    pub fn pending() -> Self {
        Self {
            dispatched: true,
            ..Self::default()
        }
    }

    pub fn from_outcome(outcome: GestureOutcome) -> Self {
        Self {
            dispatched: true,
            completed: outcome == GestureOutcome::Completed,
            cancelled: outcome == GestureOutcome::Cancelled,
        }
    }
}
