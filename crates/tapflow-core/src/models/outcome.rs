//! 자동화 실행 결과 모델.
//!
//! 무장한 호출자에게 돌려주는 완료/실패 신호.
//! 실패는 프로세스에 치명적이지 않으며 재시도하지 않는다.

use serde::{Deserialize, Serialize};

use super::geometry::Point;
use super::gesture::GestureResult;

/// 실행 실패 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// 활성 창 루트 노드 없음
    RootUnavailable,
    /// 대상/앵커 요소 미발견
    NotFound,
    /// 제스처 API 미지원 플랫폼 버전
    PlatformTooOld,
    /// 대상 앱 실행 실패
    LaunchFailed,
    /// 플랫폼이 제스처 제출을 거부
    DispatchRejected,
    /// 좌표 모드인데 좌표가 음수 (미설정)
    InvalidTarget,
    /// 대기 시간 안에 대상 앱 전면 이벤트를 받지 못함
    NotTriggered,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::RootUnavailable => "활성 창 루트 없음",
            Self::NotFound => "대상 요소 미발견",
            Self::PlatformTooOld => "제스처 API 미지원 플랫폼",
            Self::LaunchFailed => "앱 실행 실패",
            Self::DispatchRejected => "제스처 제출 거부",
            Self::InvalidTarget => "유효하지 않은 클릭 대상",
            Self::NotTriggered => "대상 앱 전면 이벤트 미수신",
        };
        f.write_str(text)
    }
}

/// 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// 모든 라운드가 탭을 제출함
    Completed,
    /// 라운드 중 하나가 실패
    Failed(FailureReason),
    /// 실행 전에 다른 요청으로 교체됨
    Superseded,
    /// 실행 전에 무장 해제됨
    Disarmed,
}

/// 제출된 탭 하나의 기록
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapRecord {
    /// 라운드 번호 (1 = 첫 탭, 2 = 더블 탭 두 번째)
    pub round: u8,
    pub point: Point,
    pub result: GestureResult,
}

/// 요청 하나의 최종 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub request_id: String,
    pub status: RunStatus,
    /// 제출된 탭 목록 (라운드 순)
    pub taps: Vec<TapRecord>,
}

impl RunOutcome {
    pub fn new(request_id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            request_id: request_id.into(),
            status,
            taps: Vec::new(),
        }
    }

    pub fn failed(request_id: impl Into<String>, reason: FailureReason) -> Self {
        Self::new(request_id, RunStatus::Failed(reason))
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// 실패 사유 (성공/교체/해제면 None)
    pub fn failure(&self) -> Option<FailureReason> {
        match self.status {
            RunStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// 제출된 탭 좌표 목록
    pub fn tap_points(&self) -> Vec<Point> {
        self.taps.iter().map(|t| t.point).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_accessor() {
        let outcome = RunOutcome::failed("r-1", FailureReason::NotFound);
        assert_eq!(outcome.failure(), Some(FailureReason::NotFound));
        assert!(!outcome.is_success());

        let outcome = RunOutcome::new("r-2", RunStatus::Superseded);
        assert_eq!(outcome.failure(), None);
    }

    #[test]
    fn outcome_serde_roundtrip() {
        let mut outcome = RunOutcome::new("r-3", RunStatus::Completed);
        outcome.taps.push(TapRecord {
            round: 1,
            point: Point::new(120, 215),
            result: GestureResult::pending(),
        });
        let json = serde_json::to_string(&outcome).unwrap();
        let back: RunOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
        assert_eq!(back.tap_points(), vec![Point::new(120, 215)]);
    }
}
