//! 실행 결과/스케줄 알림 버스.
//!
//! 러너와 스케줄러가 발행하고 `schedule` 명령이 구독해 출력한다.
//! 느린 구독자는 `Lagged`로 오래된 알림을 잃는다.

use tokio::sync::broadcast;
use tracing::debug;

use tapflow_core::models::outcome::RunOutcome;

const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
pub enum AppEvent {
    ShortcutFinished {
        shortcut_id: String,
        outcome: RunOutcome,
    },
    GroupFinished {
        group_id: String,
        succeeded: usize,
        failed: usize,
    },
    /// 스케줄 태스크 등록 (`key`는 `shortcut_<id>` / `group_<id>`)
    Scheduled { key: String, interval_minutes: u64 },
    /// 취소되었거나 대상이 삭제되어 태스크 종료
    Unscheduled { key: String },
}

impl AppEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShortcutFinished { .. } => "shortcut_finished",
            Self::GroupFinished { .. } => "group_finished",
            Self::Scheduled { .. } => "scheduled",
            Self::Unscheduled { .. } => "unscheduled",
        }
    }

    /// 알림 대상 (단축키/그룹 ID 또는 스케줄 키)
    pub fn subject(&self) -> &str {
        match self {
            Self::ShortcutFinished { shortcut_id, .. } => shortcut_id,
            Self::GroupFinished { group_id, .. } => group_id,
            Self::Scheduled { key, .. } | Self::Unscheduled { key } => key,
        }
    }
}

pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// 알림 발행. 받은 구독자 수 반환 (없으면 0, 알림은 버려진다)
    pub fn publish(&self, event: AppEvent) -> usize {
        let kind = event.kind();
        let subject = event.subject().to_string();
        let receivers = self.tx.send(event).unwrap_or(0);
        debug!(kind, subject = %subject, receivers, "알림 발행");
        receivers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
