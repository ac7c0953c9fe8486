//! 단축키 / 이벤트 그룹 실행기.
//!
//! 저장된 단축키를 자동화 요청으로 바꿔 서비스에 넘기고 결과를 이벤트 버스로 알린다.
//! 실행은 한 번에 하나씩만 진행된다 (오케스트레이터의 재무장 교체를 피하기 위해).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use tapflow_automation::AutomationService;
use tapflow_core::config::AutomationConfig;
use tapflow_core::error::CoreError;
use tapflow_core::models::outcome::RunOutcome;
use tapflow_core::models::shortcut::ClickShortcut;
use tapflow_core::ports::storage::ShortcutStore;

use crate::event_bus::{AppEvent, EventBus};

/// 그룹 실행 결과
#[derive(Debug, Clone, Default)]
pub struct GroupRunReport {
    pub group_id: String,
    /// (이벤트 ID, 결과) — 실행 순서
    pub outcomes: Vec<(String, RunOutcome)>,
}

impl GroupRunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// 단축키 실행기
pub struct ShortcutRunner {
    service: Arc<AutomationService>,
    store: Arc<dyn ShortcutStore>,
    bus: Arc<EventBus>,
    settle_delay: Duration,
    run_lock: Mutex<()>,
}

impl ShortcutRunner {
    pub fn new(
        service: Arc<AutomationService>,
        store: Arc<dyn ShortcutStore>,
        bus: Arc<EventBus>,
        config: &AutomationConfig,
    ) -> Self {
        Self {
            service,
            store,
            bus,
            settle_delay: config.settle_delay(),
            run_lock: Mutex::new(()),
        }
    }

    /// ID로 단축키 실행
    pub async fn run_shortcut_by_id(&self, id: &str) -> Result<RunOutcome, CoreError> {
        let shortcut = self
            .store
            .get_shortcut(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Shortcut", id))?;
        self.run_shortcut(&shortcut).await
    }

    /// 단축키 한 건 실행
    pub async fn run_shortcut(&self, shortcut: &ClickShortcut) -> Result<RunOutcome, CoreError> {
        let _guard = self.run_lock.lock().await;
        self.execute(shortcut).await
    }

    /// 그룹 이벤트 순차 실행
    ///
    /// 다음 이벤트는 이전 이벤트 시작 시점부터
    /// 정착 지연 + 이전 이벤트의 `delay_after_ms` (+ 더블 탭 지연) 뒤에 시작한다.
    /// 실패한 이벤트가 있어도 나머지는 계속 실행한다.
    pub async fn run_group(&self, group_id: &str) -> Result<GroupRunReport, CoreError> {
        let group = self
            .store
            .get_group(group_id)
            .await?
            .ok_or_else(|| CoreError::not_found("EventGroup", group_id))?;
        let events = self.store.events_for_group(group_id).await?;

        let mut report = GroupRunReport {
            group_id: group_id.to_string(),
            outcomes: Vec::with_capacity(events.len()),
        };
        if events.is_empty() {
            info!(group = %group.name, "그룹에 이벤트 없음");
            return Ok(report);
        }

        let _guard = self.run_lock.lock().await;
        info!(group = %group.name, count = events.len(), "그룹 실행 시작");

        let mut next_start = Instant::now();
        for (index, event) in events.iter().enumerate() {
            tokio::time::sleep_until(next_start).await;
            let started = Instant::now();

            let outcome = self.execute(event).await?;
            debug!(
                group = %group.name,
                step = index + 1,
                total = events.len(),
                event = %event.name,
                "그룹 이벤트 실행"
            );
            report.outcomes.push((event.id.clone(), outcome));
            next_start = started + self.spacing_after(event);
        }

        info!(
            group = %group.name,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "그룹 실행 완료"
        );
        self.bus.publish(AppEvent::GroupFinished {
            group_id: group_id.to_string(),
            succeeded: report.succeeded(),
            failed: report.failed(),
        });
        Ok(report)
    }

    fn spacing_after(&self, event: &ClickShortcut) -> Duration {
        let mut spacing = self.settle_delay + Duration::from_millis(event.delay_after_ms);
        if event.double_click_enabled {
            spacing += Duration::from_millis(event.double_click_delay_ms);
        }
        spacing
    }

    async fn execute(&self, shortcut: &ClickShortcut) -> Result<RunOutcome, CoreError> {
        let outcome = self.service.run_request(shortcut.to_request()).await?;
        if outcome.is_success() {
            info!(shortcut = %shortcut.name, taps = outcome.taps.len(), "단축키 실행 완료");
        } else {
            warn!(shortcut = %shortcut.name, status = ?outcome.status, "단축키 실행 실패");
        }
        self.bus.publish(AppEvent::ShortcutFinished {
            shortcut_id: shortcut.id.clone(),
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }
}
