//! 주기 실행 스케줄러.
//!
//! 스케줄이 켜진 단축키/그룹마다 tokio 주기 태스크 하나를 띄운다.
//! 같은 대상을 다시 등록하면 기존 태스크를 중단하고 교체한다.
//! 매 주기마다 저장소에서 대상을 다시 읽어 삭제되었으면 태스크를 끝내고,
//! 스케줄이 꺼졌으면 그 주기는 건너뛴다.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use tapflow_core::config::SchedulerConfig;
use tapflow_core::error::CoreError;
use tapflow_core::models::shortcut::{ClickShortcut, EventGroup, ScheduleInterval};
use tapflow_core::ports::storage::ShortcutStore;

use crate::event_bus::{AppEvent, EventBus};
use crate::runner::ShortcutRunner;

/// 스케줄 대상
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleTarget {
    Shortcut(String),
    Group(String),
}

impl ScheduleTarget {
    /// 태스크 키 (`shortcut_<id>` / `group_<id>`)
    pub fn key(&self) -> String {
        match self {
            Self::Shortcut(id) => format!("shortcut_{id}"),
            Self::Group(id) => format!("group_{id}"),
        }
    }
}

enum Tick {
    Continue,
    Stop,
}

/// 주기 실행 스케줄러
pub struct Scheduler {
    runner: Arc<ShortcutRunner>,
    store: Arc<dyn ShortcutStore>,
    bus: Arc<EventBus>,
    run_immediately: bool,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        runner: Arc<ShortcutRunner>,
        store: Arc<dyn ShortcutStore>,
        bus: Arc<EventBus>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            runner,
            store,
            bus,
            run_immediately: config.run_immediately,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// 단축키 스케줄 등록. 스케줄이 꺼져 있으면 false
    pub fn schedule_shortcut(&self, shortcut: &ClickShortcut) -> bool {
        if !shortcut.is_schedulable() {
            debug!(shortcut = %shortcut.name, "스케줄 비활성 단축키");
            return false;
        }
        self.schedule(
            ScheduleTarget::Shortcut(shortcut.id.clone()),
            shortcut.schedule_interval,
        )
    }

    /// 그룹 스케줄 등록. 스케줄이 꺼져 있으면 false
    pub fn schedule_group(&self, group: &EventGroup) -> bool {
        if !group.is_schedulable() {
            debug!(group = %group.name, "스케줄 비활성 그룹");
            return false;
        }
        self.schedule(ScheduleTarget::Group(group.id.clone()), group.schedule_interval)
    }

    fn schedule(&self, target: ScheduleTarget, interval: ScheduleInterval) -> bool {
        let Some(period) = interval.period() else {
            warn!(key = %target.key(), "잘못된 스케줄 주기");
            return false;
        };
        let key = target.key();
        self.cancel(&target);

        let runner = Arc::clone(&self.runner);
        let store = Arc::clone(&self.store);
        let bus = Arc::clone(&self.bus);
        let run_immediately = self.run_immediately;
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let start = if run_immediately {
                tokio::time::Instant::now()
            } else {
                tokio::time::Instant::now() + period
            };
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match tick(&target, &runner, store.as_ref()).await {
                    Tick::Continue => {}
                    Tick::Stop => break,
                }
            }
            bus.publish(AppEvent::Unscheduled { key: task_key });
        });

        info!(key = %key, interval = interval.display_name(), "스케줄 등록");
        self.bus.publish(AppEvent::Scheduled {
            key: key.clone(),
            interval_minutes: interval.interval_minutes(),
        });
        self.tasks.lock().insert(key, handle);
        true
    }

    /// 스케줄 해제
    pub fn cancel(&self, target: &ScheduleTarget) {
        if let Some(handle) = self.tasks.lock().remove(&target.key()) {
            handle.abort();
            debug!(key = %target.key(), "스케줄 해제");
        }
    }

    /// 현재 스케줄 태스크가 살아 있는지
    pub fn is_scheduled(&self, target: &ScheduleTarget) -> bool {
        self.tasks
            .lock()
            .get(&target.key())
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 저장소의 스케줄 대상을 전부 다시 등록. 등록 수 반환
    pub async fn reschedule_all(&self) -> Result<usize, CoreError> {
        let mut count = 0;
        for shortcut in self.store.list_shortcuts().await? {
            if self.schedule_shortcut(&shortcut) {
                count += 1;
            }
        }
        for group in self.store.list_groups().await? {
            if self.schedule_group(&group) {
                count += 1;
            }
        }
        info!(count, "스케줄 재등록");
        Ok(count)
    }

    /// 모든 스케줄 태스크 중단
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock();
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
        info!("스케줄러 종료");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.get_mut().drain() {
            handle.abort();
        }
    }
}

async fn tick(target: &ScheduleTarget, runner: &ShortcutRunner, store: &dyn ShortcutStore) -> Tick {
    match target {
        ScheduleTarget::Shortcut(id) => match store.get_shortcut(id).await {
            Ok(Some(shortcut)) if shortcut.scheduling_enabled => {
                debug!(shortcut = %shortcut.name, "예약 단축키 실행");
                if let Err(e) = runner.run_shortcut(&shortcut).await {
                    warn!(shortcut = %shortcut.name, error = %e, "예약 단축키 실행 에러");
                }
                Tick::Continue
            }
            Ok(Some(shortcut)) => {
                debug!(shortcut = %shortcut.name, "스케줄 꺼짐 — 건너뜀");
                Tick::Continue
            }
            Ok(None) => {
                info!(shortcut_id = %id, "단축키 삭제됨 — 스케줄 종료");
                Tick::Stop
            }
            Err(e) => {
                warn!(shortcut_id = %id, error = %e, "단축키 조회 실패");
                Tick::Continue
            }
        },
        ScheduleTarget::Group(id) => match store.get_group(id).await {
            Ok(Some(group)) if group.scheduling_enabled => {
                debug!(group = %group.name, "예약 그룹 실행");
                if let Err(e) = runner.run_group(id).await {
                    warn!(group = %group.name, error = %e, "예약 그룹 실행 에러");
                }
                Tick::Continue
            }
            Ok(Some(group)) => {
                debug!(group = %group.name, "스케줄 꺼짐 — 건너뜀");
                Tick::Continue
            }
            Ok(None) => {
                info!(group_id = %id, "그룹 삭제됨 — 스케줄 종료");
                Tick::Stop
            }
            Err(e) => {
                warn!(group_id = %id, error = %e, "그룹 조회 실패");
                Tick::Continue
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::runner::tests::{fixture, Fixture, SHOP};
    use tapflow_core::models::geometry::Point;

    fn scheduler(f: &Fixture, run_immediately: bool) -> Scheduler {
        Scheduler::new(
            f.runner.clone(),
            f.store.clone(),
            f.bus.clone(),
            &SchedulerConfig {
                enabled: true,
                run_immediately,
            },
        )
    }

    fn every_minute(id: &str, x: i32) -> ClickShortcut {
        let mut shortcut = ClickShortcut::with_coordinates(id, id, SHOP, x, x);
        shortcut.scheduling_enabled = true;
        shortcut.schedule_interval = ScheduleInterval::EveryMinute;
        shortcut
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_shortcut_runs_every_period() {
        let f = fixture();
        let shortcut = every_minute("s1", 10);
        f.store.save_shortcut(&shortcut).await.unwrap();
        let scheduler = scheduler(&f, true);

        assert!(scheduler.schedule_shortcut(&shortcut));
        assert!(scheduler.is_scheduled(&ScheduleTarget::Shortcut("s1".into())));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.device.tap_points(), vec![Point::new(10, 10)]);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.device.tap_points().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_schedule_skips_and_deleted_stops() {
        let f = fixture();
        let mut shortcut = every_minute("s1", 10);
        f.store.save_shortcut(&shortcut).await.unwrap();
        let scheduler = scheduler(&f, false);
        let target = ScheduleTarget::Shortcut("s1".into());
        scheduler.schedule_shortcut(&shortcut);

        shortcut.scheduling_enabled = false;
        f.store.update_shortcut(&shortcut).await.unwrap();
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(f.device.gestures().is_empty());
        assert!(scheduler.is_scheduled(&target));

        f.store.delete_shortcut("s1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!scheduler.is_scheduled(&target));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_previous_task() {
        let f = fixture();
        let shortcut = every_minute("s1", 10);
        f.store.save_shortcut(&shortcut).await.unwrap();
        let scheduler = scheduler(&f, true);

        scheduler.schedule_shortcut(&shortcut);
        scheduler.schedule_shortcut(&shortcut);
        tokio::time::sleep(Duration::from_secs(5)).await;

        // 교체된 태스크는 중단되어 한 번만 실행된다
        assert_eq!(f.device.tap_points().len(), 1);

        scheduler.cancel(&ScheduleTarget::Shortcut("s1".into()));
        assert!(!scheduler.is_scheduled(&ScheduleTarget::Shortcut("s1".into())));
    }

    #[tokio::test]
    async fn reschedule_all_counts_schedulable_items() {
        let f = fixture();
        f.store.save_shortcut(&every_minute("s1", 10)).await.unwrap();
        f.store
            .save_shortcut(&ClickShortcut::with_coordinates("s2", "s2", SHOP, 1, 1))
            .await
            .unwrap();
        let mut group = EventGroup::new("g1", "Hourly");
        group.scheduling_enabled = true;
        group.schedule_interval = ScheduleInterval::EveryHour;
        f.store.save_group(&group).await.unwrap();
        let scheduler = scheduler(&f, false);

        assert_eq!(scheduler.reschedule_all().await.unwrap(), 2);
        assert!(scheduler.is_scheduled(&ScheduleTarget::Group("g1".into())));
        assert!(!scheduler.is_scheduled(&ScheduleTarget::Shortcut("s2".into())));

        scheduler.shutdown();
    }
}
