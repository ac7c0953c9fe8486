//! # tapflow
//!
//! Tapflow 바이너리 진입점.
//! 설정/저장소/자동화 서비스 와이어링, 단축키·그룹 실행, 스케줄러 구동.
//!
//! 기기 연결은 JSON 기기 픽스처를 읽는 시뮬레이터로 대신한다.

mod event_bus;
mod runner;
mod scheduler;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tapflow_automation::device::SimulatedDevice;
use tapflow_automation::{AutomationService, PlatformPorts};
use tapflow_core::config::AppConfig;
use tapflow_core::config_manager::ConfigManager;
use tapflow_core::ports::overlay::OverlayWindow;
use tapflow_core::ports::storage::ShortcutStore;
use tapflow_storage::JsonShortcutStore;

use crate::event_bus::{AppEvent, EventBus};
use crate::runner::ShortcutRunner;
use crate::scheduler::Scheduler;

/// Tapflow — 접근성 기반 탭 자동화
#[derive(Parser, Debug)]
#[command(name = "tapflow")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 데이터 저장 경로 (기본: 설정값 또는 플랫폼 데이터 디렉토리)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 저장된 단축키와 그룹 목록
    List,
    /// 단축키 한 건 실행
    Run {
        shortcut_id: String,
        /// 기기 픽스처 (JSON)
        #[arg(long)]
        device: PathBuf,
    },
    /// 그룹 이벤트 순차 실행
    RunGroup {
        group_id: String,
        #[arg(long)]
        device: PathBuf,
    },
    /// 전면 앱의 클릭 가능 요소 출력
    Inspect {
        #[arg(long)]
        device: PathBuf,
        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },
    /// 스케줄러 실행 (Ctrl+C로 종료)
    Schedule {
        #[arg(long)]
        device: PathBuf,
    },
}

/// 기기 픽스처 위에 조립된 실행 환경
struct Runtime {
    device: SimulatedDevice,
    service: Arc<AutomationService>,
    runner: Arc<ShortcutRunner>,
}

impl Runtime {
    fn start(
        device_path: &Path,
        config: &AppConfig,
        store: Arc<dyn ShortcutStore>,
        bus: Arc<EventBus>,
    ) -> Result<Self> {
        let device = SimulatedDevice::load(device_path)
            .with_context(|| format!("기기 픽스처 로드 실패: {}", device_path.display()))?;

        let ports = PlatformPorts {
            window: Arc::new(device.clone()),
            gestures: Arc::new(device.clone()),
            overlay: config
                .overlay
                .enabled
                .then(|| Arc::new(device.clone()) as Arc<dyn OverlayWindow>),
            launcher: Arc::new(device.clone()),
        };
        let service = Arc::new(AutomationService::start(ports, config));
        service.attach_event_source(device.subscribe_events());

        let runner = Arc::new(ShortcutRunner::new(
            service.clone(),
            store,
            bus,
            &config.automation,
        ));
        Ok(Self {
            device,
            service,
            runner,
        })
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path.to_path_buf()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;
    info!(path = %manager.config_path().display(), "설정 로드");
    Ok(manager)
}

/// 저장 파일 경로 (CLI 인자 > 설정값 > 플랫폼 기본 경로)
fn resolve_store_path(args: &Args, manager: &ConfigManager) -> Result<PathBuf> {
    match &args.data_dir {
        Some(dir) => Ok(dir.join(&manager.get().storage.file_name)),
        None => manager.store_path().context("데이터 디렉토리 결정 실패"),
    }
}

async fn list(store: &dyn ShortcutStore) -> Result<()> {
    let standalone = store.standalone_events().await?;
    println!("단축키 ({})", standalone.len());
    for shortcut in &standalone {
        println!("  {:<36}  {}  {}", shortcut.id, shortcut.name, shortcut.description());
    }

    let groups = store.list_groups().await?;
    println!("그룹 ({})", groups.len());
    for group in &groups {
        let schedule = if group.is_schedulable() {
            group.schedule_interval.display_name()
        } else {
            "-"
        };
        println!("  {:<36}  {}  [{}]", group.id, group.name, schedule);
        for event in store.events_for_group(&group.id).await? {
            println!("    {}. {}  {}", event.order_in_group + 1, event.name, event.description());
        }
    }
    Ok(())
}

fn inspect(runtime: &Runtime, json: bool) -> Result<()> {
    let Some(update) = runtime.service.inspector().capture() else {
        bail!("전면 창이 없습니다");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&update)?);
        return Ok(());
    }
    println!("{} — 클릭 가능 요소 {}개", update.package_name, update.elements.len());
    for summary in runtime.service.inspector().clickable_summaries() {
        println!("  {summary}");
    }
    Ok(())
}

async fn schedule(
    runtime: &Runtime,
    config: &AppConfig,
    store: Arc<dyn ShortcutStore>,
    bus: Arc<EventBus>,
) -> Result<()> {
    if !config.scheduler.enabled {
        warn!("스케줄러가 설정에서 비활성화되어 있습니다");
        return Ok(());
    }

    let scheduler = Scheduler::new(runtime.runner.clone(), store, bus.clone(), &config.scheduler);
    let count = scheduler.reschedule_all().await?;
    println!("예약된 대상 {count}개 — Ctrl+C로 종료");

    let mut events = bus.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(AppEvent::ShortcutFinished { shortcut_id, outcome }) => {
                    println!("{shortcut_id}: {:?}", outcome.status);
                }
                Ok(AppEvent::GroupFinished { group_id, succeeded, failed }) => {
                    println!("{group_id}: 성공 {succeeded}, 실패 {failed}");
                }
                Ok(other) => {
                    info!(kind = other.kind(), subject = other.subject(), "스케줄 알림");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "이벤트 누락");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    warn!(error = %e, "Ctrl+C 핸들러 등록 실패");
                }
                info!("종료 신호 수신");
                break;
            }
        }
    }

    scheduler.shutdown();
    runtime.service.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "tapflow={},tapflow_core={},tapflow_automation={},tapflow_storage={}",
        args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let manager = load_config(args.config.as_deref())?;
    let config = manager.get();
    let store_path = resolve_store_path(&args, &manager)?;
    let store: Arc<dyn ShortcutStore> = Arc::new(
        JsonShortcutStore::open(&store_path)
            .with_context(|| format!("저장소 열기 실패: {}", store_path.display()))?,
    );
    let bus = Arc::new(EventBus::default());

    match &args.command {
        Command::List => list(store.as_ref()).await?,
        Command::Run {
            shortcut_id,
            device,
        } => {
            let runtime = Runtime::start(device, &config, store, bus)?;
            let outcome = runtime.runner.run_shortcut_by_id(shortcut_id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            println!("탭 기록: {:?}", runtime.device.tap_points());
            if !outcome.is_success() {
                bail!("실행 실패: {:?}", outcome.status);
            }
        }
        Command::RunGroup { group_id, device } => {
            let runtime = Runtime::start(device, &config, store, bus)?;
            let report = runtime.runner.run_group(group_id).await?;
            for (event_id, outcome) in &report.outcomes {
                println!("{event_id}: {:?}", outcome.status);
            }
            println!("성공 {}, 실패 {}", report.succeeded(), report.failed());
        }
        Command::Inspect { device, json } => {
            let runtime = Runtime::start(device, &config, store, bus)?;
            inspect(&runtime, *json)?;
        }
        Command::Schedule { device } => {
            let runtime = Runtime::start(device, &config, store.clone(), bus.clone())?;
            schedule(&runtime, &config, store, bus).await?;
        }
    }

    Ok(())
}
