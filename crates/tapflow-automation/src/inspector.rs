//! 실시간 클릭 가능 요소 검사기.
//!
//! 전면 앱의 클릭 가능 요소를 평탄화해 스냅샷으로 내보낸다.
//! 디바운스 창 안의 연속 이벤트는 한 번만 내보내고,
//! 호스트 앱 자신의 화면은 내보내지 않는다.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use tapflow_core::config::InspectorConfig;
use tapflow_core::models::element::{ClickableElementSnapshot, ElementsUpdate};
use tapflow_core::models::event::AccessibilityEvent;
use tapflow_core::ports::accessibility::NodeHandle;

use crate::tree::TreeAccessor;

/// 실시간 요소 검사기
pub struct LiveInspector {
    tree: TreeAccessor,
    config: InspectorConfig,
    enabled: AtomicBool,
    last_emit: Mutex<Option<Instant>>,
    updates: broadcast::Sender<ElementsUpdate>,
}

impl LiveInspector {
    pub fn new(tree: TreeAccessor, config: InspectorConfig) -> Self {
        let (updates, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            tree,
            enabled: AtomicBool::new(config.enabled),
            config,
            last_emit: Mutex::new(None),
            updates,
        }
    }

    /// 실시간 모니터링 켜기/끄기
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        debug!(enabled, "실시간 요소 모니터링 설정");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// 스냅샷 구독
    pub fn subscribe(&self) -> broadcast::Receiver<ElementsUpdate> {
        self.updates.subscribe()
    }

    /// 접근성 이벤트 처리. 스냅샷을 내보냈으면 그 내용을 반환
    pub fn on_accessibility_event(&self, event: &AccessibilityEvent) -> Option<ElementsUpdate> {
        if !self.is_enabled() || !event.event_type.refreshes_snapshot() {
            return None;
        }
        let package = event.package_name.as_deref()?;
        if package == self.config.host_package {
            return None;
        }

        {
            let now = Instant::now();
            let mut last = self.last_emit.lock();
            if let Some(previous) = *last {
                if now.duration_since(previous) < self.config.debounce() {
                    return None;
                }
            }
            *last = Some(now);
        }

        // 이벤트 이후 전면 창이 바뀌었을 수 있으므로 루트 패키지를 다시 확인
        let root = self.tree.root()?;
        let root_package = root.info.package_name.clone()?;
        if root_package == self.config.host_package {
            return None;
        }

        let update = ElementsUpdate {
            package_name: root_package,
            elements: self.snapshot(&root.handle),
            captured_at: chrono::Utc::now(),
        };
        debug!(
            package = %update.package_name,
            count = update.elements.len(),
            "클릭 가능 요소 스냅샷 내보냄"
        );
        // 구독자가 없으면 send가 실패하지만 무시한다
        let _ = self.updates.send(update.clone());
        Some(update)
    }

    /// 즉시 캡처 (디바운스/활성화 무시)
    pub fn capture(&self) -> Option<ElementsUpdate> {
        let root = self.tree.root()?;
        Some(ElementsUpdate {
            package_name: root.info.package_name.clone().unwrap_or_default(),
            elements: self.snapshot(&root.handle),
            captured_at: chrono::Utc::now(),
        })
    }

    /// 클릭 가능 요소 평탄화 (표시 텍스트 없음 / 크기 0 제외)
    pub fn snapshot(&self, root: &NodeHandle) -> Vec<ClickableElementSnapshot> {
        self.tree
            .collect(root, |info| info.clickable)
            .iter()
            .filter_map(|node| ClickableElementSnapshot::from_node(&node.info))
            .collect()
    }

    /// 텍스트 목록 — `"<텍스트> (cx, cy)"`
    pub fn clickable_summaries(&self) -> Vec<String> {
        let Some(root) = self.tree.root() else {
            return Vec::new();
        };
        self.tree
            .collect(&root.handle, |info| info.clickable)
            .iter()
            .map(|node| {
                let info = &node.info;
                let label = [info.text_or_empty(), info.description_or_empty()]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or("Unknown");
                format!("{label} {}", info.center())
            })
            .collect()
    }
}
