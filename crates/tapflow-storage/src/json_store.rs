//! JSON 파일 단축키 저장소.
//!
//! `{ "shortcuts": [...], "event_groups": [...] }` 한 문서를 메모리에 들고,
//! 변경할 때마다 파일 전체를 다시 쓴다. 경로가 없으면 메모리 전용.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tapflow_core::error::CoreError;
use tapflow_core::models::shortcut::{ClickShortcut, EventGroup};
use tapflow_core::ports::storage::ShortcutStore;

/// 저장 문서
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    shortcuts: Vec<ClickShortcut>,
    #[serde(default)]
    event_groups: Vec<EventGroup>,
}

/// JSON 단축키 저장소 — `ShortcutStore` 포트 구현
pub struct JsonShortcutStore {
    document: RwLock<StoreDocument>,
    path: Option<PathBuf>,
}

impl JsonShortcutStore {
    /// 파일 기반 저장소 열기
    ///
    /// 파일이 없으면 빈 저장소로 시작하고, 손상된 파일은 경고 후 빈 목록으로 읽는다.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let document = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str::<StoreDocument>(&content) {
                Ok(document) => document,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "저장 파일 파싱 실패 — 빈 목록으로 시작");
                    StoreDocument::default()
                }
            }
        } else {
            StoreDocument::default()
        };

        info!(
            path = %path.display(),
            shortcuts = document.shortcuts.len(),
            groups = document.event_groups.len(),
            "단축키 저장소 초기화"
        );

        Ok(Self {
            document: RwLock::new(document),
            path: Some(path.to_path_buf()),
        })
    }

    /// 메모리 전용 저장소 (테스트용)
    pub fn in_memory() -> Self {
        Self {
            document: RwLock::new(StoreDocument::default()),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 문서 변경 후 저장. 클로저 반환값을 그대로 돌려준다
    fn mutate<T>(&self, change: impl FnOnce(&mut StoreDocument) -> T) -> Result<T, CoreError> {
        let mut document = self.document.write();
        let result = change(&mut document);
        self.persist(&document)?;
        Ok(result)
    }

    fn persist(&self, document: &StoreDocument) -> Result<(), CoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(document)?;
        // 임시 파일에 쓴 뒤 교체
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "저장 파일 기록");
        Ok(())
    }
}

fn detach(shortcut: &mut ClickShortcut) {
    shortcut.group_id = None;
    shortcut.order_in_group = 0;
}

#[async_trait]
impl ShortcutStore for JsonShortcutStore {
    async fn save_shortcut(&self, shortcut: &ClickShortcut) -> Result<(), CoreError> {
        self.mutate(|doc| {
            match doc.shortcuts.iter_mut().find(|s| s.id == shortcut.id) {
                Some(existing) => *existing = shortcut.clone(),
                None => doc.shortcuts.push(shortcut.clone()),
            }
        })?;
        debug!(id = %shortcut.id, "단축키 저장");
        Ok(())
    }

    async fn update_shortcut(&self, shortcut: &ClickShortcut) -> Result<(), CoreError> {
        let updated = self.mutate(|doc| {
            doc.shortcuts
                .iter_mut()
                .find(|s| s.id == shortcut.id)
                .map(|existing| *existing = shortcut.clone())
                .is_some()
        })?;
        if !updated {
            debug!(id = %shortcut.id, "갱신할 단축키 없음");
        }
        Ok(())
    }

    async fn delete_shortcut(&self, id: &str) -> Result<(), CoreError> {
        self.mutate(|doc| doc.shortcuts.retain(|s| s.id != id))
    }

    async fn get_shortcut(&self, id: &str) -> Result<Option<ClickShortcut>, CoreError> {
        Ok(self
            .document
            .read()
            .shortcuts
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list_shortcuts(&self) -> Result<Vec<ClickShortcut>, CoreError> {
        Ok(self.document.read().shortcuts.clone())
    }

    async fn save_group(&self, group: &EventGroup) -> Result<(), CoreError> {
        self.mutate(|doc| {
            match doc.event_groups.iter_mut().find(|g| g.id == group.id) {
                Some(existing) => *existing = group.clone(),
                None => doc.event_groups.push(group.clone()),
            }
        })
    }

    async fn update_group(&self, group: &EventGroup) -> Result<(), CoreError> {
        self.mutate(|doc| {
            if let Some(existing) = doc.event_groups.iter_mut().find(|g| g.id == group.id) {
                *existing = group.clone();
            }
        })
    }

    async fn delete_group(&self, id: &str, delete_events: bool) -> Result<(), CoreError> {
        self.mutate(|doc| {
            doc.event_groups.retain(|g| g.id != id);
            if delete_events {
                doc.shortcuts.retain(|s| s.group_id.as_deref() != Some(id));
            } else {
                doc.shortcuts
                    .iter_mut()
                    .filter(|s| s.group_id.as_deref() == Some(id))
                    .for_each(detach);
            }
        })?;
        info!(group_id = id, delete_events, "이벤트 그룹 삭제");
        Ok(())
    }

    async fn get_group(&self, id: &str) -> Result<Option<EventGroup>, CoreError> {
        Ok(self
            .document
            .read()
            .event_groups
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<EventGroup>, CoreError> {
        Ok(self.document.read().event_groups.clone())
    }

    async fn events_for_group(&self, group_id: &str) -> Result<Vec<ClickShortcut>, CoreError> {
        let mut events: Vec<ClickShortcut> = self
            .document
            .read()
            .shortcuts
            .iter()
            .filter(|s| s.group_id.as_deref() == Some(group_id))
            .cloned()
            .collect();
        events.sort_by_key(|s| s.order_in_group);
        Ok(events)
    }

    async fn standalone_events(&self) -> Result<Vec<ClickShortcut>, CoreError> {
        Ok(self
            .document
            .read()
            .shortcuts
            .iter()
            .filter(|s| s.group_id.is_none())
            .cloned()
            .collect())
    }

    async fn add_event_to_group(&self, event_id: &str, group_id: &str) -> Result<(), CoreError> {
        let found = self.mutate(|doc| {
            let next_order = doc
                .shortcuts
                .iter()
                .filter(|s| s.group_id.as_deref() == Some(group_id) && s.id != event_id)
                .map(|s| s.order_in_group)
                .max()
                .map_or(0, |max| max + 1);
            doc.shortcuts
                .iter_mut()
                .find(|s| s.id == event_id)
                .map(|shortcut| {
                    shortcut.group_id = Some(group_id.to_string());
                    shortcut.order_in_group = next_order;
                })
                .is_some()
        })?;
        if !found {
            return Err(CoreError::not_found("Shortcut", event_id));
        }
        Ok(())
    }

    async fn remove_event_from_group(&self, event_id: &str) -> Result<(), CoreError> {
        self.mutate(|doc| {
            if let Some(shortcut) = doc.shortcuts.iter_mut().find(|s| s.id == event_id) {
                detach(shortcut);
            }
        })
    }

    async fn reorder_events_in_group(
        &self,
        group_id: &str,
        ordered_ids: &[String],
    ) -> Result<(), CoreError> {
        self.mutate(|doc| {
            for (position, id) in ordered_ids.iter().enumerate() {
                if let Some(shortcut) = doc
                    .shortcuts
                    .iter_mut()
                    .find(|s| s.id == *id && s.group_id.as_deref() == Some(group_id))
                {
                    shortcut.order_in_group = position as i32;
                }
            }
        })
    }
}
