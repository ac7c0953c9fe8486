//! `config.json` 로드/저장.
//!
//! 파일이 없으면 기본값으로 만들고, 필드가 빠진 파일은 기본값을 채워 다시 쓴다.
//! 저장은 임시 파일에 쓴 뒤 이름을 바꿔 교체한다.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::CoreError;

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "tapflow";

/// 런타임 설정 보관소 (복제 시 같은 설정을 공유)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    current: Arc<RwLock<AppConfig>>,
    path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 설정 디렉토리의 `config.json`
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn with_path(path: PathBuf) -> Result<Self, CoreError> {
        let config = load_or_init(&path)?;
        Ok(Self {
            current: Arc::new(RwLock::new(config)),
            path,
        })
    }

    pub fn get(&self) -> AppConfig {
        self.current.read().clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// 복제본을 고쳐 검증 후 저장. 검증에 실패하면 현재 설정은 그대로
    pub fn update_with<F>(&self, edit: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut next = self.get();
        edit(&mut next);
        next.validate()?;
        write_atomic(&self.path, &next)?;
        *self.current.write() = next.clone();
        debug!(path = %self.path.display(), "설정 저장");
        Ok(next)
    }

    /// 파일을 다시 읽는다 (외부 편집 반영)
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = read_config(&self.path)?;
        config.validate()?;
        *self.current.write() = config;
        info!(path = %self.path.display(), "설정 다시 로드");
        Ok(())
    }

    /// 단축키 저장 파일 경로 (`storage.data_dir` 또는 플랫폼 데이터 디렉토리)
    pub fn store_path(&self) -> Result<PathBuf, CoreError> {
        let storage = self.current.read().storage.clone();
        let dir = match storage.data_dir {
            Some(dir) => dir,
            None => Self::data_dir()?,
        };
        Ok(dir.join(storage.file_name))
    }

    /// Linux `~/.config/tapflow`, macOS `~/Library/Application Support/tapflow`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        Ok(project_dirs()?.config_dir().to_path_buf())
    }

    pub fn data_dir() -> Result<PathBuf, CoreError> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }
}

fn project_dirs() -> Result<ProjectDirs, CoreError> {
    ProjectDirs::from("", "", APP_DIR_NAME)
        .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
}

fn load_or_init(path: &Path) -> Result<AppConfig, CoreError> {
    if !path.exists() {
        let config = AppConfig::default_config();
        write_atomic(path, &config)?;
        info!(path = %path.display(), "기본 설정 파일 생성");
        return Ok(config);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("{} 읽기 실패: {e}", path.display())))?;
    let config = parse(path, &raw)?;
    config.validate()?;

    // 새로 추가된 필드를 파일에 드러낸다
    let normalized = serde_json::to_string_pretty(&config)?;
    if normalized.trim() != raw.trim() {
        match write_atomic(path, &config) {
            Ok(()) => debug!(path = %path.display(), "누락 필드 기본값으로 보충"),
            Err(e) => warn!(path = %path.display(), error = %e, "설정 보충 저장 실패"),
        }
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("{} 읽기 실패: {e}", path.display())))?;
    parse(path, &raw)
}

fn parse(path: &Path, raw: &str) -> Result<AppConfig, CoreError> {
    serde_json::from_str(raw)
        .map_err(|e| CoreError::Config(format!("{} 파싱 실패: {e}", path.display())))
}

fn write_atomic(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(config)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
