//! 앱 실행 포트.

use async_trait::async_trait;

use crate::error::CoreError;

/// 대상 앱 실행기 (플랫폼 launch intent)
#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// 앱 실행. 실행 intent를 찾을 수 없으면 `CoreError::LaunchFailed`
    async fn launch(&self, app_id: &str) -> Result<(), CoreError>;
}
