//! Tapflow 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 `CoreError`를 그대로 반환하거나 자체 에러에서 `#[from]`으로 래핑한다.
//! 자동화 실행 실패(루트 없음, 요소 미발견 등)는 에러가 아니라
//! [`crate::models::outcome::FailureReason`] 값으로 호출자에게 전달된다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Shortcut", "EventGroup")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 대상 앱 실행 실패 (런처 인텐트 없음 등)
    #[error("앱 실행 실패: {0}")]
    LaunchFailed(String),

    /// 오케스트레이터 채널이 닫힘 (서비스 종료)
    #[error("자동화 서비스 종료됨")]
    ServiceStopped,

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// `NotFound` 생성 헬퍼
    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// `Validation` 생성 헬퍼
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_includes_resource() {
        let err = CoreError::not_found("Shortcut", "sc-1");
        assert_eq!(err.to_string(), "Shortcut 미발견: sc-1");
    }

    #[test]
    fn serde_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
