//! 데이터 조회 오류 타입.
//!
//! 전송 계층의 모든 실패를 [`ApiError`]로 정규화합니다. 캐시 조정자는 이
//! 에러의 `Display` 문자열을 저장소 에러 상태로 기록합니다.

use stockdash_cache::CacheError;
use stockdash_core::DashError;
use thiserror::Error;

/// API 호출 오류.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 호출자가 요청을 취소함
    #[error("Request was cancelled")]
    Cancelled,

    /// 연결 실패 등 네트워크 오류
    #[error("Network error or server is unavailable: {0}")]
    Network(String),

    /// 2xx가 아닌 응답
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// 응답 본문 해석 실패
    #[error("Decode error: {0}")]
    Decode(String),

    /// 요청 시간 초과
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// 필요한 설정이 없음
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// 대상을 찾을 수 없음
    #[error("Not found: {0}")]
    NotFound(String),

    /// 잘못된 요청 인자 (빈 심볼 등)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 캐시에 기록된 페치 실패
    #[error("{0}")]
    Failed(String),
}

impl ApiError {
    /// 오류 코드.
    pub fn code(&self) -> &str {
        match self {
            ApiError::Cancelled => "REQUEST_CANCELLED",
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Http { code, .. } => code.as_deref().unwrap_or("HTTP_ERROR"),
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::Timeout(_) => "TIMEOUT",
            ApiError::NotConfigured(_) => "NOT_CONFIGURED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::Failed(_) => "FETCH_FAILED",
        }
    }

    /// HTTP 상태 코드 (HTTP 응답이 아니면 0).
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } => *status,
            _ => 0,
        }
    }

    /// 재시도로 회복될 수 있는 오류인지.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// 실패 응답 본문에서 오류 생성.
    ///
    /// 본문이 JSON이고 `message`가 있으면 그대로 쓰고, 없으면
    /// `HTTP {status}: {reason}` 형식을 사용합니다.
    pub fn from_response_body(status: u16, reason: &str, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };

        ApiError::Http {
            status,
            message: field("message").unwrap_or_else(|| format!("HTTP {}: {}", status, reason)),
            code: field("code"),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
                code: None,
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidKey(msg) => ApiError::InvalidRequest(msg),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<ApiError> for DashError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(_) | ApiError::Timeout(_) => DashError::Network(err.to_string()),
            ApiError::Decode(msg) => DashError::Serialization(msg),
            ApiError::NotConfigured(msg) => DashError::Config(msg),
            ApiError::NotFound(msg) => DashError::NotFound(msg),
            ApiError::InvalidRequest(msg) => DashError::InvalidInput(msg),
            other => DashError::Data(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
