//! 공용 HTTP 클라이언트.
//!
//! 기본 URL 결합, 공통 헤더, 실패 응답 정규화를 담당합니다.

use crate::error::{ApiError, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use stockdash_core::ApiConfig;
use tracing::debug;

/// JSON API용 HTTP 클라이언트.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// 새 클라이언트 생성.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::NotConfigured(format!("HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// API 설정으로 생성.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 요청 URL 구성.
    ///
    /// 절대 URL은 그대로 사용하고, 상대 경로는 기본 URL 뒤에 `/` 하나로 잇습니다.
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// 공통 헤더가 설정된 GET 요청.
    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    /// JSON 본문을 보내는 POST 요청.
    ///
    /// `accept`로 응답 형식을 고릅니다 (JSON 또는 `text/event-stream`).
    pub fn post(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(reqwest::header::ACCEPT, accept)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    /// GET 요청 후 JSON 본문 반환.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path);
        debug!(url = %url, params = query.len(), "API 요청");
        send_json(self.get(&url).query(query)).await
    }
}

/// 요청 전송 후 JSON 해석.
///
/// 2xx가 아니면 본문으로 [`ApiError::Http`]를 만듭니다.
pub(crate) async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("Unknown");
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_response_body(status.as_u16(), reason, &body));
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
