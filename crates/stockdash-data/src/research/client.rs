//! 웹 리서치 분석 클라이언트.

use super::sse::{stream_chunk, SseDecoder, SseEvent};
use super::types::{ResearchAnalysis, ResearchRequest};
use crate::error::{ApiError, Result};
use crate::http::{send_json, HttpClient};
use stockdash_core::ApiConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 스트림 분석 결과 요약.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamReport {
    /// 받은 이벤트 수
    pub events: usize,
    /// 마지막 구조화 결과 이후 이어 붙인 조각 텍스트
    pub text: String,
    /// 마지막 구조화 분석 결과
    pub analysis: Option<ResearchAnalysis>,
}

impl StreamReport {
    fn record(&mut self, event: &SseEvent) {
        self.events += 1;
        let Some(json) = &event.json else {
            return;
        };
        if let Some(chunk) = stream_chunk(json) {
            self.text.push_str(&chunk);
        }
        if let Some(analysis) = ResearchAnalysis::from_event_json(json) {
            self.analysis = Some(analysis);
            self.text.clear();
        }
    }
}

/// 웹 리서치 분석 API 클라이언트.
#[derive(Debug, Clone)]
pub struct WebResearchClient {
    http: HttpClient,
    endpoint: String,
}

impl WebResearchClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// API 설정으로 생성 (스트림용 타임아웃 사용).
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let http = HttpClient::new(config.base_url.clone(), config.research_timeout())?;
        Ok(Self::new(http, config.research_endpoint.clone()))
    }

    /// 요청 URL (절대 URL 엔드포인트는 그대로).
    pub fn url(&self) -> String {
        self.http.build_url(&self.endpoint)
    }

    /// 한 번에 분석 결과를 받습니다.
    pub async fn analyze(&self, request: &ResearchRequest) -> Result<ResearchAnalysis> {
        request.validate()?;
        let url = self.url();
        debug!(url = %url, urls = request.urls.len(), "리서치 분석 요청");
        send_json(
            self.http
                .post(&url, "application/json")
                .json(&request.to_wire(false)),
        )
        .await
    }

    /// 분석 결과를 SSE로 받으며 이벤트마다 `on_event`를 호출합니다.
    ///
    /// 토큰이 취소되면 연결을 끊고 [`ApiError::Cancelled`]를 반환합니다.
    pub async fn stream_analysis<F>(
        &self,
        request: &ResearchRequest,
        token: &CancellationToken,
        mut on_event: F,
    ) -> Result<StreamReport>
    where
        F: FnMut(&SseEvent),
    {
        request.validate()?;
        let url = self.url();
        info!(url = %url, urls = request.urls.len(), "리서치 스트림 시작");

        let send = self
            .http
            .post(&url, "text/event-stream")
            .json(&request.to_wire(true))
            .send();
        let mut response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ApiError::Cancelled),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown");
            return Err(ApiError::from_response_body(status.as_u16(), reason, ""));
        }

        let mut decoder = SseDecoder::default();
        let mut report = StreamReport::default();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(events = report.events, "리서치 스트림 취소");
                    return Err(ApiError::Cancelled);
                }
                chunk = response.chunk() => chunk?,
            };
            let Some(bytes) = chunk else {
                break;
            };
            for event in decoder.push(&bytes) {
                report.record(&event);
                on_event(&event);
            }
        }
        if let Some(event) = decoder.finish() {
            report.record(&event);
            on_event(&event);
        }

        info!(events = report.events, "리서치 스트림 종료");
        Ok(report)
    }
}
