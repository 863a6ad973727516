//! 웹 리서치 분석.
//!
//! URL 목록을 분석 서비스에 보내 요약과 인사이트를 받습니다. 한 번에 받는
//! [`WebResearchClient::analyze`]와 SSE로 진행 상황을 받는
//! [`WebResearchClient::stream_analysis`]를 제공합니다.

mod client;
mod sse;
mod types;

pub use client::{StreamReport, WebResearchClient};
pub use sse::{stream_chunk, SseDecoder, SseEvent};
pub use types::{
    parse_urls, AnalysisResult, ResearchAnalysis, ResearchRequest, ResearchSource, ResultPayload,
};
