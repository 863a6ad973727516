//! 대시보드 데이터 계층.
//!
//! 이 crate는 다음을 제공합니다:
//! - 주식 REST API 클라이언트 (개발 환경 데모 데이터 대체 포함)
//! - Supabase(PostgREST) 자금 흐름/거래일 조회
//! - 전송 오류 정규화
//! - 거래일 선조회 캐시와 이전 거래일 추가 조회
//! - 웹 리서치 분석 클라이언트 (단건/SSE 스트림)
//! - 엔티티 계열별 캐시를 묶은 `MarketDataService`

pub mod demo;
pub mod error;
pub mod http;
pub mod postgrest;
pub mod research;
pub mod service;
pub mod stock_api;
pub mod trade_dates;

pub use error::{ApiError, Result};
pub use http::HttpClient;
pub use postgrest::{PostgrestClient, TradeDateSource, CAPITAL_FLOW_TABLE};
pub use research::{
    parse_urls, ResearchAnalysis, ResearchRequest, ResearchSource, SseEvent, StreamReport,
    WebResearchClient,
};
pub use service::{family_durations, Lookup, MarketDataService};
pub use stock_api::StockApiClient;
pub use trade_dates::{default_before_date, TradeDateCache};
