//! 주식 REST API 클라이언트.
//!
//! # 엔드포인트
//!
//! | 용도 | 경로 |
//! |---|---|
//! | 종목 목록 | `/api/stocks` |
//! | 개별 종목 | `/api/stocks/{symbol}` |
//! | 과거 데이터 | `/api/stocks/{symbol}/historical?period=` |
//! | 시세 | `/api/stocks/{symbol}/quote` |
//! | RPS | `/api/v1/joinquant/rps?date=` |
//!
//! 개발 환경에서는 전송 실패 시 데모 데이터로 대체합니다 (RPS 제외).

use crate::demo;
use crate::error::{ApiError, Result};
use crate::http::HttpClient;
use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use serde::Deserialize;
use stockdash_core::{
    ApiConfig, ChartPoint, Environment, Period, RpsFilter, RpsItem, StockData, StockQuote,
};
use tracing::{instrument, warn};

/// 데모 차트 최대 일수.
const DEMO_CHART_MAX_DAYS: u32 = 365;

/// 엔드포인트 경로.
pub mod endpoints {
    use stockdash_core::Period;

    pub const STOCKS: &str = "/api/stocks";
    pub const RPS: &str = "/api/v1/joinquant/rps";

    pub fn stock(symbol: &str) -> String {
        format!("{}/{}", STOCKS, symbol)
    }

    pub fn historical(symbol: &str, period: Period) -> String {
        format!("{}/{}/historical?period={}", STOCKS, symbol, period)
    }

    pub fn quote(symbol: &str) -> String {
        format!("{}/{}/quote", STOCKS, symbol)
    }
}

/// RPS 응답은 `{ "data": [...] }`로 감싸져 있습니다.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// 주식 API 클라이언트.
#[derive(Debug, Clone)]
pub struct StockApiClient {
    http: HttpClient,
    environment: Environment,
}

impl StockApiClient {
    pub fn new(http: HttpClient, environment: Environment) -> Self {
        Self { http, environment }
    }

    /// API 설정으로 생성.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Ok(Self::new(HttpClient::from_config(config)?, config.environment))
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// 전체 종목 목록.
    #[instrument(skip(self))]
    pub async fn get_stocks(&self) -> Result<Vec<StockData>> {
        match self.http.get_json(endpoints::STOCKS, &[]).await {
            Ok(stocks) => Ok(stocks),
            Err(e) => self.fallback(e, "stocks", || Ok(demo::demo_stocks())),
        }
    }

    /// 개별 종목.
    #[instrument(skip(self))]
    pub async fn get_stock(&self, symbol: &str) -> Result<StockData> {
        match self.http.get_json(&endpoints::stock(symbol), &[]).await {
            Ok(stock) => Ok(stock),
            Err(e) => self.fallback(e, symbol, || demo_stock(symbol)),
        }
    }

    /// 과거 차트 데이터.
    #[instrument(skip(self))]
    pub async fn get_historical_data(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<ChartPoint>> {
        let path = endpoints::historical(symbol, period);
        match self.http.get_json(&path, &[]).await {
            Ok(points) => Ok(points),
            Err(e) => self.fallback(e, symbol, || {
                let days = period.approx_days().min(DEMO_CHART_MAX_DAYS);
                Ok(demo::demo_chart(symbol, days, Utc::now().date_naive()))
            }),
        }
    }

    /// 실시간 시세.
    #[instrument(skip(self))]
    pub async fn get_quote(&self, symbol: &str) -> Result<StockQuote> {
        match self.http.get_json(&endpoints::quote(symbol), &[]).await {
            Ok(quote) => Ok(quote),
            Err(e) => self.fallback(e, symbol, || {
                demo_stock(symbol).map(|stock| stock.to_quote(Utc::now()))
            }),
        }
    }

    /// 여러 시세를 동시에 조회. 하나라도 실패하면 전체 실패.
    pub async fn get_multiple_quotes(&self, symbols: &[String]) -> Result<Vec<StockQuote>> {
        try_join_all(symbols.iter().map(|symbol| self.get_quote(symbol))).await
    }

    /// RPS 순위표.
    #[instrument(skip(self, filter), fields(filter = %filter.fingerprint()))]
    pub async fn get_rps(&self, date: NaiveDate, filter: &RpsFilter) -> Result<Vec<RpsItem>> {
        let mut query = vec![("date", date.format("%Y-%m-%d").to_string())];
        query.extend(filter.to_query_pairs());

        let envelope: DataEnvelope<Vec<RpsItem>> =
            self.http.get_json(endpoints::RPS, &query).await?;
        Ok(envelope.data)
    }

    /// 개발 환경이면 데모 데이터로 대체, 아니면 오류 전파.
    fn fallback<T>(
        &self,
        error: ApiError,
        target: &str,
        demo: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        if !self.environment.is_development() || error == ApiError::Cancelled {
            return Err(error);
        }
        warn!(target_name = %target, error = %error, "API 사용 불가, 데모 데이터 사용");
        demo()
    }
}

fn demo_stock(symbol: &str) -> Result<StockData> {
    demo::find_demo_stock(symbol)
        .ok_or_else(|| ApiError::NotFound(format!("Stock {} not found", symbol)))
}
