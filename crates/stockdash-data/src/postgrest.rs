//! Supabase(PostgREST) 테이블 조회 클라이언트.
//!
//! - `joinquant_fund_flow`: 종목별 자금 흐름
//! - 거래일 달력 테이블: 최근 거래일 목록
//!
//! 모든 요청에 `apikey`와 `Authorization: Bearer` 헤더를 보냅니다.

use crate::error::{ApiError, Result};
use crate::http::send_json;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use stockdash_core::{CapitalFlowRow, SupabaseConfig};
use tracing::{debug, instrument};

/// 자금 흐름 테이블.
pub const CAPITAL_FLOW_TABLE: &str = "joinquant_fund_flow";

/// 거래일 목록 공급자.
#[async_trait]
pub trait TradeDateSource: Send + Sync {
    /// `before` 이전 거래일을 최신순으로 최대 `limit`개 반환.
    async fn trade_dates(&self, before: NaiveDate, limit: usize) -> Result<Vec<NaiveDate>>;
}

#[derive(Debug, Deserialize)]
struct TradeDateRow {
    trade_date: NaiveDate,
}

/// PostgREST 클라이언트.
#[derive(Clone)]
pub struct PostgrestClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    trade_date_table: String,
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.base_url)
            .field("trade_date_table", &self.trade_date_table)
            .finish()
    }
}

impl PostgrestClient {
    /// 설정으로 생성. URL이나 키가 없으면 [`ApiError::NotConfigured`].
    pub fn from_config(config: &SupabaseConfig, timeout: std::time::Duration) -> Result<Self> {
        if !config.is_configured() {
            return Err(ApiError::NotConfigured(
                "Supabase client is not configured. Set STOCKDASH__SUPABASE__URL and STOCKDASH__SUPABASE__ANON_KEY."
                    .to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::NotConfigured(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            trade_date_table: config.trade_date_table.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn select(&self, table: &str) -> reqwest::RequestBuilder {
        let key = self.anon_key.expose_secret();
        self.client
            .get(self.table_url(table))
            .header("apikey", key)
            .bearer_auth(key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// `end_date`까지 `days`일 동안의 자금 흐름.
    ///
    /// 날짜 내림차순, 같은 날짜 안에서는 주력 순유입 내림차순입니다.
    #[instrument(skip(self))]
    pub async fn capital_flow(&self, end_date: NaiveDate, days: u32) -> Result<Vec<CapitalFlowRow>> {
        let start_date = capital_flow_start(end_date, days);
        debug!(start = %start_date, end = %end_date, "자금 흐름 조회");

        let request = self.select(CAPITAL_FLOW_TABLE).query(&[
            ("select", "*".to_string()),
            ("date", format!("gte.{}", start_date)),
            ("date", format!("lte.{}", end_date)),
            ("order", "date.desc,net_amount_main.desc".to_string()),
        ]);
        send_json(request).await
    }
}

#[async_trait]
impl TradeDateSource for PostgrestClient {
    #[instrument(skip(self))]
    async fn trade_dates(&self, before: NaiveDate, limit: usize) -> Result<Vec<NaiveDate>> {
        let request = self.select(&self.trade_date_table).query(&[
            ("select", "trade_date".to_string()),
            ("trade_date", format!("lt.{}", before)),
            ("order", "trade_date.desc".to_string()),
            ("limit", limit.to_string()),
        ]);
        let rows: Vec<TradeDateRow> = send_json(request).await?;
        Ok(rows.into_iter().map(|row| row.trade_date).collect())
    }
}

/// 조회 시작일 (`end_date` 포함 `days`일).
pub fn capital_flow_start(end_date: NaiveDate, days: u32) -> NaiveDate {
    end_date - Duration::days(i64::from(days.max(1)) - 1)
}
