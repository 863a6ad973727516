//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 기본값 → 설정 파일(선택) → `STOCKDASH__*` 환경 변수 순으로 덮어씁니다.

use crate::error::DashResult;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// REST API 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// Supabase(PostgREST) 설정
    #[serde(default)]
    pub supabase: SupabaseConfig,
    /// 캐시 신선도 설정
    #[serde(default)]
    pub cache: CacheTtlConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 사용자 환경설정 저장 위치
    #[serde(default)]
    pub user: UserConfig,
}

/// 실행 환경.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// 개발 환경 (API 실패 시 데모 데이터 사용)
    #[default]
    Development,
    /// 운영 환경
    Production,
    /// 테스트 환경
    Test,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        };
        f.write_str(s)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

/// REST API 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API 기본 URL
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
    /// 실행 환경
    #[serde(default)]
    pub environment: Environment,
    /// 웹 리서치 분석 엔드포인트 (상대 경로 또는 절대 URL)
    #[serde(default = "default_research_endpoint")]
    pub research_endpoint: String,
    /// 웹 리서치 요청 타임아웃 (밀리초, 스트림 전체 기준)
    #[serde(default = "default_research_timeout_ms")]
    pub research_timeout_ms: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_api_timeout_ms() -> u64 {
    10_000
}
fn default_research_endpoint() -> String {
    "/api/v1/web-insights/analyze".to_string()
}
fn default_research_timeout_ms() -> u64 {
    5 * 60 * 1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_ms: default_api_timeout_ms(),
            environment: Environment::default(),
            research_endpoint: default_research_endpoint(),
            research_timeout_ms: default_research_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// 요청 타임아웃.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 웹 리서치 요청 타임아웃.
    pub fn research_timeout(&self) -> Duration {
        Duration::from_millis(self.research_timeout_ms)
    }
}

/// Supabase(PostgREST) 설정.
#[derive(Clone, Deserialize)]
pub struct SupabaseConfig {
    /// 프로젝트 URL (예: https://xyz.supabase.co)
    #[serde(default)]
    pub url: String,
    /// anon 키
    #[serde(default = "empty_secret", deserialize_with = "deserialize_secret")]
    pub anon_key: SecretString,
    /// 거래일 달력 테이블
    #[serde(default = "default_trade_date_table")]
    pub trade_date_table: String,
    /// 한 번에 가져올 거래일 수
    #[serde(default = "default_trade_date_batch")]
    pub trade_date_batch_size: usize,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new().into())
}
fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into()))
}
fn default_trade_date_table() -> String {
    "trade_calendar".to_string()
}
fn default_trade_date_batch() -> usize {
    120
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: empty_secret(),
            trade_date_table: default_trade_date_table(),
            trade_date_batch_size: default_trade_date_batch(),
        }
    }
}

impl SupabaseConfig {
    /// URL과 키가 모두 설정되었는지 확인.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.expose_secret().trim().is_empty()
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("trade_date_table", &self.trade_date_table)
            .field("trade_date_batch_size", &self.trade_date_batch_size)
            .finish()
    }
}

/// 엔티티 계열별 캐시 유효 기간 (초).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheTtlConfig {
    #[serde(default = "default_stocks_ttl")]
    pub stocks_secs: u64,
    #[serde(default = "default_stock_ttl")]
    pub stock_secs: u64,
    #[serde(default = "default_chart_ttl")]
    pub chart_secs: u64,
    #[serde(default = "default_quote_ttl")]
    pub quote_secs: u64,
    #[serde(default = "default_rps_ttl")]
    pub rps_secs: u64,
    #[serde(default = "default_capital_flow_ttl")]
    pub capital_flow_secs: u64,
    #[serde(default = "default_trade_dates_ttl")]
    pub trade_dates_secs: u64,
}

fn default_stocks_ttl() -> u64 {
    5 * 60
}
fn default_stock_ttl() -> u64 {
    2 * 60
}
fn default_chart_ttl() -> u64 {
    10 * 60
}
fn default_quote_ttl() -> u64 {
    30
}
fn default_rps_ttl() -> u64 {
    5 * 60
}
fn default_capital_flow_ttl() -> u64 {
    5 * 60
}
fn default_trade_dates_ttl() -> u64 {
    60 * 60
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            stocks_secs: default_stocks_ttl(),
            stock_secs: default_stock_ttl(),
            chart_secs: default_chart_ttl(),
            quote_secs: default_quote_ttl(),
            rps_secs: default_rps_ttl(),
            capital_flow_secs: default_capital_flow_ttl(),
            trade_dates_secs: default_trade_dates_ttl(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// 사용자 환경설정 위치.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserConfig {
    /// 관심 종목/화면 설정 JSON 파일
    pub preferences_path: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            preferences_path: "data/preferences.json".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    /// 형식이 잘못된 값은 [`DashError::Config`](crate::DashError::Config)로 보고합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> DashResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("api.base_url", default_api_base_url())?
            .set_default("api.timeout_ms", default_api_timeout_ms())?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("STOCKDASH")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> DashResult<Self> {
        Self::load("config/default.toml")
    }
}
