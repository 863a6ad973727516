//! 종목 및 시세 데이터 타입.
//!
//! 이 모듈은 REST API가 반환하는 종목 관련 레코드를 정의합니다:
//! - `StockData` - 종목 카드/목록 레코드
//! - `StockQuote` - 실시간 시세
//! - `ChartPoint` - 과거 차트 데이터 포인트

use crate::types::{Amount, DecimalExt, Price};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 종목 요약 데이터 (가격 카드, 목록).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockData {
    /// 심볼 (예: "AAPL")
    pub symbol: String,
    /// 종목명
    pub name: String,
    /// 현재가
    pub price: Price,
    /// 전일 대비 변동폭
    pub change: Price,
    /// 전일 대비 변동률 (%)
    pub change_percent: Decimal,
    /// 거래량
    pub volume: u64,
    /// 시가총액
    pub market_cap: Amount,
}

impl StockData {
    /// 상승 여부.
    pub fn is_gaining(&self) -> bool {
        self.change > Decimal::ZERO
    }

    /// 이 종목 데이터로부터 시세를 만듭니다.
    pub fn to_quote(&self, timestamp: DateTime<Utc>) -> StockQuote {
        StockQuote {
            symbol: self.symbol.clone(),
            price: self.price,
            change: self.change,
            change_percent: self.change_percent,
            timestamp,
        }
    }

    /// 한 줄 요약 (CLI 출력용).
    pub fn summary_line(&self) -> String {
        format!(
            "{:<8} {:<28} {:>12} {:>10} {:>12}",
            self.symbol,
            self.name,
            self.price,
            self.change_percent.to_signed_percent(),
            self.market_cap.to_compact()
        )
    }
}

/// 실시간 시세.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    /// 심볼
    pub symbol: String,
    /// 현재가
    pub price: Price,
    /// 전일 대비 변동폭
    pub change: Price,
    /// 전일 대비 변동률 (%)
    pub change_percent: Decimal,
    /// 시세 시각
    pub timestamp: DateTime<Utc>,
}

/// 과거 차트 데이터 포인트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// 일자
    pub date: NaiveDate,
    /// 가격
    pub price: Price,
    /// 거래량
    pub volume: u64,
}
