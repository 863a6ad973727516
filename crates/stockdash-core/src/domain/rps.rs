//! RPS(Relative Price Strength) 순위 테이블 타입.

use crate::types::Amount;
use serde::{Deserialize, Serialize};

/// RPS 테이블의 한 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpsItem {
    /// 종목 코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 3일 RPS
    pub rps3: f64,
    /// 5일 RPS
    pub rps5: f64,
    /// 15일 RPS
    pub rps15: f64,
    /// 30일 RPS
    pub rps30: f64,
    /// 상장 일수
    pub listed_days: u32,
    /// 시가총액
    pub market_cap: Amount,
    /// 유통 시가총액
    pub circulating_market_cap: Amount,
}

/// 닫힌 구간 필터 `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub min: f64,
    pub max: f64,
}

impl RangeFilter {
    /// 새 구간 필터 생성.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// 쿼리 파라미터 값 형식 `(min,max)`.
    pub fn to_query_value(&self) -> String {
        format!("({},{})", self.min, self.max)
    }

    /// 값이 구간 안에 있는지 확인.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// RPS 조회 필터.
///
/// 지정되지 않은 항목은 쿼리에서 생략됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpsFilter {
    pub rps3: Option<RangeFilter>,
    pub rps5: Option<RangeFilter>,
    pub rps15: Option<RangeFilter>,
    pub rps30: Option<RangeFilter>,
    /// 최소 유통 시가총액
    pub market_cap: Option<f64>,
    /// 최소 상장 일수
    pub listing_days: Option<u32>,
}

impl RpsFilter {
    /// 쿼리 파라미터 목록으로 변환합니다.
    ///
    /// 하한만 있는 항목은 `(value,)` 형식을 사용합니다.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let ranges = [
            ("rps3", self.rps3),
            ("rps5", self.rps5),
            ("rps15", self.rps15),
            ("rps30", self.rps30),
        ];
        for (name, range) in ranges {
            if let Some(range) = range {
                pairs.push((name, range.to_query_value()));
            }
        }
        if let Some(cap) = self.market_cap {
            pairs.push(("circulating_market_cap", format!("({},)", cap)));
        }
        if let Some(days) = self.listing_days {
            pairs.push(("listed_days", format!("({},)", days)));
        }
        pairs
    }

    /// 캐시 키 구성용 안정적인 지문.
    ///
    /// 같은 필터는 항상 같은 문자열을 만듭니다.
    pub fn fingerprint(&self) -> String {
        let pairs = self.to_query_pairs();
        if pairs.is_empty() {
            return "all".to_string();
        }
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}
