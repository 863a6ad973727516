//! 차트 조회 기간 정의.
//!
//! 과거 데이터 API의 `period` 쿼리 파라미터와 캐시 키 구성에 사용됩니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 차트 조회 기간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    /// 1일
    #[serde(rename = "1D")]
    D1,
    /// 5일
    #[serde(rename = "5D")]
    D5,
    /// 1개월
    #[default]
    #[serde(rename = "1M")]
    M1,
    /// 3개월
    #[serde(rename = "3M")]
    M3,
    /// 6개월
    #[serde(rename = "6M")]
    M6,
    /// 1년
    #[serde(rename = "1Y")]
    Y1,
    /// 5년
    #[serde(rename = "5Y")]
    Y5,
}

impl Period {
    /// 모든 기간 목록.
    pub const ALL: [Period; 7] = [
        Period::D1,
        Period::D5,
        Period::M1,
        Period::M3,
        Period::M6,
        Period::Y1,
        Period::Y5,
    ];

    /// API 파라미터 문자열을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::D1 => "1D",
            Period::D5 => "5D",
            Period::M1 => "1M",
            Period::M3 => "3M",
            Period::M6 => "6M",
            Period::Y1 => "1Y",
            Period::Y5 => "5Y",
        }
    }

    /// 기간에 포함되는 대략적인 일수.
    pub fn approx_days(&self) -> u32 {
        match self {
            Period::D1 => 1,
            Period::D5 => 5,
            Period::M1 => 30,
            Period::M3 => 90,
            Period::M6 => 180,
            Period::Y1 => 365,
            Period::Y5 => 5 * 365,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == upper)
            .ok_or_else(|| format!("Invalid period: {}", s))
    }
}
