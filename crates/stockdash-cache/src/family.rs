//! 엔티티 계열과 계열별 신선도 기간.

use crate::policy::StalenessPolicy;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// 캐시되는 엔티티 계열.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFamily {
    /// 종목 목록
    Stocks,
    /// 개별 종목
    Stock,
    /// 차트 시계열
    Chart,
    /// 실시간 시세
    Quote,
    /// RPS 순위표
    Rps,
    /// 자금 흐름
    CapitalFlow,
    /// 거래일 목록
    TradeDates,
}

impl CacheFamily {
    pub const ALL: [CacheFamily; 7] = [
        Self::Stocks,
        Self::Stock,
        Self::Chart,
        Self::Quote,
        Self::Rps,
        Self::CapitalFlow,
        Self::TradeDates,
    ];

    /// 로그/저장소 이름.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Stock => "stock",
            Self::Chart => "chart",
            Self::Quote => "quote",
            Self::Rps => "rps",
            Self::CapitalFlow => "capital_flow",
            Self::TradeDates => "trade_dates",
        }
    }

    /// 기본 신선도 기간.
    pub fn default_max_age(&self) -> Duration {
        match self {
            Self::Stocks => Duration::from_secs(5 * 60),
            Self::Stock => Duration::from_secs(2 * 60),
            Self::Chart => Duration::from_secs(10 * 60),
            Self::Quote => Duration::from_secs(30),
            Self::Rps => Duration::from_secs(5 * 60),
            Self::CapitalFlow => Duration::from_secs(5 * 60),
            Self::TradeDates => Duration::from_secs(60 * 60),
        }
    }
}

impl fmt::Display for CacheFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 계열별 신선도 기간 (설정으로 덮어쓸 수 있음).
#[derive(Debug, Clone, Default)]
pub struct FamilyDurations {
    overrides: HashMap<CacheFamily, Duration>,
}

impl FamilyDurations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 한 계열의 기간 덮어쓰기.
    pub fn with(mut self, family: CacheFamily, max_age: Duration) -> Self {
        self.overrides.insert(family, max_age);
        self
    }

    pub fn max_age(&self, family: CacheFamily) -> Duration {
        self.overrides
            .get(&family)
            .copied()
            .unwrap_or_else(|| family.default_max_age())
    }

    pub fn policy(&self, family: CacheFamily) -> StalenessPolicy {
        StalenessPolicy::new(self.max_age(family))
    }
}
