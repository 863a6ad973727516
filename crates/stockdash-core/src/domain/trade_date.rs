//! 거래일 목록.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// 장 마감 기준 시각 (UTC+8, 시).
pub const MARKET_CLOSE_HOUR: u32 = 15;

const MARKET_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// 한 번에 가져온 거래일 묶음 (최신순).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDatePage {
    pub dates: Vec<NaiveDate>,
    /// 더 이전 거래일이 남아 있을 수 있는지
    pub has_more: bool,
}

impl TradeDatePage {
    /// 요청 한도 기준으로 페이지 구성.
    ///
    /// 한도만큼 채워졌으면 더 있을 수 있다고 봅니다.
    pub fn from_batch(dates: Vec<NaiveDate>, limit: usize) -> Self {
        let has_more = dates.len() >= limit;
        Self { dates, has_more }
    }

    /// 가장 최근 거래일.
    pub fn latest(&self) -> Option<NaiveDate> {
        self.dates.iter().max().copied()
    }

    /// 가장 오래된 거래일 (다음 페이지 조회 기준).
    pub fn oldest(&self) -> Option<NaiveDate> {
        self.dates.iter().min().copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// 이전 거래일 묶음을 합친 새 페이지.
    ///
    /// 날짜는 합집합을 최신순으로 정렬합니다. 요청 한도보다 적게 왔으면
    /// 더 이전 거래일이 없다고 봅니다.
    pub fn merge_older(&self, older: &[NaiveDate], limit: usize) -> Self {
        let mut dates: Vec<NaiveDate> = self.dates.iter().chain(older).copied().collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        Self {
            dates,
            has_more: older.len() >= limit.max(1),
        }
    }

    /// 기본으로 보여줄 거래일.
    ///
    /// 장 마감(UTC+8 15시) 전에는 당일 데이터가 아직 없으므로 두 번째
    /// 거래일을 고릅니다.
    pub fn default_pick(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let first = *self.dates.first()?;
        let offset = FixedOffset::east_opt(MARKET_UTC_OFFSET_SECS)?;
        let before_close = now.with_timezone(&offset).hour() < MARKET_CLOSE_HOUR;
        if before_close {
            if let Some(previous) = self.dates.get(1) {
                return Some(*previous);
            }
        }
        Some(first)
    }
}
