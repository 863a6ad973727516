//! 신선도(staleness) 정책.

use std::time::Duration;

/// 캐시 항목을 신선하다고 볼 최대 경과 시간.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    max_age: Duration,
}

impl StalenessPolicy {
    /// 새 정책 생성.
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// 최대 경과 시간.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// 마지막 페치 시각 기준으로 신선한지 판단.
    ///
    /// 페치 기록이 없거나 0(무효화됨)이면 신선하지 않습니다.
    /// 시계가 뒤로 간 경우(미래 시각)는 경과 시간 0으로 봅니다.
    pub fn is_fresh(&self, last_fetch: Option<i64>, now_millis: i64) -> bool {
        match last_fetch {
            Some(fetched_at) if fetched_at > 0 => {
                let age = now_millis.saturating_sub(fetched_at).max(0) as u128;
                age < self.max_age.as_millis()
            }
            _ => false,
        }
    }

    /// 마지막 페치 이후 경과 시간.
    pub fn age(last_fetch: Option<i64>, now_millis: i64) -> Option<Duration> {
        match last_fetch {
            Some(fetched_at) if fetched_at > 0 => {
                let age = now_millis.saturating_sub(fetched_at).max(0) as u64;
                Some(Duration::from_millis(age))
            }
            _ => None,
        }
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
