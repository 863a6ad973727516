//! 거래일 선조회 캐시.
//!
//! 화면이 열리기 전에 최근 거래일 목록을 미리 가져옵니다. 같은 조건의 동시
//! 선조회는 하나의 요청을 공유하고, 실패하면 값이 남지 않으므로 다음 호출이
//! 다시 시도합니다.
//!
//! 처음 받은 페이지는 달력의 시작점이 되고, [`TradeDateCache::load_more`]가
//! 가장 오래된 날짜 이전 페이지를 받아 달력에 합칩니다.

use crate::error::Result;
use crate::postgrest::TradeDateSource;
use crate::service::Lookup;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use stockdash_cache::{CacheKey, CoordinatorStats, EnsureOptions, FetchCoordinator};
use stockdash_core::TradeDatePage;
use tracing::debug;

/// 기본 `before` 날짜: 내일 (오늘 거래일을 포함하기 위함).
pub fn default_before_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(1)
}

/// 거래일 선조회 캐시.
pub struct TradeDateCache {
    coordinator: Arc<FetchCoordinator<TradeDatePage>>,
    source: Arc<dyn TradeDateSource>,
    batch_size: usize,
    /// 지금까지 합친 거래일 (최신순)
    calendar: RwLock<Option<Arc<TradeDatePage>>>,
}

impl TradeDateCache {
    pub fn new(
        coordinator: Arc<FetchCoordinator<TradeDatePage>>,
        source: Arc<dyn TradeDateSource>,
        batch_size: usize,
    ) -> Self {
        Self {
            coordinator,
            source,
            batch_size: batch_size.max(1),
            calendar: RwLock::new(None),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    fn key(before: NaiveDate, limit: usize) -> Result<CacheKey> {
        Ok(CacheKey::composite(&[
            "trade_dates".to_string(),
            before.format("%Y-%m-%d").to_string(),
            limit.to_string(),
        ])?)
    }

    /// 이미 캐시된 페이지 (I/O 없음).
    pub fn cached(&self, before: NaiveDate, limit: usize) -> Option<Arc<TradeDatePage>> {
        let key = Self::key(before, limit).ok()?;
        self.coordinator.store().get(&key)
    }

    /// 지금까지 합친 거래일 달력.
    pub fn calendar(&self) -> Option<Arc<TradeDatePage>> {
        self.calendar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 달력 기준 기본 선택 거래일.
    pub fn default_date(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        self.calendar()?.default_pick(now)
    }

    /// 달력이 비어 있을 때만 첫 페이지로 채웁니다.
    fn seed_calendar(&self, page: &Arc<TradeDatePage>) {
        let mut calendar = self.calendar.write().unwrap_or_else(PoisonError::into_inner);
        if calendar.is_none() {
            *calendar = Some(Arc::clone(page));
        }
    }

    fn merge_calendar(&self, older: &TradeDatePage, limit: usize) -> Arc<TradeDatePage> {
        let mut calendar = self.calendar.write().unwrap_or_else(PoisonError::into_inner);
        let merged = match calendar.as_ref() {
            Some(current) => Arc::new(current.merge_older(&older.dates, limit)),
            None => Arc::new(older.clone()),
        };
        *calendar = Some(Arc::clone(&merged));
        merged
    }

    /// 달력의 가장 오래된 날짜 이전 거래일을 한 배치 더 가져와 합칩니다.
    ///
    /// 달력이 비어 있으면 기본 선조회로 시작하고, 더 이전 거래일이 없으면
    /// 요청 없이 현재 달력을 돌려줍니다.
    pub async fn load_more(&self) -> Result<Arc<TradeDatePage>> {
        let Some(current) = self.calendar() else {
            return self.prefetch(None, None).await?.into_result();
        };
        let oldest = match current.oldest() {
            Some(oldest) if current.has_more => oldest,
            _ => return Ok(current),
        };

        let page = self
            .prefetch(Some(oldest), Some(self.batch_size))
            .await?
            .into_result()?;
        let merged = self.merge_calendar(&page, self.batch_size);
        debug!(
            added = page.dates.len(),
            total = merged.dates.len(),
            has_more = merged.has_more,
            "거래일 추가 조회"
        );
        Ok(merged)
    }

    /// 거래일 선조회.
    ///
    /// `before`가 없으면 내일, `limit`이 없으면 배치 크기를 사용합니다.
    pub async fn prefetch(
        &self,
        before: Option<NaiveDate>,
        limit: Option<usize>,
    ) -> Result<Lookup<TradeDatePage>> {
        let before = before.unwrap_or_else(default_before_date);
        let limit = limit.unwrap_or(self.batch_size).max(1);
        let key = Self::key(before, limit)?;

        let source = Arc::clone(&self.source);
        let outcome = self
            .coordinator
            .ensure_and_wait(
                &key,
                move || async move {
                    let dates = source.trade_dates(before, limit).await?;
                    debug!(count = dates.len(), limit, "거래일 조회 완료");
                    Ok::<_, crate::error::ApiError>(TradeDatePage::from_batch(dates, limit))
                },
                EnsureOptions::default(),
            )
            .await;

        let lookup = Lookup::read(&self.coordinator, key, outcome);
        if let Some(page) = &lookup.value {
            self.seed_calendar(page);
        }
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stockdash_cache::{CacheStore, StalenessPolicy};

    /// 호출 횟수를 세고, 처음 `fail_first`번은 실패하는 공급자.
    struct FakeSource {
        calls: AtomicUsize,
        fail_first: usize,
        available: Vec<NaiveDate>,
    }

    #[async_trait]
    impl TradeDateSource for FakeSource {
        async fn trade_dates(&self, before: NaiveDate, limit: usize) -> Result<Vec<NaiveDate>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            if call < self.fail_first {
                return Err(ApiError::Network("connection reset".to_string()));
            }
            let mut dates: Vec<NaiveDate> =
                self.available.iter().copied().filter(|d| *d < before).collect();
            dates.sort_by(|a, b| b.cmp(a));
            dates.truncate(limit);
            Ok(dates)
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn cache(source: Arc<FakeSource>) -> TradeDateCache {
        let coordinator = Arc::new(FetchCoordinator::new(
            Arc::new(CacheStore::new("trade_dates")),
            StalenessPolicy::new(std::time::Duration::from_secs(3600)),
        ));
        TradeDateCache::new(coordinator, source, 3)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_prefetch_shares_request() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            available: vec![date(2), date(3), date(4), date(5)],
        });
        let cache = cache(Arc::clone(&source));

        let (a, b) = tokio::join!(
            cache.prefetch(Some(date(10)), None),
            cache.prefetch(Some(date(10)), None)
        );

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let a = a.unwrap().into_result().unwrap();
        let b = b.unwrap().into_result().unwrap();
        assert_eq!(a.dates, vec![date(5), date(4), date(3)]);
        assert!(a.has_more);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.cached(date(10), 3).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_allows_retry() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
            fail_first: 1,
            available: vec![date(2)],
        });
        let cache = cache(Arc::clone(&source));

        let first = cache.prefetch(Some(date(10)), None).await.unwrap();
        assert!(first.into_result().is_err());

        let second = cache.prefetch(Some(date(10)), None).await.unwrap();
        let page = second.into_result().unwrap();
        assert_eq!(page.dates, vec![date(2)]);
        assert!(!page.has_more);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_merges_older_pages() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            available: (1..=8).map(date).collect(),
        });
        let cache = cache(Arc::clone(&source));

        let first = cache.prefetch(Some(date(10)), None).await.unwrap();
        first.into_result().unwrap();
        assert_eq!(cache.calendar().unwrap().dates, vec![date(8), date(7), date(6)]);

        let merged = cache.load_more().await.unwrap();
        assert_eq!(merged.dates, vec![date(8), date(7), date(6), date(5), date(4), date(3)]);
        assert!(merged.has_more);

        let merged = cache.load_more().await.unwrap();
        assert_eq!(merged.dates.len(), 8);
        assert_eq!(merged.oldest(), Some(date(1)));
        assert!(!merged.has_more);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        // 더 없으면 요청하지 않음
        let again = cache.load_more().await.unwrap();
        assert!(Arc::ptr_eq(&again, &merged));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_failure_keeps_calendar() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            available: (1..=8).map(date).collect(),
        });
        let cache = cache(Arc::clone(&source));
        cache.prefetch(Some(date(10)), None).await.unwrap();

        let flaky = TradeDateCache::new(
            Arc::clone(&cache.coordinator),
            Arc::new(FakeSource {
                calls: AtomicUsize::new(0),
                fail_first: 1,
                available: Vec::new(),
            }),
            3,
        );
        flaky.seed_calendar(&cache.calendar().unwrap());

        assert!(flaky.load_more().await.is_err());
        assert_eq!(flaky.calendar().unwrap().dates.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_starts_with_default_prefetch() {
        let today = Utc::now().date_naive();
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            available: vec![today, today - Duration::days(1)],
        });
        let cache = cache(Arc::clone(&source));

        let page = cache.load_more().await.unwrap();
        assert_eq!(page.dates, vec![today, today - Duration::days(1)]);
        assert!(!page.has_more);
        assert_eq!(cache.calendar().unwrap().dates.len(), 2);
        assert!(cache.default_date(Utc::now()).is_some());
    }

    #[test]
    fn test_default_before_is_tomorrow() {
        assert_eq!(
            default_before_date(),
            Utc::now().date_naive() + Duration::days(1)
        );
    }
}
