//! 캐시 기반 시장 데이터 서비스.
//!
//! 엔티티 계열마다 조정자 하나를 두고, 전송 클라이언트를 페치 함수로
//! 연결합니다. 모든 상태는 명시적으로 생성된 서비스 인스턴스가 소유하므로
//! 테스트마다 독립된 캐시를 만들 수 있습니다.

use crate::error::{ApiError, Result};
use crate::postgrest::{PostgrestClient, TradeDateSource};
use crate::stock_api::StockApiClient;
use crate::trade_dates::TradeDateCache;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use stockdash_cache::{
    Binding, BindingSnapshot, CacheFamily, CacheKey, CacheStore, Clock, CoordinatorStats, EnsureOptions,
    EnsureOutcome, FamilyDurations, FetchCoordinator, FetchError, KeyFetcher, SystemClock,
    DEFAULT_ERROR_MESSAGE,
};
use stockdash_core::{
    AppConfig, CacheTtlConfig, CapitalFlowRow, ChartPoint, Period, RpsFilter, RpsItem, StockData,
    StockQuote, TradeDatePage,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 한 번의 캐시 조회 결과.
///
/// 실패해도 이전 값이 있으면 `value`와 `error`가 함께 채워집니다.
#[derive(Debug)]
pub struct Lookup<T> {
    pub key: CacheKey,
    pub outcome: EnsureOutcome,
    pub value: Option<Arc<T>>,
    pub error: Option<String>,
}

impl<T> Lookup<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn read(
        coordinator: &FetchCoordinator<T>,
        key: CacheKey,
        outcome: EnsureOutcome,
    ) -> Self {
        let state = coordinator.store().entry_state(&key);
        Self {
            key,
            outcome,
            value: state.value,
            error: state.error,
        }
    }
}

impl<T> Lookup<T> {
    /// 마지막 갱신은 실패했지만 이전 값을 보여주는 상태.
    pub fn is_stale_fallback(&self) -> bool {
        self.value.is_some() && self.error.is_some()
    }

    /// 값이 있으면 값, 없으면 기록된 에러.
    ///
    /// 저장소에 값도 에러도 없으면 페치가 결과 없이 끝난 것입니다. 직접 취소했거나
    /// 기다리던 다른 호출자의 페치가 취소된 경우 [`ApiError::Cancelled`]를 반환합니다.
    pub fn into_result(self) -> Result<Arc<T>> {
        match (self.value, self.error) {
            (Some(value), _) => Ok(value),
            (None, Some(message)) => Err(ApiError::Failed(message)),
            (None, None) => match self.outcome {
                EnsureOutcome::Cancelled | EnsureOutcome::InFlight => Err(ApiError::Cancelled),
                _ => Err(ApiError::Failed(DEFAULT_ERROR_MESSAGE.to_string())),
            },
        }
    }
}

/// 계열별 신선도 설정을 캐시 기간으로 변환.
pub fn family_durations(config: &CacheTtlConfig) -> FamilyDurations {
    let secs = Duration::from_secs;
    FamilyDurations::new()
        .with(CacheFamily::Stocks, secs(config.stocks_secs))
        .with(CacheFamily::Stock, secs(config.stock_secs))
        .with(CacheFamily::Chart, secs(config.chart_secs))
        .with(CacheFamily::Quote, secs(config.quote_secs))
        .with(CacheFamily::Rps, secs(config.rps_secs))
        .with(CacheFamily::CapitalFlow, secs(config.capital_flow_secs))
        .with(CacheFamily::TradeDates, secs(config.trade_dates_secs))
}

fn coordinator<T: Send + Sync + 'static>(
    family: CacheFamily,
    durations: &FamilyDurations,
    clock: &Arc<dyn Clock>,
) -> Arc<FetchCoordinator<T>> {
    let store = Arc::new(CacheStore::with_clock(family.name(), Arc::clone(clock)));
    Arc::new(FetchCoordinator::new(store, durations.policy(family)))
}

/// `SYMBOL` 키로 시세를 가져오는 바인딩 페처.
struct QuoteFetcher {
    api: Arc<StockApiClient>,
}

#[async_trait]
impl KeyFetcher<StockQuote> for QuoteFetcher {
    async fn fetch(&self, key: &CacheKey) -> std::result::Result<StockQuote, FetchError> {
        Ok(self.api.get_quote(key.first_component()).await?)
    }
}

/// `SYMBOL:PERIOD` 키로 차트를 가져오는 바인딩 페처.
struct ChartFetcher {
    api: Arc<StockApiClient>,
}

#[async_trait]
impl KeyFetcher<Vec<ChartPoint>> for ChartFetcher {
    async fn fetch(&self, key: &CacheKey) -> std::result::Result<Vec<ChartPoint>, FetchError> {
        let period: Period = key
            .components()
            .nth(1)
            .unwrap_or_default()
            .parse()
            .map_err(ApiError::InvalidRequest)?;
        Ok(self.api.get_historical_data(key.first_component(), period).await?)
    }
}

/// 캐시 기반 시장 데이터 서비스.
pub struct MarketDataService {
    api: Arc<StockApiClient>,
    postgrest: Option<Arc<PostgrestClient>>,
    stocks: Arc<FetchCoordinator<Vec<StockData>>>,
    stock: Arc<FetchCoordinator<StockData>>,
    charts: Arc<FetchCoordinator<Vec<ChartPoint>>>,
    quotes: Arc<FetchCoordinator<StockQuote>>,
    rps: Arc<FetchCoordinator<Vec<RpsItem>>>,
    capital_flow: Arc<FetchCoordinator<Vec<CapitalFlowRow>>>,
    trade_dates: Option<TradeDateCache>,
}

impl MarketDataService {
    /// 클라이언트와 캐시 기간으로 서비스 생성.
    pub fn new(
        api: StockApiClient,
        postgrest: Option<PostgrestClient>,
        durations: FamilyDurations,
        trade_date_batch: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let postgrest = postgrest.map(Arc::new);
        let trade_dates = postgrest.as_ref().map(|client| {
            let source: Arc<dyn TradeDateSource> = client.clone();
            TradeDateCache::new(
                coordinator(CacheFamily::TradeDates, &durations, &clock),
                source,
                trade_date_batch,
            )
        });

        Self {
            api: Arc::new(api),
            stocks: coordinator(CacheFamily::Stocks, &durations, &clock),
            stock: coordinator(CacheFamily::Stock, &durations, &clock),
            charts: coordinator(CacheFamily::Chart, &durations, &clock),
            quotes: coordinator(CacheFamily::Quote, &durations, &clock),
            rps: coordinator(CacheFamily::Rps, &durations, &clock),
            capital_flow: coordinator(CacheFamily::CapitalFlow, &durations, &clock),
            postgrest,
            trade_dates,
        }
    }

    /// 애플리케이션 설정으로 생성.
    ///
    /// Supabase가 설정되지 않았으면 자금 흐름/거래일 조회만 비활성화됩니다.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api = StockApiClient::from_config(&config.api)?;
        let postgrest = match PostgrestClient::from_config(&config.supabase, config.api.timeout()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Supabase 비활성화");
                None
            }
        };

        info!(
            base_url = %config.api.base_url,
            environment = %config.api.environment,
            supabase = postgrest.is_some(),
            "시장 데이터 서비스 초기화"
        );

        Ok(Self::new(
            api,
            postgrest,
            family_durations(&config.cache),
            config.supabase.trade_date_batch_size,
            Arc::new(SystemClock),
        ))
    }

    pub fn api(&self) -> &StockApiClient {
        &self.api
    }

    // ==================== 조회 ====================

    /// 실시간 시세.
    pub async fn quote(&self, symbol: &str, force: bool) -> Result<Lookup<StockQuote>> {
        let key = CacheKey::symbol(symbol)?;
        let api = Arc::clone(&self.api);
        let sym = key.to_string();
        Ok(lookup(&self.quotes, key, force, move || async move {
            api.get_quote(&sym).await
        })
        .await)
    }

    /// 여러 시세 (심볼별 캐시를 공유).
    pub async fn quotes(&self, symbols: &[String], force: bool) -> Vec<Result<Lookup<StockQuote>>> {
        join_all(symbols.iter().map(|symbol| self.quote(symbol, force))).await
    }

    /// 개별 종목.
    pub async fn stock(&self, symbol: &str, force: bool) -> Result<Lookup<StockData>> {
        let key = CacheKey::symbol(symbol)?;
        let api = Arc::clone(&self.api);
        let sym = key.to_string();
        Ok(lookup(&self.stock, key, force, move || async move {
            api.get_stock(&sym).await
        })
        .await)
    }

    /// 종목 목록.
    pub async fn stocks(&self, force: bool) -> Result<Lookup<Vec<StockData>>> {
        let key = CacheKey::new("all")?;
        let api = Arc::clone(&self.api);
        Ok(lookup(&self.stocks, key, force, move || async move { api.get_stocks().await }).await)
    }

    /// 차트 시계열.
    pub async fn chart(
        &self,
        symbol: &str,
        period: Period,
        force: bool,
    ) -> Result<Lookup<Vec<ChartPoint>>> {
        let key = CacheKey::symbol_period(symbol, period)?;
        let api = Arc::clone(&self.api);
        let sym = key.first_component().to_string();
        Ok(lookup(&self.charts, key, force, move || async move {
            api.get_historical_data(&sym, period).await
        })
        .await)
    }

    /// RPS 순위표 (날짜 + 필터별 캐시).
    pub async fn rps(
        &self,
        date: NaiveDate,
        filter: &RpsFilter,
        force: bool,
    ) -> Result<Lookup<Vec<RpsItem>>> {
        let key = CacheKey::composite(&[
            "rps".to_string(),
            date.format("%Y-%m-%d").to_string(),
            filter.fingerprint(),
        ])?;
        let api = Arc::clone(&self.api);
        let filter = filter.clone();
        Ok(lookup(&self.rps, key, force, move || async move {
            api.get_rps(date, &filter).await
        })
        .await)
    }

    /// 자금 흐름 (`date`까지 `days`일).
    pub async fn capital_flow(
        &self,
        date: NaiveDate,
        days: u32,
        force: bool,
    ) -> Result<Lookup<Vec<CapitalFlowRow>>> {
        let key = CacheKey::composite(&[
            "capital_flow".to_string(),
            date.format("%Y-%m-%d").to_string(),
            days.max(1).to_string(),
        ])?;
        let client = self.postgrest.clone();
        Ok(lookup(&self.capital_flow, key, force, move || async move {
            match client {
                Some(client) => client.capital_flow(date, days).await,
                None => Err(ApiError::NotConfigured(
                    "Supabase client is not configured".to_string(),
                )),
            }
        })
        .await)
    }

    /// 최근 거래일 목록.
    pub async fn trade_dates(
        &self,
        before: Option<NaiveDate>,
        limit: Option<usize>,
    ) -> Result<Lookup<TradeDatePage>> {
        self.trade_date_cache()?.prefetch(before, limit).await
    }

    /// 거래일 달력에 이전 배치를 더 합칩니다.
    pub async fn load_more_trade_dates(&self) -> Result<Arc<TradeDatePage>> {
        self.trade_date_cache()?.load_more().await
    }

    /// 지금까지 합친 거래일 달력.
    pub fn trade_date_calendar(&self) -> Option<Arc<TradeDatePage>> {
        self.trade_dates.as_ref().and_then(TradeDateCache::calendar)
    }

    fn trade_date_cache(&self) -> Result<&TradeDateCache> {
        self.trade_dates.as_ref().ok_or_else(|| {
            ApiError::NotConfigured("Supabase client is not configured".to_string())
        })
    }

    // ==================== 무효화 ====================

    /// 차트 캐시 무효화. 기간이 없으면 심볼의 모든 기간.
    pub fn invalidate_chart(&self, symbol: &str, period: Option<Period>) -> Result<()> {
        match period {
            Some(period) => {
                let key = CacheKey::symbol_period(symbol, period)?;
                self.charts.store().invalidate(&key);
            }
            None => {
                let key = CacheKey::symbol(symbol)?;
                self.charts.store().invalidate_prefix(key.as_str());
            }
        }
        Ok(())
    }

    /// 시세 캐시 무효화.
    pub fn invalidate_quote(&self, symbol: &str) -> Result<()> {
        self.quotes.store().invalidate(&CacheKey::symbol(symbol)?);
        Ok(())
    }

    // ==================== 바인딩 / 주기 갱신 ====================

    /// 시세 바인딩.
    pub fn quote_binding(&self, symbol: &str) -> Result<Binding<StockQuote>> {
        let fetcher = Arc::new(QuoteFetcher {
            api: Arc::clone(&self.api),
        });
        Ok(Binding::new(
            Arc::clone(&self.quotes),
            fetcher,
            CacheKey::symbol(symbol)?,
        ))
    }

    /// 차트 바인딩.
    pub fn chart_binding(&self, symbol: &str, period: Period) -> Result<Binding<Vec<ChartPoint>>> {
        let fetcher = Arc::new(ChartFetcher {
            api: Arc::clone(&self.api),
        });
        Ok(Binding::new(
            Arc::clone(&self.charts),
            fetcher,
            CacheKey::symbol_period(symbol, period)?,
        ))
    }

    /// 토큰이 취소될 때까지 `interval`마다 시세 갱신.
    ///
    /// 로딩이 끝난 스냅샷이 바뀔 때마다 `on_update`가 호출됩니다.
    /// 성공한 갱신 횟수를 반환합니다.
    pub async fn watch_quote<F>(
        &self,
        symbol: &str,
        interval: Duration,
        token: &CancellationToken,
        mut on_update: F,
    ) -> Result<u64>
    where
        F: FnMut(&BindingSnapshot<StockQuote>),
    {
        let mut binding = self.quote_binding(symbol)?;
        let key = binding.key().clone();
        let api = Arc::clone(&self.api);
        let sym = key.to_string();

        let refresh = self.quotes.refresh_every(
            &key,
            |signal: CancellationToken| {
                let api = Arc::clone(&api);
                let sym = sym.clone();
                async move {
                    tokio::select! {
                        _ = signal.cancelled() => Err(ApiError::Cancelled),
                        result = api.get_quote(&sym) => result,
                    }
                }
            },
            interval,
            token,
        );

        let notify = async {
            let mut last = binding.snapshot();
            while binding.changed().await {
                let snapshot = binding.snapshot();
                if snapshot.loading || Arc::ptr_eq(&snapshot, &last) {
                    continue;
                }
                on_update(&snapshot);
                last = snapshot;
            }
        };

        tokio::select! {
            refreshed = refresh => Ok(refreshed),
            _ = notify => Ok(0),
        }
    }

    /// 계열별 조정자 통계.
    pub fn stats(&self) -> Vec<(CacheFamily, CoordinatorStats)> {
        let mut stats = vec![
            (CacheFamily::Stocks, self.stocks.stats()),
            (CacheFamily::Stock, self.stock.stats()),
            (CacheFamily::Chart, self.charts.stats()),
            (CacheFamily::Quote, self.quotes.stats()),
            (CacheFamily::Rps, self.rps.stats()),
            (CacheFamily::CapitalFlow, self.capital_flow.stats()),
        ];
        if let Some(cache) = &self.trade_dates {
            stats.push((CacheFamily::TradeDates, cache.stats()));
        }
        stats
    }
}

/// `ensure` 후 다른 호출자의 페치가 끝나길 기다렸다가 상태를 읽습니다.
async fn lookup<T, F, Fut>(
    coordinator: &FetchCoordinator<T>,
    key: CacheKey,
    force: bool,
    fetch: F,
) -> Lookup<T>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcome = coordinator
        .ensure_and_wait(&key, fetch, EnsureOptions { force })
        .await;
    Lookup::read(coordinator, key, outcome)
}
