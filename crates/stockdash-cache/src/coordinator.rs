//! 페치 조정자.
//!
//! 비동기 페치 함수를 캐시 저장소에 연결합니다.
//!
//! ```text
//! ensure(key, fetch, force)
//!         │
//!   ┌─────▼──────────────┐
//!   │ 1. 신선도 확인       │ ← 값 있음 + 신선 + 로딩 아님 → Fresh
//!   └─────┬──────────────┘
//!   ┌─────▼──────────────┐
//!   │ 2. 페치 권한 획득    │ ← 이미 로딩 중 → InFlight (중복 요청 없음)
//!   └─────┬──────────────┘
//!   ┌─────▼──────────────┐
//!   │ 3. fetch().await    │
//!   └─────┬──────────────┘
//!     성공 │ 실패 / 취소
//!         ▼
//!   값 교체 / 에러 기록 / (취소는 기록 없음) + 로딩 해제
//! ```
//!
//! 페치 에러는 호출자에게 전파되지 않고 [`CacheStore::error`]로만 관찰됩니다.
//! 자동 재시도는 없으며, 호출자가 `force`로 다시 요청합니다.

use crate::key::CacheKey;
use crate::policy::StalenessPolicy;
use crate::store::{Action, CacheStore};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// 빈 에러 메시지 대체 문구.
pub const DEFAULT_ERROR_MESSAGE: &str = "fetch failed";

/// 주기 갱신 최소 간격. 이보다 짧은 주기는 이 값으로 올립니다.
pub const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(10);

/// `ensure` 옵션.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureOptions {
    /// 신선한 값이 있어도 다시 페치
    pub force: bool,
}

impl EnsureOptions {
    pub fn force() -> Self {
        Self { force: true }
    }
}

/// `ensure` 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// 신선한 값이 있어 I/O 없음
    Fresh,
    /// 다른 호출자가 페치 중이라 새 요청을 만들지 않음
    InFlight,
    /// 페치 성공, 값 교체됨
    Fetched,
    /// 페치 실패, 에러 메시지 기록됨 (기존 값 유지)
    Failed(String),
    /// 페치 취소됨 (에러/값 기록 없음)
    Cancelled,
}

impl EnsureOutcome {
    /// 이 호출이 실제로 페치 함수를 실행했는지.
    pub fn did_fetch(&self) -> bool {
        matches!(self, Self::Fetched | Self::Failed(_) | Self::Cancelled)
    }
}

/// 조정자 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// 신선한 값으로 응답한 횟수
    pub hits: u64,
    /// 페치를 시작한 횟수
    pub misses: u64,
    /// 진행 중인 페치 때문에 건너뛴 횟수
    pub deduplicated: u64,
    pub failures: u64,
    pub cancellations: u64,
}

impl CoordinatorStats {
    /// 캐시 적중률 (0.0 ~ 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    deduplicated: AtomicU64,
    failures: AtomicU64,
    cancellations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 로딩 플래그 해제 가드.
///
/// 페치 future가 드롭되거나 패닉해도 키가 로딩 상태로 남지 않게 합니다.
struct LoadingGuard<'a, T> {
    store: &'a CacheStore<T>,
    key: &'a CacheKey,
    armed: bool,
}

impl<'a, T> LoadingGuard<'a, T> {
    fn new(store: &'a CacheStore<T>, key: &'a CacheKey) -> Self {
        Self {
            store,
            key,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            debug!(store = %self.store.name(), key = %self.key, "페치 중단, 로딩 해제");
            self.store.set_loading(self.key, false);
        }
    }
}

/// 키별 단일 페치를 보장하는 조정자.
pub struct FetchCoordinator<T> {
    store: Arc<CacheStore<T>>,
    policy: StalenessPolicy,
    counters: Counters,
}

impl<T> fmt::Debug for FetchCoordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("store", &self.store.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T> FetchCoordinator<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(store: Arc<CacheStore<T>>, policy: StalenessPolicy) -> Self {
        Self {
            store,
            policy,
            counters: Counters::default(),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore<T>> {
        &self.store
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// 값이 있고 신선하며 로딩 중이 아닌지.
    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        let state = self.store.entry_state(key);
        state.value.is_some()
            && !state.loading
            && self
                .policy
                .is_fresh(state.last_fetch, self.store.now_millis())
    }

    /// 필요할 때만 페치하여 캐시를 채움.
    ///
    /// 진행 중인 페치가 있으면 기다리지 않고 [`EnsureOutcome::InFlight`]를
    /// 반환합니다. 결과가 필요하면 [`FetchCoordinator::wait_for_idle`]을 사용합니다.
    #[instrument(skip(self, fetch), fields(store = %self.store.name(), key = %key, force = options.force))]
    pub async fn ensure<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
        options: EnsureOptions,
    ) -> EnsureOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if let Some(outcome) = self.begin(key, options) {
            return outcome;
        }

        let guard = LoadingGuard::new(&self.store, key);
        let result = fetch().await;
        self.complete(key, result, guard)
    }

    /// 취소 토큰을 페치 함수에 전달하는 `ensure`.
    ///
    /// 토큰이 취소되면 페치 future를 드롭하고 로딩만 해제합니다.
    /// 에러는 기록하지 않고 기존 값도 그대로 둡니다.
    #[instrument(skip(self, token, fetch), fields(store = %self.store.name(), key = %key, force = options.force))]
    pub async fn ensure_with_cancel<F, Fut, E>(
        &self,
        key: &CacheKey,
        token: &CancellationToken,
        fetch: F,
        options: EnsureOptions,
    ) -> EnsureOutcome
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if token.is_cancelled() {
            Counters::bump(&self.counters.cancellations);
            debug!("이미 취소된 요청");
            return EnsureOutcome::Cancelled;
        }
        if let Some(outcome) = self.begin(key, options) {
            return outcome;
        }

        let guard = LoadingGuard::new(&self.store, key);
        let fetch_fut = fetch(token.clone());
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                Counters::bump(&self.counters.cancellations);
                info!("페치 취소됨");
                drop(guard);
                EnsureOutcome::Cancelled
            }
            result = fetch_fut => self.complete(key, result, guard),
        }
    }

    /// `ensure` 후 다른 호출자의 페치가 진행 중이었다면 끝날 때까지 대기.
    pub async fn ensure_and_wait<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
        options: EnsureOptions,
    ) -> EnsureOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let outcome = self.ensure(key, fetch, options).await;
        if outcome == EnsureOutcome::InFlight {
            self.wait_for_idle(key).await;
        }
        outcome
    }

    /// 키의 로딩 플래그가 꺼질 때까지 대기.
    pub async fn wait_for_idle(&self, key: &CacheKey) {
        let mut revisions = self.store.subscribe();
        while self.store.loading(key) {
            if revisions.changed().await.is_err() {
                break;
            }
        }
    }

    /// 주기적으로 강제 페치 (토큰이 취소될 때까지).
    ///
    /// 첫 페치는 즉시 실행됩니다. 성공한 페치 횟수를 반환합니다.
    /// `period`가 [`MIN_REFRESH_PERIOD`]보다 짧으면 최소 간격을 사용합니다.
    pub async fn refresh_every<F, Fut, E>(
        &self,
        key: &CacheKey,
        mut fetch: F,
        period: Duration,
        token: &CancellationToken,
    ) -> u64
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if period < MIN_REFRESH_PERIOD {
            warn!(requested = ?period, "갱신 주기가 너무 짧아 최소 간격 사용");
        }
        let mut ticker = tokio::time::interval(period.max(MIN_REFRESH_PERIOD));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut refreshed = 0;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let outcome = self
                .ensure_with_cancel(key, token, &mut fetch, EnsureOptions::force())
                .await;
            match outcome {
                EnsureOutcome::Fetched => refreshed += 1,
                EnsureOutcome::Cancelled => break,
                _ => {}
            }
        }

        debug!(store = %self.store.name(), key = %key, refreshed, "주기 갱신 종료");
        refreshed
    }

    /// 통계 스냅샷.
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            deduplicated: self.counters.deduplicated.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            cancellations: self.counters.cancellations.load(Ordering::Relaxed),
        }
    }

    /// 1~2단계: 신선도 확인과 페치 권한 획득.
    ///
    /// `None`이면 호출자가 페치를 진행해야 합니다.
    fn begin(&self, key: &CacheKey, options: EnsureOptions) -> Option<EnsureOutcome> {
        if !options.force && self.is_fresh(key) {
            Counters::bump(&self.counters.hits);
            debug!("신선한 캐시 사용");
            return Some(EnsureOutcome::Fresh);
        }

        if !self.store.try_begin_fetch(key) {
            Counters::bump(&self.counters.deduplicated);
            debug!("진행 중인 페치 존재, 중복 요청 생략");
            return Some(EnsureOutcome::InFlight);
        }

        Counters::bump(&self.counters.misses);
        None
    }

    /// 3단계: 결과 기록과 로딩 해제를 한 번에 적용.
    fn complete<E: fmt::Display>(
        &self,
        key: &CacheKey,
        result: std::result::Result<T, E>,
        guard: LoadingGuard<'_, T>,
    ) -> EnsureOutcome {
        let done = Action::SetLoading {
            key: key.clone(),
            loading: false,
        };

        let outcome = match result {
            Ok(value) => {
                self.store.dispatch_all([
                    Action::SetEntry {
                        key: key.clone(),
                        value: Arc::new(value),
                        at: self.store.now_millis(),
                    },
                    done,
                ]);
                info!("페치 완료");
                EnsureOutcome::Fetched
            }
            Err(e) => {
                let message = normalize_message(&e);
                Counters::bump(&self.counters.failures);
                warn!(error = %message, "페치 실패, 기존 캐시 유지");
                self.store.dispatch_all([
                    Action::SetError {
                        key: key.clone(),
                        message: Some(message.clone()),
                    },
                    done,
                ]);
                EnsureOutcome::Failed(message)
            }
        };

        guard.disarm();
        outcome
    }
}

/// 에러를 표시용 메시지로 변환.
pub fn normalize_message(error: &impl fmt::Display) -> String {
    let message = error.to_string();
    let trimmed = message.trim();
    if trimmed.is_empty() {
        DEFAULT_ERROR_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}
