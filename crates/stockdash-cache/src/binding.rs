//! 소비자 바인딩.
//!
//! 키 하나에 대해 `{ value, loading, error, refetch }` 뷰를 제공합니다.
//! 처음 관찰할 때와 키가 바뀌었을 때만 페치하며, 같은 키로 다시 관찰해도
//! 새 요청을 만들지 않습니다.
//!
//! [`Binding::snapshot`]은 (값, 로딩, 에러)가 바뀌지 않는 동안 같은 `Arc`를
//! 돌려주므로 호출자는 `Arc::ptr_eq`로 변경 여부를 판단할 수 있습니다.

use crate::coordinator::{EnsureOptions, EnsureOutcome, FetchCoordinator};
use crate::key::CacheKey;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;

/// 페치 함수가 반환하는 에러.
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// 키로 값을 가져오는 페치 소스.
#[async_trait]
pub trait KeyFetcher<T>: Send + Sync {
    async fn fetch(&self, key: &CacheKey) -> Result<T, FetchError>;
}

/// 클로저를 [`KeyFetcher`]로 감싸는 어댑터.
pub struct FnFetcher<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> FnFetcher<F, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T> KeyFetcher<T> for FnFetcher<F, T>
where
    F: Fn(CacheKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, FetchError>> + Send,
    T: Send + 'static,
{
    async fn fetch(&self, key: &CacheKey) -> Result<T, FetchError> {
        (self.f)(key.clone()).await
    }
}

/// 바인딩이 노출하는 읽기 전용 뷰.
pub struct BindingSnapshot<T> {
    pub key: CacheKey,
    pub value: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T: fmt::Debug> fmt::Debug for BindingSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSnapshot")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

impl<T> BindingSnapshot<T> {
    fn same_as(&self, key: &CacheKey, value: &Option<Arc<T>>, loading: bool, error: &Option<String>) -> bool {
        let same_value = match (&self.value, value) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_value && self.loading == loading && &self.error == error && &self.key == key
    }
}

/// 키 하나에 묶인 소비자 뷰.
pub struct Binding<T> {
    coordinator: Arc<FetchCoordinator<T>>,
    fetcher: Arc<dyn KeyFetcher<T>>,
    key: CacheKey,
    observed: Option<CacheKey>,
    memo: Option<Arc<BindingSnapshot<T>>>,
    revisions: watch::Receiver<u64>,
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("observed", &self.observed)
            .finish()
    }
}

impl<T> Binding<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(
        coordinator: Arc<FetchCoordinator<T>>,
        fetcher: Arc<dyn KeyFetcher<T>>,
        key: CacheKey,
    ) -> Self {
        let revisions = coordinator.store().subscribe();
        Self {
            coordinator,
            fetcher,
            key,
            observed: None,
            memo: None,
            revisions,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// 바인딩 키 변경 (예: 심볼 전환). 다음 `observe`에서 페치합니다.
    pub fn set_key(&mut self, key: CacheKey) {
        self.key = key;
    }

    /// 처음이거나 키가 바뀌었으면 `ensure`를 실행하고 스냅샷 반환.
    pub async fn observe(&mut self) -> Arc<BindingSnapshot<T>> {
        if self.observed.as_ref() != Some(&self.key) {
            self.observed = Some(self.key.clone());
            self.run(EnsureOptions::default()).await;
        }
        self.snapshot()
    }

    /// 수동 재요청.
    pub async fn refetch(&mut self, force: bool) -> Arc<BindingSnapshot<T>> {
        self.observed = Some(self.key.clone());
        self.run(EnsureOptions { force }).await;
        self.snapshot()
    }

    /// 현재 상태 스냅샷 (I/O 없음).
    pub fn snapshot(&mut self) -> Arc<BindingSnapshot<T>> {
        let state = self.coordinator.store().entry_state(&self.key);
        if let Some(memo) = &self.memo {
            if memo.same_as(&self.key, &state.value, state.loading, &state.error) {
                return Arc::clone(memo);
            }
        }
        let snapshot = Arc::new(BindingSnapshot {
            key: self.key.clone(),
            value: state.value,
            loading: state.loading,
            error: state.error,
        });
        self.memo = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// 마지막 대기 이후 저장소가 변경될 때까지 대기.
    ///
    /// 저장소가 사라지면 `false`를 반환합니다.
    pub async fn changed(&mut self) -> bool {
        self.revisions.changed().await.is_ok()
    }

    async fn run(&self, options: EnsureOptions) -> EnsureOutcome {
        let fetcher = Arc::clone(&self.fetcher);
        let key = self.key.clone();
        self.coordinator
            .ensure(
                &self.key,
                move || async move { fetcher.fetch(&key).await },
                options,
            )
            .await
    }
}
