//! 캐시 저장소와 상태 변경 액션.
//!
//! 하나의 엔티티 계열(시세, 차트 등)에 대해 네 가지 맵을 보관합니다.
//!
//! - 엔티티 캐시: 키 → 값
//! - 로딩 플래그: 페치 중인 키 집합
//! - 에러 메시지: 키 → 마지막 실패 메시지
//! - 마지막 페치 시각: 키 → epoch 밀리초 (0 = 무효화됨)
//!
//! 모든 변경은 [`Action`]을 통해서만 이루어지며, [`StoreState::apply`]는
//! 이전 상태와 액션만으로 새 상태를 계산하는 순수 함수입니다.

use crate::clock::{Clock, SystemClock};
use crate::key::CacheKey;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::trace;

/// 캐시 상태 변경 액션.
#[derive(Debug)]
pub enum Action<T> {
    /// 값을 통째로 교체하고 페치 시각을 기록
    SetEntry {
        key: CacheKey,
        value: Arc<T>,
        at: i64,
    },
    /// 로딩 플래그 설정
    SetLoading { key: CacheKey, loading: bool },
    /// 에러 메시지 설정 (`None`이면 제거)
    SetError {
        key: CacheKey,
        message: Option<String>,
    },
    /// 값은 유지하고 페치 시각만 0으로
    Invalidate { key: CacheKey },
    /// 첫 번째 구성 요소가 `prefix`인 모든 키 무효화
    InvalidatePrefix { prefix: String },
    /// 값, 에러, 페치 시각 제거
    Remove { key: CacheKey },
    /// 전체 값, 에러, 페치 시각 제거
    Clear,
}

impl<T> Action<T> {
    /// 로그용 액션 이름.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetEntry { .. } => "set_entry",
            Self::SetLoading { .. } => "set_loading",
            Self::SetError { .. } => "set_error",
            Self::Invalidate { .. } => "invalidate",
            Self::InvalidatePrefix { .. } => "invalidate_prefix",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
        }
    }
}

/// 캐시 저장소의 상태 값.
pub struct StoreState<T> {
    entries: HashMap<CacheKey, Arc<T>>,
    loading: HashSet<CacheKey>,
    errors: HashMap<CacheKey, String>,
    last_fetch: HashMap<CacheKey, i64>,
}

impl<T> Default for StoreState<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            loading: HashSet::new(),
            errors: HashMap::new(),
            last_fetch: HashMap::new(),
        }
    }
}

impl<T> Clone for StoreState<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            loading: self.loading.clone(),
            errors: self.errors.clone(),
            last_fetch: self.last_fetch.clone(),
        }
    }
}

impl<T> fmt::Debug for StoreState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreState")
            .field("entries", &self.entries.len())
            .field("loading", &self.loading)
            .field("errors", &self.errors)
            .field("last_fetch", &self.last_fetch)
            .finish()
    }
}

impl<T> StoreState<T> {
    /// 액션을 적용한 새 상태를 반환.
    ///
    /// I/O나 시계 읽기가 없으며, 시각은 액션에 담겨 전달됩니다.
    /// 로딩 플래그는 진행 중인 페치가 소유하므로 `Remove`/`Clear`로 지워지지 않습니다.
    pub fn apply(mut self, action: Action<T>) -> Self {
        match action {
            Action::SetEntry { key, value, at } => {
                self.last_fetch.insert(key.clone(), at);
                self.entries.insert(key, value);
            }
            Action::SetLoading { key, loading } => {
                if loading {
                    self.loading.insert(key);
                } else {
                    self.loading.remove(&key);
                }
            }
            Action::SetError { key, message } => match message {
                Some(message) => {
                    self.errors.insert(key, message);
                }
                None => {
                    self.errors.remove(&key);
                }
            },
            Action::Invalidate { key } => {
                self.last_fetch.insert(key, 0);
            }
            Action::InvalidatePrefix { prefix } => {
                for (key, fetched_at) in self.last_fetch.iter_mut() {
                    if key.has_prefix_component(&prefix) {
                        *fetched_at = 0;
                    }
                }
            }
            Action::Remove { key } => {
                self.entries.remove(&key);
                self.errors.remove(&key);
                self.last_fetch.remove(&key);
            }
            Action::Clear => {
                self.entries.clear();
                self.errors.clear();
                self.last_fetch.clear();
            }
        }
        self
    }

    pub fn entry(&self, key: &CacheKey) -> Option<&Arc<T>> {
        self.entries.get(key)
    }

    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.loading.contains(key)
    }

    pub fn error(&self, key: &CacheKey) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn last_fetch(&self, key: &CacheKey) -> Option<i64> {
        self.last_fetch.get(key).copied()
    }

    /// 값이 저장된 키 개수.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 한 키의 일관된 상태 스냅샷.
#[derive(Debug)]
pub struct EntryState<T> {
    pub value: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_fetch: Option<i64>,
}

/// 엔티티 계열 하나의 캐시 저장소.
///
/// 읽기는 동기적이며 항상 마지막으로 완료된 변경을 반영합니다.
/// 변경이 적용될 때마다 리비전 번호가 증가하고 [`CacheStore::subscribe`]로
/// 받은 수신자에게 알려집니다.
pub struct CacheStore<T> {
    name: String,
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState<T>>,
    revision: watch::Sender<u64>,
}

impl<T> fmt::Debug for CacheStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name)
            .field("revision", &*self.revision.borrow())
            .finish()
    }
}

impl<T> CacheStore<T> {
    /// 시스템 시계를 사용하는 저장소 생성.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, Arc::new(SystemClock))
    }

    /// 주어진 시계를 사용하는 저장소 생성.
    pub fn with_clock(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            name: name.into(),
            clock,
            state: RwLock::new(StoreState::default()),
            revision,
        }
    }

    /// 저장소 이름 (엔티티 계열).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 저장소 시계 기준 현재 시각.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    fn read_state<R>(&self, f: impl FnOnce(&StoreState<T>) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write_state<R>(&self, f: impl FnOnce(&mut StoreState<T>) -> R) -> R {
        let result = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    // ==================== 읽기 ====================

    pub fn get(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.read_state(|s| s.entry(key).cloned())
    }

    pub fn loading(&self, key: &CacheKey) -> bool {
        self.read_state(|s| s.is_loading(key))
    }

    pub fn error(&self, key: &CacheKey) -> Option<String> {
        self.read_state(|s| s.error(key).map(str::to_string))
    }

    pub fn last_fetch(&self, key: &CacheKey) -> Option<i64> {
        self.read_state(|s| s.last_fetch(key))
    }

    /// 네 가지 상태를 하나의 읽기 잠금 안에서 조회.
    pub fn entry_state(&self, key: &CacheKey) -> EntryState<T> {
        self.read_state(|s| EntryState {
            value: s.entry(key).cloned(),
            loading: s.is_loading(key),
            error: s.error(key).map(str::to_string),
            last_fetch: s.last_fetch(key),
        })
    }

    /// 값이 저장된 키 목록 (정렬됨).
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.read_state(|s| s.entries.keys().cloned().collect());
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.read_state(StoreState::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read_state(StoreState::is_empty)
    }

    /// 현재 상태의 복사본.
    pub fn snapshot(&self) -> StoreState<T> {
        self.read_state(StoreState::clone)
    }

    // ==================== 변경 ====================

    /// 액션 하나를 원자적으로 적용.
    pub fn dispatch(&self, action: Action<T>) {
        trace!(store = %self.name, action = action.name(), "dispatch");
        self.write_state(|state| {
            let prev = std::mem::take(state);
            *state = prev.apply(action);
        });
    }

    /// 여러 액션을 하나의 임계 구역 안에서 순서대로 적용.
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = Action<T>>) {
        self.write_state(|state| {
            let mut next = std::mem::take(state);
            for action in actions {
                trace!(store = %self.name, action = action.name(), "dispatch");
                next = next.apply(action);
            }
            *state = next;
        });
    }

    /// 값을 교체하고 현재 시각을 페치 시각으로 기록.
    pub fn set_entry(&self, key: &CacheKey, value: T) {
        self.dispatch(Action::SetEntry {
            key: key.clone(),
            value: Arc::new(value),
            at: self.now_millis(),
        });
    }

    pub fn set_loading(&self, key: &CacheKey, loading: bool) {
        self.dispatch(Action::SetLoading {
            key: key.clone(),
            loading,
        });
    }

    pub fn set_error(&self, key: &CacheKey, message: Option<String>) {
        self.dispatch(Action::SetError {
            key: key.clone(),
            message,
        });
    }

    /// 다음 신선도 검사에서 다시 페치하도록 표시 (값은 유지).
    pub fn invalidate(&self, key: &CacheKey) {
        self.dispatch(Action::Invalidate { key: key.clone() });
    }

    /// 첫 번째 구성 요소가 `prefix`인 모든 키 무효화 (예: 심볼의 모든 차트 기간).
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.dispatch(Action::InvalidatePrefix {
            prefix: prefix.to_string(),
        });
    }

    pub fn remove(&self, key: &CacheKey) {
        self.dispatch(Action::Remove { key: key.clone() });
    }

    pub fn clear(&self) {
        self.dispatch(Action::Clear);
    }

    /// 페치 시작 권한을 원자적으로 획득.
    ///
    /// 이미 로딩 중이면 `false`를 반환하고 아무것도 바꾸지 않습니다.
    /// 그렇지 않으면 로딩 플래그를 켜고 에러를 지운 뒤 `true`를 반환합니다.
    pub fn try_begin_fetch(&self, key: &CacheKey) -> bool {
        let began = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if guard.is_loading(key) {
                false
            } else {
                let prev = std::mem::take(&mut *guard);
                *guard = prev
                    .apply(Action::SetLoading {
                        key: key.clone(),
                        loading: true,
                    })
                    .apply(Action::SetError {
                        key: key.clone(),
                        message: None,
                    });
                true
            }
        };
        if began {
            self.revision.send_modify(|rev| *rev += 1);
        }
        began
    }

    // ==================== 알림 ====================

    /// 변경 알림 수신자 생성.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// 현재 리비전 번호.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn key(raw: &str) -> CacheKey {
        CacheKey::new(raw).unwrap()
    }

    #[test]
    fn test_apply_is_pure_over_previous_state() {
        let before: StoreState<u32> = StoreState::default();
        let after = before.clone().apply(Action::SetEntry {
            key: key("AAPL"),
            value: Arc::new(1),
            at: 42,
        });

        assert!(before.entry(&key("AAPL")).is_none());
        assert_eq!(after.entry(&key("AAPL")).map(|v| **v), Some(1));
        assert_eq!(after.last_fetch(&key("AAPL")), Some(42));
    }

    #[test]
    fn test_setters_are_independent() {
        let state: StoreState<u32> = StoreState::default()
            .apply(Action::SetLoading {
                key: key("AAPL"),
                loading: true,
            })
            .apply(Action::SetError {
                key: key("AAPL"),
                message: Some("boom".to_string()),
            });
        assert!(state.is_loading(&key("AAPL")));
        assert_eq!(state.error(&key("AAPL")), Some("boom"));

        let state = state.apply(Action::SetLoading {
            key: key("AAPL"),
            loading: false,
        });
        assert!(!state.is_loading(&key("AAPL")));
        assert_eq!(state.error(&key("AAPL")), Some("boom"));
    }

    #[test]
    fn test_invalidate_keeps_value() {
        let state = StoreState::default()
            .apply(Action::SetEntry {
                key: key("AAPL"),
                value: Arc::new(7u32),
                at: 100,
            })
            .apply(Action::Invalidate { key: key("AAPL") });
        assert_eq!(state.entry(&key("AAPL")).map(|v| **v), Some(7));
        assert_eq!(state.last_fetch(&key("AAPL")), Some(0));
    }

    #[test]
    fn test_invalidate_prefix_matches_whole_component() {
        let state = [
            ("AAPL:1M", 10),
            ("AAPL:1Y", 20),
            ("AAPLX:1M", 30),
            ("MSFT:1M", 40),
        ]
        .into_iter()
        .fold(StoreState::default(), |s, (k, at)| {
            s.apply(Action::SetEntry {
                key: key(k),
                value: Arc::new(0u8),
                at,
            })
        })
        .apply(Action::InvalidatePrefix {
            prefix: "AAPL".to_string(),
        });

        assert_eq!(state.last_fetch(&key("AAPL:1M")), Some(0));
        assert_eq!(state.last_fetch(&key("AAPL:1Y")), Some(0));
        assert_eq!(state.last_fetch(&key("AAPLX:1M")), Some(30));
        assert_eq!(state.last_fetch(&key("MSFT:1M")), Some(40));
    }

    #[test]
    fn test_clear_keeps_loading_flags() {
        let state = StoreState::default()
            .apply(Action::SetEntry {
                key: key("A"),
                value: Arc::new(1u8),
                at: 1,
            })
            .apply(Action::SetLoading {
                key: key("B"),
                loading: true,
            })
            .apply(Action::Clear);
        assert!(state.is_empty());
        assert!(state.is_loading(&key("B")));
    }

    #[test]
    fn test_store_reads_reflect_latest_dispatch() {
        let clock = Arc::new(ManualClock::new(5_000));
        let store: CacheStore<String> = CacheStore::with_clock("quote", clock.clone());

        store.set_entry(&key("AAPL"), "v1".to_string());
        assert_eq!(store.get(&key("AAPL")).as_deref(), Some(&"v1".to_string()));
        assert_eq!(store.last_fetch(&key("AAPL")), Some(5_000));

        clock.advance(std::time::Duration::from_secs(1));
        store.set_entry(&key("AAPL"), "v2".to_string());
        assert_eq!(store.get(&key("AAPL")).as_deref(), Some(&"v2".to_string()));
        assert_eq!(store.last_fetch(&key("AAPL")), Some(6_000));
        assert_eq!(store.keys(), vec![key("AAPL")]);
    }

    #[test]
    fn test_try_begin_fetch_is_exclusive() {
        let store: CacheStore<u32> = CacheStore::new("quote");
        store.set_error(&key("AAPL"), Some("old".to_string()));

        assert!(store.try_begin_fetch(&key("AAPL")));
        assert!(store.loading(&key("AAPL")));
        assert_eq!(store.error(&key("AAPL")), None);

        assert!(!store.try_begin_fetch(&key("AAPL")));
        assert!(store.try_begin_fetch(&key("MSFT")));
    }

    #[test]
    fn test_revision_bumps_on_dispatch() {
        let store: CacheStore<u32> = CacheStore::new("quote");
        let rx = store.subscribe();
        let start = store.revision();

        store.set_loading(&key("AAPL"), true);
        store.dispatch_all([
            Action::SetLoading {
                key: key("AAPL"),
                loading: false,
            },
            Action::Invalidate { key: key("AAPL") },
        ]);

        assert_eq!(store.revision(), start + 2);
        assert!(rx.has_changed().unwrap());
    }
}
