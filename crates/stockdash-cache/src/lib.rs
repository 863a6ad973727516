//! 키 기반 페치-캐시 조정 레이어.
//!
//! 이 crate는 다음을 제공합니다:
//! - 키별 값/로딩/에러/마지막 페치 시각을 보관하는 캐시 저장소
//! - 저장소 상태를 바꾸는 순수 액션 (set, invalidate 등)
//! - 같은 키의 중복 요청을 막는 페치 조정자
//! - `{value, loading, error, refetch}`를 노출하는 소비자 바인딩
//!
//! # 동작 흐름
//!
//! ```text
//! ensure(key, fetch)
//!         │
//!   ┌─────▼─────┐  YES
//!   │ 캐시 신선? ├──────▶ Fresh (I/O 없음)
//!   └─────┬─────┘
//!         │ NO
//!   ┌─────▼──────┐ YES
//!   │ 이미 로딩중? ├─────▶ InFlight (두 번째 요청 없음)
//!   └─────┬──────┘
//!         │ NO (loading=true, error=None 원자적 설정)
//!   ┌─────▼─────┐
//!   │  fetch()  │
//!   └─────┬─────┘
//!    성공 │ 실패
//!     │   └──▶ error 기록, 캐시 값 유지 ──┐
//!     └──▶ 값 교체 + 페치 시각 기록 ──────┤
//!                                       ▼
//!                               loading=false (항상)
//! ```

pub mod binding;
pub mod clock;
pub mod coordinator;
pub mod error;
pub mod family;
pub mod key;
pub mod policy;
pub mod store;

pub use binding::{Binding, BindingSnapshot, FetchError, FnFetcher, KeyFetcher};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{
    normalize_message, CoordinatorStats, EnsureOptions, EnsureOutcome, FetchCoordinator,
    DEFAULT_ERROR_MESSAGE, MIN_REFRESH_PERIOD,
};
pub use error::{CacheError, Result};
pub use family::{CacheFamily, FamilyDurations};
pub use key::CacheKey;
pub use policy::StalenessPolicy;
pub use store::{Action, CacheStore, EntryState, StoreState};
