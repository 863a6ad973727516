//! 캐시 모듈 오류 타입.

use thiserror::Error;

/// 캐시 사용 오류.
///
/// 페치 실패(전송 오류)는 여기에 포함되지 않습니다. 그런 실패는 예외가 아니라
/// 저장소의 에러 상태로만 전달됩니다. 이 타입은 호출자의 사용 실수를 나타냅니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// 잘못된 캐시 키 (빈 키, 구분자가 포함된 구성 요소 등)
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
