//! 대시보드 전반에서 사용되는 공통 타입.

mod decimal;
mod period;

pub use decimal::*;
pub use period::*;
