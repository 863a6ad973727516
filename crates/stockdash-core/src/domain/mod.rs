//! 대시보드 화면이 다루는 도메인 레코드.

mod capital_flow;
mod preferences;
mod rps;
mod stock;
mod trade_date;

pub use capital_flow::*;
pub use preferences::*;
pub use rps::*;
pub use stock::*;
pub use trade_date::*;
