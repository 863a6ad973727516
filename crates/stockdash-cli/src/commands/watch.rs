//! 주기적 시세 갱신 명령.

use super::invalid;
use super::quote::quote_line;
use std::time::Duration;
use stockdash_cache::BindingSnapshot;
use stockdash_core::{DashResult as Result, StockQuote};
use stockdash_data::MarketDataService;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 스냅샷 한 줄 출력 형식.
pub fn snapshot_line(snapshot: &BindingSnapshot<StockQuote>) -> String {
    match (&snapshot.value, &snapshot.error) {
        (Some(quote), None) => quote_line(quote),
        (Some(quote), Some(error)) => format!("{}  (stale: {})", quote_line(quote), error),
        (None, Some(error)) => format!("{:<8} error: {}", snapshot.key, error),
        (None, None) => format!("{:<8} (no data)", snapshot.key),
    }
}

/// 토큰이 취소될 때까지 시세를 주기적으로 갱신하며 출력합니다.
pub async fn run_watch(
    service: &MarketDataService,
    symbol: &str,
    interval_secs: u64,
    token: &CancellationToken,
) -> Result<()> {
    if interval_secs == 0 {
        return Err(invalid("Interval must be at least 1 second"));
    }

    info!(symbol = %symbol, interval_secs, "시세 감시 시작 (Ctrl+C로 종료)");
    let refreshed = service
        .watch_quote(
            symbol,
            Duration::from_secs(interval_secs),
            token,
            |snapshot| println!("{}", snapshot_line(snapshot)),
        )
        .await?;
    info!(refreshed, "시세 감시 종료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use stockdash_cache::CacheKey;

    fn snapshot(value: Option<StockQuote>, error: Option<&str>) -> BindingSnapshot<StockQuote> {
        BindingSnapshot {
            key: CacheKey::symbol("msft").unwrap(),
            value: value.map(Arc::new),
            loading: false,
            error: error.map(str::to_string),
        }
    }

    fn quote() -> StockQuote {
        StockQuote {
            symbol: "MSFT".to_string(),
            price: dec!(378.85),
            change: dec!(-1.23),
            change_percent: dec!(-0.32),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_line_variants() {
        assert!(snapshot_line(&snapshot(Some(quote()), None)).contains("-0.32%"));
        assert!(snapshot_line(&snapshot(Some(quote()), Some("timeout"))).contains("stale: timeout"));
        assert_eq!(
            snapshot_line(&snapshot(None, Some("down"))),
            "MSFT     error: down"
        );
        assert!(snapshot_line(&snapshot(None, None)).contains("no data"));
    }
}
