//! 개발 환경용 데모 데이터.
//!
//! API를 사용할 수 없을 때 개발 환경에서만 대체 응답으로 쓰입니다.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockdash_core::{ChartPoint, StockData};

/// 데모 종목 목록.
pub fn demo_stocks() -> Vec<StockData> {
    vec![
        StockData {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            price: dec!(175.43),
            change: dec!(2.34),
            change_percent: dec!(1.35),
            volume: 52_486_789,
            market_cap: dec!(2800000000000),
        },
        StockData {
            symbol: "GOOGL".to_string(),
            name: "Alphabet Inc.".to_string(),
            price: dec!(138.21),
            change: dec!(-1.87),
            change_percent: dec!(-1.33),
            volume: 28_976_543,
            market_cap: dec!(1750000000000),
        },
        StockData {
            symbol: "MSFT".to_string(),
            name: "Microsoft Corporation".to_string(),
            price: dec!(378.85),
            change: dec!(4.23),
            change_percent: dec!(1.13),
            volume: 35_678_901,
            market_cap: dec!(2810000000000),
        },
        StockData {
            symbol: "TSLA".to_string(),
            name: "Tesla, Inc.".to_string(),
            price: dec!(248.87),
            change: dec!(-5.67),
            change_percent: dec!(-2.23),
            volume: 89_456_123,
            market_cap: dec!(793000000000),
        },
    ]
}

/// 심볼로 데모 종목 조회 (대소문자 무시).
pub fn find_demo_stock(symbol: &str) -> Option<StockData> {
    demo_stocks()
        .into_iter()
        .find(|stock| stock.symbol.eq_ignore_ascii_case(symbol.trim()))
}

/// `end`까지 `days`일의 데모 차트 시계열 (오래된 순).
///
/// 심볼에서 시드를 만들어 같은 입력에 항상 같은 결과를 냅니다.
pub fn demo_chart(symbol: &str, days: u32, end: NaiveDate) -> Vec<ChartPoint> {
    let seed: i64 = symbol.bytes().map(i64::from).sum();
    let days = i64::from(days.max(1));

    (0..days)
        .map(|i| {
            // 150.00 기준 ±10.00 범위에서 흔들림, 최저 50.00
            let swing = ((i * 37 + seed) % 2001) - 1000;
            let cents = (15_000 + swing).max(5_000);
            let volume = 10_000_000 + ((i * 7_919 + seed * 104_729) % 90_000_000) as u64;
            ChartPoint {
                date: end - Duration::days(days - 1 - i),
                price: Decimal::new(cents, 2),
                volume,
            }
        })
        .collect()
}
