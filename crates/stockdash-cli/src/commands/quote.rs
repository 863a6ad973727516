//! 시세 및 종목 조회 명령.

use super::{invalid, report_stale, OutputFormat};
use stockdash_core::{DashError, DashResult as Result, DecimalExt, StockData, StockQuote};
use stockdash_data::MarketDataService;
use tracing::{info, warn};

/// 시세 한 줄 출력 형식.
pub fn quote_line(quote: &StockQuote) -> String {
    format!(
        "{:<8} {:>12} {:>10} {:>10}  {}",
        quote.symbol,
        quote.price,
        quote.change,
        quote.change_percent.to_signed_percent(),
        quote.timestamp.format("%Y-%m-%d %H:%M:%S")
    )
}

/// 여러 심볼의 시세 조회.
///
/// 일부 심볼이 실패해도 나머지는 출력하고, 실패한 심볼이 있으면 에러로 끝납니다.
pub async fn run_quotes(
    service: &MarketDataService,
    symbols: &[String],
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    if symbols.is_empty() {
        return Err(invalid("At least one symbol is required"));
    }

    let results = service.quotes(symbols, force).await;
    let mut quotes = Vec::new();
    let mut failed = Vec::new();

    for (symbol, result) in symbols.iter().zip(results) {
        let lookup = match result {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "잘못된 심볼");
                failed.push(symbol.clone());
                continue;
            }
        };
        report_stale(&lookup);
        match lookup.into_result() {
            Ok(quote) => quotes.push(quote),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "시세 조회 실패");
                failed.push(symbol.clone());
            }
        }
    }

    match format {
        OutputFormat::Json => {
            let values: Vec<&StockQuote> = quotes.iter().map(|q| q.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        OutputFormat::Table => {
            println!(
                "{:<8} {:>12} {:>10} {:>10}  {}",
                "SYMBOL", "PRICE", "CHANGE", "CHANGE%", "TIME"
            );
            for quote in &quotes {
                println!("{}", quote_line(quote));
            }
        }
    }

    info!(ok = quotes.len(), failed = failed.len(), "시세 조회 완료");
    if failed.is_empty() {
        Ok(())
    } else {
        Err(DashError::Data(format!(
            "Failed to fetch quotes for: {}",
            failed.join(", ")
        )))
    }
}

/// 개별 종목 조회.
pub async fn run_stock(
    service: &MarketDataService,
    symbol: &str,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let lookup = service.stock(symbol, force).await?;
    report_stale(&lookup);
    let stock = lookup.into_result()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stock.as_ref())?),
        OutputFormat::Table => {
            println!("종목:      {} ({})", stock.name, stock.symbol);
            println!("현재가:    {}", stock.price);
            println!(
                "변동:      {} ({})",
                stock.change,
                stock.change_percent.to_signed_percent()
            );
            println!("거래량:    {}", stock.volume);
            println!("시가총액:  {}", stock.market_cap.to_compact());
        }
    }
    Ok(())
}

/// 종목 목록 조회.
pub async fn run_stocks(service: &MarketDataService, force: bool, format: OutputFormat) -> Result<()> {
    let lookup = service.stocks(force).await?;
    report_stale(&lookup);
    let stocks = lookup.into_result()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stocks.as_ref())?),
        OutputFormat::Table => print_stock_table(&stocks),
    }
    Ok(())
}

fn print_stock_table(stocks: &[StockData]) {
    println!(
        "{:<8} {:<28} {:>12} {:>10} {:>12}",
        "SYMBOL", "NAME", "PRICE", "CHANGE%", "MKT CAP"
    );
    println!("{}", "-".repeat(74));
    for stock in stocks {
        println!("{}", stock.summary_line());
    }
    println!("\n총 {}개 종목", stocks.len());
}
