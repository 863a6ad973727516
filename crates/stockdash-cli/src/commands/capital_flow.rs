//! 자금 흐름 조회 명령.

use super::{parse_date_or_today, report_stale, OutputFormat};
use rust_decimal::Decimal;
use stockdash_core::{CapitalFlowRow, DashResult as Result, DecimalExt};
use stockdash_data::MarketDataService;

fn opt_amount(value: Option<Decimal>) -> String {
    value.map(|v| v.to_compact()).unwrap_or_else(|| "-".to_string())
}

fn opt_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:+.2}%", v))
        .unwrap_or_else(|| "-".to_string())
}

fn flow_line(row: &CapitalFlowRow) -> String {
    format!(
        "{:<12} {:<8} {:>9} {:>12} {:>9} {}",
        row.date,
        row.sec_code,
        opt_pct(row.change_pct),
        opt_amount(row.net_amount_main),
        opt_pct(row.net_pct_main),
        if row.is_main_inflow() { "▲" } else { "" }
    )
}

/// 자금 흐름 조회.
pub async fn run_capital_flow(
    service: &MarketDataService,
    date: Option<&str>,
    days: u32,
    inflow_only: bool,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let date = parse_date_or_today(date)?;
    let lookup = service.capital_flow(date, days, force).await?;
    report_stale(&lookup);
    let rows = lookup.into_result()?;
    let shown: Vec<&CapitalFlowRow> = rows
        .iter()
        .filter(|row| !inflow_only || row.is_main_inflow())
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Table => {
            println!(
                "{:<12} {:<8} {:>9} {:>12} {:>9}",
                "DATE", "CODE", "CHANGE%", "MAIN NET", "MAIN%"
            );
            for row in &shown {
                println!("{}", flow_line(row));
            }
            println!("\n{}일 ({}까지) {}행", days.max(1), date, shown.len());
        }
    }
    Ok(())
}
