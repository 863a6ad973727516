//! RPS 순위표 조회 명령.

use super::{parse_date_or_today, parse_range, report_stale, OutputFormat};
use stockdash_core::{DashResult as Result, DecimalExt, RpsFilter, RpsItem};
use stockdash_data::MarketDataService;

/// RPS 명령 인자.
#[derive(Debug, Clone, Default)]
pub struct RpsArgs {
    pub date: Option<String>,
    pub rps3: Option<String>,
    pub rps5: Option<String>,
    pub rps15: Option<String>,
    pub rps30: Option<String>,
    pub market_cap: Option<f64>,
    pub listing_days: Option<u32>,
    pub limit: usize,
}

impl RpsArgs {
    /// 문자열 인자를 조회 필터로 변환합니다.
    pub fn to_filter(&self) -> Result<RpsFilter> {
        let range = |value: &Option<String>| value.as_deref().map(parse_range).transpose();
        Ok(RpsFilter {
            rps3: range(&self.rps3)?,
            rps5: range(&self.rps5)?,
            rps15: range(&self.rps15)?,
            rps30: range(&self.rps30)?,
            market_cap: self.market_cap,
            listing_days: self.listing_days,
        })
    }
}

fn rps_line(item: &RpsItem) -> String {
    format!(
        "{:<8} {:<12} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>6} {:>10}",
        item.code,
        item.name,
        item.rps3,
        item.rps5,
        item.rps15,
        item.rps30,
        item.listed_days,
        item.circulating_market_cap.to_compact()
    )
}

/// RPS 순위표 조회.
pub async fn run_rps(
    service: &MarketDataService,
    args: &RpsArgs,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let date = parse_date_or_today(args.date.as_deref())?;
    let filter = args.to_filter()?;
    let lookup = service.rps(date, &filter, force).await?;
    report_stale(&lookup);
    let items = lookup.into_result()?;
    let shown = &items[..items.len().min(args.limit)];

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(shown)?),
        OutputFormat::Table => {
            println!(
                "{:<8} {:<12} {:>7} {:>7} {:>7} {:>7} {:>6} {:>10}",
                "CODE", "NAME", "RPS3", "RPS5", "RPS15", "RPS30", "DAYS", "CIRC CAP"
            );
            for item in shown {
                println!("{}", rps_line(item));
            }
            println!("\n{} 기준 {}개 중 {}개 표시", date, items.len(), shown.len());
        }
    }
    Ok(())
}
