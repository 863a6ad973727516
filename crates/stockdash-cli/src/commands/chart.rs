//! 차트 시계열 조회 명령.

use super::{invalid, report_stale, OutputFormat};
use rust_decimal::Decimal;
use stockdash_core::{ChartPoint, DashResult as Result, DecimalExt, Period};
use stockdash_data::MarketDataService;

/// 차트 요약 통계.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSummary {
    pub points: usize,
    pub first: Decimal,
    pub last: Decimal,
    pub high: Decimal,
    pub low: Decimal,
}

impl ChartSummary {
    /// 비어 있으면 `None`.
    pub fn from_points(points: &[ChartPoint]) -> Option<Self> {
        let first = points.first()?.price;
        let last = points.last()?.price;
        let high = points.iter().map(|p| p.price).max()?;
        let low = points.iter().map(|p| p.price).min()?;
        Some(Self {
            points: points.len(),
            first,
            last,
            high,
            low,
        })
    }

    /// 기간 수익률 (%).
    pub fn change_percent(&self) -> Decimal {
        if self.first.is_zero() {
            return Decimal::ZERO;
        }
        (self.last - self.first) / self.first * Decimal::from(100)
    }
}

/// 차트 조회.
pub async fn run_chart(
    service: &MarketDataService,
    symbol: &str,
    period: &str,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let period: Period = period.parse().map_err(invalid)?;
    let lookup = service.chart(symbol, period, force).await?;
    report_stale(&lookup);
    let points = lookup.into_result()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(points.as_ref())?),
        OutputFormat::Table => {
            println!("{:<12} {:>12} {:>14}", "DATE", "PRICE", "VOLUME");
            for point in points.iter() {
                println!("{:<12} {:>12} {:>14}", point.date, point.price, point.volume);
            }
            if let Some(summary) = ChartSummary::from_points(&points) {
                println!(
                    "\n{} {} · {}개 · 고가 {} · 저가 {} · 수익률 {}",
                    symbol.to_uppercase(),
                    period,
                    summary.points,
                    summary.high,
                    summary.low,
                    summary.change_percent().to_signed_percent()
                );
            }
        }
    }
    Ok(())
}
