//! 거래일 목록 조회 명령.

use super::{parse_date, report_stale, OutputFormat};
use chrono::Utc;
use stockdash_core::{DashResult as Result, TradeDatePage};
use stockdash_data::MarketDataService;
use tracing::info;

/// 기준일 이전 거래일 조회 (기준일 미지정 시 내일).
///
/// `more`만큼 이전 배치를 더 받아 합친 달력을 출력합니다.
pub async fn run_trade_dates(
    service: &MarketDataService,
    before: Option<&str>,
    limit: Option<usize>,
    more: usize,
    format: OutputFormat,
) -> Result<()> {
    let before = before.map(parse_date).transpose()?;
    let lookup = service.trade_dates(before, limit).await?;
    report_stale(&lookup);
    let mut page = lookup.into_result()?;

    for _ in 0..more {
        if !page.has_more {
            break;
        }
        page = service.load_more_trade_dates().await?;
        info!(total = page.dates.len(), "거래일 추가 조회");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page.as_ref())?),
        OutputFormat::Table => {
            for line in calendar_lines(&page) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// 달력 출력 줄 (기본 선택일 표시 포함).
pub fn calendar_lines(page: &TradeDatePage) -> Vec<String> {
    let selected = page.default_pick(Utc::now());
    let mut lines: Vec<String> = page
        .dates
        .iter()
        .map(|date| {
            if Some(*date) == selected {
                format!("{}  ← 기본 선택", date)
            } else {
                date.to_string()
            }
        })
        .collect();
    if page.has_more {
        lines.push("... (더 많은 거래일이 있습니다, --more로 추가 조회)".to_string());
    }
    lines
}
