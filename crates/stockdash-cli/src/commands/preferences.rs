//! 관심 종목, 화면 설정, 보유 종목 명령.
//!
//! 모든 명령은 환경설정 파일을 읽고, 바뀐 경우에만 다시 저장합니다.

use super::quote::run_quotes;
use super::{invalid, OutputFormat};
use rust_decimal::{Decimal, RoundingStrategy};
use std::path::Path;
use stockdash_core::{
    ChartType, DashError, DashResult as Result, DashboardLayout, DecimalExt, Period, UpdateSettings,
    UpdateView, UserPreferences,
};
use stockdash_data::MarketDataService;
use tracing::info;

/// 관심 종목 편집 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistEdit {
    Add,
    Remove,
    Set,
}

/// `prefs set` 인자 (문자열 그대로).
#[derive(Debug, Clone, Default)]
pub struct PrefsArgs {
    pub layout: Option<String>,
    pub chart_type: Option<String>,
    pub show_volume: Option<bool>,
    pub refresh_ms: Option<u64>,
    pub period: Option<String>,
    pub price_alerts: Option<bool>,
    pub news_alerts: Option<bool>,
}

impl PrefsArgs {
    fn into_updates(self) -> Result<(UpdateSettings, UpdateView)> {
        let period = self
            .period
            .map(|p| p.parse::<Period>())
            .transpose()
            .map_err(invalid)?;
        let layout = self
            .layout
            .map(|l| l.parse::<DashboardLayout>())
            .transpose()
            .map_err(invalid)?;
        let chart_type = self
            .chart_type
            .map(|c| c.parse::<ChartType>())
            .transpose()
            .map_err(invalid)?;

        let settings = UpdateSettings {
            refresh_interval: self.refresh_ms,
            default_chart_period: period,
            price_alerts: self.price_alerts,
            news_alerts: self.news_alerts,
        };
        let view = UpdateView {
            dashboard_layout: layout,
            chart_type,
            show_volume: self.show_volume,
        };
        Ok((settings, view))
    }
}

fn print_symbols(title: &str, symbols: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(symbols)?),
        OutputFormat::Table if symbols.is_empty() => println!("{}: (비어 있음)", title),
        OutputFormat::Table => println!("{}: {}", title, symbols.join(", ")),
    }
    Ok(())
}

/// 관심 종목 출력.
pub fn run_watchlist_list(path: &Path, format: OutputFormat) -> Result<()> {
    let prefs = UserPreferences::load(path)?;
    print_symbols("관심 종목", &prefs.watchlist, format)
}

/// 관심 종목 추가/제거/교체.
pub fn run_watchlist_edit(
    path: &Path,
    edit: WatchlistEdit,
    symbols: &[String],
    format: OutputFormat,
) -> Result<()> {
    if symbols.is_empty() && edit != WatchlistEdit::Set {
        return Err(invalid("At least one symbol is required"));
    }

    let mut prefs = UserPreferences::load(path)?;
    let changed = match edit {
        WatchlistEdit::Add => {
            let mut added = 0;
            for symbol in symbols {
                if prefs.add_to_watchlist(symbol)? {
                    added += 1;
                }
            }
            added > 0
        }
        WatchlistEdit::Remove => symbols
            .iter()
            .fold(false, |changed, symbol| prefs.remove_from_watchlist(symbol) || changed),
        WatchlistEdit::Set => {
            let before = prefs.watchlist.clone();
            prefs.set_watchlist(symbols);
            prefs.watchlist != before
        }
    };

    if changed {
        prefs.save(path)?;
        info!(count = prefs.watchlist.len(), "관심 종목 저장");
    }
    print_symbols("관심 종목", &prefs.watchlist, format)
}

/// 관심 종목 전체 시세.
pub async fn run_watchlist_quotes(
    service: &MarketDataService,
    path: &Path,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let prefs = UserPreferences::load(path)?;
    if prefs.watchlist.is_empty() {
        return Err(invalid("Watchlist is empty. Add symbols with `watchlist add`"));
    }
    run_quotes(service, &prefs.watchlist, force, format).await
}

/// 환경설정 출력.
pub fn run_prefs_show(path: &Path, format: OutputFormat) -> Result<()> {
    let prefs = UserPreferences::load(path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prefs)?),
        OutputFormat::Table => {
            for line in prefs_lines(&prefs) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// 환경설정 요약 줄.
pub fn prefs_lines(prefs: &UserPreferences) -> Vec<String> {
    let settings = &prefs.settings;
    let view = &prefs.view_preferences;
    vec![
        format!("갱신 주기:    {}ms", settings.refresh_interval),
        format!("기본 기간:    {}", settings.default_chart_period),
        format!("즐겨찾기:     {}", settings.favorite_symbols.join(", ")),
        format!(
            "알림:         가격 {} · 뉴스 {}",
            on_off(settings.notifications.price_alerts),
            on_off(settings.notifications.news_alerts)
        ),
        format!("배치:         {:?}", view.dashboard_layout),
        format!("차트:         {:?}", view.chart_type),
        format!("거래량 표시:  {}", on_off(view.show_volume)),
    ]
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// 환경설정 부분 수정.
pub fn run_prefs_set(path: &Path, args: PrefsArgs) -> Result<()> {
    let (settings, view) = args.into_updates()?;
    let mut prefs = UserPreferences::load(path)?;
    prefs.update_settings(settings)?;
    prefs.update_view(view);
    prefs.save(path)?;
    for line in prefs_lines(&prefs) {
        println!("{}", line);
    }
    Ok(())
}

/// 즐겨찾기 추가/제거.
pub fn run_favorite(path: &Path, symbol: &str, remove: bool) -> Result<()> {
    let mut prefs = UserPreferences::load(path)?;
    let changed = if remove {
        prefs.remove_favorite(symbol)
    } else {
        prefs.add_favorite(symbol)?
    };
    if changed {
        prefs.save(path)?;
    }
    print_symbols("즐겨찾기", &prefs.settings.favorite_symbols, OutputFormat::Table)
}

/// 보유 종목 추가 (평균가 가중 평균).
pub fn run_portfolio_add(path: &Path, symbol: &str, shares: &str, price: &str) -> Result<()> {
    let shares: Decimal = shares
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid shares: {}", shares)))?;
    let price: Decimal = price
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid price: {}", price)))?;

    let mut prefs = UserPreferences::load(path)?;
    prefs.add_position(symbol, shares, price)?;
    prefs.save(path)?;
    print_portfolio(&prefs);
    Ok(())
}

/// 보유 종목 제거.
pub fn run_portfolio_remove(path: &Path, symbol: &str) -> Result<()> {
    let mut prefs = UserPreferences::load(path)?;
    if !prefs.remove_position(symbol) {
        return Err(DashError::NotFound(symbol.to_uppercase()));
    }
    prefs.save(path)?;
    print_portfolio(&prefs);
    Ok(())
}

/// 보유 종목 출력.
pub fn run_portfolio_list(path: &Path, format: OutputFormat) -> Result<()> {
    let prefs = UserPreferences::load(path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prefs.portfolio)?),
        OutputFormat::Table => print_portfolio(&prefs),
    }
    Ok(())
}

fn print_portfolio(prefs: &UserPreferences) {
    println!("{:<8} {:>12} {:>12} {:>14}", "SYMBOL", "SHARES", "AVG PRICE", "COST");
    for position in &prefs.portfolio {
        let cost = position.shares * position.avg_price;
        println!(
            "{:<8} {:>12} {:>12} {:>14}",
            position.symbol,
            position.shares.normalize(),
            position
                .avg_price
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            cost.to_compact()
        );
    }
}
