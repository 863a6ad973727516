//! 사용자 환경설정.
//!
//! 관심 종목, 즐겨찾기, 보유 종목, 화면 설정을 하나의 JSON 문서로
//! 보관합니다. 파일이 없으면 기본값으로 시작합니다.

use crate::error::{DashError, DashResult};
use crate::types::{Period, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// 기본 갱신 주기 (밀리초).
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;

/// 알림 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub price_alerts: bool,
    pub news_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            price_alerts: true,
            news_alerts: false,
        }
    }
}

/// 일반 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// 시세 갱신 주기 (밀리초)
    pub refresh_interval: u64,
    /// 차트 기본 기간
    pub default_chart_period: Period,
    /// 즐겨찾기 심볼
    pub favorite_symbols: Vec<String>,
    pub notifications: NotificationSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
            default_chart_period: Period::M1,
            favorite_symbols: Vec::new(),
            notifications: NotificationSettings::default(),
        }
    }
}

/// 대시보드 배치.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardLayout {
    #[default]
    Grid,
    List,
}

/// 차트 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Candlestick,
}

impl FromStr for DashboardLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grid" => Ok(DashboardLayout::Grid),
            "list" => Ok(DashboardLayout::List),
            _ => Err(format!("Invalid layout: {}. Use: grid, list", s)),
        }
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(ChartType::Line),
            "candlestick" | "candle" => Ok(ChartType::Candlestick),
            _ => Err(format!("Invalid chart type: {}. Use: line, candlestick", s)),
        }
    }
}

/// 화면 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewPreferences {
    pub dashboard_layout: DashboardLayout,
    pub chart_type: ChartType,
    pub show_volume: bool,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            dashboard_layout: DashboardLayout::Grid,
            chart_type: ChartType::Line,
            show_volume: true,
        }
    }
}

/// 보유 종목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub shares: Decimal,
    /// 평균 매입가
    pub avg_price: Price,
}

/// 설정 부분 수정 입력.
#[derive(Debug, Clone, Default)]
pub struct UpdateSettings {
    pub refresh_interval: Option<u64>,
    pub default_chart_period: Option<Period>,
    pub price_alerts: Option<bool>,
    pub news_alerts: Option<bool>,
}

/// 화면 설정 부분 수정 입력.
#[derive(Debug, Clone, Default)]
pub struct UpdateView {
    pub dashboard_layout: Option<DashboardLayout>,
    pub chart_type: Option<ChartType>,
    pub show_volume: Option<bool>,
}

/// 사용자 환경설정 문서.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub watchlist: Vec<String>,
    pub portfolio: Vec<Position>,
    pub settings: UserSettings,
    pub view_preferences: ViewPreferences,
}

fn normalize_symbol(symbol: &str) -> DashResult<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(DashError::InvalidInput("Symbol must not be empty".to_string()));
    }
    Ok(symbol)
}

impl UserPreferences {
    /// JSON 파일에서 읽기. 파일이 없으면 기본값.
    pub fn load<P: AsRef<Path>>(path: P) -> DashResult<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "환경설정 파일 없음, 기본값 사용");
                return Ok(Self::default());
            }
            Err(e) => return Err(DashError::Config(format!("{}: {}", path.display(), e))),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// JSON 파일로 저장 (상위 디렉터리 생성 포함).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> DashResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DashError::Config(format!("{}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| DashError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// 관심 종목 추가. 이미 있으면 `false`.
    pub fn add_to_watchlist(&mut self, symbol: &str) -> DashResult<bool> {
        let symbol = normalize_symbol(symbol)?;
        if self.watchlist.contains(&symbol) {
            return Ok(false);
        }
        self.watchlist.push(symbol);
        Ok(true)
    }

    /// 관심 종목 제거. 없었으면 `false`.
    pub fn remove_from_watchlist(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        let before = self.watchlist.len();
        self.watchlist.retain(|s| *s != symbol);
        self.watchlist.len() != before
    }

    /// 관심 종목 교체 (순서 유지, 중복/빈 값 제거).
    pub fn set_watchlist<I, S>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut watchlist: Vec<String> = Vec::new();
        for symbol in symbols {
            if let Ok(symbol) = normalize_symbol(symbol.as_ref()) {
                if !watchlist.contains(&symbol) {
                    watchlist.push(symbol);
                }
            }
        }
        self.watchlist = watchlist;
    }

    /// 즐겨찾기 추가. 이미 있으면 `false`.
    pub fn add_favorite(&mut self, symbol: &str) -> DashResult<bool> {
        let symbol = normalize_symbol(symbol)?;
        let favorites = &mut self.settings.favorite_symbols;
        if favorites.contains(&symbol) {
            return Ok(false);
        }
        favorites.push(symbol);
        Ok(true)
    }

    /// 즐겨찾기 제거.
    pub fn remove_favorite(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        let favorites = &mut self.settings.favorite_symbols;
        let before = favorites.len();
        favorites.retain(|s| *s != symbol);
        favorites.len() != before
    }

    /// 일반 설정 부분 수정.
    pub fn update_settings(&mut self, update: UpdateSettings) -> DashResult<()> {
        if let Some(interval) = update.refresh_interval {
            if interval == 0 {
                return Err(DashError::InvalidInput(
                    "Refresh interval must be positive".to_string(),
                ));
            }
            self.settings.refresh_interval = interval;
        }
        if let Some(period) = update.default_chart_period {
            self.settings.default_chart_period = period;
        }
        if let Some(enabled) = update.price_alerts {
            self.settings.notifications.price_alerts = enabled;
        }
        if let Some(enabled) = update.news_alerts {
            self.settings.notifications.news_alerts = enabled;
        }
        Ok(())
    }

    /// 화면 설정 부분 수정.
    pub fn update_view(&mut self, update: UpdateView) {
        let view = &mut self.view_preferences;
        if let Some(layout) = update.dashboard_layout {
            view.dashboard_layout = layout;
        }
        if let Some(chart_type) = update.chart_type {
            view.chart_type = chart_type;
        }
        if let Some(show) = update.show_volume {
            view.show_volume = show;
        }
    }

    /// 보유 종목 추가.
    ///
    /// 이미 보유 중이면 수량을 더하고 평균 매입가를 가중 평균으로 갱신합니다.
    pub fn add_position(&mut self, symbol: &str, shares: Decimal, price: Price) -> DashResult<()> {
        let symbol = normalize_symbol(symbol)?;
        if shares <= Decimal::ZERO {
            return Err(DashError::InvalidInput("Shares must be positive".to_string()));
        }

        match self.portfolio.iter_mut().find(|p| p.symbol == symbol) {
            Some(position) => {
                let total = position.shares + shares;
                position.avg_price = (position.shares * position.avg_price + shares * price) / total;
                position.shares = total;
            }
            None => self.portfolio.push(Position {
                symbol,
                shares,
                avg_price: price,
            }),
        }
        Ok(())
    }

    /// 보유 종목 수량/평균가 교체.
    pub fn update_position(&mut self, symbol: &str, shares: Decimal, avg_price: Price) -> DashResult<()> {
        let symbol = normalize_symbol(symbol)?;
        let position = self
            .portfolio
            .iter_mut()
            .find(|p| p.symbol == symbol)
            .ok_or_else(|| DashError::NotFound(symbol.clone()))?;
        position.shares = shares;
        position.avg_price = avg_price;
        Ok(())
    }

    /// 보유 종목 제거.
    pub fn remove_position(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        let before = self.portfolio.len();
        self.portfolio.retain(|p| p.symbol != symbol);
        self.portfolio.len() != before
    }
}
