//! 주식 대시보드 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 여러 종목 시세 조회
//! stockdash quote AAPL,MSFT,TSLA
//!
//! # 1개월 차트 (캐시 무시)
//! stockdash --force chart AAPL -p 1M
//!
//! # RPS 상위 종목 (3일 RPS 90~100, 유통 시총 50 이상)
//! stockdash rps --rps3 90,100 --market-cap 50
//!
//! # 최근 5일 자금 흐름
//! stockdash capital-flow -d 2024-03-15 --days 5
//!
//! # 10초마다 시세 갱신 (Ctrl+C로 종료)
//! stockdash watch MSFT -i 10
//!
//! # 관심 종목 관리 및 시세
//! stockdash watchlist add AAPL,MSFT
//! stockdash watchlist quotes
//!
//! # 웹 리서치 분석 (SSE 스트림)
//! stockdash research https://example.com/report --password $PW --stream
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockdash_cli::commands::{
    capital_flow::run_capital_flow,
    chart::run_chart,
    parse_symbols,
    preferences::{
        run_favorite, run_portfolio_add, run_portfolio_list, run_portfolio_remove, run_prefs_set,
        run_prefs_show, run_watchlist_edit, run_watchlist_list, run_watchlist_quotes, PrefsArgs,
        WatchlistEdit,
    },
    quote::{run_quotes, run_stock, run_stocks},
    research::run_research,
    rps::{run_rps, RpsArgs},
    stats::format_stats,
    trade_dates::run_trade_dates,
    watch::run_watch,
    OutputFormat,
};
use stockdash_core::{init_logging, AppConfig, LogConfig, UserPreferences};
use stockdash_data::{MarketDataService, WebResearchClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "stockdash")]
#[command(about = "Stock dashboard CLI - 캐시 기반 시세/차트/RPS 조회", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    /// 캐시 신선도와 무관하게 다시 조회
    #[arg(long, global = true)]
    force: bool,

    /// 출력 형식 (table, json)
    #[arg(short = 'o', long, global = true, default_value = "table")]
    output: String,

    /// 종료 시 캐시 통계 출력
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 실시간 시세 조회 (쉼표로 여러 심볼)
    Quote {
        /// 심볼 목록 (예: AAPL,MSFT)
        symbols: String,
    },

    /// 개별 종목 정보
    Stock {
        /// 종목 심볼
        symbol: String,
    },

    /// 종목 목록
    Stocks,

    /// 차트 시계열 조회
    Chart {
        /// 종목 심볼
        symbol: String,

        /// 조회 기간 (1D, 5D, 1M, 3M, 6M, 1Y, 5Y, 기본: 환경설정)
        #[arg(short, long)]
        period: Option<String>,
    },

    /// RPS 순위표 조회
    Rps {
        /// 기준 날짜 (YYYY-MM-DD, 기본: 오늘)
        #[arg(short, long)]
        date: Option<String>,

        /// 3일 RPS 구간 (min,max)
        #[arg(long)]
        rps3: Option<String>,

        /// 5일 RPS 구간 (min,max)
        #[arg(long)]
        rps5: Option<String>,

        /// 15일 RPS 구간 (min,max)
        #[arg(long)]
        rps15: Option<String>,

        /// 30일 RPS 구간 (min,max)
        #[arg(long)]
        rps30: Option<String>,

        /// 최소 유통 시가총액
        #[arg(long)]
        market_cap: Option<f64>,

        /// 최소 상장 일수
        #[arg(long)]
        listing_days: Option<u32>,

        /// 최대 표시 개수
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// 자금 흐름 조회 (Supabase 필요)
    CapitalFlow {
        /// 마지막 날짜 (YYYY-MM-DD, 기본: 오늘)
        #[arg(short, long)]
        date: Option<String>,

        /// 조회 일수
        #[arg(long, default_value = "1")]
        days: u32,

        /// 주력 순유입 종목만
        #[arg(long)]
        inflow_only: bool,
    },

    /// 최근 거래일 목록 (Supabase 필요)
    TradeDates {
        /// 이 날짜 이전 거래일 (기본: 내일)
        #[arg(short, long)]
        before: Option<String>,

        /// 최대 개수 (기본: 설정의 batch size)
        #[arg(short, long)]
        limit: Option<usize>,

        /// 이전 배치를 몇 번 더 받을지
        #[arg(long, default_value = "0")]
        more: usize,
    },

    /// 주기적 시세 갱신
    Watch {
        /// 종목 심볼
        symbol: String,

        /// 갱신 간격 (초, 기본: 환경설정)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// 관심 종목 관리
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },

    /// 환경설정 (화면/알림/기본 기간)
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// 보유 종목 관리
    Portfolio {
        #[command(subcommand)]
        action: PortfolioAction,
    },

    /// 웹 페이지 리서치 분석
    Research {
        /// 분석할 URL (쉼표로 여러 개)
        urls: String,

        /// 분석 서비스 비밀번호 (없으면 STOCKDASH_RESEARCH_PASSWORD)
        #[arg(long)]
        password: Option<String>,

        /// 프롬프트 템플릿
        #[arg(long)]
        prompt: Option<String>,

        /// SSE 스트림으로 진행 상황 수신
        #[arg(long)]
        stream: bool,
    },
}

#[derive(Subcommand)]
enum WatchlistAction {
    /// 관심 종목 목록
    List,
    /// 추가 (쉼표로 여러 심볼)
    Add { symbols: String },
    /// 제거 (쉼표로 여러 심볼)
    Remove { symbols: String },
    /// 전체 교체 (빈 값이면 비움)
    Set {
        #[arg(default_value = "")]
        symbols: String,
    },
    /// 관심 종목 전체 시세
    Quotes,
}

#[derive(Subcommand)]
enum PrefsAction {
    /// 현재 환경설정
    Show,
    /// 일부 항목 수정
    Set {
        /// 대시보드 배치 (grid, list)
        #[arg(long)]
        layout: Option<String>,
        /// 차트 종류 (line, candlestick)
        #[arg(long)]
        chart_type: Option<String>,
        /// 거래량 표시
        #[arg(long)]
        show_volume: Option<bool>,
        /// 시세 갱신 주기 (밀리초)
        #[arg(long)]
        refresh_ms: Option<u64>,
        /// 차트 기본 기간
        #[arg(long)]
        period: Option<String>,
        /// 가격 알림
        #[arg(long)]
        price_alerts: Option<bool>,
        /// 뉴스 알림
        #[arg(long)]
        news_alerts: Option<bool>,
    },
    /// 즐겨찾기 추가 (--remove로 제거)
    Favorite {
        symbol: String,
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Subcommand)]
enum PortfolioAction {
    /// 보유 종목 목록
    List,
    /// 매수 기록 (평균가 자동 계산)
    Add {
        symbol: String,
        shares: String,
        price: String,
    },
    /// 보유 종목 제거
    Remove { symbol: String },
}

/// Ctrl+C에 취소되는 토큰.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("종료 신호 수신");
            shutdown.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    if let Err(e) = init_logging(LogConfig::from_settings(&config.logging).with_env_overrides()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        environment = %config.api.environment,
        base_url = %config.api.base_url,
        "stockdash 시작"
    );

    let format = OutputFormat::parse(&cli.output)?;
    let service = MarketDataService::from_config(&config)?;
    let force = cli.force;
    let prefs_path = PathBuf::from(&config.user.preferences_path);

    let result = match cli.command {
        Commands::Quote { symbols } => {
            run_quotes(&service, &parse_symbols(&symbols), force, format).await
        }
        Commands::Stock { symbol } => run_stock(&service, &symbol, force, format).await,
        Commands::Stocks => run_stocks(&service, force, format).await,
        Commands::Chart { symbol, period } => match period {
            Some(period) => run_chart(&service, &symbol, &period, force, format).await,
            None => match UserPreferences::load(&prefs_path) {
                Ok(prefs) => {
                    let period = prefs.settings.default_chart_period.to_string();
                    run_chart(&service, &symbol, &period, force, format).await
                }
                Err(e) => Err(e),
            },
        },
        Commands::Rps {
            date,
            rps3,
            rps5,
            rps15,
            rps30,
            market_cap,
            listing_days,
            limit,
        } => {
            let args = RpsArgs {
                date,
                rps3,
                rps5,
                rps15,
                rps30,
                market_cap,
                listing_days,
                limit,
            };
            run_rps(&service, &args, force, format).await
        }
        Commands::CapitalFlow {
            date,
            days,
            inflow_only,
        } => run_capital_flow(&service, date.as_deref(), days, inflow_only, force, format).await,
        Commands::TradeDates {
            before,
            limit,
            more,
        } => run_trade_dates(&service, before.as_deref(), limit, more, format).await,
        Commands::Watch { symbol, interval } => {
            let interval = match interval {
                Some(secs) => Ok(secs),
                None => UserPreferences::load(&prefs_path)
                    .map(|prefs| (prefs.settings.refresh_interval / 1000).max(1)),
            };
            match interval {
                Ok(interval) => run_watch(&service, &symbol, interval, &shutdown_token()).await,
                Err(e) => Err(e),
            }
        }
        Commands::Watchlist { action } => match action {
            WatchlistAction::List => run_watchlist_list(&prefs_path, format),
            WatchlistAction::Add { symbols } => {
                run_watchlist_edit(&prefs_path, WatchlistEdit::Add, &parse_symbols(&symbols), format)
            }
            WatchlistAction::Remove { symbols } => run_watchlist_edit(
                &prefs_path,
                WatchlistEdit::Remove,
                &parse_symbols(&symbols),
                format,
            ),
            WatchlistAction::Set { symbols } => {
                run_watchlist_edit(&prefs_path, WatchlistEdit::Set, &parse_symbols(&symbols), format)
            }
            WatchlistAction::Quotes => {
                run_watchlist_quotes(&service, &prefs_path, force, format).await
            }
        },
        Commands::Prefs { action } => match action {
            PrefsAction::Show => run_prefs_show(&prefs_path, format),
            PrefsAction::Set {
                layout,
                chart_type,
                show_volume,
                refresh_ms,
                period,
                price_alerts,
                news_alerts,
            } => {
                let args = PrefsArgs {
                    layout,
                    chart_type,
                    show_volume,
                    refresh_ms,
                    period,
                    price_alerts,
                    news_alerts,
                };
                run_prefs_set(&prefs_path, args)
            }
            PrefsAction::Favorite { symbol, remove } => run_favorite(&prefs_path, &symbol, remove),
        },
        Commands::Portfolio { action } => match action {
            PortfolioAction::List => run_portfolio_list(&prefs_path, format),
            PortfolioAction::Add {
                symbol,
                shares,
                price,
            } => run_portfolio_add(&prefs_path, &symbol, &shares, &price),
            PortfolioAction::Remove { symbol } => run_portfolio_remove(&prefs_path, &symbol),
        },
        Commands::Research {
            urls,
            password,
            prompt,
            stream,
        } => {
            let password = password
                .or_else(|| std::env::var("STOCKDASH_RESEARCH_PASSWORD").ok())
                .unwrap_or_default();
            match WebResearchClient::from_config(&config.api) {
                Ok(client) => {
                    run_research(
                        &client,
                        &urls,
                        &password,
                        prompt.as_deref(),
                        stream,
                        &shutdown_token(),
                        format,
                    )
                    .await
                }
                Err(e) => Err(e.into()),
            }
        }
    };

    if cli.stats {
        for line in format_stats(&service.stats()) {
            eprintln!("{}", line);
        }
    }

    if let Err(e) = &result {
        error!("명령 실패: {}", e);
        if e.is_retryable() {
            eprintln!("네트워크 문제일 수 있습니다. 잠시 후 --force로 다시 시도하세요.");
        }
    }
    Ok(result?)
}
