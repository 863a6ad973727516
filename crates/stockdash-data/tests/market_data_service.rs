//! 캐시 기반 서비스 통합 테스트 (HTTP 목 서버 사용).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use mockito::{Matcher, Server};
use secrecy::SecretString;
use stockdash_cache::EnsureOutcome;
use stockdash_core::{AppConfig, Environment, Period};
use stockdash_data::{ApiError, MarketDataService};
use tokio_util::sync::CancellationToken;

const QUOTE_BODY: &str =
    r#"{"symbol":"AAPL","price":175.43,"change":2.34,"changePercent":1.35,"timestamp":"2024-01-02T15:30:00Z"}"#;
const CHART_BODY: &str = r#"[{"date":"2024-01-01","price":100,"volume":1000}]"#;

fn config(server: &Server) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = server.url();
    config.api.environment = Environment::Production;
    config.api.timeout_ms = 5_000;
    config
}

fn service(server: &Server) -> MarketDataService {
    MarketDataService::from_config(&config(server)).unwrap()
}

#[tokio::test]
async fn fresh_quote_is_served_from_cache() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/stocks/AAPL/quote")
        .with_status(200)
        .with_body(QUOTE_BODY)
        .expect(1)
        .create_async()
        .await;
    let service = service(&server);

    let first = service.quote("aapl", false).await.unwrap();
    let second = service.quote("AAPL", false).await.unwrap();

    assert_eq!(first.outcome, EnsureOutcome::Fetched);
    assert_eq!(second.outcome, EnsureOutcome::Fresh);
    assert_eq!(second.key.as_str(), "AAPL");
    assert!(Arc::ptr_eq(
        first.value.as_ref().unwrap(),
        second.value.as_ref().unwrap()
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn concurrent_quotes_share_one_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/stocks/AAPL/quote")
        .with_status(200)
        .with_body(QUOTE_BODY)
        .expect(1)
        .create_async()
        .await;
    let service = service(&server);

    let (a, b) = tokio::join!(service.quote("AAPL", false), service.quote("AAPL", false));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.outcome, EnsureOutcome::Fetched);
    assert_eq!(b.outcome, EnsureOutcome::InFlight);
    assert!(b.value.is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_refresh_keeps_previous_quote() {
    let mut server = Server::new_async().await;
    let ok = server
        .mock("GET", "/api/stocks/AAPL/quote")
        .with_status(200)
        .with_body(QUOTE_BODY)
        .create_async()
        .await;
    let service = service(&server);
    service.quote("AAPL", false).await.unwrap();

    ok.remove_async().await;
    server
        .mock("GET", "/api/stocks/AAPL/quote")
        .with_status(503)
        .with_body(r#"{"message":"upstream down"}"#)
        .create_async()
        .await;

    let lookup = service.quote("AAPL", true).await.unwrap();
    assert!(matches!(lookup.outcome, EnsureOutcome::Failed(_)));
    assert!(lookup.is_stale_fallback());
    assert_eq!(lookup.error.as_deref(), Some("upstream down"));
    assert_eq!(lookup.into_result().unwrap().symbol, "AAPL");
}

#[tokio::test]
async fn failure_without_cached_value_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/stocks/MSFT/quote")
        .with_status(500)
        .create_async()
        .await;
    let service = service(&server);

    let err = service
        .quote("MSFT", false)
        .await
        .unwrap()
        .into_result()
        .unwrap_err();
    assert_eq!(err, ApiError::Failed("HTTP 500: Internal Server Error".to_string()));
}

#[tokio::test]
async fn empty_symbol_is_rejected_before_any_request() {
    let server = Server::new_async().await;
    let service = service(&server);

    let err = service.quote("  ", false).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
}

#[tokio::test]
async fn invalidating_a_symbol_refetches_every_period() {
    let mut server = Server::new_async().await;
    let chart = server
        .mock("GET", "/api/stocks/AAPL/historical")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(CHART_BODY)
        .expect(4)
        .create_async()
        .await;
    let service = service(&server);

    for period in [Period::M1, Period::Y1] {
        service.chart("AAPL", period, false).await.unwrap();
        let cached = service.chart("AAPL", period, false).await.unwrap();
        assert_eq!(cached.outcome, EnsureOutcome::Fresh);
    }

    service.invalidate_chart("aapl", None).unwrap();
    for period in [Period::M1, Period::Y1] {
        let lookup = service.chart("AAPL", period, false).await.unwrap();
        assert_eq!(lookup.outcome, EnsureOutcome::Fetched);
        assert_eq!(lookup.value.unwrap().len(), 1);
    }
    chart.assert_async().await;
}

#[tokio::test]
async fn single_period_invalidation_leaves_other_periods_fresh() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/stocks/AAPL/historical")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(CHART_BODY)
        .create_async()
        .await;
    let service = service(&server);

    service.chart("AAPL", Period::M1, false).await.unwrap();
    service.chart("AAPL", Period::Y1, false).await.unwrap();
    service.invalidate_chart("AAPL", Some(Period::M1)).unwrap();

    let m1 = service.chart("AAPL", Period::M1, false).await.unwrap();
    let y1 = service.chart("AAPL", Period::Y1, false).await.unwrap();
    assert_eq!(m1.outcome, EnsureOutcome::Fetched);
    assert_eq!(y1.outcome, EnsureOutcome::Fresh);
}

#[tokio::test]
async fn capital_flow_queries_postgrest_with_keys() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/joinquant_fund_flow")
        .match_header("apikey", "anon-key")
        .match_header("authorization", "Bearer anon-key")
        .match_query(Matcher::AllOf(vec![
            // 같은 컬럼의 필터가 두 번 붙으므로 원문 쿼리로 확인
            Matcher::Regex(r"date=gte\.2024-03-06&date=lte\.2024-03-10".into()),
            Matcher::UrlEncoded("order".into(), "date.desc,net_amount_main.desc".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"date":"2024-03-08","sec_code":"600519.XSHG","net_amount_main":125000000.5,"net_pct_main":3.2}]"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = config(&server);
    config.supabase.url = server.url();
    config.supabase.anon_key = SecretString::new("anon-key".into());
    let service = MarketDataService::from_config(&config).unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let rows = service
        .capital_flow(date, 5, false)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_main_inflow());

    // 같은 조건은 캐시에서
    let again = service.capital_flow(date, 5, false).await.unwrap();
    assert_eq!(again.outcome, EnsureOutcome::Fresh);
    mock.assert_async().await;
}

#[tokio::test]
async fn supabase_features_report_not_configured() {
    let server = Server::new_async().await;
    let service = service(&server);
    let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

    let flow = service.capital_flow(date, 5, false).await.unwrap();
    assert!(flow.error.unwrap().starts_with("Not configured"));

    let dates = service.trade_dates(None, None).await.unwrap_err();
    assert_eq!(dates.code(), "NOT_CONFIGURED");
    let more = service.load_more_trade_dates().await.unwrap_err();
    assert_eq!(more.code(), "NOT_CONFIGURED");
    assert!(service.trade_date_calendar().is_none());
}

#[tokio::test]
async fn trade_dates_are_prefetched_once() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/trade_calendar")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("trade_date".into(), "lt.2024-01-10".into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"trade_date":"2024-01-09"},{"trade_date":"2024-01-08"}]"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = config(&server);
    config.supabase.url = server.url();
    config.supabase.anon_key = SecretString::new("anon-key".into());
    let service = MarketDataService::from_config(&config).unwrap();

    let before = NaiveDate::from_ymd_opt(2024, 1, 10);
    let (a, b) = tokio::join!(
        service.trade_dates(before, Some(2)),
        service.trade_dates(before, Some(2))
    );
    let page = a.unwrap().into_result().unwrap();
    assert!(Arc::ptr_eq(&page, &b.unwrap().into_result().unwrap()));
    assert_eq!(page.dates.len(), 2);
    assert!(page.has_more);
    mock.assert_async().await;
}

#[tokio::test]
async fn load_more_trade_dates_extends_calendar() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/rest/v1/trade_calendar")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("trade_date".into(), "lt.2024-01-10".into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"trade_date":"2024-01-09"},{"trade_date":"2024-01-08"}]"#)
        .expect(1)
        .create_async()
        .await;
    let older = server
        .mock("GET", "/rest/v1/trade_calendar")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("trade_date".into(), "lt.2024-01-08".into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"trade_date":"2024-01-05"}]"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = config(&server);
    config.supabase.url = server.url();
    config.supabase.anon_key = SecretString::new("anon-key".into());
    config.supabase.trade_date_batch_size = 2;
    let service = MarketDataService::from_config(&config).unwrap();

    let before = NaiveDate::from_ymd_opt(2024, 1, 10);
    service.trade_dates(before, None).await.unwrap();

    let calendar = service.load_more_trade_dates().await.unwrap();
    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    assert_eq!(calendar.dates, vec![day(9), day(8), day(5)]);
    assert!(!calendar.has_more);

    // 끝까지 받았으면 추가 요청 없음
    let again = service.load_more_trade_dates().await.unwrap();
    assert!(Arc::ptr_eq(&calendar, &again));
    assert!(Arc::ptr_eq(&calendar, &service.trade_date_calendar().unwrap()));

    first.assert_async().await;
    older.assert_async().await;
}

#[tokio::test]
async fn quote_binding_tracks_symbol_switch() {
    let mut server = Server::new_async().await;
    for symbol in ["AAPL", "MSFT"] {
        server
            .mock("GET", format!("/api/stocks/{}/quote", symbol).as_str())
            .with_status(200)
            .with_body(QUOTE_BODY.replace("AAPL", symbol))
            .expect(1)
            .create_async()
            .await;
    }
    let service = service(&server);
    let mut binding = service.quote_binding("AAPL").unwrap();

    let first = binding.observe().await;
    assert_eq!(first.value.as_ref().unwrap().symbol, "AAPL");
    assert!(Arc::ptr_eq(&first, &binding.observe().await));

    binding.set_key(stockdash_cache::CacheKey::symbol("MSFT").unwrap());
    let switched = binding.observe().await;
    assert_eq!(switched.value.as_ref().unwrap().symbol, "MSFT");
}

#[tokio::test]
async fn chart_binding_fetches_period_from_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/stocks/AAPL/historical")
        .match_query(Matcher::UrlEncoded("period".into(), "3M".into()))
        .with_status(200)
        .with_body(CHART_BODY)
        .expect(1)
        .create_async()
        .await;
    let service = service(&server);

    let mut binding = service.chart_binding("AAPL", Period::M3).unwrap();
    let snapshot = binding.observe().await;
    assert_eq!(snapshot.value.as_ref().unwrap().len(), 1);
    assert_eq!(snapshot.error, None);
    mock.assert_async().await;
}

#[tokio::test]
async fn watch_quote_reports_each_refresh_until_cancelled() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/stocks/AAPL/quote")
        .with_status(200)
        .with_body(QUOTE_BODY)
        .create_async()
        .await;
    let service = service(&server);
    let token = CancellationToken::new();
    let updates = AtomicUsize::new(0);

    let refreshed = service
        .watch_quote("AAPL", Duration::from_millis(20), &token, |snapshot| {
            assert!(snapshot.value.is_some());
            if updates.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
                token.cancel();
            }
        })
        .await
        .unwrap();

    assert!(updates.load(Ordering::SeqCst) >= 2);
    assert!(refreshed >= 2);
}
