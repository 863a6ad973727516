//! CLI 명령어 구현 모듈.

pub mod capital_flow;
pub mod chart;
pub mod preferences;
pub mod quote;
pub mod research;
pub mod rps;
pub mod stats;
pub mod trade_dates;
pub mod watch;

use chrono::NaiveDate;
use stockdash_core::{DashError, DashResult as Result, RangeFilter};
use stockdash_data::Lookup;

/// 잘못된 인자 에러.
pub(crate) fn invalid(message: impl Into<String>) -> DashError {
    DashError::InvalidInput(message.into())
}

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(invalid(format!("Invalid format: {}. Use: table, json", s))),
        }
    }
}

/// 날짜 문자열 파싱 (YYYY-MM-DD 또는 YYYYMMDD).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| {
            invalid(format!(
                "Invalid date format: {}. Use YYYY-MM-DD or YYYYMMDD",
                s
            ))
        })
}

/// 선택적 날짜 인자. 없으면 오늘(로컬).
pub fn parse_date_or_today(s: Option<&str>) -> Result<NaiveDate> {
    match s {
        Some(s) => parse_date(s),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// `min,max` 형식의 구간 필터 파싱.
pub fn parse_range(s: &str) -> Result<RangeFilter> {
    let (min, max) = s
        .split_once(',')
        .ok_or_else(|| invalid(format!("Invalid range: {}. Use min,max (e.g. 90,100)", s)))?;
    let min: f64 = min
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid range minimum: {}", min)))?;
    let max: f64 = max
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid range maximum: {}", max)))?;
    if min > max {
        return Err(invalid(format!(
            "Range minimum {} is greater than maximum {}",
            min, max
        )));
    }
    Ok(RangeFilter::new(min, max))
}

/// 쉼표로 구분된 심볼 목록.
pub fn parse_symbols(s: &str) -> Vec<String> {
    s.split(',')
        .map(|part| part.trim().to_uppercase())
        .filter(|part| !part.is_empty())
        .collect()
}

/// 이전 값으로 대체된 조회라면 경고 한 줄을 출력합니다.
pub(crate) fn report_stale<T>(lookup: &Lookup<T>) {
    if lookup.is_stale_fallback() {
        if let Some(message) = &lookup.error {
            eprintln!("⚠️  {} 갱신 실패, 이전 값을 표시합니다: {}", lookup.key, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert_eq!(parse_date("20240315").unwrap(), expected);
        assert!(parse_date("15/03/2024").is_err());
    }

    #[test]
    fn test_parse_date_or_today() {
        let today = chrono::Local::now().date_naive();
        assert_eq!(parse_date_or_today(None).unwrap(), today);
        assert_eq!(
            parse_date_or_today(Some("2024-01-02")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_parse_range() {
        let range = parse_range("90,100").unwrap();
        assert_eq!(range, RangeFilter::new(90.0, 100.0));
        assert_eq!(range.to_query_value(), "(90,100)");
        assert!(parse_range(" 80.5 , 95 ").is_ok());
        assert!(parse_range("90").is_err());
        assert!(parse_range("a,b").is_err());
        assert!(parse_range("100,90").is_err());
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols("aapl, msft,,TSLA "), vec!["AAPL", "MSFT", "TSLA"]);
        assert!(parse_symbols(" , ").is_empty());
    }

    #[test]
    fn test_invalid_arguments_are_input_errors() {
        assert!(matches!(parse_range("1,2,3"), Err(DashError::InvalidInput(_))));
        assert!(matches!(parse_date("yesterday"), Err(DashError::InvalidInput(_))));
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::parse("csv").is_err());
    }
}
