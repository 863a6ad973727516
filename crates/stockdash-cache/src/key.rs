//! 캐시 키.
//!
//! 키는 안정적인 식별 필드를 `:`로 이어 붙여 만듭니다 (예: `AAPL`, `AAPL:1M`).
//! 구성 요소에는 구분자가 들어갈 수 없으므로 서로 다른 요청이 같은 키로
//! 충돌하지 않고, 같은 요청은 항상 같은 키를 만듭니다.

use crate::error::{CacheError, Result};
use std::fmt;

/// 키 구성 요소 구분자.
pub const SEPARATOR: char = ':';

/// 캐시 항목을 식별하는 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// 원시 키 문자열을 검증하여 생성.
    ///
    /// 앞뒤 공백은 제거되며, 빈 키는 거부됩니다.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CacheError::InvalidKey("empty key".to_string()));
        }
        if trimmed.split(SEPARATOR).any(|part| part.trim().is_empty()) {
            return Err(CacheError::InvalidKey(format!(
                "empty component in '{}'",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// 심볼 단일 키 (예: `AAPL`).
    ///
    /// 심볼은 대문자로 정규화됩니다.
    pub fn symbol(symbol: &str) -> Result<Self> {
        let symbol = normalize_symbol(symbol)?;
        Ok(Self(symbol))
    }

    /// 심볼 + 기간 키 (예: `AAPL:1M`).
    ///
    /// 기간은 대소문자를 구분하므로 그대로 사용합니다 (`1m`과 `1M`은 다른 기간).
    pub fn symbol_period(symbol: &str, period: impl fmt::Display) -> Result<Self> {
        let symbol = normalize_symbol(symbol)?;
        let period = period.to_string();
        let period = checked_component(&period)?;
        Ok(Self(format!("{}{}{}", symbol, SEPARATOR, period)))
    }

    /// 임의의 구성 요소를 이어 붙인 키.
    pub fn composite<S: AsRef<str>>(parts: &[S]) -> Result<Self> {
        if parts.is_empty() {
            return Err(CacheError::InvalidKey("no key components".to_string()));
        }
        let mut joined = String::new();
        for (i, part) in parts.iter().enumerate() {
            let part = checked_component(part.as_ref())?;
            if i > 0 {
                joined.push(SEPARATOR);
            }
            joined.push_str(part);
        }
        Ok(Self(joined))
    }

    /// 키 문자열.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 구성 요소 목록.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// 첫 번째 구성 요소 (보통 심볼).
    pub fn first_component(&self) -> &str {
        self.components().next().unwrap_or_default()
    }

    /// 첫 번째 구성 요소가 `prefix`와 정확히 같은지 확인.
    ///
    /// `AAPL`은 `AAPL:1M`에 일치하지만 `AAPLX:1M`에는 일치하지 않습니다.
    pub fn has_prefix_component(&self, prefix: &str) -> bool {
        self.first_component() == prefix
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = checked_component(symbol)?;
    Ok(symbol.to_uppercase())
}

fn checked_component(part: &str) -> Result<&str> {
    let part = part.trim();
    if part.is_empty() {
        return Err(CacheError::InvalidKey("empty key component".to_string()));
    }
    if part.contains(SEPARATOR) {
        return Err(CacheError::InvalidKey(format!(
            "component '{}' contains separator '{}'",
            part, SEPARATOR
        )));
    }
    Ok(part)
}
