//! 자금 흐름(순유입) 테이블 타입.
//!
//! `joinquant_fund_flow` 테이블의 한 행에 대응합니다.
//! 주력/초대형/대형/중형/소형 주문 기준 순유입 금액과 비율을 담습니다.

use crate::types::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 자금 흐름 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalFlowRow {
    /// 거래일
    pub date: NaiveDate,
    /// 종목 코드
    pub sec_code: String,
    /// 등락률 (%)
    #[serde(default)]
    pub change_pct: Option<f64>,
    /// 주력 순유입 금액
    #[serde(default)]
    pub net_amount_main: Option<Amount>,
    /// 주력 순유입 비율 (%)
    #[serde(default)]
    pub net_pct_main: Option<f64>,
    /// 초대형 주문 순유입 금액
    #[serde(default)]
    pub net_amount_xl: Option<Amount>,
    #[serde(default)]
    pub net_pct_xl: Option<f64>,
    /// 대형 주문 순유입 금액
    #[serde(default)]
    pub net_amount_l: Option<Amount>,
    #[serde(default)]
    pub net_pct_l: Option<f64>,
    /// 중형 주문 순유입 금액
    #[serde(default)]
    pub net_amount_m: Option<Amount>,
    #[serde(default)]
    pub net_pct_m: Option<f64>,
    /// 소형 주문 순유입 금액
    #[serde(default)]
    pub net_amount_s: Option<Amount>,
    #[serde(default)]
    pub net_pct_s: Option<f64>,
}

impl CapitalFlowRow {
    /// 주력 자금이 순유입인지 확인.
    pub fn is_main_inflow(&self) -> bool {
        self.net_amount_main
            .map(|amount| amount.is_sign_positive() && !amount.is_zero())
            .unwrap_or(false)
    }
}
