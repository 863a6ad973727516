//! 가격/금액 표현을 위한 Decimal 별칭과 유틸리티.

use rust_decimal::{Decimal, RoundingStrategy};

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 금액(시가총액, 순유입 등) 타입.
pub type Amount = Decimal;

/// Decimal 표시용 확장 트레이트.
pub trait DecimalExt {
    /// 부호가 붙은 퍼센트 문자열로 변환합니다 (예: "+1.35%").
    ///
    /// 값은 이미 퍼센트 단위(1.35 = 1.35%)라고 가정합니다.
    fn to_signed_percent(&self) -> String;

    /// 큰 금액을 읽기 쉬운 단위로 축약합니다 (예: "2.80T", "52.49M").
    fn to_compact(&self) -> String;
}

impl DecimalExt for Decimal {
    fn to_signed_percent(&self) -> String {
        let rounded = round2(*self);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            format!("{:.2}%", rounded)
        } else {
            format!("+{:.2}%", rounded.abs())
        }
    }

    fn to_compact(&self) -> String {
        let units = [
            (Decimal::from(1_000_000_000_000i64), "T"),
            (Decimal::from(1_000_000_000i64), "B"),
            (Decimal::from(1_000_000i64), "M"),
            (Decimal::from(1_000i64), "K"),
        ];
        let abs = self.abs();
        for (threshold, suffix) in units {
            if abs >= threshold {
                return format!("{:.2}{}", round2(*self / threshold), suffix);
            }
        }
        format!("{:.2}", round2(*self))
    }
}

/// 표시용 소수 둘째 자리 반올림 (0.5는 0에서 멀어지는 쪽).
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
