//! 金额计算工具
//!
//! 存储层使用 f64 (REAL)，所有计算统一转换为 Decimal 后进行，
//! 结果四舍五入到 2 位小数再落库。

use rust_decimal::prelude::*;

/// 金额精度 (小数位)
pub const DECIMAL_PLACES: u32 = 2;

/// Convert a stored f64 amount to Decimal
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round a stored amount to 2 places without leaving f64 space
#[inline]
pub fn round_money(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Sum stored amounts exactly
pub fn sum<I: IntoIterator<Item = f64>>(values: I) -> Decimal {
    values.into_iter().map(to_decimal).sum()
}

/// Whether two stored amounts are equal at cent precision
pub fn money_eq(a: f64, b: f64) -> bool {
    to_decimal(round_money(a)) == to_decimal(round_money(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_f64_rounds_half_away_from_zero() {
        assert_eq!(to_f64(Decimal::new(12345, 3)), 12.35);
        assert_eq!(to_f64(Decimal::new(-12345, 3)), -12.35);
        assert_eq!(to_f64(Decimal::new(500, 2)), 5.0);
    }

    #[test]
    fn test_sum_avoids_float_drift() {
        // 0.1 + 0.2 in f64 is 0.30000000000000004
        let total = sum([0.1, 0.2]);
        assert_eq!(to_f64(total), 0.3);

        let many = sum(std::iter::repeat_n(0.01, 1000));
        assert_eq!(to_f64(many), 10.0);
    }

    #[test]
    fn test_money_eq() {
        assert!(money_eq(0.1 + 0.2, 0.3));
        assert!(!money_eq(5.0, 5.01));
    }
}
