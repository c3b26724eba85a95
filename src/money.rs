use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A currency amount in integer cents.
///
/// All arithmetic stays in integers; fractional results round half away
/// from zero. Amounts may be negative in intermediate arithmetic
/// (overpaid invoices), display clamping is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Money {
        Money(cents)
    }

    pub fn from_major(units: i64) -> Money {
        Money(units.saturating_mul(100))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Line-total arithmetic: unit price times a whole quantity.
    pub fn mul_quantity(self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(quantity as i64))
    }

    /// Applies a percentage, rounding half away from zero to whole cents.
    pub fn mul_percent(self, rate: Percent) -> Money {
        let cents = self.0 as i128;
        let value = div_round_i128(cents * rate.basis_points() as i128, 10_000);
        Money(value.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    pub fn max(self, other: Money) -> Money {
        if self >= other { self } else { other }
    }

    /// Parses a decimal string such as `"350"`, `"350.5"`, or `"350.00"`.
    /// At most two fraction digits are accepted; currency inputs are
    /// stored values, not free-form arithmetic results.
    pub fn parse(raw: &str) -> Result<Money, String> {
        let raw = raw.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if digits.is_empty() {
            return Err(format!("empty amount: {:?}", raw));
        }
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if frac.len() > 2 {
            return Err(format!("more than two fraction digits: {:?}", raw));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(format!("not a decimal amount: {:?}", raw));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| format!("amount out of range: {:?}", raw))?
        };
        let mut frac_cents: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse()
                .map_err(|_| format!("amount out of range: {:?}", raw))?
        };
        if frac.len() == 1 {
            frac_cents *= 10;
        }
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(|| format!("amount out of range: {:?}", raw))?;
        Ok(Money(if negative { -cents } else { cents }))
    }

    /// `1234567` cents formats as `"12,345.67"`.
    pub fn format(self) -> String {
        let negative = self.0 < 0;
        let cents = self.0.unsigned_abs();
        let whole = (cents / 100).to_string();
        let grouped = whole
            .as_bytes()
            .rchunks(3)
            .rev()
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        let sign = if negative { "-" } else { "" };
        format!("{}{}.{:02}", sign, grouped, cents % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, v| acc + v)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let cents = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        serializer.serialize_str(&format!("{}{}.{:02}", sign, cents / 100, cents % 100))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Money, E> {
        Money::parse(value).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Money, E> {
        if !value.is_finite() {
            return Err(E::custom("non-finite amount"));
        }
        Ok(Money((value * 100.0).round() as i64))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Money, E> {
        Ok(Money::from_major(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Money, E> {
        self.visit_i64(value.min(i64::MAX as u64) as i64)
    }
}

/// A percentage in integer basis points: `Percent::from_bp(800)` is 8%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);

    pub fn from_bp(basis_points: i64) -> Percent {
        Percent(basis_points)
    }

    pub fn basis_points(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `800` basis points formats as `"8.00"`.
    pub fn format(self) -> String {
        let negative = self.0 < 0;
        let bp = self.0.unsigned_abs();
        let sign = if negative { "-" } else { "" };
        format!("{}{}.{:02}", sign, bp / 100, bp % 100)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Percent, D::Error> {
        deserializer.deserialize_any(PercentVisitor)
    }
}

struct PercentVisitor;

impl Visitor<'_> for PercentVisitor {
    type Value = Percent;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a percentage as a number or string")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Percent, E> {
        if !value.is_finite() {
            return Err(E::custom("non-finite percentage"));
        }
        Ok(Percent((value * 100.0).round() as i64))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Percent, E> {
        Ok(Percent(value.saturating_mul(100)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Percent, E> {
        self.visit_i64(value.min(i64::MAX as u64) as i64)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Percent, E> {
        let amount = Money::parse(value).map_err(E::custom)?;
        Ok(Percent(amount.cents()))
    }
}

fn div_round_i128(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let den_abs = den.abs();
    if num >= 0 {
        (num + (den_abs / 2)) / den
    } else {
        -(((-num) + (den_abs / 2)) / den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings_to_cents() {
        assert_eq!(Money::parse("350.00").unwrap().cents(), 35_000);
        assert_eq!(Money::parse("350.5").unwrap().cents(), 35_050);
        assert_eq!(Money::parse("350").unwrap().cents(), 35_000);
        assert_eq!(Money::parse("-12.34").unwrap().cents(), -1_234);
        assert_eq!(Money::parse(".50").unwrap().cents(), 50);
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert!(Money::parse("12.345").is_err());
        assert!(Money::parse("12a").is_err());
        assert!(Money::parse("").is_err());
        assert!(Money::parse("-").is_err());
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(Money::from_cents(35_000).format(), "350.00");
        assert_eq!(Money::from_cents(1_234_567).format(), "12,345.67");
        assert_eq!(Money::from_cents(-5).format(), "-0.05");
        assert_eq!(Money::from_cents(100_000_000).format(), "1,000,000.00");
    }

    #[test]
    fn percent_application_rounds_half_up() {
        let subtotal = Money::from_cents(35_000);
        assert_eq!(subtotal.mul_percent(Percent::from_bp(800)).cents(), 2_800);
        // 1.00 at 0.125% -> 0.125 cents, rounds to 0
        assert_eq!(
            Money::from_cents(100)
                .mul_percent(Percent::from_bp(12))
                .cents(),
            0
        );
        // 12.50 at 8.25% -> 103.125 cents, rounds to 103
        assert_eq!(
            Money::from_cents(1_250)
                .mul_percent(Percent::from_bp(825))
                .cents(),
            103
        );
    }

    #[test]
    fn repeated_addition_has_no_drift() {
        let line = Money::parse("0.10").unwrap();
        let total: Money = std::iter::repeat(line).take(1_000).sum();
        assert_eq!(total.cents(), 10_000);
    }

    #[test]
    fn deserializes_from_strings_and_numbers() {
        assert_eq!(
            serde_json::from_str::<Money>("\"350.00\"").unwrap(),
            Money::from_cents(35_000)
        );
        assert_eq!(
            serde_json::from_str::<Money>("350.5").unwrap(),
            Money::from_cents(35_050)
        );
        assert_eq!(
            serde_json::from_str::<Money>("200").unwrap(),
            Money::from_cents(20_000)
        );
        assert_eq!(
            serde_json::from_str::<Percent>("8").unwrap(),
            Percent::from_bp(800)
        );
        assert_eq!(
            serde_json::from_str::<Percent>("8.25").unwrap(),
            Percent::from_bp(825)
        );
    }

    #[test]
    fn percent_formats_to_two_decimals() {
        assert_eq!(Percent::from_bp(800).format(), "8.00");
        assert_eq!(Percent::from_bp(825).format(), "8.25");
        assert_eq!(Percent::ZERO.format(), "0.00");
    }
}
