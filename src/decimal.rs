use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// decimal places of the association's currency
pub const CURRENCY_DP: u32 = 2;

/// round to currency precision and pin the scale so `100` carries as `100.00`
fn to_currency(d: Decimal) -> Decimal {
    let mut rounded = d.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_DP);
    rounded
}

/// money with 2 decimal places (soles)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, CURRENCY_DP));
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal, rounded to currency precision
    pub fn from_decimal(d: Decimal) -> Self {
        Money(to_currency(d))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money::from_decimal(Decimal::from_str(s)?))
    }

    /// create from whole currency units
    pub fn from_major(amount: i64) -> Self {
        Money(to_currency(Decimal::from(amount)))
    }

    /// create from cents
    pub fn from_minor(cents: i64) -> Self {
        Money(Decimal::new(cents, CURRENCY_DP))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// subtraction floored at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).max(Money::ZERO)
    }

    /// split into `parts` equal shares rounded to cents
    pub fn split_even(&self, parts: u32) -> Money {
        Money::from_decimal(self.0 / Decimal::from(parts))
    }

    /// share of `whole` as a percentage, zero when `whole` is zero
    pub fn percentage_of(&self, whole: Money) -> Percentage {
        Percentage::ratio(self.0, whole.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = self.0;
        d.rescale(CURRENCY_DP);
        write!(f, "{}", d)
    }
}

// serialized through Display so deserialized or summed values still render with two decimals
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money::from_decimal(self.0 * other)
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money::from_decimal(self.0 / other)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// percentage with two decimals, e.g. 66.67
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Default)]
pub struct Percentage(Decimal);

impl Percentage {
    pub const ZERO: Percentage = Percentage(Decimal::from_parts(0, 0, 0, false, CURRENCY_DP));

    /// `part / whole * 100`; zero when `whole` is zero
    pub fn ratio(part: Decimal, whole: Decimal) -> Self {
        if whole.is_zero() {
            return Percentage::ZERO;
        }
        Percentage(to_currency(part / whole * Decimal::from(100)))
    }

    /// ratio of two counts
    pub fn of_counts(part: usize, whole: usize) -> Self {
        Percentage::ratio(Decimal::from(part as u64), Decimal::from(whole as u64))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = self.0;
        d.rescale(CURRENCY_DP);
        write!(f, "{}", d)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.125").unwrap();
        assert_eq!(m.to_string(), "100.13");

        let m = Money::from_major(7);
        assert_eq!(m.to_string(), "7.00");
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::from_minor(1), Money::CENT);
        assert_eq!(Money::from_minor(10_050), Money::from_str_exact("100.50").unwrap());
    }

    #[test]
    fn test_split_even_rounds_to_cents() {
        let share = Money::from_major(100).split_even(3);
        assert_eq!(share, Money::from_str_exact("33.33").unwrap());

        let share = Money::from_major(200).split_even(3);
        assert_eq!(share, Money::from_str_exact("66.67").unwrap());
    }

    #[test]
    fn test_saturating_sub() {
        let a = Money::from_major(40);
        let b = Money::from_major(60);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_major(20));
    }

    #[test]
    fn test_percentage_formatting() {
        assert_eq!(Percentage::of_counts(0, 0).to_string(), "0.00");
        assert_eq!(Percentage::of_counts(1, 3).to_string(), "33.33");
        assert_eq!(Percentage::of_counts(3, 3).to_string(), "100.00");

        let collected = Money::from_major(150);
        let projected = Money::from_major(200);
        assert_eq!(collected.percentage_of(projected).as_decimal(), dec!(75));
        assert_eq!(collected.percentage_of(Money::ZERO), Percentage::ZERO);
    }

    #[test]
    fn test_serialized_with_two_decimals() {
        assert_eq!(serde_json::to_string(&Percentage::of_counts(0, 0)).unwrap(), "\"0.00\"");
        assert_eq!(serde_json::to_string(&Percentage::of_counts(3, 3)).unwrap(), "\"100.00\"");
        assert_eq!(serde_json::to_string(&Percentage::of_counts(1, 3)).unwrap(), "\"33.33\"");
        assert_eq!(serde_json::to_string(&Money::from_major(100)).unwrap(), "\"100.00\"");
        assert_eq!(serde_json::to_string(&Money::ZERO).unwrap(), "\"0.00\"");

        let parsed: Money = serde_json::from_str("\"25\"").unwrap();
        assert_eq!(parsed, Money::from_minor(2500));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"25.00\"");
    }

    #[test]
    fn test_sum() {
        let amounts = vec![Money::from_minor(3333), Money::from_minor(3333), Money::from_minor(3334)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::from_major(100));
    }
}
