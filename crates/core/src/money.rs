//! Money - exact minor-unit amounts for financial fields
//!
//! All monetary amounts in Veritrail MUST be non-negative, and the integer
//! minor-unit form is authoritative. The decimal form is a derived
//! convenience and is re-computed from minor units on every reconcile.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Number of minor units per major unit (2 decimal places).
const MINOR_PER_MAJOR: i64 = 100;

/// Errors that can occur when working with monetary amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// A non-negative monetary amount backed by integer minor units.
///
/// # Invariant
/// `minor_units >= 0`, and `minor_units == round(decimal * 100)` with
/// round-half-up at 2 decimal places. Enforced by the constructors.
///
/// # Example
/// ```
/// use veritrail_core::Money;
/// use rust_decimal::Decimal;
///
/// let fee = Money::from_decimal(Decimal::new(150005, 3)).unwrap(); // 150.005
/// assert_eq!(fee.minor_units(), 15001);
/// assert_eq!(fee.to_decimal(), Decimal::new(15001, 2)); // 150.01
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    /// Zero amount constant
    pub const ZERO: Self = Self(0);

    /// Create a Money value from integer minor units.
    ///
    /// Returns an error if the value is negative.
    pub fn from_minor_units(minor_units: i64) -> Result<Self, MoneyError> {
        if minor_units < 0 {
            Err(MoneyError::NegativeAmount(Decimal::new(minor_units, 2)))
        } else {
            Ok(Self(minor_units))
        }
    }

    /// Create a Money value from a decimal amount.
    ///
    /// Converts with exact decimal arithmetic, rounding half-up at
    /// 2 decimal places. Returns an error if the value is negative or
    /// does not fit in minor units.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        if value < Decimal::ZERO {
            return Err(MoneyError::NegativeAmount(value));
        }

        let minor = value
            .checked_mul(Decimal::from(MINOR_PER_MAJOR))
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|rounded| rounded.to_i64())
            .ok_or_else(|| MoneyError::InvalidAmount(format!("out of range: {}", value)))?;

        Ok(Self(minor))
    }

    /// Parse a Money value from a decimal string.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let value: Decimal = input
            .trim()
            .parse()
            .map_err(|_| MoneyError::InvalidAmount(format!("not a number: {}", input)))?;
        Self::from_decimal(value)
    }

    /// Get the authoritative integer minor-unit form
    #[inline]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Derive the 2dp decimal form from minor units
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Check if the amount is zero
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition - returns None on overflow
    pub fn checked_add(&self, other: &Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Checked subtraction - returns None if result would be negative
    pub fn checked_sub(&self, other: &Money) -> Option<Money> {
        let result = self.0.checked_sub(other.0)?;
        if result < 0 {
            None
        } else {
            Some(Money(result))
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl TryFrom<i64> for Money {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_minor_units(value)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A monetary entity field carrying both physical representations.
///
/// The minor-unit form wins on reconcile: if both are set, the decimal
/// form is re-derived from minor units, overwriting any stale value.
/// This directional precedence is what prevents drift from repeated
/// decimal round-trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyField {
    /// Human-readable 2dp decimal form (derived, may be stale until reconcile)
    pub decimal: Option<Decimal>,
    /// Authoritative integer minor-unit form
    pub minor_units: Option<i64>,
}

impl MoneyField {
    /// Create an unset field
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the decimal form. Clears the minor-unit form so the new
    /// decimal value becomes the reconcile source.
    pub fn set_decimal(&mut self, value: Decimal) {
        self.decimal = Some(value);
        self.minor_units = None;
    }

    /// Write the minor-unit form. Authoritative over any decimal value.
    pub fn set_minor_units(&mut self, minor_units: i64) {
        self.minor_units = Some(minor_units);
    }

    /// Resolve the field to a Money value without mutating it.
    ///
    /// Returns None if neither representation is set.
    pub fn resolve(&self) -> Option<Result<Money, MoneyError>> {
        match (self.minor_units, self.decimal) {
            (Some(minor), _) => Some(Money::from_minor_units(minor)),
            (None, Some(decimal)) => Some(Money::from_decimal(decimal)),
            (None, None) => None,
        }
    }

    /// Reconcile the two representations in place.
    ///
    /// Minor units win: if set, the decimal form is re-derived from them.
    /// Otherwise minor units are derived from the decimal form. After a
    /// successful reconcile, `minor_units == round(decimal * 100)` holds.
    pub fn reconcile(&mut self) -> Result<Money, MoneyError> {
        let money = self
            .resolve()
            .ok_or_else(|| MoneyError::InvalidAmount("no value set".to_string()))??;

        self.minor_units = Some(money.minor_units());
        self.decimal = Some(money.to_decimal());
        Ok(money)
    }
}

/// Named monetary fields of an entity.
///
/// Provides the read/write accessors for monetary fields and whole-entity
/// reconciliation, run before every persist of a monetary-bearing entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyMap {
    fields: BTreeMap<String, MoneyField>,
}

impl MoneyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a field's decimal form
    pub fn set_amount(&mut self, field: impl Into<String>, value: Decimal) {
        self.fields.entry(field.into()).or_default().set_decimal(value);
    }

    /// Write a field's minor-unit form
    pub fn set_minor_units(&mut self, field: impl Into<String>, minor_units: i64) {
        self.fields
            .entry(field.into())
            .or_default()
            .set_minor_units(minor_units);
    }

    /// Resolve a field to a Money value
    pub fn amount(&self, field: &str) -> Option<Result<Money, MoneyError>> {
        self.fields.get(field).and_then(MoneyField::resolve)
    }

    /// Get the raw field state
    pub fn field(&self, field: &str) -> Option<&MoneyField> {
        self.fields.get(field)
    }

    /// Names of all declared fields
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Reconcile every field in place.
    ///
    /// Fails on the first invalid field; no partial error is swallowed.
    pub fn reconcile(&mut self) -> Result<(), MoneyError> {
        for field in self.fields.values_mut() {
            field.reconcile()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_minor_units() {
        let money = Money::from_minor_units(15001).unwrap();
        assert_eq!(money.minor_units(), 15001);
        assert_eq!(money.to_decimal(), dec!(150.01));
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Money::from_minor_units(-1),
            Err(MoneyError::NegativeAmount(_))
        ));
        assert!(matches!(
            Money::from_decimal(dec!(-0.01)),
            Err(MoneyError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_round_half_up() {
        // 150.005 rounds half-up to 15001 minor units
        let money = Money::from_decimal(dec!(150.005)).unwrap();
        assert_eq!(money.minor_units(), 15001);
        assert_eq!(money.to_decimal(), dec!(150.01));

        let down = Money::from_decimal(dec!(150.004)).unwrap();
        assert_eq!(down.minor_units(), 15000);
    }

    #[test]
    fn test_decimal_round_trip() {
        // to_decimal(from_decimal(x)) == round(x, 2)
        for raw in [dec!(0), dec!(0.01), dec!(12.345), dec!(99.995), dec!(5000)] {
            let money = Money::from_decimal(raw).unwrap();
            let expected =
                raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            assert_eq!(money.to_decimal(), expected, "round-trip failed for {}", raw);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("150.01").unwrap().minor_units(), 15001);
        assert!(matches!(
            Money::parse("not-a-number"),
            Err(MoneyError::InvalidAmount(_))
        ));
        assert!(matches!(
            Money::parse("-5"),
            Err(MoneyError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_checked_sub_prevents_negative() {
        let a = Money::from_minor_units(5000).unwrap();
        let b = Money::from_minor_units(10000).unwrap();
        assert!(a.checked_sub(&b).is_none());
        assert_eq!(b.checked_sub(&a).unwrap().minor_units(), 5000);
    }

    #[test]
    fn test_serde_round_trip() {
        let money = Money::from_minor_units(12345).unwrap();
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "12345");
        let parsed: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(money, parsed);
    }

    #[test]
    fn test_serde_rejects_negative() {
        let result: Result<Money, _> = serde_json::from_str("-100");
        assert!(result.is_err());
    }

    #[test]
    fn test_field_minor_units_win() {
        let mut field = MoneyField::new();
        field.decimal = Some(dec!(99.99)); // stale
        field.minor_units = Some(15001);

        let money = field.reconcile().unwrap();
        assert_eq!(money.minor_units(), 15001);
        assert_eq!(field.decimal, Some(dec!(150.01)));
    }

    #[test]
    fn test_field_decimal_derives_minor() {
        let mut field = MoneyField::new();
        field.set_decimal(dec!(150.005));

        let money = field.reconcile().unwrap();
        assert_eq!(money.minor_units(), 15001);
        assert_eq!(field.minor_units, Some(15001));
        assert_eq!(field.decimal, Some(dec!(150.01)));
    }

    #[test]
    fn test_field_unset_fails() {
        let mut field = MoneyField::new();
        assert!(matches!(
            field.reconcile(),
            Err(MoneyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_reconcile_idempotent() {
        let mut field = MoneyField::new();
        field.set_decimal(dec!(150.005));
        let first = field.reconcile().unwrap();
        let second = field.reconcile().unwrap();
        assert_eq!(first, second);
        assert_eq!(field.minor_units, Some(15001));
    }

    #[test]
    fn test_map_accessors() {
        let mut map = MoneyMap::new();
        map.set_amount("fee", dec!(150.005));
        map.set_minor_units("total_amount", 500000);

        map.reconcile().unwrap();

        assert_eq!(map.amount("fee").unwrap().unwrap().minor_units(), 15001);
        assert_eq!(
            map.amount("total_amount").unwrap().unwrap().to_decimal(),
            dec!(5000.00)
        );
        assert!(map.amount("missing").is_none());
    }

    #[test]
    fn test_map_invariant_after_reconcile() {
        let mut map = MoneyMap::new();
        map.set_amount("a", dec!(1.005));
        map.set_amount("b", dec!(2.994));
        map.reconcile().unwrap();

        for name in ["a", "b"] {
            let field = map.field(name).unwrap();
            let minor = field.minor_units.unwrap();
            let decimal = field.decimal.unwrap();
            let expected = (decimal * dec!(100))
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            assert_eq!(Decimal::from(minor), expected);
        }
    }
}
