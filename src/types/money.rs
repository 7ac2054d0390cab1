//! Monetary values for the ledger
//!
//! `Money` is an immutable, non-negative amount in a currency's minor units
//! (cents for USD). Direction (debit or credit) is carried by the caller, never
//! by the value itself. Every balance computation in the engine goes through
//! this type so that amounts in different currencies can never be mixed.

use super::error::MoneyError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currencies the ledger can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Inr,
    Jpy,
    Aud,
    Cad,
    Chf,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
            Currency::Jpy => "JPY",
            Currency::Aud => "AUD",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
        }
    }

    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Inr => "₹",
            Currency::Jpy => "¥",
            Currency::Aud => "A$",
            Currency::Cad => "C$",
            Currency::Chf => "CHF",
        }
    }

    /// Number of decimal digits between the major and minor unit
    pub fn minor_unit(&self) -> u32 {
        match self {
            Currency::Jpy => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "INR" => Ok(Currency::Inr),
            "JPY" => Ok(Currency::Jpy),
            "AUD" => Ok(Currency::Aud),
            "CAD" => Ok(Currency::Cad),
            "CHF" => Ok(Currency::Chf),
            _ => Err(format!("Unknown currency: '{}'", s)),
        }
    }
}

/// Non-negative amount of a single currency, in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMoney")]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

/// Unchecked wire form of `Money`
#[derive(Deserialize)]
struct RawMoney {
    amount_minor: i64,
    currency: Currency,
}

impl TryFrom<RawMoney> for Money {
    type Error = MoneyError;

    fn try_from(raw: RawMoney) -> Result<Self, Self::Error> {
        Money::from_minor(raw.amount_minor, raw.currency)
    }
}

impl Money {
    /// Create a value from minor units
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::NegativeAmount` if `amount_minor` is below zero.
    pub fn from_minor(amount_minor: i64, currency: Currency) -> Result<Self, MoneyError> {
        if amount_minor < 0 {
            return Err(MoneyError::NegativeAmount {
                amount: amount_minor.to_string(),
            });
        }

        Ok(Money {
            amount_minor,
            currency,
        })
    }

    /// Create a value from major units, rounding half away from zero to the
    /// currency's minor unit
    ///
    /// `Money::from_major(dec!(10.505), Currency::Usd)` is 1051 cents.
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let exponent = currency.minor_unit();
        let rounded = amount.round_dp_with_strategy(exponent, RoundingStrategy::MidpointAwayFromZero);

        if rounded.is_sign_negative() && !rounded.is_zero() {
            return Err(MoneyError::NegativeAmount {
                amount: amount.to_string(),
            });
        }

        let overflow = || MoneyError::Overflow {
            operation: "from_major".to_string(),
        };
        let scaled = rounded
            .checked_mul(Decimal::from(10i64.pow(exponent)))
            .ok_or_else(overflow)?;
        let amount_minor = scaled.trunc().to_i64().ok_or_else(overflow)?;

        Self::from_minor(amount_minor, currency)
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Money {
            amount_minor: 0,
            currency,
        }
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Value in major units with the currency's number of decimals
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.amount_minor, self.currency.minor_unit())
    }

    /// Add two values of the same currency
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;

        let amount_minor =
            self.amount_minor
                .checked_add(other.amount_minor)
                .ok_or_else(|| MoneyError::Overflow {
                    operation: "add".to_string(),
                })?;

        Ok(Money {
            amount_minor,
            currency: self.currency,
        })
    }

    /// Subtract a value of the same currency
    ///
    /// # Errors
    ///
    /// `MoneyError::InsufficientAmount` if `other` is larger than `self`.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;

        if self.amount_minor < other.amount_minor {
            return Err(MoneyError::InsufficientAmount {
                available: self.amount_minor,
                requested: other.amount_minor,
            });
        }

        Ok(Money {
            amount_minor: self.amount_minor - other.amount_minor,
            currency: self.currency,
        })
    }

    pub fn is_greater_than(&self, other: &Money) -> Result<bool, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount_minor > other.amount_minor)
    }

    pub fn is_greater_than_or_equal(&self, other: &Money) -> Result<bool, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount_minor >= other.amount_minor)
    }

    pub fn is_less_than(&self, other: &Money) -> Result<bool, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount_minor < other.amount_minor)
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    pub fn has_same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.has_same_currency(other) {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            })
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency.symbol(), self.to_major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn usd(amount: i64) -> Money {
        Money::from_minor(amount, Currency::Usd).unwrap()
    }

    #[test]
    fn test_from_minor() {
        let money = usd(1000);

        assert_eq!(money.amount_minor(), 1000);
        assert_eq!(money.currency(), Currency::Usd);
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let result = Money::from_minor(-100, Currency::Usd);

        assert_eq!(
            result,
            Err(MoneyError::NegativeAmount {
                amount: "-100".to_string()
            })
        );
    }

    #[rstest]
    #[case::two_decimals(Decimal::new(1050, 2), Currency::Usd, 1050)]
    #[case::round_half_up(Decimal::new(10505, 3), Currency::Usd, 1051)]
    #[case::round_down(Decimal::new(10504, 3), Currency::Eur, 1050)]
    #[case::zero_decimal_currency(Decimal::new(1234, 0), Currency::Jpy, 1234)]
    #[case::zero_decimal_rounding(Decimal::new(12345, 1), Currency::Jpy, 1235)]
    #[case::tiny_negative_rounds_to_zero(Decimal::new(-1, 3), Currency::Usd, 0)]
    fn test_from_major(
        #[case] amount: Decimal,
        #[case] currency: Currency,
        #[case] expected_minor: i64,
    ) {
        let money = Money::from_major(amount, currency).unwrap();
        assert_eq!(money.amount_minor(), expected_minor);
        assert_eq!(money.currency(), currency);
    }

    #[test]
    fn test_from_major_negative_is_rejected() {
        let result = Money::from_major(Decimal::new(-150, 2), Currency::Usd);
        assert!(matches!(result, Err(MoneyError::NegativeAmount { .. })));
    }

    #[test]
    fn test_from_major_overflow_is_rejected() {
        let result = Money::from_major(Decimal::MAX, Currency::Usd);
        assert!(matches!(result, Err(MoneyError::Overflow { .. })));
    }

    #[rstest]
    #[case(1050, Currency::Usd, Decimal::new(1050, 2))]
    #[case(500, Currency::Jpy, Decimal::new(500, 0))]
    fn test_to_major(#[case] minor: i64, #[case] currency: Currency, #[case] expected: Decimal) {
        let money = Money::from_minor(minor, currency).unwrap();
        assert_eq!(money.to_major(), expected);
    }

    #[test]
    fn test_add() {
        assert_eq!(usd(1000).checked_add(&usd(500)).unwrap(), usd(1500));
    }

    #[test]
    fn test_add_different_currency_fails() {
        let eur = Money::from_minor(500, Currency::Eur).unwrap();

        let result = usd(1000).checked_add(&eur);

        assert_eq!(
            result,
            Err(MoneyError::CurrencyMismatch {
                left: Currency::Usd,
                right: Currency::Eur
            })
        );
    }

    #[test]
    fn test_add_overflow_fails() {
        let result = usd(i64::MAX).checked_add(&usd(1));
        assert!(matches!(result, Err(MoneyError::Overflow { .. })));
    }

    #[test]
    fn test_subtract() {
        assert_eq!(usd(1000).checked_sub(&usd(300)).unwrap(), usd(700));
    }

    #[test]
    fn test_subtract_to_zero() {
        assert!(usd(300).checked_sub(&usd(300)).unwrap().is_zero());
    }

    #[test]
    fn test_subtract_insufficient_fails() {
        let result = usd(100).checked_sub(&usd(500));

        assert_eq!(
            result,
            Err(MoneyError::InsufficientAmount {
                available: 100,
                requested: 500
            })
        );
    }

    #[test]
    fn test_comparisons() {
        assert!(usd(1000).is_greater_than(&usd(500)).unwrap());
        assert!(!usd(500).is_greater_than(&usd(1000)).unwrap());
        assert!(usd(500).is_greater_than_or_equal(&usd(500)).unwrap());
        assert!(usd(499).is_less_than(&usd(500)).unwrap());
    }

    #[test]
    fn test_comparison_different_currency_fails() {
        let gbp = Money::from_minor(1, Currency::Gbp).unwrap();
        assert!(usd(1).is_less_than(&gbp).is_err());
    }

    #[test]
    fn test_predicates() {
        assert!(Money::zero(Currency::Usd).is_zero());
        assert!(!Money::zero(Currency::Usd).is_positive());
        assert!(usd(100).is_positive());
    }

    #[test]
    fn test_equality_includes_currency() {
        let eur = Money::from_minor(1000, Currency::Eur).unwrap();

        assert_eq!(usd(1000), usd(1000));
        assert_ne!(usd(1000), eur);
        assert!(usd(1000).has_same_currency(&usd(5)));
        assert!(!usd(1000).has_same_currency(&eur));
    }

    #[rstest]
    #[case(usd(1050), "$ 10.50")]
    #[case(Money::from_minor(500, Currency::Jpy).unwrap(), "¥ 500")]
    #[case(Money::from_minor(7, Currency::Eur).unwrap(), "€ 0.07")]
    fn test_display(#[case] money: Money, #[case] expected: &str) {
        assert_eq!(money.to_string(), expected);
    }

    #[rstest]
    #[case("USD", Currency::Usd)]
    #[case("eur", Currency::Eur)]
    #[case(" jpy ", Currency::Jpy)]
    fn test_currency_from_str(#[case] input: &str, #[case] expected: Currency) {
        assert_eq!(input.parse::<Currency>().unwrap(), expected);
    }

    #[test]
    fn test_currency_from_str_unknown() {
        assert!("XYZ".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_serde_uses_iso_code() {
        assert_eq!(serde_json::to_string(&Currency::Chf).unwrap(), "\"CHF\"");
        let parsed: Currency = serde_json::from_str("\"INR\"").unwrap();
        assert_eq!(parsed, Currency::Inr);
    }

    #[rstest]
    #[case::positive(r#"{"amount_minor":1500,"currency":"USD"}"#, true)]
    #[case::zero(r#"{"amount_minor":0,"currency":"EUR"}"#, true)]
    #[case::negative(r#"{"amount_minor":-5,"currency":"USD"}"#, false)]
    fn test_money_deserialization_checks_sign(#[case] json: &str, #[case] accepted: bool) {
        let parsed = serde_json::from_str::<Money>(json);
        assert_eq!(parsed.is_ok(), accepted, "{:?}", parsed);
    }
}
