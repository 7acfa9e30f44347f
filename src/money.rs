use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },
    #[error("invalid currency code: '{0}'")]
    InvalidCurrency(String),
}

/// ISO 4217 style currency code, always upper case (e.g. "USD", "PLN").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Currency(code.to_ascii_uppercase()))
        } else {
            Err(MoneyError::InvalidCurrency(s.to_string()))
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of fiat money.
///
/// The currency is optional only for the zero seed used when summing: adding a
/// currency-less value to a value with a currency adopts that currency. Adding
/// or subtracting two values of different currencies is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatValue {
    pub amount: Decimal,
    pub currency: Option<Currency>,
}

impl FiatValue {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        FiatValue {
            amount,
            currency: Some(currency),
        }
    }

    pub fn zero() -> Self {
        FiatValue {
            amount: Decimal::ZERO,
            currency: None,
        }
    }

    pub fn checked_add(&self, other: &FiatValue) -> Result<FiatValue, MoneyError> {
        let currency = self.common_currency(other)?;
        Ok(FiatValue {
            amount: self.amount + other.amount,
            currency,
        })
    }

    pub fn checked_sub(&self, other: &FiatValue) -> Result<FiatValue, MoneyError> {
        let currency = self.common_currency(other)?;
        Ok(FiatValue {
            amount: self.amount - other.amount,
            currency,
        })
    }

    fn common_currency(&self, other: &FiatValue) -> Result<Option<Currency>, MoneyError> {
        match (&self.currency, &other.currency) {
            (Some(left), Some(right)) if left != right => Err(MoneyError::CurrencyMismatch {
                left: left.clone(),
                right: right.clone(),
            }),
            (Some(c), _) | (None, Some(c)) => Ok(Some(c.clone())),
            (None, None) => Ok(None),
        }
    }
}

impl Mul<Decimal> for &FiatValue {
    type Output = FiatValue;

    fn mul(self, ratio: Decimal) -> FiatValue {
        FiatValue {
            amount: self.amount * ratio,
            currency: self.currency.clone(),
        }
    }
}

impl Mul<Decimal> for FiatValue {
    type Output = FiatValue;

    fn mul(self, ratio: Decimal) -> FiatValue {
        &self * ratio
    }
}

impl fmt::Display for FiatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.currency {
            Some(currency) => write!(f, "{} {}", self.amount.round_dp(2), currency),
            None => write!(f, "{}", self.amount.round_dp(2)),
        }
    }
}

#[cfg(test)]
pub(crate) fn money(amount: Decimal, code: &str) -> FiatValue {
    FiatValue::new(amount, code.parse().unwrap())
}
