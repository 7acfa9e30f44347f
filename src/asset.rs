use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;

/// A quantity of one instrument, identified by its ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetValue {
    pub amount: Decimal,
    pub asset_name: String,
}

impl AssetValue {
    pub fn new(amount: Decimal, asset_name: impl Into<String>) -> Self {
        AssetValue {
            amount,
            asset_name: asset_name.into(),
        }
    }
}

impl Mul<Decimal> for &AssetValue {
    type Output = AssetValue;

    fn mul(self, ratio: Decimal) -> AssetValue {
        AssetValue {
            amount: self.amount * ratio,
            asset_name: self.asset_name.clone(),
        }
    }
}

impl fmt::Display for AssetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.normalize(), self.asset_name)
    }
}
