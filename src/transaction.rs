use crate::asset::AssetValue;
use crate::money::FiatValue;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => f.write_str("BUY"),
            Action::Sell => f.write_str("SELL"),
        }
    }
}

/// A single buy or sell of one instrument.
///
/// `fiat_value` is the total cash value of the trade in the currency it
/// settled in, not a per-unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub asset: AssetValue,
    pub fiat_value: FiatValue,
    pub action: Action,
    pub date: NaiveDate,
}

impl Transaction {
    pub fn new(asset: AssetValue, fiat_value: FiatValue, action: Action, date: NaiveDate) -> Self {
        Transaction {
            asset,
            fiat_value,
            action,
            date,
        }
    }

    /// Tax year the transaction falls in (calendar year)
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} for {}",
            self.date, self.action, self.asset, self.fiat_value
        )
    }
}

/// Split a mixed history into one list per asset, in order of first
/// appearance. Each list keeps the relative order of its transactions.
pub fn group_by_asset(transactions: Vec<Transaction>) -> Vec<(String, Vec<Transaction>)> {
    let mut groups: Vec<(String, Vec<Transaction>)> = Vec::new();
    for tx in transactions {
        match groups
            .iter_mut()
            .find(|(name, _)| *name == tx.asset.asset_name)
        {
            Some((_, txs)) => txs.push(tx),
            None => groups.push((tx.asset.asset_name.clone(), vec![tx])),
        }
    }
    groups
}
