use crate::money::{FiatValue, MoneyError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Income and cost accumulated for one tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearTotals {
    pub income: FiatValue,
    pub cost: FiatValue,
}

impl Default for YearTotals {
    fn default() -> Self {
        YearTotals {
            income: FiatValue::zero(),
            cost: FiatValue::zero(),
        }
    }
}

impl YearTotals {
    pub fn profit(&self) -> Result<FiatValue, MoneyError> {
        self.income.checked_sub(&self.cost)
    }
}

/// Realized income and cost per tax year.
///
/// Years appear on first touch and are never removed. Both raw figures stay
/// queryable; profit is derived at read time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct YearlyProfit {
    years: BTreeMap<i32, YearTotals>,
}

impl YearlyProfit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_income(&mut self, year: i32, value: &FiatValue) -> Result<(), MoneyError> {
        let totals = self.years.entry(year).or_default();
        totals.income = totals.income.checked_add(value)?;
        Ok(())
    }

    pub fn add_cost(&mut self, year: i32, value: &FiatValue) -> Result<(), MoneyError> {
        let totals = self.years.entry(year).or_default();
        totals.cost = totals.cost.checked_add(value)?;
        Ok(())
    }

    pub fn get(&self, year: i32) -> Option<&YearTotals> {
        self.years.get(&year)
    }

    pub fn income(&self, year: i32) -> Option<&FiatValue> {
        self.get(year).map(|t| &t.income)
    }

    pub fn cost(&self, year: i32) -> Option<&FiatValue> {
        self.get(year).map(|t| &t.cost)
    }

    pub fn profit(&self, year: i32) -> Option<Result<FiatValue, MoneyError>> {
        self.get(year).map(YearTotals::profit)
    }

    /// Years with at least one sell, ascending
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &YearTotals)> {
        self.years.iter().map(|(year, totals)| (*year, totals))
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}
