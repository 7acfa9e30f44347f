//! Conversion of trade values into the reporting currency.

use crate::money::{Currency, FiatValue, MoneyError};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::str::FromStr;

/// Furthest back a rate may be published before the date it is used for.
/// Covers long holiday weekends.
pub const MAX_RATE_AGE_DAYS: i64 = 14;

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("no {currency} rate published in the {} days before {date}", MAX_RATE_AGE_DAYS)]
    MissingRate { currency: Currency, date: NaiveDate },
    #[error("invalid rate '{value}' for {currency} on {date}")]
    InvalidRate {
        currency: String,
        date: NaiveDate,
        value: String,
    },
    #[error(transparent)]
    Currency(#[from] MoneyError),
    #[error("failed to read rates: {0}")]
    Csv(#[from] csv::Error),
}

/// Converts a value as of a date into the reporting currency.
///
/// Implementations must be deterministic for a given date, amount and currency.
pub trait Exchanger {
    fn exchange(&self, date: NaiveDate, value: &FiatValue) -> Result<FiatValue, ExchangeError>;
}

impl<E: Exchanger + ?Sized> Exchanger for &E {
    fn exchange(&self, date: NaiveDate, value: &FiatValue) -> Result<FiatValue, ExchangeError> {
        (**self).exchange(date, value)
    }
}

/// Leaves values untouched, for inputs already in the reporting currency.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Exchanger for PassThrough {
    fn exchange(&self, _date: NaiveDate, value: &FiatValue) -> Result<FiatValue, ExchangeError> {
        Ok(value.clone())
    }
}

/// One row of a rates file: `date,currency,rate`
#[derive(Debug, Deserialize)]
struct RateRecord {
    date: NaiveDate,
    currency: String,
    /// Units of the reporting currency per one unit of `currency`
    rate: String,
}

/// Daily exchange rates into a single reporting currency.
///
/// A value dated D is converted with the latest rate published strictly
/// before D, which is how tax authorities usually require foreign trades to be
/// converted (previous business day).
#[derive(Debug, Clone)]
pub struct RateTable {
    target: Currency,
    rates: HashMap<Currency, BTreeMap<NaiveDate, Decimal>>,
}

impl RateTable {
    pub fn new(target: Currency) -> Self {
        RateTable {
            target,
            rates: HashMap::new(),
        }
    }

    pub fn target(&self) -> &Currency {
        &self.target
    }

    pub fn insert(&mut self, currency: Currency, date: NaiveDate, rate: Decimal) {
        self.rates.entry(currency).or_default().insert(date, rate);
    }

    pub fn read_csv<R: Read>(reader: R, target: Currency) -> Result<Self, ExchangeError> {
        let mut table = RateTable::new(target);
        let mut rdr = csv::Reader::from_reader(reader);
        for result in rdr.deserialize() {
            let record: RateRecord = result?;
            let rate = Decimal::from_str(record.rate.trim()).map_err(|_| {
                ExchangeError::InvalidRate {
                    currency: record.currency.clone(),
                    date: record.date,
                    value: record.rate.clone(),
                }
            })?;
            let currency: Currency = record.currency.parse()?;
            table.insert(currency, record.date, rate);
        }
        log::debug!(
            "Loaded rates for {} currencies into {}",
            table.rates.len(),
            table.target
        );
        Ok(table)
    }

    /// Latest rate published before `date`, within [`MAX_RATE_AGE_DAYS`]
    pub fn rate_before(&self, currency: &Currency, date: NaiveDate) -> Option<(NaiveDate, Decimal)> {
        let oldest = date - Duration::days(MAX_RATE_AGE_DAYS);
        self.rates
            .get(currency)?
            .range(oldest..date)
            .next_back()
            .map(|(d, r)| (*d, *r))
    }
}

impl Exchanger for RateTable {
    fn exchange(&self, date: NaiveDate, value: &FiatValue) -> Result<FiatValue, ExchangeError> {
        let currency = match &value.currency {
            Some(c) if *c != self.target => c,
            _ => return Ok(value.clone()),
        };
        let (rate_date, rate) =
            self.rate_before(currency, date)
                .ok_or_else(|| ExchangeError::MissingRate {
                    currency: currency.clone(),
                    date,
                })?;
        log::trace!("{} {} -> {} at {} ({})", date, value, self.target, rate, rate_date);
        Ok(FiatValue::new(value.amount * rate, self.target.clone()))
    }
}
