//! Import of Revolut stock account statements (CSV export).

use crate::asset::AssetValue;
use crate::money::{Currency, FiatValue, MoneyError};
use crate::transaction::{Action, Transaction};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use fifotax_derive::CsvColumns;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("row {row}: invalid amount '{value}'")]
    InvalidAmount { row: usize, value: String },
    #[error("row {row}: invalid quantity '{value}'")]
    InvalidQuantity { row: usize, value: String },
    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: {kind} without a ticker")]
    MissingTicker { row: usize, kind: OperationType },
    #[error("row {row}: {source}")]
    Currency { row: usize, source: MoneyError },
    #[error("failed to read statement: {0}")]
    Csv(#[from] csv::Error),
}

/// Column description generated from [`StatementRow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvColumn {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Operation types found in a statement. Only trades feed the calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationType {
    Buy,
    Sell,
    Dividend,
    CustodyFee,
    StockSplit,
    Other(String),
}

impl OperationType {
    pub fn action(&self) -> Option<Action> {
        match self {
            OperationType::Buy => Some(Action::Buy),
            OperationType::Sell => Some(Action::Sell),
            _ => None,
        }
    }
}

impl FromStr for OperationType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = s.trim().to_ascii_uppercase();
        Ok(match kind.as_str() {
            "BUY - MARKET" | "BUY - LIMIT" | "BUY - STOP" => OperationType::Buy,
            "SELL - MARKET" | "SELL - LIMIT" | "SELL - STOP" => OperationType::Sell,
            "DIVIDEND" => OperationType::Dividend,
            "CUSTODY FEE" => OperationType::CustodyFee,
            "STOCK SPLIT" => OperationType::StockSplit,
            _ => OperationType::Other(s.trim().to_string()),
        })
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Buy => f.write_str("BUY"),
            OperationType::Sell => f.write_str("SELL"),
            OperationType::Dividend => f.write_str("DIVIDEND"),
            OperationType::CustodyFee => f.write_str("CUSTODY FEE"),
            OperationType::StockSplit => f.write_str("STOCK SPLIT"),
            OperationType::Other(kind) => f.write_str(kind),
        }
    }
}

/// One row of a Revolut stock statement
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, CsvColumns)]
pub struct StatementRow {
    /// Timestamp of the operation (RFC3339 or YYYY-MM-DD)
    #[serde(rename = "Date")]
    pub date: String,
    /// Instrument ticker, empty for cash operations
    #[serde(rename = "Ticker", default)]
    pub ticker: Option<String>,
    /// Operation, e.g. "BUY - MARKET", "SELL - MARKET", "DIVIDEND"
    #[serde(rename = "Type")]
    pub kind: String,
    /// Number of shares
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<String>,
    /// Price of one share in the trade currency. Informational, the total
    /// amount is what gets booked.
    #[serde(rename = "Price per share", default)]
    pub price_per_share: Option<String>,
    /// Total cash value of the operation, e.g. "-$1,003.01"
    #[serde(rename = "Total Amount")]
    pub total_amount: String,
    /// Trade currency code
    #[serde(rename = "Currency")]
    pub currency: String,
    /// Broker FX rate to the account base currency. Informational, rates
    /// come from the rates file.
    #[serde(rename = "FX Rate", default)]
    pub fx_rate: Option<String>,
}

impl StatementRow {
    /// Convert to a trade, `None` for rows that are not buys or sells
    pub fn to_transaction(&self, row: usize) -> Result<Option<Transaction>, ImportError> {
        Ok(self.to_timed_transaction(row)?.map(|(_, tx)| tx))
    }

    fn to_timed_transaction(
        &self,
        row: usize,
    ) -> Result<Option<(NaiveDateTime, Transaction)>, ImportError> {
        let kind: OperationType = match self.kind.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        };
        let Some(action) = kind.action() else {
            log::debug!("Skipping row {} ({}): not a trade", row, kind);
            return Ok(None);
        };

        let ticker = self
            .ticker
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ImportError::MissingTicker {
                row,
                kind: kind.clone(),
            })?;
        let quantity_str = self.quantity.as_deref().unwrap_or_default();
        let quantity = parse_quantity(quantity_str).ok_or_else(|| ImportError::InvalidQuantity {
            row,
            value: quantity_str.to_string(),
        })?;
        let amount = parse_amount(&self.total_amount).ok_or_else(|| ImportError::InvalidAmount {
            row,
            value: self.total_amount.clone(),
        })?;
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|source| ImportError::Currency { row, source })?;
        let timestamp = parse_timestamp(&self.date).ok_or_else(|| ImportError::InvalidDate {
            row,
            value: self.date.clone(),
        })?;

        let tx = Transaction::new(
            AssetValue::new(quantity, ticker),
            FiatValue::new(amount, currency),
            action,
            timestamp.date(),
        );
        Ok(Some((timestamp, tx)))
    }
}

/// Read buy and sell trades from a statement, oldest first.
///
/// Rows are ordered by their full timestamp. Rows with the same timestamp,
/// or plain dates on the same day, keep their statement order.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Transaction>, ImportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut timed = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let record: StatementRow = result?;
        // header is line 1
        if let Some((timestamp, tx)) = record.to_timed_transaction(index + 2)? {
            log::debug!("Parsed transaction: {}", tx);
            timed.push((timestamp, tx));
        }
    }
    timed.sort_by_key(|(timestamp, _)| *timestamp);
    Ok(timed.into_iter().map(|(_, tx)| tx).collect())
}

/// Absolute value of a statement amount such as "-$1,003.01" or "€250"
fn parse_amount(s: &str) -> Option<Decimal> {
    let digits = s
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.')
        .replace(',', "");
    let digits = digits.trim();
    // ".50" has no integer part
    let digits = match digits.strip_prefix('.') {
        Some(fraction) => format!("0.{}", fraction),
        None => digits.to_string(),
    };
    Decimal::from_str(&digits).ok().map(|d| d.abs())
}

fn parse_quantity(s: &str) -> Option<Decimal> {
    let quantity = Decimal::from_str(s.trim()).ok()?;
    (quantity > Decimal::ZERO).then_some(quantity)
}

/// Wall-clock time of the operation, midnight for plain dates
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::money;
    use crate::transaction::test_helpers::date;
    use rust_decimal_macros::dec;

    const STATEMENT: &str = "\
Date,Ticker,Type,Quantity,Price per share,Total Amount,Currency,FX Rate
2021-03-01T10:00:00.000Z,,CASH TOP-UP,,,\"$2,000\",USD,1.0
2021-03-02T14:30:05.120Z,AAPL,BUY - MARKET,10,$120.50,\"$1,205\",USD,1.0
2021-03-05T09:12:00Z,AAPL,DIVIDEND,,,$2.05,USD,1.0
2021-03-01T16:00:00Z,TSLA,BUY - LIMIT,1.5,$600,$900,USD,1.0
2021-06-10T14:30:00Z,AAPL,SELL - MARKET,4,$130,-$520.00,USD,1.0
2021-07-01T00:00:00Z,TSLA,STOCK SPLIT,3,,$0,USD,1.0
";

    #[test]
    fn reads_trades_and_skips_the_rest() {
        let txs = read_csv(STATEMENT.as_bytes()).unwrap();

        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].asset, AssetValue::new(dec!(1.5), "TSLA"));
        assert_eq!(txs[0].date, date("2021-03-01"));

        assert_eq!(txs[1].action, Action::Buy);
        assert_eq!(txs[1].fiat_value, money(dec!(1205), "USD"));

        assert_eq!(txs[2].action, Action::Sell);
        assert_eq!(txs[2].asset, AssetValue::new(dec!(4), "AAPL"));
        assert_eq!(txs[2].fiat_value, money(dec!(520), "USD"));
        assert_eq!(txs[2].date, date("2021-06-10"));
    }

    #[test]
    fn amounts_drop_sign_symbol_and_separators() {
        assert_eq!(parse_amount("-$1,003.01"), Some(dec!(1003.01)));
        assert_eq!(parse_amount("€250"), Some(dec!(250)));
        assert_eq!(parse_amount("PLN 12.5"), Some(dec!(12.5)));
        assert_eq!(parse_amount("$"), None);
        assert_eq!(parse_amount("$.50"), Some(dec!(0.50)));
        assert_eq!(parse_amount("-$.05"), Some(dec!(0.05)));
        assert_eq!(parse_amount("-$0.50"), Some(dec!(0.50)));
    }

    #[test]
    fn dates_accept_timestamps_and_plain_dates() {
        let day = |s: &str| parse_timestamp(s).map(|t| t.date());
        assert_eq!(day("2021-03-02T14:30:05.120Z"), Some(date("2021-03-02")));
        assert_eq!(day("2021-03-02 23:59:59"), Some(date("2021-03-02")));
        assert_eq!(day("2021-03-02"), Some(date("2021-03-02")));
        assert_eq!(day("02/03/2021"), None);

        assert!(parse_timestamp("2021-03-02 10:00:00") < parse_timestamp("2021-03-02 15:00:00"));
        assert_eq!(
            parse_timestamp("2021-03-02"),
            parse_timestamp("2021-03-02 00:00:00")
        );
    }

    #[test]
    fn same_day_trades_follow_their_time() {
        let data = "\
Date,Ticker,Type,Quantity,Price per share,Total Amount,Currency,FX Rate
2021-03-02T15:00:00Z,AAPL,SELL - MARKET,1,$130,-$130,USD,1.0
2021-03-02T10:00:00Z,AAPL,BUY - MARKET,1,$120,$120,USD,1.0
";
        let txs = read_csv(data.as_bytes()).unwrap();
        let actions: Vec<_> = txs.iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![Action::Buy, Action::Sell]);
        assert!(txs.iter().all(|t| t.date == date("2021-03-02")));

        let profit = crate::PerStockProfitCalculator::new(crate::PassThrough)
            .calculate_cost_and_income(&txs)
            .unwrap();
        assert_eq!(profit.profit(2021), Some(Ok(money(dec!(10), "USD"))));
    }

    #[test]
    fn plain_dates_on_the_same_day_keep_statement_order() {
        let data = "\
Date,Ticker,Type,Quantity,Price per share,Total Amount,Currency,FX Rate
2021-03-02,AAPL,BUY - MARKET,1,$120,$120,USD,1.0
2021-03-02,AAPL,SELL - MARKET,1,$130,-$130,USD,1.0
";
        let txs = read_csv(data.as_bytes()).unwrap();
        let actions: Vec<_> = txs.iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![Action::Buy, Action::Sell]);
    }

    #[test]
    fn operation_types() {
        assert_eq!("SELL - MARKET".parse::<OperationType>(), Ok(OperationType::Sell));
        assert_eq!("buy - market".parse::<OperationType>(), Ok(OperationType::Buy));
        assert_eq!("CUSTODY FEE".parse::<OperationType>(), Ok(OperationType::CustodyFee));
        assert_eq!(
            "CASH TOP-UP".parse::<OperationType>(),
            Ok(OperationType::Other("CASH TOP-UP".to_string()))
        );
        assert_eq!(OperationType::Dividend.action(), None);
    }

    #[test]
    fn bad_trade_rows_report_their_line() {
        let data = "\
Date,Ticker,Type,Quantity,Price per share,Total Amount,Currency,FX Rate
2021-03-02,AAPL,BUY - MARKET,10,$120.50,$1205,USD,1.0
2021-03-03,AAPL,SELL - MARKET,abc,$120.50,$1205,USD,1.0
";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidQuantity { row: 3, .. }));

        let data = "\
Date,Ticker,Type,Quantity,Price per share,Total Amount,Currency,FX Rate
2021-03-02,,BUY - MARKET,10,$120.50,$1205,USD,1.0
";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingTicker { row: 2, .. }));
    }

    #[test]
    fn columns_follow_serde_names() {
        let columns = StatementRow::csv_columns();
        let names: Vec<_> = columns.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "Date",
                "Ticker",
                "Type",
                "Quantity",
                "Price per share",
                "Total Amount",
                "Currency",
                "FX Rate"
            ]
        );
        assert!(columns[0].required);
        assert!(!columns[1].required);
        assert_eq!(columns[6].description, "Trade currency code");
        assert_eq!(
            columns[7].description,
            "Broker FX rate to the account base currency. Informational, rates come from the rates file."
        );
    }
}
