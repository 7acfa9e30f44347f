//! FIFO matching of sells against purchase lots for a single stock.
//!
//! Every sell is costed by consuming the oldest open lots first:
//! 1. A lot whose quantity fits in what is left to cover is consumed whole and
//!    valued at its own purchase date.
//! 2. A lot larger than what is left is consumed in part, valued at the sell
//!    date, and stays at the head of the queue with the remaining quantity.
//!
//! Income and cost are both booked to the sell's tax year.

use crate::exchange::{ExchangeError, Exchanger};
use crate::lots::LotQueue;
use crate::money::{FiatValue, MoneyError};
use crate::profit::YearlyProfit;
use crate::transaction::{Action, Transaction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Quantity below which a remainder is treated as rounding drift
pub const EPSILON: Decimal = dec!(0.00000001);

#[derive(Debug, thiserror::Error)]
pub enum CalculationError {
    #[error("not enough {asset} lots to cover sell on {date}: {unmatched} left unmatched")]
    EmptyLotQueue {
        asset: String,
        date: NaiveDate,
        unmatched: Decimal,
    },
    #[error("transactions mix assets: expected {expected}, found {found}")]
    MismatchedAsset { expected: String, found: String },
    #[error(transparent)]
    CurrencyMismatch(#[from] MoneyError),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// Realized profit calculator for one stock's transaction history
pub struct PerStockProfitCalculator<E> {
    exchanger: E,
}

impl<E: Exchanger> PerStockProfitCalculator<E> {
    pub fn new(exchanger: E) -> Self {
        PerStockProfitCalculator { exchanger }
    }

    /// Income and cost per tax year for `transactions`.
    ///
    /// Transactions must belong to one asset and be sorted ascending by date;
    /// they are processed in the order given.
    pub fn calculate_cost_and_income(
        &self,
        transactions: &[Transaction],
    ) -> Result<YearlyProfit, CalculationError> {
        self.calculate_with_open_lots(transactions)
            .map(|(profit, _)| profit)
    }

    /// Like [`Self::calculate_cost_and_income`], also returning the lots left
    /// unmatched after the last sell.
    pub fn calculate_with_open_lots(
        &self,
        transactions: &[Transaction],
    ) -> Result<(YearlyProfit, LotQueue), CalculationError> {
        let mut queue = LotQueue::new();
        let mut profit = YearlyProfit::new();

        let Some(asset) = asset_name(transactions)? else {
            return Ok((profit, queue));
        };

        log::info!("Calculating cost and income for stock: {}", asset);
        log::info!("Number of transactions: {}", transactions.len());

        for transaction in transactions {
            if transaction.action == Action::Buy {
                queue.append(transaction.clone());
                continue;
            }

            let cost = self.cost_of_sell(&mut queue, transaction)?;
            let income = self
                .exchanger
                .exchange(transaction.date, &transaction.fiat_value)?;
            log::debug!(
                "Sell {}: cost = {}, income = {}",
                transaction,
                cost,
                income
            );

            profit.add_income(transaction.year(), &income)?;
            profit.add_cost(transaction.year(), &cost)?;
        }

        Ok((profit, queue))
    }

    fn cost_of_sell(
        &self,
        queue: &mut LotQueue,
        sell: &Transaction,
    ) -> Result<FiatValue, CalculationError> {
        let insufficient = |unmatched| CalculationError::EmptyLotQueue {
            asset: sell.asset.asset_name.clone(),
            date: sell.date,
            unmatched,
        };
        let mut remaining = sell.asset.amount;
        let mut cost = FiatValue::zero();

        while remaining > EPSILON {
            let lot = queue.head().map_err(|_| insufficient(remaining))?;
            let lot_quantity = lot.asset.amount;

            if lot_quantity <= remaining + EPSILON {
                let lot_cost = self.exchanger.exchange(lot.date, &lot.fiat_value)?;
                log::debug!("Consumed whole lot {} at cost {}", lot, lot_cost);
                cost = cost.checked_add(&lot_cost)?;
                remaining -= lot_quantity;
                queue.pop_head().map_err(|_| insufficient(remaining))?;
            } else {
                let fraction = remaining / lot_quantity;
                // Partial lots are valued at the sell date, not the lot date
                let lot_cost = self.exchanger.exchange(sell.date, &lot.fiat_value)? * fraction;
                log::debug!("Consumed {} of lot {} at cost {}", remaining, lot, lot_cost);
                cost = cost.checked_add(&lot_cost)?;
                let remainder = &lot.asset * (Decimal::ONE - fraction);
                queue
                    .replace_head(remainder)
                    .map_err(|_| insufficient(remaining))?;
                remaining = Decimal::ZERO;
            }
        }

        Ok(cost)
    }
}

/// The single asset all transactions refer to, `None` for an empty list
fn asset_name(transactions: &[Transaction]) -> Result<Option<&str>, CalculationError> {
    let Some(first) = transactions.first() else {
        return Ok(None);
    };
    let expected = first.asset.asset_name.as_str();
    if let Some(other) = transactions
        .iter()
        .find(|t| t.asset.asset_name != expected)
    {
        return Err(CalculationError::MismatchedAsset {
            expected: expected.to_string(),
            found: other.asset.asset_name.clone(),
        });
    }
    Ok(Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetValue;
    use crate::exchange::PassThrough;
    use crate::money::money;
    use crate::transaction::test_helpers::*;

    /// Values every amount at a fixed per-date multiplier, so tests can tell
    /// which date a conversion used.
    struct DatedRates(Vec<(NaiveDate, Decimal)>);

    impl Exchanger for DatedRates {
        fn exchange(&self, date: NaiveDate, value: &FiatValue) -> Result<FiatValue, ExchangeError> {
            let rate = self
                .0
                .iter()
                .find(|(d, _)| *d == date)
                .map(|(_, r)| *r)
                .unwrap_or(Decimal::ONE);
            Ok(money(value.amount * rate, "PLN"))
        }
    }

    fn calc() -> PerStockProfitCalculator<PassThrough> {
        PerStockProfitCalculator::new(PassThrough)
    }

    #[test]
    fn whole_lot_sell() {
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(10), dec!(100)),
            sell("2021-06-01", "AAPL", dec!(10), dec!(150)),
        ];
        let (profit, open) = calc().calculate_with_open_lots(&txs).unwrap();

        assert_eq!(profit.income(2021), Some(&money(dec!(150), "USD")));
        assert_eq!(profit.cost(2021), Some(&money(dec!(100), "USD")));
        assert_eq!(profit.profit(2021), Some(Ok(money(dec!(50), "USD"))));
        assert!(open.is_empty());
    }

    #[test]
    fn sell_spanning_two_lots_leaves_remainder_at_head() {
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(10), dec!(100)),
            buy("2021-03-01", "AAPL", dec!(10), dec!(300)),
            sell("2021-06-01", "AAPL", dec!(15), dec!(400)),
        ];
        let (profit, open) = calc().calculate_with_open_lots(&txs).unwrap();

        assert_eq!(profit.cost(2021), Some(&money(dec!(250), "USD")));
        assert_eq!(profit.income(2021), Some(&money(dec!(400), "USD")));
        assert_eq!(profit.profit(2021), Some(Ok(money(dec!(150), "USD"))));

        assert_eq!(open.len(), 1);
        let head = open.head().unwrap();
        assert_eq!(head.date, date("2021-03-01"));
        assert_eq!(head.asset, AssetValue::new(dec!(5), "AAPL"));
    }

    #[test]
    fn cost_is_booked_in_sell_year() {
        let txs = vec![
            buy("2020-01-01", "AAPL", dec!(5), dec!(50)),
            sell("2022-01-01", "AAPL", dec!(5), dec!(80)),
        ];
        let profit = calc().calculate_cost_and_income(&txs).unwrap();

        assert_eq!(profit.years().collect::<Vec<_>>(), vec![2022]);
        assert_eq!(profit.cost(2022), Some(&money(dec!(50), "USD")));
        assert!(profit.get(2020).is_none());
    }

    #[test]
    fn sell_without_lots_fails() {
        let txs = vec![sell("2021-01-01", "AAPL", dec!(5), dec!(80))];
        let err = calc().calculate_cost_and_income(&txs).unwrap_err();

        match err {
            CalculationError::EmptyLotQueue {
                asset, unmatched, ..
            } => {
                assert_eq!(asset, "AAPL");
                assert_eq!(unmatched, dec!(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn oversold_position_fails() {
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(3), dec!(30)),
            sell("2021-02-01", "AAPL", dec!(5), dec!(80)),
        ];
        let err = calc().calculate_cost_and_income(&txs).unwrap_err();
        assert!(matches!(
            err,
            CalculationError::EmptyLotQueue { unmatched, .. } if unmatched == dec!(2)
        ));
    }

    #[test]
    fn mixed_assets_are_rejected() {
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(3), dec!(30)),
            sell("2021-02-01", "MSFT", dec!(3), dec!(80)),
        ];
        let err = calc().calculate_cost_and_income(&txs).unwrap_err();
        assert!(matches!(
            err,
            CalculationError::MismatchedAsset { ref expected, ref found }
                if expected == "AAPL" && found == "MSFT"
        ));
    }

    #[test]
    fn empty_history_has_no_years() {
        let profit = calc().calculate_cost_and_income(&[]).unwrap();
        assert!(profit.is_empty());
    }

    #[test]
    fn buys_only_book_nothing() {
        let txs = vec![buy("2021-01-01", "AAPL", dec!(3), dec!(30))];
        let (profit, open) = calc().calculate_with_open_lots(&txs).unwrap();
        assert!(profit.is_empty());
        assert_eq!(open.total_quantity(), dec!(3));
    }

    #[test]
    fn exact_lot_match_pops_lot() {
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(4), dec!(40)),
            buy("2021-01-02", "AAPL", dec!(6), dec!(90)),
            sell("2021-02-01", "AAPL", dec!(4), dec!(60)),
        ];
        let (profit, open) = calc().calculate_with_open_lots(&txs).unwrap();

        assert_eq!(profit.cost(2021), Some(&money(dec!(40), "USD")));
        assert_eq!(open.len(), 1);
        let head = open.head().unwrap();
        assert_eq!(head.date, date("2021-01-02"));
        assert_eq!(head.asset.amount, dec!(6));
        assert_eq!(head.fiat_value, money(dec!(90), "USD"));
    }

    #[test]
    fn drift_below_epsilon_consumes_whole_lot() {
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(1.000000005), dec!(100)),
            sell("2021-02-01", "AAPL", dec!(1), dec!(120)),
        ];
        let (profit, open) = calc().calculate_with_open_lots(&txs).unwrap();

        assert_eq!(profit.cost(2021), Some(&money(dec!(100), "USD")));
        assert!(open.is_empty());
    }

    #[test]
    fn fifo_order_survives_interleaved_buys() {
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(2), dec!(20)),
            sell("2021-01-10", "AAPL", dec!(1), dec!(15)),
            buy("2021-01-20", "AAPL", dec!(2), dec!(60)),
            sell("2021-02-01", "AAPL", dec!(2), dec!(70)),
        ];
        let (profit, open) = calc().calculate_with_open_lots(&txs).unwrap();

        // first sell: half of lot one (10); second: rest of lot one (10) + half of lot two (30)
        assert_eq!(profit.cost(2021), Some(&money(dec!(50), "USD")));
        assert_eq!(open.len(), 1);
        assert_eq!(open.head().unwrap().date, date("2021-01-20"));
        assert_eq!(open.total_quantity(), dec!(1));
    }

    #[test]
    fn whole_lots_use_buy_date_partial_lots_use_sell_date() {
        let rates = DatedRates(vec![
            (date("2021-01-01"), dec!(2)),
            (date("2021-03-01"), dec!(3)),
            (date("2021-06-01"), dec!(4)),
        ]);
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(10), dec!(100)),
            buy("2021-03-01", "AAPL", dec!(10), dec!(300)),
            sell("2021-06-01", "AAPL", dec!(15), dec!(400)),
        ];
        let profit = PerStockProfitCalculator::new(rates)
            .calculate_cost_and_income(&txs)
            .unwrap();

        // 100 * 2 for the whole first lot, 300 * 4 * 0.5 for half the second
        assert_eq!(profit.cost(2021), Some(&money(dec!(800), "PLN")));
        assert_eq!(profit.income(2021), Some(&money(dec!(1600), "PLN")));
    }

    #[test]
    fn mixed_currencies_without_conversion_fail() {
        let mut eur_sell = sell("2021-02-01", "AAPL", dec!(1), dec!(10));
        eur_sell.fiat_value = money(dec!(10), "EUR");
        let txs = vec![
            buy("2021-01-01", "AAPL", dec!(1), dec!(10)),
            buy("2021-01-02", "AAPL", dec!(1), dec!(10)),
            sell("2021-01-05", "AAPL", dec!(1), dec!(12)),
            eur_sell,
        ];
        let err = calc().calculate_cost_and_income(&txs).unwrap_err();
        assert!(matches!(err, CalculationError::CurrencyMismatch(_)));
    }
}
