use crate::asset::AssetValue;
use crate::transaction::Transaction;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Raised when a lot is requested from a queue that has none left.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("lot queue is empty")]
pub struct EmptyLotQueue;

/// Unconsumed purchase lots of one asset, oldest first.
///
/// Holds exactly the bought quantity that has not yet been matched against a
/// sell. Only the head is ever consumed.
#[derive(Debug, Clone, Default)]
pub struct LotQueue {
    lots: VecDeque<Transaction>,
}

impl LotQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a purchase lot at the tail
    pub fn append(&mut self, lot: Transaction) {
        self.lots.push_back(lot);
    }

    /// Oldest lot still open
    pub fn head(&self) -> Result<&Transaction, EmptyLotQueue> {
        self.lots.front().ok_or(EmptyLotQueue)
    }

    /// Remove the oldest lot once it has been fully consumed
    pub fn pop_head(&mut self) -> Result<Transaction, EmptyLotQueue> {
        self.lots.pop_front().ok_or(EmptyLotQueue)
    }

    /// Shrink the oldest lot to `remainder` after a partial sale.
    ///
    /// The old head is popped and a new lot with the same date and the reduced
    /// quantity is pushed back to the front. Its cash value is scaled by the
    /// same proportion, so the per-unit cost of the lot is unchanged.
    ///
    /// The lot's total cost is therefore not kept as bought: the remainder
    /// only carries the cost of the shares still open. Keeping the full total
    /// would charge the sold part again when the remainder is sold.
    pub fn replace_head(&mut self, remainder: AssetValue) -> Result<(), EmptyLotQueue> {
        let head = self.pop_head()?;
        let fiat_value = if head.asset.amount.is_zero() {
            head.fiat_value
        } else {
            &head.fiat_value * (remainder.amount / head.asset.amount)
        };
        log::debug!(
            "Lot {} reduced from {} to {}",
            head.date,
            head.asset,
            remainder
        );
        self.lots.push_front(Transaction {
            asset: remainder,
            fiat_value,
            ..head
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Sum of the quantities of all open lots
    pub fn total_quantity(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.asset.amount).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.lots.iter()
    }
}
