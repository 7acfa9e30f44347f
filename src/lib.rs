//! Realized profit per tax year for stock trades, using FIFO cost basis.
//!
//! Buys are queued as lots; each sell consumes the oldest lots first (splitting
//! the last one if needed) and books its income and cost to the sell's year,
//! converted to the reporting currency through an [`Exchanger`].

pub mod asset;
pub mod calculator;
pub mod exchange;
pub mod lots;
pub mod money;
pub mod profit;
pub mod revolut;
pub mod transaction;

pub use asset::AssetValue;
pub use calculator::{CalculationError, PerStockProfitCalculator, EPSILON};
pub use exchange::{ExchangeError, Exchanger, PassThrough, RateTable};
pub use lots::{EmptyLotQueue, LotQueue};
pub use money::{Currency, FiatValue, MoneyError};
pub use profit::{YearTotals, YearlyProfit};
pub use transaction::{group_by_asset, Action, Transaction};
