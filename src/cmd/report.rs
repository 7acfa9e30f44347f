//! Report command - income, cost and profit per tax year for each stock

use crate::cmd::read_transactions;
use anyhow::Context;
use clap::Args;
use fifotax::{
    group_by_asset, Currency, Exchanger, FiatValue, PassThrough, PerStockProfitCalculator,
    RateTable, YearTotals,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Revolut stock statement (CSV). Reads from stdin if not specified.
    #[arg(short, long, default_value = "-")]
    file: PathBuf,

    /// Tax year to report (calendar year of the sells)
    #[arg(short, long)]
    year: Option<i32>,

    /// Only report this ticker (e.g., AAPL)
    #[arg(short, long)]
    ticker: Option<String>,

    /// Exchange rates CSV (date,currency,rate). Without it amounts are
    /// reported in their trade currency.
    #[arg(short, long)]
    rates: Option<PathBuf>,

    /// Reporting currency the rates convert into
    #[arg(short, long, default_value = "PLN")]
    currency: String,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let transactions = read_transactions(&self.file)?;
        let transactions: Vec<_> = match &self.ticker {
            Some(ticker) => transactions
                .into_iter()
                .filter(|t| t.asset.asset_name.eq_ignore_ascii_case(ticker))
                .collect(),
            None => transactions,
        };

        let exchanger: Box<dyn Exchanger> = match &self.rates {
            Some(path) => {
                let target: Currency = self.currency.parse()?;
                let file = File::open(path)
                    .with_context(|| format!("opening rates file {}", path.display()))?;
                Box::new(RateTable::read_csv(BufReader::new(file), target)?)
            }
            None => Box::new(PassThrough),
        };
        let calculator = PerStockProfitCalculator::new(exchanger.as_ref());

        let mut stocks = Vec::new();
        for (ticker, history) in group_by_asset(transactions) {
            let (profit, open_lots) = calculator
                .calculate_with_open_lots(&history)
                .with_context(|| format!("calculating profit for {}", ticker))?;
            let years = profit
                .iter()
                .filter(|(year, _)| self.year.is_none_or(|y| y == *year))
                .map(|(year, totals)| YearView::new(year, totals))
                .collect::<anyhow::Result<Vec<_>>>()?;
            stocks.push(StockView {
                ticker,
                years,
                open_quantity: open_lots.total_quantity(),
            });
        }

        let totals = total_by_year(&stocks)?;

        if self.json {
            let output = ReportOutput { stocks, totals };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_report(&stocks, &totals);
        }
        Ok(())
    }
}

fn total_by_year(stocks: &[StockView]) -> anyhow::Result<Vec<YearView>> {
    let mut totals: BTreeMap<i32, YearTotals> = BTreeMap::new();
    for view in stocks.iter().flat_map(|s| s.years.iter()) {
        let entry = totals.entry(view.year).or_default();
        entry.income = entry.income.checked_add(&view.income)?;
        entry.cost = entry.cost.checked_add(&view.cost)?;
    }
    totals
        .iter()
        .map(|(year, totals)| YearView::new(*year, totals))
        .collect()
}

fn print_report(stocks: &[StockView], totals: &[YearView]) {
    if stocks.iter().all(|s| s.years.is_empty()) {
        println!("No sells found matching filters");
    }

    for stock in stocks.iter().filter(|s| !s.years.is_empty()) {
        println!();
        println!("{}", stock.ticker);
        print_years(&stock.years);
        if !stock.open_quantity.is_zero() {
            println!("  Open position: {}", format_quantity(stock.open_quantity));
        }
    }

    if !totals.is_empty() {
        println!();
        println!("TOTAL");
        print_years(totals);
    }
}

fn print_years(years: &[YearView]) {
    let rows: Vec<YearRow> = years
        .iter()
        .map(|y| YearRow {
            year: y.year.to_string(),
            income: format_money(&y.income),
            cost: format_money(&y.cost),
            profit: format_money(&y.profit),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

fn format_money(value: &FiatValue) -> String {
    match &value.currency {
        Some(currency) => format!("{:.2} {}", value.amount, currency),
        None => format!("{:.2}", value.amount),
    }
}

fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, Serialize)]
struct YearView {
    year: i32,
    income: FiatValue,
    cost: FiatValue,
    profit: FiatValue,
}

impl YearView {
    fn new(year: i32, totals: &YearTotals) -> anyhow::Result<Self> {
        Ok(YearView {
            year,
            income: totals.income.clone(),
            cost: totals.cost.clone(),
            profit: totals.profit()?,
        })
    }
}

#[derive(Debug, Serialize)]
struct StockView {
    ticker: String,
    years: Vec<YearView>,
    open_quantity: Decimal,
}

#[derive(Debug, Serialize)]
struct ReportOutput {
    stocks: Vec<StockView>,
    totals: Vec<YearView>,
}

#[derive(Debug, Clone, Tabled)]
struct YearRow {
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Profit")]
    profit: String,
}
