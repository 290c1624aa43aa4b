//! Pure tax computation engine.
//!
//! Everything in here is synchronous and operates on data already
//! materialized in memory by the storage collaborator. All mutable state
//! (lot pool, aggregator, rate cache) is local to one calculation run and
//! discarded on completion or failure, so concurrent runs need no locking.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Category, Currency, Decimal, InvalidCurrency, UnresolvableSymbol};

pub mod aggregate;
pub mod calculator;
pub mod lot_pool;
pub mod rates;
pub mod timeline;

pub use aggregate::YearlyAggregator;
pub use calculator::TaxCalculator;
pub use lot_pool::{Consumption, Lot, LotPool};
pub use rates::{PriceTable, RateResolver};
pub use timeline::{merge_timeline, TaxEvent};

/// Failure kinds that abort a calculation run. No partial results survive
/// any of these; retries, if any, belong to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaxError {
    #[error("no {fiat} price for {coin} around {at}")]
    MissingPriceData {
        coin: Currency,
        fiat: Currency,
        at: DateTime<Utc>,
    },

    #[error(
        "closest {fiat} price for {coin} at {closest} is {distance_secs}s away \
         from {at}, beyond the 12h tolerance"
    )]
    StalePriceData {
        coin: Currency,
        fiat: Currency,
        at: DateTime<Utc>,
        closest: DateTime<Utc>,
        distance_secs: i64,
    },

    #[error("cannot dispose {requested} {asset} at {at}: only {available} acquired")]
    InsufficientInventory {
        asset: Currency,
        requested: Decimal,
        available: Decimal,
        at: DateTime<Utc>,
    },

    #[error(transparent)]
    UnresolvableSymbol(#[from] UnresolvableSymbol),

    #[error("invalid range: end {end} precedes start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(transparent)]
    InvalidCurrency(#[from] InvalidCurrency),
}

/// An immutable record of a realized gain/loss or fee, kept both for
/// aggregation and for detailed audit/export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RealizationEvent {
    Pnl {
        asset: Currency,
        qty: Decimal,
        quote: Currency,
        open_ts: DateTime<Utc>,
        close_ts: DateTime<Utc>,
        open_price: Option<Decimal>,
        close_price: Option<Decimal>,
        /// Signed: positive = gain, negative = loss.
        fiat_value: Decimal,
        taxable: bool,
        category: Category,
    },
    Fee {
        ts: DateTime<Utc>,
        /// Magnitude subtracted from net totals.
        fiat_fee: Decimal,
        category: Category,
    },
}

impl RealizationEvent {
    /// The instant this realization belongs to (close timestamp for pnl).
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RealizationEvent::Pnl { close_ts, .. } => *close_ts,
            RealizationEvent::Fee { ts, .. } => *ts,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            RealizationEvent::Pnl { category, .. } => *category,
            RealizationEvent::Fee { category, .. } => *category,
        }
    }
}

/// Per (year, category) running sums. All fields are non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub gains: Decimal,
    pub losses: Decimal,
    pub taxable_gains: Decimal,
    pub taxable_losses: Decimal,
    pub fees: Decimal,
}

/// Final output of one calculation run.
///
/// BTreeMaps keep year and category iteration deterministic, so identical
/// inputs serialize to byte-identical reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxReport {
    pub by_year: BTreeMap<i32, BTreeMap<Category, CategoryTotals>>,
    pub events_by_year: BTreeMap<i32, BTreeMap<Category, Vec<RealizationEvent>>>,
}
