//! Per-asset FIFO inventories of open tax lots.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal as RustDecimal;

use crate::domain::{Category, Currency, Decimal};

use super::TaxError;

/// A remaining quantity at or below this is a fully consumed lot.
fn qty_epsilon() -> Decimal {
    Decimal::new(RustDecimal::new(1, 8)) // 1e-8
}

/// Holding-period rule: a consumption is taxable when disposed less than
/// 365 days after acquisition. Exactly 365 days elapsed counts as exempt.
pub fn is_taxable(acquired_at: DateTime<Utc>, disposed_at: DateTime<Utc>) -> bool {
    disposed_at - acquired_at < Duration::days(365)
}

/// An acquired quantity of one asset awaiting disposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub qty: Decimal,
    /// Unit acquisition price in the lot's native quote unit.
    pub unit_cost: Decimal,
    pub acquired_at: DateTime<Utc>,
    pub category: Category,
}

/// One FIFO match between a disposal and an open lot.
#[derive(Debug, Clone, PartialEq)]
pub struct Consumption {
    pub qty: Decimal,
    pub unit_cost: Decimal,
    pub acquired_at: DateTime<Utc>,
    pub category: Category,
}

/// Mapping from asset to its FIFO queue of open lots.
///
/// Owned exclusively by one calculation run. Callers must feed events in
/// ascending time order; the pool appends and never re-sorts.
#[derive(Debug, Default)]
pub struct LotPool {
    pools: HashMap<Currency, VecDeque<Lot>>,
}

impl LotPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new lot to the asset's queue. A non-positive quantity is a
    /// no-op.
    pub fn acquire(
        &mut self,
        asset: &Currency,
        qty: Decimal,
        unit_cost: Decimal,
        acquired_at: DateTime<Utc>,
        category: Category,
    ) {
        if !qty.is_positive() {
            return;
        }
        self.pools.entry(asset.clone()).or_default().push_back(Lot {
            qty,
            unit_cost,
            acquired_at,
            category,
        });
    }

    /// Consume `qty` of `asset` from the oldest lots first.
    ///
    /// Each partial or total lot consumption yields one [`Consumption`]
    /// carrying the matched lot's cost basis, acquisition time, and category.
    /// The realized value stays in the native quote unit; fiat conversion is
    /// the caller's job.
    ///
    /// # Errors
    /// [`TaxError::InsufficientInventory`] if the open lots cannot cover
    /// `qty`; the pool is left unmodified in that case.
    pub fn dispose(
        &mut self,
        asset: &Currency,
        qty: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Vec<Consumption>, TaxError> {
        if !qty.is_positive() {
            return Ok(Vec::new());
        }

        let eps = qty_epsilon();
        let lots = self.pools.entry(asset.clone()).or_default();

        let available = lots.iter().fold(Decimal::zero(), |acc, lot| acc + lot.qty);
        if qty > available + eps {
            return Err(TaxError::InsufficientInventory {
                asset: asset.clone(),
                requested: qty,
                available,
                at,
            });
        }

        let mut consumed = Vec::new();
        let mut remaining = qty;
        while remaining > eps {
            let lot = match lots.front_mut() {
                Some(lot) => lot,
                None => break,
            };
            let take = remaining.min(lot.qty);
            consumed.push(Consumption {
                qty: take,
                unit_cost: lot.unit_cost,
                acquired_at: lot.acquired_at,
                category: lot.category,
            });
            lot.qty = lot.qty - take;
            remaining = remaining - take;
            if lot.qty <= eps {
                lots.pop_front();
            }
        }

        Ok(consumed)
    }

    /// Total open quantity for an asset.
    pub fn open_qty(&self, asset: &Currency) -> Decimal {
        self.pools
            .get(asset)
            .map(|lots| lots.iter().fold(Decimal::zero(), |acc, lot| acc + lot.qty))
            .unwrap_or_else(Decimal::zero)
    }

    /// Number of open lots for an asset.
    pub fn open_lots(&self, asset: &Currency) -> usize {
        self.pools.get(asset).map_or(0, VecDeque::len)
    }
}
