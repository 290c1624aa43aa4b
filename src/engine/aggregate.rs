//! Per-year, per-category accumulation of realized results.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use crate::domain::{Category, Decimal};

use super::{CategoryTotals, RealizationEvent, TaxReport};

/// Accumulates totals and the detailed event log for one calculation run.
///
/// Years are derived from each event's own timestamp, never from a run-wide
/// parameter. The event log preserves recording order, which is
/// chronological because the calculator walks the merged timeline.
#[derive(Debug, Default)]
pub struct YearlyAggregator {
    totals: BTreeMap<i32, BTreeMap<Category, CategoryTotals>>,
    events: BTreeMap<i32, BTreeMap<Category, Vec<RealizationEvent>>>,
}

impl YearlyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fiat fee to that year/category's total and log a fee event.
    pub fn record_fee(&mut self, category: Category, at: DateTime<Utc>, fiat_amount: Decimal) {
        let totals = self
            .totals
            .entry(at.year())
            .or_default()
            .entry(category)
            .or_default();
        totals.fees = totals.fees + fiat_amount;

        self.log_event(RealizationEvent::Fee {
            ts: at,
            fiat_fee: fiat_amount,
            category,
        });
    }

    /// Route a signed fiat amount into gains or losses, and into the taxable
    /// columns when `taxable` is set. Totals only; pnl events are logged
    /// separately via [`log_event`](Self::log_event).
    pub fn record_pnl(
        &mut self,
        category: Category,
        at: DateTime<Utc>,
        fiat_amount: Decimal,
        taxable: bool,
    ) {
        let totals = self
            .totals
            .entry(at.year())
            .or_default()
            .entry(category)
            .or_default();

        if fiat_amount.is_negative() {
            totals.losses = totals.losses + fiat_amount.abs();
            if taxable {
                totals.taxable_losses = totals.taxable_losses + fiat_amount.abs();
            }
        } else {
            totals.gains = totals.gains + fiat_amount;
            if taxable {
                totals.taxable_gains = totals.taxable_gains + fiat_amount;
            }
        }
    }

    /// Append an event to its year/category log.
    pub fn log_event(&mut self, event: RealizationEvent) {
        self.events
            .entry(event.timestamp().year())
            .or_default()
            .entry(event.category())
            .or_default()
            .push(event);
    }

    /// Convert the accumulators into the final report. Every year present
    /// gets both category entries, zero-filled where nothing was recorded.
    pub fn finalize(mut self) -> TaxReport {
        for categories in self.totals.values_mut() {
            for category in [Category::Spot, Category::Derivative] {
                categories.entry(category).or_default();
            }
        }
        TaxReport {
            by_year: self.totals,
            events_by_year: self.events,
        }
    }
}
