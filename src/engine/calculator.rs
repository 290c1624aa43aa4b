//! The calculation run: timeline in, per-year report out.

use tracing::debug;

use crate::domain::{split_symbol, Category, Currency, DerivativeSettlement, Side, SpotExecution};

use super::aggregate::YearlyAggregator;
use super::lot_pool::{is_taxable, LotPool};
use super::rates::{PriceTable, RateResolver};
use super::timeline::TaxEvent;
use super::{RealizationEvent, TaxError, TaxReport};

/// Drives one calculation run over a merged timeline.
///
/// Owns the lot pool, rate resolver, and aggregator for the duration of the
/// run; nothing is shared across concurrent runs. Any error discards all
/// accumulated state.
pub struct TaxCalculator<'a> {
    resolver: RateResolver<'a>,
    pool: LotPool,
    agg: YearlyAggregator,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(reporting_fiat: Currency, prices: &'a PriceTable) -> Self {
        TaxCalculator {
            resolver: RateResolver::new(reporting_fiat, prices),
            pool: LotPool::new(),
            agg: YearlyAggregator::new(),
        }
    }

    /// Consume the timeline and produce the final report.
    ///
    /// The timeline must be ascending by timestamp (see
    /// [`merge_timeline`](super::timeline::merge_timeline)); the lot pool
    /// relies on insertion order for FIFO.
    pub fn run(mut self, timeline: Vec<TaxEvent>) -> Result<TaxReport, TaxError> {
        for event in timeline {
            match event {
                TaxEvent::Spot(exec) => self.apply_spot(exec)?,
                TaxEvent::Derivative(settlement) => self.apply_derivative(settlement)?,
            }
        }
        Ok(self.agg.finalize())
    }

    fn apply_spot(&mut self, exec: SpotExecution) -> Result<(), TaxError> {
        let at = exec.timestamp;
        let quote_rate = self.resolver.rate(&exec.quote, at, Some(&exec))?;
        debug!(exec_id = %exec.exec_id, side = %exec.side, base = %exec.base, "applying spot execution");

        match exec.side {
            Side::Buy => {
                self.pool
                    .acquire(&exec.base, exec.qty, exec.price, at, Category::Spot);
            }
            Side::Sell => {
                let consumptions = self.pool.dispose(&exec.base, exec.qty, at)?;
                for c in consumptions {
                    let fiat_value = (exec.price - c.unit_cost) * c.qty * quote_rate;
                    let taxable = is_taxable(c.acquired_at, at);
                    self.agg.record_pnl(c.category, at, fiat_value, taxable);
                    self.agg.log_event(RealizationEvent::Pnl {
                        asset: exec.base.clone(),
                        qty: c.qty,
                        quote: exec.quote.clone(),
                        open_ts: c.acquired_at,
                        close_ts: at,
                        open_price: Some(c.unit_cost),
                        close_price: Some(exec.price),
                        fiat_value,
                        taxable,
                        category: c.category,
                    });
                }
            }
        }

        self.agg
            .record_fee(Category::Spot, at, exec.fees * quote_rate);
        Ok(())
    }

    fn apply_derivative(&mut self, settlement: DerivativeSettlement) -> Result<(), TaxError> {
        let at = settlement.timestamp;
        let (base, quote) = split_symbol(&settlement.symbol)?;
        let rate = self.resolver.rate(&quote, at, None)?;
        debug!(pnl_id = %settlement.pnl_id, symbol = %settlement.symbol, "applying derivative settlement");

        if settlement.fees.is_positive() {
            self.agg
                .record_fee(Category::Derivative, at, settlement.fees * rate);
        }

        // A positive net settlement is modeled as buying quote currency at
        // the realized rate; a negative one disposes quote currency against
        // the open derivative lots.
        let net = settlement.closed_pnl;
        if net.is_positive() {
            self.pool
                .acquire(&quote, net, rate, at, Category::Derivative);
        } else if net.is_negative() {
            let consumptions = self.pool.dispose(&quote, net.abs(), at)?;
            for c in consumptions {
                // Quote currency disposed directly against the reporting
                // fiat: the realized difference is already a fiat amount.
                let fiat_value = (rate - c.unit_cost) * c.qty;
                let taxable = is_taxable(c.acquired_at, at);
                self.agg.record_pnl(c.category, at, fiat_value, taxable);
                self.agg.log_event(RealizationEvent::Pnl {
                    asset: quote.clone(),
                    qty: c.qty,
                    quote: self.resolver.fiat().clone(),
                    open_ts: c.acquired_at,
                    close_ts: at,
                    open_price: Some(c.unit_cost),
                    close_price: Some(rate),
                    fiat_value,
                    taxable,
                    category: c.category,
                });
            }
        }

        // Derivative settlement is itself the taxable event; no holding
        // period applies.
        let fiat_value = net * rate;
        self.agg
            .record_pnl(Category::Derivative, at, fiat_value, true);
        self.agg.log_event(RealizationEvent::Pnl {
            asset: base,
            qty: settlement.qty.abs(),
            quote,
            open_ts: at,
            close_ts: at,
            open_price: settlement.entry_price,
            close_price: settlement.exit_price,
            fiat_value,
            taxable: true,
            category: Category::Derivative,
        });
        Ok(())
    }
}
