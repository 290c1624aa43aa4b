//! Fiat conversion rate resolution against the historical price table.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Currency, Decimal, FiatPricePoint, SpotExecution};

use super::TaxError;

/// Reject any price point further than this from the requested instant.
/// Silently using stale rates would corrupt tax figures, so the resolver
/// refuses rather than approximates.
const STALE_TOLERANCE_HOURS: i64 = 12;

/// In-memory historical price table for one reporting fiat.
///
/// Built once per run from rows the storage layer loads up front; lookups
/// are binary searches over per-coin ascending series.
#[derive(Debug, Default)]
pub struct PriceTable {
    by_coin: HashMap<Currency, Vec<(DateTime<Utc>, Decimal)>>,
}

impl PriceTable {
    pub fn from_points(points: Vec<FiatPricePoint>) -> Self {
        let mut by_coin: HashMap<Currency, Vec<(DateTime<Utc>, Decimal)>> = HashMap::new();
        for point in points {
            by_coin
                .entry(point.coin)
                .or_default()
                .push((point.timestamp, point.price));
        }
        for series in by_coin.values_mut() {
            series.sort_by_key(|(ts, _)| *ts);
        }
        PriceTable { by_coin }
    }

    /// Most recent point at or before `at`.
    fn at_or_before(&self, coin: &Currency, at: DateTime<Utc>) -> Option<(DateTime<Utc>, Decimal)> {
        let series = self.by_coin.get(coin)?;
        let idx = series.partition_point(|(ts, _)| *ts <= at);
        if idx == 0 {
            None
        } else {
            Some(series[idx - 1])
        }
    }

    /// Earliest point at or after `at`.
    fn at_or_after(&self, coin: &Currency, at: DateTime<Utc>) -> Option<(DateTime<Utc>, Decimal)> {
        let series = self.by_coin.get(coin)?;
        let idx = series.partition_point(|(ts, _)| *ts < at);
        series.get(idx).copied()
    }
}

/// Resolves coin→fiat conversion rates for one calculation run.
///
/// Table lookups are cached by (coin, instant) since the same pair recurs
/// for every consumption of a multi-lot disposal. Hinted rates are not
/// cached: they are already free, and must not shadow table lookups at the
/// same instant.
pub struct RateResolver<'a> {
    fiat: Currency,
    table: &'a PriceTable,
    cache: HashMap<(Currency, DateTime<Utc>), Decimal>,
}

impl<'a> RateResolver<'a> {
    pub fn new(fiat: Currency, table: &'a PriceTable) -> Self {
        RateResolver {
            fiat,
            table,
            cache: HashMap::new(),
        }
    }

    /// The reporting fiat this resolver converts into.
    pub fn fiat(&self) -> &Currency {
        &self.fiat
    }

    /// Conversion rate from one unit of `coin` to the reporting fiat at `at`.
    ///
    /// A same-trade hint short-circuits the table when the execution itself
    /// quotes `coin` against the reporting fiat, directly or inversely.
    /// Otherwise the closer of the at-or-before and at-or-after table points
    /// wins, subject to the 12-hour staleness tolerance.
    ///
    /// # Errors
    /// [`TaxError::MissingPriceData`] when no point exists on either side,
    /// [`TaxError::StalePriceData`] when the closest point is out of
    /// tolerance.
    pub fn rate(
        &mut self,
        coin: &Currency,
        at: DateTime<Utc>,
        hint: Option<&SpotExecution>,
    ) -> Result<Decimal, TaxError> {
        if *coin == self.fiat {
            return Ok(Decimal::one());
        }

        if let Some(exec) = hint {
            if exec.base == *coin && exec.quote == self.fiat {
                return Ok(exec.price);
            }
            // A non-positive price cannot be inverted; fall through to the
            // table so a bad stored row errors instead of panicking.
            if exec.quote == *coin && exec.base == self.fiat && exec.price.is_positive() {
                return Ok(Decimal::one() / exec.price);
            }
        }

        if let Some(rate) = self.cache.get(&(coin.clone(), at)) {
            return Ok(*rate);
        }

        let before = self.table.at_or_before(coin, at);
        let after = self.table.at_or_after(coin, at);
        let (closest_ts, price) = match (before, after) {
            (None, None) => {
                return Err(TaxError::MissingPriceData {
                    coin: coin.clone(),
                    fiat: self.fiat.clone(),
                    at,
                })
            }
            (Some(point), None) | (None, Some(point)) => point,
            (Some(before), Some(after)) => {
                if at - before.0 <= after.0 - at {
                    before
                } else {
                    after
                }
            }
        };

        let distance = (at - closest_ts).abs();
        if distance > Duration::hours(STALE_TOLERANCE_HOURS) {
            return Err(TaxError::StalePriceData {
                coin: coin.clone(),
                fiat: self.fiat.clone(),
                at,
                closest: closest_ts,
                distance_secs: distance.num_seconds(),
            });
        }

        self.cache.insert((coin.clone(), at), price);
        Ok(price)
    }
}
