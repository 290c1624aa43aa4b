//! The calculation pipeline: load, merge, calculate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::AccountId;
use crate::engine::{merge_timeline, PriceTable, TaxCalculator, TaxError, TaxReport};
use crate::storage::{StoreError, TaxStore};

/// Anything that can abort a calculation request. The run is all-or-nothing;
/// no report is produced alongside any of these.
#[derive(Debug, Error)]
pub enum CalcFailure {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error(transparent)]
    Tax(#[from] TaxError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stateless front door for tax calculations.
///
/// Holds only the store handle; all per-run state lives inside the engine
/// and is discarded when the run ends, so clones can serve requests
/// concurrently.
#[derive(Clone)]
pub struct TaxService {
    store: Arc<dyn TaxStore>,
}

impl TaxService {
    pub fn new(store: Arc<dyn TaxStore>) -> Self {
        Self { store }
    }

    /// Run a full calculation for one account over an optional inclusive
    /// time window.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn calculate(
        &self,
        account_id: AccountId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<TaxReport, CalcFailure> {
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(TaxError::InvalidRange { start: s, end: e }.into());
            }
        }

        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or(CalcFailure::AccountNotFound(account_id))?;

        let executions = self
            .store
            .list_spot_executions(account_id, start, end)
            .await?;
        let settlements = self
            .store
            .list_derivative_settlements(account_id, start, end)
            .await?;
        let prices = self.store.load_fiat_prices(&account.reporting_fiat).await?;

        info!(
            executions = executions.len(),
            settlements = settlements.len(),
            price_points = prices.len(),
            fiat = %account.reporting_fiat,
            "starting calculation run"
        );

        let table = PriceTable::from_points(prices);
        let timeline = merge_timeline(executions, settlements);
        let report = TaxCalculator::new(account.reporting_fiat, &table).run(timeline)?;

        info!(years = report.by_year.len(), "calculation run complete");
        Ok(report)
    }
}
