//! Storage abstraction the calculation pipeline loads its inputs through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    Account, AccountId, Currency, DerivativeSettlement, FiatPricePoint, InvalidCurrency,
    SpotExecution,
};

pub mod mock;

pub use mock::MockStore;

/// Read access to accounts, executions, settlements, and historical prices.
///
/// Implementations must return rows in ascending timestamp order and must
/// fail loudly on malformed rows rather than skipping them; a silently
/// dropped execution would shift every later FIFO match.
#[async_trait]
pub trait TaxStore: Send + Sync {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Spot executions for one account, optionally bounded by an inclusive
    /// time window.
    async fn list_spot_executions(
        &self,
        account_id: AccountId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SpotExecution>, StoreError>;

    /// Closed derivative PnL rows for one account, same window semantics.
    async fn list_derivative_settlements(
        &self,
        account_id: AccountId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DerivativeSettlement>, StoreError>;

    /// Every stored price point quoting any coin in `fiat`.
    async fn load_fiat_prices(&self, fiat: &Currency) -> Result<Vec<FiatPricePoint>, StoreError>;
}

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    /// A persisted row failed to parse back into its domain type. This is
    /// data corruption, not user error, and always aborts the caller.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    InvalidCurrency(#[from] InvalidCurrency),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
