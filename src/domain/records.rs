//! Account, execution, settlement, and price-point records.
//!
//! These are the shapes the storage collaborator materializes before a
//! calculation run; the engine never touches the database directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, Currency, Decimal, Side};

/// A trading account and its reporting fiat.
///
/// Exchange credentials are held by the download tooling, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub reporting_fiat: Currency,
}

/// A single spot trade execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotExecution {
    /// Exchange-assigned execution id (unique), or a generated id for
    /// manually entered executions.
    pub exec_id: String,
    pub account_id: AccountId,
    pub base: Currency,
    pub quote: Currency,
    pub side: Side,
    pub qty: Decimal,
    /// Unit price in the quote currency.
    pub price: Decimal,
    /// Fee in the quote currency, >= 0.
    pub fees: Decimal,
    pub timestamp: DateTime<Utc>,
    /// True when entered by hand rather than downloaded.
    pub is_manual: bool,
}

/// A closed derivative position's realized PnL row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeSettlement {
    pub pnl_id: String,
    pub account_id: AccountId,
    /// Instrument symbol, e.g. "BTCUSDT"; split into (base, quote) at
    /// calculation time.
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    /// Net realized settlement in quote-currency units; signed.
    pub closed_pnl: Decimal,
    /// Fee in the quote currency, >= 0.
    pub fees: Decimal,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// One point of the historical coin→fiat price table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatPricePoint {
    pub coin: Currency,
    pub fiat: Currency,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}
