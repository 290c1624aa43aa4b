//! Domain types for FIFO tax-lot accounting.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Validated currency codes, trade sides, and accounting categories
//! - Execution, settlement, account, and price-point records
//! - Derivative instrument symbol parsing

pub mod decimal;
pub mod instrument;
pub mod primitives;
pub mod records;

pub use decimal::Decimal;
pub use instrument::{split_symbol, UnresolvableSymbol};
pub use primitives::{AccountId, Category, Currency, InvalidCurrency, Side};
pub use records::{Account, DerivativeSettlement, FiatPricePoint, SpotExecution};
