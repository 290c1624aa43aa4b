//! Domain primitives: Currency, Side, Category, AccountId.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Crypto currency codes with a usable fiat price history.
pub const KNOWN_CRYPTO: [&str; 4] = ["BTC", "ETH", "USDT", "USDC"];

/// Fiat currencies accepted as a reporting base.
pub const KNOWN_FIAT: [&str; 2] = ["EUR", "USD"];

/// A currency code outside the known crypto and fiat sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid currency: {0:?}")]
pub struct InvalidCurrency(pub String);

/// Validated uppercase currency code.
///
/// Membership is checked against [`KNOWN_CRYPTO`] and [`KNOWN_FIAT`] at
/// construction; an unknown code never coerces silently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Currency(String);

impl Currency {
    /// Parse and validate a currency code (case-insensitive).
    ///
    /// # Errors
    /// Returns [`InvalidCurrency`] if the code is in neither known set.
    pub fn parse(code: &str) -> Result<Self, InvalidCurrency> {
        let upper = code.trim().to_ascii_uppercase();
        if KNOWN_CRYPTO.contains(&upper.as_str()) || KNOWN_FIAT.contains(&upper.as_str()) {
            Ok(Currency(upper))
        } else {
            Err(InvalidCurrency(code.to_string()))
        }
    }

    /// Get the code as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is a fiat currency.
    pub fn is_fiat(&self) -> bool {
        KNOWN_FIAT.contains(&self.0.as_str())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Deserialization goes through `parse` so persisted or user-supplied codes
// are validated on the way in.
impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Currency::parse(&code).map_err(serde::de::Error::custom)
    }
}

/// Trade side: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse a stored or user-supplied side string (case-insensitive).
    pub fn parse(s: &str) -> Option<Side> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Accounting category a lot or realization belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Spot,
    Derivative,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Spot => "spot",
            Category::Derivative => "derivative",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Database identifier of a trading account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    pub fn new(id: i64) -> Self {
        AccountId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
