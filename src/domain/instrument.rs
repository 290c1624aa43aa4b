//! Derivative instrument symbol parsing.

use thiserror::Error;

use crate::domain::primitives::{Currency, KNOWN_CRYPTO, KNOWN_FIAT};

/// An instrument symbol that cannot be split into known currency codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolvable instrument symbol: {0:?}")]
pub struct UnresolvableSymbol(pub String);

/// Split a derivative instrument symbol like "BTCUSDT" into (base, quote).
///
/// Known currency codes are tried as a quote suffix, longest first, so
/// "ETHUSDT" resolves to (ETH, USDT) rather than failing on a three-letter
/// split. When no known code matches the suffix, the symbol is split at a
/// fixed width of three trailing characters and both halves are validated.
///
/// # Errors
/// Returns [`UnresolvableSymbol`] if no split yields two known currencies.
pub fn split_symbol(symbol: &str) -> Result<(Currency, Currency), UnresolvableSymbol> {
    let sym = symbol.trim().to_ascii_uppercase();

    let mut codes: Vec<&str> = KNOWN_CRYPTO.iter().chain(KNOWN_FIAT.iter()).copied().collect();
    codes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    for code in codes {
        if sym.len() > code.len() && sym.ends_with(code) {
            let base = &sym[..sym.len() - code.len()];
            if let (Ok(base), Ok(quote)) = (Currency::parse(base), Currency::parse(code)) {
                return Ok((base, quote));
            }
        }
    }

    if sym.len() > 3 {
        let (base, quote) = sym.split_at(sym.len() - 3);
        if let (Ok(base), Ok(quote)) = (Currency::parse(base), Currency::parse(quote)) {
            return Ok((base, quote));
        }
    }

    Err(UnresolvableSymbol(symbol.to_string()))
}
