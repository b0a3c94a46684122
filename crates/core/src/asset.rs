//! Asset identifiers and ticker-symbol mapping.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Ticker symbol -> canonical upstream asset id.
/// User input like "BTC" has to be translated to the id the price API
/// expects ("bitcoin"). Extend as needed.
const SYMBOL_MAP: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("ltc", "litecoin"),
    ("xrp", "ripple"),
    ("bch", "bitcoin-cash"),
    ("ada", "cardano"),
    ("dot", "polkadot"),
    ("doge", "dogecoin"),
    ("shib", "shiba-inu"),
    ("sol", "solana"),
    ("link", "chainlink"),
    ("matic", "matic-network"),
    ("usdt", "tether"),
    ("usdc", "usd-coin"),
    ("bnb", "binancecoin"),
    ("avax", "avalanche-2"),
    ("trx", "tron"),
    ("xlm", "stellar"),
    ("uni", "uniswap"),
];

/// Canonical asset identifier (e.g., "bitcoin").
///
/// Always stored lowercase; this is the key used for upstream batch
/// requests, database rows and the volume baseline map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(CompactString);

impl AssetId {
    /// Create from an already-canonical id. Normalizes to lowercase.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(CompactString::new(id.as_ref().trim().to_lowercase()))
    }

    /// Resolve user input: ticker symbols map to canonical ids
    /// ("BTC" -> "bitcoin"), everything else is taken as-is lowercased.
    pub fn from_user_input(input: &str) -> Self {
        let lower = input.trim().to_lowercase();
        match SYMBOL_MAP.iter().find(|(sym, _)| *sym == lower) {
            Some((_, id)) => Self(CompactString::new(id)),
            None => Self(CompactString::new(lower)),
        }
    }

    /// Common display symbol ("bitcoin" -> "BTC"); falls back to the
    /// capitalized id for assets outside the map.
    pub fn display_symbol(&self) -> String {
        if let Some((sym, _)) = SYMBOL_MAP.iter().find(|(_, id)| *id == self.0.as_str()) {
            return sym.to_uppercase();
        }
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_user_input_symbol() {
        assert_eq!(AssetId::from_user_input("BTC").as_str(), "bitcoin");
        assert_eq!(AssetId::from_user_input("eth").as_str(), "ethereum");
        assert_eq!(AssetId::from_user_input(" SOL ").as_str(), "solana");
    }

    #[test]
    fn test_from_user_input_passthrough() {
        // Unknown input is taken as a canonical id verbatim.
        assert_eq!(AssetId::from_user_input("Bitcoin").as_str(), "bitcoin");
        assert_eq!(AssetId::from_user_input("notcoin").as_str(), "notcoin");
    }

    #[test]
    fn test_display_symbol() {
        assert_eq!(AssetId::new("bitcoin").display_symbol(), "BTC");
        assert_eq!(AssetId::new("matic-network").display_symbol(), "MATIC");
        assert_eq!(AssetId::new("notcoin").display_symbol(), "Notcoin");
    }

    #[test]
    fn test_new_normalizes() {
        assert_eq!(AssetId::new("BITCOIN"), AssetId::new("bitcoin"));
    }
}
