//! Per-asset market observations.

use crate::Fiat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metrics for one asset in one quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteMetrics {
    /// Current price.
    pub price: f64,
    /// Market capitalization, when the upstream reports it.
    pub market_cap: Option<f64>,
    /// 24h trading volume.
    pub volume_24h: Option<f64>,
    /// 24h percent change.
    pub change_24h: Option<f64>,
}

impl QuoteMetrics {
    /// Metrics with only a price (volume/cap/change unknown).
    pub fn price_only(price: f64) -> Self {
        Self {
            price,
            market_cap: None,
            volume_24h: None,
            change_24h: None,
        }
    }
}

/// One fetched snapshot of an asset, keyed by quote currency.
///
/// Ephemeral: lives for a single evaluation cycle. A missing quote
/// currency means the owner's preferred fiat was not part of the batch
/// request; callers skip the alert and retry next cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    quotes: HashMap<Fiat, QuoteMetrics>,
}

impl Observation {
    /// Observation with a single quote currency entry.
    pub fn with_quote(fiat: Fiat, metrics: QuoteMetrics) -> Self {
        let mut quotes = HashMap::with_capacity(1);
        quotes.insert(fiat, metrics);
        Self { quotes }
    }

    /// Add or replace metrics for a quote currency.
    pub fn insert(&mut self, fiat: Fiat, metrics: QuoteMetrics) {
        self.quotes.insert(fiat, metrics);
    }

    pub fn has_quote(&self, fiat: Fiat) -> bool {
        self.quotes.contains_key(&fiat)
    }

    pub fn price_in(&self, fiat: Fiat) -> Option<f64> {
        self.quotes.get(&fiat).map(|m| m.price)
    }

    pub fn volume_in(&self, fiat: Fiat) -> Option<f64> {
        self.quotes.get(&fiat).and_then(|m| m.volume_24h)
    }

    pub fn market_cap_in(&self, fiat: Fiat) -> Option<f64> {
        self.quotes.get(&fiat).and_then(|m| m.market_cap)
    }

    pub fn change_in(&self, fiat: Fiat) -> Option<f64> {
        self.quotes.get(&fiat).and_then(|m| m.change_24h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_with_quote() {
        let obs = Observation::with_quote(
            Fiat::Usd,
            QuoteMetrics {
                price: 50000.0,
                market_cap: Some(1.0e12),
                volume_24h: Some(3.0e10),
                change_24h: Some(-1.5),
            },
        );

        assert!(obs.has_quote(Fiat::Usd));
        assert!(!obs.has_quote(Fiat::Eur));
        assert_eq!(obs.price_in(Fiat::Usd), Some(50000.0));
        assert_eq!(obs.volume_in(Fiat::Usd), Some(3.0e10));
        assert_eq!(obs.price_in(Fiat::Eur), None);
    }

    #[test]
    fn test_price_only() {
        let obs = Observation::with_quote(Fiat::Usd, QuoteMetrics::price_only(100.0));
        assert_eq!(obs.price_in(Fiat::Usd), Some(100.0));
        assert_eq!(obs.volume_in(Fiat::Usd), None);
    }
}
