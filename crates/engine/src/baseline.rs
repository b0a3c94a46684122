//! Rolling previous-observation volume baselines.

use coinseer_core::AssetId;
use dashmap::DashMap;

/// Last-observed 24h volume per asset.
///
/// Process-wide, in-memory only: empty at startup, so the first cycle
/// for any asset can never trigger a spike and only seeds the
/// comparison for the next cycle. The baseline is overwritten every
/// volume-check cycle regardless of whether an alert fired, which makes
/// volume alerts a comparison against the immediately preceding cycle
/// only.
#[derive(Debug, Default)]
pub struct VolumeBaselines {
    inner: DashMap<AssetId, f64>,
}

impl VolumeBaselines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous observed volume for the asset, if any.
    pub fn previous(&self, asset: &AssetId) -> Option<f64> {
        self.inner.get(asset).map(|v| *v)
    }

    /// Overwrite the baseline with the newest observation.
    pub fn record(&self, asset: &AssetId, volume: f64) {
        self.inner.insert(asset.clone(), volume);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_at_start() {
        let baselines = VolumeBaselines::new();
        assert!(baselines.is_empty());
        assert_eq!(baselines.previous(&AssetId::new("bitcoin")), None);
    }

    #[test]
    fn test_record_overwrites() {
        let baselines = VolumeBaselines::new();
        let btc = AssetId::new("bitcoin");

        baselines.record(&btc, 1.0e9);
        assert_eq!(baselines.previous(&btc), Some(1.0e9));

        baselines.record(&btc, 3.0e9);
        assert_eq!(baselines.previous(&btc), Some(3.0e9));
        assert_eq!(baselines.len(), 1);
    }
}
