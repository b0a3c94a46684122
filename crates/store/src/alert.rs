//! Alert row types.

use coinseer_core::{AssetId, Fiat, UserId};

/// Which side of the target price fires the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "above" => Some(Direction::Above),
            "below" => Some(Direction::Below),
            _ => None,
        }
    }

    /// Database/wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A price alert joined with its owner's preferred quote currency.
///
/// A one-time alert transitions active -> inactive exactly once, when it
/// fires; a recurring alert stays active and may fire every cycle the
/// condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub id: i64,
    pub owner: UserId,
    pub asset: AssetId,
    pub target_price: f64,
    pub direction: Direction,
    pub recurring: bool,
    pub active: bool,
    /// Owner's preferred quote currency, joined in at load time so the
    /// engine never looks it up per alert.
    pub fiat: Fiat,
}

/// A volume-spike alert. No recurrence flag: the baseline tracker makes
/// these re-arm automatically every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeAlert {
    pub id: i64,
    pub owner: UserId,
    pub asset: AssetId,
    /// Fires when current volume / previous volume >= multiplier.
    pub multiplier: f64,
    pub active: bool,
    pub fiat: Fiat,
}
