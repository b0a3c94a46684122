//! Quote (fiat) currency types.

use serde::{Deserialize, Serialize};

/// Fiat quote currency an amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fiat {
    /// US Dollar (process-wide default)
    Usd,
    /// Euro
    Eur,
    /// British Pound
    Gbp,
}

impl Fiat {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "usd" => Some(Fiat::Usd),
            "eur" => Some(Fiat::Eur),
            "gbp" => Some(Fiat::Gbp),
            _ => None,
        }
    }

    /// Lowercase wire/database form ("usd").
    pub fn as_str(self) -> &'static str {
        match self {
            Fiat::Usd => "usd",
            Fiat::Eur => "eur",
            Fiat::Gbp => "gbp",
        }
    }

    /// Uppercase display form ("USD").
    pub fn code(self) -> &'static str {
        match self {
            Fiat::Usd => "USD",
            Fiat::Eur => "EUR",
            Fiat::Gbp => "GBP",
        }
    }

    /// All supported quote currencies.
    pub fn all() -> &'static [Fiat] {
        &[Fiat::Usd, Fiat::Eur, Fiat::Gbp]
    }
}

impl Default for Fiat {
    fn default() -> Self {
        Fiat::Usd
    }
}

impl std::fmt::Display for Fiat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse() {
        assert_eq!(Fiat::parse("usd"), Some(Fiat::Usd));
        assert_eq!(Fiat::parse("EUR"), Some(Fiat::Eur));
        assert_eq!(Fiat::parse(" gbp "), Some(Fiat::Gbp));
        assert_eq!(Fiat::parse("krw"), None);
    }

    #[test]
    fn test_roundtrip() {
        for &fiat in Fiat::all() {
            assert_eq!(Fiat::parse(fiat.as_str()), Some(fiat));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Fiat::Usd), "USD");
        assert_eq!(Fiat::Eur.as_str(), "eur");
    }
}
