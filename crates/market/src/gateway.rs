//! Upstream price API client (CoinGecko `/simple/price`).

use crate::rate_limit::RateLimiter;
use crate::retry::{with_retry, RetryPolicy};
use crate::MarketError;
use async_trait::async_trait;
use coinseer_core::{AssetId, Fiat, Observation, QuoteMetrics};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Logical endpoint name for rate limiting.
const SIMPLE_PRICE_ENDPOINT: &str = "simple_price";

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";

/// Source of per-asset market observations.
///
/// The evaluation engine depends on this seam so tests can inject
/// canned batches; [`CoinGeckoClient`] is the production impl.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch observations for a de-duplicated batch of asset ids in one
    /// quote currency. Assets unknown upstream are simply absent from
    /// the result; a failed fetch (after retries) is
    /// [`MarketError::DataUnavailable`].
    async fn fetch(
        &self,
        ids: &[AssetId],
        fiat: Fiat,
    ) -> Result<HashMap<AssetId, Observation>, MarketError>;
}

/// Gateway tuning knobs.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Minimum spacing between calls to the same logical endpoint.
    pub min_call_interval: Duration,
    /// Retry policy for transient upstream failures.
    pub retry: RetryPolicy,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_call_interval: Duration::from_secs(1),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// CoinGecko REST client.
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl CoinGeckoClient {
    pub fn new(config: GatewayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            limiter: RateLimiter::new(config.min_call_interval),
            retry: config.retry,
        }
    }

    /// Override the base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Convenience for one-off user queries: fetch a single asset.
    pub async fn fetch_one(
        &self,
        id: &AssetId,
        fiat: Fiat,
    ) -> Result<Option<Observation>, MarketError> {
        let mut batch = self.fetch(std::slice::from_ref(id), fiat).await?;
        Ok(batch.remove(id))
    }

    /// One rate-limited request against `/simple/price`, no retries.
    async fn request_simple_price(
        &self,
        ids_param: &str,
        fiat: Fiat,
    ) -> Result<HashMap<AssetId, Observation>, MarketError> {
        self.limiter.throttle(SIMPLE_PRICE_ENDPOINT).await;

        let url = format!("{}/api/v3/simple/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("ids", ids_param),
                ("vs_currencies", fiat.as_str()),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_simple_price(&body, fiat)
    }
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}

#[async_trait]
impl MarketData for CoinGeckoClient {
    async fn fetch(
        &self,
        ids: &[AssetId],
        fiat: Fiat,
    ) -> Result<HashMap<AssetId, Observation>, MarketError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Batch requests use a comma-joined id list.
        let ids_param = ids
            .iter()
            .map(AssetId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        debug!(ids = %ids_param, fiat = fiat.as_str(), "fetching batch");

        with_retry(&self.retry, SIMPLE_PRICE_ENDPOINT, || {
            self.request_simple_price(&ids_param, fiat)
        })
        .await
        .map_err(|err| MarketError::DataUnavailable(err.to_string()))
    }
}

/// Parse a `/simple/price` body into observations.
///
/// The response maps asset id -> flat field map:
/// `{"bitcoin": {"usd": 51000.0, "usd_market_cap": ..., "usd_24h_vol": ...,
/// "usd_24h_change": ...}}`. Entries without a price in the requested
/// quote currency are dropped.
pub fn parse_simple_price(
    body: &str,
    fiat: Fiat,
) -> Result<HashMap<AssetId, Observation>, MarketError> {
    let raw: HashMap<String, HashMap<String, Option<f64>>> =
        serde_json::from_str(body).map_err(|err| MarketError::Parse(err.to_string()))?;

    let key = fiat.as_str();
    let mut out = HashMap::with_capacity(raw.len());
    for (id, fields) in raw {
        let Some(price) = fields.get(key).copied().flatten() else {
            continue;
        };
        let metrics = QuoteMetrics {
            price,
            market_cap: fields.get(&format!("{key}_market_cap")).copied().flatten(),
            volume_24h: fields.get(&format!("{key}_24h_vol")).copied().flatten(),
            change_24h: fields.get(&format!("{key}_24h_change")).copied().flatten(),
        };
        out.insert(AssetId::new(&id), Observation::with_quote(fiat, metrics));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_price() {
        let body = r#"{
            "bitcoin": {
                "usd": 51000.0,
                "usd_market_cap": 1000000000000.0,
                "usd_24h_vol": 30000000000.0,
                "usd_24h_change": 2.5
            },
            "ethereum": {
                "usd": 3000.0,
                "usd_market_cap": 360000000000.0,
                "usd_24h_vol": 15000000000.0,
                "usd_24h_change": -1.2
            }
        }"#;

        let parsed = parse_simple_price(body, Fiat::Usd).unwrap();
        assert_eq!(parsed.len(), 2);

        let btc = &parsed[&AssetId::new("bitcoin")];
        assert_eq!(btc.price_in(Fiat::Usd), Some(51000.0));
        assert_eq!(btc.volume_in(Fiat::Usd), Some(30000000000.0));
        assert_eq!(btc.change_in(Fiat::Usd), Some(2.5));
        assert!(!btc.has_quote(Fiat::Eur));
    }

    #[test]
    fn test_parse_drops_entries_without_requested_fiat() {
        // Upstream quietly omits prices it cannot serve.
        let body = r#"{"bitcoin": {"eur": 47000.0}, "ethereum": {"usd": 3000.0}}"#;
        let parsed = parse_simple_price(body, Fiat::Usd).unwrap();

        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key(&AssetId::new("ethereum")));
    }

    #[test]
    fn test_parse_tolerates_null_fields() {
        let body = r#"{"bitcoin": {"usd": 51000.0, "usd_24h_vol": null}}"#;
        let parsed = parse_simple_price(body, Fiat::Usd).unwrap();

        let btc = &parsed[&AssetId::new("bitcoin")];
        assert_eq!(btc.price_in(Fiat::Usd), Some(51000.0));
        assert_eq!(btc.volume_in(Fiat::Usd), None);
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        let err = parse_simple_price("not json", Fiat::Usd).unwrap_err();
        assert!(matches!(err, MarketError::Parse(_)));
    }

    #[test]
    fn test_parse_empty_object() {
        let parsed = parse_simple_price("{}", Fiat::Usd).unwrap();
        assert!(parsed.is_empty());
    }
}
