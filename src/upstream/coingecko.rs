//! Bitcoin price feed backed by the CoinGecko coin endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::PriceFeedConfig;
use crate::resilience::RetryPolicy;
use crate::upstream::{base_url, get_json, UpstreamError};

const PROVIDER: &str = "coingecko";

/// Quote returned by `GET /api/bitcoin/price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinQuote {
    pub price: f64,
    pub change_24h: f64,
    pub change_percent_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub last_updated: String,
}

impl BitcoinQuote {
    /// Static payload served when the feed is unreachable. Only
    /// `last_updated` varies so clients can tell when it was produced.
    pub fn fallback() -> Self {
        Self {
            price: 100_000.0,
            change_24h: 0.0,
            change_percent_24h: 0.0,
            high_24h: 100_000.0,
            low_24h: 100_000.0,
            market_cap: 1_980_000_000_000.0,
            volume_24h: 0.0,
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    market_data: MarketData,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    current_price: HashMap<String, f64>,
    #[serde(default)]
    price_change_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    high_24h: HashMap<String, f64>,
    #[serde(default)]
    low_24h: HashMap<String, f64>,
    #[serde(default)]
    market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

impl MarketData {
    fn into_quote(self, currency: &str) -> Result<BitcoinQuote, UpstreamError> {
        let price = *self
            .current_price
            .get(currency)
            .ok_or_else(|| UpstreamError::Decode(format!("no {currency} price in response")))?;
        let pick = |map: &HashMap<String, f64>| map.get(currency).copied().unwrap_or(0.0);

        Ok(BitcoinQuote {
            price,
            change_24h: self.price_change_24h.unwrap_or(0.0),
            change_percent_24h: self.price_change_percentage_24h.unwrap_or(0.0),
            high_24h: pick(&self.high_24h),
            low_24h: pick(&self.low_24h),
            market_cap: pick(&self.market_cap),
            volume_24h: pick(&self.total_volume),
            last_updated: self
                .last_updated
                .unwrap_or_else(Utc::now)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

struct CachedQuote {
    quote: BitcoinQuote,
    fetched_at: Instant,
}

/// Price feed with a short-lived in-memory cache of the last good quote.
pub struct PriceFeed {
    client: reqwest::Client,
    base: Url,
    currency: String,
    ttl: Duration,
    retry: RetryPolicy,
    cache: ArcSwapOption<CachedQuote>,
}

impl PriceFeed {
    pub fn new(
        client: reqwest::Client,
        config: &PriceFeedConfig,
        retry: RetryPolicy,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            client,
            base: base_url(&config.base_url)?,
            currency: config.vs_currency.to_lowercase(),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            retry,
            cache: ArcSwapOption::empty(),
        })
    }

    fn coin_url(&self) -> Result<Url, UpstreamError> {
        let mut url = self.base.join("coins/bitcoin")?;
        url.query_pairs_mut()
            .append_pair("localization", "false")
            .append_pair("tickers", "false")
            .append_pair("market_data", "true")
            .append_pair("community_data", "false")
            .append_pair("developer_data", "false")
            .append_pair("sparkline", "false");
        Ok(url)
    }

    /// Current quote, from cache when fresh.
    pub async fn quote(&self) -> Result<BitcoinQuote, UpstreamError> {
        if let Some(cached) = self.cache.load_full() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.quote.clone());
            }
        }

        let url = self.coin_url()?;
        let response: CoinResponse = self
            .retry
            .run(PROVIDER, || get_json(&self.client, PROVIDER, url.clone()))
            .await?;
        let quote = response.market_data.into_quote(&self.currency)?;

        self.cache.store(Some(Arc::new(CachedQuote {
            quote: quote.clone(),
            fetched_at: Instant::now(),
        })));
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "bitcoin",
        "market_data": {
            "current_price": {"usd": 97123.5, "eur": 90000.0},
            "price_change_24h": -812.25,
            "price_change_percentage_24h": -0.83,
            "high_24h": {"usd": 98500.0},
            "low_24h": {"usd": 96010.0},
            "market_cap": {"usd": 1923000000000.0},
            "total_volume": {"usd": 31000000000.0},
            "last_updated": "2026-10-19T12:00:05.123Z"
        }
    }"#;

    #[test]
    fn test_parse_market_data() {
        let response: CoinResponse = serde_json::from_str(SAMPLE).unwrap();
        let quote = response.market_data.into_quote("usd").unwrap();

        assert_eq!(quote.price, 97123.5);
        assert_eq!(quote.change_24h, -812.25);
        assert_eq!(quote.high_24h, 98500.0);
        assert_eq!(quote.volume_24h, 31000000000.0);
        assert_eq!(quote.last_updated, "2026-10-19T12:00:05Z");
    }

    #[test]
    fn test_missing_currency_is_decode_error() {
        let response: CoinResponse = serde_json::from_str(SAMPLE).unwrap();
        assert!(matches!(
            response.market_data.into_quote("jpy"),
            Err(UpstreamError::Decode(_))
        ));
    }

    #[test]
    fn test_quote_field_names() {
        let value = serde_json::to_value(BitcoinQuote::fallback()).unwrap();
        for key in [
            "price",
            "change24h",
            "changePercent24h",
            "high24h",
            "low24h",
            "marketCap",
            "volume24h",
            "lastUpdated",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_coin_url() {
        let feed = PriceFeed::new(
            reqwest::Client::new(),
            &PriceFeedConfig::default(),
            RetryPolicy::none(),
        )
        .unwrap();
        let url = feed.coin_url().unwrap();
        assert!(url
            .as_str()
            .starts_with("https://api.coingecko.com/api/v3/coins/bitcoin?localization=false"));
    }
}
