use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    model::num,
    Provider,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const BASE_URL: &str = "https://data.messari.io/api";
pub const API_KEY_HEADER: &str = "x-messari-api-key";
/// Messari has no search endpoint; this many assets are scanned instead.
pub const SEARCH_SCAN_LIMIT: usize = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessariMarketData {
    #[serde(default)]
    pub price_usd: Value,
    #[serde(default)]
    pub volume_last_24_hours: Value,
    #[serde(default)]
    pub percent_change_usd_last_1_hour: Value,
    #[serde(default)]
    pub percent_change_usd_last_24_hours: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessariMarketcap {
    #[serde(default)]
    pub rank: Value,
    #[serde(default)]
    pub current_marketcap_usd: Value,
    #[serde(default)]
    pub marketcap_dominance_percent: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessariSupply {
    #[serde(default)]
    pub circulating: Value,
    #[serde(default)]
    pub y_2050: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessariMetrics {
    #[serde(default)]
    pub market_data: MessariMarketData,
    #[serde(default)]
    pub marketcap: MessariMarketcap,
    #[serde(default)]
    pub supply: MessariSupply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessariAsset {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub metrics: MessariMetrics,
}

impl MessariAsset {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.slug.to_lowercase().contains(needle)
            || self
                .symbol
                .as_deref()
                .map_or(false, |s| s.to_lowercase().contains(needle))
    }
}

/// `v1/assets/{slug}/metrics` puts the metric blocks beside the identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessariAssetMetrics {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub market_data: MessariMarketData,
    #[serde(default)]
    pub marketcap: MessariMarketcap,
    #[serde(default)]
    pub supply: MessariSupply,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessariProfile {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    pub name: String,
    #[serde(default)]
    pub profile: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// `{status: {error_code, error_message}, data}`.
fn unwrap(provider: Provider, mut value: Value) -> FetchResult<Value> {
    let status = &value["status"];
    if !status["error_code"].is_null() {
        let message = status["error_message"]
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| status["error_code"].to_string());
        return Err(FetchError::api(provider, message));
    }
    match value.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Err(FetchError::decode(provider, "missing `data` field")),
    }
}

fn parse_timeseries(payload: &Value) -> FetchResult<Vec<PricePoint>> {
    let rows = payload["values"]
        .as_array()
        .ok_or_else(|| FetchError::decode(Provider::Messari, "missing `values`"))?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            Some(PricePoint {
                timestamp: row.first()?.as_i64()?,
                open: row.get(1).and_then(num),
                high: row.get(2).and_then(num),
                low: row.get(3).and_then(num),
                close: row.get(4).and_then(num),
                volume: row.get(5).and_then(num),
            })
        })
        .collect())
}

pub struct MessariAPI {
    client: ProviderClient,
}

impl MessariAPI {
    pub fn new(
        api_key: Option<&str>,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self::with_base_url(BASE_URL, api_key, fetcher, cache)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let mut client = ProviderClient::new(Provider::Messari, base_url, fetcher, cache);
        if let Some(key) = api_key {
            client = client.with_header(API_KEY_HEADER, key);
        }
        Self { client }
    }

    pub async fn assets(&self, limit: usize, page: usize) -> FetchResult<Vec<MessariAsset>> {
        self.client
            .cached_as(
                &format!("messari:assets:{}:{}", limit, page),
                "v2/assets",
                &[("limit", limit.to_string()), ("page", page.to_string())],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn asset(&self, slug: &str) -> FetchResult<MessariAsset> {
        self.client
            .cached_as(
                &format!("messari:asset:{}", slug),
                &format!("v1/assets/{}", slug),
                &[],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn metrics(&self, slug: &str) -> FetchResult<MessariAssetMetrics> {
        self.client
            .cached_as(
                &format!("messari:metrics:{}", slug),
                &format!("v1/assets/{}/metrics", slug),
                &[],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn profile(&self, slug: &str) -> FetchResult<MessariProfile> {
        self.client
            .cached_as(
                &format!("messari:profile:{}", slug),
                &format!("v2/assets/{}/profile", slug),
                &[],
                TtlClass::Static,
                unwrap,
            )
            .await
    }

    /// Rows are `[timestamp, open, high, low, close, volume]`.
    pub async fn price_timeseries(
        &self,
        slug: &str,
        start: &str,
        end: &str,
        interval: &str,
    ) -> FetchResult<Vec<PricePoint>> {
        self.client
            .cached_parsed(
                &format!("messari:timeseries:{}:{}:{}:{}", slug, start, end, interval),
                &format!("v1/assets/{}/metrics/price/time-series", slug),
                &[
                    ("start", start.to_owned()),
                    ("end", end.to_owned()),
                    ("interval", interval.to_owned()),
                ],
                unwrap,
                parse_timeseries,
                |_| TtlClass::Historical,
            )
            .await
    }

    /// Case-insensitive substring match over name, symbol and slug of the
    /// first [`SEARCH_SCAN_LIMIT`] assets.
    pub async fn search(&self, query: &str) -> FetchResult<Vec<MessariAsset>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(vec![]);
        }
        let assets = self.assets(SEARCH_SCAN_LIMIT, 1).await?;
        Ok(assets.into_iter().filter(|a| a.matches(&needle)).collect())
    }
}
