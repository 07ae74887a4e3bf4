use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    Provider,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const BASE_URL: &str = "https://api.coincap.io/v2";

/// CoinCap ships every number as a string, hence the `Value` fields.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinCapAsset {
    pub id: String,
    #[serde(default)]
    pub rank: Value,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub supply: Value,
    #[serde(default, rename = "maxSupply")]
    pub max_supply: Value,
    #[serde(default, rename = "marketCapUsd")]
    pub market_cap_usd: Value,
    #[serde(default, rename = "volumeUsd24Hr")]
    pub volume_usd_24h: Value,
    #[serde(default, rename = "priceUsd")]
    pub price_usd: Value,
    #[serde(default, rename = "changePercent24Hr")]
    pub change_percent_24h: Value,
    #[serde(default, rename = "vwap24Hr")]
    pub vwap_24h: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinCapHistoryPoint {
    #[serde(rename = "priceUsd")]
    pub price_usd: Value,
    pub time: i64,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinCapMarket {
    pub exchange_id: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    #[serde(default, rename = "volumeUsd24Hr")]
    pub volume_usd_24h: Value,
    #[serde(default)]
    pub price_usd: Value,
    #[serde(default)]
    pub volume_percent: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinCapExchange {
    #[serde(alias = "id")]
    pub exchange_id: String,
    pub name: String,
    #[serde(default)]
    pub rank: Value,
    #[serde(default)]
    pub percent_total_volume: Value,
    #[serde(default)]
    pub volume_usd: Value,
    #[serde(default)]
    pub trading_pairs: Value,
    #[serde(default)]
    pub exchange_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinCapRate {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub currency_symbol: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub rate_usd: Value,
}

fn unwrap(provider: Provider, mut value: Value) -> FetchResult<Value> {
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(FetchError::api(provider, message));
    }
    match value.get_mut("data") {
        Some(Value::Null) | None => Err(FetchError::decode(provider, "missing `data` field")),
        Some(data) => Ok(data.take()),
    }
}

pub struct CoinCapAPI {
    client: ProviderClient,
}

impl CoinCapAPI {
    pub fn new(fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self::with_base_url(BASE_URL, fetcher, cache)
    }

    pub fn with_base_url(
        base_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            client: ProviderClient::new(Provider::CoinCap, base_url, fetcher, cache),
        }
    }

    pub async fn assets(&self, limit: usize, offset: usize) -> FetchResult<Vec<CoinCapAsset>> {
        self.client
            .cached_as(
                &format!("coincap:assets:{}:{}", limit, offset),
                "assets",
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn asset(&self, id: &str) -> FetchResult<CoinCapAsset> {
        self.client
            .cached_as(
                &format!("coincap:asset:{}", id),
                &format!("assets/{}", id),
                &[],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    /// `interval` is one of CoinCap's `m1 .. d1` codes.
    pub async fn asset_history(
        &self,
        id: &str,
        interval: &str,
    ) -> FetchResult<Vec<CoinCapHistoryPoint>> {
        self.client
            .cached_as(
                &format!("coincap:history:{}:{}", id, interval),
                &format!("assets/{}/history", id),
                &[("interval", interval.to_owned())],
                TtlClass::Historical,
                unwrap,
            )
            .await
    }

    pub async fn asset_markets(&self, id: &str, limit: usize) -> FetchResult<Vec<CoinCapMarket>> {
        self.client
            .cached_as(
                &format!("coincap:markets:{}:{}", id, limit),
                &format!("assets/{}/markets", id),
                &[("limit", limit.to_string())],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn exchanges(&self) -> FetchResult<Vec<CoinCapExchange>> {
        self.client
            .cached_as("coincap:exchanges", "exchanges", &[], TtlClass::Short, unwrap)
            .await
    }

    pub async fn rates(&self) -> FetchResult<Vec<CoinCapRate>> {
        self.client
            .cached_as("coincap:rates", "rates", &[], TtlClass::Short, unwrap)
            .await
    }
}
