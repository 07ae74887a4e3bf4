use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{data_envelope, raw, HttpFetch, ProviderClient},
    Provider,
};
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

pub const BASE_URL: &str = "https://api.coinlore.net/api";

#[derive(Debug, Clone, Deserialize)]
pub struct CoinLoreTicker {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub nameid: Option<String>,
    #[serde(default)]
    pub rank: Value,
    #[serde(default)]
    pub price_usd: Value,
    #[serde(default)]
    pub percent_change_24h: Value,
    #[serde(default)]
    pub percent_change_1h: Value,
    #[serde(default)]
    pub percent_change_7d: Value,
    #[serde(default)]
    pub market_cap_usd: Value,
    #[serde(default)]
    pub volume24: Value,
    #[serde(default)]
    pub csupply: Value,
    #[serde(default)]
    pub tsupply: Value,
    #[serde(default)]
    pub msupply: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinLoreGlobal {
    #[serde(default)]
    pub coins_count: Value,
    #[serde(default)]
    pub active_markets: Value,
    #[serde(default)]
    pub total_mcap: Value,
    #[serde(default)]
    pub total_volume: Value,
    #[serde(default)]
    pub btc_d: Value,
    #[serde(default)]
    pub eth_d: Value,
    #[serde(default)]
    pub mcap_change: Value,
    #[serde(default)]
    pub volume_change: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinLoreExchange {
    #[serde(default)]
    pub id: Value,
    pub name: String,
    #[serde(default)]
    pub name_id: Option<String>,
    #[serde(default)]
    pub volume_usd: Value,
    #[serde(default)]
    pub active_pairs: Value,
    #[serde(default)]
    pub url: Option<String>,
}

/// `global/` answers with a one-element array.
fn first_element(provider: Provider, value: Value) -> FetchResult<Value> {
    match value {
        Value::Array(mut items) if !items.is_empty() => Ok(items.swap_remove(0)),
        _ => Err(FetchError::decode(provider, "expected a non-empty array")),
    }
}

pub struct CoinLoreAPI {
    client: ProviderClient,
}

impl CoinLoreAPI {
    pub fn new(fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self::with_base_url(BASE_URL, fetcher, cache)
    }

    pub fn with_base_url(
        base_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            client: ProviderClient::new(Provider::CoinLore, base_url, fetcher, cache),
        }
    }

    pub async fn tickers(&self, start: usize, limit: usize) -> FetchResult<Vec<CoinLoreTicker>> {
        self.client
            .cached_as(
                &format!("coinlore:tickers:{}:{}", start, limit),
                "tickers/",
                &[("start", start.to_string()), ("limit", limit.to_string())],
                TtlClass::Ticker,
                data_envelope,
            )
            .await
    }

    pub async fn global(&self) -> FetchResult<CoinLoreGlobal> {
        self.client
            .cached_as(
                "coinlore:global",
                "global/",
                &[],
                TtlClass::Short,
                first_element,
            )
            .await
    }

    /// Keyed by CoinLore's exchange id; returned as a list.
    pub async fn exchanges(&self) -> FetchResult<Vec<CoinLoreExchange>> {
        let by_id: HashMap<String, CoinLoreExchange> = self
            .client
            .cached_as("coinlore:exchanges", "exchanges/", &[], TtlClass::Short, raw)
            .await?;
        Ok(by_id
            .into_iter()
            .map(|(id, mut exchange)| {
                if exchange.id.is_null() {
                    exchange.id = Value::String(id);
                }
                exchange
            })
            .collect())
    }
}
