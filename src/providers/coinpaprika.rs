use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    Provider,
};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

pub const BASE_URL: &str = "https://api.coinpaprika.com/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct PaprikaCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub rank: Value,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaprikaQuote {
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub volume_24h: Value,
    #[serde(default)]
    pub market_cap: Value,
    #[serde(default)]
    pub percent_change_1h: Value,
    #[serde(default)]
    pub percent_change_24h: Value,
    #[serde(default)]
    pub percent_change_7d: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaprikaTicker {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub rank: Value,
    #[serde(default)]
    pub circulating_supply: Value,
    #[serde(default)]
    pub total_supply: Value,
    #[serde(default)]
    pub max_supply: Value,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub quotes: HashMap<String, PaprikaQuote>,
}

impl PaprikaTicker {
    pub fn usd(&self) -> Option<&PaprikaQuote> {
        self.quotes.get("USD")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaprikaGlobal {
    #[serde(default)]
    pub market_cap_usd: Value,
    #[serde(default)]
    pub volume_24h_usd: Value,
    #[serde(default)]
    pub bitcoin_dominance_percentage: Value,
    #[serde(default)]
    pub cryptocurrencies_number: Value,
    #[serde(default)]
    pub market_cap_change_24h: Value,
    #[serde(default)]
    pub volume_24h_change_24h: Value,
    #[serde(default)]
    pub last_updated: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaprikaOhlcv {
    pub time_open: String,
    #[serde(default)]
    pub time_close: Option<String>,
    #[serde(default)]
    pub open: Value,
    #[serde(default)]
    pub high: Value,
    #[serde(default)]
    pub low: Value,
    #[serde(default)]
    pub close: Value,
    #[serde(default)]
    pub volume: Value,
    #[serde(default)]
    pub market_cap: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaprikaExchange {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub adjusted_rank: Value,
    #[serde(default)]
    pub markets: Value,
    #[serde(default)]
    pub quotes: HashMap<String, PaprikaExchangeQuote>,
    #[serde(default)]
    pub links: Option<PaprikaLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaprikaExchangeQuote {
    #[serde(default)]
    pub reported_volume_24h: Value,
    #[serde(default)]
    pub adjusted_volume_24h: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaprikaLinks {
    #[serde(default)]
    pub website: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaprikaMarket {
    pub exchange_id: String,
    pub exchange_name: String,
    pub pair: String,
    #[serde(default)]
    pub quotes: HashMap<String, PaprikaQuote>,
    #[serde(default)]
    pub adjusted_volume_24h_share: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaprikaSearch {
    #[serde(default)]
    pub currencies: Vec<PaprikaCoin>,
    #[serde(default)]
    pub exchanges: Vec<Value>,
    #[serde(default)]
    pub people: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
}

/// Bodies are bare, but failures arrive as `{"error": "..."}`.
fn unwrap(provider: Provider, value: Value) -> FetchResult<Value> {
    match value.get("error").and_then(Value::as_str) {
        Some(message) => Err(FetchError::api(provider, message)),
        None => Ok(value),
    }
}

pub struct CoinPaprikaAPI {
    client: ProviderClient,
}

impl CoinPaprikaAPI {
    pub fn new(fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self::with_base_url(BASE_URL, fetcher, cache)
    }

    pub fn with_base_url(
        base_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            client: ProviderClient::new(Provider::CoinPaprika, base_url, fetcher, cache),
        }
    }

    pub async fn coins(&self) -> FetchResult<Vec<PaprikaCoin>> {
        self.client
            .cached_as("coinpaprika:coins", "coins", &[], TtlClass::Static, unwrap)
            .await
    }

    /// The endpoint returns every ticker; ordering by rank and slicing is ours.
    pub async fn tickers(&self, limit: usize) -> FetchResult<Vec<PaprikaTicker>> {
        let all: Vec<PaprikaTicker> = self
            .client
            .cached_as(
                "coinpaprika:tickers",
                "tickers",
                &[("quotes", "USD".to_owned())],
                TtlClass::Ticker,
                unwrap,
            )
            .await?;
        Ok(all
            .into_iter()
            .filter(|t| rank_of(&t.rank).is_some())
            .sorted_by_key(|t| rank_of(&t.rank))
            .take(limit)
            .collect())
    }

    pub async fn ticker(&self, id: &str) -> FetchResult<PaprikaTicker> {
        self.client
            .cached_as(
                &format!("coinpaprika:ticker:{}", id),
                &format!("tickers/{}", id),
                &[],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn global(&self) -> FetchResult<PaprikaGlobal> {
        self.client
            .cached_as("coinpaprika:global", "global", &[], TtlClass::Short, unwrap)
            .await
    }

    pub async fn ohlcv_latest(&self, id: &str) -> FetchResult<Vec<PaprikaOhlcv>> {
        self.client
            .cached_as(
                &format!("coinpaprika:ohlcv:latest:{}", id),
                &format!("coins/{}/ohlcv/latest", id),
                &[],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    /// `start`/`end` are ISO dates or unix seconds, passed through verbatim.
    pub async fn ohlcv_historical(
        &self,
        id: &str,
        start: &str,
        end: Option<&str>,
    ) -> FetchResult<Vec<PaprikaOhlcv>> {
        let mut query = vec![("start", start.to_owned())];
        if let Some(end) = end {
            query.push(("end", end.to_owned()));
        }
        self.client
            .cached_as(
                &format!(
                    "coinpaprika:ohlcv:historical:{}:{}:{}",
                    id,
                    start,
                    end.unwrap_or("")
                ),
                &format!("coins/{}/ohlcv/historical", id),
                &query,
                TtlClass::Historical,
                unwrap,
            )
            .await
    }

    pub async fn exchanges(&self) -> FetchResult<Vec<PaprikaExchange>> {
        self.client
            .cached_as(
                "coinpaprika:exchanges",
                "exchanges",
                &[],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn coin_markets(&self, id: &str) -> FetchResult<Vec<PaprikaMarket>> {
        self.client
            .cached_as(
                &format!("coinpaprika:markets:{}", id),
                &format!("coins/{}/markets", id),
                &[],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn search(&self, query: &str, limit: usize) -> FetchResult<PaprikaSearch> {
        self.client
            .cached_as(
                &format!("coinpaprika:search:{}:{}", query.to_lowercase(), limit),
                "search",
                &[("q", query.to_owned()), ("limit", limit.to_string())],
                TtlClass::Static,
                unwrap,
            )
            .await
    }
}

fn rank_of(value: &Value) -> Option<u64> {
    crate::model::count(value).filter(|r| *r > 0)
}
