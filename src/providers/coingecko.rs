use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    model::count,
    Provider,
};
use itertools::Itertools;
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

pub const BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, Deserialize)]
struct SymbolMap {
    id: String,
    symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeckoMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: Value,
    #[serde(default)]
    pub market_cap: Value,
    #[serde(default)]
    pub market_cap_rank: Value,
    #[serde(default)]
    pub total_volume: Value,
    #[serde(default)]
    pub circulating_supply: Value,
    #[serde(default)]
    pub max_supply: Value,
    #[serde(default)]
    pub price_change_percentage_24h: Value,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Value,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Value,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeckoCommunity {
    #[serde(default)]
    pub twitter_followers: Value,
    #[serde(default)]
    pub reddit_subscribers: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeckoCoinMarketData {
    #[serde(default)]
    pub price_change_percentage_24h: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeckoCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub community_data: GeckoCommunity,
    #[serde(default)]
    pub market_data: GeckoCoinMarketData,
    #[serde(default)]
    pub sentiment_votes_up_percentage: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeckoGlobal {
    #[serde(default)]
    pub active_cryptocurrencies: Value,
    #[serde(default)]
    pub total_market_cap: HashMap<String, Value>,
    #[serde(default)]
    pub total_volume: HashMap<String, Value>,
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, Value>,
    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: Value,
}

/// Rate-limit and plan errors come back as `{"status": {"error_code", "error_message"}}`.
fn unwrap(provider: Provider, value: Value) -> FetchResult<Value> {
    let status = &value["status"];
    if status["error_code"].is_number() {
        let message = status["error_message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_owned();
        return Err(FetchError::api(provider, message));
    }
    Ok(value)
}

fn unwrap_data(provider: Provider, value: Value) -> FetchResult<Value> {
    unwrap(provider, value).and_then(|v| crate::http::data_envelope(provider, v))
}

pub struct CoinGeckoAPI {
    client: ProviderClient,
}

impl CoinGeckoAPI {
    pub fn new(fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self::with_base_url(BASE_URL, fetcher, cache)
    }

    pub fn with_base_url(
        base_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            client: ProviderClient::new(Provider::CoinGecko, base_url, fetcher, cache),
        }
    }

    /// Uppercased symbol to every CoinGecko id using it.
    pub async fn symbol_map(&self) -> FetchResult<HashMap<String, Vec<String>>> {
        let map_data: Vec<SymbolMap> = self
            .client
            .cached_as(
                "coingecko:coins:list",
                "coins/list",
                &[("include_platform", "false".to_owned())],
                TtlClass::Static,
                unwrap,
            )
            .await?;
        let mut result = HashMap::new();
        for datum in map_data {
            result
                .entry(datum.symbol.to_uppercase())
                .or_insert_with(Vec::new)
                .push(datum.id);
        }
        Ok(result)
    }

    pub async fn ids_for_symbol(&self, symbol: &str) -> FetchResult<Vec<String>> {
        let map = self.symbol_map().await?;
        map.get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                provider: Provider::CoinGecko,
                what: format!("symbol {}", symbol),
            })
    }

    /// Many tokens share a ticker (`btc` maps to `bitcoin` and to lookalikes),
    /// so the candidate with the best market cap rank wins. Unranked
    /// candidates sort last.
    pub async fn id_for_symbol(&self, symbol: &str) -> FetchResult<String> {
        let ids = self.ids_for_symbol(symbol).await?;
        if let [only] = ids.as_slice() {
            return Ok(only.clone());
        }
        let markets = self.markets_for_ids(&ids).await?;
        let best = markets
            .into_iter()
            .sorted_by_key(|m| count(&m.market_cap_rank).filter(|r| *r > 0).unwrap_or(u64::MAX))
            .next();
        match best {
            Some(market) => Ok(market.id),
            None => {
                warn!("no market data for {} candidates {:?}", symbol, ids);
                ids.into_iter().next().ok_or_else(|| FetchError::NotFound {
                    provider: Provider::CoinGecko,
                    what: format!("symbol {}", symbol),
                })
            }
        }
    }

    pub async fn markets_for_ids(&self, ids: &[String]) -> FetchResult<Vec<GeckoMarket>> {
        let ids = ids.iter().sorted().join(",");
        self.client
            .cached_as(
                &format!("coingecko:markets:ids:{}", ids),
                "coins/markets",
                &[("vs_currency", "usd".to_owned()), ("ids", ids.clone())],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn simple_price(
        &self,
        id_list: &[&str],
        in_currency: &str,
    ) -> FetchResult<Vec<(String, f64)>> {
        let ids = id_list.join(",");
        let res = self
            .client
            .cached(
                &format!("coingecko:price:{}:{}", ids, in_currency),
                "simple/price",
                &[("ids", ids.clone()), ("vs_currencies", in_currency.to_owned())],
                TtlClass::Ticker,
                unwrap,
            )
            .await?;
        id_list
            .iter()
            .map(|id| {
                res[id][in_currency]
                    .as_f64()
                    .map(|price| (id.to_string(), price))
                    .ok_or_else(|| FetchError::NotFound {
                        provider: Provider::CoinGecko,
                        what: format!("price for {}", id),
                    })
            })
            .collect()
    }

    pub async fn markets(&self, limit: usize, page: usize) -> FetchResult<Vec<GeckoMarket>> {
        self.client
            .cached_as(
                &format!("coingecko:markets:{}:{}", limit, page),
                "coins/markets",
                &[
                    ("vs_currency", "usd".to_owned()),
                    ("order", "market_cap_desc".to_owned()),
                    ("per_page", limit.to_string()),
                    ("page", page.to_string()),
                    ("price_change_percentage", "1h,24h,7d".to_owned()),
                ],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn coin(&self, id: &str) -> FetchResult<GeckoCoin> {
        self.client
            .cached_as(
                &format!("coingecko:coin:{}", id),
                &format!("coins/{}", id),
                &[
                    ("localization", "false".to_owned()),
                    ("tickers", "false".to_owned()),
                    ("market_data", "true".to_owned()),
                    ("community_data", "true".to_owned()),
                    ("developer_data", "false".to_owned()),
                ],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn global(&self) -> FetchResult<GeckoGlobal> {
        self.client
            .cached_as("coingecko:global", "global", &[], TtlClass::Short, unwrap_data)
            .await
    }
}
