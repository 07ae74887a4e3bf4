use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    Provider,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{cmp::Ordering, sync::Arc};

pub const BASE_URL: &str = "https://yields.llama.fi";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldPool {
    pub pool: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    #[serde(default)]
    pub tvl_usd: Option<f64>,
    #[serde(default)]
    pub apy: Option<f64>,
    #[serde(default)]
    pub apy_base: Option<f64>,
    #[serde(default)]
    pub apy_reward: Option<f64>,
    #[serde(default)]
    pub stablecoin: bool,
    #[serde(default)]
    pub il_risk: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolChartPoint {
    pub timestamp: String,
    #[serde(default)]
    pub tvl_usd: Option<f64>,
    #[serde(default)]
    pub apy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedianApy {
    pub timestamp: String,
    #[serde(default)]
    pub unique_pools: u64,
    #[serde(rename = "medianAPY", default)]
    pub median_apy: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PoolQuery<'a> {
    pub chain: Option<&'a str>,
    pub min_tvl_usd: f64,
    pub stablecoin_only: bool,
    pub limit: usize,
}

/// `{status: "success", data}`; any other status is an error.
fn unwrap(provider: Provider, mut value: Value) -> FetchResult<Value> {
    let status = value["status"].as_str().map(str::to_owned);
    match status.as_deref() {
        Some("success") | Some("ok") => match value.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(FetchError::decode(provider, "missing `data` field")),
        },
        other => Err(FetchError::api(
            provider,
            format!("status {}", other.unwrap_or("missing")),
        )),
    }
}

pub struct DefiYieldsAPI {
    client: ProviderClient,
}

impl DefiYieldsAPI {
    pub fn new(fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self::with_base_url(BASE_URL, fetcher, cache)
    }

    pub fn with_base_url(
        base_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            client: ProviderClient::new(Provider::DefiLlama, base_url, fetcher, cache),
        }
    }

    pub async fn pools(&self) -> FetchResult<Vec<YieldPool>> {
        self.client
            .cached_as("defillama:yields:pools", "pools", &[], TtlClass::Short, unwrap)
            .await
    }

    pub async fn pool_chart(&self, pool_id: &str) -> FetchResult<Vec<PoolChartPoint>> {
        self.client
            .cached_as(
                &format!("defillama:yields:chart:{}", pool_id),
                &format!("chart/{}", pool_id),
                &[],
                TtlClass::Historical,
                unwrap,
            )
            .await
    }

    pub async fn median(&self) -> FetchResult<Vec<MedianApy>> {
        self.client
            .cached_as("defillama:yields:median", "median", &[], TtlClass::Historical, unwrap)
            .await
    }

    /// Highest-APY pools matching `query`, filtered client-side.
    pub async fn top_pools(&self, query: &PoolQuery<'_>) -> FetchResult<Vec<YieldPool>> {
        let pools = self.pools().await?;
        Ok(rank_pools(pools, query))
    }
}

pub fn rank_pools(pools: Vec<YieldPool>, query: &PoolQuery<'_>) -> Vec<YieldPool> {
    pools
        .into_iter()
        .filter(|p| {
            query
                .chain
                .map_or(true, |chain| p.chain.eq_ignore_ascii_case(chain))
        })
        .filter(|p| p.tvl_usd.unwrap_or(0.0) >= query.min_tvl_usd)
        .filter(|p| !query.stablecoin_only || p.stablecoin)
        .filter(|p| p.apy.map_or(false, f64::is_finite))
        .sorted_by(|a, b| {
            b.apy
                .partial_cmp(&a.apy)
                .unwrap_or(Ordering::Equal)
        })
        .take(query.limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(id: &str, chain: &str, tvl: f64, apy: f64) -> YieldPool {
        YieldPool {
            pool: id.to_owned(),
            chain: chain.to_owned(),
            project: "aave-v3".to_owned(),
            symbol: "USDC".to_owned(),
            tvl_usd: Some(tvl),
            apy: Some(apy),
            apy_base: None,
            apy_reward: None,
            stablecoin: true,
            il_risk: None,
        }
    }

    #[test]
    fn rank_pools_filters_then_orders_by_apy() {
        let pools = vec![
            pool("a", "Ethereum", 5e6, 4.0),
            pool("b", "Arbitrum", 5e6, 9.0),
            pool("c", "Ethereum", 1e3, 40.0),
            pool("d", "ethereum", 2e7, 6.5),
        ];
        let query = PoolQuery {
            chain: Some("Ethereum"),
            min_tvl_usd: 1e6,
            stablecoin_only: false,
            limit: 10,
        };
        let ids: Vec<_> = rank_pools(pools, &query).into_iter().map(|p| p.pool).collect();
        assert_eq!(ids, vec!["d", "a"]);
    }
}
