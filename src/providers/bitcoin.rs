use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{raw, HttpFetch, ProviderClient},
    model::num,
    Provider,
};
use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const MEMPOOL_URL: &str = "https://mempool.space/api";
pub const BLOCKCHAIN_INFO_URL: &str = "https://blockchain.info/q";

const SATOSHIS_PER_BTC: f64 = 100_000_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: f64,
    pub half_hour_fee: f64,
    pub hour_fee: f64,
    #[serde(default)]
    pub economy_fee: f64,
    #[serde(default)]
    pub minimum_fee: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub height: u64,
    pub timestamp: i64,
    pub tx_count: u64,
    pub size: u64,
    #[serde(default)]
    pub weight: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: String,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub weight: u64,
    pub status: TxStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainStats {
    pub funded_txo_sum: u64,
    pub spent_txo_sum: u64,
    pub tx_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    #[serde(default)]
    pub chain_stats: ChainStats,
    #[serde(default)]
    pub mempool_stats: ChainStats,
}

impl AddressInfo {
    /// Confirmed plus pending balance, in satoshis.
    pub fn balance_sats(&self) -> i64 {
        let confirmed = self.chain_stats.funded_txo_sum as i64 - self.chain_stats.spent_txo_sum as i64;
        let pending =
            self.mempool_stats.funded_txo_sum as i64 - self.mempool_stats.spent_txo_sum as i64;
        confirmed + pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolStats {
    pub count: u64,
    pub vsize: u64,
    pub total_fee: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustment {
    pub progress_percent: f64,
    pub difficulty_change: f64,
    pub estimated_retarget_date: i64,
    pub remaining_blocks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub difficulty: f64,
    pub block_height: u64,
    pub hashrate_ghs: f64,
    pub circulating_btc: f64,
}

fn tx_ttl(payload: &Value) -> TtlClass {
    if payload["status"]["confirmed"].as_bool() == Some(true) {
        TtlClass::Immutable
    } else {
        TtlClass::Ticker
    }
}

pub struct BitcoinAPI {
    mempool: ProviderClient,
    chain_info: ProviderClient,
}

impl BitcoinAPI {
    pub fn new(fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self::with_base_urls(MEMPOOL_URL, BLOCKCHAIN_INFO_URL, fetcher, cache)
    }

    pub fn with_base_urls(
        mempool_url: &str,
        chain_info_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            mempool: ProviderClient::new(Provider::Mempool, mempool_url, fetcher.clone(), cache.clone()),
            chain_info: ProviderClient::new(Provider::BlockchainInfo, chain_info_url, fetcher, cache),
        }
    }

    pub async fn recommended_fees(&self) -> FetchResult<RecommendedFees> {
        self.mempool
            .cached_as(
                "mempool:fees:recommended",
                "v1/fees/recommended",
                &[],
                TtlClass::Ticker,
                raw,
            )
            .await
    }

    /// The tip moves, so the list itself is short-lived.
    pub async fn recent_blocks(&self) -> FetchResult<Vec<Block>> {
        self.mempool
            .cached_as("mempool:blocks", "blocks", &[], TtlClass::Short, raw)
            .await
    }

    pub async fn block(&self, hash: &str) -> FetchResult<Block> {
        self.mempool
            .cached_as(
                &format!("mempool:block:{}", hash),
                &format!("block/{}", hash),
                &[],
                TtlClass::Immutable,
                raw,
            )
            .await
    }

    /// Confirmed transactions are kept for the life of the process.
    pub async fn transaction(&self, txid: &str) -> FetchResult<Transaction> {
        self.mempool
            .cached_as_with(
                &format!("mempool:tx:{}", txid),
                &format!("tx/{}", txid),
                &[],
                raw,
                tx_ttl,
            )
            .await
    }

    pub async fn address(&self, address: &str) -> FetchResult<AddressInfo> {
        self.mempool
            .cached_as(
                &format!("mempool:address:{}", address),
                &format!("address/{}", address),
                &[],
                TtlClass::Short,
                raw,
            )
            .await
    }

    pub async fn mempool_stats(&self) -> FetchResult<MempoolStats> {
        self.mempool
            .cached_as("mempool:stats", "mempool", &[], TtlClass::Ticker, raw)
            .await
    }

    pub async fn difficulty_adjustment(&self) -> FetchResult<DifficultyAdjustment> {
        self.mempool
            .cached_as(
                "mempool:difficulty-adjustment",
                "v1/difficulty-adjustment",
                &[],
                TtlClass::Short,
                raw,
            )
            .await
    }

    /// blockchain.info's `q/` endpoints answer with a bare number.
    async fn query_number(&self, name: &str) -> FetchResult<f64> {
        self.chain_info
            .cached_parsed(
                &format!("blockchaininfo:{}", name),
                name,
                &[],
                raw,
                |payload| {
                    num(payload).ok_or_else(|| {
                        FetchError::decode(
                            Provider::BlockchainInfo,
                            format!("{} is not a number", name),
                        )
                    })
                },
                |_| TtlClass::Short,
            )
            .await
    }

    /// All four queries are required; the first failure fails the whole call.
    pub async fn network_stats(&self) -> FetchResult<NetworkStats> {
        let (difficulty, block_height, hashrate, total_sats) = future::try_join4(
            self.query_number("getdifficulty"),
            self.query_number("getblockcount"),
            self.query_number("hashrate"),
            self.query_number("totalbc"),
        )
        .await?;
        Ok(NetworkStats {
            difficulty,
            block_height: block_height as u64,
            hashrate_ghs: hashrate,
            circulating_btc: total_sats / SATOSHIS_PER_BTC,
        })
    }
}
