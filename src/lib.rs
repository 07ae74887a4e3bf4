//! Market data aggregation over public crypto REST providers.
//!
//! Every provider client goes through [`http::ProviderClient`], which checks an
//! injected [`cache::ResponseCache`] before calling out through an
//! [`http::HttpFetch`]. [`aggregator::MarketAggregator`] layers fallback chains
//! and settle-all fan-out on top, and [`screener`] filters the result.

pub mod aggregator;
pub mod cache;
pub mod derivatives;
pub mod error;
pub mod fallback;
pub mod http;
pub mod model;
pub mod normalize;
pub mod providers;
pub mod screener;
pub mod sentiment;
pub mod server;
pub mod settings;

use serde::Serialize;
use std::fmt;

pub use aggregator::MarketAggregator;
pub use cache::{MemoryCache, ResponseCache, TtlClass};
pub use error::{FetchError, FetchResult};
pub use http::{ApiRequest, HttpFetch, ReqwestFetcher};
pub use model::{AssetSource, NormalizedAsset, NormalizedExchange, NormalizedGlobalData};
pub use providers::Providers;
pub use settings::Settings;

/// Upstream services this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Provider {
    CoinCap,
    CoinPaprika,
    CoinLore,
    CoinGecko,
    Binance,
    Messari,
    Coinglass,
    CryptoCompare,
    Mempool,
    BlockchainInfo,
    DefiLlama,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::CoinCap => "CoinCap",
            Provider::CoinPaprika => "CoinPaprika",
            Provider::CoinLore => "CoinLore",
            Provider::CoinGecko => "CoinGecko",
            Provider::Binance => "Binance",
            Provider::Messari => "Messari",
            Provider::Coinglass => "Coinglass",
            Provider::CryptoCompare => "CryptoCompare",
            Provider::Mempool => "Mempool",
            Provider::BlockchainInfo => "Blockchain.info",
            Provider::DefiLlama => "DeFiLlama",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
