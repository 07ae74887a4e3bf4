pub mod binance;
pub mod bitcoin;
pub mod coincap;
pub mod coingecko;
pub mod coinglass;
pub mod coinlore;
pub mod coinpaprika;
pub mod cryptocompare;
pub mod messari;
pub mod yields;

use crate::{cache::ResponseCache, http::HttpFetch, settings::ApiKeys};
use std::sync::Arc;

pub use binance::BinanceAPI;
pub use bitcoin::BitcoinAPI;
pub use coincap::CoinCapAPI;
pub use coingecko::CoinGeckoAPI;
pub use coinglass::CoinglassAPI;
pub use coinlore::CoinLoreAPI;
pub use coinpaprika::CoinPaprikaAPI;
pub use cryptocompare::CryptoCompareAPI;
pub use messari::MessariAPI;
pub use yields::DefiYieldsAPI;

/// Every provider client, sharing one fetcher and one cache.
pub struct Providers {
    pub coincap: CoinCapAPI,
    pub coinpaprika: CoinPaprikaAPI,
    pub coinlore: CoinLoreAPI,
    pub coingecko: CoinGeckoAPI,
    pub binance: BinanceAPI,
    pub messari: MessariAPI,
    pub coinglass: CoinglassAPI,
    pub cryptocompare: CryptoCompareAPI,
    pub bitcoin: BitcoinAPI,
    pub yields: DefiYieldsAPI,
}

impl Providers {
    pub fn new(keys: &ApiKeys, fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            coincap: CoinCapAPI::new(fetcher.clone(), cache.clone()),
            coinpaprika: CoinPaprikaAPI::new(fetcher.clone(), cache.clone()),
            coinlore: CoinLoreAPI::new(fetcher.clone(), cache.clone()),
            coingecko: CoinGeckoAPI::new(fetcher.clone(), cache.clone()),
            binance: BinanceAPI::new(fetcher.clone(), cache.clone()),
            messari: MessariAPI::new(keys.messari.as_deref(), fetcher.clone(), cache.clone()),
            coinglass: CoinglassAPI::new(keys.coinglass.as_deref(), fetcher.clone(), cache.clone()),
            cryptocompare: CryptoCompareAPI::new(
                keys.cryptocompare.as_deref(),
                fetcher.clone(),
                cache.clone(),
            ),
            bitcoin: BitcoinAPI::new(fetcher.clone(), cache.clone()),
            yields: DefiYieldsAPI::new(fetcher, cache),
        }
    }
}
