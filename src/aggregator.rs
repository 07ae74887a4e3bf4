use crate::{
    cache::ResponseCache,
    derivatives::{self, DerivativesOverview, SymbolDerivatives},
    error::{FetchError, FetchResult},
    fallback::{first_success, non_empty, settle_all, settled, Attempt},
    http::HttpFetch,
    model::{count, num, NormalizedAsset, NormalizedExchange, NormalizedGlobalData},
    normalize,
    providers::{
        binance::Binance24hr, bitcoin::NetworkStats, messari::MessariAssetMetrics, Providers,
    },
    screener::{self, ScreenerQuery, ScreenerResult},
    sentiment::{
        classify, sentiment_score, summarize, CoinSentiment, Sentiment, SentimentSummary,
    },
    settings::{AggregateSettings, Settings},
    Provider,
};
use futures::join;
use itertools::Itertools;
use log::{error, info, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::{cmp::Ordering, sync::Arc, time::Duration};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveAsset {
    pub id: String,
    pub symbol: String,
    pub ticker: Option<NormalizedAsset>,
    pub metrics: Option<MessariAssetMetrics>,
    pub binance_24h: Option<Binance24hr>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSentiment {
    pub overall: Sentiment,
    pub summary: SentimentSummary,
    pub coins: Vec<CoinSentiment>,
}

/// Best-effort composite views across providers. Apart from
/// [`bitcoin_network_stats`](Self::bitcoin_network_stats) nothing here returns
/// an error: failures are logged and surface as empty or default values.
pub struct MarketAggregator {
    providers: Providers,
    cache: Arc<dyn ResponseCache>,
    settings: AggregateSettings,
}

impl MarketAggregator {
    pub fn new(
        providers: Providers,
        cache: Arc<dyn ResponseCache>,
        settings: AggregateSettings,
    ) -> Self {
        Self {
            providers,
            cache,
            settings,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let providers = Providers::new(&settings.keys, fetcher, cache.clone());
        Self::new(providers, cache, settings.aggregate.clone())
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub fn default_limit(&self) -> usize {
        self.settings.default_limit
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let hit = self.cache.get(key)?;
        match serde_json::from_value(hit) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("dropping unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        match serde_json::to_value(value) {
            Ok(json) => self.cache.set(key, json, Duration::from_secs(ttl_secs)),
            Err(e) => warn!("not caching {}: {}", key, e),
        }
    }

    /// CoinCap, then CoinPaprika, then CoinLore. Empty when all three fail.
    pub async fn aggregated_assets(&self, limit: usize) -> Vec<NormalizedAsset> {
        let key = format!("aggregate:assets:{}", limit);
        if let Some(hit) = self.cached(&key) {
            return hit;
        }
        let p = &self.providers;
        let attempts = vec![
            Attempt::new(Provider::CoinCap, async move {
                let rows = p.coincap.assets(limit, 0).await?;
                non_empty(
                    Provider::CoinCap,
                    rows.iter().map(normalize::coincap_asset).collect(),
                )
            }),
            Attempt::new(Provider::CoinPaprika, async move {
                let rows = p.coinpaprika.tickers(limit).await?;
                non_empty(
                    Provider::CoinPaprika,
                    rows.iter().map(normalize::coinpaprika_ticker).collect(),
                )
            }),
            Attempt::new(Provider::CoinLore, async move {
                let rows = p.coinlore.tickers(0, limit).await?;
                non_empty(
                    Provider::CoinLore,
                    rows.iter().map(normalize::coinlore_ticker).collect(),
                )
            }),
        ];
        match first_success("aggregated assets", attempts).await {
            Some((provider, assets)) => {
                info!("aggregated {} assets from {}", assets.len(), provider);
                self.store(&key, &assets, self.settings.assets_ttl_secs);
                assets
            }
            None => vec![],
        }
    }

    /// CoinPaprika and CoinLore in parallel; CoinPaprika wins per field and
    /// CoinLore fills the holes.
    pub async fn aggregated_global_data(&self) -> NormalizedGlobalData {
        const KEY: &str = "aggregate:global";
        if let Some(hit) = self.cached(KEY) {
            return hit;
        }
        let p = &self.providers;
        let results = settle_all(vec![
            Attempt::new(Provider::CoinPaprika, async move {
                Ok::<_, FetchError>(normalize::coinpaprika_global(
                    &p.coinpaprika.global().await?,
                ))
            }),
            Attempt::new(Provider::CoinLore, async move {
                Ok::<_, FetchError>(normalize::coinlore_global(&p.coinlore.global().await?))
            }),
        ])
        .await;

        let mut merged = NormalizedGlobalData::default();
        for (provider, result) in results {
            match result {
                Ok(data) => {
                    merged.fill_from(&data);
                    merged.sources.extend(data.sources);
                }
                Err(e) => warn!("global data: {} unavailable: {}", provider, e),
            }
        }
        if merged.sources.is_empty() {
            error!("global data: every provider failed");
            return merged;
        }
        self.store(KEY, &merged, self.settings.global_ttl_secs);
        merged
    }

    /// Highest volume first. Empty when every provider fails.
    pub async fn aggregated_exchanges(&self, limit: usize) -> Vec<NormalizedExchange> {
        let key = format!("aggregate:exchanges:{}", limit);
        if let Some(hit) = self.cached(&key) {
            return hit;
        }
        let p = &self.providers;
        let attempts = vec![
            Attempt::new(Provider::CoinCap, async move {
                let rows = p.coincap.exchanges().await?;
                non_empty(
                    Provider::CoinCap,
                    rows.iter().map(normalize::coincap_exchange).collect(),
                )
            }),
            Attempt::new(Provider::CoinPaprika, async move {
                let rows = p.coinpaprika.exchanges().await?;
                non_empty(
                    Provider::CoinPaprika,
                    rows.iter()
                        .filter(|e| e.active)
                        .map(normalize::coinpaprika_exchange)
                        .collect(),
                )
            }),
            Attempt::new(Provider::CoinLore, async move {
                let rows = p.coinlore.exchanges().await?;
                non_empty(
                    Provider::CoinLore,
                    rows.iter().map(normalize::coinlore_exchange).collect(),
                )
            }),
        ];
        match first_success("aggregated exchanges", attempts).await {
            Some((provider, exchanges)) => {
                let exchanges: Vec<NormalizedExchange> = exchanges
                    .into_iter()
                    .sorted_by(|a, b| match (a.volume_24h, b.volume_24h) {
                        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
                        (Some(_), None) => Ordering::Less,
                        (None, Some(_)) => Ordering::Greater,
                        (None, None) => Ordering::Equal,
                    })
                    .take(limit)
                    .collect();
                info!("aggregated {} exchanges from {}", exchanges.len(), provider);
                self.store(&key, &exchanges, self.settings.exchanges_ttl_secs);
                exchanges
            }
            None => vec![],
        }
    }

    pub async fn derivatives_overview(&self) -> DerivativesOverview {
        derivatives::overview(&self.providers.coinglass).await
    }

    pub async fn symbol_derivatives(&self, symbol: &str) -> SymbolDerivatives {
        derivatives::symbol_derivatives(&self.providers.coinglass, &self.providers.binance, symbol)
            .await
    }

    /// CoinPaprika ticker, Messari metrics and Binance 24h stats, each optional.
    /// `id` is the CoinPaprika id (`btc-bitcoin`); `slug` the Messari slug.
    pub async fn comprehensive_asset(&self, id: &str, symbol: &str, slug: &str) -> ComprehensiveAsset {
        let p = &self.providers;
        let pair = format!("{}USDT", symbol.to_uppercase());
        let (ticker, metrics, binance_24h) = join!(
            p.coinpaprika.ticker(id),
            p.messari.metrics(slug),
            p.binance.ticker_24hr(&pair),
        );
        ComprehensiveAsset {
            id: id.to_owned(),
            symbol: symbol.to_lowercase(),
            ticker: settled("ticker", ticker).map(|t| normalize::coinpaprika_ticker(&t)),
            metrics: settled("metrics", metrics),
            binance_24h: settled("binance 24h", binance_24h),
        }
    }

    /// Needs all four blockchain.info figures, so this one can fail.
    pub async fn bitcoin_network_stats(&self) -> FetchResult<NetworkStats> {
        self.providers.bitcoin.network_stats().await
    }

    /// CoinGecko markets, or the aggregated assets when CoinGecko is down.
    pub async fn market_sentiment(&self, limit: usize) -> MarketSentiment {
        let assets = match self.providers.coingecko.markets(limit, 1).await {
            Ok(markets) if !markets.is_empty() => markets
                .iter()
                .map(normalize::coingecko_market)
                .collect::<Vec<_>>(),
            Ok(_) => self.aggregated_assets(limit).await,
            Err(e) => {
                warn!("market sentiment: {}, using aggregated assets", e);
                self.aggregated_assets(limit).await
            }
        };
        let summary = summarize(&assets);
        let coins = assets
            .iter()
            .map(|a| CoinSentiment {
                id: a.id.clone(),
                symbol: a.symbol.clone(),
                name: a.name.clone(),
                change_24h: a.change_24h,
                twitter_followers: None,
                score: sentiment_score(a.change_24h, None),
                sentiment: classify(a.change_24h),
            })
            .collect();
        MarketSentiment {
            overall: summary.overall(),
            summary,
            coins,
        }
    }

    /// Resolves `symbol` through CoinGecko and scores it with its follower count.
    pub async fn coin_sentiment(&self, symbol: &str) -> FetchResult<CoinSentiment> {
        let gecko = &self.providers.coingecko;
        let id = gecko.id_for_symbol(symbol).await?;
        let coin = gecko.coin(&id).await?;
        let change_24h = num(&coin.market_data.price_change_percentage_24h);
        let followers = count(&coin.community_data.twitter_followers);
        Ok(CoinSentiment {
            id: coin.id,
            symbol: coin.symbol.to_lowercase(),
            name: coin.name,
            change_24h,
            twitter_followers: followers,
            score: sentiment_score(change_24h, followers),
            sentiment: classify(change_24h),
        })
    }

    /// Screens the top `universe` aggregated assets.
    pub async fn screen(&self, query: &ScreenerQuery, universe: usize) -> ScreenerResult {
        let assets = self.aggregated_assets(universe).await;
        screener::screen(&assets, query)
    }
}
