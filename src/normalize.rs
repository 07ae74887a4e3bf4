//! Provider payloads mapped into the common `Normalized*` shapes.
//!
//! Pure functions: no network, no cache. Numbers may arrive as JSON numbers or
//! strings; either way the output holds finite `f64`s or `None`.

use crate::{
    model::{
        count, num, text, AssetSource, NormalizedAsset, NormalizedExchange, NormalizedGlobalData,
    },
    providers::{
        coincap::{CoinCapAsset, CoinCapExchange},
        coingecko::GeckoMarket,
        coinlore::{CoinLoreExchange, CoinLoreGlobal, CoinLoreTicker},
        coinpaprika::{PaprikaExchange, PaprikaGlobal, PaprikaTicker},
    },
};
use serde_json::Value;

fn rank(value: &Value) -> Option<u32> {
    count(value).filter(|r| *r > 0).map(|r| r as u32)
}

/// A max supply of zero means "uncapped" for most providers.
fn max_supply(value: &Value) -> Option<f64> {
    num(value).filter(|n| *n > 0.0)
}

pub fn coincap_asset(asset: &CoinCapAsset) -> NormalizedAsset {
    NormalizedAsset {
        id: asset.id.clone(),
        symbol: asset.symbol.to_lowercase(),
        name: asset.name.clone(),
        rank: rank(&asset.rank),
        price: num(&asset.price_usd),
        market_cap: num(&asset.market_cap_usd),
        volume_24h: num(&asset.volume_usd_24h),
        change_1h: None,
        change_24h: num(&asset.change_percent_24h),
        change_7d: None,
        supply: num(&asset.supply),
        max_supply: max_supply(&asset.max_supply),
        last_updated: None,
        source: AssetSource::Coincap,
    }
}

pub fn coinpaprika_ticker(ticker: &PaprikaTicker) -> NormalizedAsset {
    let usd = ticker.usd().cloned().unwrap_or_default();
    NormalizedAsset {
        id: ticker.id.clone(),
        symbol: ticker.symbol.to_lowercase(),
        name: ticker.name.clone(),
        rank: rank(&ticker.rank),
        price: num(&usd.price),
        market_cap: num(&usd.market_cap),
        volume_24h: num(&usd.volume_24h),
        change_1h: num(&usd.percent_change_1h),
        change_24h: num(&usd.percent_change_24h),
        change_7d: num(&usd.percent_change_7d),
        supply: num(&ticker.circulating_supply),
        max_supply: max_supply(&ticker.max_supply),
        last_updated: ticker.last_updated.clone(),
        source: AssetSource::Coinpaprika,
    }
}

pub fn coinlore_ticker(ticker: &CoinLoreTicker) -> NormalizedAsset {
    NormalizedAsset {
        id: ticker.nameid.clone().unwrap_or_else(|| ticker.id.clone()),
        symbol: ticker.symbol.to_lowercase(),
        name: ticker.name.clone(),
        rank: rank(&ticker.rank),
        price: num(&ticker.price_usd),
        market_cap: num(&ticker.market_cap_usd),
        volume_24h: num(&ticker.volume24),
        change_1h: num(&ticker.percent_change_1h),
        change_24h: num(&ticker.percent_change_24h),
        change_7d: num(&ticker.percent_change_7d),
        supply: num(&ticker.csupply),
        max_supply: max_supply(&ticker.msupply),
        last_updated: None,
        source: AssetSource::Coinlore,
    }
}

pub fn coingecko_market(market: &GeckoMarket) -> NormalizedAsset {
    NormalizedAsset {
        id: market.id.clone(),
        symbol: market.symbol.to_lowercase(),
        name: market.name.clone(),
        rank: rank(&market.market_cap_rank),
        price: num(&market.current_price),
        market_cap: num(&market.market_cap),
        volume_24h: num(&market.total_volume),
        change_1h: num(&market.price_change_percentage_1h_in_currency),
        change_24h: num(&market.price_change_percentage_24h),
        change_7d: num(&market.price_change_percentage_7d_in_currency),
        supply: num(&market.circulating_supply),
        max_supply: max_supply(&market.max_supply),
        last_updated: market.last_updated.clone(),
        source: AssetSource::Coingecko,
    }
}

/// CoinPaprika has no ETH dominance; that hole is left for another provider.
pub fn coinpaprika_global(global: &PaprikaGlobal) -> NormalizedGlobalData {
    NormalizedGlobalData {
        total_market_cap: num(&global.market_cap_usd),
        total_volume_24h: num(&global.volume_24h_usd),
        btc_dominance: num(&global.bitcoin_dominance_percentage),
        eth_dominance: None,
        total_coins: count(&global.cryptocurrencies_number),
        market_cap_change_24h: num(&global.market_cap_change_24h),
        sources: vec![AssetSource::Coinpaprika.to_string()],
    }
}

pub fn coinlore_global(global: &CoinLoreGlobal) -> NormalizedGlobalData {
    NormalizedGlobalData {
        total_market_cap: num(&global.total_mcap),
        total_volume_24h: num(&global.total_volume),
        btc_dominance: num(&global.btc_d),
        eth_dominance: num(&global.eth_d),
        total_coins: count(&global.coins_count),
        market_cap_change_24h: num(&global.mcap_change),
        sources: vec![AssetSource::Coinlore.to_string()],
    }
}

pub fn coincap_exchange(exchange: &CoinCapExchange) -> NormalizedExchange {
    NormalizedExchange {
        id: exchange.exchange_id.clone(),
        name: exchange.name.clone(),
        rank: rank(&exchange.rank),
        volume_24h: num(&exchange.volume_usd),
        markets: count(&exchange.trading_pairs),
        url: exchange.exchange_url.clone(),
        source: AssetSource::Coincap,
    }
}

pub fn coinpaprika_exchange(exchange: &PaprikaExchange) -> NormalizedExchange {
    let volume = exchange.quotes.get("USD").and_then(|q| {
        num(&q.adjusted_volume_24h).or_else(|| num(&q.reported_volume_24h))
    });
    NormalizedExchange {
        id: exchange.id.clone(),
        name: exchange.name.clone(),
        rank: rank(&exchange.adjusted_rank),
        volume_24h: volume,
        markets: count(&exchange.markets),
        url: exchange
            .links
            .as_ref()
            .and_then(|l| l.website.first().cloned()),
        source: AssetSource::Coinpaprika,
    }
}

pub fn coinlore_exchange(exchange: &CoinLoreExchange) -> NormalizedExchange {
    NormalizedExchange {
        id: exchange
            .name_id
            .clone()
            .or_else(|| text(&exchange.id))
            .unwrap_or_else(|| exchange.name.to_lowercase()),
        name: exchange.name.clone(),
        rank: None,
        volume_24h: num(&exchange.volume_usd),
        markets: count(&exchange.active_pairs),
        url: exchange.url.clone(),
        source: AssetSource::Coinlore,
    }
}
