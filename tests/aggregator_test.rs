mod common;

use common::{cache, init_logger, MockFetcher};
use marketfeed::{
    derivatives::DerivativesOverview,
    screener::{Field, FilterValue, Operator, ScreenerFilter, ScreenerQuery, SortDirection},
    sentiment::Sentiment,
    AssetSource, MarketAggregator, Provider, Settings,
};
use serde_json::{json, Value};
use std::sync::Arc;

const COINCAP_ASSETS: &str = "https://api.coincap.io/v2/assets";
const PAPRIKA_TICKERS: &str = "https://api.coinpaprika.com/v1/tickers";
const LORE_TICKERS: &str = "https://api.coinlore.net/api/tickers/";
const PAPRIKA_GLOBAL: &str = "https://api.coinpaprika.com/v1/global";
const LORE_GLOBAL: &str = "https://api.coinlore.net/api/global/";

fn aggregator(fetcher: &Arc<MockFetcher>) -> MarketAggregator {
    MarketAggregator::from_settings(&Settings::default(), fetcher.clone(), cache())
}

fn paprika_ticker(id: &str, symbol: &str, rank: u32, price: f64, change_24h: f64) -> Value {
    json!({
        "id": id, "name": symbol, "symbol": symbol, "rank": rank,
        "circulating_supply": 1000, "max_supply": 0,
        "quotes": {"USD": {
            "price": price, "market_cap": price * 1000.0, "volume_24h": price * 100.0,
            "percent_change_24h": change_24h
        }}
    })
}

#[tokio::test]
async fn test_assets_fall_back_to_coinpaprika() {
    init_logger();
    let fetcher = MockFetcher::new();
    fetcher.fail(COINCAP_ASSETS, Provider::CoinCap, 503);
    fetcher.respond(
        PAPRIKA_TICKERS,
        json!([
            paprika_ticker("eth-ethereum", "ETH", 2, 2300.0, 1.0),
            paprika_ticker("btc-bitcoin", "BTC", 1, 42000.0, 2.0),
            paprika_ticker("dead-coin", "DEAD", 0, 1.0, 0.0),
            paprika_ticker("sol-solana", "SOL", 3, 100.0, -1.0)
        ]),
    );
    let agg = aggregator(&fetcher);

    let assets = agg.aggregated_assets(2).await;
    let ids: Vec<&str> = assets.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["btc-bitcoin", "eth-ethereum"]);
    assert!(assets.iter().all(|a| a.source == AssetSource::Coinpaprika));
    assert_eq!(fetcher.calls_to(COINCAP_ASSETS), 1);
    assert_eq!(fetcher.calls_to(LORE_TICKERS), 0);

    // the aggregate itself is cached
    let again = agg.aggregated_assets(2).await;
    assert_eq!(again, assets);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_empty_provider_list_counts_as_failure() {
    let fetcher = MockFetcher::new();
    fetcher.respond(COINCAP_ASSETS, json!({"data": [], "timestamp": 1}));
    fetcher.fail(PAPRIKA_TICKERS, Provider::CoinPaprika, 429);
    fetcher.respond(
        LORE_TICKERS,
        json!({"data": [{
            "id": "90", "symbol": "BTC", "name": "Bitcoin", "nameid": "bitcoin", "rank": 1,
            "price_usd": "42000", "percent_change_24h": "0.5", "market_cap_usd": "820000000000",
            "volume24": 1.5e10, "csupply": "19500000", "msupply": "21000000"
        }]}),
    );
    let assets = aggregator(&fetcher).aggregated_assets(10).await;
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].id, "bitcoin");
    assert_eq!(assets[0].source, AssetSource::Coinlore);
}

#[tokio::test]
async fn test_all_providers_down_yields_empty_and_nothing_cached() {
    let fetcher = MockFetcher::new();
    let agg = aggregator(&fetcher);
    assert!(agg.aggregated_assets(5).await.is_empty());
    assert_eq!(fetcher.calls(), 3);
    assert!(agg.aggregated_assets(5).await.is_empty());
    assert_eq!(fetcher.calls(), 6);
}

#[tokio::test]
async fn test_global_data_merges_both_sources() {
    let fetcher = MockFetcher::new();
    fetcher.respond(
        PAPRIKA_GLOBAL,
        json!({
            "market_cap_usd": 1700000000000u64, "volume_24h_usd": 60000000000u64,
            "bitcoin_dominance_percentage": 51.2, "cryptocurrencies_number": 9000,
            "market_cap_change_24h": 1.3
        }),
    );
    fetcher.respond(
        LORE_GLOBAL,
        json!([{
            "coins_count": 12000, "total_mcap": 1690000000000.0, "total_volume": 59000000000.0,
            "btc_d": "51.00", "eth_d": "17.20", "mcap_change": "1.10"
        }]),
    );
    let agg = aggregator(&fetcher);
    let global = agg.aggregated_global_data().await;
    assert_eq!(global.total_market_cap, Some(1.7e12));
    assert_eq!(global.btc_dominance, Some(51.2));
    assert_eq!(global.eth_dominance, Some(17.2));
    assert_eq!(global.total_coins, Some(9000));
    assert_eq!(global.sources, vec!["coinpaprika".to_owned(), "coinlore".to_owned()]);

    let cached = agg.aggregated_global_data().await;
    assert_eq!(cached, global);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_global_data_survives_one_failure() {
    let fetcher = MockFetcher::new();
    fetcher.respond(
        LORE_GLOBAL,
        json!([{"coins_count": 12000, "total_mcap": 1.69e12, "btc_d": "51.00", "eth_d": "17.20"}]),
    );
    let global = aggregator(&fetcher).aggregated_global_data().await;
    assert_eq!(global.sources, vec!["coinlore".to_owned()]);
    assert_eq!(global.total_market_cap, Some(1.69e12));
    assert_eq!(global.total_volume_24h, None);
}

#[tokio::test]
async fn test_global_data_all_down_is_empty_default() {
    let fetcher = MockFetcher::new();
    let agg = aggregator(&fetcher);
    let global = agg.aggregated_global_data().await;
    assert!(global.sources.is_empty());
    assert_eq!(global.total_market_cap, None);
    agg.aggregated_global_data().await;
    assert_eq!(fetcher.calls(), 4);
}

#[tokio::test]
async fn test_exchanges_sorted_by_volume() {
    let fetcher = MockFetcher::new();
    fetcher.respond(
        "https://api.coincap.io/v2/exchanges",
        json!({"data": [
            {"exchangeId": "kraken", "name": "Kraken", "rank": "3", "volumeUsd": "2000"},
            {"exchangeId": "binance", "name": "Binance", "rank": "1", "volumeUsd": "9000"},
            {"exchangeId": "ghost", "name": "Ghost", "rank": "9", "volumeUsd": null},
            {"exchangeId": "coinbase", "name": "Coinbase", "rank": "2", "volumeUsd": "5000"}
        ]}),
    );
    let exchanges = aggregator(&fetcher).aggregated_exchanges(3).await;
    let ids: Vec<&str> = exchanges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["binance", "coinbase", "kraken"]);
}

#[tokio::test]
async fn test_derivatives_degrade_to_empty_fields() {
    let fetcher = MockFetcher::new();
    let agg = aggregator(&fetcher);
    assert_eq!(agg.derivatives_overview().await, DerivativesOverview::default());

    fetcher.respond(
        "https://open-api.coinglass.com/public/v2/open_interest",
        json!({"code": "0", "msg": "success", "data": [
            {"exchangeName": "All", "openInterest": 15000000000.0, "h24Change": 2.5},
            {"exchangeName": "Binance", "openInterest": 6000000000.0},
            {"exchangeName": "OKX", "openInterest": 4000000000.0}
        ]}),
    );
    let btc = agg.symbol_derivatives("btc").await;
    assert_eq!(btc.symbol, "BTC");
    let oi = btc.open_interest.unwrap();
    assert_eq!(oi.total_usd, Some(1.5e10));
    assert_eq!(oi.change_24h, Some(2.5));
    assert_eq!(oi.exchanges, 2);
    assert!(btc.funding.is_none());
    assert!(btc.premium_index.is_none());
}

#[tokio::test]
async fn test_screen_runs_over_aggregated_assets() {
    let fetcher = MockFetcher::new();
    fetcher.respond(
        COINCAP_ASSETS,
        json!({"data": [
            {"id": "bitcoin", "rank": "1", "symbol": "BTC", "name": "Bitcoin",
             "marketCapUsd": "800000000000", "volumeUsd24Hr": "20000000000", "changePercent24Hr": "3.0"},
            {"id": "ethereum", "rank": "2", "symbol": "ETH", "name": "Ethereum",
             "marketCapUsd": "280000000000", "volumeUsd24Hr": "9000000000", "changePercent24Hr": "-2.0"},
            {"id": "tiny", "rank": "3", "symbol": "TINY", "name": "Tiny",
             "marketCapUsd": "5000000", "volumeUsd24Hr": "10000", "changePercent24Hr": "9.0"}
        ]}),
    );
    let agg = aggregator(&fetcher);
    let query = ScreenerQuery::new(vec![ScreenerFilter::new(
        Field::MarketCap,
        Operator::Gte,
        FilterValue::Number(1e9),
    )
    .unwrap()])
    .sorted_by(Field::Change24h, SortDirection::Asc);
    let result = agg.screen(&query, 10).await;
    assert_eq!(result.total, 2);
    assert_eq!(result.assets[0].id, "ethereum");

    let mood = agg.market_sentiment(10).await;
    assert_eq!(mood.summary.bullish, 2);
    assert_eq!(mood.summary.bearish, 1);
    assert_eq!(mood.overall, Sentiment::Bullish);
    assert_eq!(mood.coins.len(), 3);
    assert_eq!(mood.coins[0].score, 9);
}

#[tokio::test]
async fn test_coin_sentiment_uses_follower_count() {
    let fetcher = MockFetcher::new();
    fetcher.respond(
        "https://api.coingecko.com/api/v3/coins/list",
        json!([{"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}]),
    );
    fetcher.respond(
        "https://api.coingecko.com/api/v3/coins/bitcoin",
        json!({
            "id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
            "community_data": {"twitter_followers": 1000000},
            "market_data": {"price_change_percentage_24h": 2.5}
        }),
    );
    let agg = aggregator(&fetcher);
    let coin = agg.coin_sentiment("BTC").await.unwrap();
    assert_eq!(coin.twitter_followers, Some(1_000_000));
    assert_eq!(coin.score, 20);
    assert_eq!(coin.sentiment, Sentiment::Bullish);

    assert!(agg.coin_sentiment("nope").await.is_err());
}

#[tokio::test]
async fn test_comprehensive_asset_keeps_partial_data() {
    let fetcher = MockFetcher::new();
    fetcher.respond(
        "https://api.coinpaprika.com/v1/tickers/btc-bitcoin",
        paprika_ticker("btc-bitcoin", "BTC", 1, 42000.0, 2.0),
    );
    fetcher.respond(
        "https://api.binance.com/api/v3/ticker/24hr",
        json!({
            "symbol": "BTCUSDT", "priceChange": "800.0", "priceChangePercent": "1.9",
            "lastPrice": "42000.0", "highPrice": "42500.0", "lowPrice": "41000.0",
            "volume": "25000.0", "quoteVolume": "1050000000.0", "count": 1200000
        }),
    );
    let asset = aggregator(&fetcher)
        .comprehensive_asset("btc-bitcoin", "BTC", "bitcoin")
        .await;
    assert_eq!(asset.symbol, "btc");
    assert_eq!(asset.ticker.unwrap().price, Some(42000.0));
    assert!(asset.metrics.is_none());
    assert_eq!(asset.binance_24h.unwrap().symbol, "BTCUSDT");
    let binance = fetcher
        .last_request_to("https://api.binance.com/api/v3/ticker/24hr")
        .unwrap();
    assert_eq!(binance.query_value("symbol"), Some("BTCUSDT"));
}

#[tokio::test]
async fn test_market_sentiment_prefers_coingecko() {
    init_logger();
    let fetcher = MockFetcher::new();
    fetcher.respond(
        "https://api.coingecko.com/api/v3/coins/markets",
        json!([
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 42000,
             "market_cap": 8.2e11, "market_cap_rank": 1, "price_change_percentage_24h": -1.5},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 2300,
             "market_cap": 2.8e11, "market_cap_rank": 2, "price_change_percentage_24h": -0.5}
        ]),
    );
    let mood = aggregator(&fetcher).market_sentiment(2).await;
    assert_eq!(mood.overall, Sentiment::Bearish);
    assert_eq!(mood.summary.average_change_24h, Some(-1.0));
    assert_eq!(fetcher.calls_to(COINCAP_ASSETS), 0);
    let request = fetcher
        .last_request_to("https://api.coingecko.com/api/v3/coins/markets")
        .unwrap();
    assert_eq!(request.query_value("per_page"), Some("2"));
}

#[tokio::test]
async fn test_symbol_funding_is_empty_when_symbol_has_no_row() {
    init_logger();
    let fetcher = MockFetcher::new();
    fetcher.respond(
        "https://open-api.coinglass.com/public/v2/funding",
        json!({"code": "0", "msg": "success", "data": [
            {"symbol": "BTC", "uMarginList": [{"exchangeName": "Binance", "rate": 0.01}]}
        ]}),
    );
    let agg = aggregator(&fetcher);

    let doge = agg.symbol_derivatives("doge").await;
    assert_eq!(doge.symbol, "DOGE");
    assert!(doge.funding.is_none());

    let btc = agg.symbol_derivatives("btc").await;
    let funding = btc.funding.unwrap();
    assert_eq!(funding.symbol, "BTC");
    assert_eq!(funding.average_rate, Some(0.01));
    assert_eq!(funding.exchanges, 1);
}

#[tokio::test]
async fn test_coin_sentiment_scores_the_top_ranked_candidate() {
    init_logger();
    let fetcher = MockFetcher::new();
    fetcher.respond(
        "https://api.coingecko.com/api/v3/coins/list",
        json!([
            {"id": "batcat", "symbol": "btc", "name": "batcat"},
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"}
        ]),
    );
    fetcher.respond(
        "https://api.coingecko.com/api/v3/coins/markets",
        json!([
            {"id": "batcat", "symbol": "btc", "name": "batcat", "market_cap_rank": 4821},
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "market_cap_rank": 1}
        ]),
    );
    fetcher.respond(
        "https://api.coingecko.com/api/v3/coins/bitcoin",
        json!({
            "id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
            "community_data": {"twitter_followers": 1000000},
            "market_data": {"price_change_percentage_24h": 2.5}
        }),
    );
    let coin = aggregator(&fetcher).coin_sentiment("BTC").await.unwrap();
    assert_eq!(coin.id, "bitcoin");
    assert_eq!(coin.score, 20);
    assert_eq!(
        fetcher.calls_to("https://api.coingecko.com/api/v3/coins/batcat"),
        0
    );
    let request = fetcher
        .last_request_to("https://api.coingecko.com/api/v3/coins/markets")
        .unwrap();
    assert_eq!(request.query_value("ids"), Some("batcat,bitcoin"));
}

#[tokio::test]
async fn test_exchanges_fall_back_to_coinlore() {
    init_logger();
    let fetcher = MockFetcher::new();
    fetcher.fail("https://api.coincap.io/v2/exchanges", Provider::CoinCap, 503);
    fetcher.respond("https://api.coinpaprika.com/v1/exchanges", json!([]));
    fetcher.respond(
        "https://api.coinlore.net/api/exchanges/",
        json!({
            "5": {"name": "Binance", "name_id": "binance", "volume_usd": 9000000000.0,
                  "active_pairs": 1500, "url": "https://www.binance.com"},
            "17": {"name": "Kraken", "volume_usd": 2000000000.0, "active_pairs": "700"}
        }),
    );
    let exchanges = aggregator(&fetcher).aggregated_exchanges(10).await;
    assert_eq!(exchanges.len(), 2);
    assert_eq!(exchanges[0].id, "binance");
    assert_eq!(exchanges[0].source, AssetSource::Coinlore);
    // no name_id, so the map key becomes the id
    assert_eq!(exchanges[1].id, "17");
    assert_eq!(exchanges[1].markets, Some(700));
    assert_eq!(fetcher.calls(), 3);
}
