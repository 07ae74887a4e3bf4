//! JSON-over-HTTP surface for the aggregator.

use crate::{
    error::FetchError,
    screener::{Preset, ScreenerError, ScreenerFilter, ScreenerQuery, SortDirection},
    MarketAggregator,
};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{convert::Infallible, sync::Arc};
use warp::{
    http::StatusCode,
    reply::{self, Response},
    Filter, Rejection, Reply,
};

const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct KlineQuery {
    pub interval: Option<String>,
    pub limit: Option<u32>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Defaults come from the CoinPaprika id, `btc-bitcoin` giving `btc` and `bitcoin`.
#[derive(Debug, Default, Deserialize)]
pub struct AssetQuery {
    pub symbol: Option<String>,
    pub slug: Option<String>,
}

impl AssetQuery {
    pub fn resolve(&self, id: &str) -> (String, String) {
        let (symbol, slug) = id.split_once('-').unwrap_or((id, id));
        (
            self.symbol.clone().unwrap_or_else(|| symbol.to_owned()),
            self.slug.clone().unwrap_or_else(|| slug.to_owned()),
        )
    }
}

/// `filters` holds `;`-separated `field:op:value` triples.
#[derive(Debug, Default, Deserialize)]
pub struct ScreenerParams {
    pub preset: Option<String>,
    pub filters: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub universe: Option<usize>,
}

impl ScreenerParams {
    pub fn to_query(&self) -> Result<ScreenerQuery, ScreenerError> {
        let filters = self
            .filters
            .as_deref()
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::parse::<ScreenerFilter>)
            .collect::<Result<Vec<_>, _>>()?;
        let mut query = match self.preset.as_deref() {
            Some(name) => ScreenerQuery::from_preset(name.parse::<Preset>()?, filters),
            None => ScreenerQuery::new(filters),
        };
        if let Some(field) = self.sort.as_deref() {
            let direction = self
                .order
                .as_deref()
                .map(str::parse::<SortDirection>)
                .transpose()?
                .unwrap_or(SortDirection::Desc);
            query = query.sorted_by(field.parse()?, direction);
        }
        query.offset = self.offset.unwrap_or(0);
        query.limit = self.limit.map(|l| l.min(MAX_LIMIT));
        Ok(query)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_reply(status: StatusCode, message: impl ToString) -> Response {
    reply::with_status(
        reply::json(&ErrorBody {
            error: message.to_string(),
        }),
        status,
    )
    .into_response()
}

fn upstream_error(err: FetchError) -> Response {
    warn!("request failed upstream: {}", err);
    let status = match err {
        FetchError::NotFound { .. } => StatusCode::NOT_FOUND,
        FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    error_reply(status, err)
}

fn with_aggregator(
    aggregator: Arc<MarketAggregator>,
) -> impl Filter<Extract = (Arc<MarketAggregator>,), Error = Infallible> + Clone {
    warp::any().map(move || aggregator.clone())
}

fn limit_or_default(aggregator: &MarketAggregator, limit: Option<usize>) -> usize {
    limit.unwrap_or_else(|| aggregator.default_limit()).clamp(1, MAX_LIMIT)
}

async fn assets(q: LimitQuery, agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    let limit = limit_or_default(&agg, q.limit);
    Ok(reply::json(&agg.aggregated_assets(limit).await).into_response())
}

async fn asset(
    id: String,
    q: AssetQuery,
    agg: Arc<MarketAggregator>,
) -> Result<Response, Infallible> {
    let (symbol, slug) = q.resolve(&id);
    Ok(reply::json(&agg.comprehensive_asset(&id, &symbol, &slug).await).into_response())
}

async fn global(agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    Ok(reply::json(&agg.aggregated_global_data().await).into_response())
}

async fn exchanges(q: LimitQuery, agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    let limit = limit_or_default(&agg, q.limit);
    Ok(reply::json(&agg.aggregated_exchanges(limit).await).into_response())
}

async fn derivatives(agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    Ok(reply::json(&agg.derivatives_overview().await).into_response())
}

async fn symbol_derivatives(
    symbol: String,
    agg: Arc<MarketAggregator>,
) -> Result<Response, Infallible> {
    Ok(reply::json(&agg.symbol_derivatives(&symbol).await).into_response())
}

async fn screener(params: ScreenerParams, agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    let query = match params.to_query() {
        Ok(query) => query,
        Err(e) => return Ok(error_reply(StatusCode::BAD_REQUEST, e)),
    };
    let universe = limit_or_default(&agg, params.universe);
    Ok(reply::json(&agg.screen(&query, universe).await).into_response())
}

async fn sentiment(q: LimitQuery, agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    let limit = limit_or_default(&agg, q.limit);
    Ok(reply::json(&agg.market_sentiment(limit).await).into_response())
}

async fn coin_sentiment(symbol: String, agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    Ok(match agg.coin_sentiment(&symbol).await {
        Ok(s) => reply::json(&s).into_response(),
        Err(e) => upstream_error(e),
    })
}

async fn bitcoin_network(agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    Ok(match agg.bitcoin_network_stats().await {
        Ok(stats) => reply::json(&stats).into_response(),
        Err(e) => upstream_error(e),
    })
}

async fn bitcoin_fees(agg: Arc<MarketAggregator>) -> Result<Response, Infallible> {
    Ok(match agg.providers().bitcoin.recommended_fees().await {
        Ok(fees) => reply::json(&fees).into_response(),
        Err(e) => upstream_error(e),
    })
}

async fn klines(
    symbol: String,
    q: KlineQuery,
    agg: Arc<MarketAggregator>,
) -> Result<Response, Infallible> {
    let interval = q.interval.as_deref().unwrap_or("1d");
    let limit = q.limit.unwrap_or(30).clamp(1, 1000);
    Ok(
        match agg
            .providers()
            .binance
            .klines(&symbol, interval, limit, q.start, q.end)
            .await
        {
            Ok(rows) => reply::json(&rows).into_response(),
            Err(e) => upstream_error(e),
        },
    )
}

pub fn routes(
    aggregator: Arc<MarketAggregator>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let agg = with_aggregator(aggregator);
    let api = warp::path("api");

    let health = warp::path("health")
        .and(warp::path::end())
        .map(|| reply::json(&json!({ "status": "ok" })).into_response());
    let assets = api
        .and(warp::path("assets"))
        .and(warp::path::end())
        .and(warp::query::<LimitQuery>())
        .and(agg.clone())
        .and_then(assets);
    let asset = api
        .and(warp::path("assets"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::query::<AssetQuery>())
        .and(agg.clone())
        .and_then(asset);
    let global = api
        .and(warp::path("global"))
        .and(warp::path::end())
        .and(agg.clone())
        .and_then(global);
    let exchanges = api
        .and(warp::path("exchanges"))
        .and(warp::path::end())
        .and(warp::query::<LimitQuery>())
        .and(agg.clone())
        .and_then(exchanges);
    let derivatives_all = api
        .and(warp::path("derivatives"))
        .and(warp::path::end())
        .and(agg.clone())
        .and_then(derivatives);
    let derivatives_symbol = api
        .and(warp::path("derivatives"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(agg.clone())
        .and_then(symbol_derivatives);
    let screener = api
        .and(warp::path("screener"))
        .and(warp::path::end())
        .and(warp::query::<ScreenerParams>())
        .and(agg.clone())
        .and_then(screener);
    let sentiment_all = api
        .and(warp::path("sentiment"))
        .and(warp::path::end())
        .and(warp::query::<LimitQuery>())
        .and(agg.clone())
        .and_then(sentiment);
    let sentiment_coin = api
        .and(warp::path("sentiment"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(agg.clone())
        .and_then(coin_sentiment);
    let network = api
        .and(warp::path!("bitcoin" / "network"))
        .and(agg.clone())
        .and_then(bitcoin_network);
    let fees = api
        .and(warp::path!("bitcoin" / "fees"))
        .and(agg.clone())
        .and_then(bitcoin_fees);
    let klines = api
        .and(warp::path("klines"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::query::<KlineQuery>())
        .and(agg)
        .and_then(klines);

    warp::get().and(
        health
            .or(assets)
            .unify()
            .or(asset)
            .unify()
            .or(global)
            .unify()
            .or(exchanges)
            .unify()
            .or(derivatives_all)
            .unify()
            .or(derivatives_symbol)
            .unify()
            .or(screener)
            .unify()
            .or(sentiment_all)
            .unify()
            .or(sentiment_coin)
            .unify()
            .or(network)
            .unify()
            .or(fees)
            .unify()
            .or(klines)
            .unify(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screener::{Field, Operator};

    #[test]
    fn screener_params_expand_preset_and_extra_filters() {
        let params = ScreenerParams {
            preset: Some("large-caps".to_owned()),
            filters: Some("symbol:in:btc,eth; change_24h:between:-5,5".to_owned()),
            sort: Some("total_volume".to_owned()),
            order: Some("asc".to_owned()),
            limit: Some(5000),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.filters.len(), 3);
        assert_eq!(query.filters[0].field, Field::MarketCap);
        assert_eq!(query.filters[2].operator, Operator::Between);
        let sort = query.sort.unwrap();
        assert_eq!(sort.field, Field::TotalVolume);
        assert_eq!(sort.direction, SortDirection::Asc);
        assert_eq!(query.limit, Some(MAX_LIMIT));
    }

    #[test]
    fn asset_query_defaults_from_paprika_id() {
        let q = AssetQuery::default();
        assert_eq!(q.resolve("btc-bitcoin"), ("btc".to_owned(), "bitcoin".to_owned()));
        assert_eq!(
            q.resolve("usdt-tether"),
            ("usdt".to_owned(), "tether".to_owned())
        );
        let q = AssetQuery {
            slug: Some("wrapped-bitcoin".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            q.resolve("wbtc-wrapped-bitcoin"),
            ("wbtc".to_owned(), "wrapped-bitcoin".to_owned())
        );
    }

    #[test]
    fn screener_params_reject_unknown_preset() {
        let params = ScreenerParams {
            preset: Some("moonshots".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            params.to_query().unwrap_err(),
            ScreenerError::UnknownPreset("moonshots".to_owned())
        );
    }
}
