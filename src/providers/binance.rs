use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    model::num,
    Provider,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const SPOT_URL: &str = "https://api.binance.com/api/v3";
pub const FUTURES_URL: &str = "https://fapi.binance.com";

#[derive(Debug, Clone, Deserialize)]
pub struct BinancePrice {
    pub symbol: String,
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binance24hr {
    pub symbol: String,
    pub price_change: String,
    pub price_change_percent: String,
    pub last_price: String,
    pub high_price: String,
    pub low_price: String,
    pub volume: String,
    pub quote_volume: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    pub last_update_id: u64,
    pub bids: Vec<(String, String)>,
    pub asks: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: u64,
    pub price: String,
    pub qty: String,
    pub time: i64,
    pub is_buyer_maker: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_volume: f64,
    pub trades: u64,
}

impl Kline {
    /// Binance sends each candle as a positional array of mixed strings and numbers.
    fn from_row(row: &Value) -> Option<Kline> {
        let row = row.as_array()?;
        if row.len() < 9 {
            return None;
        }
        Some(Kline {
            open_time: row[0].as_i64()?,
            open: num(&row[1])?,
            high: num(&row[2])?,
            low: num(&row[3])?,
            close: num(&row[4])?,
            volume: num(&row[5])?,
            close_time: row[6].as_i64()?,
            quote_volume: num(&row[7])?,
            trades: row[8].as_u64()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInfo {
    pub timezone: String,
    pub server_time: i64,
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumIndex {
    pub symbol: String,
    pub mark_price: String,
    pub index_price: String,
    pub last_funding_rate: String,
    pub next_funding_time: i64,
    pub time: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesOpenInterest {
    pub symbol: String,
    pub open_interest: String,
    pub time: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongShortRatio {
    pub symbol: String,
    pub long_short_ratio: String,
    pub long_account: String,
    pub short_account: String,
    pub timestamp: i64,
}

/// Daily and longer candles change slowly; intraday ones don't.
pub fn kline_ttl(interval: &str) -> TtlClass {
    if interval.contains(&['d', 'w', 'M'][..]) {
        TtlClass::Historical
    } else {
        TtlClass::Short
    }
}

fn parse_klines(payload: &Value) -> FetchResult<Vec<Kline>> {
    payload
        .as_array()
        .ok_or_else(|| FetchError::decode(Provider::Binance, "klines is not an array"))?
        .iter()
        .map(|row| {
            Kline::from_row(row)
                .ok_or_else(|| FetchError::decode(Provider::Binance, "malformed kline row"))
        })
        .collect()
}

fn unwrap(provider: Provider, value: Value) -> FetchResult<Value> {
    match (value.get("code").and_then(Value::as_i64), value.get("msg")) {
        (Some(code), Some(msg)) if code < 0 => Err(FetchError::api(
            provider,
            format!("{} ({})", msg.as_str().unwrap_or_default(), code),
        )),
        _ => Ok(value),
    }
}

pub struct BinanceAPI {
    spot: ProviderClient,
    futures: ProviderClient,
}

impl BinanceAPI {
    pub fn new(fetcher: Arc<dyn HttpFetch>, cache: Arc<dyn ResponseCache>) -> Self {
        Self::with_base_urls(SPOT_URL, FUTURES_URL, fetcher, cache)
    }

    pub fn with_base_urls(
        spot_url: &str,
        futures_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            spot: ProviderClient::new(Provider::Binance, spot_url, fetcher.clone(), cache.clone()),
            futures: ProviderClient::new(Provider::Binance, futures_url, fetcher, cache),
        }
    }

    /// Every symbol when `symbol` is `None`.
    pub async fn ticker_price(&self, symbol: Option<&str>) -> FetchResult<Vec<BinancePrice>> {
        let query: Vec<(&str, String)> = symbol
            .map(|s| vec![("symbol", s.to_uppercase())])
            .unwrap_or_default();
        let spot = &self.spot;
        spot.cached_parsed(
            &format!("binance:price:{}", symbol.unwrap_or("all").to_uppercase()),
            "ticker/price",
            &query,
            unwrap,
            |payload| match payload {
                Value::Array(_) => spot.decode(payload),
                single => Ok(vec![spot.decode(single)?]),
            },
            |_| TtlClass::Ticker,
        )
        .await
    }

    pub async fn ticker_24hr(&self, symbol: &str) -> FetchResult<Binance24hr> {
        let symbol = symbol.to_uppercase();
        self.spot
            .cached_as(
                &format!("binance:24hr:{}", symbol),
                "ticker/24hr",
                &[("symbol", symbol.clone())],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn depth(&self, symbol: &str, limit: u32) -> FetchResult<OrderBook> {
        let symbol = symbol.to_uppercase();
        self.spot
            .cached_as(
                &format!("binance:depth:{}:{}", symbol, limit),
                "depth",
                &[("symbol", symbol.clone()), ("limit", limit.to_string())],
                TtlClass::Orderbook,
                unwrap,
            )
            .await
    }

    pub async fn trades(&self, symbol: &str, limit: u32) -> FetchResult<Vec<Trade>> {
        let symbol = symbol.to_uppercase();
        self.spot
            .cached_as(
                &format!("binance:trades:{}:{}", symbol, limit),
                "trades",
                &[("symbol", symbol.clone()), ("limit", limit.to_string())],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
        start: Option<i64>,
        end: Option<i64>,
    ) -> FetchResult<Vec<Kline>> {
        let symbol = symbol.to_uppercase();
        let key = format!(
            "binance:klines:{}:{}:{}:{}:{}",
            symbol,
            interval,
            limit,
            start.map(|s| s.to_string()).unwrap_or_default(),
            end.map(|e| e.to_string()).unwrap_or_default()
        );
        let mut query = vec![
            ("symbol", symbol.clone()),
            ("interval", interval.to_owned()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start {
            query.push(("startTime", start.to_string()));
        }
        if let Some(end) = end {
            query.push(("endTime", end.to_string()));
        }
        let ttl = kline_ttl(interval);
        self.spot
            .cached_parsed(&key, "klines", &query, unwrap, parse_klines, |_| ttl)
            .await
    }

    pub async fn exchange_info(&self) -> FetchResult<ExchangeInfo> {
        self.spot
            .cached_as(
                "binance:exchangeInfo",
                "exchangeInfo",
                &[],
                TtlClass::Static,
                unwrap,
            )
            .await
    }

    pub async fn premium_index(&self, symbol: &str) -> FetchResult<PremiumIndex> {
        let symbol = symbol.to_uppercase();
        self.futures
            .cached_as(
                &format!("binance:futures:premiumIndex:{}", symbol),
                "fapi/v1/premiumIndex",
                &[("symbol", symbol.clone())],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn open_interest(&self, symbol: &str) -> FetchResult<FuturesOpenInterest> {
        let symbol = symbol.to_uppercase();
        self.futures
            .cached_as(
                &format!("binance:futures:openInterest:{}", symbol),
                "fapi/v1/openInterest",
                &[("symbol", symbol.clone())],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    /// `period` is one of Binance's `5m .. 1d` buckets.
    pub async fn long_short_ratio(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> FetchResult<Vec<LongShortRatio>> {
        let symbol = symbol.to_uppercase();
        self.futures
            .cached_as(
                &format!("binance:futures:longShort:{}:{}:{}", symbol, period, limit),
                "futures/data/globalLongShortAccountRatio",
                &[
                    ("symbol", symbol.clone()),
                    ("period", period.to_owned()),
                    ("limit", limit.to_string()),
                ],
                TtlClass::Short,
                unwrap,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kline_ttl_follows_interval_granularity() {
        assert_eq!(kline_ttl("1d"), TtlClass::Historical);
        assert_eq!(kline_ttl("1w"), TtlClass::Historical);
        assert_eq!(kline_ttl("1M"), TtlClass::Historical);
        assert_eq!(kline_ttl("1m"), TtlClass::Short);
        assert_eq!(kline_ttl("4h"), TtlClass::Short);
    }

    #[test]
    fn kline_rows_parse_mixed_encoding() {
        let row = json!([
            1700000000000i64, "37000.1", "37500", "36900.5", "37200", "1234.5",
            1700086399999i64, "45900000.0", 52000, "600", "22000000", "0"
        ]);
        let kline = Kline::from_row(&row).unwrap();
        assert_eq!(kline.open, 37000.1);
        assert_eq!(kline.trades, 52000);
        assert!(Kline::from_row(&json!([1, "2"])).is_none());
    }
}
