use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    Provider,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

pub const MIN_API_URL: &str = "https://min-api.cryptocompare.com/data";
pub const DATA_API_URL: &str = "https://data-api.cryptocompare.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volumefrom: f64,
    #[serde(default)]
    pub volumeto: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinInfo {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "FullName")]
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopVolumeEntry {
    #[serde(rename = "CoinInfo")]
    pub coin_info: CoinInfo,
    /// `RAW.<TSYM>.{PRICE, MKTCAP, VOLUME24HOURTO, CHANGEPCT24HOUR}`.
    #[serde(rename = "RAW", default)]
    pub raw: HashMap<String, HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialStats {
    pub twitter_followers: Option<u64>,
    pub reddit_subscribers: Option<u64>,
    pub points: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "TITLE")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "PUBLISHED_ON")]
    pub published_on: i64,
    #[serde(rename = "SOURCE_DATA", default)]
    pub source: Value,
}

/// min-api signals failure with `{"Response": "Error", "Message": ...}`.
fn unwrap(provider: Provider, value: Value) -> FetchResult<Value> {
    if value["Response"].as_str() == Some("Error") {
        let message = value["Message"].as_str().unwrap_or("unknown error");
        return Err(FetchError::api(provider, message));
    }
    Ok(value)
}

fn unwrap_data(provider: Provider, value: Value) -> FetchResult<Value> {
    let mut value = unwrap(provider, value)?;
    match value.get_mut("Data") {
        Some(data) => Ok(data.take()),
        None => Err(FetchError::decode(provider, "missing `Data` field")),
    }
}

/// data-api uses `{"Data": ..., "Err": {"message": ...}}`.
fn unwrap_data_api(provider: Provider, mut value: Value) -> FetchResult<Value> {
    if let Some(message) = value["Err"]["message"].as_str() {
        return Err(FetchError::api(provider, message));
    }
    match value.get_mut("Data") {
        Some(data) => Ok(data.take()),
        None => Err(FetchError::decode(provider, "missing `Data` field")),
    }
}

pub struct CryptoCompareAPI {
    min_api: ProviderClient,
    data_api: ProviderClient,
}

impl CryptoCompareAPI {
    pub fn new(
        api_key: Option<&str>,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self::with_base_urls(MIN_API_URL, DATA_API_URL, api_key, fetcher, cache)
    }

    pub fn with_base_urls(
        min_api_url: &str,
        data_api_url: &str,
        api_key: Option<&str>,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let mut min_api =
            ProviderClient::new(Provider::CryptoCompare, min_api_url, fetcher.clone(), cache.clone());
        let mut data_api = ProviderClient::new(Provider::CryptoCompare, data_api_url, fetcher, cache);
        if let Some(key) = api_key {
            let value = format!("Apikey {}", key);
            min_api = min_api.with_header("authorization", &value);
            data_api = data_api.with_header("authorization", &value);
        }
        Self { min_api, data_api }
    }

    /// Price of `fsym` in each of `tsyms`.
    pub async fn price(&self, fsym: &str, tsyms: &[&str]) -> FetchResult<HashMap<String, f64>> {
        let fsym = fsym.to_uppercase();
        let tsyms = tsyms.join(",").to_uppercase();
        self.min_api
            .cached_as(
                &format!("cryptocompare:price:{}:{}", fsym, tsyms),
                "price",
                &[("fsym", fsym.clone()), ("tsyms", tsyms.clone())],
                TtlClass::Ticker,
                unwrap,
            )
            .await
    }

    pub async fn histoday(&self, fsym: &str, tsym: &str, limit: u32) -> FetchResult<Vec<DailyBar>> {
        let fsym = fsym.to_uppercase();
        let tsym = tsym.to_uppercase();
        let api = &self.min_api;
        api.cached_parsed(
            &format!("cryptocompare:histoday:{}:{}:{}", fsym, tsym, limit),
            "v2/histoday",
            &[
                ("fsym", fsym.clone()),
                ("tsym", tsym.clone()),
                ("limit", limit.to_string()),
            ],
            unwrap_data,
            |payload| api.decode(&payload["Data"]),
            |_| TtlClass::HistoricalLong,
        )
        .await
    }

    pub async fn top_by_volume(&self, tsym: &str, limit: u32) -> FetchResult<Vec<TopVolumeEntry>> {
        let tsym = tsym.to_uppercase();
        self.min_api
            .cached_as(
                &format!("cryptocompare:top:totalvolfull:{}:{}", tsym, limit),
                "top/totalvolfull",
                &[("tsym", tsym.clone()), ("limit", limit.to_string())],
                TtlClass::Short,
                unwrap_data,
            )
            .await
    }

    /// `coin_id` is CryptoCompare's numeric coin id.
    pub async fn social_stats(&self, coin_id: u64) -> FetchResult<SocialStats> {
        let data = self
            .min_api
            .cached(
                &format!("cryptocompare:social:{}", coin_id),
                "social/coin/latest",
                &[("coinId", coin_id.to_string())],
                TtlClass::Short,
                unwrap_data,
            )
            .await?;
        Ok(SocialStats {
            twitter_followers: data["Twitter"]["followers"].as_u64(),
            reddit_subscribers: data["Reddit"]["subscribers"].as_u64(),
            points: data["General"]["Points"].as_f64(),
        })
    }

    pub async fn latest_news(&self, lang: &str, limit: u32) -> FetchResult<Vec<NewsArticle>> {
        let lang = lang.to_uppercase();
        self.data_api
            .cached_as(
                &format!("cryptocompare:news:{}:{}", lang, limit),
                "news/v1/article/list",
                &[("lang", lang.clone()), ("limit", limit.to_string())],
                TtlClass::Short,
                unwrap_data_api,
            )
            .await
    }
}
