use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    http::{HttpFetch, ProviderClient},
    Provider,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

pub const BASE_URL: &str = "https://open-api.coinglass.com/public/v2";
pub const API_KEY_HEADER: &str = "CG-API-KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeOpenInterest {
    pub exchange_name: String,
    #[serde(default)]
    pub open_interest: Value,
    #[serde(default)]
    pub open_interest_amount: Value,
    #[serde(default)]
    pub h24_change: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub exchange_name: String,
    #[serde(default)]
    pub rate: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFunding {
    pub symbol: String,
    #[serde(default)]
    pub u_margin_list: Vec<ExchangeRate>,
    #[serde(default)]
    pub c_margin_list: Vec<ExchangeRate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationInfo {
    #[serde(default, alias = "h24TotalVolUsd")]
    pub total_vol_usd: Value,
    #[serde(default, alias = "h24LongVolUsd")]
    pub long_vol_usd: Value,
    #[serde(default, alias = "h24ShortVolUsd")]
    pub short_vol_usd: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeLongShort {
    pub exchange_name: String,
    #[serde(default)]
    pub long_rate: Value,
    #[serde(default)]
    pub short_rate: Value,
    #[serde(default)]
    pub long_vol_usd: Value,
    #[serde(default)]
    pub short_vol_usd: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInterestHistory {
    #[serde(default)]
    pub date_list: Vec<i64>,
    #[serde(default)]
    pub price_list: Vec<Value>,
    #[serde(default)]
    pub data_map: HashMap<String, Vec<Value>>,
}

/// `code` of `"0"` (or `0`) is the only success; anything else is an error
/// even when the HTTP status was 200.
fn unwrap(provider: Provider, mut value: Value) -> FetchResult<Value> {
    let ok = match value.get("code") {
        Some(Value::String(code)) => code == "0",
        Some(Value::Number(code)) => code.as_i64() == Some(0),
        _ => false,
    };
    if !ok {
        let message = value
            .get("msg")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("code {}", value.get("code").unwrap_or(&Value::Null)));
        return Err(FetchError::api(provider, message));
    }
    Ok(value.get_mut("data").map(Value::take).unwrap_or(Value::Null))
}

pub struct CoinglassAPI {
    client: ProviderClient,
}

impl CoinglassAPI {
    pub fn new(
        api_key: Option<&str>,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self::with_base_url(BASE_URL, api_key, fetcher, cache)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let mut client = ProviderClient::new(Provider::Coinglass, base_url, fetcher, cache);
        if let Some(key) = api_key {
            client = client.with_header(API_KEY_HEADER, key);
        }
        Self { client }
    }

    pub fn has_api_key(&self) -> bool {
        self.client.has_headers()
    }

    pub async fn open_interest(&self, symbol: &str) -> FetchResult<Vec<ExchangeOpenInterest>> {
        let symbol = symbol.to_uppercase();
        self.client
            .cached_as(
                &format!("coinglass:open_interest:{}", symbol),
                "open_interest",
                &[("symbol", symbol.clone())],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    /// All symbols when `symbol` is `None`.
    pub async fn funding_rates(&self, symbol: Option<&str>) -> FetchResult<Vec<SymbolFunding>> {
        let symbol = symbol.map(str::to_uppercase);
        let query: Vec<(&str, String)> = symbol
            .iter()
            .map(|s| ("symbol", s.clone()))
            .collect();
        self.client
            .cached_as(
                &format!("coinglass:funding:{}", symbol.as_deref().unwrap_or("all")),
                "funding",
                &query,
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    /// `time_type` is Coinglass' window code, e.g. `1` (1h) or `2` (24h).
    pub async fn liquidations(&self, symbol: &str, time_type: &str) -> FetchResult<LiquidationInfo> {
        let symbol = symbol.to_uppercase();
        self.client
            .cached_as(
                &format!("coinglass:liquidation:{}:{}", symbol, time_type),
                "liquidation_info",
                &[("symbol", symbol.clone()), ("time_type", time_type.to_owned())],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn long_short(
        &self,
        symbol: &str,
        time_type: &str,
    ) -> FetchResult<Vec<ExchangeLongShort>> {
        let symbol = symbol.to_uppercase();
        self.client
            .cached_as(
                &format!("coinglass:long_short:{}:{}", symbol, time_type),
                "long_short",
                &[("symbol", symbol.clone()), ("time_type", time_type.to_owned())],
                TtlClass::Short,
                unwrap,
            )
            .await
    }

    pub async fn open_interest_history(
        &self,
        symbol: &str,
        interval: &str,
    ) -> FetchResult<OpenInterestHistory> {
        let symbol = symbol.to_uppercase();
        self.client
            .cached_as(
                &format!("coinglass:open_interest_history:{}:{}", symbol, interval),
                "open_interest_history",
                &[
                    ("symbol", symbol.clone()),
                    ("time_type", interval.to_owned()),
                    ("currency", "USD".to_owned()),
                ],
                TtlClass::Historical,
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
    fn success_code_accepts_string_and_number() {
        assert_eq!(
            unwrap(Provider::Coinglass, json!({"code": "0", "data": [1]})).unwrap(),
            json!([1])
        );
        assert_eq!(
            unwrap(Provider::Coinglass, json!({"code": 0, "data": {"a": 1}})).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn non_zero_code_is_an_error() {
        let err = unwrap(
            Provider::Coinglass,
            json!({"code": "30001", "msg": "API key missing", "success": false}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Coinglass API error: API key missing");
    }
}
