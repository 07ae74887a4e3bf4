use crate::{
    cache::{ResponseCache, TtlClass},
    error::{FetchError, FetchResult},
    settings::HttpSettings,
    Provider,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

/// One outbound GET, fully described.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub provider: Provider,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Network seam. Production uses [`ReqwestFetcher`]; tests script responses.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get_json(&self, request: &ApiRequest) -> FetchResult<Value>;
}

/// `reqwest` backed fetcher. Every call goes through one client so the same
/// timeout applies to every provider.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn build(settings: &HttpSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_str(&settings.user_agent)?);
        Ok(Self {
            client: Client::builder()
                .default_headers(headers)
                .timeout(Duration::from_secs(settings.timeout_secs))
                .build()?,
        })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_json(&self, request: &ApiRequest) -> FetchResult<Value> {
        let provider = request.provider;
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            let mut value = HeaderValue::from_str(value).map_err(|e| FetchError::Network {
                provider,
                message: format!("invalid header {}: {}", name, e),
            })?;
            value.set_sensitive(true);
            builder = builder.header(name.as_str(), value);
        }
        let res = builder.send().await.map_err(|e| transport_error(provider, e))?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                provider,
                status: status.as_u16(),
            });
        }
        let body = res.text().await.map_err(|e| transport_error(provider, e))?;
        serde_json::from_str(body.trim()).map_err(|e| FetchError::decode(provider, e))
    }
}

fn transport_error(provider: Provider, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { provider }
    } else {
        FetchError::Network {
            provider,
            message: err.to_string(),
        }
    }
}

/// Maps a provider's raw envelope to its payload, or to a logical error.
pub type Unwrap = fn(Provider, Value) -> FetchResult<Value>;

/// Payload is the whole body.
pub fn raw(_: Provider, value: Value) -> FetchResult<Value> {
    Ok(value)
}

/// Payload lives under `data`.
pub fn data_envelope(provider: Provider, mut value: Value) -> FetchResult<Value> {
    match value.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Err(FetchError::decode(provider, "missing `data` field")),
    }
}

/// The request/cache loop every provider module goes through.
pub struct ProviderClient {
    provider: Provider,
    base_url: String,
    headers: Vec<(String, String)>,
    fetcher: Arc<dyn HttpFetch>,
    cache: Arc<dyn ResponseCache>,
}

impl ProviderClient {
    pub fn new(
        provider: Provider,
        base_url: &str,
        fetcher: Arc<dyn HttpFetch>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_owned(),
            headers: vec![],
            fetcher,
            cache,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    pub fn request(&self, path: &str, query: &[(&str, String)]) -> ApiRequest {
        ApiRequest {
            provider: self.provider,
            url: format!("{}/{}", self.base_url, path.trim_start_matches('/')),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            headers: self.headers.clone(),
        }
    }

    /// Uncached call through the envelope adapter.
    pub async fn fetch(
        &self,
        path: &str,
        query: &[(&str, String)],
        unwrap: Unwrap,
    ) -> FetchResult<Value> {
        let request = self.request(path, query);
        debug!("{} GET {} {:?}", self.provider, request.url, request.query);
        let body = self.fetcher.get_json(&request).await.map_err(|e| {
            warn!("{}", e);
            e
        })?;
        unwrap(self.provider, body)
    }

    pub async fn cached(
        &self,
        key: &str,
        path: &str,
        query: &[(&str, String)],
        ttl: TtlClass,
        unwrap: Unwrap,
    ) -> FetchResult<Value> {
        self.cached_with(key, path, query, unwrap, |_| ttl).await
    }

    /// Like [`cached`](Self::cached) but the TTL is chosen from the payload,
    /// e.g. confirmed vs unconfirmed transactions.
    pub async fn cached_with<F>(
        &self,
        key: &str,
        path: &str,
        query: &[(&str, String)],
        unwrap: Unwrap,
        ttl: F,
    ) -> FetchResult<Value>
    where
        F: Fn(&Value) -> TtlClass + Send,
    {
        self.cached_parsed(key, path, query, unwrap, |v| Ok(v.clone()), ttl)
            .await
    }

    pub async fn cached_as<T: DeserializeOwned>(
        &self,
        key: &str,
        path: &str,
        query: &[(&str, String)],
        ttl: TtlClass,
        unwrap: Unwrap,
    ) -> FetchResult<T> {
        self.cached_as_with(key, path, query, unwrap, |_| ttl).await
    }

    pub async fn cached_as_with<T, F>(
        &self,
        key: &str,
        path: &str,
        query: &[(&str, String)],
        unwrap: Unwrap,
        ttl: F,
    ) -> FetchResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Value) -> TtlClass + Send,
    {
        self.cached_parsed(key, path, query, unwrap, |v| self.decode(v), ttl)
            .await
    }

    /// Cache loop with a parse step. A payload is stored only once `parse`
    /// accepts it, so a malformed body is refetched on the next call.
    pub async fn cached_parsed<T, P, F>(
        &self,
        key: &str,
        path: &str,
        query: &[(&str, String)],
        unwrap: Unwrap,
        parse: P,
        ttl: F,
    ) -> FetchResult<T>
    where
        P: Fn(&Value) -> FetchResult<T> + Send,
        F: Fn(&Value) -> TtlClass + Send,
    {
        if let Some(hit) = self.cache.get(key) {
            debug!("cache hit {}", key);
            return parse(&hit);
        }
        let payload = self.fetch(path, query, unwrap).await?;
        let parsed = parse(&payload)?;
        let ttl = ttl(&payload).duration();
        self.cache.set(key, payload, ttl);
        Ok(parsed)
    }

    pub fn decode<T: DeserializeOwned>(&self, payload: &Value) -> FetchResult<T> {
        T::deserialize(payload).map_err(|e| FetchError::decode(self.provider, e))
    }
}
