#![allow(dead_code)]

use async_trait::async_trait;
use marketfeed::{
    ApiRequest, FetchError, FetchResult, HttpFetch, MemoryCache, Provider, ResponseCache,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scripted [`HttpFetch`]: answers by URL (query excluded) and records every
/// request. Unscripted URLs get a 404 from the requesting provider.
#[derive(Default)]
pub struct MockFetcher {
    routes: Mutex<HashMap<String, FetchResult<Value>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, body: Value) {
        self.routes.lock().insert(url.to_owned(), Ok(body));
    }

    pub fn fail(&self, url: &str, provider: Provider, status: u16) {
        self.routes
            .lock()
            .insert(url.to_owned(), Err(FetchError::Http { provider, status }));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url == url).count()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request_to(&self, url: &str) -> Option<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .rev()
            .find(|r| r.url == url)
            .cloned()
    }
}

#[async_trait]
impl HttpFetch for MockFetcher {
    async fn get_json(&self, request: &ApiRequest) -> FetchResult<Value> {
        self.requests.lock().push(request.clone());
        self.routes
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or(Err(FetchError::Http {
                provider: request.provider,
                status: 404,
            }))
    }
}

pub fn cache() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::new())
}


/// [`MemoryCache`] that also remembers the TTL of every `set`.
#[derive(Default)]
pub struct RecordingCache {
    inner: MemoryCache,
    ttls: Mutex<Vec<(String, Duration)>>,
}

impl RecordingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// TTL of the latest `set` for `key`.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.ttls
            .lock()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, ttl)| *ttl)
    }

    pub fn sets(&self) -> usize {
        self.ttls.lock().len()
    }
}

impl ResponseCache for RecordingCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, data: Value, ttl: Duration) {
        self.ttls.lock().push((key.to_owned(), ttl));
        self.inner.set(key, data, ttl);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn clear(&self) {
        self.inner.clear()
    }
}
