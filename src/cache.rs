use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// Key/value store for decoded provider payloads.
///
/// Implementations are shared between clients as `Arc<dyn ResponseCache>`, so a
/// test can hand every client its own empty cache.
pub trait ResponseCache: Send + Sync {
    /// Returns the stored value if present and not expired. Expired entries are
    /// evicted on the way out.
    fn get(&self, key: &str) -> Option<Value>;

    /// Inserts or replaces the entry, resetting its timestamp and TTL.
    fn set(&self, key: &str, data: Value, ttl: Duration);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

struct CacheEntry {
    data: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// Unbounded in-memory cache. No size cap and no LRU: entries leave only when
/// a `get` finds them expired, or on `clear`.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
            Some(_) => {
                debug!("cache entry {} expired", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, data: Value, ttl: Duration) {
        self.entries.lock().insert(
            key.to_owned(),
            CacheEntry {
                data,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear()
    }
}

/// Volatility classes used to pick a TTL per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Orderbook,
    Ticker,
    Short,
    Historical,
    HistoricalLong,
    Static,
    /// Confirmed chain data; lives as long as the process.
    Immutable,
}

impl TtlClass {
    pub fn duration(self) -> Duration {
        match self {
            TtlClass::Orderbook => Duration::from_secs(5),
            TtlClass::Ticker => Duration::from_secs(10),
            TtlClass::Short => Duration::from_secs(60),
            TtlClass::Historical => Duration::from_secs(300),
            TtlClass::HistoricalLong => Duration::from_secs(900),
            TtlClass::Static => Duration::from_secs(3600),
            TtlClass::Immutable => Duration::from_secs(100 * 365 * 24 * 3600),
        }
    }
}

impl From<TtlClass> for Duration {
    fn from(class: TtlClass) -> Self {
        class.duration()
    }
}
