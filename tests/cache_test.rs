mod common;

use marketfeed::{MemoryCache, ResponseCache, TtlClass};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_cache_hit_then_expiry() {
    common::init_logger();
    let cache = MemoryCache::new();
    cache.set("k", json!({"price": 1.5}), Duration::from_millis(50));
    assert_eq!(cache.get("k"), Some(json!({"price": 1.5})));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(cache.get("k"), None);
    // expired entries are evicted on read
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_cache_overwrite_resets_ttl() {
    let cache = MemoryCache::new();
    cache.set("k", json!(1), Duration::from_millis(40));
    tokio::time::sleep(Duration::from_millis(25)).await;
    cache.set("k", json!(2), Duration::from_millis(200));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(cache.get("k"), Some(json!(2)));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_cache_miss_and_clear() {
    let cache = MemoryCache::new();
    assert_eq!(cache.get("absent"), None);
    cache.set("a", json!([]), TtlClass::Static.into());
    cache.set("b", json!(null), TtlClass::Immutable.into());
    assert_eq!(cache.len(), 2);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_ttl_classes() {
    assert_eq!(TtlClass::Orderbook.duration(), Duration::from_secs(5));
    assert_eq!(TtlClass::Ticker.duration(), Duration::from_secs(10));
    assert_eq!(TtlClass::Short.duration(), Duration::from_secs(60));
    assert_eq!(TtlClass::Historical.duration(), Duration::from_secs(300));
    assert_eq!(TtlClass::HistoricalLong.duration(), Duration::from_secs(900));
    assert_eq!(TtlClass::Static.duration(), Duration::from_secs(3600));
    assert!(TtlClass::Immutable.duration() > Duration::from_secs(3600 * 24 * 365));
}
