use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Provenance of a [`NormalizedAsset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    Coingecko,
    Coinpaprika,
    Coincap,
    Coinlore,
}

impl AssetSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetSource::Coingecko => "coingecko",
            AssetSource::Coinpaprika => "coinpaprika",
            AssetSource::Coincap => "coincap",
            AssetSource::Coinlore => "coinlore",
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common ticker shape. Numeric fields are finite or `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAsset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub rank: Option<u32>,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub change_1h: Option<f64>,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub last_updated: Option<String>,
    pub source: AssetSource,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedGlobalData {
    pub total_market_cap: Option<f64>,
    pub total_volume_24h: Option<f64>,
    pub btc_dominance: Option<f64>,
    pub eth_dominance: Option<f64>,
    pub total_coins: Option<u64>,
    pub market_cap_change_24h: Option<f64>,
    /// Providers that contributed, in the order they were merged.
    pub sources: Vec<String>,
}

impl NormalizedGlobalData {
    /// Fills every empty field of `self` from `other`. Returns whether
    /// anything was taken.
    pub fn fill_from(&mut self, other: &NormalizedGlobalData) -> bool {
        fn fill<T: Copy>(slot: &mut Option<T>, from: Option<T>) -> bool {
            if slot.is_none() && from.is_some() {
                *slot = from;
                true
            } else {
                false
            }
        }
        let mut took = false;
        took |= fill(&mut self.total_market_cap, other.total_market_cap);
        took |= fill(&mut self.total_volume_24h, other.total_volume_24h);
        took |= fill(&mut self.btc_dominance, other.btc_dominance);
        took |= fill(&mut self.eth_dominance, other.eth_dominance);
        took |= fill(&mut self.total_coins, other.total_coins);
        took |= fill(&mut self.market_cap_change_24h, other.market_cap_change_24h);
        took
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedExchange {
    pub id: String,
    pub name: String,
    pub rank: Option<u32>,
    pub volume_24h: Option<f64>,
    pub markets: Option<u64>,
    pub url: Option<String>,
    pub source: AssetSource,
}

/// Reads a JSON number or numeric string; anything non-finite becomes `None`.
pub fn num(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Non-negative integer view of [`num`], for ranks and counts.
pub fn count(value: &Value) -> Option<u64> {
    num(value).filter(|n| *n >= 0.0).map(|n| n.round() as u64)
}

pub fn finite(n: f64) -> Option<f64> {
    Some(n).filter(|n| n.is_finite())
}

pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn num_accepts_strings_and_rejects_garbage() {
        assert_eq!(num(&json!("42.5")), Some(42.5));
        assert_eq!(num(&json!(7)), Some(7.0));
        assert_eq!(num(&json!("NaN")), None);
        assert_eq!(num(&json!("inf")), None);
        assert_eq!(num(&json!(null)), None);
        assert_eq!(num(&json!("")), None);
    }

    #[test]
    fn fill_from_only_touches_empty_fields() {
        let mut a = NormalizedGlobalData {
            total_market_cap: Some(1.0),
            ..Default::default()
        };
        let b = NormalizedGlobalData {
            total_market_cap: Some(2.0),
            eth_dominance: Some(17.0),
            ..Default::default()
        };
        assert!(a.fill_from(&b));
        assert_eq!(a.total_market_cap, Some(1.0));
        assert_eq!(a.eth_dominance, Some(17.0));
        assert!(!a.fill_from(&b));
    }
}
