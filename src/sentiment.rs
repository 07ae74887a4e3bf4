//! Rough per-coin sentiment from price momentum and social reach.
//!
//! The score is a heuristic, not a calibrated model.

use crate::model::NormalizedAsset;
use serde::Serialize;

pub const SCORE_LIMIT: i32 = 100;

/// `round(change_24h * 3 + log10(followers) * 2)`, clamped to `[-100, 100]`.
/// Missing or non-positive follower counts contribute nothing.
pub fn sentiment_score(change_24h: Option<f64>, twitter_followers: Option<u64>) -> i32 {
    let momentum = change_24h.filter(|c| c.is_finite()).unwrap_or(0.0) * 3.0;
    let reach = match twitter_followers {
        Some(f) if f > 0 => (f as f64).log10() * 2.0,
        _ => 0.0,
    };
    let raw = (momentum + reach).round();
    raw.clamp(-(SCORE_LIMIT as f64), SCORE_LIMIT as f64) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Buckets by the sign of the 24h change, independent of the score.
pub fn classify(change_24h: Option<f64>) -> Sentiment {
    match change_24h.filter(|c| c.is_finite()) {
        Some(c) if c > 0.0 => Sentiment::Bullish,
        Some(c) if c < 0.0 => Sentiment::Bearish,
        _ => Sentiment::Neutral,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSentiment {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub change_24h: Option<f64>,
    pub twitter_followers: Option<u64>,
    pub score: i32,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummary {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
    pub average_change_24h: Option<f64>,
}

impl SentimentSummary {
    pub fn overall(&self) -> Sentiment {
        if self.bullish > self.bearish {
            Sentiment::Bullish
        } else if self.bearish > self.bullish {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }
}

pub fn summarize(assets: &[NormalizedAsset]) -> SentimentSummary {
    let mut summary = SentimentSummary::default();
    let mut total = 0.0;
    let mut counted = 0usize;
    for asset in assets {
        match classify(asset.change_24h) {
            Sentiment::Bullish => summary.bullish += 1,
            Sentiment::Bearish => summary.bearish += 1,
            Sentiment::Neutral => summary.neutral += 1,
        }
        if let Some(change) = asset.change_24h {
            total += change;
            counted += 1;
        }
    }
    if counted > 0 {
        summary.average_change_24h = Some(total / counted as f64);
    }
    summary
}
