//! Derivatives views assembled from Coinglass (and Binance futures).
//!
//! Every source is queried concurrently and inspected on its own; a failed
//! source leaves its field empty instead of failing the view.

use crate::{
    fallback::settled,
    model::{finite, num},
    providers::{
        binance::PremiumIndex,
        coinglass::{ExchangeLongShort, ExchangeOpenInterest, LiquidationInfo, SymbolFunding},
        BinanceAPI, CoinglassAPI,
    },
};
use futures::join;
use serde::Serialize;

/// Coinglass window code for 24h aggregates.
const WINDOW_24H: &str = "2";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInterestSummary {
    pub total_usd: Option<f64>,
    pub change_24h: Option<f64>,
    pub exchanges: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSummary {
    pub symbol: String,
    pub average_rate: Option<f64>,
    pub exchanges: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationSummary {
    pub total_usd: Option<f64>,
    pub long_usd: Option<f64>,
    pub short_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongShortSummary {
    pub long_rate: Option<f64>,
    pub short_rate: Option<f64>,
    pub long_vol_usd: Option<f64>,
    pub short_vol_usd: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativesOverview {
    pub btc_open_interest: Option<OpenInterestSummary>,
    pub eth_open_interest: Option<OpenInterestSummary>,
    pub funding_rates: Vec<FundingSummary>,
    pub btc_liquidations: Option<LiquidationSummary>,
    pub btc_long_short: Option<LongShortSummary>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDerivatives {
    pub symbol: String,
    pub open_interest: Option<OpenInterestSummary>,
    pub funding: Option<FundingSummary>,
    pub liquidations: Option<LiquidationSummary>,
    pub long_short: Option<LongShortSummary>,
    pub premium_index: Option<PremiumIndex>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        finite(sum / n as f64)
    }
}

fn sum(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut seen = false;
    let total = values.fold(0.0, |acc, v| {
        seen = true;
        acc + v
    });
    if seen {
        finite(total)
    } else {
        None
    }
}

/// Coinglass includes an `All` row with the cross-exchange total; without it
/// the per-exchange rows are summed.
pub fn summarize_open_interest(rows: &[ExchangeOpenInterest]) -> OpenInterestSummary {
    let all = rows
        .iter()
        .find(|r| r.exchange_name.eq_ignore_ascii_case("all"));
    let exchanges: Vec<&ExchangeOpenInterest> = rows
        .iter()
        .filter(|r| !r.exchange_name.eq_ignore_ascii_case("all"))
        .collect();
    let total_usd = match all {
        Some(all) => num(&all.open_interest),
        None => sum(exchanges.iter().filter_map(|r| num(&r.open_interest))),
    };
    OpenInterestSummary {
        total_usd,
        change_24h: all.and_then(|a| num(&a.h24_change)),
        exchanges: exchanges.len(),
    }
}

pub fn summarize_funding(funding: &SymbolFunding) -> FundingSummary {
    let rates: Vec<f64> = funding
        .u_margin_list
        .iter()
        .filter_map(|r| num(&r.rate))
        .collect();
    FundingSummary {
        symbol: funding.symbol.clone(),
        average_rate: mean(rates.iter().copied()),
        exchanges: rates.len(),
    }
}

pub fn summarize_liquidations(info: &LiquidationInfo) -> LiquidationSummary {
    LiquidationSummary {
        total_usd: num(&info.total_vol_usd),
        long_usd: num(&info.long_vol_usd),
        short_usd: num(&info.short_vol_usd),
    }
}

pub fn summarize_long_short(rows: &[ExchangeLongShort]) -> LongShortSummary {
    LongShortSummary {
        long_rate: mean(rows.iter().filter_map(|r| num(&r.long_rate))),
        short_rate: mean(rows.iter().filter_map(|r| num(&r.short_rate))),
        long_vol_usd: sum(rows.iter().filter_map(|r| num(&r.long_vol_usd))),
        short_vol_usd: sum(rows.iter().filter_map(|r| num(&r.short_vol_usd))),
    }
}

pub async fn overview(coinglass: &CoinglassAPI) -> DerivativesOverview {
    let (btc_oi, eth_oi, funding, liquidations, long_short) = join!(
        coinglass.open_interest("BTC"),
        coinglass.open_interest("ETH"),
        coinglass.funding_rates(None),
        coinglass.liquidations("BTC", WINDOW_24H),
        coinglass.long_short("BTC", WINDOW_24H),
    );
    DerivativesOverview {
        btc_open_interest: settled("BTC open interest", btc_oi)
            .map(|rows| summarize_open_interest(&rows)),
        eth_open_interest: settled("ETH open interest", eth_oi)
            .map(|rows| summarize_open_interest(&rows)),
        funding_rates: settled("funding rates", funding)
            .map(|rows| rows.iter().map(summarize_funding).collect())
            .unwrap_or_default(),
        btc_liquidations: settled("BTC liquidations", liquidations)
            .map(|info| summarize_liquidations(&info)),
        btc_long_short: settled("BTC long/short", long_short)
            .map(|rows| summarize_long_short(&rows)),
    }
}

/// Binance futures trade against USDT, so the premium index is looked up as
/// `{SYMBOL}USDT`.
pub async fn symbol_derivatives(
    coinglass: &CoinglassAPI,
    binance: &BinanceAPI,
    symbol: &str,
) -> SymbolDerivatives {
    let symbol = symbol.to_uppercase();
    let futures_pair = format!("{}USDT", symbol);
    let (oi, funding, liquidations, long_short, premium) = join!(
        coinglass.open_interest(&symbol),
        coinglass.funding_rates(Some(&symbol)),
        coinglass.liquidations(&symbol, WINDOW_24H),
        coinglass.long_short(&symbol, WINDOW_24H),
        binance.premium_index(&futures_pair),
    );
    SymbolDerivatives {
        open_interest: settled("open interest", oi).map(|rows| summarize_open_interest(&rows)),
        funding: settled("funding", funding).and_then(|rows| {
            rows.iter()
                .find(|f| f.symbol.eq_ignore_ascii_case(&symbol))
                .map(summarize_funding)
        }),
        liquidations: settled("liquidations", liquidations).map(|i| summarize_liquidations(&i)),
        long_short: settled("long/short", long_short).map(|rows| summarize_long_short(&rows)),
        premium_index: settled("premium index", premium),
        symbol,
    }
}
