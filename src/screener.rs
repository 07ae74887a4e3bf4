//! Filter/sort/paginate over already aggregated assets.
//!
//! Filters are ANDed predicates. A filter on a value the asset does not have
//! never matches. Presets are canned filter lists, nothing more.

use crate::model::NormalizedAsset;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

/// Tolerance for `eq` on floats.
const EQ_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreenerError {
    #[error("unknown screener field `{0}`")]
    UnknownField(String),
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("invalid value for {field} {operator}: {reason}")]
    InvalidValue {
        field: Field,
        operator: Operator,
        reason: String,
    },
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
    #[error("filter must look like field:operator:value, got `{0}`")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Price,
    MarketCap,
    TotalVolume,
    Rank,
    Change1h,
    Change24h,
    Change7d,
    CirculatingSupply,
    MaxSupply,
    /// volume / market cap
    VolumeToMcap,
    /// circulating / max supply
    SupplyRatio,
    Symbol,
    Id,
    Name,
    Source,
}

impl Field {
    pub fn is_numeric(self) -> bool {
        !matches!(self, Field::Symbol | Field::Id | Field::Name | Field::Source)
    }

    pub fn number(self, asset: &NormalizedAsset) -> Option<f64> {
        match self {
            Field::Price => asset.price,
            Field::MarketCap => asset.market_cap,
            Field::TotalVolume => asset.volume_24h,
            Field::Rank => asset.rank.map(f64::from),
            Field::Change1h => asset.change_1h,
            Field::Change24h => asset.change_24h,
            Field::Change7d => asset.change_7d,
            Field::CirculatingSupply => asset.supply,
            Field::MaxSupply => asset.max_supply,
            Field::VolumeToMcap => ratio(asset.volume_24h, asset.market_cap),
            Field::SupplyRatio => ratio(asset.supply, asset.max_supply),
            Field::Symbol | Field::Id | Field::Name | Field::Source => None,
        }
    }

    pub fn text(self, asset: &NormalizedAsset) -> Option<String> {
        match self {
            Field::Symbol => Some(asset.symbol.clone()),
            Field::Id => Some(asset.id.clone()),
            Field::Name => Some(asset.name.clone()),
            Field::Source => Some(asset.source.to_string()),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Price => "price",
            Field::MarketCap => "market_cap",
            Field::TotalVolume => "total_volume",
            Field::Rank => "rank",
            Field::Change1h => "change_1h",
            Field::Change24h => "change_24h",
            Field::Change7d => "change_7d",
            Field::CirculatingSupply => "circulating_supply",
            Field::MaxSupply => "max_supply",
            Field::VolumeToMcap => "volume_to_mcap",
            Field::SupplyRatio => "supply_ratio",
            Field::Symbol => "symbol",
            Field::Id => "id",
            Field::Name => "name",
            Field::Source => "source",
        }
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d).filter(|r| r.is_finite()),
        _ => None,
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "price" | "current_price" => Field::Price,
            "market_cap" | "mcap" => Field::MarketCap,
            "total_volume" | "volume" | "volume_24h" => Field::TotalVolume,
            "rank" | "market_cap_rank" => Field::Rank,
            "change_1h" | "price_change_percentage_1h" => Field::Change1h,
            "change_24h" | "price_change_percentage_24h" => Field::Change24h,
            "change_7d" | "price_change_percentage_7d" => Field::Change7d,
            "circulating_supply" | "supply" => Field::CirculatingSupply,
            "max_supply" => Field::MaxSupply,
            "volume_to_mcap" => Field::VolumeToMcap,
            "supply_ratio" => Field::SupplyRatio,
            "symbol" => Field::Symbol,
            "id" => Field::Id,
            "name" => Field::Name,
            "source" => Field::Source,
            other => return Err(ScreenerError::UnknownField(other.to_owned())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Between,
    In,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Eq => "eq",
            Operator::Between => "between",
            Operator::In => "in",
        })
    }
}

impl FromStr for Operator {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "gt" | ">" => Operator::Gt,
            "lt" | "<" => Operator::Lt,
            "gte" | ">=" => Operator::Gte,
            "lte" | "<=" => Operator::Lte,
            "eq" | "=" | "==" => Operator::Eq,
            "between" => Operator::Between,
            "in" => Operator::In,
            other => return Err(ScreenerError::UnknownOperator(other.to_owned())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Range(f64, f64),
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerFilter {
    pub field: Field,
    pub operator: Operator,
    pub value: FilterValue,
}

impl ScreenerFilter {
    /// Checks that the value shape fits the operator and field.
    pub fn new(field: Field, operator: Operator, value: FilterValue) -> Result<Self, ScreenerError> {
        let invalid = |reason: &str| ScreenerError::InvalidValue {
            field,
            operator,
            reason: reason.to_owned(),
        };
        match (operator, &value) {
            (Operator::Between, FilterValue::Range(lo, hi)) if lo <= hi => {}
            (Operator::Between, FilterValue::Range(..)) => return Err(invalid("range is reversed")),
            (Operator::Between, _) => return Err(invalid("expected lo,hi")),
            (Operator::In, FilterValue::List(items)) if !items.is_empty() => {}
            (Operator::In, _) => return Err(invalid("expected a non-empty list")),
            (Operator::Eq, FilterValue::Text(_)) if !field.is_numeric() => {}
            (_, FilterValue::Number(n)) if field.is_numeric() && n.is_finite() => {}
            _ => return Err(invalid("value does not fit this field")),
        }
        Ok(Self {
            field,
            operator,
            value,
        })
    }

    pub fn matches(&self, asset: &NormalizedAsset) -> bool {
        if self.field.is_numeric() {
            let actual = match self.field.number(asset) {
                Some(v) => v,
                None => return false,
            };
            match (&self.operator, &self.value) {
                (Operator::Gt, FilterValue::Number(n)) => actual > *n,
                (Operator::Lt, FilterValue::Number(n)) => actual < *n,
                (Operator::Gte, FilterValue::Number(n)) => actual >= *n,
                (Operator::Lte, FilterValue::Number(n)) => actual <= *n,
                (Operator::Eq, FilterValue::Number(n)) => (actual - n).abs() < EQ_EPSILON,
                (Operator::Between, FilterValue::Range(lo, hi)) => actual >= *lo && actual <= *hi,
                (Operator::In, FilterValue::List(items)) => items
                    .iter()
                    .filter_map(|i| i.trim().parse::<f64>().ok())
                    .any(|n| (actual - n).abs() < EQ_EPSILON),
                _ => false,
            }
        } else {
            let actual = match self.field.text(asset) {
                Some(v) => v.to_lowercase(),
                None => return false,
            };
            match (&self.operator, &self.value) {
                (Operator::Eq, FilterValue::Text(t)) => actual == t.to_lowercase(),
                (Operator::In, FilterValue::List(items)) => {
                    items.iter().any(|i| i.trim().to_lowercase() == actual)
                }
                _ => false,
            }
        }
    }
}

/// `field:operator:value`, e.g. `market_cap:gte:1000000000`,
/// `change_24h:between:5,20` or `symbol:in:btc,eth`.
impl FromStr for ScreenerFilter {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (field, operator, raw) = match (parts.next(), parts.next(), parts.next()) {
            (Some(f), Some(o), Some(v)) => (f.parse::<Field>()?, o.parse::<Operator>()?, v.trim()),
            _ => return Err(ScreenerError::Malformed(s.to_owned())),
        };
        let bad_number = |raw: &str| ScreenerError::InvalidValue {
            field,
            operator,
            reason: format!("`{}` is not a number", raw),
        };
        let value = match operator {
            Operator::Between => {
                let (lo, hi) = raw
                    .split_once(',')
                    .ok_or_else(|| ScreenerError::Malformed(s.to_owned()))?;
                FilterValue::Range(
                    lo.trim().parse().map_err(|_| bad_number(lo))?,
                    hi.trim().parse().map_err(|_| bad_number(hi))?,
                )
            }
            Operator::In => FilterValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|i| !i.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
            _ if field.is_numeric() => FilterValue::Number(raw.parse().map_err(|_| bad_number(raw))?),
            _ => FilterValue::Text(raw.to_owned()),
        };
        ScreenerFilter::new(field, operator, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(ScreenerError::UnknownOperator(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    HotGainers,
    UndervaluedGems,
    LargeCaps,
    HighVolume,
    Oversold,
    ScarceSupply,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::HotGainers,
        Preset::UndervaluedGems,
        Preset::LargeCaps,
        Preset::HighVolume,
        Preset::Oversold,
        Preset::ScarceSupply,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::HotGainers => "hot-gainers",
            Preset::UndervaluedGems => "undervalued-gems",
            Preset::LargeCaps => "large-caps",
            Preset::HighVolume => "high-volume",
            Preset::Oversold => "oversold",
            Preset::ScarceSupply => "scarce-supply",
        }
    }

    pub fn filters(self) -> Vec<ScreenerFilter> {
        use FilterValue::{Number, Range};
        let f = |field, operator, value| ScreenerFilter {
            field,
            operator,
            value,
        };
        match self {
            Preset::HotGainers => vec![
                f(Field::Change24h, Operator::Gte, Number(5.0)),
                f(Field::TotalVolume, Operator::Gte, Number(10_000_000.0)),
            ],
            Preset::UndervaluedGems => vec![
                f(Field::MarketCap, Operator::Between, Range(10_000_000.0, 500_000_000.0)),
                f(Field::VolumeToMcap, Operator::Gte, Number(0.1)),
            ],
            Preset::LargeCaps => vec![f(Field::MarketCap, Operator::Gte, Number(10_000_000_000.0))],
            Preset::HighVolume => {
                vec![f(Field::TotalVolume, Operator::Gte, Number(1_000_000_000.0))]
            }
            Preset::Oversold => vec![
                f(Field::Change7d, Operator::Lte, Number(-15.0)),
                f(Field::MarketCap, Operator::Gte, Number(100_000_000.0)),
            ],
            Preset::ScarceSupply => vec![
                f(Field::MaxSupply, Operator::Gt, Number(0.0)),
                f(Field::SupplyRatio, Operator::Gte, Number(0.9)),
            ],
        }
    }

    pub fn default_sort(self) -> SortSpec {
        let (field, direction) = match self {
            Preset::HotGainers => (Field::Change24h, SortDirection::Desc),
            Preset::UndervaluedGems => (Field::VolumeToMcap, SortDirection::Desc),
            Preset::LargeCaps | Preset::ScarceSupply => (Field::MarketCap, SortDirection::Desc),
            Preset::HighVolume => (Field::TotalVolume, SortDirection::Desc),
            Preset::Oversold => (Field::Change7d, SortDirection::Asc),
        };
        SortSpec { field, direction }
    }
}

impl FromStr for Preset {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ScreenerError::UnknownPreset(s.trim().to_owned()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenerQuery {
    pub filters: Vec<ScreenerFilter>,
    pub sort: Option<SortSpec>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ScreenerQuery {
    pub fn new(filters: Vec<ScreenerFilter>) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    /// Preset filters first, then `extra`; the preset's sort applies unless
    /// replaced later.
    pub fn from_preset(preset: Preset, extra: Vec<ScreenerFilter>) -> Self {
        let mut filters = preset.filters();
        filters.extend(extra);
        Self {
            filters,
            sort: Some(preset.default_sort()),
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, field: Field, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec { field, direction });
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenerResult {
    /// Matches before pagination.
    pub total: usize,
    pub offset: usize,
    pub assets: Vec<NormalizedAsset>,
}

pub fn filter_assets<'a>(
    assets: &'a [NormalizedAsset],
    filters: &[ScreenerFilter],
) -> Vec<&'a NormalizedAsset> {
    assets
        .iter()
        .filter(|a| filters.iter().all(|f| f.matches(a)))
        .collect()
}

/// Missing values sort last in either direction.
fn compare(a: &NormalizedAsset, b: &NormalizedAsset, sort: SortSpec) -> Ordering {
    if !sort.field.is_numeric() {
        let ord = sort.field.text(a).cmp(&sort.field.text(b));
        return match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
    }
    match (sort.field.number(a), sort.field.number(b)) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn screen(assets: &[NormalizedAsset], query: &ScreenerQuery) -> ScreenerResult {
    let mut matched = filter_assets(assets, &query.filters);
    if let Some(sort) = query.sort {
        matched.sort_by(|a, b| compare(a, b, sort));
    }
    let total = matched.len();
    let page = matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    ScreenerResult {
        total,
        offset: query.offset,
        assets: page,
    }
}
