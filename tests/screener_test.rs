use marketfeed::{
    screener::{
        screen, Field, FilterValue, Operator, Preset, ScreenerError, ScreenerFilter,
        ScreenerQuery, SortDirection,
    },
    AssetSource, NormalizedAsset,
};

fn asset(symbol: &str, market_cap: f64, volume: f64, change_24h: Option<f64>) -> NormalizedAsset {
    NormalizedAsset {
        id: symbol.to_owned(),
        symbol: symbol.to_owned(),
        name: symbol.to_uppercase(),
        rank: None,
        price: Some(1.0),
        market_cap: Some(market_cap),
        volume_24h: Some(volume),
        change_1h: None,
        change_24h,
        change_7d: None,
        supply: None,
        max_supply: None,
        last_updated: None,
        source: AssetSource::Coincap,
    }
}

fn universe() -> Vec<NormalizedAsset> {
    vec![
        asset("a", 500e6, 10e6, Some(1.0)),
        asset("b", 1e9, 50e6, Some(6.0)),
        asset("c", 1.5e9, 300e6, Some(-2.0)),
        asset("d", 2e9, 100e6, None),
        asset("e", 900e6, 5e6, Some(12.0)),
    ]
}

fn ids(assets: &[NormalizedAsset]) -> Vec<&str> {
    assets.iter().map(|a| a.id.as_str()).collect()
}

#[test]
fn test_gte_keeps_input_order_without_sort() {
    let query = ScreenerQuery::new(vec!["market_cap:gte:1000000000".parse().unwrap()]);
    let result = screen(&universe(), &query);
    assert_eq!(result.total, 3);
    assert_eq!(ids(&result.assets), vec!["b", "c", "d"]);
}

#[test]
fn test_computed_volume_to_mcap() {
    let filter = ScreenerFilter::new(Field::VolumeToMcap, Operator::Gte, FilterValue::Number(0.05))
        .unwrap();
    let result = screen(&universe(), &ScreenerQuery::new(vec![filter]));
    // b = 0.05, c = 0.2, d = 0.05
    assert_eq!(ids(&result.assets), vec!["b", "c", "d"]);
}

#[test]
fn test_volume_to_mcap_ratio() {
    let a = asset("x", 1e9, 50e6, None);
    assert_eq!(Field::VolumeToMcap.number(&a), Some(0.05));

    let zero_cap = asset("z", 0.0, 50e6, None);
    assert_eq!(Field::VolumeToMcap.number(&zero_cap), None);
}

#[test]
fn test_filters_are_anded_and_missing_values_never_match() {
    let query = ScreenerQuery::new(vec![
        "market_cap:gte:1e9".parse().unwrap(),
        "change_24h:gt:-100".parse().unwrap(),
    ]);
    let result = screen(&universe(), &query);
    assert_eq!(ids(&result.assets), vec!["b", "c"]);
}

#[test]
fn test_between_and_in() {
    let query = ScreenerQuery::new(vec!["change_24h:between:0,10".parse().unwrap()]);
    assert_eq!(ids(&screen(&universe(), &query).assets), vec!["a", "b"]);

    let query = ScreenerQuery::new(vec!["symbol:in:A, e".parse().unwrap()]);
    assert_eq!(ids(&screen(&universe(), &query).assets), vec!["a", "e"]);
}

#[test]
fn test_sort_puts_missing_values_last_and_paginates() {
    let query = ScreenerQuery::new(vec![])
        .sorted_by(Field::Change24h, SortDirection::Desc)
        .page(1, 2);
    let result = screen(&universe(), &query);
    assert_eq!(result.total, 5);
    assert_eq!(result.offset, 1);
    assert_eq!(ids(&result.assets), vec!["b", "a"]);

    let asc = ScreenerQuery::new(vec![]).sorted_by(Field::Change24h, SortDirection::Asc);
    let result = screen(&universe(), &asc);
    assert_eq!(ids(&result.assets), vec!["c", "a", "b", "e", "d"]);

    let past_end = ScreenerQuery::new(vec![]).page(10, 5);
    let result = screen(&universe(), &past_end);
    assert_eq!(result.total, 5);
    assert!(result.assets.is_empty());
}

#[test]
fn test_hot_gainers_preset() {
    let query = ScreenerQuery::from_preset(Preset::HotGainers, vec![]);
    let result = screen(&universe(), &query);
    // e gains more but trades under the volume floor
    assert_eq!(ids(&result.assets), vec!["b"]);
    assert_eq!("hot-gainers".parse::<Preset>().unwrap(), Preset::HotGainers);
    assert!(Preset::ALL.iter().all(|p| !p.filters().is_empty()));
}

#[test]
fn test_parse_errors() {
    assert_eq!(
        "marketcap".parse::<ScreenerFilter>().unwrap_err(),
        ScreenerError::Malformed("marketcap".to_owned())
    );
    assert_eq!(
        "hype:gt:1".parse::<ScreenerFilter>().unwrap_err(),
        ScreenerError::UnknownField("hype".to_owned())
    );
    assert_eq!(
        "price:near:1".parse::<ScreenerFilter>().unwrap_err(),
        ScreenerError::UnknownOperator("near".to_owned())
    );
    assert!(matches!(
        "price:gt:cheap".parse::<ScreenerFilter>(),
        Err(ScreenerError::InvalidValue { .. })
    ));
    assert!(matches!(
        "price:between:10,1".parse::<ScreenerFilter>(),
        Err(ScreenerError::InvalidValue { .. })
    ));
    assert!(matches!(
        ScreenerFilter::new(Field::Symbol, Operator::Gt, FilterValue::Number(1.0)),
        Err(ScreenerError::InvalidValue { .. })
    ));
}
