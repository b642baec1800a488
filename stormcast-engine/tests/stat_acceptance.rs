use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::convert::TryFrom;

use stormcast_engine::{
    BaseWeather, Catalog, DayInput, DaySelector, EngineConfig, Location, PoolBuilder, PoolRequest,
    Role, SelectionRule, SessionState, WeightTable, legal_kinds,
};

const SAMPLE_SIZE: usize = 20_000;
const ECLIPSE_SAMPLE_SIZE: usize = 100_000;
const TOLERANCE: f64 = 0.025;

fn rate(count: usize, total: usize) -> f64 {
    let count = u32::try_from(count).expect("count fits");
    let total = u32::try_from(total).expect("total fits");
    f64::from(count) / f64::from(total)
}

fn select_once(
    catalog: &Catalog,
    weights: &WeightTable,
    config: &EngineConfig,
    day_index: u32,
    map_seed: i64,
    locations: &[Location],
) -> stormcast_engine::DayForecast {
    DaySelector::new(catalog, weights, config)
        .select(
            &mut SessionState::new(),
            Role::Authority,
            &DayInput {
                day_index,
                map_seed,
                locations,
                intensity: 0.0,
            },
        )
        .expect("selection succeeds")
}

#[test]
fn eclipse_override_rate_converges_to_five_percent() {
    let catalog = Catalog::with_base_kinds(100);
    let weights = WeightTable::default_table();
    let config = EngineConfig::default();
    let locations = vec![Location::new(
        "85 Rend",
        [BaseWeather::Rainy, BaseWeather::Stormy, BaseWeather::Eclipsed],
    )];

    let mut overrides = 0usize;
    for seed in 0..ECLIPSE_SAMPLE_SIZE {
        let map_seed = i64::try_from(seed).expect("seed fits");
        let forecast = select_once(&catalog, &weights, &config, 0, map_seed, &locations);
        if forecast.assignments[0].rule == SelectionRule::EclipseOverride {
            overrides += 1;
        }
    }
    let observed = rate(overrides, ECLIPSE_SAMPLE_SIZE);
    assert!(
        (observed - 0.05).abs() <= 0.005,
        "eclipse rate drifted: observed {observed:.4}"
    );
}

#[test]
fn weighted_draw_frequencies_follow_weights() {
    let catalog = Catalog::with_base_kinds(100);
    let config = EngineConfig::default();
    let weights = WeightTable::new()
        .with(BaseWeather::None, BaseWeather::Rainy, 3)
        .with(BaseWeather::None, BaseWeather::Foggy, 1)
        .with(BaseWeather::None, BaseWeather::None, 0);
    let locations = vec![Location::new(
        "61 March",
        [BaseWeather::Rainy, BaseWeather::Foggy],
    )];

    let mut rainy = 0usize;
    let mut foggy = 0usize;
    for seed in 0..SAMPLE_SIZE {
        let map_seed = i64::try_from(seed).expect("seed fits");
        let forecast = select_once(&catalog, &weights, &config, 1, map_seed, &locations);
        match forecast.assignments[0].base {
            BaseWeather::Rainy => rainy += 1,
            BaseWeather::Foggy => foggy += 1,
            other => panic!("unexpected weather {other}"),
        }
    }
    assert!((rate(rainy, SAMPLE_SIZE) - 0.75).abs() <= TOLERANCE);
    assert!((rate(foggy, SAMPLE_SIZE) - 0.25).abs() <= TOLERANCE);
}

#[test]
fn dust_replaces_a_quarter_of_clear_draws() {
    let catalog = Catalog::with_base_kinds(100);
    let config = EngineConfig::default();
    // Only none carries weight, so every draw lands on none.
    let weights = WeightTable::new()
        .with(BaseWeather::None, BaseWeather::None, 100)
        .with(BaseWeather::None, BaseWeather::Rainy, 0);
    let locations = vec![Location::new(
        "20 Adamance",
        [BaseWeather::Rainy, BaseWeather::DustClouds],
    )];

    let mut dust = 0usize;
    for seed in 0..SAMPLE_SIZE {
        let map_seed = i64::try_from(seed).expect("seed fits");
        let forecast = select_once(&catalog, &weights, &config, 1, map_seed, &locations);
        let assignment = &forecast.assignments[0];
        match assignment.rule {
            SelectionRule::DustOverride => {
                assert_eq!(assignment.base, BaseWeather::DustClouds);
                dust += 1;
            }
            SelectionRule::WeightedDraw => assert!(assignment.base.is_none()),
            other => panic!("unexpected rule {other:?}"),
        }
    }
    let observed = rate(dust, SAMPLE_SIZE);
    assert!(
        (observed - 0.25).abs() <= TOLERANCE,
        "dust rate drifted: observed {observed:.4}"
    );
}

#[test]
fn clear_weight_obeys_scaling_law_for_random_tables() {
    let catalog = Catalog::with_base_kinds(100);
    let config = EngineConfig::default();
    let none = catalog.none_kind().unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
    let candidates = [
        BaseWeather::Rainy,
        BaseWeather::Stormy,
        BaseWeather::Foggy,
        BaseWeather::Flooded,
        BaseWeather::Eclipsed,
    ];

    for _ in 0..500 {
        let mut weights = WeightTable::new();
        let clear = rng.gen_range(0..200);
        weights.set(BaseWeather::Rainy, BaseWeather::None, clear);
        let mut total = i64::from(clear);
        for base in candidates {
            let weight = rng.gen_range(0..120);
            weights.set(BaseWeather::Rainy, base, weight);
            total += i64::from(weight);
        }
        if total == 0 {
            continue;
        }
        let legal_count = rng.gen_range(1..=candidates.len());
        let location = Location::new("law", candidates[..legal_count].iter().copied());
        let lookup = weights.row(BaseWeather::Rainy);
        let candidate_sum: i64 = candidates[..legal_count]
            .iter()
            .map(|base| i64::from(lookup.get(*base).unwrap_or(0)))
            .sum();
        let expected = i64::from(clear) * candidate_sum.max(1) / total;

        let legal = legal_kinds(&location, &catalog);
        let pool = PoolBuilder::new(&catalog, &config).build(
            &legal,
            &PoolRequest {
                location: &location,
                weights: lookup,
                intensity: 0.0,
            },
        );
        let observed = i64::try_from(pool.count_of(none)).expect("count fits");
        assert_eq!(observed, expected, "clear {clear}, candidates {candidate_sum}, total {total}");
    }
}
