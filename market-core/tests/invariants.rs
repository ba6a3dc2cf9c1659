//! Property tests for the price formation invariants
//!
//! These hold for every resource on every day, regardless of what the
//! collaborators feed in: prices never fall through their floors, smoothing
//! never overshoots its target, and the whole engine is a deterministic
//! function of its inputs.

use market_core::{
    CostWeights, DayInputs, LivingCosts, MarketEngine, PRICE_FLOOR, ProducerConfig, ProducerDef,
    ResourceDef, ResourceId, ResourceKind,
};

// === TEST FIXTURES ===

/// A small production chain: raw wood and iron feed tools, tools feed the
/// mine, plus a producer-less fish market and the usual non-tradables.
fn build_engine() -> MarketEngine {
    MarketEngine::from_defs(
        vec![
            ResourceDef::new("food", 1.0),
            ResourceDef::new("fish", 1.0),
            ResourceDef::new("wood", 2.0),
            ResourceDef::new("iron", 6.0),
            ResourceDef::new("tools", 8.0),
            ResourceDef::new("silver", 1.0).with_kind(ResourceKind::Currency),
            ResourceDef::new("admin", 1.0).with_kind(ResourceKind::Virtual),
        ],
        vec![
            ProducerDef::new("farm")
                .with_output("food", 3.2)
                .with_job("peasant", 2.0)
                .with_market_config(ProducerConfig {
                    wage: CostWeights::new(0.08, 0.05),
                    price: CostWeights::new(0.08, 0.15),
                    ..Default::default()
                }),
            ProducerDef::new("mine")
                .with_input("tools", 0.02)
                .with_output("iron", 0.5)
                .with_job("miner", 3.0),
            ProducerDef::new("toolsmith")
                .with_input("wood", 0.5)
                .with_input("iron", 0.5)
                .with_output("tools", 1.0)
                .with_job("worker", 4.0),
        ],
    )
    .unwrap()
}

/// Deterministic but wiggly flows so every day looks different without any
/// randomness.
fn day_inputs(engine: &MarketEngine, day: u64) -> DayInputs {
    let mut inputs = DayInputs::new(
        1000 + (day % 50) * 10,
        LivingCosts::new(0.3 + (day % 7) as f64 * 0.05, 0.1),
    );
    for (index, (id, _)) in engine.catalog().tradable().enumerate() {
        let k = index as u64 + 1;
        let supply = 5.0 + ((day * 7 * k) % 23) as f64;
        let demand = 4.0 + ((day * 11 * k) % 29) as f64;
        let inventory = 20.0 + ((day * 3 * k) % 97) as f64 * 5.0;
        inputs = inputs.with_flows(id, supply, demand, inventory);
    }
    inputs
}

fn tradable_ids(engine: &MarketEngine) -> Vec<ResourceId> {
    engine.catalog().tradable().map(|(id, _)| id).collect()
}

// === PROPERTY TESTS ===

#[test]
fn price_floors_hold_on_every_day() {
    let mut engine = build_engine();

    for day in 1..=300 {
        let inputs = day_inputs(&engine, day);
        let report = engine.advance_day(&inputs);

        for r in &report.resources {
            let name = &engine.catalog().get(r.resource).unwrap().name;
            assert!(
                r.price.is_finite(),
                "day {}: {} price is not finite",
                day,
                name
            );
            assert!(
                r.price >= PRICE_FLOOR,
                "day {}: {} price {} below absolute floor",
                day,
                name,
                r.price
            );
            assert!(
                r.price >= r.cost_anchor * 0.6 - 1e-9,
                "day {}: {} price {} below cost floor (anchor {})",
                day,
                name,
                r.price,
                r.cost_anchor
            );
        }
    }
}

#[test]
fn smoothing_never_overshoots_the_target() {
    let mut engine = build_engine();

    for day in 1..=200 {
        let report = engine.advance_day(&day_inputs(&engine, day));
        for r in &report.resources {
            assert!(
                (r.price - r.previous_price).abs() <= (r.target - r.previous_price).abs() + 1e-9,
                "day {}: price moved {} -> {} past target {}",
                day,
                r.previous_price,
                r.price,
                r.target
            );
        }
    }
}

#[test]
fn published_state_matches_the_report() {
    let mut engine = build_engine();

    for day in 1..=50 {
        let report = engine.advance_day(&day_inputs(&engine, day));
        for r in &report.resources {
            let state = engine.market(r.resource).unwrap();
            assert_eq!(state.price, r.price);
            assert_eq!(state.supply, r.supply);
            assert_eq!(state.demand, r.demand);
            assert_eq!(state.price_history.latest(), Some(r.price));
        }
    }
}

#[test]
fn every_tradable_is_priced_exactly_once_per_day() {
    let mut engine = build_engine();
    let tradables = tradable_ids(&engine);

    let report = engine.advance_day(&day_inputs(&engine, 1));
    assert_eq!(report.resources.len(), tradables.len());
    for id in &tradables {
        assert_eq!(
            report.resources.iter().filter(|r| r.resource == *id).count(),
            1
        );
        assert_eq!(engine.market(*id).unwrap().price_history.len(), 1);
    }
}

#[test]
fn histories_stay_bounded() {
    let mut engine = build_engine();

    for day in 1..=700 {
        engine.advance_day(&day_inputs(&engine, day));
    }

    for id in tradable_ids(&engine) {
        let state = engine.market(id).unwrap();
        assert_eq!(state.price_history.len(), 300);
        assert_eq!(state.supply_history.len(), 600);
        assert_eq!(state.demand_history.len(), 600);
    }
}

#[test]
fn identical_input_streams_produce_identical_markets() {
    let mut a = build_engine();
    let mut b = build_engine();

    for day in 1..=100 {
        let ra = a.advance_day(&day_inputs(&a, day));
        let rb = b.advance_day(&day_inputs(&b, day));
        assert_eq!(ra.resources, rb.resources, "runs diverged on day {}", day);
    }

    for id in tradable_ids(&a) {
        assert_eq!(a.current_price(id), b.current_price(id));
        assert_eq!(
            a.market(id).unwrap().price_history.to_vec(),
            b.market(id).unwrap().price_history.to_vec()
        );
    }
}

#[test]
fn shortage_raises_and_surplus_lowers_prices() {
    let mut engine = build_engine();
    let fish = engine.catalog().id_of("fish").unwrap();

    // Sustained shortage: thin supply, deep demand, empty stock
    let mut shortage_engine = engine.clone();
    for _ in 0..30 {
        let inputs =
            DayInputs::new(0, LivingCosts::default()).with_flows(fish, 5.0, 50.0, 0.0);
        shortage_engine.advance_day(&inputs);
    }
    assert!(
        shortage_engine.current_price(fish) > 1.0,
        "shortage should lift fish above its base price, got {}",
        shortage_engine.current_price(fish)
    );

    // Sustained surplus: deep supply, thin demand, bulging stock
    for _ in 0..30 {
        let inputs =
            DayInputs::new(0, LivingCosts::default()).with_flows(fish, 50.0, 5.0, 10_000.0);
        engine.advance_day(&inputs);
    }
    assert!(
        engine.current_price(fish) < 1.0,
        "surplus should push fish below its base price, got {}",
        engine.current_price(fish)
    );
}

#[test]
fn target_responds_monotonically_to_demand_and_inventory() {
    let fish_target = |supply: f64, demand: f64, inventory: f64| {
        let mut engine = build_engine();
        let fish = engine.catalog().id_of("fish").unwrap();
        let inputs =
            DayInputs::new(0, LivingCosts::default()).with_flows(fish, supply, demand, inventory);
        let report = engine.advance_day(&inputs);
        report
            .resources
            .iter()
            .find(|r| r.resource == fish)
            .unwrap()
            .target
    };

    // More demand, same supply and stock: target never drops
    let mut last = 0.0;
    for demand in [0.0, 5.0, 10.0, 20.0, 40.0, 80.0, 160.0] {
        let target = fish_target(20.0, demand, 100.0);
        assert!(
            target >= last - 1e-9,
            "target fell from {} to {} as demand rose to {}",
            last,
            target,
            demand
        );
        last = target;
    }

    // More stock, same flows: target never rises
    let mut last = f64::INFINITY;
    for inventory in [0.0, 50.0, 200.0, 800.0, 3200.0, 100_000.0] {
        let target = fish_target(20.0, 40.0, inventory);
        assert!(
            target <= last + 1e-9,
            "target rose from {} to {} as inventory grew to {}",
            last,
            target,
            inventory
        );
        last = target;
    }
}

// === WORKED EXAMPLE ===

#[test]
fn worked_example_matches_the_hand_calculation() {
    // fish has no producer, so its anchor is its base price 1.0. With
    // supply 20 / demand 40 and inventory exactly at its 20-day coverage
    // target, the first day should land at ~1.1385:
    // pressure = tanh(ln 2 * 0.9) ~ 0.554, multiplier ~ 2.385, and one
    // smoothing step covers a tenth of the gap from 1.0.
    let mut engine = build_engine();
    let fish = engine.catalog().id_of("fish").unwrap();

    let inputs = DayInputs::new(0, LivingCosts::default()).with_flows(fish, 20.0, 40.0, 800.0);
    let report = engine.advance_day(&inputs);

    let r = report.resources.iter().find(|r| r.resource == fish).unwrap();
    assert_eq!(r.cost_anchor, 1.0);
    assert!(
        (r.target - 2.385).abs() < 2e-3,
        "target {} != ~2.385",
        r.target
    );
    assert!(
        (r.price - 1.1385).abs() < 1e-3,
        "price {} != ~1.1385",
        r.price
    );
}
