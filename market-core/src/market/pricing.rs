//! The pure price transition.
//!
//! Each simulated day, every tradable resource's price moves toward a target
//! derived from three signals:
//!
//! 1. supply/demand pressure: a bounded tanh of the log demand/supply ratio,
//! 2. inventory pressure: how far current stock sits from its coverage
//!    target in days of demand,
//! 3. the cost anchor: the production-cost reference price the target is
//!    expressed as a multiple of.
//!
//! The target is floored (against cost and absolutely) and the published
//! price follows it through a first-order exponential filter, so the series
//! is smooth and can never overshoot. Everything here is a deterministic
//! function of its inputs; persistence happens elsewhere.

/// Absolute lower bound for any published price.
pub const PRICE_FLOOR: f64 = 1e-4;

/// Guard against zero denominators in ratio computations.
pub const EPSILON: f64 = 1e-6;

/// Per-day smoothing factor of the exponential price filter.
pub const PRICE_SMOOTHING: f64 = 0.1;

/// A shortage at full pressure scales price up to 3.5x the anchor.
const MAX_SHORTAGE_MULTIPLIER: f64 = 3.5;
/// A surplus at full pressure scales price down to 0.7x the anchor.
const MIN_SURPLUS_MULTIPLIER: f64 = 0.7;
/// Slope of the tanh pressure curve over the log ratio.
const PRESSURE_SMOOTHNESS: f64 = 0.9;
/// Target never falls below this fraction of the cost anchor.
const COST_FLOOR_RATIO: f64 = 0.6;
/// Inventory pressure never discounts below this multiplier.
const INVENTORY_PRESSURE_FLOOR: f64 = 0.3;

/// Everything the transition needs for one resource on one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceInputs {
    pub previous_price: f64,
    pub cost_anchor: f64,
    pub supply: f64,
    pub demand: f64,
    pub inventory: f64,
    pub supply_demand_weight: f64,
    pub inventory_target_days: f64,
    pub inventory_price_impact: f64,
}

/// Result of one transition, with the intermediate signals kept for
/// diagnostics and telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceOutcome {
    pub price: f64,
    pub target: f64,
    pub pressure: f64,
    pub inventory_pressure: f64,
}

/// Bounded supply/demand pressure in [-1, 1].
///
/// Positive means shortage (demand exceeds supply), negative means surplus.
/// When both flows are zero there is no market signal at all and the
/// pressure is neutral.
pub fn demand_pressure(supply: f64, demand: f64, supply_demand_weight: f64) -> f64 {
    let ratio = if supply <= 0.0 && demand <= 0.0 {
        1.0
    } else {
        demand / supply.max(EPSILON)
    };
    let pressure = (ratio.max(EPSILON).ln() * PRESSURE_SMOOTHNESS).tanh() * supply_demand_weight;
    pressure.clamp(-1.0, 1.0)
}

/// Map pressure to a price multiplier. Shortages scale harder than
/// surpluses discount: sellers raise prices faster than they cut them.
fn pressure_multiplier(pressure: f64) -> f64 {
    if pressure >= 0.0 {
        1.0 + pressure * (MAX_SHORTAGE_MULTIPLIER - 1.0)
    } else {
        1.0 + pressure * (1.0 - MIN_SURPLUS_MULTIPLIER)
    }
}

/// Multiplier from inventory coverage relative to its target in days of
/// demand. Understocked markets charge more, overstocked ones discount,
/// floored so a glut can never push the multiplier toward zero.
pub fn inventory_pressure(
    inventory: f64,
    demand: f64,
    target_days: f64,
    price_impact: f64,
) -> f64 {
    let expected = demand * target_days;
    let ratio = inventory / expected.max(EPSILON);
    (1.0 + (1.0 - ratio) * price_impact).max(INVENTORY_PRESSURE_FLOOR)
}

/// The target price before smoothing: anchor scaled by both pressures, then
/// floored against cost and absolutely.
pub fn target_price(inputs: &PriceInputs) -> f64 {
    compute_price(inputs).target
}

/// Run the full transition for one resource.
///
/// The published price moves a fixed fraction of the way toward the target
/// each day and is held to the same floors as the target, so the floor
/// invariant holds on every tick even while the filter is still catching up
/// to a rising anchor.
pub fn compute_price(inputs: &PriceInputs) -> PriceOutcome {
    let pressure = demand_pressure(inputs.supply, inputs.demand, inputs.supply_demand_weight);
    let inv_pressure = inventory_pressure(
        inputs.inventory,
        inputs.demand,
        inputs.inventory_target_days,
        inputs.inventory_price_impact,
    );

    let raw_target = inputs.cost_anchor * pressure_multiplier(pressure) * inv_pressure;
    let target = raw_target
        .max(inputs.cost_anchor * COST_FLOOR_RATIO)
        .max(PRICE_FLOOR);

    let smoothed = inputs.previous_price + (target - inputs.previous_price) * PRICE_SMOOTHING;
    let price = smoothed
        .max(inputs.cost_anchor * COST_FLOOR_RATIO)
        .max(PRICE_FLOOR);

    PriceOutcome {
        price,
        target,
        pressure,
        inventory_pressure: inv_pressure,
    }
}
