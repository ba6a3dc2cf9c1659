//! Supply/demand aggregation for one resource on one day.
//!
//! The production/consumption collaborator reports raw flows; this module
//! sanitizes them and adds the population-proportional virtual baseline
//! demand that represents latent market need without an explicit consumer.

/// Aggregated flows for one resource, ready for the pricing transition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayFlows {
    pub supply: f64,
    pub demand: f64,
    pub inventory: f64,
}

/// Non-finite collaborator values are treated as absent, negatives as zero.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Aggregate one resource's flows.
///
/// `raw_demand` already sums every explicit consumer (population needs,
/// producer inputs, export orders); the virtual baseline is added on top.
pub fn aggregate_flows(
    raw_supply: f64,
    raw_demand: f64,
    raw_inventory: f64,
    population: u64,
    virtual_demand_per_pop: f64,
) -> DayFlows {
    let virtual_demand = sanitize(virtual_demand_per_pop) * population as f64;
    DayFlows {
        supply: sanitize(raw_supply),
        demand: sanitize(raw_demand) + virtual_demand,
        inventory: sanitize(raw_inventory),
    }
}
