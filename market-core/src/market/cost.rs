use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::catalog::{ResourceCatalog, ResourceId};
use crate::config::{CostWeights, Producer};
use crate::market::pricing::PRICE_FLOOR;

/// Reference wage when the population collaborator supplies nothing better.
pub const BASE_WAGE_REFERENCE: f64 = 1.0;

const WAGE_FLOOR_BASE_RATIO: f64 = 0.8;
const LIVING_COST_MARKUP: f64 = 1.05;

// ============================================================================
// Living costs
// ============================================================================

/// Daily cost of living as reported by the population collaborator, split
/// into the cost of consumed needs and the taxes levied on top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivingCosts {
    pub needs_cost: f64,
    pub tax_cost: f64,
}

impl LivingCosts {
    pub fn new(needs_cost: f64, tax_cost: f64) -> Self {
        Self {
            needs_cost,
            tax_cost,
        }
    }

    /// Additive blend of the two components under a weight pair.
    pub fn weighted(&self, weights: &CostWeights) -> f64 {
        let blended = self.needs_cost * weights.living_cost_weight
            + self.tax_cost * weights.tax_cost_weight;
        blended.max(0.0)
    }
}

/// The minimum wage a producer pays its labor: a fraction of the reference
/// wage, or the weighted living cost with a small markup, whichever is
/// higher. Keeps wages from collapsing below subsistence when living costs
/// spike.
pub fn wage_floor(base_wage: f64, living: &LivingCosts, weights: &CostWeights) -> f64 {
    (base_wage * WAGE_FLOOR_BASE_RATIO).max(living.weighted(weights) * LIVING_COST_MARKUP)
}

// ============================================================================
// Cost anchor
// ============================================================================

/// The production-cost reference price for one resource, with its
/// components kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostAnchor {
    pub value: f64,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub wage_floor: f64,
    /// Living/tax blend under the producer's price weights; surfaced for
    /// economic indicators, not part of the anchor formula.
    pub price_living_index: f64,
}

impl CostAnchor {
    /// Anchor for a resource with no producer: its base price stands in for
    /// a production cost.
    pub fn from_base_price(base_price: f64) -> Self {
        Self {
            value: base_price,
            material_cost: 0.0,
            labor_cost: 0.0,
            wage_floor: 0.0,
            price_living_index: 0.0,
        }
    }
}

/// Resolve a previous-day price for an input resource: last settled price if
/// usable, else the base price, always at least the price floor.
fn resolve_price(
    resource: ResourceId,
    prices: &SecondaryMap<ResourceId, f64>,
    catalog: &ResourceCatalog,
) -> f64 {
    if let Some(&price) = prices.get(resource) {
        if price.is_finite() && price > 0.0 {
            return price.max(PRICE_FLOOR);
        }
    }
    let base = catalog.base_price(resource);
    if base.is_finite() && base > 0.0 {
        base.max(PRICE_FLOOR)
    } else {
        PRICE_FLOOR
    }
}

/// Compute the cost anchor for `resource` as made by `producer`.
///
/// Inputs are priced at the previous day's settled prices (the caller passes
/// the snapshot taken before any price this day was written), with resource
/// taxes propagating into material cost according to the producer's price
/// tax weight. Labor costs the number of job slots times the wage floor;
/// self-owned producers pay no external wages.
pub fn cost_anchor(
    resource: ResourceId,
    producer: &Producer,
    catalog: &ResourceCatalog,
    prices: &SecondaryMap<ResourceId, f64>,
    tax_rates: &SecondaryMap<ResourceId, f64>,
    living: &LivingCosts,
    base_wage: f64,
) -> CostAnchor {
    let output_quantity = producer.output_of(resource).unwrap_or(1.0);

    let mut material_cost = 0.0;
    for &(input, quantity) in &producer.inputs {
        if quantity <= 0.0 {
            continue;
        }
        let price = resolve_price(input, prices, catalog);
        let tax_rate = tax_rates.get(input).copied().unwrap_or(0.0).max(0.0);
        material_cost +=
            quantity * price * (1.0 + tax_rate * producer.economics.price.tax_cost_weight);
    }

    let floor = wage_floor(base_wage, living, &producer.economics.wage);
    let labor_cost = if producer.self_owned {
        0.0
    } else {
        producer.job_slots * floor
    };

    // Not .max(0.0): f64::max turns a NaN into 0.0, and the day driver's
    // numeric guard must see it.
    let raw = (material_cost + labor_cost) / output_quantity;
    let value = if raw < 0.0 { 0.0 } else { raw };

    CostAnchor {
        value,
        material_cost,
        labor_cost,
        wage_floor: floor,
        price_living_index: living.weighted(&producer.economics.price),
    }
}
