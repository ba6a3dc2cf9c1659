use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::tick::MarketEngine;

// ============================================================================
// Serializable market snapshot for JS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketSnapshot {
    pub day: u64,
    pub resources: Vec<ResourceMarketSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ResourceMarketSnapshot {
    pub name: String,
    pub price: f64,
    pub base_price: f64,
    pub supply: f64,
    pub demand: f64,
    pub inventory: f64,
    pub price_history: Vec<f64>,
    pub supply_history: Vec<f64>,
    pub demand_history: Vec<f64>,
}

impl MarketEngine {
    /// Chart-ready snapshot of every tradable resource's market.
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            day: self.day(),
            resources: self
                .catalog()
                .tradable()
                .filter_map(|(id, def)| {
                    self.market(id).map(|state| ResourceMarketSnapshot {
                        name: def.name.clone(),
                        price: state.price,
                        base_price: def.base_price,
                        supply: state.supply,
                        demand: state.demand,
                        inventory: state.inventory,
                        price_history: state.price_history.to_vec(),
                        supply_history: state.supply_history.to_vec(),
                        demand_history: state.demand_history.to_vec(),
                    })
                })
                .collect(),
        }
    }
}
