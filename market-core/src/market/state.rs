use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::catalog::{ResourceCatalog, ResourceId};

/// Retained price samples, matching the UI's chart window.
pub const PRICE_HISTORY_LEN: usize = 300;
/// Retained supply/demand samples.
pub const FLOW_HISTORY_LEN: usize = 600;

// ============================================================================
// History
// ============================================================================

/// Bounded append-only series; the oldest entry is evicted once full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    capacity: usize,
    values: VecDeque<f64>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

// ============================================================================
// MarketState
// ============================================================================

/// Durable per-resource market state.
///
/// Created once per tradable resource at initialization, mutated in place by
/// the day driver for the rest of the run. `inventory` mirrors stock owned
/// by the production collaborator; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub price: f64,
    pub supply: f64,
    pub demand: f64,
    pub inventory: f64,
    pub price_history: History,
    pub supply_history: History,
    pub demand_history: History,
}

impl MarketState {
    /// Fresh state seeded at the resource's base price.
    pub fn seeded(base_price: f64) -> Self {
        Self {
            price: base_price,
            supply: 0.0,
            demand: 0.0,
            inventory: 0.0,
            price_history: History::new(PRICE_HISTORY_LEN),
            supply_history: History::new(FLOW_HISTORY_LEN),
            demand_history: History::new(FLOW_HISTORY_LEN),
        }
    }
}

/// One [`MarketState`] per tradable resource.
///
/// Serializable as a whole so the host's save system can persist and restore
/// the market verbatim between sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketTable {
    states: SecondaryMap<ResourceId, MarketState>,
}

impl MarketTable {
    /// Seed a state for every tradable resource; virtual and currency
    /// resources never get one.
    pub fn seeded(catalog: &ResourceCatalog) -> Self {
        let mut states = SecondaryMap::new();
        for (id, resource) in catalog.tradable() {
            states.insert(id, MarketState::seeded(resource.base_price));
        }
        Self { states }
    }

    pub fn get(&self, id: ResourceId) -> Option<&MarketState> {
        self.states.get(id)
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut MarketState> {
        self.states.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &MarketState)> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Snapshot of every current price, the consistent read set for cost
    /// anchors while this day's prices are being computed.
    pub fn price_snapshot(&self) -> SecondaryMap<ResourceId, f64> {
        self.states.iter().map(|(id, s)| (id, s.price)).collect()
    }
}
