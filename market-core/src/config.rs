use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::catalog::{ResourceCatalog, ResourceId};
use crate::error::ConfigError;

new_key_type! {
    /// Stable key for a producer (building type).
    pub struct ProducerId;
}

// ============================================================================
// Economic weights
// ============================================================================

/// How strongly living costs and tax pressure propagate into a derived value
/// (an output price or a wage floor). Both weights live in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostWeights {
    pub living_cost_weight: f64,
    pub tax_cost_weight: f64,
}

impl CostWeights {
    pub fn new(living_cost_weight: f64, tax_cost_weight: f64) -> Self {
        Self {
            living_cost_weight,
            tax_cost_weight,
        }
    }
}

/// Per-producer market behavior: cost propagation weights plus the knobs of
/// the pricing transition (elasticity, inventory coverage target and impact).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProducerConfig {
    pub price: CostWeights,
    pub wage: CostWeights,
    pub supply_demand_weight: f64,
    pub inventory_target_days: f64,
    pub inventory_price_impact: f64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            price: CostWeights::default(),
            wage: CostWeights::default(),
            supply_demand_weight: 1.0,
            inventory_target_days: 20.0,
            inventory_price_impact: 0.25,
        }
    }
}

impl ProducerConfig {
    fn validate(&self, owner: &str) -> Result<(), ConfigError> {
        ConfigError::check_range(owner, "price.livingCostWeight", self.price.living_cost_weight, 0.0, 1.0)?;
        ConfigError::check_range(owner, "price.taxCostWeight", self.price.tax_cost_weight, 0.0, 1.0)?;
        ConfigError::check_range(owner, "wage.livingCostWeight", self.wage.living_cost_weight, 0.0, 1.0)?;
        ConfigError::check_range(owner, "wage.taxCostWeight", self.wage.tax_cost_weight, 0.0, 1.0)?;
        ConfigError::check_positive(owner, "supplyDemandWeight", self.supply_demand_weight)?;
        ConfigError::check_positive(owner, "inventoryTargetDays", self.inventory_target_days)?;
        ConfigError::check_non_negative(owner, "inventoryPriceImpact", self.inventory_price_impact)?;
        Ok(())
    }
}

// ============================================================================
// Producer definitions (authored config)
// ============================================================================

/// A producing building type as authored in the game's JSON config.
///
/// `input`/`output` quantities are per production cycle; `jobs` maps labor
/// roles to slot counts. A producer whose `owner` role appears in its own
/// `jobs` is worked by its owner and pays no external wages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProducerDef {
    pub name: String,
    pub input: HashMap<String, f64>,
    pub output: HashMap<String, f64>,
    pub jobs: HashMap<String, f64>,
    pub owner: Option<String>,
    pub market_config: ProducerConfig,
}

impl ProducerDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_input(mut self, resource: impl Into<String>, quantity: f64) -> Self {
        self.input.insert(resource.into(), quantity);
        self
    }

    pub fn with_output(mut self, resource: impl Into<String>, quantity: f64) -> Self {
        self.output.insert(resource.into(), quantity);
        self
    }

    pub fn with_job(mut self, role: impl Into<String>, slots: f64) -> Self {
        self.jobs.insert(role.into(), slots);
        self
    }

    pub fn with_owner(mut self, role: impl Into<String>) -> Self {
        self.owner = Some(role.into());
        self
    }

    pub fn with_market_config(mut self, market_config: ProducerConfig) -> Self {
        self.market_config = market_config;
        self
    }
}

// ============================================================================
// Resolved production config
// ============================================================================

/// A validated producer with resource references resolved to catalog ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub inputs: Vec<(ResourceId, f64)>,
    pub outputs: Vec<(ResourceId, f64)>,
    pub job_slots: f64,
    pub self_owned: bool,
    pub economics: ProducerConfig,
}

impl Producer {
    /// Per-cycle output quantity of a resource, if this producer makes it.
    pub fn output_of(&self, resource: ResourceId) -> Option<f64> {
        self.outputs
            .iter()
            .find(|(r, _)| *r == resource)
            .map(|(_, q)| *q)
    }
}

/// Effective pricing parameters for one resource after the full resolution
/// chain: global defaults, then the primary producer's config, then the
/// resource's own overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketParams {
    pub supply_demand_weight: f64,
    pub inventory_target_days: f64,
    pub inventory_price_impact: f64,
    pub virtual_demand_per_pop: f64,
}

impl Default for MarketParams {
    fn default() -> Self {
        let cfg = ProducerConfig::default();
        Self {
            supply_demand_weight: cfg.supply_demand_weight,
            inventory_target_days: cfg.inventory_target_days,
            inventory_price_impact: cfg.inventory_price_impact,
            virtual_demand_per_pop: 0.0,
        }
    }
}

/// All producers plus the primary-producer index used for pricing.
///
/// A resource may be output by several building types; for pricing it has at
/// most one canonical producer, the one with the largest per-cycle output
/// (first listed wins ties).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    producers: SlotMap<ProducerId, Producer>,
    primary: SecondaryMap<ResourceId, ProducerId>,
}

impl ProductionConfig {
    pub fn from_defs(
        defs: Vec<ProducerDef>,
        catalog: &ResourceCatalog,
    ) -> Result<Self, ConfigError> {
        let mut producers: SlotMap<ProducerId, Producer> = SlotMap::with_key();
        let mut primary: SecondaryMap<ResourceId, ProducerId> = SecondaryMap::new();
        let mut best_output: SecondaryMap<ResourceId, f64> = SecondaryMap::new();
        let mut seen = HashMap::new();

        for def in defs {
            if seen.contains_key(&def.name) {
                return Err(ConfigError::DuplicateProducer { name: def.name });
            }
            def.market_config.validate(&def.name)?;

            let resolve = |name: &str| -> Result<ResourceId, ConfigError> {
                catalog.id_of(name).ok_or_else(|| ConfigError::UnknownResource {
                    context: format!("producer `{}`", def.name),
                    name: name.to_string(),
                })
            };

            let mut inputs = Vec::with_capacity(def.input.len());
            for (name, qty) in &def.input {
                ConfigError::check_non_negative(&def.name, "input", *qty)?;
                inputs.push((resolve(name)?, *qty));
            }

            let mut outputs = Vec::with_capacity(def.output.len());
            for (name, qty) in &def.output {
                ConfigError::check_finite(&def.name, "output", *qty)?;
                if *qty <= 0.0 {
                    return Err(ConfigError::ZeroOutput {
                        producer: def.name.clone(),
                        resource: name.clone(),
                    });
                }
                outputs.push((resolve(name)?, *qty));
            }

            let mut job_slots = 0.0;
            for slots in def.jobs.values() {
                ConfigError::check_non_negative(&def.name, "jobs", *slots)?;
                job_slots += slots;
            }
            let self_owned = def
                .owner
                .as_ref()
                .is_some_and(|owner| def.jobs.contains_key(owner));

            let id = producers.insert(Producer {
                name: def.name.clone(),
                inputs,
                outputs,
                job_slots,
                self_owned,
                economics: def.market_config,
            });
            seen.insert(def.name, id);

            // Maintain the primary-producer index as we go
            for (resource, qty) in &producers[id].outputs {
                let best = best_output.get(*resource).copied().unwrap_or(0.0);
                if *qty > best {
                    best_output.insert(*resource, *qty);
                    primary.insert(*resource, id);
                }
            }
        }

        Ok(Self { producers, primary })
    }

    pub fn get(&self, id: ProducerId) -> Option<&Producer> {
        self.producers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProducerId, &Producer)> {
        self.producers.iter()
    }

    /// The canonical producer whose economics price this resource.
    pub fn primary_producer(&self, resource: ResourceId) -> Option<&Producer> {
        self.primary.get(resource).and_then(|id| self.producers.get(*id))
    }

    /// Resolve the effective pricing parameters for a resource.
    pub fn market_params(&self, resource: ResourceId, catalog: &ResourceCatalog) -> MarketParams {
        let mut params = MarketParams::default();

        if let Some(producer) = self.primary_producer(resource) {
            params.supply_demand_weight = producer.economics.supply_demand_weight;
            params.inventory_target_days = producer.economics.inventory_target_days;
            params.inventory_price_impact = producer.economics.inventory_price_impact;
        }

        if let Some(overrides) = catalog.get(resource).and_then(|r| r.market_config.as_ref()) {
            if let Some(v) = overrides.virtual_demand_per_pop {
                params.virtual_demand_per_pop = v;
            }
            if let Some(v) = overrides.inventory_target_days {
                params.inventory_target_days = v;
            }
            if let Some(v) = overrides.inventory_price_impact {
                params.inventory_price_impact = v;
            }
        }

        params
    }
}
