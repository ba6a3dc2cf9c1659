use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::catalog::{ResourceCatalog, ResourceDef, ResourceId};
use crate::config::{ProducerDef, ProductionConfig};
use crate::error::ConfigError;
use crate::market::{
    BASE_WAGE_REFERENCE, CostAnchor, DayFlows, LivingCosts, MarketState, MarketTable, PriceInputs,
    aggregate_flows, compute_price, cost_anchor,
};

// ============================================================================
// Day inputs
// ============================================================================

/// Everything external collaborators feed the engine for one simulated day.
///
/// Flow maps are keyed by resource; anything missing counts as zero. The
/// engine never mutates collaborator-owned data, it only reads it here.
#[derive(Debug, Clone, Default)]
pub struct DayInputs {
    pub population: u64,
    pub living: LivingCosts,
    /// Current weighted average wage from the population collaborator;
    /// falls back to the reference wage when absent.
    pub base_wage: Option<f64>,
    pub supply: SecondaryMap<ResourceId, f64>,
    pub demand: SecondaryMap<ResourceId, f64>,
    pub inventory: SecondaryMap<ResourceId, f64>,
    pub tax_rates: SecondaryMap<ResourceId, f64>,
}

impl DayInputs {
    pub fn new(population: u64, living: LivingCosts) -> Self {
        Self {
            population,
            living,
            ..Default::default()
        }
    }

    pub fn with_flows(
        mut self,
        resource: ResourceId,
        supply: f64,
        demand: f64,
        inventory: f64,
    ) -> Self {
        self.supply.insert(resource, supply);
        self.demand.insert(resource, demand);
        self.inventory.insert(resource, inventory);
        self
    }

    pub fn with_tax_rate(mut self, resource: ResourceId, rate: f64) -> Self {
        self.tax_rates.insert(resource, rate);
        self
    }

    pub fn with_base_wage(mut self, wage: f64) -> Self {
        self.base_wage = Some(wage);
        self
    }

    /// Resolve name-keyed inputs (the JS boundary shape) against the
    /// catalog. Names the catalog does not know are dropped.
    pub fn from_named(named: &NamedDayInputs, catalog: &ResourceCatalog) -> Self {
        let resolve = |map: &HashMap<String, f64>| -> SecondaryMap<ResourceId, f64> {
            map.iter()
                .filter_map(|(name, value)| catalog.id_of(name).map(|id| (id, *value)))
                .collect()
        };
        Self {
            population: named.population,
            living: named.living_costs,
            base_wage: named.base_wage,
            supply: resolve(&named.supply),
            demand: resolve(&named.demand),
            inventory: resolve(&named.inventory),
            tax_rates: resolve(&named.tax_rates),
        }
    }
}

/// Name-keyed day inputs as they arrive over the wasm boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamedDayInputs {
    pub population: u64,
    pub living_costs: LivingCosts,
    pub base_wage: Option<f64>,
    pub supply: HashMap<String, f64>,
    pub demand: HashMap<String, f64>,
    pub inventory: HashMap<String, f64>,
    pub tax_rates: HashMap<String, f64>,
}

// ============================================================================
// Day report
// ============================================================================

/// Per-resource outcome of one day, with the signals that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDayReport {
    pub resource: ResourceId,
    pub previous_price: f64,
    pub price: f64,
    pub target: f64,
    pub cost_anchor: f64,
    pub supply: f64,
    pub demand: f64,
    pub inventory: f64,
    pub wage_floor: f64,
    pub price_living_index: f64,
}

/// A NaN or infinity surfaced mid-calculation and was contained: the
/// resource kept its previous price for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericAnomaly {
    pub resource: ResourceId,
    /// Which computed quantity went non-finite.
    pub stage: &'static str,
}

/// Everything that happened during one `advance_day` call.
#[derive(Debug, Clone, Default)]
pub struct DayReport {
    pub day: u64,
    pub resources: Vec<ResourceDayReport>,
    pub anomalies: Vec<NumericAnomaly>,
}

// ============================================================================
// Engine
// ============================================================================

/// The market price formation engine.
///
/// Owns the catalog, the producer economics, and the durable per-resource
/// market state. One `advance_day` call prices every tradable resource for
/// one simulated day; external readers only ever observe fully published
/// days.
#[derive(Debug, Clone)]
pub struct MarketEngine {
    catalog: ResourceCatalog,
    production: ProductionConfig,
    table: MarketTable,
    day: u64,
}

impl MarketEngine {
    pub fn new(catalog: ResourceCatalog, production: ProductionConfig) -> Self {
        let table = MarketTable::seeded(&catalog);
        Self {
            catalog,
            production,
            table,
            day: 0,
        }
    }

    /// Validate and load authored definitions, then construct the engine.
    /// Any [`ConfigError`] here is fatal; the simulation must not start.
    pub fn from_defs(
        resources: Vec<ResourceDef>,
        producers: Vec<ProducerDef>,
    ) -> Result<Self, ConfigError> {
        let catalog = ResourceCatalog::from_defs(resources)?;
        let production = ProductionConfig::from_defs(producers, &catalog)?;
        Ok(Self::new(catalog, production))
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn production(&self) -> &ProductionConfig {
        &self.production
    }

    pub fn day(&self) -> u64 {
        self.day
    }

    /// Current published price. Virtual and currency resources answer with
    /// their base price; an invalid id answers `1.0`.
    pub fn current_price(&self, resource: ResourceId) -> f64 {
        match self.table.get(resource) {
            Some(state) => state.price,
            None => self.catalog.base_price(resource),
        }
    }

    /// Name-based price lookup for loosely-coupled collaborators. Unknown
    /// names answer the documented `1.0` fallback instead of failing the
    /// caller's tick.
    pub fn price_by_name(&self, name: &str) -> f64 {
        match self.catalog.id_of(name) {
            Some(id) => self.current_price(id),
            None => 1.0,
        }
    }

    /// Read-only market state for a tradable resource.
    pub fn market(&self, resource: ResourceId) -> Option<&MarketState> {
        self.table.get(resource)
    }

    /// The whole market table, for external persistence.
    pub fn states(&self) -> &MarketTable {
        &self.table
    }

    /// Restore previously persisted state; the next `advance_day` continues
    /// from `day + 1`.
    pub fn restore(&mut self, table: MarketTable, day: u64) {
        self.table = table;
        self.day = day;
    }

    /// Convenience for the wasm boundary: resolve names, then advance.
    pub fn advance_day_named(&mut self, named: &NamedDayInputs) -> DayReport {
        let inputs = DayInputs::from_named(named, &self.catalog);
        self.advance_day(&inputs)
    }

    /// Price every tradable resource for one simulated day.
    pub fn advance_day(&mut self, inputs: &DayInputs) -> DayReport {
        self.day += 1;
        let base_wage = inputs.base_wage.unwrap_or(BASE_WAGE_REFERENCE);

        // 1. SNAPSHOT: cost anchors read last day's settled prices only,
        // never a price computed earlier in this same pass.
        let prices = self.table.price_snapshot();

        let mut report = DayReport {
            day: self.day,
            ..Default::default()
        };
        let mut staged: Vec<(ResourceId, DayFlows, f64)> = Vec::new();

        // 2. AGGREGATE -> ANCHOR -> PRICE per resource
        for (resource, def) in self.catalog.tradable() {
            let params = self.production.market_params(resource, &self.catalog);

            let flows = aggregate_flows(
                inputs.supply.get(resource).copied().unwrap_or(0.0),
                inputs.demand.get(resource).copied().unwrap_or(0.0),
                inputs.inventory.get(resource).copied().unwrap_or(0.0),
                inputs.population,
                params.virtual_demand_per_pop,
            );

            let anchor = match self.production.primary_producer(resource) {
                Some(producer) => cost_anchor(
                    resource,
                    producer,
                    &self.catalog,
                    &prices,
                    &inputs.tax_rates,
                    &inputs.living,
                    base_wage,
                ),
                None => CostAnchor::from_base_price(def.base_price),
            };

            let previous_price = prices.get(resource).copied().unwrap_or(def.base_price);

            let (price, target) = if !anchor.value.is_finite() {
                report.anomalies.push(NumericAnomaly {
                    resource,
                    stage: "cost_anchor",
                });
                #[cfg(feature = "instrument")]
                tracing::warn!(
                    target: "market_guard",
                    day = self.day,
                    resource = def.name.as_str(),
                    stage = "cost_anchor",
                );
                (previous_price, previous_price)
            } else {
                let outcome = compute_price(&PriceInputs {
                    previous_price,
                    cost_anchor: anchor.value,
                    supply: flows.supply,
                    demand: flows.demand,
                    inventory: flows.inventory,
                    supply_demand_weight: params.supply_demand_weight,
                    inventory_target_days: params.inventory_target_days,
                    inventory_price_impact: params.inventory_price_impact,
                });
                if outcome.price.is_finite() {
                    (outcome.price, outcome.target)
                } else {
                    report.anomalies.push(NumericAnomaly {
                        resource,
                        stage: "price",
                    });
                    #[cfg(feature = "instrument")]
                    tracing::warn!(
                        target: "market_guard",
                        day = self.day,
                        resource = def.name.as_str(),
                        stage = "price",
                    );
                    (previous_price, previous_price)
                }
            };

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "market_price",
                day = self.day,
                resource = def.name.as_str(),
                price = price,
                supply = flows.supply,
                demand = flows.demand,
                inventory = flows.inventory,
                cost_anchor = anchor.value,
                target_price = target,
            );

            report.resources.push(ResourceDayReport {
                resource,
                previous_price,
                price,
                target,
                cost_anchor: anchor.value,
                supply: flows.supply,
                demand: flows.demand,
                inventory: flows.inventory,
                wage_floor: anchor.wage_floor,
                price_living_index: anchor.price_living_index,
            });
            staged.push((resource, flows, price));
        }

        // 3. PUBLISH: every price flips at once; no external reader can see
        // a half-updated day.
        for (resource, flows, price) in staged {
            if let Some(state) = self.table.get_mut(resource) {
                state.price = price;
                state.supply = flows.supply;
                state.demand = flows.demand;
                state.inventory = flows.inventory;
                state.price_history.push(price);
                state.supply_history.push(flows.supply);
                state.demand_history.push(flows.demand);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceKind;
    use crate::config::ProducerDef;

    fn engine() -> MarketEngine {
        MarketEngine::from_defs(
            vec![
                ResourceDef::new("wood", 2.0),
                ResourceDef::new("plank", 4.0),
                ResourceDef::new("silver", 1.0).with_kind(ResourceKind::Currency),
            ],
            vec![
                ProducerDef::new("sawmill")
                    .with_input("wood", 1.5)
                    .with_output("plank", 1.0)
                    .with_job("worker", 2.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn advance_day_publishes_and_appends_history() {
        let mut engine = engine();
        let wood = engine.catalog().id_of("wood").unwrap();

        let inputs =
            DayInputs::new(0, LivingCosts::default()).with_flows(wood, 20.0, 40.0, 800.0);
        let report = engine.advance_day(&inputs);

        assert_eq!(report.day, 1);
        assert_eq!(engine.day(), 1);
        assert!(report.anomalies.is_empty());

        let state = engine.market(wood).unwrap();
        assert_eq!(state.price_history.len(), 1);
        assert_eq!(state.price_history.latest(), Some(state.price));
        assert_eq!(state.supply, 20.0);
        assert_eq!(state.demand, 40.0);
        assert_eq!(state.inventory, 800.0);
        // Shortage: price moved up from the 2.0 seed
        assert!(state.price > 2.0, "price {} should rise", state.price);
    }

    #[test]
    fn anchors_read_last_days_prices() {
        let mut engine = engine();
        let wood = engine.catalog().id_of("wood").unwrap();
        let plank = engine.catalog().id_of("plank").unwrap();

        // Big wood shortage moves wood's price this day; plank's anchor must
        // still be costed at wood's previous 2.0.
        let inputs = DayInputs::new(0, LivingCosts::default())
            .with_flows(wood, 1.0, 100.0, 0.0)
            .with_flows(plank, 10.0, 10.0, 0.0);
        let report = engine.advance_day(&inputs);

        let wood_report = report.resources.iter().find(|r| r.resource == wood).unwrap();
        assert!(wood_report.price > 2.0);

        let plank_report = report.resources.iter().find(|r| r.resource == plank).unwrap();
        // materials 1.5 * 2.0 plus labor 2 slots * 0.8 base floor, 1 unit out
        assert!(
            (plank_report.cost_anchor - (1.5 * 2.0 + 2.0 * 0.8)).abs() < 1e-12,
            "anchor {} used a same-day price",
            plank_report.cost_anchor
        );
    }

    #[test]
    fn currency_is_never_priced() {
        let mut engine = engine();
        let silver = engine.catalog().id_of("silver").unwrap();

        let report = engine.advance_day(&DayInputs::default());
        assert!(report.resources.iter().all(|r| r.resource != silver));
        assert!(engine.market(silver).is_none());
        assert_eq!(engine.current_price(silver), 1.0);
    }

    #[test]
    fn unknown_name_falls_back_to_one() {
        let engine = engine();
        assert_eq!(engine.price_by_name("unobtainium"), 1.0);
        assert_eq!(engine.price_by_name("wood"), 2.0);
    }

    #[test]
    fn numeric_guard_keeps_previous_price() {
        let mut engine = engine();
        let plank = engine.catalog().id_of("plank").unwrap();

        // An infinite wage blows up the sawmill's labor cost; plank must
        // keep its previous price and the anomaly must be reported.
        let inputs = DayInputs::new(0, LivingCosts::default())
            .with_flows(plank, 10.0, 10.0, 0.0)
            .with_base_wage(f64::INFINITY);
        let report = engine.advance_day(&inputs);

        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].resource, plank);
        assert_eq!(report.anomalies[0].stage, "cost_anchor");

        let state = engine.market(plank).unwrap();
        assert_eq!(state.price, 4.0, "previous (seed) price retained");
        assert_eq!(state.price_history.latest(), Some(4.0));
    }

    #[test]
    fn named_inputs_drop_unknown_resources() {
        let engine = engine();
        let named = NamedDayInputs {
            population: 100,
            supply: [("wood".to_string(), 5.0), ("mithril".to_string(), 9.0)]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let inputs = DayInputs::from_named(&named, engine.catalog());
        assert_eq!(inputs.supply.len(), 1);
        assert_eq!(inputs.population, 100);
    }

    #[test]
    fn identical_days_yield_identical_prices() {
        let mut a = engine();
        let mut b = engine();
        let wood = a.catalog().id_of("wood").unwrap();

        for _ in 0..10 {
            let inputs =
                DayInputs::new(250, LivingCosts::new(0.4, 0.1)).with_flows(wood, 12.0, 17.0, 90.0);
            let ra = a.advance_day(&inputs);
            let rb = b.advance_day(&inputs);
            assert_eq!(ra.resources, rb.resources);
        }
        assert_eq!(a.current_price(wood), b.current_price(wood));
    }

    #[test]
    fn restore_resumes_from_persisted_state() {
        let mut engine = engine();
        let wood = engine.catalog().id_of("wood").unwrap();

        for _ in 0..5 {
            let inputs =
                DayInputs::new(0, LivingCosts::default()).with_flows(wood, 10.0, 30.0, 100.0);
            engine.advance_day(&inputs);
        }

        let saved = serde_json::to_string(engine.states()).unwrap();
        let saved_day = engine.day();
        let saved_price = engine.current_price(wood);

        let mut resumed = self::engine();
        resumed.restore(serde_json::from_str(&saved).unwrap(), saved_day);
        assert_eq!(resumed.day(), 5);
        assert_eq!(resumed.current_price(wood), saved_price);
        assert_eq!(resumed.market(wood).unwrap().price_history.len(), 5);
    }
}
