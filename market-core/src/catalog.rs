use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::error::ConfigError;

new_key_type! {
    /// Stable key for a resource in the catalog.
    pub struct ResourceId;
}

// ============================================================================
// Resource definitions (authored config, loaded once at startup)
// ============================================================================

/// How a resource participates in the economy.
///
/// Only tradable resources get a market state and a daily price. Virtual
/// resources (administration capacity, population caps) and the currency
/// itself are priced at their base price forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Tradable,
    Virtual,
    Currency,
}

/// Optional per-resource market tuning. Values set here win over the primary
/// producer's config, which wins over global defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceMarketOverrides {
    pub virtual_demand_per_pop: Option<f64>,
    pub inventory_target_days: Option<f64>,
    pub inventory_price_impact: Option<f64>,
}

/// A resource as authored in the game's JSON config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDef {
    pub name: String,
    #[serde(default = "default_base_price")]
    pub base_price: f64,
    #[serde(default, rename = "type")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub market_config: Option<ResourceMarketOverrides>,
}

fn default_base_price() -> f64 {
    1.0
}

impl ResourceDef {
    pub fn new(name: impl Into<String>, base_price: f64) -> Self {
        Self {
            name: name.into(),
            base_price,
            kind: ResourceKind::Tradable,
            market_config: None,
        }
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_market_config(mut self, market_config: ResourceMarketOverrides) -> Self {
        self.market_config = Some(market_config);
        self
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// A validated resource, keyed by [`ResourceId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub base_price: f64,
    pub kind: ResourceKind,
    pub market_config: Option<ResourceMarketOverrides>,
}

impl Resource {
    pub fn is_tradable(&self) -> bool {
        self.kind == ResourceKind::Tradable
    }
}

/// Static registry of every resource in the economy.
///
/// Built once from authored definitions, immutable for the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCatalog {
    resources: SlotMap<ResourceId, Resource>,
    by_name: HashMap<String, ResourceId>,
}

impl ResourceCatalog {
    pub fn from_defs(defs: Vec<ResourceDef>) -> Result<Self, ConfigError> {
        let mut resources = SlotMap::with_key();
        let mut by_name = HashMap::new();

        for def in defs {
            if !def.base_price.is_finite() || def.base_price <= 0.0 {
                return Err(ConfigError::BadBasePrice {
                    name: def.name,
                    price: def.base_price,
                });
            }
            if let Some(overrides) = &def.market_config {
                validate_overrides(&def.name, overrides)?;
            }
            if by_name.contains_key(&def.name) {
                return Err(ConfigError::DuplicateResource { name: def.name });
            }

            let name = def.name.clone();
            let id = resources.insert(Resource {
                name: def.name,
                base_price: def.base_price,
                kind: def.kind,
                market_config: def.market_config,
            });
            by_name.insert(name, id);
        }

        Ok(Self { resources, by_name })
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn id_of(&self, name: &str) -> Option<ResourceId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources.iter()
    }

    /// Resources that participate in price formation.
    pub fn tradable(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources.iter().filter(|(_, r)| r.is_tradable())
    }

    /// Base price for a resource, `1.0` when the resource is unknown.
    ///
    /// The documented fallback for collaborators querying names that never
    /// made it into the catalog.
    pub fn base_price(&self, id: ResourceId) -> f64 {
        self.resources.get(id).map(|r| r.base_price).unwrap_or(1.0)
    }
}

fn validate_overrides(
    name: &str,
    overrides: &ResourceMarketOverrides,
) -> Result<(), ConfigError> {
    if let Some(v) = overrides.virtual_demand_per_pop {
        ConfigError::check_non_negative(name, "virtualDemandPerPop", v)?;
    }
    if let Some(v) = overrides.inventory_target_days {
        ConfigError::check_positive(name, "inventoryTargetDays", v)?;
    }
    if let Some(v) = overrides.inventory_price_impact {
        ConfigError::check_non_negative(name, "inventoryPriceImpact", v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_catalog_and_indexes_names() {
        let catalog = ResourceCatalog::from_defs(vec![
            ResourceDef::new("food", 1.0),
            ResourceDef::new("wood", 2.0),
            ResourceDef::new("silver", 1.0).with_kind(ResourceKind::Currency),
            ResourceDef::new("admin", 1.0).with_kind(ResourceKind::Virtual),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 4);
        let wood = catalog.id_of("wood").unwrap();
        assert_eq!(catalog.get(wood).unwrap().base_price, 2.0);
        assert_eq!(catalog.tradable().count(), 2);
        assert!(catalog.id_of("gold").is_none());
    }

    #[test]
    fn rejects_bad_base_price() {
        let err = ResourceCatalog::from_defs(vec![ResourceDef::new("food", 0.0)]).unwrap_err();
        assert!(matches!(err, ConfigError::BadBasePrice { .. }));

        let err =
            ResourceCatalog::from_defs(vec![ResourceDef::new("food", f64::NAN)]).unwrap_err();
        assert!(matches!(err, ConfigError::BadBasePrice { .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = ResourceCatalog::from_defs(vec![
            ResourceDef::new("food", 1.0),
            ResourceDef::new("food", 2.0),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateResource { .. }));
    }

    #[test]
    fn rejects_negative_override() {
        let def = ResourceDef::new("food", 1.0).with_market_config(ResourceMarketOverrides {
            virtual_demand_per_pop: Some(-0.1),
            ..Default::default()
        });
        let err = ResourceCatalog::from_defs(vec![def]).unwrap_err();
        assert!(matches!(err, ConfigError::ValueOutOfRange { .. }));
    }

    #[test]
    fn parses_authored_json() {
        let defs: Vec<ResourceDef> = serde_json::from_str(
            r#"[
                {"name": "food", "basePrice": 1},
                {"name": "silver", "basePrice": 1, "type": "currency"},
                {"name": "admin", "type": "virtual"},
                {"name": "tools", "basePrice": 8,
                 "marketConfig": {"inventoryTargetDays": 30}}
            ]"#,
        )
        .unwrap();

        let catalog = ResourceCatalog::from_defs(defs).unwrap();
        let admin = catalog.id_of("admin").unwrap();
        assert_eq!(catalog.get(admin).unwrap().kind, ResourceKind::Virtual);
        // Missing basePrice falls back to 1.0
        assert_eq!(catalog.base_price(admin), 1.0);

        let tools = catalog.id_of("tools").unwrap();
        let overrides = catalog.get(tools).unwrap().market_config.unwrap();
        assert_eq!(overrides.inventory_target_days, Some(30.0));
    }
}
