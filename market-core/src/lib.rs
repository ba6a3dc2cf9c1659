use wasm_bindgen::prelude::*;

mod catalog;
mod config;
mod error;
mod market;
mod snapshot;
mod tick;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use market::*;
pub use snapshot::*;
pub use tick::*;

// ============================================================================
// WASM API - Market
// ============================================================================

/// JS-facing wrapper around [`MarketEngine`].
///
/// The host game constructs it once from its authored JSON configs, then
/// calls `advance_day` with that day's aggregated flows each simulated day.
#[wasm_bindgen]
pub struct Market {
    engine: MarketEngine,
}

#[wasm_bindgen]
impl Market {
    /// Load the resource catalog and producer configs and build the market.
    /// Configuration errors reject the construction; a broken economy never
    /// starts ticking.
    #[wasm_bindgen(constructor)]
    pub fn new(resources_json: &str, producers_json: &str) -> Result<Market, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let resources: Vec<ResourceDef> = serde_json::from_str(resources_json)?;
        let producers: Vec<ProducerDef> = serde_json::from_str(producers_json)?;
        let engine = MarketEngine::from_defs(resources, producers)?;
        Ok(Market { engine })
    }

    /// Advance the market by one simulated day and return the new snapshot.
    #[wasm_bindgen]
    pub fn advance_day(&mut self, inputs: JsValue) -> Result<MarketSnapshot, JsError> {
        let named: NamedDayInputs = serde_wasm_bindgen::from_value(inputs)?;
        self.engine.advance_day_named(&named);
        Ok(self.engine.snapshot())
    }

    /// Get the current simulated day.
    #[wasm_bindgen]
    pub fn get_day(&self) -> u64 {
        self.engine.day()
    }

    /// Current price by resource name; unknown names answer `1.0`.
    #[wasm_bindgen]
    pub fn get_price(&self, resource: &str) -> f64 {
        self.engine.price_by_name(resource)
    }

    /// Bounded price history by resource name; empty for non-tradables.
    #[wasm_bindgen]
    pub fn get_price_history(&self, resource: &str) -> Vec<f64> {
        self.engine
            .catalog()
            .id_of(resource)
            .and_then(|id| self.engine.market(id))
            .map(|state| state.price_history.to_vec())
            .unwrap_or_default()
    }

    /// Get a snapshot of the current market state for rendering.
    #[wasm_bindgen]
    pub fn get_snapshot(&self) -> MarketSnapshot {
        self.engine.snapshot()
    }

    /// Serialize the market state for the host's save system.
    #[wasm_bindgen]
    pub fn save_state(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.engine.states())?)
    }

    /// Restore previously saved state; ticking resumes after `day`.
    #[wasm_bindgen]
    pub fn load_state(&mut self, state_json: &str, day: u64) -> Result<(), JsError> {
        let table: MarketTable = serde_json::from_str(state_json)?;
        self.engine.restore(table, day);
        Ok(())
    }
}
