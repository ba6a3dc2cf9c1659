//! Market telemetry capture for tests and diagnostics.
//!
//! `market-core` emits one `tracing` event per resource per day under the
//! `market_price` target, and a `market_guard` warning whenever a numeric
//! guard contains an anomaly. This crate provides a subscriber that collects
//! those events into typed rows, plus a polars conversion for price-series
//! analysis in integration tests.
//!
//! # Usage
//!
//! ```ignore
//! // In a test:
//! instrument::install_subscriber();
//! // ... advance the market a few hundred days ...
//! let log = instrument::drain();
//! let prices = log.series_for("food");
//! let frame = log.price_frame()?;
//! ```

use std::cell::RefCell;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// Event target `market-core` uses for per-resource price telemetry.
pub const PRICE_TARGET: &str = "market_price";
/// Event target for contained numeric anomalies.
pub const GUARD_TARGET: &str = "market_guard";

// === ROWS ===

/// One priced resource-day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSample {
    pub day: u64,
    pub resource: String,
    pub price: f64,
    pub supply: f64,
    pub demand: f64,
    pub inventory: f64,
    pub cost_anchor: f64,
    pub target_price: f64,
}

/// One contained numeric anomaly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardSample {
    pub day: u64,
    pub resource: String,
    pub stage: String,
}

/// Everything recorded on this thread since the last drain.
#[derive(Debug, Clone, Default)]
pub struct MarketLog {
    pub prices: Vec<PriceSample>,
    pub guards: Vec<GuardSample>,
}

thread_local! {
    static LOG: RefCell<MarketLog> = RefCell::default();
}

// === VISITORS ===

struct PriceVisitor<'a> {
    sample: &'a mut PriceSample,
}

impl Visit for PriceVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "day" {
            self.sample.day = value;
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match field.name() {
            "price" => self.sample.price = value,
            "supply" => self.sample.supply = value,
            "demand" => self.sample.demand = value,
            "inventory" => self.sample.inventory = value,
            "cost_anchor" => self.sample.cost_anchor = value,
            "target_price" => self.sample.target_price = value,
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "resource" {
            self.sample.resource = value.to_string();
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

struct GuardVisitor<'a> {
    sample: &'a mut GuardSample,
}

impl Visit for GuardVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "day" {
            self.sample.day = value;
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "resource" => self.sample.resource = value.to_string(),
            "stage" => self.sample.stage = value.to_string(),
            _ => {}
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

// === SUBSCRIBER ===

/// Tracing subscriber that collects market telemetry into the thread-local
/// [`MarketLog`]. Events with other targets are ignored.
pub struct MarketSubscriber;

impl Subscriber for MarketSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event()
            && (metadata.target() == PRICE_TARGET || metadata.target() == GUARD_TARGET)
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        // Spans are not tracked, return a dummy ID
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        LOG.with(|log| {
            let mut log = log.borrow_mut();
            match event.metadata().target() {
                PRICE_TARGET => {
                    let mut sample = PriceSample::default();
                    event.record(&mut PriceVisitor {
                        sample: &mut sample,
                    });
                    log.prices.push(sample);
                }
                GUARD_TARGET => {
                    let mut sample = GuardSample::default();
                    event.record(&mut GuardVisitor {
                        sample: &mut sample,
                    });
                    log.guards.push(sample);
                }
                _ => {}
            }
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install [`MarketSubscriber`] as the global default.
/// Call this once at the start of a test; later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(MarketSubscriber);
}

/// Drain all telemetry recorded on this thread.
pub fn drain() -> MarketLog {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

/// Clear recorded telemetry without returning it.
pub fn clear() {
    LOG.with(|log| *log.borrow_mut() = MarketLog::default());
}

// === Polars Integration ===

use polars::prelude::*;

impl MarketLog {
    /// Price telemetry as a polars DataFrame, one row per resource-day.
    pub fn price_frame(&self) -> PolarsResult<DataFrame> {
        let day: Vec<u64> = self.prices.iter().map(|s| s.day).collect();
        let resource: Vec<String> = self.prices.iter().map(|s| s.resource.clone()).collect();
        let price: Vec<f64> = self.prices.iter().map(|s| s.price).collect();
        let supply: Vec<f64> = self.prices.iter().map(|s| s.supply).collect();
        let demand: Vec<f64> = self.prices.iter().map(|s| s.demand).collect();
        let inventory: Vec<f64> = self.prices.iter().map(|s| s.inventory).collect();
        let cost_anchor: Vec<f64> = self.prices.iter().map(|s| s.cost_anchor).collect();
        let target_price: Vec<f64> = self.prices.iter().map(|s| s.target_price).collect();

        DataFrame::new(vec![
            Column::new("day".into(), day),
            Column::new("resource".into(), resource),
            Column::new("price".into(), price),
            Column::new("supply".into(), supply),
            Column::new("demand".into(), demand),
            Column::new("inventory".into(), inventory),
            Column::new("cost_anchor".into(), cost_anchor),
            Column::new("target_price".into(), target_price),
        ])
    }

    /// Price series of one resource, in recorded (chronological) order.
    pub fn series_for(&self, resource: &str) -> Vec<f64> {
        self.prices
            .iter()
            .filter(|s| s.resource == resource)
            .map(|s| s.price)
            .collect()
    }
}
