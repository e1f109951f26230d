//! Mock data feed standing in for the sensor hardware.
//!
//! Consumers depend on [`DataSource`] only, so a real gateway client can
//! replace [`MockFeed`] without touching them.

pub mod generate;
pub mod simulator;
pub mod snapshot;

pub use simulator::{FeedSimulator, SimulatorHandle};
pub use snapshot::FeedSnapshot;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

use crate::consts::{DEFAULT_FEED_LATENCY, DEFAULT_VAT_COUNT};
use crate::error::{MonitorError, Result};
use crate::model::{Alert, Batch, Sensor, Valve, Vat, VatHistory};

/// Alerts in a freshly generated mock snapshot.
const DEFAULT_ALERT_COUNT: usize = 8;

/// Something that produces distillery records.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn vats(&self) -> Result<Vec<Vat>>;
    async fn vat(&self, vat_id: &str) -> Result<Vat>;
    async fn vat_history(&self, vat_id: &str, days: u32) -> Result<VatHistory>;
    async fn sensors(&self, vat_id: &str) -> Result<Vec<Sensor>>;
    async fn batch(&self, vat_id: &str) -> Result<Option<Batch>>;
    async fn alerts(&self) -> Result<Vec<Alert>>;
    async fn valves(&self, vat_id: &str) -> Result<Vec<Valve>>;
}

/// Randomized in-memory source with simulated round-trip latency.
pub struct MockFeed {
    snapshot: FeedSnapshot,
    rng: Mutex<StdRng>,
    latency: Duration,
}

impl MockFeed {
    /// Six vats and a handful of alerts, seeded from entropy.
    pub fn new() -> Self {
        Self::seeded(rand::rng().random())
    }

    /// Same seed, same records. History is drawn from the same generator.
    pub fn seeded(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let snapshot = FeedSnapshot::generate(&mut rng, DEFAULT_VAT_COUNT, DEFAULT_ALERT_COUNT, Utc::now());
        Self {
            snapshot,
            rng: Mutex::new(rng),
            latency: DEFAULT_FEED_LATENCY,
        }
    }

    /// Serve a prepared snapshot; `seed` drives history generation.
    pub fn from_snapshot(snapshot: FeedSnapshot, seed: u64) -> Self {
        Self {
            snapshot,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: DEFAULT_FEED_LATENCY,
        }
    }

    /// Override the simulated round-trip delay. `Duration::ZERO` disables it.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Records this feed serves.
    pub fn snapshot(&self) -> &FeedSnapshot {
        &self.snapshot
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn require_vat(&self, vat_id: &str) -> Result<&Vat> {
        self.snapshot
            .vat(vat_id)
            .ok_or_else(|| MonitorError::UnknownVat(vat_id.to_string()))
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for MockFeed {
    async fn vats(&self) -> Result<Vec<Vat>> {
        self.round_trip().await;
        Ok(self.snapshot.vats.clone())
    }

    async fn vat(&self, vat_id: &str) -> Result<Vat> {
        self.round_trip().await;
        self.require_vat(vat_id).cloned()
    }

    async fn vat_history(&self, vat_id: &str, days: u32) -> Result<VatHistory> {
        self.round_trip().await;
        self.require_vat(vat_id)?;
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(generate::generate_history(&mut rng, vat_id, days, Utc::now()))
    }

    async fn sensors(&self, vat_id: &str) -> Result<Vec<Sensor>> {
        self.round_trip().await;
        self.require_vat(vat_id)?;
        Ok(self.snapshot.sensors_for(vat_id).into_iter().cloned().collect())
    }

    async fn batch(&self, vat_id: &str) -> Result<Option<Batch>> {
        self.round_trip().await;
        self.require_vat(vat_id)?;
        Ok(self.snapshot.batch_for(vat_id).cloned())
    }

    async fn alerts(&self) -> Result<Vec<Alert>> {
        self.round_trip().await;
        Ok(self.snapshot.alerts.clone())
    }

    async fn valves(&self, vat_id: &str) -> Result<Vec<Valve>> {
        self.round_trip().await;
        self.require_vat(vat_id)?;
        Ok(self.snapshot.valves_for(vat_id).into_iter().cloned().collect())
    }
}
