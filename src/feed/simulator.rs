//! Pushes randomized vat telemetry through the same event contract a real
//! gateway would use.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::generate::{LIQUID_LEVEL_RANGE, PH_RANGE, TEMPERATURE_RANGE, random_value};
use crate::codec;
use crate::consts::{ALL_VATS_UPDATE_EVENT, vat_update_event};
use crate::error::{MonitorError, Result};
use crate::events::EventBus;
use crate::model::VatPatch;

/// Produces one round of telemetry per tick for a fixed set of vats.
pub struct FeedSimulator {
    bus: Arc<EventBus>,
    vat_ids: Vec<String>,
    rng: StdRng,
}

impl FeedSimulator {
    /// Simulator for `vat_ids`, publishing on `bus`. Same seed, same values.
    pub fn new(bus: Arc<EventBus>, vat_ids: Vec<String>, seed: u64) -> Self {
        Self {
            bus,
            vat_ids,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fresh temperature, pH and level for every vat.
    pub fn next_patches(&mut self) -> Vec<VatPatch> {
        let rng = &mut self.rng;
        self.vat_ids
            .iter()
            .map(|id| VatPatch {
                temperature: Some(random_value(rng, TEMPERATURE_RANGE)),
                ph: Some(random_value(rng, PH_RANGE)),
                liquid_level: Some(random_value(rng, LIQUID_LEVEL_RANGE)),
                ..VatPatch::new(id.clone())
            })
            .collect()
    }

    /// Emit one round: a `vat:all:update` frame followed by one
    /// `vat:<id>:update` frame per vat, each dispatched through the codec.
    pub fn tick(&mut self) -> Result<Vec<VatPatch>> {
        let patches = self.next_patches();

        let all = serde_json::to_value(&patches)?;
        codec::dispatch(&self.bus, &codec::encode(ALL_VATS_UPDATE_EVENT, &all)?);

        for patch in &patches {
            let payload: Value = serde_json::to_value(patch)?;
            codec::dispatch(&self.bus, &codec::encode(&vat_update_event(&patch.id), &payload)?);
        }

        tracing::debug!(vats = patches.len(), "simulated update pushed");
        Ok(patches)
    }

    /// Tick every `interval` in a background task until the handle is
    /// stopped or dropped. The first round goes out immediately. A zero
    /// interval is rejected.
    pub fn spawn(mut self, interval: Duration) -> Result<SimulatorHandle> {
        if interval.is_zero() {
            return Err(MonitorError::Config(
                "simulator interval must be greater than zero".to_string(),
            ));
        }
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.tick() {
                            tracing::warn!("simulator tick failed: {e}");
                        }
                    }
                    _ = cancel_rx.changed() => break,
                }
            }
        });

        Ok(SimulatorHandle {
            handle: Some(handle),
            cancel: cancel_tx,
        })
    }
}

/// Running simulator. Dropping it stops the loop.
pub struct SimulatorHandle {
    handle: Option<JoinHandle<()>>,
    cancel: watch::Sender<bool>,
}

impl SimulatorHandle {
    /// Stop and wait for the loop to exit.
    pub async fn stop(mut self) {
        let _ = self.cancel.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
