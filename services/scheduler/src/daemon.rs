//! services/scheduler/src/daemon.rs
//!
//! The long-running worker that periodically materialises intake records.
//!
//! One catch-up pass runs at startup, then one pass per tick. Passes never
//! overlap: a tick that arrives while a pass is still running is skipped.

use std::sync::Arc;
use std::time::Duration;

use intake_scheduler_core::services::{GenerationReport, GenerationService, ServiceResult};
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct GenerationDaemon {
    generation: Arc<GenerationService>,
    interval: Duration,
    batch_size: usize,
    creation_shift: chrono::Duration,
    // Held for the duration of a pass.
    in_flight: Mutex<()>,
}

impl GenerationDaemon {
    pub fn new(
        generation: Arc<GenerationService>,
        interval: Duration,
        batch_size: usize,
        creation_shift: chrono::Duration,
    ) -> Self {
        Self {
            generation,
            interval,
            batch_size,
            creation_shift,
            in_flight: Mutex::new(()),
        }
    }

    /// Runs a single generation pass.
    ///
    /// Returns `Ok(None)` without touching storage when another pass holds the
    /// guard.
    pub async fn run_once(
        &self,
        cancel: &CancellationToken,
    ) -> ServiceResult<Option<GenerationReport>> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Previous generation pass still running, skipping tick.");
            return Ok(None);
        };
        let report = self
            .generation
            .generate_for_all_active_plans(self.batch_size, self.creation_shift, cancel)
            .await?;
        Ok(Some(report))
    }

    /// Loops until `cancel` fires. Pass failures are logged and the loop keeps
    /// ticking.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.batch_size,
            "Generation daemon started."
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately and stands in for the catch-up pass.
        ticker.tick().await;
        self.pass(&cancel).await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.pass(&cancel).await,
            }
        }

        info!("Generation daemon stopped.");
    }

    async fn pass(&self, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = self.run_once(cancel).await {
            error!("Generation pass failed: {}", e);
        }
    }
}
