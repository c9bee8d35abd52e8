//! Background driver syncer.
//!
//! The syncer keeps the [`DriverRegistry`] current: on every tick it re-runs
//! discovery through the [`DriverFactory`], activates each candidate, keeps
//! only drivers that report the `VolumeDriver` capability, and republishes
//! the registry wholesale.  One bad plugin never breaks discovery of the
//! others, and no failure inside a pass terminates the loop — the syncer
//! runs until explicitly stopped.
//!
//! The tick loop rides `tokio::time::interval`, so tests drive it with
//! tokio's paused clock (`start_paused` + `tokio::time::advance`) instead of
//! waiting on wall time.  The interval's first tick fires immediately, which
//! gives one discovery pass right after start.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::VolmanError;
use crate::factory::DriverFactory;
use crate::registry::{DriverEntry, DriverRegistry};

/// Periodically refreshes the driver registry from on-disk specs.
pub struct DriverSyncer {
    registry: Arc<DriverRegistry>,
    factory: Arc<dyn DriverFactory>,
    scan_interval: Duration,
}

impl DriverSyncer {
    /// Create a syncer publishing into `registry`, discovering through
    /// `factory`, one pass per `scan_interval`.
    pub fn new(
        registry: Arc<DriverRegistry>,
        factory: Arc<dyn DriverFactory>,
        scan_interval: Duration,
    ) -> Self {
        Self {
            registry,
            factory,
            scan_interval,
        }
    }

    /// Run one complete discovery-and-activation pass and publish the result.
    ///
    /// A discovery failure leaves the registry untouched for this pass; it
    /// will be retried on the next tick.
    #[instrument(skip(self))]
    pub async fn sync_once(&self) {
        match self.discover_drivers().await {
            Ok(entries) => {
                let count = entries.len();
                self.registry.replace_all(entries);
                debug!(drivers = count, "registry republished");
            }
            Err(e) => {
                warn!(error = %e, "discovery pass failed, keeping previous registry contents");
            }
        }
    }

    /// Enumerate every on-disk spec, activate each candidate, and keep the
    /// survivors.
    ///
    /// Per-driver failures (unreachable endpoint, activation error, missing
    /// `VolumeDriver` capability) exclude that driver from the pass and are
    /// logged, never propagated.
    pub async fn discover_drivers(&self) -> Result<HashMap<String, DriverEntry>, VolmanError> {
        let specs = self.factory.discover().await?;
        let mut entries = HashMap::new();
        for (name, spec) in &specs {
            let driver = match self.factory.driver_for_spec(spec).await {
                Ok(driver) => driver,
                Err(e) => {
                    warn!(driver = %name, error = %e, "skipping driver, cannot build remote client");
                    continue;
                }
            };
            match driver.activate().await {
                Ok(resp) if resp.implements_volume_driver() => {
                    entries.insert(
                        name.clone(),
                        DriverEntry {
                            driver,
                            activated: true,
                        },
                    );
                }
                Ok(resp) => {
                    warn!(
                        driver = %name,
                        err = %resp.err,
                        implements = ?resp.implements,
                        "driver excluded, activation rejected",
                    );
                }
                Err(e) => {
                    warn!(driver = %name, error = %e, "driver excluded, activate call failed");
                }
            }
        }
        Ok(entries)
    }

    /// Spawn the tick loop and return its handle.
    ///
    /// Returns immediately — the handle exists (and a supervisor may consider
    /// the syncer live) before the first pass completes.
    pub fn start(self) -> SyncerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let interval = self.scan_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sync_once().await,
                    // Both an explicit stop and a dropped handle end the loop.
                    _ = stop_rx.changed() => {
                        info!("driver syncer stopped");
                        return;
                    }
                }
            }
        });
        SyncerHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Handle to a running syncer loop.
///
/// Dropping the handle also stops the loop.
pub struct SyncerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncerHandle {
    /// Signal the loop to stop.  Prompt and idempotent; the registry is not
    /// altered further after the loop exits.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stopped(self) {
        self.stop();
        let _ = self.task.await;
    }

    /// Whether the loop has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
