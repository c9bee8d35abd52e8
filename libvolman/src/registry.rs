//! Concurrent driver registry.
//!
//! The registry is the only shared mutable resource between the background
//! syncer and the caller-facing client.  It is constructor-injected into
//! both; there is no ambient singleton.
//!
//! # Lock discipline
//!
//! The map is guarded by a read/write lock.  Readers ([`drivers`],
//! [`activated`]) take the shared path and may proceed concurrently; the
//! syncer's [`replace_all`] takes the exclusive path and swaps the full
//! contents in one step, never patching entries in place.  Readers therefore
//! always observe either the old complete set or the new complete set.
//!
//! [`drivers`]: DriverRegistry::drivers
//! [`activated`]: DriverRegistry::activated
//! [`replace_all`]: DriverRegistry::replace_all

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::VolmanError;
use crate::voldriver::{Driver, InfoResponse};

/// One registered driver: a live handle plus its activation state.
///
/// Membership invariant: an entry exists iff the driver's most recent
/// `Activate` call (during the last completed sync pass) succeeded and
/// reported the `VolumeDriver` capability.
#[derive(Clone)]
pub struct DriverEntry {
    /// Live handle owned by the registry for listing purposes.
    pub driver: Arc<dyn Driver>,
    /// Whether the handle passed capability negotiation.
    pub activated: bool,
}

impl fmt::Debug for DriverEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverEntry")
            .field("driver", &self.driver.info())
            .field("activated", &self.activated)
            .finish()
    }
}

/// Concurrent store of currently-known, activated driver handles.
#[derive(Default)]
pub struct DriverRegistry {
    entries: RwLock<HashMap<String, DriverEntry>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the full registry contents with `entries`.
    ///
    /// This is the syncer's publish step: entries absent from the new set
    /// are dropped even if they were present moments before.
    pub fn replace_all(&self, entries: HashMap<String, DriverEntry>) {
        *self.entries.write() = entries;
    }

    /// Snapshot the identity of every registered driver, sorted by name.
    pub fn drivers(&self) -> Vec<InfoResponse> {
        let mut infos: Vec<InfoResponse> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.driver.info())
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Whether the named driver is registered and activated.
    ///
    /// Fails with [`VolmanError::DriverNotFound`] when the driver is not in
    /// the registry at all.
    pub fn activated(&self, name: &str) -> Result<bool, VolmanError> {
        self.entries
            .read()
            .get(name)
            .map(|entry| entry.activated)
            .ok_or_else(|| VolmanError::DriverNotFound(name.to_owned()))
    }

    /// The registered handle for `name`, if any.
    pub fn driver(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.entries.read().get(name).map(|entry| entry.driver.clone())
    }

    /// Number of registered drivers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry holds no drivers.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
