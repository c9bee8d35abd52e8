//! Driver factory: from an on-disk spec to a live remote driver handle.
//!
//! [`DiskDriverFactory`] composes the [`DriverScanner`], the address
//! canonicalizer, and a pluggable [`RemoteClientFactory`] (production: the
//! HTTP client in [`crate::voldriver::http`]; tests substitute fakes).
//! Resolution never retries: any file I/O, parse, or canonicalization
//! failure is returned to the caller as the proximate cause.  Retry cadence
//! belongs to the syncer.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::address;
use crate::error::VolmanError;
use crate::scanner::{DriverScanner, DriverSpec, SpecKind};
use crate::voldriver::Driver;

/// Constructs remote driver handles bound to a canonical address.
///
/// The transport seam of the factory: production wires in
/// [`crate::voldriver::http::HttpRemoteClientFactory`], tests substitute a
/// fake that records calls and hands out scripted drivers.
#[async_trait]
pub trait RemoteClientFactory: Send + Sync {
    /// Build a driver handle for `name` bound to `address`.
    async fn new_remote_client(
        &self,
        name: &str,
        address: &str,
    ) -> Result<Arc<dyn Driver>, VolmanError>;
}

/// Resolves driver names to live handles via on-disk spec discovery.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// The configured driver directories, in precedence order.
    fn driver_paths(&self) -> &[PathBuf];

    /// Enumerate every currently-present spec across all directories.
    async fn discover(&self) -> Result<BTreeMap<String, DriverSpec>, VolmanError>;

    /// Build a live handle for one already-discovered spec.
    async fn driver_for_spec(&self, spec: &DriverSpec) -> Result<Arc<dyn Driver>, VolmanError>;

    /// Resolve `driver_id` fresh from disk and build a live handle.
    ///
    /// Fails with [`VolmanError::DriverNotFound`] when no spec file for the
    /// name exists in any configured directory.
    async fn driver(&self, driver_id: &str) -> Result<Arc<dyn Driver>, VolmanError>;
}

/// Shape of a `.json` driver spec file.
#[derive(Debug, Deserialize)]
struct JsonDriverSpec {
    #[serde(rename = "Address")]
    address: String,
}

/// Production [`DriverFactory`] backed by the filesystem scanner.
pub struct DiskDriverFactory {
    scanner: DriverScanner,
    remote_clients: Arc<dyn RemoteClientFactory>,
}

impl DiskDriverFactory {
    /// Create a factory over `driver_paths` using `remote_clients` to build
    /// transport handles.
    pub fn new<I, P>(driver_paths: I, remote_clients: Arc<dyn RemoteClientFactory>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            scanner: DriverScanner::new(driver_paths),
            remote_clients,
        }
    }

    /// Derive the raw transport address encoded by a spec file.
    async fn raw_address(&self, spec: &DriverSpec) -> Result<String, VolmanError> {
        match spec.kind {
            // The socket file is itself the endpoint; nothing is read.
            SpecKind::Sock => Ok(spec.path.display().to_string()),
            SpecKind::Spec => {
                let contents = tokio::fs::read_to_string(&spec.path).await.map_err(|e| {
                    VolmanError::Internal(format!("read {}: {e}", spec.path.display()))
                })?;
                Ok(contents.lines().next().unwrap_or_default().to_owned())
            }
            SpecKind::Json => {
                let contents = tokio::fs::read_to_string(&spec.path).await.map_err(|e| {
                    VolmanError::Internal(format!("read {}: {e}", spec.path.display()))
                })?;
                let parsed: JsonDriverSpec = serde_json::from_str(&contents).map_err(|e| {
                    VolmanError::Internal(format!("parse {}: {e}", spec.path.display()))
                })?;
                Ok(parsed.address)
            }
        }
    }
}

#[async_trait]
impl DriverFactory for DiskDriverFactory {
    fn driver_paths(&self) -> &[PathBuf] {
        self.scanner.driver_paths()
    }

    async fn discover(&self) -> Result<BTreeMap<String, DriverSpec>, VolmanError> {
        self.scanner.discover()
    }

    async fn driver_for_spec(&self, spec: &DriverSpec) -> Result<Arc<dyn Driver>, VolmanError> {
        let raw = self.raw_address(spec).await?;
        let address = address::canonicalize(&raw)?;
        debug!(driver = %spec.name, %address, "building remote driver client");
        self.remote_clients
            .new_remote_client(&spec.name, &address)
            .await
    }

    #[instrument(skip(self))]
    async fn driver(&self, driver_id: &str) -> Result<Arc<dyn Driver>, VolmanError> {
        let specs = self.scanner.discover()?;
        let spec = specs
            .get(driver_id)
            .ok_or_else(|| VolmanError::DriverNotFound(driver_id.to_owned()))?;
        self.driver_for_spec(spec).await
    }
}
