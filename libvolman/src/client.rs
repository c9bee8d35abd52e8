//! Local client: the caller-facing manager facade.
//!
//! [`LocalClient`] implements the [`Manager`] operations against the
//! [`DriverRegistry`] (listing) and the [`DriverFactory`] (mount, unmount,
//! create).  The split is a deliberate freshness-over-cache policy:
//!
//! * `list_drivers` reads only the registry, because a listing must reflect
//!   drivers verified healthy and capability-matching by the last sync pass;
//! * `mount`/`unmount`/`create` resolve the driver fresh from disk, so a
//!   driver appearing or changing address between sync ticks is usable
//!   immediately.
//!
//! The client never writes the registry; only the syncer's publish step
//! mutates it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::VolmanError;
use crate::factory::DriverFactory;
use crate::registry::DriverRegistry;
use crate::types::ListDriversResponse;
use crate::voldriver::{
    CreateRequest, Driver, MountRequest, UnmountRequest, VOLUME_DRIVER_CAPABILITY,
};

/// Caller-facing volume manager operations.
#[async_trait]
pub trait Manager: Send + Sync {
    /// List drivers verified by the last completed sync pass.  Never touches
    /// the network.
    async fn list_drivers(&self) -> Result<ListDriversResponse, VolmanError>;

    /// Mount `volume_id` with `driver_id` and return the mount path.
    async fn mount(
        &self,
        driver_id: &str,
        volume_id: &str,
        config: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, VolmanError>;

    /// Unmount `volume_id` with `driver_id`.
    async fn unmount(&self, driver_id: &str, volume_id: &str) -> Result<(), VolmanError>;

    /// Create `volume_id` with `driver_id`.
    async fn create(
        &self,
        driver_id: &str,
        volume_id: &str,
        opts: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), VolmanError>;
}

/// In-process [`Manager`] implementation.
pub struct LocalClient {
    registry: Arc<DriverRegistry>,
    factory: Arc<dyn DriverFactory>,
}

impl LocalClient {
    /// Create a client over an injected registry and factory.
    pub fn new(registry: Arc<DriverRegistry>, factory: Arc<dyn DriverFactory>) -> Self {
        Self { registry, factory }
    }

    /// Resolve `driver_id` fresh from disk and make sure it is activated.
    ///
    /// When the registry already holds the driver as activated, the last
    /// sync pass has verified its capabilities and no handshake is repeated.
    /// Otherwise the freshly resolved handle must activate and report the
    /// `VolumeDriver` capability before any operation is sent to it.
    async fn resolve_activated(&self, driver_id: &str) -> Result<Arc<dyn Driver>, VolmanError> {
        let driver = self.factory.driver(driver_id).await?;
        if self.registry.activated(driver_id).unwrap_or(false) {
            return Ok(driver);
        }
        debug!(driver = %driver_id, "driver not yet verified, activating");
        let resp = driver.activate().await?;
        if !resp.implements_volume_driver() {
            let reason = if resp.err.is_empty() {
                format!(
                    "capabilities {:?} do not include {VOLUME_DRIVER_CAPABILITY}",
                    resp.implements
                )
            } else {
                resp.err
            };
            return Err(VolmanError::ActivationRejected {
                driver: driver_id.to_owned(),
                reason,
            });
        }
        Ok(driver)
    }
}

#[async_trait]
impl Manager for LocalClient {
    #[instrument(skip(self))]
    async fn list_drivers(&self) -> Result<ListDriversResponse, VolmanError> {
        Ok(ListDriversResponse {
            drivers: self.registry.drivers(),
        })
    }

    #[instrument(skip(self, config))]
    async fn mount(
        &self,
        driver_id: &str,
        volume_id: &str,
        config: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, VolmanError> {
        let driver = self.resolve_activated(driver_id).await?;
        let mount_failed = |cause: String| VolmanError::MountFailed {
            driver: driver_id.to_owned(),
            volume: volume_id.to_owned(),
            cause,
        };
        let resp = driver
            .mount(MountRequest {
                volume_id: volume_id.to_owned(),
                config,
            })
            .await
            .map_err(|e| mount_failed(e.to_string()))?;
        if !resp.err.is_empty() {
            return Err(mount_failed(resp.err));
        }
        debug!(driver = %driver_id, volume = %volume_id, path = %resp.mountpoint, "volume mounted");
        Ok(resp.mountpoint)
    }

    #[instrument(skip(self))]
    async fn unmount(&self, driver_id: &str, volume_id: &str) -> Result<(), VolmanError> {
        let driver = self.resolve_activated(driver_id).await?;
        let unmount_failed = |cause: String| VolmanError::UnmountFailed {
            driver: driver_id.to_owned(),
            volume: volume_id.to_owned(),
            cause,
        };
        let resp = driver
            .unmount(UnmountRequest {
                volume_id: volume_id.to_owned(),
            })
            .await
            .map_err(|e| unmount_failed(e.to_string()))?;
        if !resp.err.is_empty() {
            return Err(unmount_failed(resp.err));
        }
        Ok(())
    }

    #[instrument(skip(self, opts))]
    async fn create(
        &self,
        driver_id: &str,
        volume_id: &str,
        opts: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), VolmanError> {
        let driver = self.resolve_activated(driver_id).await?;
        let create_failed = |cause: String| VolmanError::CreateFailed {
            driver: driver_id.to_owned(),
            volume: volume_id.to_owned(),
            cause,
        };
        let resp = driver
            .create(CreateRequest {
                name: volume_id.to_owned(),
                opts,
            })
            .await
            .map_err(|e| create_failed(e.to_string()))?;
        if !resp.err.is_empty() {
            return Err(create_failed(resp.err));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::registry::DriverEntry;
    use crate::scanner::{DriverSpec, SpecKind};
    use crate::voldriver::{
        ActivateResponse, ErrorResponse, InfoResponse, MountResponse, RemoveRequest,
    };

    /// Fully scriptable driver fake with call counters.
    #[derive(Default)]
    struct FakeDriver {
        activate_response: Mutex<ActivateResponse>,
        mount_response: Mutex<MountResponse>,
        unmount_response: Mutex<ErrorResponse>,
        create_response: Mutex<ErrorResponse>,
        activate_calls: Mutex<usize>,
        mount_calls: Mutex<usize>,
        unmount_calls: Mutex<usize>,
    }

    impl FakeDriver {
        fn volume_driver() -> Arc<Self> {
            let fake = Self::default();
            *fake.activate_response.lock() = ActivateResponse {
                implements: vec![VOLUME_DRIVER_CAPABILITY.to_owned()],
                err: String::new(),
            };
            *fake.mount_response.lock() = MountResponse {
                mountpoint: "/mnt/vol".to_owned(),
                err: String::new(),
            };
            Arc::new(fake)
        }
    }

    #[async_trait]
    impl Driver for FakeDriver {
        fn info(&self) -> InfoResponse {
            InfoResponse {
                name: "fakedriver".to_owned(),
                path: "http://0.0.0.0:8080".to_owned(),
            }
        }

        async fn activate(&self) -> Result<ActivateResponse, VolmanError> {
            *self.activate_calls.lock() += 1;
            Ok(self.activate_response.lock().clone())
        }

        async fn mount(&self, _request: MountRequest) -> Result<MountResponse, VolmanError> {
            *self.mount_calls.lock() += 1;
            Ok(self.mount_response.lock().clone())
        }

        async fn unmount(&self, _request: UnmountRequest) -> Result<ErrorResponse, VolmanError> {
            *self.unmount_calls.lock() += 1;
            Ok(self.unmount_response.lock().clone())
        }

        async fn create(&self, _request: CreateRequest) -> Result<ErrorResponse, VolmanError> {
            Ok(self.create_response.lock().clone())
        }

        async fn remove(&self, _request: RemoveRequest) -> Result<ErrorResponse, VolmanError> {
            Ok(ErrorResponse::default())
        }
    }

    /// Factory fake; `driver_calls` counts resolutions so tests can assert
    /// zero network work for unknown names.
    #[derive(Default)]
    struct FakeFactory {
        drivers: Mutex<BTreeMap<String, Arc<FakeDriver>>>,
        driver_calls: Mutex<usize>,
        paths: Vec<PathBuf>,
    }

    #[async_trait]
    impl DriverFactory for FakeFactory {
        fn driver_paths(&self) -> &[PathBuf] {
            &self.paths
        }

        async fn discover(&self) -> Result<BTreeMap<String, DriverSpec>, VolmanError> {
            Ok(self
                .drivers
                .lock()
                .keys()
                .map(|name| {
                    (
                        name.clone(),
                        DriverSpec {
                            name: name.clone(),
                            kind: SpecKind::Spec,
                            path: PathBuf::from(format!("/plugins/{name}.spec")),
                        },
                    )
                })
                .collect())
        }

        async fn driver_for_spec(
            &self,
            spec: &DriverSpec,
        ) -> Result<Arc<dyn Driver>, VolmanError> {
            self.driver(&spec.name).await
        }

        async fn driver(&self, driver_id: &str) -> Result<Arc<dyn Driver>, VolmanError> {
            *self.driver_calls.lock() += 1;
            self.drivers
                .lock()
                .get(driver_id)
                .cloned()
                .map(|d| d as Arc<dyn Driver>)
                .ok_or_else(|| VolmanError::DriverNotFound(driver_id.to_owned()))
        }
    }

    fn client_with(
        fake: Option<Arc<FakeDriver>>,
        registered: bool,
    ) -> (LocalClient, Arc<FakeFactory>, Arc<DriverRegistry>) {
        let factory = Arc::new(FakeFactory::default());
        let registry = Arc::new(DriverRegistry::new());
        if let Some(fake) = fake {
            factory
                .drivers
                .lock()
                .insert("fakedriver".to_owned(), fake.clone());
            if registered {
                registry.replace_all(HashMap::from([(
                    "fakedriver".to_owned(),
                    DriverEntry {
                        driver: fake as Arc<dyn Driver>,
                        activated: true,
                    },
                )]));
            }
        }
        (
            LocalClient::new(registry.clone(), factory.clone()),
            factory,
            registry,
        )
    }

    #[tokio::test]
    async fn list_drivers_is_a_registry_snapshot() {
        let fake = FakeDriver::volume_driver();
        let (client, _factory, _registry) = client_with(Some(fake), true);

        let drivers = client.list_drivers().await.expect("list");
        assert_eq!(drivers.drivers.len(), 1);
        assert_eq!(drivers.drivers[0].name, "fakedriver");
    }

    #[tokio::test]
    async fn list_drivers_empty_when_nothing_synced() {
        let (client, _factory, _registry) = client_with(None, false);
        let drivers = client.list_drivers().await.expect("list");
        assert!(drivers.drivers.is_empty());
    }

    #[tokio::test]
    async fn mount_returns_driver_reported_path() {
        let fake = FakeDriver::volume_driver();
        let (client, _factory, _registry) = client_with(Some(fake.clone()), true);

        let path = client
            .mount("fakedriver", "vol-1", serde_json::Map::new())
            .await
            .expect("mount");
        assert_eq!(path, "/mnt/vol");
        assert_eq!(*fake.mount_calls.lock(), 1);
        // Registry already verified the driver: no second handshake.
        assert_eq!(*fake.activate_calls.lock(), 0);
    }

    #[tokio::test]
    async fn mount_activates_when_driver_not_in_registry() {
        let fake = FakeDriver::volume_driver();
        let (client, _factory, _registry) = client_with(Some(fake.clone()), false);

        client
            .mount("fakedriver", "vol-1", serde_json::Map::new())
            .await
            .expect("mount");
        assert_eq!(*fake.activate_calls.lock(), 1);
    }

    #[tokio::test]
    async fn mount_translates_driver_error() {
        let fake = FakeDriver::volume_driver();
        *fake.mount_response.lock() = MountResponse {
            mountpoint: String::new(),
            err: "an error".to_owned(),
        };
        let (client, _factory, _registry) = client_with(Some(fake), true);

        let err = client
            .mount("fakedriver", "vol-1", serde_json::Map::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VolmanError::MountFailed { driver, volume, cause }
                if driver == "fakedriver" && volume == "vol-1" && cause == "an error"
        ));
    }

    #[tokio::test]
    async fn mount_unknown_driver_makes_no_driver_calls() {
        let (client, factory, _registry) = client_with(None, false);

        let err = client
            .mount("missing", "vol-1", serde_json::Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VolmanError::DriverNotFound(_)));
        // The factory was consulted once and found nothing; no handle was
        // ever built, so no network call could have happened.
        assert_eq!(*factory.driver_calls.lock(), 1);
    }

    #[tokio::test]
    async fn mount_rejected_for_non_volume_driver() {
        let fake = FakeDriver::volume_driver();
        *fake.activate_response.lock() = ActivateResponse {
            implements: vec!["authz".to_owned(), "NetworkDriver".to_owned()],
            err: String::new(),
        };
        let (client, _factory, _registry) = client_with(Some(fake.clone()), false);

        let err = client
            .mount("fakedriver", "vol-1", serde_json::Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VolmanError::ActivationRejected { .. }));
        assert_eq!(*fake.mount_calls.lock(), 0);
    }

    #[tokio::test]
    async fn unmount_translates_driver_error() {
        let fake = FakeDriver::volume_driver();
        *fake.unmount_response.lock() = ErrorResponse {
            err: "unmount failure".to_owned(),
        };
        let (client, _factory, _registry) = client_with(Some(fake), true);

        let err = client.unmount("fakedriver", "vol-1").await.unwrap_err();
        assert!(matches!(err, VolmanError::UnmountFailed { .. }));
    }

    #[tokio::test]
    async fn unmount_succeeds_and_calls_driver_once() {
        let fake = FakeDriver::volume_driver();
        let (client, _factory, _registry) = client_with(Some(fake.clone()), true);

        client.unmount("fakedriver", "vol-1").await.expect("unmount");
        assert_eq!(*fake.unmount_calls.lock(), 1);
    }

    #[tokio::test]
    async fn create_translates_driver_error() {
        let fake = FakeDriver::volume_driver();
        *fake.create_response.lock() = ErrorResponse {
            err: "create fails".to_owned(),
        };
        let (client, _factory, _registry) = client_with(Some(fake), true);

        let err = client
            .create("fakedriver", "vol-1", serde_json::Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VolmanError::CreateFailed { .. }));
    }
}
