//! Driver plugin protocol: the [`Driver`] trait and its JSON wire types.
//!
//! A volume driver is an external plugin process reachable over HTTP (TCP or
//! unix socket).  The daemon talks to it with small JSON bodies whose field
//! names are fixed by the plugin protocol (PascalCase), so every wire type
//! here carries explicit `#[serde(rename)]` attributes.  Driver-level
//! failures travel in the `Err` field of an otherwise successful response;
//! transport-level failures surface as [`VolmanError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VolmanError;

pub mod http;
pub mod server;

/// Capability a driver must report from `Activate` to be usable for volume
/// operations.
pub const VOLUME_DRIVER_CAPABILITY: &str = "VolumeDriver";

/// Fixed routes of the driver plugin API.  All are POST.
pub const ACTIVATE_ROUTE: &str = "/activate";
pub const MOUNT_ROUTE: &str = "/mount";
pub const UNMOUNT_ROUTE: &str = "/unmount";
pub const CREATE_ROUTE: &str = "/create";
pub const REMOVE_ROUTE: &str = "/remove";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Capability-negotiation response returned by `Activate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivateResponse {
    /// Capability set the driver implements, e.g. `["VolumeDriver"]`.
    #[serde(rename = "Implements", default)]
    pub implements: Vec<String>,
    /// Non-empty when activation failed on the driver side.
    #[serde(rename = "Err", default, skip_serializing_if = "String::is_empty")]
    pub err: String,
}

impl ActivateResponse {
    /// `true` when activation succeeded and the driver reported the
    /// [`VOLUME_DRIVER_CAPABILITY`].
    pub fn implements_volume_driver(&self) -> bool {
        self.err.is_empty()
            && self
                .implements
                .iter()
                .any(|c| c == VOLUME_DRIVER_CAPABILITY)
    }
}

/// Request body for a driver `Mount` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountRequest {
    /// Volume to mount.
    #[serde(rename = "VolumeId")]
    pub volume_id: String,
    /// Opaque mount configuration forwarded from the caller.
    #[serde(
        rename = "Config",
        default,
        skip_serializing_if = "serde_json::Map::is_empty"
    )]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// Response body for a driver `Mount` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountResponse {
    /// Host path at which the volume is now mounted.
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: String,
    /// Non-empty when the mount failed on the driver side.
    #[serde(rename = "Err", default)]
    pub err: String,
}

/// Request body for a driver `Unmount` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnmountRequest {
    /// Volume to unmount.
    #[serde(rename = "VolumeId")]
    pub volume_id: String,
}

/// Request body for a driver `Create` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Name of the volume to create.
    #[serde(rename = "Name")]
    pub name: String,
    /// Driver-specific creation options.
    #[serde(
        rename = "Opts",
        default,
        skip_serializing_if = "serde_json::Map::is_empty"
    )]
    pub opts: serde_json::Map<String, serde_json::Value>,
}

/// Request body for a driver `Remove` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveRequest {
    /// Name of the volume to remove.
    #[serde(rename = "Name")]
    pub name: String,
}

/// Generic driver response carrying only an error field.
///
/// `Err` is the empty string on success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Err", default)]
    pub err: String,
}

/// Identifying metadata for a driver: its name and the transport address the
/// handle is bound to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InfoResponse {
    /// Driver name (the spec file stem).
    #[serde(rename = "Name")]
    pub name: String,
    /// Canonical transport address.
    #[serde(rename = "Path")]
    pub path: String,
}

// ---------------------------------------------------------------------------
// Driver handle
// ---------------------------------------------------------------------------

/// A live, polymorphic connection to a volume driver plugin.
///
/// Driver-reported failures are carried in each response's `Err` field;
/// an `Err(VolmanError)` return means the call itself could not be made
/// (connection refused, timeout, malformed response).
#[async_trait]
pub trait Driver: Send + Sync {
    /// Name and transport address of the driver this handle is bound to.
    fn info(&self) -> InfoResponse;

    /// Capability-negotiation handshake.
    async fn activate(&self) -> Result<ActivateResponse, VolmanError>;

    /// Mount a volume and report the resulting host path.
    async fn mount(&self, request: MountRequest) -> Result<MountResponse, VolmanError>;

    /// Unmount a volume.
    async fn unmount(&self, request: UnmountRequest) -> Result<ErrorResponse, VolmanError>;

    /// Create a volume.
    async fn create(&self, request: CreateRequest) -> Result<ErrorResponse, VolmanError>;

    /// Remove a volume.
    async fn remove(&self, request: RemoveRequest) -> Result<ErrorResponse, VolmanError>;
}
