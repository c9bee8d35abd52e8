//! Volman error types.
//!
//! All errors in the `libvolman` crate are represented by the [`VolmanError`]
//! enum, which derives [`thiserror::Error`] for ergonomic error handling and
//! also implements [`Serialize`]/[`Deserialize`] so errors can travel across
//! the HTTP transport layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for volume manager operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone)]
pub enum VolmanError {
    /// A configured driver directory could not be listed.
    ///
    /// Fatal to the current discovery pass, recoverable on the next one.
    #[error("invalid driver path {path}: {cause}")]
    InvalidDriverPath {
        /// The offending driver directory.
        path: String,
        /// Human-readable failure reason.
        cause: String,
    },

    /// A driver spec file contains an address that cannot be canonicalized.
    #[error("malformed driver address '{address}': {cause}")]
    MalformedAddress {
        /// The raw address text as read from the spec file.
        address: String,
        /// Human-readable failure reason.
        cause: String,
    },

    /// The requested driver is absent from the current on-disk discovery.
    #[error("driver '{0}' not found in list of known drivers")]
    DriverNotFound(String),

    /// The driver responded to `Activate` but is not usable as a volume
    /// driver (errored, or did not report the `VolumeDriver` capability).
    #[error("driver {driver} rejected activation: {reason}")]
    ActivationRejected {
        /// Driver name.
        driver: String,
        /// Human-readable rejection reason.
        reason: String,
    },

    /// A mount operation failed, as reported by the driver.
    #[error("mount of volume {volume} with driver {driver} failed: {cause}")]
    MountFailed {
        /// Driver name.
        driver: String,
        /// Volume identifier.
        volume: String,
        /// Human-readable failure reason.
        cause: String,
    },

    /// An unmount operation failed, as reported by the driver.
    #[error("unmount of volume {volume} with driver {driver} failed: {cause}")]
    UnmountFailed {
        /// Driver name.
        driver: String,
        /// Volume identifier.
        volume: String,
        /// Human-readable failure reason.
        cause: String,
    },

    /// A create operation failed, as reported by the driver.
    #[error("create of volume {volume} with driver {driver} failed: {cause}")]
    CreateFailed {
        /// Driver name.
        driver: String,
        /// Volume identifier.
        volume: String,
        /// Human-readable failure reason.
        cause: String,
    },

    /// An HTTP / socket transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// An error reported by a remote manager endpoint.
    #[error("remote error: {0}")]
    Remote(String),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VolmanError {
    /// Create a [`VolmanError::Transport`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }

    /// Create a [`VolmanError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = VolmanError::DriverNotFound("fakedriver".into());
        assert_eq!(
            err.to_string(),
            "driver 'fakedriver' not found in list of known drivers"
        );
    }

    #[test]
    fn error_serde_roundtrip() {
        let err = VolmanError::MountFailed {
            driver: "fakedriver".into(),
            volume: "vol-1".into(),
            cause: "permission denied".into(),
        };
        let json = serde_json::to_string(&err).expect("serialize");
        let de: VolmanError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(err.to_string(), de.to_string());
    }
}
