//! Manager API wire types.
//!
//! These types form the JSON bodies of the caller-facing manager API
//! (`GET /drivers`, `POST /drivers/mount`, …).  Field names are camelCase on
//! the wire, except the driver entries of [`ListDriversResponse`], which
//! re-use the PascalCase [`InfoResponse`] of the driver protocol verbatim.

use serde::{Deserialize, Serialize};

use crate::voldriver::InfoResponse;

/// Response body of `GET /drivers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListDriversResponse {
    /// Drivers currently present in the registry.
    pub drivers: Vec<InfoResponse>,
}

/// Request body of `POST /drivers/mount`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountRequest {
    /// Driver to mount with.
    pub driver_id: String,
    /// Volume to mount.
    pub volume_id: String,
    /// Opaque mount configuration forwarded to the driver.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// Response body of a successful `POST /drivers/mount`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountResponse {
    /// Host path at which the volume is mounted.
    pub path: String,
}

/// Request body of `POST /drivers/unmount`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmountRequest {
    /// Driver to unmount with.
    pub driver_id: String,
    /// Volume to unmount.
    pub volume_id: String,
}

/// Request body of `POST /drivers/create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// Driver to create with.
    pub driver_id: String,
    /// Volume to create.
    pub volume_id: String,
    /// Driver-specific creation options.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub opts: serde_json::Map<String, serde_json::Value>,
}

/// Error body returned by the manager API with HTTP 500.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable failure description.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_request_field_names() {
        let req = MountRequest {
            driver_id: "fakedriver".into(),
            volume_id: "vol-1".into(),
            config: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["driverId"], "fakedriver");
        assert_eq!(json["volumeId"], "vol-1");
        assert!(json.get("config").is_none());
    }

    #[test]
    fn list_drivers_response_roundtrip() {
        let resp = ListDriversResponse {
            drivers: vec![InfoResponse {
                name: "fakedriver".into(),
                path: "http://127.0.0.1:8080".into(),
            }],
        };
        let json = serde_json::to_string(&resp).expect("serialize");
        assert!(json.contains("\"drivers\""));
        assert!(json.contains("\"Name\":\"fakedriver\""));
        let de: ListDriversResponse = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(de.drivers, resp.drivers);
    }

    #[test]
    fn error_response_shape() {
        let err = ErrorResponse {
            description: "driver 'x' not found in list of known drivers".into(),
        };
        let json = serde_json::to_value(&err).expect("serialize");
        assert!(json["description"].as_str().unwrap().contains("not found"));
    }
}
