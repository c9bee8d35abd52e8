//! Remote manager client.
//!
//! [`RemoteManagerClient`] implements [`Manager`] against a daemon serving
//! the [`super::router`] routes, so callers can switch between in-process
//! and over-the-wire managers without changing call sites.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::client::Manager;
use crate::error::VolmanError;
use crate::types::{
    CreateRequest, ErrorResponse, ListDriversResponse, MountRequest, MountResponse,
    UnmountRequest,
};

/// HTTP [`Manager`] implementation.
pub struct RemoteManagerClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteManagerClient {
    /// Create a client for the daemon at `base_url`, e.g.
    /// `http://127.0.0.1:8750`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    async fn handle<Resp: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Resp, VolmanError> {
        let status = response.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let err: ErrorResponse = response.json().await.map_err(VolmanError::transport)?;
            return Err(VolmanError::Remote(err.description));
        }
        if !status.is_success() {
            return Err(VolmanError::Transport(format!(
                "manager returned HTTP {status}"
            )));
        }
        response.json().await.map_err(VolmanError::transport)
    }

    async fn post<Req, Resp>(&self, route: &str, body: &Req) -> Result<Resp, VolmanError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{route}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(VolmanError::transport)?;
        self.handle(response).await
    }
}

#[async_trait]
impl Manager for RemoteManagerClient {
    #[instrument(skip(self))]
    async fn list_drivers(&self) -> Result<ListDriversResponse, VolmanError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, super::DRIVERS_ROUTE))
            .send()
            .await
            .map_err(VolmanError::transport)?;
        self.handle(response).await
    }

    #[instrument(skip(self, config))]
    async fn mount(
        &self,
        driver_id: &str,
        volume_id: &str,
        config: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, VolmanError> {
        let resp: MountResponse = self
            .post(
                super::MOUNT_ROUTE,
                &MountRequest {
                    driver_id: driver_id.to_owned(),
                    volume_id: volume_id.to_owned(),
                    config,
                },
            )
            .await?;
        Ok(resp.path)
    }

    #[instrument(skip(self))]
    async fn unmount(&self, driver_id: &str, volume_id: &str) -> Result<(), VolmanError> {
        let _: serde_json::Value = self
            .post(
                super::UNMOUNT_ROUTE,
                &UnmountRequest {
                    driver_id: driver_id.to_owned(),
                    volume_id: volume_id.to_owned(),
                },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, opts))]
    async fn create(
        &self,
        driver_id: &str,
        volume_id: &str,
        opts: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), VolmanError> {
        let _: serde_json::Value = self
            .post(
                super::CREATE_ROUTE,
                &CreateRequest {
                    driver_id: driver_id.to_owned(),
                    volume_id: volume_id.to_owned(),
                    opts,
                },
            )
            .await?;
        Ok(())
    }
}
