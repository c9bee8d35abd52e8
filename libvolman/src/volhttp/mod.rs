//! Manager HTTP interface.
//!
//! [`router`] exposes a [`Manager`] over the caller-facing API:
//!
//! | Route                  | Method | Body                          |
//! |------------------------|--------|-------------------------------|
//! | `/drivers`             | GET    | — → [`ListDriversResponse`]   |
//! | `/drivers/mount`       | POST   | [`MountRequest`] → `{path}`   |
//! | `/drivers/unmount`     | POST   | [`UnmountRequest`] → `{}`     |
//! | `/drivers/create`      | POST   | [`CreateRequest`] → `{}`      |
//!
//! Every failure maps to HTTP 500 with `{"description": …}`; the remote
//! client in [`client`] re-raises that description on the caller side.

pub mod client;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tracing::warn;

use crate::client::Manager;
use crate::error::VolmanError;
use crate::types::{
    CreateRequest, ErrorResponse, ListDriversResponse, MountRequest, MountResponse,
    UnmountRequest,
};

/// Route prefix shared by every manager endpoint.
pub const DRIVERS_ROUTE: &str = "/drivers";
/// Mount endpoint.
pub const MOUNT_ROUTE: &str = "/drivers/mount";
/// Unmount endpoint.
pub const UNMOUNT_ROUTE: &str = "/drivers/unmount";
/// Create endpoint.
pub const CREATE_ROUTE: &str = "/drivers/create";

type ManagerState = Arc<dyn Manager>;

/// Build a router serving `manager` on the manager API routes.
pub fn router(manager: ManagerState) -> Router {
    Router::new()
        .route(DRIVERS_ROUTE, get(list_drivers))
        .route(MOUNT_ROUTE, post(mount))
        .route(UNMOUNT_ROUTE, post(unmount))
        .route(CREATE_ROUTE, post(create))
        .with_state(manager)
}

fn error_response(err: VolmanError) -> Response {
    warn!(error = %err, "manager request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            description: err.to_string(),
        }),
    )
        .into_response()
}

async fn list_drivers(State(manager): State<ManagerState>) -> Response {
    match manager.list_drivers().await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(e),
    }
}

async fn mount(
    State(manager): State<ManagerState>,
    Json(request): Json<MountRequest>,
) -> Response {
    match manager
        .mount(&request.driver_id, &request.volume_id, request.config)
        .await
    {
        Ok(path) => Json(MountResponse { path }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn unmount(
    State(manager): State<ManagerState>,
    Json(request): Json<UnmountRequest>,
) -> Response {
    match manager
        .unmount(&request.driver_id, &request.volume_id)
        .await
    {
        Ok(()) => Json(serde_json::json!({})).into_response(),
        Err(e) => error_response(e),
    }
}

async fn create(
    State(manager): State<ManagerState>,
    Json(request): Json<CreateRequest>,
) -> Response {
    match manager
        .create(&request.driver_id, &request.volume_id, request.opts)
        .await
    {
        Ok(()) => Json(serde_json::json!({})).into_response(),
        Err(e) => error_response(e),
    }
}
