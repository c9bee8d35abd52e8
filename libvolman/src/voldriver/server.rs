//! HTTP server scaffolding for driver plugins.
//!
//! [`router`] exposes any [`Driver`] implementation over the JSON plugin
//! protocol, mirroring what [`super::http::HttpDriverClient`] expects on the
//! other end.  Driver-level failures travel inside a `200` body's `Err`
//! field; only malformed requests and outright call failures produce a `500`
//! with `{"Err": …}`.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::{
    ACTIVATE_ROUTE, CREATE_ROUTE, CreateRequest, Driver, ErrorResponse, MOUNT_ROUTE,
    MountRequest, REMOVE_ROUTE, RemoveRequest, UNMOUNT_ROUTE, UnmountRequest,
};

type DriverState = Arc<dyn Driver>;

/// Build a router serving `driver` on the plugin protocol routes.
pub fn router(driver: DriverState) -> Router {
    Router::new()
        .route(ACTIVATE_ROUTE, post(activate))
        .route(MOUNT_ROUTE, post(mount))
        .route(UNMOUNT_ROUTE, post(unmount))
        .route(CREATE_ROUTE, post(create))
        .route(REMOVE_ROUTE, post(remove))
        .with_state(driver)
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "rejecting malformed driver request");
        error_response(format!("malformed request body: {e}"))
    })
}

fn error_response(err: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { err }),
    )
        .into_response()
}

async fn activate(State(driver): State<DriverState>) -> Response {
    match driver.activate().await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(e.to_string()),
    }
}

async fn mount(State(driver): State<DriverState>, body: Bytes) -> Response {
    let request: MountRequest = match decode(&body) {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    match driver.mount(request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(e.to_string()),
    }
}

async fn unmount(State(driver): State<DriverState>, body: Bytes) -> Response {
    let request: UnmountRequest = match decode(&body) {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    match driver.unmount(request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(e.to_string()),
    }
}

async fn create(State(driver): State<DriverState>, body: Bytes) -> Response {
    let request: CreateRequest = match decode(&body) {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    match driver.create(request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(e.to_string()),
    }
}

async fn remove(State(driver): State<DriverState>, body: Bytes) -> Response {
    let request: RemoveRequest = match decode(&body) {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    match driver.remove(request).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(e.to_string()),
    }
}
