//! HTTP remote client for driver plugins.
//!
//! [`HttpDriverClient`] speaks the JSON plugin protocol over either TCP
//! (`http://host[:port]`) or a unix socket (`unix://path` or a bare absolute
//! path).  Each call opens one connection, performs an HTTP/1.1 handshake,
//! sends a single POST, and decodes the response body — the hyper client
//! connection API makes both stream types share one code path.  Every call
//! is bounded by a per-request deadline so one unresponsive plugin cannot
//! stall a discovery pass.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::{debug, instrument};

use crate::error::VolmanError;
use crate::factory::RemoteClientFactory;

use super::{
    ACTIVATE_ROUTE, ActivateResponse, CREATE_ROUTE, CreateRequest, Driver, ErrorResponse,
    InfoResponse, MOUNT_ROUTE, MountRequest, MountResponse, REMOVE_ROUTE, RemoveRequest,
    UNMOUNT_ROUTE, UnmountRequest,
};

/// Deadline applied to each driver call when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A parsed canonical transport endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Endpoint {
    fn parse(address: &str) -> Result<Self, VolmanError> {
        if let Some(path) = address.strip_prefix("unix://") {
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if address.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(address)));
        }
        if let Some(rest) = address.strip_prefix("http://") {
            let rest = rest.trim_end_matches('/');
            // IP literals first, so IPv6 colons are never mistaken for a
            // port separator: `[::1]:8080` and bare `::1` both parse here.
            if let Ok(sock) = rest.parse::<SocketAddr>() {
                return Ok(Endpoint::Tcp {
                    host: sock.ip().to_string(),
                    port: sock.port(),
                });
            }
            if let Ok(ip) = rest.parse::<IpAddr>() {
                return Ok(Endpoint::Tcp {
                    host: ip.to_string(),
                    port: 80,
                });
            }
            let (host, port) = match rest.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port.parse::<u16>().map_err(|e| {
                        VolmanError::MalformedAddress {
                            address: address.to_owned(),
                            cause: format!("bad port: {e}"),
                        }
                    })?;
                    (host, port)
                }
                None => (rest, 80),
            };
            if host.is_empty() || host.contains(':') {
                return Err(VolmanError::MalformedAddress {
                    address: address.to_owned(),
                    cause: "http address has no valid host".to_owned(),
                });
            }
            return Ok(Endpoint::Tcp {
                host: host.to_owned(),
                port,
            });
        }
        Err(VolmanError::MalformedAddress {
            address: address.to_owned(),
            cause: "unsupported transport scheme".to_owned(),
        })
    }

    /// Value for the HTTP `Host` header.  Unix-socket peers conventionally
    /// see `localhost`.
    fn host_header(&self) -> String {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => format!("[{host}]:{port}"),
            Endpoint::Tcp { host, port } => format!("{host}:{port}"),
            Endpoint::Unix(_) => "localhost".to_owned(),
        }
    }
}

/// Driver handle bound to one canonical address.
pub struct HttpDriverClient {
    name: String,
    address: String,
    endpoint: Endpoint,
    request_timeout: Duration,
}

impl HttpDriverClient {
    /// Build a client for driver `name` at the canonical `address`, with the
    /// default request deadline.
    ///
    /// Purely local: no connection is attempted until the first call.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Result<Self, VolmanError> {
        let address = address.into();
        let endpoint = Endpoint::parse(&address)?;
        Ok(Self {
            name: name.into(),
            address,
            endpoint,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// POST `body` to `route` and decode the JSON response.
    ///
    /// The whole exchange (connect, handshake, request, body) is bounded by
    /// the request deadline; a silent plugin cannot hold a call open.
    #[instrument(skip(self, body), fields(driver = %self.name, %route))]
    async fn post<Req, Resp>(&self, route: &str, body: &Req) -> Result<Resp, VolmanError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        tokio::time::timeout(self.request_timeout, self.dispatch(route, body))
            .await
            .map_err(|_| {
                VolmanError::Transport(format!(
                    "driver did not respond within {:?}",
                    self.request_timeout
                ))
            })?
    }

    async fn dispatch<Req, Resp>(&self, route: &str, body: &Req) -> Result<Resp, VolmanError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(VolmanError::internal)?;
        let raw = match &self.endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(VolmanError::transport)?;
                self.send(stream, route, payload).await?
            }
            Endpoint::Unix(path) => {
                let stream = UnixStream::connect(path)
                    .await
                    .map_err(VolmanError::transport)?;
                self.send(stream, route, payload).await?
            }
        };
        serde_json::from_slice(&raw).map_err(VolmanError::transport)
    }

    /// One request/response exchange over an established stream.
    async fn send<S>(&self, stream: S, route: &str, payload: Vec<u8>) -> Result<Bytes, VolmanError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(VolmanError::transport)?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "driver connection closed with error");
            }
        });

        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri(route)
            .header(http::header::HOST, self.endpoint.host_header())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))
            .map_err(VolmanError::internal)?;

        let response = sender
            .send_request(request)
            .await
            .map_err(VolmanError::transport)?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(VolmanError::transport)?
            .to_bytes();

        if !status.is_success() {
            // Error statuses carry `{"Err": …}` when the driver produced
            // them; anything else is reported as a bare transport failure.
            if let Ok(err_resp) = serde_json::from_slice::<ErrorResponse>(&body) {
                if !err_resp.err.is_empty() {
                    return Err(VolmanError::Remote(err_resp.err));
                }
            }
            return Err(VolmanError::Transport(format!(
                "driver returned HTTP {status}"
            )));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Driver for HttpDriverClient {
    fn info(&self) -> InfoResponse {
        InfoResponse {
            name: self.name.clone(),
            path: self.address.clone(),
        }
    }

    async fn activate(&self) -> Result<ActivateResponse, VolmanError> {
        self.post(ACTIVATE_ROUTE, &serde_json::json!({})).await
    }

    async fn mount(&self, request: MountRequest) -> Result<MountResponse, VolmanError> {
        self.post(MOUNT_ROUTE, &request).await
    }

    async fn unmount(&self, request: UnmountRequest) -> Result<ErrorResponse, VolmanError> {
        self.post(UNMOUNT_ROUTE, &request).await
    }

    async fn create(&self, request: CreateRequest) -> Result<ErrorResponse, VolmanError> {
        self.post(CREATE_ROUTE, &request).await
    }

    async fn remove(&self, request: RemoveRequest) -> Result<ErrorResponse, VolmanError> {
        self.post(REMOVE_ROUTE, &request).await
    }
}

/// Production [`RemoteClientFactory`] building [`HttpDriverClient`] handles.
pub struct HttpRemoteClientFactory {
    request_timeout: Duration,
}

impl HttpRemoteClientFactory {
    /// Create a factory whose clients use `request_timeout` as their
    /// per-request deadline.
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for HttpRemoteClientFactory {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait::async_trait]
impl RemoteClientFactory for HttpRemoteClientFactory {
    async fn new_remote_client(
        &self,
        name: &str,
        address: &str,
    ) -> Result<Arc<dyn Driver>, VolmanError> {
        Ok(Arc::new(
            HttpDriverClient::new(name, address)?.with_timeout(self.request_timeout),
        ))
    }
}
