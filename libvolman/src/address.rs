//! Driver address canonicalization.
//!
//! Plugin authors write spec files by hand in inconsistent styles: bare IPs,
//! `ip:port` pairs, explicit `tcp://` or `unix://` schemes, raw socket paths.
//! [`canonicalize`] turns all of them into one of the three transport
//! endpoint forms the remote client understands:
//!
//! * `http://host[:port]` — TCP
//! * `unix://path` — unix socket with explicit scheme
//! * a bare absolute path — raw unix socket
//!
//! Purely textual; no network I/O happens here.

use url::Url;

use crate::error::VolmanError;

/// Canonicalize a raw spec-file address.
///
/// Rules, in priority order:
///
/// 1. a `tcp://` URI is rewritten to `http://`, keeping host and port;
/// 2. a `unix://` URI is kept as-is;
/// 3. a bare IP address or `ip:port` pair is prefixed with `http://`;
/// 4. a bare absolute filesystem path is kept as-is (raw unix socket);
/// 5. any other parseable URI is kept as-is; unparseable input is a
///    [`VolmanError::MalformedAddress`].
///
/// Canonicalization is idempotent: an already-canonical address is returned
/// unchanged.
pub fn canonicalize(raw: &str) -> Result<String, VolmanError> {
    match Url::parse(raw) {
        Ok(url) if url.scheme() == "tcp" => {
            let host = url.host_str().ok_or_else(|| VolmanError::MalformedAddress {
                address: raw.to_owned(),
                cause: "tcp address has no host".to_owned(),
            })?;
            Ok(match url.port() {
                Some(port) => format!("http://{host}:{port}"),
                None => format!("http://{host}"),
            })
        }
        Ok(_) => Ok(raw.to_owned()),
        Err(parse_err) => {
            // Bare IPs and ip:port pairs are not URIs, but are common in
            // hand-written spec files.
            if raw.parse::<std::net::IpAddr>().is_ok()
                || raw.parse::<std::net::SocketAddr>().is_ok()
            {
                return Ok(format!("http://{raw}"));
            }
            if raw.starts_with('/') {
                return Ok(raw.to_owned());
            }
            Err(VolmanError::MalformedAddress {
                address: raw.to_owned(),
                cause: parse_err.to_string(),
            })
        }
    }
}
