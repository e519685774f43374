// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The transport seam between the IPP codec and HTTP.
//
// Requests are built and parsed with the `ipp` crate; moving the bytes is
// the embedder's business, represented by the `IppTransport` trait.  The
// production implementation posts `application/ipp` bodies with reqwest.
// Tests substitute a scripted transport.

use std::io::Cursor;

use async_trait::async_trait;
use ipp::parser::IppParser;
use ipp::prelude::*;
use ipp::reader::IppReader;
use thiserror::Error;
use tracing::debug;

/// Basic-auth credentials attached to IPP requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppCredentials {
    pub username: String,
    pub password: String,
}

/// The fixed fallback pair installed when a printer answers HTTP 401 and the
/// caller supplied no credentials.  Mirrors the CUPS client convention the
/// fleet's printers already accept.
pub fn default_credentials() -> IppCredentials {
    IppCredentials {
        username: "papercut-ipp-client".into(),
        password: "papercut".into(),
    }
}

/// Failure moving an IPP request/response over the wire.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP layer answered with a non-2xx status.
    #[error("http status {0}")]
    HttpStatus(u16),
    /// The response body could not be parsed as IPP.
    #[error("malformed ipp response: {0}")]
    Malformed(String),
    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(Box<dyn std::error::Error + Send + Sync>),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// The HTTP status code, when the failure was an HTTP error response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }

    /// Whether the failure is worth an automatic retry.
    ///
    /// IPP clients must be prepared for the printer to drop the connection
    /// mid-exchange (RFC 8011 section 4.1.2), so connection resets and
    /// aborts are temporary, as are plain timeouts reported by the HTTP
    /// client.
    pub fn is_temporary(&self) -> bool {
        match self {
            Self::Io(err) => is_temporary_io_kind(err.kind()),
            Self::Network(err) => {
                if let Some(kind) = io_kind_in_chain(err.as_ref()) {
                    if is_temporary_io_kind(kind) {
                        return true;
                    }
                }
                err.downcast_ref::<reqwest::Error>()
                    .is_some_and(|e| e.is_timeout() || e.is_connect())
            }
            Self::HttpStatus(_) | Self::Malformed(_) => false,
        }
    }
}

fn is_temporary_io_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::TimedOut
    )
}

/// Walk an error's source chain looking for an `io::Error`.
fn io_kind_in_chain(err: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        current = e.source();
    }
    None
}

/// Whether a non-OK IPP status is worth retrying: informational statuses
/// below client-error-bad-request, and the server-error block.
pub fn recoverable_status(status: StatusCode) -> bool {
    let code = status as u16;
    code < 0x0400 || code >= 0x0500
}

/// Moves one IPP request to the printer and returns the parsed response.
///
/// Implementations must be safe for concurrent calls: the uploader and the
/// job monitor issue overlapping requests over the same transport.
#[async_trait]
pub trait IppTransport: Send + Sync {
    async fn send(
        &self,
        uri: &Uri,
        request: IppRequestResponse,
        credentials: Option<&IppCredentials>,
    ) -> Result<IppRequestResponse, TransportError>;
}

/// Production transport: IPP over HTTP POST via a shared reqwest client.
pub struct HttpIppTransport {
    client: reqwest::Client,
}

impl HttpIppTransport {
    /// Wrap an HTTP client configured by the embedder (timeouts, TLS
    /// settings, proxies).
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IppTransport for HttpIppTransport {
    async fn send(
        &self,
        uri: &Uri,
        request: IppRequestResponse,
        credentials: Option<&IppCredentials>,
    ) -> Result<IppRequestResponse, TransportError> {
        let url = http_url(uri);
        debug!(%url, "posting ipp request");

        // Serialising drains the request payload, which may sit on a
        // blocking reader (spool file or stdin tee).
        let body = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut reader = request.into_read();
            let mut buf = Vec::new();
            std::io::Read::read_to_end(&mut reader, &mut buf)?;
            Ok(buf)
        })
        .await
        .map_err(|e| TransportError::Network(Box::new(e)))??;

        let mut http_request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/ipp")
            .body(body);
        if let Some(creds) = credentials {
            http_request = http_request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))?;

        IppParser::new(IppReader::new(Cursor::new(data)))
            .parse()
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

/// Rewrite an ipp/ipps URI as the http/https URL the request is posted to.
/// IPP's default port is 631 for both schemes.
fn http_url(uri: &Uri) -> String {
    let scheme = match uri.scheme_str() {
        Some("ipps") | Some("https") => "https",
        _ => "http",
    };
    let host = uri.host().unwrap_or_default();
    let port = uri.port_u16().unwrap_or(631);
    let path = uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    format!("{scheme}://{host}:{port}{path}")
}
