//! HTTP transport: POST the DER-encoded request to the configured path,
//! `Content-Type: application/pkixcmp`, and read back a DER-encoded reply.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, StatusCode};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::error::{CmpError, Result, TransportError};
use crate::traits::Transport;

const CONTENT_TYPE: &str = "application/pkixcmp";

/// HTTP POST transport, optionally through a plain (non-TLS) proxy.
/// TLS-through-proxy is rejected at construction, per the external
/// interfaces contract. The underlying connector handles both `http` and
/// `https` URLs, performing the TLS handshake against the platform's
/// native root store whenever the target URL uses `https`.
pub struct HttpTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    url: String,
}

impl HttpTransport {
    /// Build a transport targeting `scheme://host:port/path`. `proxy`, when
    /// set, must not be combined with `tls` — the caller is expected to have
    /// already enforced that via [`crate::config::Config::validate`].
    pub fn new(host: &str, port: u16, path: &str, tls: bool, proxy: Option<&str>) -> Result<Self> {
        if tls && proxy.is_some() {
            return Err(CmpError::Transport(TransportError::TlsViaProxyUnsupported));
        }

        let scheme = if tls { "https" } else { "http" };
        let url = format!("{scheme}://{host}:{port}{path}");

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| CmpError::Transport(TransportError::Connect(e.to_string())))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_receive(&self, req_bytes: &[u8], timeout_secs: Option<u64>) -> Result<Vec<u8>> {
        let request = Request::post(&self.url)
            .header("Content-Type", CONTENT_TYPE)
            .body(Full::new(Bytes::copy_from_slice(req_bytes)))
            .map_err(|e| CmpError::Transport(TransportError::Connect(e.to_string())))?;

        debug!(url = %self.url, len = req_bytes.len(), "sending CMP request");

        let call = self.client.request(request);
        let response = match timeout_secs {
            Some(0) | None => call
                .await
                .map_err(|e| CmpError::Transport(TransportError::Connect(e.to_string())))?,
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
                .await
                .map_err(|_| CmpError::Transport(TransportError::Timeout))?
                .map_err(|e| CmpError::Transport(TransportError::Connect(e.to_string())))?,
        };

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), "unexpected HTTP status from CA");
            return Err(CmpError::Transport(TransportError::HttpStatus(
                response.status().as_u16(),
            )));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|_| CmpError::Transport(TransportError::Truncated))?
            .to_bytes();

        Ok(body.to_vec())
    }
}
