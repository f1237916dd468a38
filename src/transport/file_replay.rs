//! File-based replay transport: writes each outbound request to a file and
//! reads the response from another, strictly for offline debugging of a
//! captured exchange.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::error::{CmpError, Result, TransportError};
use crate::traits::Transport;

/// Writes requests to `request_path` and reads responses from
/// `response_path`. Intended for replaying a previously captured exchange
/// against a hand-edited response file, not for production use.
pub struct FileReplayTransport {
    request_path: PathBuf,
    response_path: PathBuf,
}

impl FileReplayTransport {
    /// Build a transport that writes requests to `request_path` and reads
    /// responses from `response_path`.
    pub fn new(request_path: impl Into<PathBuf>, response_path: impl Into<PathBuf>) -> Self {
        Self {
            request_path: request_path.into(),
            response_path: response_path.into(),
        }
    }
}

#[async_trait]
impl Transport for FileReplayTransport {
    async fn send_receive(&self, req_bytes: &[u8], _timeout_secs: Option<u64>) -> Result<Vec<u8>> {
        fs::write(&self.request_path, req_bytes)
            .await
            .map_err(|e| CmpError::Transport(TransportError::FileReplay(e.to_string())))?;

        fs::read(&self.response_path)
            .await
            .map_err(|e| CmpError::Transport(TransportError::FileReplay(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let req_path = dir.path().join("request.der");
        let resp_path = dir.path().join("response.der");
        tokio::fs::write(&resp_path, b"canned response").await.unwrap();

        let transport = FileReplayTransport::new(&req_path, &resp_path);
        let reply = transport.send_receive(b"request bytes", None).await.unwrap();

        assert_eq!(reply, b"canned response");
        let written = tokio::fs::read(&req_path).await.unwrap();
        assert_eq!(written, b"request bytes");
    }
}
