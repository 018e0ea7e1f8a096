use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;

use clai_types::{RpcRequest, ServiceError, WireResponse};

/// One-shot synchronous client for the daemon socket, used by the CLI
/// subcommands (and by hooks when the streaming shim write fails).
pub struct RpcClient {
    socket: PathBuf,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    pub fn call(&self, request: &RpcRequest) -> Result<WireResponse> {
        let mut stream = UnixStream::connect(&self.socket).with_context(|| {
            format!(
                "cannot reach the clai daemon at {} (is `clai serve` running?)",
                self.socket.display()
            )
        })?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut payload = serde_json::to_string(request)?;
        payload.push('\n');
        stream.write_all(payload.as_bytes())?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line.trim().is_empty() {
            bail!("daemon closed the connection without a reply");
        }
        Ok(serde_json::from_str(line.trim())?)
    }

    /// Call and decode the `data` payload, converting wire errors into
    /// their service error kinds.
    pub fn call_expect<T: DeserializeOwned>(&self, request: &RpcRequest) -> Result<T> {
        let response = self.call(request)?;
        if !response.ok {
            let err: ServiceError = response
                .error
                .map(Into::into)
                .unwrap_or_else(|| ServiceError::Internal("missing error body".to_string()));
            bail!("{}", err);
        }
        let data = response.data.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(data)?)
    }
}
