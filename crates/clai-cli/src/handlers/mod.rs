pub mod import;
pub mod query;
pub mod serve;
pub mod status;
pub mod suggest;

use std::path::PathBuf;

use anyhow::Result;
use clai_runtime::ClaiPaths;

use crate::rpc::RpcClient;

/// Shared per-invocation context: resolved layout plus the socket to talk
/// to.
pub struct CliContext {
    pub paths: ClaiPaths,
}

impl CliContext {
    pub fn resolve(home: Option<&str>) -> Result<Self> {
        let paths = ClaiPaths::resolve(home)?;
        Ok(Self { paths })
    }

    pub fn socket_path(&self, explicit: Option<&str>) -> PathBuf {
        match explicit {
            Some(path) => PathBuf::from(path),
            None => self.paths.socket_file(),
        }
    }

    pub fn client(&self) -> RpcClient {
        RpcClient::new(self.socket_path(None))
    }
}
