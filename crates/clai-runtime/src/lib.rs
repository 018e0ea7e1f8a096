// Internal modules (not exposed to external crates)
pub(crate) mod aliases;
pub(crate) mod git;
pub(crate) mod ingest;
pub(crate) mod project;
pub(crate) mod session;
pub(crate) mod storage;

mod config;
mod daemon;
mod error;
mod import;
mod paths;
mod suggest;

// Main facade and the types its API surfaces.
pub use config::{
    AggregateConfig, AliasConfig, Config, GitConfig, IngestConfig, RetentionConfig, SuggestConfig,
};
pub use daemon::{ClaiDaemon, HealthStatus};
pub use error::{to_service_error, Error, Result};
pub use import::{parse_bash_history, parse_fish_history, parse_zsh_history, ImportResult};
pub use paths::ClaiPaths;
pub use suggest::SuggestRequest;

/// Wall-clock epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
