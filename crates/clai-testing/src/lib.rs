//! Test fixtures for daemon-level scenario tests: an isolated home, an
//! in-memory daemon, and helpers for scripting command traffic with
//! explicit timestamps.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tempfile::TempDir;

use clai_runtime::{ClaiDaemon, Config};
use clai_types::{ServiceResult, SuggestResponse};

pub struct TestWorld {
    temp: TempDir,
    daemon: ClaiDaemon,
    next_command: AtomicU64,
}

impl TestWorld {
    /// In-memory daemon with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let daemon = ClaiDaemon::open_in_memory(config).expect("start daemon");
        Self {
            temp,
            daemon,
            next_command: AtomicU64::new(0),
        }
    }

    pub fn daemon(&self) -> &ClaiDaemon {
        &self.daemon
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp.path()
    }

    /// A working directory inside the isolated home; created on first use.
    pub fn project_dir(&self, name: &str) -> PathBuf {
        let dir = self.temp.path().join(name);
        std::fs::create_dir_all(&dir).expect("create project dir");
        dir
    }

    pub fn start_session(&self, session_id: &str, cwd: &Path, started_ms: i64) {
        self.daemon
            .session_start(
                session_id,
                &cwd.to_string_lossy(),
                started_ms,
                Some("zsh".to_string()),
                None,
                None,
                false,
            )
            .expect("session_start");
    }

    /// Log a full command lifecycle (start + end) with an explicit
    /// timestamp and exit code.
    pub fn log_command(
        &self,
        session_id: &str,
        cwd: &Path,
        command: &str,
        exit_code: i32,
        ts_ms: i64,
    ) {
        let id = self.next_command.fetch_add(1, Ordering::Relaxed);
        let command_id = format!("cmd-{}", id);
        self.daemon
            .command_start(
                session_id,
                &command_id,
                &cwd.to_string_lossy(),
                command,
                ts_ms,
                None,
                None,
                false,
            )
            .expect("command_start");
        self.daemon
            .command_end(session_id, &command_id, exit_code, 25, ts_ms)
            .expect("command_end");
    }

    /// Wait for every submitted event to land in the store.
    pub fn flush(&self) {
        assert!(
            self.daemon.flush_ingest(Duration::from_secs(5)),
            "ingest flush timed out"
        );
    }

    pub fn suggest(
        &self,
        session_id: &str,
        cwd: &Path,
        prefix: &str,
    ) -> ServiceResult<SuggestResponse> {
        self.daemon.suggest(
            session_id,
            &cwd.to_string_lossy(),
            prefix,
            Some(10),
            None,
            None,
        )
    }

    /// Template id a raw command resolves to, for assertions on sources.
    pub fn template_id(command: &str) -> String {
        clai_normalize::Normalizer::default()
            .normalize(command)
            .template_id
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
