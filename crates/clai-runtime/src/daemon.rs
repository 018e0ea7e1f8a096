use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use clai_normalize::{NormalizeOptions, Normalizer};
use clai_types::{
    CommandEvent, FeedbackAction, QueryFilter, ServiceError, ServiceResult, Session,
    SuggestResponse,
};

use crate::config::Config;
use crate::git::GitContext;
use crate::import::{HistoryImporter, ImportResult};
use crate::ingest::{IngestEvent, IngestPipeline};
use crate::paths::ClaiPaths;
use crate::session::SessionRegistry;
use crate::storage::StoreHandle;
use crate::suggest::{SuggestRequest, SuggestService};
use crate::{now_ms, to_service_error};

/// Health endpoint payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub degraded: bool,
    pub ring_depth: usize,
    pub live_sessions: usize,
    pub event_count: i64,
    pub schema_version: i64,
    pub ingested: u64,
    pub dropped: u64,
    pub duplicates: u64,
}

/// The daemon facade: owns the store handle, the ingest pipeline, and the
/// suggest service. Process-wide state stops here; everything else is
/// request- or session-scoped. Teardown order is ingest first, store last.
pub struct ClaiDaemon {
    store: Arc<StoreHandle>,
    registry: Arc<SessionRegistry>,
    ingest: IngestPipeline,
    suggest: SuggestService,
    importer_tuning: clai_store::AggregateTuning,
    normalizer: Normalizer,
}

impl ClaiDaemon {
    /// Open against the on-disk layout.
    pub fn open(paths: &ClaiPaths, config: Config) -> ServiceResult<Self> {
        paths.ensure_dirs().map_err(to_service_error)?;
        let store = StoreHandle::open(
            &paths.db_file(),
            config.ingest.busy_timeout_ms,
            config.suggest.reader_pool_size,
        )
        .map_err(to_service_error)?;
        Self::build(store, config)
    }

    /// In-memory store, for tests and ephemeral runs.
    pub fn open_in_memory(config: Config) -> ServiceResult<Self> {
        let store = StoreHandle::open_in_memory().map_err(to_service_error)?;
        Self::build(store, config)
    }

    fn build(store: Arc<StoreHandle>, config: Config) -> ServiceResult<Self> {
        let registry = Arc::new(SessionRegistry::new());
        let git = Arc::new(GitContext::new(&config.git));

        let aliases = match (&config.aliases.shell, config.aliases.expand) {
            (Some(shell), true) => {
                crate::aliases::capture_shell_aliases(shell, Duration::from_secs(5))
            }
            _ => clai_normalize::AliasMap::default(),
        };
        let normalizer = Normalizer::new(NormalizeOptions {
            expand_aliases: config.aliases.expand,
            aliases,
        });

        let ingest = IngestPipeline::start(
            store.clone(),
            registry.clone(),
            git.clone(),
            normalizer.clone(),
            config.ingest.clone(),
            &config.aggregates,
            config.retention.clone(),
        )
        .map_err(|err| ServiceError::Internal(err.to_string()))?;

        let suggest = SuggestService::new(
            store.clone(),
            registry.clone(),
            git.clone(),
            normalizer.clone(),
            config.weights.clone(),
            config.learning,
            config.suggest.clone(),
            config.aggregates.tuning().half_life_ms,
            config.excluded_repos.clone(),
            config.suggestions_enabled(),
        );

        info!("daemon runtime started");
        Ok(Self {
            store,
            registry,
            ingest,
            suggest,
            importer_tuning: config.aggregates.tuning(),
            normalizer,
        })
    }

    // --- lifecycle ops (fire-and-forget past validation) ---------------

    #[allow(clippy::too_many_arguments)]
    pub fn session_start(
        &self,
        session_id: &str,
        cwd: &str,
        started_ms: i64,
        shell: Option<String>,
        host: Option<String>,
        user: Option<String>,
        incognito: bool,
    ) -> ServiceResult<()> {
        require("session_id", session_id)?;
        require("cwd", cwd)?;
        self.ingest.submit(IngestEvent::SessionStart {
            session: Session {
                id: session_id.to_string(),
                shell,
                host,
                user,
                started_ms,
                ended_ms: None,
                project_types: Vec::new(),
            },
            cwd: cwd.to_string(),
            incognito,
        });
        Ok(())
    }

    pub fn session_end(&self, session_id: &str, ended_ms: Option<i64>) -> ServiceResult<()> {
        require("session_id", session_id)?;
        self.ingest.submit(IngestEvent::SessionEnd {
            session_id: session_id.to_string(),
            ended_ms: ended_ms.unwrap_or_else(now_ms),
        });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn command_start(
        &self,
        session_id: &str,
        command_id: &str,
        cwd: &str,
        command: &str,
        ts_ms: i64,
        repo_key: Option<String>,
        branch: Option<String>,
        ephemeral: bool,
    ) -> ServiceResult<()> {
        require("session_id", session_id)?;
        require("command_id", command_id)?;
        require("command", command)?;
        if clai_core::recording_disabled() {
            return Ok(());
        }
        self.ingest.submit(IngestEvent::CommandStart {
            session_id: session_id.to_string(),
            command_id: command_id.to_string(),
            cwd: cwd.to_string(),
            command: command.to_string(),
            ts_ms,
            repo_key,
            branch,
            ephemeral: ephemeral || clai_core::ephemeral_requested(),
        });
        Ok(())
    }

    pub fn command_end(
        &self,
        session_id: &str,
        command_id: &str,
        exit_code: i32,
        duration_ms: i64,
        ts_ms: i64,
    ) -> ServiceResult<()> {
        require("session_id", session_id)?;
        require("command_id", command_id)?;
        if clai_core::recording_disabled() {
            return Ok(());
        }
        self.ingest.submit(IngestEvent::CommandEnd {
            session_id: session_id.to_string(),
            command_id: command_id.to_string(),
            exit_code,
            duration_ms,
            ts_ms,
        });
        Ok(())
    }

    // --- read ops -------------------------------------------------------

    pub fn suggest(
        &self,
        session_id: &str,
        cwd: &str,
        buffer: &str,
        max_results: Option<usize>,
        last_template_id: Option<String>,
        timeout_ms: Option<u64>,
    ) -> ServiceResult<SuggestResponse> {
        let request = SuggestRequest {
            session_id: session_id.to_string(),
            cwd: cwd.to_string(),
            prefix: buffer.to_string(),
            top_k: max_results.unwrap_or(clai_types::DEFAULT_TOP_K),
            last_template_id,
            timeout_ms,
        };
        self.suggest.suggest(&request, now_ms())
    }

    pub fn query_commands(&self, mut filter: QueryFilter) -> ServiceResult<Vec<CommandEvent>> {
        if filter.limit == 0 {
            filter.limit = 50;
        }
        if let Some(prefix) = filter.session_id.clone() {
            let resolved = self
                .store
                .read(|store| store.resolve_session_prefix(&prefix))
                .map_err(|err| to_service_error(err.into()))?;
            match resolved {
                Some(id) => filter.session_id = Some(id),
                None => {
                    return Err(ServiceError::NotFound(format!(
                        "no session matches '{}'",
                        prefix
                    )))
                }
            }
        }
        self.store
            .read(|store| store.query_commands(&filter))
            .map_err(|err| to_service_error(err.into()))
    }

    pub fn import_history(
        &self,
        shell: &str,
        path: Option<&str>,
        skip_if_imported: bool,
        force: bool,
    ) -> ServiceResult<ImportResult> {
        require("shell", shell)?;
        let importer = HistoryImporter {
            store: &self.store,
            normalizer: &self.normalizer,
            tuning: self.importer_tuning,
        };
        importer.import(shell, path, skip_if_imported, force, now_ms())
    }

    pub fn feedback(
        &self,
        session_id: &str,
        suggestion_text: &str,
        action: FeedbackAction,
    ) -> ServiceResult<()> {
        self.suggest
            .feedback(session_id, suggestion_text, action, now_ms())
    }

    pub fn health(&self) -> HealthStatus {
        let stats = self.ingest.stats().snapshot();
        let (event_count, schema_version) = self
            .store
            .read(|store| {
                let events = store.event_count().unwrap_or(-1);
                let version = store.schema_version().unwrap_or(-1);
                (events, version)
            });
        HealthStatus {
            degraded: stats.degraded,
            ring_depth: stats.ring_depth,
            live_sessions: self.registry.live_count(),
            event_count,
            schema_version,
            ingested: stats.ingested,
            dropped: stats.dropped + stats.dropped_ephemeral,
            duplicates: stats.duplicates,
        }
    }

    /// Barrier: wait for every submitted event to be handled. Tests and
    /// shutdown use this; the hot path never does.
    pub fn flush_ingest(&self, timeout: Duration) -> bool {
        self.ingest.flush(timeout)
    }

    /// Drain and stop. The store handle drops last, after the writer
    /// thread has exited.
    pub fn shutdown(&self, grace: Duration) {
        self.ingest.shutdown(grace);
        info!("daemon runtime stopped");
    }
}

fn require(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidArgument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
