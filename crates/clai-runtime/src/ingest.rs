use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use clai_normalize::Normalizer;
use clai_store::{ApplyOutcome, EventApply, NewCommandEvent};
use clai_types::{Scope, Session};

use crate::config::{AggregateConfig, IngestConfig, RetentionConfig};
use crate::git::{invalidates_git_cache, GitContext};
use crate::project::detect_project_types;
use crate::session::{PendingCommand, SessionRegistry};
use crate::storage::StoreHandle;

/// Lifecycle events accepted by the ingest queue. Hooks fire these and
/// never see errors back; everything past the enqueue is the writer's
/// problem.
#[derive(Debug)]
pub enum IngestEvent {
    SessionStart {
        session: Session,
        cwd: String,
        incognito: bool,
    },
    SessionEnd {
        session_id: String,
        ended_ms: i64,
    },
    CommandStart {
        session_id: String,
        command_id: String,
        cwd: String,
        command: String,
        ts_ms: i64,
        repo_key: Option<String>,
        branch: Option<String>,
        ephemeral: bool,
    },
    CommandEnd {
        session_id: String,
        command_id: String,
        exit_code: i32,
        duration_ms: i64,
        ts_ms: i64,
    },
    /// Barrier: acked once every event enqueued before it is handled.
    Flush(SyncSender<()>),
}

impl IngestEvent {
    fn is_ephemeral_command(&self) -> bool {
        matches!(
            self,
            IngestEvent::CommandStart {
                ephemeral: true,
                ..
            }
        )
    }
}

/// Ingest pipeline counters, exposed through the health endpoint.
#[derive(Default)]
pub struct IngestStats {
    pub enqueued: AtomicU64,
    pub ingested: AtomicU64,
    pub duplicates: AtomicU64,
    pub dropped: AtomicU64,
    pub dropped_ephemeral: AtomicU64,
    pub unmatched: AtomicU64,
    pub errors: AtomicU64,
    pub ring_depth: AtomicUsize,
    pub degraded: AtomicBool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestStatsSnapshot {
    pub enqueued: u64,
    pub ingested: u64,
    pub duplicates: u64,
    pub dropped: u64,
    pub dropped_ephemeral: u64,
    pub unmatched: u64,
    pub errors: u64,
    pub ring_depth: usize,
    pub degraded: bool,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            ingested: self.ingested.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dropped_ephemeral: self.dropped_ephemeral.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            ring_depth: self.ring_depth.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

struct QueueInner {
    items: VecDeque<IngestEvent>,
    closed: bool,
}

/// Bounded FIFO with the overflow policy from the ingest contract: block
/// briefly for space, then drop the oldest ephemeral event, then the
/// oldest event outright.
struct EventQueue {
    inner: Mutex<QueueInner>,
    space: Condvar,
    ready: Condvar,
    capacity: usize,
    enqueue_timeout: Duration,
}

impl EventQueue {
    fn new(capacity: usize, enqueue_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
            }),
            space: Condvar::new(),
            ready: Condvar::new(),
            capacity,
            enqueue_timeout,
        }
    }

    /// Returns true if an existing event had to be dropped to make room.
    fn push(&self, event: IngestEvent, stats: &IngestStats) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return false;
        }

        // Flush barriers bypass capacity; they must never be shed.
        let is_barrier = matches!(event, IngestEvent::Flush(_));
        if !is_barrier {
            let deadline = Instant::now() + self.enqueue_timeout;
            while inner.items.len() >= self.capacity && !inner.closed {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _timeout) = self.space.wait_timeout(inner, deadline - now).unwrap();
                inner = guard;
            }
        }

        let mut dropped = false;
        if !is_barrier && inner.items.len() >= self.capacity {
            let ephemeral_at = inner.items.iter().position(|e| e.is_ephemeral_command());
            match ephemeral_at {
                Some(index) => {
                    inner.items.remove(index);
                    stats.dropped_ephemeral.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    inner.items.pop_front();
                    stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            dropped = true;
        }

        inner.items.push_back(event);
        self.ready.notify_one();
        dropped
    }

    /// FIFO pop; None on tick timeout, or once closed and drained.
    fn pop(&self, tick: Duration) -> Option<IngestEvent> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(event) = inner.items.pop_front() {
                self.space.notify_one();
                return Some(event);
            }
            if inner.closed {
                return None;
            }
            let (guard, timeout) = self.ready.wait_timeout(inner, tick).unwrap();
            inner = guard;
            if timeout.timed_out() && inner.items.is_empty() {
                return None;
            }
        }
    }

    fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.ready.notify_all();
        self.space.notify_all();
    }

    fn is_drained(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.closed && inner.items.is_empty()
    }
}

pub struct IngestPipeline {
    queue: Arc<EventQueue>,
    stats: Arc<IngestStats>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Worker {
    queue: Arc<EventQueue>,
    stats: Arc<IngestStats>,
    store: Arc<StoreHandle>,
    registry: Arc<SessionRegistry>,
    git: Arc<GitContext>,
    normalizer: Normalizer,
    tuning: clai_store::AggregateTuning,
    ingest_config: IngestConfig,
    retention: RetentionConfig,

    // Burst shaping state.
    recent: VecDeque<Instant>,
    bursting: bool,
    last_event_at: Instant,

    // Degraded mode: applies that could not reach the store.
    ring: VecDeque<EventApply>,

    last_prune: Instant,
}

impl IngestPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        store: Arc<StoreHandle>,
        registry: Arc<SessionRegistry>,
        git: Arc<GitContext>,
        normalizer: Normalizer,
        ingest_config: IngestConfig,
        aggregates: &AggregateConfig,
        retention: RetentionConfig,
    ) -> std::io::Result<Self> {
        let queue = Arc::new(EventQueue::new(
            ingest_config.queue_capacity,
            Duration::from_millis(ingest_config.enqueue_timeout_ms),
        ));
        let stats = Arc::new(IngestStats::default());

        let mut worker = Worker {
            queue: queue.clone(),
            stats: stats.clone(),
            store,
            registry,
            git,
            normalizer,
            tuning: aggregates.tuning(),
            ingest_config,
            retention,
            recent: VecDeque::new(),
            bursting: false,
            last_event_at: Instant::now(),
            ring: VecDeque::new(),
            last_prune: Instant::now(),
        };

        let handle = std::thread::Builder::new()
            .name("clai-ingest-writer".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            queue,
            stats,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Fire-and-forget submit. Never blocks past the enqueue timeout and
    /// never reports per-event failure to the caller.
    pub fn submit(&self, event: IngestEvent) {
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        self.queue.push(event, &self.stats);
    }

    /// Block until everything enqueued before this call is handled.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        self.queue.push(IngestEvent::Flush(tx), &self.stats);
        rx.recv_timeout(timeout).is_ok()
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Drain with a bounded grace period, then stop the writer.
    pub fn shutdown(&self, grace: Duration) {
        let deadline = Instant::now() + grace;
        self.queue.close();
        while !self.queue.is_drained() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Worker {
    fn run(&mut self) {
        let tick = Duration::from_millis(200);
        loop {
            match self.queue.pop(tick) {
                Some(event) => self.handle(event),
                None => {
                    if self.queue.is_drained() {
                        break;
                    }
                    self.on_tick();
                }
            }
        }
        // Final drain attempt of the degraded ring before the store closes.
        self.drain_ring();
    }

    fn on_tick(&mut self) {
        if self.bursting
            && self.last_event_at.elapsed()
                >= Duration::from_millis(self.ingest_config.quiet_period_ms)
        {
            debug!("burst over; resuming decay-bearing score updates");
            self.bursting = false;
        }
        self.drain_ring();
        self.maybe_prune();
    }

    fn note_event(&mut self) {
        let now = Instant::now();
        let window = Duration::from_millis(self.ingest_config.burst_window_ms);
        self.recent.push_back(now);
        while let Some(front) = self.recent.front() {
            if now.duration_since(*front) > window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        if !self.bursting && self.recent.len() >= self.ingest_config.burst_threshold {
            debug!("ingest burst detected; deferring decay recomputation");
            self.bursting = true;
        }
        self.last_event_at = now;
    }

    fn handle(&mut self, event: IngestEvent) {
        match event {
            IngestEvent::SessionStart {
                mut session,
                cwd,
                incognito,
            } => {
                session.project_types = detect_project_types(Path::new(&cwd));
                self.registry.start(session.clone(), incognito);
                if !incognito {
                    let result = self.store.write(|store| store.upsert_session(&session));
                    self.count_store_result(result);
                }
            }
            IngestEvent::SessionEnd {
                session_id,
                ended_ms,
            } => {
                self.registry.end(&session_id);
                let result = self
                    .store
                    .write(|store| store.end_session(&session_id, ended_ms).map(|_| ()));
                self.count_store_result(result);
            }
            IngestEvent::CommandStart {
                session_id,
                command_id,
                cwd,
                command,
                ts_ms,
                repo_key,
                branch,
                ephemeral,
            } => {
                self.note_event();
                if invalidates_git_cache(&command) {
                    self.git.invalidate(Path::new(&cwd));
                }
                if self.registry.is_incognito(&session_id) {
                    return;
                }
                self.registry.with_state(&session_id, |state| {
                    state.push_pending(PendingCommand {
                        command_id,
                        cwd,
                        cmd_raw: command,
                        ts_ms,
                        repo_key,
                        branch,
                        ephemeral,
                    });
                });
            }
            IngestEvent::CommandEnd {
                session_id,
                command_id,
                exit_code,
                duration_ms,
                ts_ms,
            } => {
                self.note_event();
                self.finalize_command(&session_id, &command_id, exit_code, duration_ms, ts_ms);
            }
            IngestEvent::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    fn finalize_command(
        &mut self,
        session_id: &str,
        command_id: &str,
        exit_code: i32,
        duration_ms: i64,
        ts_ms: i64,
    ) {
        if self.registry.is_incognito(session_id) {
            return;
        }

        let Some(pending) = self
            .registry
            .with_state(session_id, |state| state.take_pending(command_id))
        else {
            // End without a matching start; nothing to reconstruct.
            self.stats.unmatched.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let normalized = self.normalizer.normalize(&pending.cmd_raw);
        if normalized.cmd_norm.is_empty() {
            return;
        }

        let cwd_path = PathBuf::from(&pending.cwd);
        let canonical_cwd = clai_core::normalize_path(&cwd_path);

        let (repo_key, branch) = if pending.repo_key.is_some() {
            (pending.repo_key.clone(), pending.branch.clone())
        } else {
            let info = self.git.lookup(&cwd_path);
            (repo_key_of(&info), info.branch)
        };

        let prev_template_id = self
            .registry
            .with_state(session_id, |state| state.last_template_id.clone());

        if pending.ephemeral {
            // Ephemeral events shape in-memory session context only.
            self.registry.with_state(session_id, |state| {
                if let Some(prev) = &prev_template_id {
                    state.record_ephemeral_transition(prev, &normalized.template_id);
                }
                state.last_template_id = Some(normalized.template_id.clone());
                state.last_event_ms = ts_ms;
            });
            self.stats.ingested.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut scopes = vec![
            Scope::Global.key(),
            Scope::Session(session_id.to_string()).key(),
        ];
        if let Some(key) = &repo_key {
            scopes.push(Scope::Repo(key.clone()).key());
        }
        scopes.push(Scope::Dir(canonical_cwd.to_string_lossy().into_owned()).key());
        for kind in detect_project_types(&cwd_path) {
            scopes.push(Scope::ProjectType(kind).key());
        }

        let apply = EventApply {
            event: NewCommandEvent {
                session_id: session_id.to_string(),
                command_id: command_id.to_string(),
                ts_ms,
                cwd: canonical_cwd.to_string_lossy().into_owned(),
                repo_key,
                branch,
                cmd_raw: normalized.cmd_raw.clone(),
                cmd_norm: normalized.cmd_norm.clone(),
                cmd_truncated: normalized.cmd_truncated,
                template_id: normalized.template_id.clone(),
                exit_code: Some(exit_code),
                duration_ms: Some(duration_ms),
            },
            slots: normalized.slots.clone(),
            prev_template_id,
            scopes,
            tuning: self.tuning,
            defer_decay: self.bursting,
        };

        match self.apply_or_ring(apply) {
            Applied::Fresh => {
                self.registry.with_state(session_id, |state| {
                    state.last_template_id = Some(normalized.template_id.clone());
                    state.last_event_ms = ts_ms;
                });
                self.stats.ingested.fetch_add(1, Ordering::Relaxed);
            }
            Applied::Duplicate => {
                self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            }
            Applied::Ringed => {
                // Session context still advances so transitions stay
                // coherent once the ring drains.
                self.registry.with_state(session_id, |state| {
                    state.last_template_id = Some(normalized.template_id.clone());
                    state.last_event_ms = ts_ms;
                });
            }
        }
    }

    fn apply_or_ring(&mut self, apply: EventApply) -> Applied {
        match self.store.write(|store| store.apply_command_end(&apply)) {
            Ok(ApplyOutcome::Applied(_)) => Applied::Fresh,
            Ok(ApplyOutcome::Duplicate) => Applied::Duplicate,
            Err(err) => {
                warn!(error = %err, "store write failed; ringing event");
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                self.stats.degraded.store(true, Ordering::Relaxed);
                if self.ring.len() >= self.ingest_config.ring_capacity {
                    self.ring.pop_front();
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
                self.ring.push_back(apply);
                self.stats
                    .ring_depth
                    .store(self.ring.len(), Ordering::Relaxed);
                Applied::Ringed
            }
        }
    }

    /// Replay ringed events after store recovery, oldest first. Stops at
    /// the first failure and tries again next tick.
    fn drain_ring(&mut self) {
        while let Some(apply) = self.ring.front() {
            match self.store.write(|store| store.apply_command_end(apply)) {
                Ok(_) => {
                    self.ring.pop_front();
                    self.stats.ingested.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => break,
            }
        }
        self.stats
            .ring_depth
            .store(self.ring.len(), Ordering::Relaxed);
        if self.ring.is_empty() {
            self.stats.degraded.store(false, Ordering::Relaxed);
        }
    }

    fn maybe_prune(&mut self) {
        if self.last_prune.elapsed() < Duration::from_secs(600) {
            return;
        }
        self.last_prune = Instant::now();
        let cutoff = crate::now_ms() - self.retention.max_age_days as i64 * 86_400_000;
        let max_events = self.retention.max_events;
        match self
            .store
            .write(|store| store.prune_events(cutoff, max_events))
        {
            Ok(removed) if removed > 0 => debug!(removed, "pruned old command events"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "prune failed"),
        }
    }

    fn count_store_result<T>(&self, result: clai_store::Result<T>) {
        if let Err(err) = result {
            warn!(error = %err, "store write failed");
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

enum Applied {
    Fresh,
    Duplicate,
    Ringed,
}

fn repo_key_of(info: &crate::git::RepoInfo) -> Option<String> {
    if info.is_repo { info.repo_key.clone() } else { None }
}
