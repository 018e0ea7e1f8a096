use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use clai_engine::{
    effective_score, rank, recency_factor, CandidateInput, Feature, FeatureVector, LearningConfig,
    RankParams, RankWeights,
};
use clai_normalize::Normalizer;
use clai_types::stats::smoothed_success_ratio;
use clai_types::{
    FeedbackAction, Scope, ServiceError, ServiceResult, SuggestResponse, Suggestion, MAX_TOP_K,
};

use crate::config::SuggestConfig;
use crate::git::GitContext;
use crate::project::{detect_project_types, discover_tasks};
use crate::session::SessionRegistry;
use crate::storage::StoreHandle;

/// Validated suggest call, post-clamp.
#[derive(Debug, Clone)]
pub struct SuggestRequest {
    pub session_id: String,
    pub cwd: String,
    pub prefix: String,
    pub top_k: usize,
    pub last_template_id: Option<String>,
    /// Client budget; the effective deadline is the smaller of this and the
    /// configured one.
    pub timeout_ms: Option<u64>,
}

struct CacheEntry {
    response: SuggestResponse,
    created: Instant,
    last_access: Instant,
    bytes: usize,
}

#[derive(Default)]
struct SuggestCache {
    entries: HashMap<u64, CacheEntry>,
    total_bytes: usize,
}

impl SuggestCache {
    fn get(&mut self, fingerprint: u64, ttl: Duration) -> Option<SuggestResponse> {
        let entry = self.entries.get_mut(&fingerprint)?;
        if entry.created.elapsed() > ttl {
            return None;
        }
        entry.last_access = Instant::now();
        Some(entry.response.clone())
    }

    /// Stale entries are still served in degraded mode.
    fn get_stale(&mut self, fingerprint: u64) -> Option<SuggestResponse> {
        let entry = self.entries.get_mut(&fingerprint)?;
        entry.last_access = Instant::now();
        Some(entry.response.clone())
    }

    fn insert(&mut self, fingerprint: u64, response: SuggestResponse, max_bytes: usize) {
        let bytes = estimate_bytes(&response);
        if let Some(old) = self.entries.remove(&fingerprint) {
            self.total_bytes -= old.bytes;
        }
        self.total_bytes += bytes;
        self.entries.insert(
            fingerprint,
            CacheEntry {
                response,
                created: Instant::now(),
                last_access: Instant::now(),
                bytes,
            },
        );

        while self.total_bytes > max_bytes && self.entries.len() > 1 {
            let Some((&oldest, _)) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
            else {
                break;
            };
            if oldest == fingerprint {
                break;
            }
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.total_bytes -= evicted.bytes;
            }
        }
    }
}

fn estimate_bytes(response: &SuggestResponse) -> usize {
    64 + response
        .suggestions
        .iter()
        .map(|s| {
            s.command.len()
                + s.template_id.len()
                + s.reasons.iter().map(String::len).sum::<usize>()
                + 64
        })
        .sum::<usize>()
}

/// Feature vectors of recently served suggestions, so feedback can credit
/// the sources that produced them. Bounded per session.
#[derive(Default)]
struct RecentSuggestions {
    by_session: HashMap<String, HashMap<String, FeatureVector>>,
}

pub struct SuggestService {
    store: Arc<StoreHandle>,
    registry: Arc<SessionRegistry>,
    git: Arc<GitContext>,
    normalizer: Normalizer,
    weights: RwLock<RankWeights>,
    learning: LearningConfig,
    config: SuggestConfig,
    half_life_ms: i64,
    excluded_repos: HashSet<String>,
    enabled: bool,
    cache: Mutex<SuggestCache>,
    inflight: Mutex<HashSet<u64>>,
    inflight_done: Condvar,
    recent: Mutex<RecentSuggestions>,
}

impl SuggestService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<StoreHandle>,
        registry: Arc<SessionRegistry>,
        git: Arc<GitContext>,
        normalizer: Normalizer,
        weights: RankWeights,
        learning: LearningConfig,
        config: SuggestConfig,
        half_life_ms: i64,
        excluded_repos: Vec<String>,
        enabled: bool,
    ) -> Self {
        Self {
            store,
            registry,
            git,
            normalizer,
            weights: RwLock::new(weights.clamped()),
            learning,
            config,
            half_life_ms,
            excluded_repos: excluded_repos.into_iter().collect(),
            enabled,
            cache: Mutex::new(SuggestCache::default()),
            inflight: Mutex::new(HashSet::new()),
            inflight_done: Condvar::new(),
            recent: Mutex::new(RecentSuggestions::default()),
        }
    }

    pub fn weights_version(&self) -> u64 {
        self.weights.read().unwrap().version
    }

    /// The public suggest operation: validate, short-circuit, consult the
    /// cache (single-flight per fingerprint), assemble and rank under the
    /// deadline, label, dedupe, cache, return.
    pub fn suggest(&self, request: &SuggestRequest, now_ms: i64) -> ServiceResult<SuggestResponse> {
        if request.session_id.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "session_id must not be empty".to_string(),
            ));
        }
        if request.cwd.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "cwd must not be empty".to_string(),
            ));
        }
        let top_k = request.top_k.clamp(1, MAX_TOP_K);

        if !self.enabled || clai_core::suggestions_disabled() {
            return Ok(empty_response());
        }
        if self.registry.is_incognito(&request.session_id) {
            return Ok(empty_response());
        }

        let cwd_path = PathBuf::from(&request.cwd);
        let repo_info = self.git.lookup(&cwd_path);
        let repo_key = if repo_info.is_repo {
            repo_info.repo_key.clone()
        } else {
            None
        };
        if let Some(key) = &repo_key {
            if self.excluded_repos.contains(key) {
                return Ok(empty_response());
            }
        }

        let last_template_id = request
            .last_template_id
            .clone()
            .or_else(|| self.registry.last_template_id(&request.session_id));

        let weights_version = self.weights_version();
        let fingerprint = fingerprint_of(
            &request.session_id,
            &request.cwd,
            repo_key.as_deref(),
            last_template_id.as_deref(),
            &request.prefix,
            top_k,
            weights_version,
        );

        let ttl = Duration::from_millis(self.config.cache_ttl_ms);
        if let Some(mut cached) = self.cache.lock().unwrap().get(fingerprint, ttl) {
            cached.from_cache = true;
            return Ok(cached);
        }

        // Single-flight: one build per fingerprint, others wait for it.
        {
            let mut inflight = self.inflight.lock().unwrap();
            while inflight.contains(&fingerprint) {
                let (guard, timeout) = self
                    .inflight_done
                    .wait_timeout(inflight, Duration::from_millis(self.config.deadline_ms * 2))
                    .unwrap();
                inflight = guard;
                if timeout.timed_out() {
                    break;
                }
            }
            if let Some(mut cached) = self.cache.lock().unwrap().get(fingerprint, ttl) {
                cached.from_cache = true;
                return Ok(cached);
            }
            inflight.insert(fingerprint);
        }

        let result = self.build(
            request,
            top_k,
            repo_key.as_deref(),
            last_template_id.as_deref(),
            now_ms,
        );

        {
            let mut inflight = self.inflight.lock().unwrap();
            inflight.remove(&fingerprint);
            self.inflight_done.notify_all();
        }

        match result {
            Ok((response, served_features)) => {
                self.remember_features(&request.session_id, served_features);
                self.cache.lock().unwrap().insert(
                    fingerprint,
                    response.clone(),
                    self.config.cache_max_bytes,
                );
                Ok(response)
            }
            Err(err) => {
                // Degraded: a stale cached answer beats an error.
                if let Some(mut cached) = self.cache.lock().unwrap().get_stale(fingerprint) {
                    warn!(error = %err, "suggest degraded to stale cache");
                    cached.from_cache = true;
                    return Ok(cached);
                }
                Err(err)
            }
        }
    }

    fn build(
        &self,
        request: &SuggestRequest,
        top_k: usize,
        repo_key: Option<&str>,
        last_template_id: Option<&str>,
        now_ms: i64,
    ) -> ServiceResult<(SuggestResponse, Vec<(String, FeatureVector)>)> {
        let deadline_ms = request
            .timeout_ms
            .map(|t| t.min(self.config.deadline_ms))
            .unwrap_or(self.config.deadline_ms);
        let deadline = Instant::now() + Duration::from_millis(deadline_ms);

        let cwd_path = PathBuf::from(&request.cwd);
        let canonical_cwd = clai_core::normalize_path(&cwd_path);
        let prefix = request.prefix.trim();
        let prefix_opt = (!prefix.is_empty()).then_some(prefix);

        // Scope scan order mirrors the feature weights: the most specific
        // evidence first, so a deadline cut keeps the strongest signals.
        let mut builder = CandidateBuilder::new(now_ms, self.half_life_ms, &self.config);
        let mut store_failed = false;
        let mut truncated = false;

        let scope_keys = ScopeKeys {
            session: Scope::Session(request.session_id.to_string()).key(),
            repo: repo_key.map(|k| Scope::Repo(k.to_string()).key()),
            dir: Scope::Dir(canonical_cwd.to_string_lossy().into_owned()).key(),
            global: Scope::Global.key(),
        };

        let transition_plan: [(Option<&String>, Feature); 4] = [
            (Some(&scope_keys.session), Feature::SessionTransition),
            (scope_keys.repo.as_ref(), Feature::RepoTransition),
            (Some(&scope_keys.dir), Feature::DirTransition),
            (Some(&scope_keys.global), Feature::GlobalTransition),
        ];
        if let Some(prev) = last_template_id {
            for (scope, feature) in transition_plan.iter() {
                let Some(scope) = scope else { continue };
                if Instant::now() >= deadline {
                    truncated = true;
                    break;
                }
                match self.store.read(|store| {
                    store.transitions_from(scope, prev, prefix_opt, self.config.per_scope_cap)
                }) {
                    Ok(rows) => builder.add_transitions(*feature, rows),
                    Err(err) => {
                        debug!(error = %err, scope = %scope, "transition read failed");
                        store_failed = true;
                    }
                }
            }

            // Ephemeral transitions only ever live in session memory.
            self.registry.with_state(&request.session_id, |state| {
                builder.add_ephemeral_transitions(state, prev);
            });
        }

        let frequency_plan: [(Option<&String>, Feature); 3] = [
            (scope_keys.repo.as_ref(), Feature::RepoFrequency),
            (Some(&scope_keys.dir), Feature::DirFrequency),
            (Some(&scope_keys.global), Feature::GlobalFrequency),
        ];
        for (scope, feature) in frequency_plan.iter() {
            let Some(scope) = scope else { continue };
            if Instant::now() >= deadline {
                truncated = true;
                break;
            }
            match self
                .store
                .read(|store| store.top_stats(scope, prefix_opt, self.config.per_scope_cap))
            {
                Ok(rows) => builder.add_stats(*feature, rows),
                Err(err) => {
                    debug!(error = %err, scope = %scope, "stat read failed");
                    store_failed = true;
                }
            }
        }

        // Session-scoped frequency keeps session-local habits alive even
        // without a transition anchor.
        if Instant::now() < deadline {
            match self.store.read(|store| {
                store.top_stats(&scope_keys.session, prefix_opt, self.config.per_scope_cap)
            }) {
                Ok(rows) => builder.add_session_stats(rows),
                Err(err) => {
                    debug!(error = %err, "session stat read failed");
                    store_failed = true;
                }
            }
        } else {
            truncated = true;
        }

        // Declared project tasks: candidates even with zero history.
        let project_types = detect_project_types(&cwd_path);
        for task in discover_tasks(&cwd_path, &project_types) {
            builder.add_task(&self.normalizer, &task.command, prefix_opt);
        }

        if store_failed && builder.is_empty() {
            return Err(ServiceError::Unavailable(
                "store unavailable and no cached suggestions".to_string(),
            ));
        }

        let candidates = builder.finish(prefix, &scope_keys, &self.store);

        let weights = self.weights.read().unwrap().clone();
        let params = RankParams {
            // Rank a little deep so text-level dedup cannot starve top_k.
            top_k: top_k * 2,
            explain_max_reasons: self.config.explain_max_reasons,
            explain_min_contribution: self.config.explain_min_contribution,
        };
        let ranked = rank(candidates, &weights, &params);

        let mut seen_text: HashSet<String> = HashSet::new();
        let mut suggestions = Vec::with_capacity(top_k);
        let mut features_kept = Vec::with_capacity(top_k);
        for item in ranked {
            if suggestions.len() >= top_k {
                break;
            }
            if self.config.dedupe_across_scopes && !seen_text.insert(item.rendered.clone()) {
                continue;
            }
            features_kept.push((item.rendered.clone(), item.features));
            suggestions.push(Suggestion {
                command: item.rendered,
                template_id: item.template_id,
                score: item.score,
                confidence: item.confidence,
                source: item.source,
                risk: item.risk,
                reasons: item.reasons,
            });
        }

        Ok((
            SuggestResponse {
                suggestions,
                from_cache: false,
                truncated,
            },
            features_kept,
        ))
    }

    fn remember_features(&self, session_id: &str, served: Vec<(String, FeatureVector)>) {
        let mut recent = self.recent.lock().unwrap();
        let per_session = recent
            .by_session
            .entry(session_id.to_string())
            .or_default();
        per_session.clear();
        for (command, features) in served {
            per_session.insert(command, features);
        }
        // Bound total tracked sessions.
        if recent.by_session.len() > 64 {
            let Some(key) = recent.by_session.keys().next().cloned() else {
                return;
            };
            recent.by_session.remove(&key);
        }
    }

    /// Feedback entry point: record stats and, when learning is enabled,
    /// nudge weights by the remembered feature vector of the suggestion.
    pub fn feedback(
        &self,
        session_id: &str,
        suggestion_text: &str,
        action: FeedbackAction,
        now_ms: i64,
    ) -> ServiceResult<()> {
        if session_id.is_empty() || suggestion_text.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "session_id and suggestion_text are required".to_string(),
            ));
        }

        let normalized = self.normalizer.normalize(suggestion_text);
        let scopes = vec![
            Scope::Global.key(),
            Scope::Session(session_id.to_string()).key(),
        ];
        let action_str = match action {
            FeedbackAction::Accepted => "accepted",
            FeedbackAction::Dismissed => "dismissed",
            FeedbackAction::Edited => "edited",
            FeedbackAction::Ignored => "ignored",
        };
        self.store
            .write(|store| {
                store.record_feedback(&scopes, &normalized.template_id, action_str, now_ms)
            })
            .map_err(|err| ServiceError::Unavailable(err.to_string()))?;

        if self.learning.enabled {
            let features = self
                .recent
                .lock()
                .unwrap()
                .by_session
                .get(session_id)
                .and_then(|m| m.get(suggestion_text).copied());
            if let Some(features) = features {
                let direction = match action {
                    FeedbackAction::Accepted | FeedbackAction::Edited => Some(true),
                    FeedbackAction::Dismissed => Some(false),
                    FeedbackAction::Ignored => None,
                };
                if let Some(accepted) = direction {
                    let mut weights = self.weights.write().unwrap();
                    weights.learn(&features, accepted, &self.learning);
                }
            }
        }
        Ok(())
    }
}

fn empty_response() -> SuggestResponse {
    SuggestResponse {
        suggestions: Vec::new(),
        from_cache: false,
        truncated: false,
    }
}

fn fingerprint_of(
    session_id: &str,
    cwd: &str,
    repo_key: Option<&str>,
    last_template_id: Option<&str>,
    prefix: &str,
    top_k: usize,
    weights_version: u64,
) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    session_id.hash(&mut hasher);
    cwd.hash(&mut hasher);
    repo_key.hash(&mut hasher);
    last_template_id.hash(&mut hasher);
    prefix.hash(&mut hasher);
    top_k.hash(&mut hasher);
    weights_version.hash(&mut hasher);
    hasher.finish()
}

struct ScopeKeys {
    session: String,
    repo: Option<String>,
    dir: String,
    global: String,
}

struct CandidateBuild {
    cmd_norm: String,
    features: FeatureVector,
    frequency: i64,
    last_seen_ms: i64,
}

/// Accumulates per-template evidence from every scope scan, then produces
/// ranker inputs.
struct CandidateBuilder {
    now_ms: i64,
    half_life_ms: i64,
    recency_half_life_ms: i64,
    by_template: HashMap<String, CandidateBuild>,
}

impl CandidateBuilder {
    fn new(now_ms: i64, half_life_ms: i64, config: &SuggestConfig) -> Self {
        Self {
            now_ms,
            half_life_ms,
            recency_half_life_ms: config.recency_half_life_hours as i64 * 3_600_000,
            by_template: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.by_template.is_empty()
    }

    fn entry(&mut self, template_id: &str, cmd_norm: &str) -> &mut CandidateBuild {
        self.by_template
            .entry(template_id.to_string())
            .or_insert_with(|| CandidateBuild {
                cmd_norm: cmd_norm.to_string(),
                features: FeatureVector::new(),
                frequency: 0,
                last_seen_ms: 0,
            })
    }

    fn add_transitions(&mut self, feature: Feature, rows: Vec<clai_store::TransitionRow>) {
        let (now, half_life) = (self.now_ms, self.half_life_ms);
        for row in rows {
            let effective = effective_score(row.weight, row.last_seen_ms, now, half_life);
            let value = effective / (effective + 1.0);
            let build = self.entry(&row.next_template_id, &row.cmd_norm);
            if value > build.features.get(feature) {
                build.features.set(feature, value);
            }
            build.frequency += row.count;
            build.last_seen_ms = build.last_seen_ms.max(row.last_seen_ms);
        }
    }

    fn add_ephemeral_transitions(&mut self, state: &mut crate::session::SessionState, prev: &str) {
        // Ephemeral transitions lack template text, so they can only
        // reinforce candidates some persistent scope already produced.
        let keys: Vec<String> = self.by_template.keys().cloned().collect();
        for template_id in keys {
            let count = state.ephemeral_transition_count(prev, &template_id);
            if count == 0 {
                continue;
            }
            let value = count as f64 / (count as f64 + 1.0);
            let build = self.by_template.get_mut(&template_id).unwrap();
            if value > build.features.get(Feature::SessionTransition) {
                build.features.set(Feature::SessionTransition, value);
            }
        }
    }

    fn add_stats(&mut self, feature: Feature, rows: Vec<clai_store::CommandStatRow>) {
        let (now, half_life, recency_hl) =
            (self.now_ms, self.half_life_ms, self.recency_half_life_ms);
        for row in rows {
            let effective = effective_score(row.score, row.last_seen_ms, now, half_life);
            let freq_factor = effective / (effective + 1.0);
            // Success-weighted frequency: neutral (x1.0) at the smoothed
            // prior, scaling down commands that keep failing.
            let ratio = smoothed_success_ratio(row.success_count, row.failure_count);
            let value = freq_factor * (2.0 * ratio);

            let build = self.entry(&row.template_id, &row.cmd_norm);
            if value > build.features.get(feature) {
                build.features.set(feature, value);
            }
            build.frequency += row.success_count + row.failure_count;
            build.last_seen_ms = build.last_seen_ms.max(row.last_seen_ms);

            let recency = recency_factor(row.last_seen_ms, now, recency_hl);
            if recency > build.features.get(Feature::Recency) {
                build.features.set(Feature::Recency, recency);
            }
        }
    }

    fn add_session_stats(&mut self, rows: Vec<clai_store::CommandStatRow>) {
        self.add_stats(Feature::SessionFrequency, rows);
    }

    fn add_task(&mut self, normalizer: &Normalizer, command: &str, prefix: Option<&str>) {
        if let Some(prefix) = prefix {
            if !prefix_matches(command, prefix) {
                return;
            }
        }
        let normalized = normalizer.normalize(command);
        let build = self.entry(&normalized.template_id, &normalized.cmd_norm);
        build.features.set(Feature::ProjectTaskBoost, 1.0);
        if build.cmd_norm.is_empty() {
            build.cmd_norm = normalized.cmd_norm;
        }
    }

    fn finish(
        self,
        prefix: &str,
        scopes: &ScopeKeys,
        store: &StoreHandle,
    ) -> Vec<CandidateInput> {
        let mut candidates = Vec::with_capacity(self.by_template.len());
        for (template_id, mut build) in self.by_template {
            if !prefix.is_empty() {
                let value = if build.cmd_norm.starts_with(prefix) {
                    1.0
                } else if prefix_matches(&build.cmd_norm, prefix) {
                    0.5
                } else {
                    continue;
                };
                build.features.set(Feature::PrefixMatch, value);
            }

            let rendered = render_command(&template_id, &build.cmd_norm, scopes, store);
            candidates.push(CandidateInput {
                template_id,
                cmd_norm: build.cmd_norm,
                rendered,
                features: build.features,
                frequency: build.frequency,
                last_seen_ms: build.last_seen_ms,
            });
        }
        candidates
    }
}

/// Full-prefix or token-prefix match.
fn prefix_matches(cmd_norm: &str, prefix: &str) -> bool {
    cmd_norm.starts_with(prefix)
        || cmd_norm
            .split_whitespace()
            .any(|token| token.starts_with(prefix))
}

/// Render a templated candidate into concrete text by filling placeholders
/// with the strongest recorded slot values, most specific scope first.
/// Placeholders with no recorded value stay visible.
fn render_command(
    template_id: &str,
    cmd_norm: &str,
    scopes: &ScopeKeys,
    store: &StoreHandle,
) -> String {
    if !cmd_norm.contains('<') {
        return cmd_norm.to_string();
    }

    let scope_order: Vec<&str> = [
        Some(scopes.session.as_str()),
        scopes.repo.as_deref(),
        Some(scopes.dir.as_str()),
        Some(scopes.global.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut fills: HashMap<i64, String> = HashMap::new();
    for scope in scope_order {
        let rows = store
            .read(|s| s.slot_values(scope, template_id))
            .unwrap_or_default();
        for row in rows {
            fills.entry(row.slot_index).or_insert(row.value);
        }
        if !fills.is_empty() {
            break;
        }
    }

    if fills.is_empty() {
        return cmd_norm.to_string();
    }

    cmd_norm
        .split(' ')
        .enumerate()
        .map(|(index, token)| {
            if token.starts_with('<') && token.ends_with('>') {
                fills
                    .get(&(index as i64))
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_levels() {
        assert!(prefix_matches("git status", "git"));
        assert!(prefix_matches("git status", "status"));
        assert!(!prefix_matches("git status", "push"));
    }

    #[test]
    fn fingerprints_differ_by_inputs() {
        let base = fingerprint_of("s1", "/a", None, None, "git", 5, 0);
        assert_ne!(base, fingerprint_of("s2", "/a", None, None, "git", 5, 0));
        assert_ne!(base, fingerprint_of("s1", "/b", None, None, "git", 5, 0));
        assert_ne!(base, fingerprint_of("s1", "/a", Some("r"), None, "git", 5, 0));
        assert_ne!(base, fingerprint_of("s1", "/a", None, Some("t"), "git", 5, 0));
        assert_ne!(base, fingerprint_of("s1", "/a", None, None, "gi", 5, 0));
        assert_ne!(base, fingerprint_of("s1", "/a", None, None, "git", 6, 0));
        assert_ne!(base, fingerprint_of("s1", "/a", None, None, "git", 5, 1));
        assert_eq!(base, fingerprint_of("s1", "/a", None, None, "git", 5, 0));
    }

    #[test]
    fn cache_respects_ttl_and_budget() {
        let mut cache = SuggestCache::default();
        let response = SuggestResponse {
            suggestions: Vec::new(),
            from_cache: false,
            truncated: false,
        };

        cache.insert(1, response.clone(), 10_000);
        assert!(cache.get(1, Duration::from_secs(30)).is_some());
        assert!(cache.get(1, Duration::from_millis(0)).is_none());
        // Stale reads still serve for degraded mode.
        assert!(cache.get_stale(1).is_some());

        // Tiny budget: inserting a second entry evicts the older one.
        cache.insert(2, response.clone(), 1);
        cache.insert(3, response, 1);
        assert!(cache.get_stale(2).is_none());
        assert!(cache.get_stale(3).is_some());
    }
}
