use serde::{Deserialize, Serialize};
use std::path::Path;

use clai_engine::{LearningConfig, RankWeights};

use crate::Result;

/// Daemon configuration, `config.yaml` under the base directory. Every
/// field defaults, so a missing or partial file still yields a complete
/// config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub suggest: SuggestConfig,
    pub aggregates: AggregateConfig,
    pub git: GitConfig,
    pub retention: RetentionConfig,
    pub aliases: AliasConfig,
    pub weights: RankWeights,
    pub learning: LearningConfig,
    /// Repo keys excluded from suggestions entirely.
    pub excluded_repos: Vec<String>,
    /// Master switch; CLAI_OFF overrides at request time.
    pub suggestions_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub queue_capacity: usize,
    pub enqueue_timeout_ms: u64,
    pub busy_timeout_ms: u64,
    /// Events within `burst_window_ms` that trip burst shaping.
    pub burst_threshold: usize,
    pub burst_window_ms: u64,
    pub quiet_period_ms: u64,
    /// Degraded-mode ring capacity when the store is down.
    pub ring_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 8192,
            enqueue_timeout_ms: 20,
            busy_timeout_ms: 50,
            burst_threshold: 10,
            burst_window_ms: 100,
            quiet_period_ms: 500,
            ring_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    pub cache_ttl_ms: u64,
    pub cache_max_bytes: usize,
    pub deadline_ms: u64,
    /// Candidate cardinality cap per scope before the merge.
    pub per_scope_cap: usize,
    pub explain_max_reasons: usize,
    pub explain_min_contribution: f64,
    pub dedupe_across_scopes: bool,
    pub recency_half_life_hours: u64,
    pub reader_pool_size: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 30_000,
            cache_max_bytes: 50 * 1024 * 1024,
            deadline_ms: 150,
            per_scope_cap: 200,
            explain_max_reasons: 3,
            explain_min_contribution: 0.05,
            dedupe_across_scopes: true,
            recency_half_life_hours: 24,
            reader_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub half_life_hours: u64,
    pub score_min: f64,
    pub score_max: f64,
    pub slot_value_cap: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 168,
            score_min: 0.0,
            score_max: 1000.0,
            slot_value_cap: 20,
        }
    }
}

impl AggregateConfig {
    pub fn tuning(&self) -> clai_store::AggregateTuning {
        clai_store::AggregateTuning {
            half_life_ms: self.half_life_hours as i64 * 3_600_000,
            score_min: self.score_min,
            score_max: self.score_max,
            slot_value_cap: self.slot_value_cap,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub cache_ttl_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 2_000,
            command_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_age_days: u64,
    pub max_events: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: 365,
            max_events: 200_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    pub expand: bool,
    /// Shell whose alias table is captured at daemon start.
    pub shell: Option<String>,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            expand: false,
            shell: None,
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config.normalized())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self).map_err(crate::Error::from)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Post-load fixups: clamp weights into their bounds.
    fn normalized(mut self) -> Self {
        self.weights = self.weights.clamped();
        self
    }

    pub fn suggestions_enabled(&self) -> bool {
        self.suggestions_enabled.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config.ingest.queue_capacity, 8192);
        assert_eq!(config.suggest.deadline_ms, 150);
        assert!(config.suggestions_enabled());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "suggest:\n  deadline_ms: 80\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.suggest.deadline_ms, 80);
        assert_eq!(config.suggest.cache_ttl_ms, 30_000);
        assert_eq!(config.ingest.queue_capacity, 8192);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.retention.max_events = 500;
        config.excluded_repos.push("deadbeef".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.retention.max_events, 500);
        assert_eq!(loaded.excluded_repos, vec!["deadbeef".to_string()]);
    }

    #[test]
    fn out_of_bounds_weights_are_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "weights:\n  session_transition: 99.0\n  repo_transition: 2.0\n  dir_transition: 1.5\n  global_transition: 1.0\n  repo_frequency: 1.5\n  dir_frequency: 1.2\n  global_frequency: 0.8\n  project_task_boost: 0.5\n  prefix_match: 2.0\n  recency: 1.0\n  risk_weight: 3.0\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weights.session_transition, config.weights.bounds.max);
    }
}
