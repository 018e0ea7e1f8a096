use serde::{Deserialize, Serialize};

/// Scored signals, one slot per candidate per feature. `RiskPenalty` is
/// weighted separately (subtracted) and never counts as a source scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    SessionTransition,
    RepoTransition,
    DirTransition,
    GlobalTransition,
    SessionFrequency,
    RepoFrequency,
    DirFrequency,
    GlobalFrequency,
    ProjectTaskBoost,
    PrefixMatch,
    Recency,
    RiskPenalty,
}

pub const FEATURE_COUNT: usize = 12;

pub const ALL_FEATURES: [Feature; FEATURE_COUNT] = [
    Feature::SessionTransition,
    Feature::RepoTransition,
    Feature::DirTransition,
    Feature::GlobalTransition,
    Feature::SessionFrequency,
    Feature::RepoFrequency,
    Feature::DirFrequency,
    Feature::GlobalFrequency,
    Feature::ProjectTaskBoost,
    Feature::PrefixMatch,
    Feature::Recency,
    Feature::RiskPenalty,
];

impl Feature {
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Reason tag shown to users when this feature contributes.
    pub fn reason_tag(&self) -> &'static str {
        match self {
            Feature::SessionTransition => "session_transition",
            Feature::RepoTransition => "repo_transition",
            Feature::DirTransition => "dir_transition",
            Feature::GlobalTransition => "global_transition",
            Feature::SessionFrequency => "session_frequency",
            Feature::RepoFrequency => "repo_frequency",
            Feature::DirFrequency => "dir_frequency",
            Feature::GlobalFrequency => "global_frequency",
            Feature::ProjectTaskBoost => "project_task",
            Feature::PrefixMatch => "prefix",
            Feature::Recency => "recency",
            Feature::RiskPenalty => "dangerous",
        }
    }
}

/// Dense per-candidate feature values, indexed by `Feature`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }

    /// Add into a slot; scope scans accumulate transition evidence this way.
    pub fn add(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] += value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        ALL_FEATURES.iter().map(|f| (*f, self.values[f.index()]))
    }

    /// Number of distinct non-zero scope-backed sources (transitions,
    /// frequencies, task boost). Prefix/recency/risk do not count.
    pub fn source_count(&self) -> usize {
        ALL_FEATURES
            .iter()
            .filter(|f| {
                !matches!(
                    f,
                    Feature::PrefixMatch | Feature::Recency | Feature::RiskPenalty
                )
            })
            .filter(|f| self.values[f.index()] > 0.0)
            .count()
    }
}
