use serde::{Deserialize, Serialize};

use clai_types::stats::clamp;

use crate::features::{Feature, FeatureVector, ALL_FEATURES, FEATURE_COUNT};

/// Bounds every learned weight stays inside.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 5.0 }
    }
}

/// Online learning schedule: the rate starts at `eta_0` and anneals toward
/// `eta_floor` as samples accumulate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LearningConfig {
    pub enabled: bool,
    pub eta_0: f64,
    pub eta_floor: f64,
    pub decay_const: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            eta_0: 0.05,
            eta_floor: 0.005,
            decay_const: 100.0,
        }
    }
}

/// Per-feature weights plus the separately bounded risk weight. `version`
/// feeds the suggest cache fingerprint so learned updates invalidate
/// cached rankings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub session_transition: f64,
    pub repo_transition: f64,
    pub dir_transition: f64,
    pub global_transition: f64,
    pub session_frequency: f64,
    pub repo_frequency: f64,
    pub dir_frequency: f64,
    pub global_frequency: f64,
    pub project_task_boost: f64,
    pub prefix_match: f64,
    pub recency: f64,
    pub risk_weight: f64,
    pub bounds: WeightBounds,
    pub risk_bounds: WeightBounds,
    pub version: u64,
    pub samples: u64,
}

fn default_risk_bounds() -> WeightBounds {
    WeightBounds { min: 0.5, max: 10.0 }
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            session_transition: 3.0,
            repo_transition: 2.0,
            dir_transition: 1.5,
            global_transition: 1.0,
            session_frequency: 2.0,
            repo_frequency: 1.5,
            dir_frequency: 1.2,
            global_frequency: 0.8,
            project_task_boost: 0.5,
            prefix_match: 2.0,
            recency: 1.0,
            risk_weight: 3.0,
            bounds: WeightBounds::default(),
            risk_bounds: default_risk_bounds(),
            version: 0,
            samples: 0,
        }
    }
}

impl RankWeights {
    pub fn weight_for(&self, feature: Feature) -> f64 {
        match feature {
            Feature::SessionTransition => self.session_transition,
            Feature::RepoTransition => self.repo_transition,
            Feature::DirTransition => self.dir_transition,
            Feature::GlobalTransition => self.global_transition,
            Feature::SessionFrequency => self.session_frequency,
            Feature::RepoFrequency => self.repo_frequency,
            Feature::DirFrequency => self.dir_frequency,
            Feature::GlobalFrequency => self.global_frequency,
            Feature::ProjectTaskBoost => self.project_task_boost,
            Feature::PrefixMatch => self.prefix_match,
            Feature::Recency => self.recency,
            Feature::RiskPenalty => self.risk_weight,
        }
    }

    fn set_weight(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::SessionTransition => &mut self.session_transition,
            Feature::RepoTransition => &mut self.repo_transition,
            Feature::DirTransition => &mut self.dir_transition,
            Feature::GlobalTransition => &mut self.global_transition,
            Feature::SessionFrequency => &mut self.session_frequency,
            Feature::RepoFrequency => &mut self.repo_frequency,
            Feature::DirFrequency => &mut self.dir_frequency,
            Feature::GlobalFrequency => &mut self.global_frequency,
            Feature::ProjectTaskBoost => &mut self.project_task_boost,
            Feature::PrefixMatch => &mut self.prefix_match,
            Feature::Recency => &mut self.recency,
            Feature::RiskPenalty => &mut self.risk_weight,
        };
        *slot = value;
    }

    /// Clamp every weight into its bounds. Called after deserialization so
    /// hand-edited configs cannot push weights out of range.
    pub fn clamped(mut self) -> Self {
        for feature in ALL_FEATURES {
            let bounds = self.bounds_for(feature);
            let clamped = clamp(self.weight_for(feature), bounds.min, bounds.max);
            self.set_weight(feature, clamped);
        }
        self
    }

    fn bounds_for(&self, feature: Feature) -> WeightBounds {
        if feature == Feature::RiskPenalty {
            self.risk_bounds
        } else {
            self.bounds
        }
    }

    /// Current learning rate: `max(eta_floor, eta_0 * c / (c + samples))`.
    pub fn learning_rate(&self, config: &LearningConfig) -> f64 {
        let annealed = config.eta_0 * config.decay_const / (config.decay_const + self.samples as f64);
        annealed.max(config.eta_floor)
    }

    /// One online update from user feedback on a suggestion with the given
    /// feature vector. Accepted nudges contributing weights up, dismissed
    /// nudges them down; everything stays inside bounds.
    pub fn learn(&mut self, features: &FeatureVector, accepted: bool, config: &LearningConfig) {
        if !config.enabled {
            return;
        }
        let eta = self.learning_rate(config);
        let direction = if accepted { 1.0 } else { -1.0 };

        let mut contributions = [0.0; FEATURE_COUNT];
        for (feature, value) in features.iter() {
            if feature == Feature::RiskPenalty {
                continue;
            }
            contributions[feature.index()] = value;
        }

        for feature in ALL_FEATURES {
            if feature == Feature::RiskPenalty {
                continue;
            }
            let value = contributions[feature.index()];
            if value == 0.0 {
                continue;
            }
            let bounds = self.bounds_for(feature);
            let updated = clamp(
                self.weight_for(feature) + eta * direction * value,
                bounds.min,
                bounds.max,
            );
            self.set_weight(feature, updated);
        }

        self.samples += 1;
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_inside_bounds() {
        let weights = RankWeights::default().clamped();
        for feature in ALL_FEATURES {
            let value = weights.weight_for(feature);
            let bounds = weights.bounds_for(feature);
            assert!(value >= bounds.min && value <= bounds.max, "{:?}", feature);
        }
    }

    #[test]
    fn learning_rate_anneals_to_floor() {
        let config = LearningConfig {
            enabled: true,
            ..Default::default()
        };
        let mut weights = RankWeights::default();
        let initial = weights.learning_rate(&config);
        weights.samples = 1_000_000;
        let late = weights.learning_rate(&config);
        assert!(initial > late);
        assert_eq!(late, config.eta_floor);
    }

    #[test]
    fn accepted_feedback_raises_contributing_weights() {
        let config = LearningConfig {
            enabled: true,
            ..Default::default()
        };
        let mut weights = RankWeights::default();
        let before = weights.repo_transition;

        let mut features = FeatureVector::new();
        features.set(Feature::RepoTransition, 2.0);
        weights.learn(&features, true, &config);

        assert!(weights.repo_transition > before);
        assert_eq!(weights.version, 1);
        assert_eq!(weights.samples, 1);
        // Untouched features keep their weight.
        assert_eq!(weights.prefix_match, RankWeights::default().prefix_match);
    }

    #[test]
    fn dismissed_feedback_lowers_but_respects_bounds() {
        let config = LearningConfig {
            enabled: true,
            eta_0: 10.0,
            eta_floor: 10.0,
            decay_const: 100.0,
        };
        let mut weights = RankWeights::default();
        let mut features = FeatureVector::new();
        features.set(Feature::GlobalFrequency, 5.0);

        for _ in 0..10 {
            weights.learn(&features, false, &config);
        }
        assert_eq!(weights.global_frequency, weights.bounds.min);
    }

    #[test]
    fn disabled_learning_is_inert() {
        let config = LearningConfig::default();
        assert!(!config.enabled);
        let mut weights = RankWeights::default();
        let mut features = FeatureVector::new();
        features.set(Feature::Recency, 1.0);
        weights.learn(&features, true, &config);
        assert_eq!(weights.version, 0);
        assert_eq!(weights.recency, RankWeights::default().recency);
    }
}
