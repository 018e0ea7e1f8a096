// Pure ranking computation. No IO, no clocks: everything the ranker needs
// arrives in the candidate inputs, so identical inputs always produce
// byte-identical output (the determinism the suggest service relies on).

mod features;
mod rank;
mod risk;
mod score;
mod weights;

pub use features::{Feature, FeatureVector, ALL_FEATURES, FEATURE_COUNT};
pub use rank::{rank, CandidateInput, RankParams, Ranked};
pub use risk::{assess_risk, RiskAssessment, RiskRule};
pub use score::{effective_score, recency_factor};
pub use weights::{LearningConfig, RankWeights, WeightBounds};
