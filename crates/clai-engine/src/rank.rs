use std::cmp::Ordering;
use std::collections::BinaryHeap;

use clai_types::{Risk, SuggestionSource};

use crate::features::{Feature, FeatureVector};
use crate::risk::{assess_risk, RiskAssessment};
use crate::weights::RankWeights;

/// One candidate as assembled by the suggest service: template identity,
/// the concrete rendering, and its feature vector (risk excluded; the
/// ranker assesses risk itself so the label and the penalty cannot drift
/// apart).
#[derive(Debug, Clone)]
pub struct CandidateInput {
    pub template_id: String,
    pub cmd_norm: String,
    pub rendered: String,
    pub features: FeatureVector,
    /// Raw observation count backing the frequency tiebreak.
    pub frequency: i64,
    pub last_seen_ms: i64,
}

#[derive(Debug, Clone)]
pub struct Ranked {
    pub template_id: String,
    pub cmd_norm: String,
    pub rendered: String,
    pub score: f64,
    pub confidence: f64,
    pub risk: Risk,
    pub source: SuggestionSource,
    pub reasons: Vec<String>,
    /// Kept for feedback-driven weight learning.
    pub features: FeatureVector,
    pub frequency: i64,
    pub last_seen_ms: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RankParams {
    pub top_k: usize,
    pub explain_max_reasons: usize,
    pub explain_min_contribution: f64,
}

impl Default for RankParams {
    fn default() -> Self {
        Self {
            top_k: clai_types::MAX_TOP_K,
            explain_max_reasons: 3,
            explain_min_contribution: 0.05,
        }
    }
}

struct HeapEntry {
    ranked: Ranked,
}

impl HeapEntry {
    /// Total ordering: score desc, then frequency desc, then last_seen
    /// desc, then template_id asc. Greater = ranks earlier.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.ranked
            .score
            .total_cmp(&other.ranked.score)
            .then_with(|| self.ranked.frequency.cmp(&other.ranked.frequency))
            .then_with(|| self.ranked.last_seen_ms.cmp(&other.ranked.last_seen_ms))
            .then_with(|| other.ranked.template_id.cmp(&self.ranked.template_id))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we keep the WORST entry on
        // top so it pops first once the heap holds top_k entries.
        other.rank_cmp(self)
    }
}

/// Score, label, and order candidates; return the top `params.top_k` in
/// final display order. Pure: identical inputs give byte-identical output.
pub fn rank(
    candidates: Vec<CandidateInput>,
    weights: &RankWeights,
    params: &RankParams,
) -> Vec<Ranked> {
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(params.top_k + 1);

    for candidate in candidates {
        let ranked = score_candidate(candidate, weights, params);
        heap.push(HeapEntry { ranked });
        if heap.len() > params.top_k {
            heap.pop();
        }
    }

    let mut results: Vec<Ranked> = heap.into_iter().map(|entry| entry.ranked).collect();
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.frequency.cmp(&a.frequency))
            .then_with(|| b.last_seen_ms.cmp(&a.last_seen_ms))
            .then_with(|| a.template_id.cmp(&b.template_id))
    });
    results
}

fn score_candidate(
    mut candidate: CandidateInput,
    weights: &RankWeights,
    params: &RankParams,
) -> Ranked {
    let assessment = assess_risk(&candidate.rendered);
    candidate.features.set(
        Feature::RiskPenalty,
        if assessment.risk == Risk::Destructive {
            1.0
        } else {
            0.0
        },
    );

    let mut score = 0.0;
    for (feature, value) in candidate.features.iter() {
        if feature == Feature::RiskPenalty {
            score -= value * weights.risk_weight;
        } else {
            score += value * weights.weight_for(feature);
        }
    }

    let confidence = confidence_for(score, candidate.features.source_count());
    let source = dominant_source(&candidate.features, weights);
    let reasons = reason_tags(&candidate.features, weights, &assessment, params);

    Ranked {
        template_id: candidate.template_id,
        cmd_norm: candidate.cmd_norm,
        rendered: candidate.rendered,
        score,
        confidence,
        risk: assessment.risk,
        source,
        reasons,
        features: candidate.features,
        frequency: candidate.frequency,
        last_seen_ms: candidate.last_seen_ms,
    }
}

/// Monotone in both arguments, bounded to [0, 1): the score term saturates
/// toward 1, the source term scales it up as corroborating scopes appear.
fn confidence_for(score: f64, source_count: usize) -> f64 {
    let positive = score.max(0.0);
    let score_term = positive / (positive + 2.0);
    let source_term = 0.5 + 0.5 * (source_count.min(4) as f64 / 4.0);
    score_term * source_term
}

fn dominant_source(features: &FeatureVector, weights: &RankWeights) -> SuggestionSource {
    let scoped = [
        (Feature::SessionTransition, SuggestionSource::Session),
        (Feature::RepoTransition, SuggestionSource::Repo),
        (Feature::DirTransition, SuggestionSource::Dir),
        (Feature::GlobalTransition, SuggestionSource::Global),
        (Feature::SessionFrequency, SuggestionSource::Session),
        (Feature::RepoFrequency, SuggestionSource::Repo),
        (Feature::DirFrequency, SuggestionSource::Dir),
        (Feature::GlobalFrequency, SuggestionSource::Global),
        (Feature::ProjectTaskBoost, SuggestionSource::Task),
    ];

    let mut best = SuggestionSource::Global;
    let mut best_contribution = 0.0;
    for (feature, source) in scoped {
        let contribution = features.get(feature) * weights.weight_for(feature);
        if contribution > best_contribution {
            best_contribution = contribution;
            best = source;
        }
    }
    best
}

fn reason_tags(
    features: &FeatureVector,
    weights: &RankWeights,
    assessment: &RiskAssessment,
    params: &RankParams,
) -> Vec<String> {
    let mut contributions: Vec<(Feature, f64)> = features
        .iter()
        .filter(|(feature, _)| *feature != Feature::RiskPenalty)
        .map(|(feature, value)| (feature, value * weights.weight_for(feature)))
        .filter(|(_, contribution)| *contribution >= params.explain_min_contribution)
        .collect();
    // Deterministic: contribution desc, then feature order.
    contributions.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| a.0.index().cmp(&b.0.index()))
    });

    let mut reasons: Vec<String> = Vec::with_capacity(params.explain_max_reasons);
    // The destructive tag is mandatory and always leads.
    if assessment.risk == Risk::Destructive {
        reasons.push(Feature::RiskPenalty.reason_tag().to_string());
    }
    for (feature, _) in contributions {
        if reasons.len() >= params.explain_max_reasons {
            break;
        }
        reasons.push(feature.reason_tag().to_string());
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(template_id: &str, rendered: &str, frequency: i64, last_seen: i64) -> CandidateInput {
        CandidateInput {
            template_id: template_id.to_string(),
            cmd_norm: rendered.to_string(),
            rendered: rendered.to_string(),
            features: FeatureVector::new(),
            frequency,
            last_seen_ms: last_seen,
        }
    }

    #[test]
    fn orders_by_score_then_tiebreaks() {
        let weights = RankWeights::default();
        let params = RankParams::default();

        let mut a = candidate("tmpl-a", "git status", 5, 100);
        a.features.set(Feature::GlobalFrequency, 1.0);
        let mut b = candidate("tmpl-b", "git diff", 5, 100);
        b.features.set(Feature::GlobalFrequency, 2.0);
        // c ties with a on every score input; template id breaks the tie.
        let mut c = candidate("tmpl-0", "git fetch", 5, 100);
        c.features.set(Feature::GlobalFrequency, 1.0);

        let ranked = rank(vec![a, b, c], &weights, &params);
        assert_eq!(ranked[0].template_id, "tmpl-b");
        assert_eq!(ranked[1].template_id, "tmpl-0");
        assert_eq!(ranked[2].template_id, "tmpl-a");
    }

    #[test]
    fn frequency_breaks_score_ties_before_recency() {
        let weights = RankWeights::default();
        let params = RankParams::default();

        let mut a = candidate("tmpl-a", "make build", 10, 50);
        a.features.set(Feature::DirFrequency, 1.0);
        let mut b = candidate("tmpl-b", "make check", 2, 500);
        b.features.set(Feature::DirFrequency, 1.0);

        let ranked = rank(vec![b, a], &weights, &params);
        assert_eq!(ranked[0].template_id, "tmpl-a");
    }

    #[test]
    fn top_k_bounds_results() {
        let weights = RankWeights::default();
        let params = RankParams {
            top_k: 3,
            ..Default::default()
        };

        let candidates: Vec<CandidateInput> = (0..20)
            .map(|i| {
                let mut c = candidate(&format!("tmpl-{:02}", i), "ls", 1, i);
                c.features.set(Feature::GlobalFrequency, i as f64);
                c
            })
            .collect();

        let ranked = rank(candidates, &weights, &params);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].template_id, "tmpl-19");
        assert_eq!(ranked[2].template_id, "tmpl-17");
    }

    #[test]
    fn destructive_candidates_are_penalized_but_kept() {
        let weights = RankWeights::default();
        let params = RankParams::default();

        let mut dangerous = candidate("tmpl-rm", "rm -rf /", 50, 100);
        dangerous.features.set(Feature::GlobalFrequency, 3.0);
        let mut safe = candidate("tmpl-ls", "ls -la", 1, 100);
        safe.features.set(Feature::GlobalFrequency, 3.0);

        let ranked = rank(vec![dangerous, safe], &weights, &params);
        assert_eq!(ranked.len(), 2);
        // Same features, but the destructive one pays the risk weight.
        assert_eq!(ranked[0].template_id, "tmpl-ls");
        let rm = &ranked[1];
        assert_eq!(rm.risk, Risk::Destructive);
        assert!(rm.reasons.contains(&"dangerous".to_string()));
        assert!(rm.score < ranked[0].score);
    }

    #[test]
    fn destructive_tie_keeps_frequency_order() {
        let weights = RankWeights::default();
        let params = RankParams::default();

        let mut frequent = candidate("tmpl-a", "rm -rf /", 50, 100);
        frequent.features.set(Feature::GlobalFrequency, 2.0);
        let mut rare = candidate("tmpl-b", "shred -u /dev/sda", 2, 100);
        rare.features.set(Feature::GlobalFrequency, 2.0);

        let ranked = rank(vec![rare, frequent], &weights, &params);
        assert_eq!(ranked[0].template_id, "tmpl-a");
        assert_eq!(ranked[1].template_id, "tmpl-b");
    }

    #[test]
    fn confidence_is_bounded_and_monotone() {
        assert_eq!(confidence_for(-5.0, 0), 0.0);
        let low = confidence_for(1.0, 1);
        let higher_score = confidence_for(3.0, 1);
        let more_sources = confidence_for(1.0, 3);
        assert!(low > 0.0);
        assert!(higher_score > low);
        assert!(more_sources > low);
        for score in [0.0, 0.5, 10.0, 1e9] {
            for sources in 0..8 {
                let c = confidence_for(score, sources);
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }

    #[test]
    fn reasons_respect_cap_and_floor() {
        let weights = RankWeights::default();
        let params = RankParams::default();

        let mut c = candidate("tmpl-x", "cargo test", 1, 0);
        c.features.set(Feature::SessionTransition, 1.0);
        c.features.set(Feature::RepoFrequency, 1.0);
        c.features.set(Feature::PrefixMatch, 1.0);
        c.features.set(Feature::Recency, 1.0);
        // Below the default 0.05 contribution floor once weighted.
        c.features.set(Feature::GlobalFrequency, 0.01);

        let ranked = rank(vec![c], &weights, &params);
        let reasons = &ranked[0].reasons;
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[0], "session_transition");
        assert!(!reasons.contains(&"global_frequency".to_string()));
    }

    #[test]
    fn source_is_highest_weighted_contributing_scope() {
        let weights = RankWeights::default();
        let params = RankParams::default();

        let mut c = candidate("tmpl-x", "cargo build", 1, 0);
        c.features.set(Feature::RepoTransition, 2.0);
        c.features.set(Feature::GlobalFrequency, 1.0);
        let ranked = rank(vec![c], &weights, &params);
        assert_eq!(ranked[0].source, SuggestionSource::Repo);

        let mut task = candidate("tmpl-y", "npm run lint", 0, 0);
        task.features.set(Feature::ProjectTaskBoost, 1.0);
        let ranked = rank(vec![task], &weights, &params);
        assert_eq!(ranked[0].source, SuggestionSource::Task);
    }

    #[test]
    fn identical_inputs_rank_identically() {
        let weights = RankWeights::default();
        let params = RankParams::default();

        let build = || {
            (0..50)
                .map(|i| {
                    let mut c = candidate(&format!("tmpl-{:02}", i), "git status", i % 7, i);
                    c.features.set(Feature::GlobalFrequency, ((i * 13) % 5) as f64);
                    c.features.set(Feature::Recency, ((i * 7) % 3) as f64 / 3.0);
                    c
                })
                .collect::<Vec<_>>()
        };

        let first = rank(build(), &weights, &params);
        for _ in 0..10 {
            let again = rank(build(), &weights, &params);
            assert_eq!(again.len(), first.len());
            for (a, b) in first.iter().zip(again.iter()) {
                assert_eq!(a.template_id, b.template_id);
                assert_eq!(a.score, b.score);
                assert_eq!(a.confidence, b.confidence);
                assert_eq!(a.reasons, b.reasons);
            }
        }
    }
}
