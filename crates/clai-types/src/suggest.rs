use serde::{Deserialize, Serialize};

/// Hard ceiling on returned suggestions regardless of what the client asks
/// for.
pub const MAX_TOP_K: usize = 10;

/// Default when the client does not specify `max_results`.
pub const DEFAULT_TOP_K: usize = 5;

/// Risk label attached to every suggestion. Destructive candidates are never
/// filtered out; they are labeled and penalized instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Safe,
    Caution,
    Destructive,
}

/// Highest-weighted contributing scope for a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Session,
    Repo,
    Dir,
    Global,
    Task,
    Ai,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionSource::Session => "session",
            SuggestionSource::Repo => "repo",
            SuggestionSource::Dir => "dir",
            SuggestionSource::Global => "global",
            SuggestionSource::Task => "task",
            SuggestionSource::Ai => "ai",
        }
    }
}

/// Everything the ranker needs to score one request, assembled by the
/// suggest service from the hook's call plus daemon-side context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestContext {
    pub session_id: String,
    pub cwd: String,
    pub repo_key: Option<String>,
    pub last_template_id: Option<String>,
    /// Current line buffer; empty means "suggest from transitions alone".
    pub prefix: String,
    pub now_ms: i64,
    pub top_k: usize,
    #[serde(default)]
    pub project_types: Vec<String>,
}

/// One ranked suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Rendered command text shown to the user.
    pub command: String,
    pub template_id: String,
    pub score: f64,
    /// Monotone in score magnitude and contributing source count, in [0, 1].
    pub confidence: f64,
    pub source: SuggestionSource,
    pub risk: Risk,
    /// Up to `explain_max_reasons` human-readable tags naming the top
    /// contributing features.
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<Suggestion>,
    pub from_cache: bool,
    /// Set when the deadline cut assembly short and the list is best-effort.
    #[serde(default)]
    pub truncated: bool,
}

/// User reaction to a suggestion, fed back into weight learning and
/// dismissal stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Accepted,
    Dismissed,
    Edited,
    Ignored,
}

/// History search filters for `QueryCommands`. `session_id` accepts a unique
/// prefix; an ambiguous prefix is an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilter {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub repo_key: Option<String>,
    pub prefix: Option<String>,
    pub substring: Option<String>,
    #[serde(default)]
    pub success_only: bool,
    #[serde(default)]
    pub failure_only: bool,
    #[serde(default = "default_query_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_query_limit() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filter_defaults_from_empty_json() {
        let filter: QueryFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.offset, 0);
        assert!(!filter.success_only);
    }

    #[test]
    fn risk_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Risk::Destructive).unwrap(),
            "\"destructive\""
        );
    }

    #[test]
    fn suggestion_json_shape_is_stable() {
        let suggestion = Suggestion {
            command: "git status".to_string(),
            template_id: "ab12".to_string(),
            score: 1.5,
            confidence: 0.8,
            source: SuggestionSource::Repo,
            risk: Risk::Safe,
            reasons: vec!["repo_transition".to_string()],
        };
        let value = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(value["source"], "repo");
        assert_eq!(value["risk"], "safe");
    }
}
