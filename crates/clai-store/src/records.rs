use clai_types::SlotValue;

/// Insert payload for a finalized command event.
#[derive(Debug, Clone)]
pub struct NewCommandEvent {
    pub session_id: String,
    pub command_id: String,
    pub ts_ms: i64,
    pub cwd: String,
    pub repo_key: Option<String>,
    pub branch: Option<String>,
    pub cmd_raw: String,
    pub cmd_norm: String,
    pub cmd_truncated: bool,
    pub template_id: String,
    /// None for imported history entries whose outcome is unknown.
    pub exit_code: Option<i32>,
    pub duration_ms: Option<i64>,
}

/// Aggregate tuning knobs threaded from configuration into each apply.
#[derive(Debug, Clone, Copy)]
pub struct AggregateTuning {
    pub half_life_ms: i64,
    pub score_min: f64,
    pub score_max: f64,
    pub slot_value_cap: usize,
}

impl Default for AggregateTuning {
    fn default() -> Self {
        Self {
            half_life_ms: 168 * 3_600_000,
            score_min: 0.0,
            score_max: 1000.0,
            slot_value_cap: 20,
        }
    }
}

/// One logical event commit: the event row plus every aggregate it touches,
/// applied in a single transaction.
#[derive(Debug, Clone)]
pub struct EventApply {
    pub event: NewCommandEvent,
    pub slots: Vec<SlotValue>,
    pub prev_template_id: Option<String>,
    /// Canonical scope keys the event aggregates into.
    pub scopes: Vec<String>,
    pub tuning: AggregateTuning,
    /// Burst shaping: skip the decay-bearing read-modify-write and apply
    /// single-statement increments instead.
    pub defer_decay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Committed; carries the allocated event row id.
    Applied(i64),
    /// `(session_id, command_id)` was already finalized; nothing changed.
    Duplicate,
}

/// Scored row read back for ranking.
#[derive(Debug, Clone)]
pub struct CommandStatRow {
    pub template_id: String,
    pub cmd_norm: String,
    pub score: f64,
    pub success_count: i64,
    pub failure_count: i64,
    pub last_seen_ms: i64,
}

#[derive(Debug, Clone)]
pub struct TransitionRow {
    pub next_template_id: String,
    pub cmd_norm: String,
    pub weight: f64,
    pub count: i64,
    pub last_seen_ms: i64,
}

#[derive(Debug, Clone)]
pub struct SlotStatRow {
    pub slot_index: i64,
    pub value: String,
    pub weight: f64,
    pub count: i64,
    pub last_seen_ms: i64,
}
