use serde::{Deserialize, Serialize};

/// Hard cap on stored raw command text. Anything longer is truncated at a
/// char boundary and flagged with `cmd_truncated`.
pub const MAX_CMD_RAW_BYTES: usize = 16 * 1024;

/// A shell session, created by `session_start` and soft-ended by
/// `session_end`. Used as a scope key for session-local aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub shell: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub started_ms: i64,
    pub ended_ms: Option<i64>,
    /// Detected project kinds for the session's starting directory
    /// (e.g. "rust", "node").
    #[serde(default)]
    pub project_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEnd {
    pub session_id: String,
    pub ended_ms: i64,
}

/// Git state attached to a command event. Hooks may supply this directly;
/// otherwise the daemon resolves it from cwd.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitInfo {
    pub repo_key: Option<String>,
    pub branch: Option<String>,
    #[serde(default)]
    pub dirty: bool,
}

/// A fully ingested command lifecycle record. Built in two phases: a
/// `command_start` registers the raw text, a `command_end` finalizes exit
/// code and duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    /// Monotonic row id, allocated at commit.
    pub id: i64,
    pub session_id: String,
    /// Caller-supplied id pairing `command_start` with `command_end`;
    /// unique per session, the basis for at-most-once finalization.
    pub command_id: String,
    pub ts_ms: i64,
    pub cwd: String,
    pub repo_key: Option<String>,
    pub branch: Option<String>,
    pub cmd_raw: String,
    pub cmd_norm: String,
    pub cmd_truncated: bool,
    pub template_id: String,
    pub exit_code: Option<i32>,
    pub duration_ms: Option<i64>,
    /// Ephemeral events bypass persistence beyond in-memory session context.
    pub ephemeral: bool,
}

/// Canonical normalized form of a command. `template_id` is a pure function
/// of `cmd_norm`, so identical raw commands always resolve to the same row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub template_id: String,
    pub cmd_norm: String,
    pub slot_count: usize,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
}

/// Kind of value excised from a token during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Path,
    Int,
    Hex,
    Url,
    Str,
    Blob,
}

impl SlotKind {
    pub fn placeholder(&self) -> &'static str {
        match self {
            SlotKind::Path => "<PATH>",
            SlotKind::Int => "<INT>",
            SlotKind::Hex => "<HEX>",
            SlotKind::Url => "<URL>",
            SlotKind::Str => "<STR>",
            SlotKind::Blob => "<BLOB>",
        }
    }
}

/// One replaced token: position in the normalized token stream, the rule
/// that fired, and the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotValue {
    pub index: usize,
    pub kind: SlotKind,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_kind_placeholders_are_distinct() {
        let kinds = [
            SlotKind::Path,
            SlotKind::Int,
            SlotKind::Hex,
            SlotKind::Url,
            SlotKind::Str,
            SlotKind::Blob,
        ];
        let mut seen = std::collections::HashSet::new();
        for kind in kinds {
            assert!(seen.insert(kind.placeholder()));
        }
    }

    #[test]
    fn session_round_trips_through_json() {
        let session = Session {
            id: "sess-1".to_string(),
            shell: Some("zsh".to_string()),
            host: None,
            user: Some("dev".to_string()),
            started_ms: 1_700_000_000_000,
            ended_ms: None,
            project_types: vec!["rust".to_string()],
        };

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "sess-1");
        assert_eq!(back.project_types, vec!["rust".to_string()]);
    }
}
