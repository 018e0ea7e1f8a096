use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;
use crate::suggest::{FeedbackAction, QueryFilter};

/// One RPC call, a single JSON object per line on the daemon socket.
/// The `op` tag selects the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RpcRequest {
    SessionStart {
        session_id: String,
        cwd: String,
        started_ms: i64,
        #[serde(default)]
        shell: Option<String>,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        user: Option<String>,
        /// Incognito sessions ingest nothing and receive no suggestions.
        #[serde(default)]
        incognito: bool,
    },
    SessionEnd {
        session_id: String,
        #[serde(default)]
        ended_ms: Option<i64>,
    },
    CommandStart {
        session_id: String,
        command_id: String,
        cwd: String,
        command: String,
        ts_ms: i64,
        #[serde(default)]
        repo_key: Option<String>,
        #[serde(default)]
        branch: Option<String>,
        #[serde(default)]
        ephemeral: bool,
    },
    CommandEnd {
        session_id: String,
        command_id: String,
        exit_code: i32,
        duration_ms: i64,
        ts_ms: i64,
    },
    Suggest {
        session_id: String,
        cwd: String,
        #[serde(default)]
        buffer: String,
        #[serde(default)]
        max_results: Option<usize>,
        #[serde(default)]
        last_template_id: Option<String>,
        /// Client-side budget; the server derives its deadline from this.
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    QueryCommands {
        #[serde(flatten)]
        filter: QueryFilter,
    },
    ImportHistory {
        shell: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default = "default_true")]
        skip_if_imported: bool,
        #[serde(default)]
        force: bool,
    },
    Feedback {
        session_id: String,
        suggestion_text: String,
        action: FeedbackAction,
    },
    Health {},
}

fn default_true() -> bool {
    true
}

impl RpcRequest {
    /// Operation name used by the access log.
    pub fn op_name(&self) -> &'static str {
        match self {
            RpcRequest::SessionStart { .. } => "session_start",
            RpcRequest::SessionEnd { .. } => "session_end",
            RpcRequest::CommandStart { .. } => "command_start",
            RpcRequest::CommandEnd { .. } => "command_end",
            RpcRequest::Suggest { .. } => "suggest",
            RpcRequest::QueryCommands { .. } => "query_commands",
            RpcRequest::ImportHistory { .. } => "import_history",
            RpcRequest::Feedback { .. } => "feedback",
            RpcRequest::Health {} => "health",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub kind: String,
    pub message: String,
}

impl From<&ServiceError> for WireError {
    fn from(err: &ServiceError) -> Self {
        WireError {
            kind: err.kind().to_string(),
            message: err.message().to_string(),
        }
    }
}

impl From<WireError> for ServiceError {
    fn from(err: WireError) -> Self {
        ServiceError::from_kind(&err.kind, err.message)
    }
}

/// Envelope for every reply line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl WireResponse {
    pub fn ok(data: Value) -> Self {
        WireResponse {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(err: &ServiceError) -> Self {
        WireResponse {
            ok: false,
            data: None,
            error: Some(err.into()),
        }
    }
}

/// Fire-and-forget event record on the shim path. Same socket as RPC; a
/// line with a `type` field is a shim event. Unknown types and malformed
/// lines are skipped by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShimEvent {
    SessionStart {
        session_id: String,
        #[serde(default)]
        cwd: String,
        #[serde(default)]
        started_ms: Option<i64>,
        #[serde(default)]
        shell: Option<String>,
    },
    SessionEnd {
        session_id: String,
        #[serde(default)]
        ended_ms: Option<i64>,
    },
    CommandStart {
        session_id: String,
        command_id: String,
        #[serde(default)]
        cwd: String,
        command: String,
        #[serde(default)]
        ts_ms: Option<i64>,
        #[serde(default)]
        ephemeral: bool,
    },
    CommandEnd {
        session_id: String,
        command_id: String,
        exit_code: i32,
        #[serde(default)]
        duration_ms: Option<i64>,
        #[serde(default)]
        ts_ms: Option<i64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_request_parses_by_op_tag() {
        let line = r#"{"op":"suggest","session_id":"s1","cwd":"/tmp","buffer":"gi"}"#;
        let req: RpcRequest = serde_json::from_str(line).unwrap();
        match req {
            RpcRequest::Suggest {
                session_id, buffer, ..
            } => {
                assert_eq!(session_id, "s1");
                assert_eq!(buffer, "gi");
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn shim_event_parses_by_type_tag() {
        let line = r#"{"type":"command_end","session_id":"s1","command_id":"c1","exit_code":0}"#;
        let event: ShimEvent = serde_json::from_str(line).unwrap();
        assert!(matches!(event, ShimEvent::CommandEnd { exit_code: 0, .. }));
    }

    #[test]
    fn unknown_shim_type_is_an_error() {
        let line = r#"{"type":"warp_drive","session_id":"s1"}"#;
        assert!(serde_json::from_str::<ShimEvent>(line).is_err());
    }

    #[test]
    fn query_commands_flattens_filter() {
        let line = r#"{"op":"query_commands","prefix":"git","limit":5}"#;
        let req: RpcRequest = serde_json::from_str(line).unwrap();
        match req {
            RpcRequest::QueryCommands { filter } => {
                assert_eq!(filter.prefix.as_deref(), Some("git"));
                assert_eq!(filter.limit, 5);
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn wire_response_omits_empty_fields() {
        let resp = WireResponse::ok(serde_json::json!({"n": 1}));
        let text = serde_json::to_string(&resp).unwrap();
        assert!(!text.contains("error"));
    }
}
