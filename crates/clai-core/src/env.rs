//! Environment toggles read by hooks and the daemon. A toggle counts as set
//! when the variable is non-empty and not "0".

pub const ENV_HOME: &str = "CLAI_HOME";
pub const ENV_CACHE: &str = "CLAI_CACHE";
pub const ENV_SOCKET: &str = "CLAI_SOCKET";
pub const ENV_DAEMON_PATH: &str = "CLAI_DAEMON_PATH";
pub const ENV_SESSION_ID: &str = "CLAI_SESSION_ID";
pub const ENV_NO_RECORD: &str = "CLAI_NO_RECORD";
pub const ENV_EPHEMERAL: &str = "CLAI_EPHEMERAL";
pub const ENV_OFF: &str = "CLAI_OFF";

fn flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !value.is_empty() && value != "0",
        Err(_) => false,
    }
}

/// CLAI_NO_RECORD: skip ingest entirely.
pub fn recording_disabled() -> bool {
    flag(ENV_NO_RECORD)
}

/// CLAI_EPHEMERAL: ingest but do not persist beyond session memory.
pub fn ephemeral_requested() -> bool {
    flag(ENV_EPHEMERAL)
}

/// CLAI_OFF: disable suggestions.
pub fn suggestions_disabled() -> bool {
    flag(ENV_OFF)
}

/// CLAI_SESSION_ID: session identity exported by the shell hooks.
pub fn session_id_from_env() -> Option<String> {
    std::env::var(ENV_SESSION_ID).ok().filter(|s| !s.is_empty())
}

/// CLAI_DAEMON_PATH: explicit daemon binary for hook-spawned restarts.
pub fn daemon_path_override() -> Option<String> {
    std::env::var(ENV_DAEMON_PATH)
        .ok()
        .filter(|s| !s.is_empty())
}
