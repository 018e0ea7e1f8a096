mod env;
mod path;

pub use env::{
    daemon_path_override, ephemeral_requested, recording_disabled, session_id_from_env,
    suggestions_disabled, ENV_CACHE, ENV_DAEMON_PATH, ENV_EPHEMERAL, ENV_HOME, ENV_NO_RECORD,
    ENV_OFF, ENV_SESSION_ID, ENV_SOCKET,
};
pub use path::{
    expand_tilde, local_repo_key, normalize_path, remote_repo_key, resolve_cache_path,
    resolve_home_path, resolve_socket_path, Error, Result,
};
