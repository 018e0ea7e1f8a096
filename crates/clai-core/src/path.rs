use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Resolve the clai base directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. CLAI_HOME environment variable (with tilde expansion)
/// 3. System data directory (recommended default)
/// 4. ~/.clai (fallback for systems without a standard data directory)
pub fn resolve_home_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var(crate::env::ENV_HOME) {
        if !env_path.is_empty() {
            return Ok(expand_tilde(&env_path));
        }
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("clai"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".clai"));
    }

    Err(Error::Config(
        "Could not determine base path: no HOME directory or system data directory found"
            .to_string(),
    ))
}

/// Resolve the cache directory (suggestion cache, sockets):
/// CLAI_CACHE, else system cache dir, else `<home>/cache`.
pub fn resolve_cache_path(home: &Path) -> PathBuf {
    if let Ok(env_path) = std::env::var(crate::env::ENV_CACHE) {
        if !env_path.is_empty() {
            return expand_tilde(&env_path);
        }
    }

    if let Some(cache_dir) = dirs::cache_dir() {
        return cache_dir.join("clai");
    }

    home.join("cache")
}

/// Resolve the daemon socket path: CLAI_SOCKET, else `<cache>/clai.sock`.
pub fn resolve_socket_path(cache: &Path) -> PathBuf {
    if let Ok(env_path) = std::env::var(crate::env::ENV_SOCKET) {
        if !env_path.is_empty() {
            return expand_tilde(&env_path);
        }
    }

    cache.join("clai.sock")
}

/// Expand tilde (~) in paths to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Normalize a path for scope keying (resolve to absolute, canonicalize if
/// possible). Canonicalization keeps `dir:` scopes stable across symlinked
/// spellings of the same directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// Repository key for a repo with a remote:
/// `sha256(lower(remote_url) + "|" + canonical_root)`.
pub fn remote_repo_key(remote_url: &str, canonical_root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(remote_url.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_root.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Repository key for a repo without a remote:
/// `sha256("local|" + canonical_root)`.
pub fn local_repo_key(canonical_root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"local|");
    hasher.update(canonical_root.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_key_is_case_insensitive_on_url() {
        let root = Path::new("/home/dev/project");
        let a = remote_repo_key("https://GitHub.com/Org/Repo.git", root);
        let b = remote_repo_key("https://github.com/org/repo.git", root);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn remote_and_local_keys_differ_for_same_root() {
        let root = Path::new("/home/dev/project");
        let remote = remote_repo_key("https://github.com/org/repo.git", root);
        let local = local_repo_key(root);
        assert_ne!(remote, local);
    }

    #[test]
    fn local_key_distinguishes_roots() {
        assert_ne!(
            local_repo_key(Path::new("/a")),
            local_repo_key(Path::new("/b"))
        );
    }

    #[test]
    fn normalize_path_resolves_symlinked_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let normalized = normalize_path(dir.path());
        // Canonical form of an existing dir is itself canonical.
        assert_eq!(normalize_path(&normalized), normalized);
    }

    #[test]
    fn expand_tilde_passes_through_absolute() {
        assert_eq!(expand_tilde("/usr/bin"), PathBuf::from("/usr/bin"));
    }
}
