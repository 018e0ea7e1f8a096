use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::GitConfig;

/// Git state for one working directory. A failed or absent git lookup is
/// simply `is_repo == false`; the ranker falls back to non-repo scopes.
#[derive(Debug, Clone, Default)]
pub struct RepoInfo {
    pub is_repo: bool,
    pub repo_key: Option<String>,
    pub root: Option<PathBuf>,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub dirty: bool,
}

struct CachedInfo {
    info: RepoInfo,
    fetched_at: Instant,
}

/// TTL cache over git subprocess lookups, keyed by cwd. Lookups happen on
/// the ingest writer and suggest readers; the hard subprocess timeout keeps
/// a wedged git from stalling either.
pub struct GitContext {
    cache: Mutex<HashMap<PathBuf, CachedInfo>>,
    ttl: Duration,
    command_timeout: Duration,
}

impl GitContext {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            ttl: Duration::from_millis(config.cache_ttl_ms),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        }
    }

    pub fn lookup(&self, cwd: &Path) -> RepoInfo {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.get(cwd) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return cached.info.clone();
                }
            }
        }

        let info = self.compute(cwd);
        let mut cache = self.cache.lock().unwrap();
        cache.insert(
            cwd.to_path_buf(),
            CachedInfo {
                info: info.clone(),
                fetched_at: Instant::now(),
            },
        );
        info
    }

    /// Drop the cached entry for a cwd. Called when a `command_start`
    /// begins with `git` or `gh`, since the command may change repo state.
    pub fn invalidate(&self, cwd: &Path) {
        self.cache.lock().unwrap().remove(cwd);
    }

    fn compute(&self, cwd: &Path) -> RepoInfo {
        let Some(root_out) = self.run_git(cwd, &["rev-parse", "--show-toplevel"]) else {
            return RepoInfo::default();
        };
        let root_raw = root_out.trim();
        if root_raw.is_empty() {
            return RepoInfo::default();
        }
        let root = clai_core::normalize_path(Path::new(root_raw));

        let remote = self
            .run_git(cwd, &["remote", "get-url", "origin"])
            .map(|out| out.trim().to_string())
            .filter(|url| !url.is_empty());

        let branch = self
            .run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])
            .map(|out| out.trim().to_string())
            .filter(|b| !b.is_empty());

        let dirty = self
            .run_git(cwd, &["status", "--porcelain"])
            .map(|out| !out.trim().is_empty())
            .unwrap_or(false);

        let repo_key = match &remote {
            Some(url) => clai_core::remote_repo_key(url, &root),
            None => clai_core::local_repo_key(&root),
        };

        RepoInfo {
            is_repo: true,
            repo_key: Some(repo_key),
            root: Some(root),
            remote,
            branch,
            dirty,
        }
    }

    /// Run git with a hard timeout. Returns stdout on success, None on
    /// failure, non-zero exit, or timeout.
    fn run_git(&self, cwd: &Path, args: &[&str]) -> Option<String> {
        let mut child = Command::new("git")
            .arg("-C")
            .arg(cwd)
            .args(args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .stdin(std::process::Stdio::null())
            .spawn()
            .ok()?;

        let deadline = Instant::now() + self.command_timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        return None;
                    }
                    let mut output = String::new();
                    use std::io::Read;
                    child.stdout.take()?.read_to_string(&mut output).ok()?;
                    return Some(output);
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        debug!(args = ?args, "git timed out; killing");
                        let _ = child.kill();
                        let _ = child.wait();
                        return None;
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(_) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
            }
        }
    }
}

/// First command token is a git-family tool whose execution may move
/// branches or remotes.
pub fn invalidates_git_cache(cmd: &str) -> bool {
    matches!(
        cmd.trim_start().split_whitespace().next(),
        Some("git") | Some("gh")
    )
}
