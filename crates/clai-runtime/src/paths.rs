use std::path::{Path, PathBuf};

use crate::Result;

/// Resolved on-disk layout for one daemon instance.
#[derive(Debug, Clone)]
pub struct ClaiPaths {
    pub home: PathBuf,
    pub cache: PathBuf,
}

impl ClaiPaths {
    /// Resolve from an optional explicit home (tests pass a temp dir;
    /// production resolves through CLAI_HOME / XDG).
    pub fn resolve(explicit_home: Option<&str>) -> Result<Self> {
        let home = clai_core::resolve_home_path(explicit_home)?;
        let cache = clai_core::resolve_cache_path(&home);
        Ok(Self { home, cache })
    }

    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let cache = home.join("cache");
        Self { home, cache }
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.yaml")
    }

    pub fn db_file(&self) -> PathBuf {
        self.home.join("state.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir().join("daemon.log")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.home.join("daemon.pid")
    }

    pub fn socket_file(&self) -> PathBuf {
        clai_core::resolve_socket_path(&self.cache)
    }

    /// Create the home/cache/log directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.home)?;
        std::fs::create_dir_all(&self.cache)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

impl AsRef<Path> for ClaiPaths {
    fn as_ref(&self) -> &Path {
        &self.home
    }
}
