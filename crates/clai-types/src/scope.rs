use serde::{Deserialize, Serialize};

/// An aggregation bucket. The canonical string key is what lands in the
/// store; cross-session learning only flows through the non-session scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Session(String),
    Repo(String),
    Dir(String),
    ProjectType(String),
}

impl Scope {
    /// Canonical scope key, e.g. `session:abc` or `dir:/home/dev/src`.
    pub fn key(&self) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::Session(id) => format!("session:{}", id),
            Scope::Repo(key) => format!("repo:{}", key),
            Scope::Dir(path) => format!("dir:{}", path),
            Scope::ProjectType(kind) => format!("project_type:{}", kind),
        }
    }

    /// Parse a canonical scope key back into a scope.
    pub fn parse(key: &str) -> Option<Scope> {
        if key == "global" {
            return Some(Scope::Global);
        }
        let (prefix, rest) = key.split_once(':')?;
        if rest.is_empty() {
            return None;
        }
        match prefix {
            "session" => Some(Scope::Session(rest.to_string())),
            "repo" => Some(Scope::Repo(rest.to_string())),
            "dir" => Some(Scope::Dir(rest.to_string())),
            "project_type" => Some(Scope::ProjectType(rest.to_string())),
            _ => None,
        }
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Scope::Session(_))
    }
}
