use std::path::Path;

/// Marker-file probes for project kinds. The kind strings become
/// `project_type:<kind>` scope keys, so they must stay stable.
const MARKERS: &[(&str, &str)] = &[
    ("Cargo.toml", "rust"),
    ("package.json", "node"),
    ("go.mod", "go"),
    ("pyproject.toml", "python"),
    ("setup.py", "python"),
    ("requirements.txt", "python"),
    ("Gemfile", "ruby"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("Makefile", "make"),
    ("Dockerfile", "docker"),
];

/// Detect project kinds by marker files in `cwd`. Deduplicated, in marker
/// order for stable scope keys.
pub fn detect_project_types(cwd: &Path) -> Vec<String> {
    let mut kinds: Vec<String> = Vec::new();
    for (marker, kind) in MARKERS {
        if cwd.join(marker).exists() && !kinds.iter().any(|k| k == kind) {
            kinds.push((*kind).to_string());
        }
    }
    kinds
}

/// A runnable task declared by the project itself (scripts, targets,
/// standard tool verbs). These feed the task boost and are suggested even
/// with no history behind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTask {
    pub command: String,
}

/// Discover declared tasks for the detected kinds.
pub fn discover_tasks(cwd: &Path, kinds: &[String]) -> Vec<ProjectTask> {
    let mut tasks: Vec<ProjectTask> = Vec::new();
    let mut push = |command: String| {
        if !tasks.iter().any(|t| t.command == command) {
            tasks.push(ProjectTask { command });
        }
    };

    for kind in kinds {
        match kind.as_str() {
            "rust" => {
                for verb in ["build", "test", "run", "check", "fmt", "clippy"] {
                    push(format!("cargo {}", verb));
                }
            }
            "node" => {
                for script in package_json_scripts(cwd) {
                    push(format!("npm run {}", script));
                }
            }
            "go" => {
                for verb in ["build ./...", "test ./...", "vet ./..."] {
                    push(format!("go {}", verb));
                }
            }
            "make" => {
                for target in makefile_targets(cwd) {
                    push(format!("make {}", target));
                }
            }
            _ => {}
        }
    }

    tasks
}

fn package_json_scripts(cwd: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(cwd.join("package.json")) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
        return Vec::new();
    };
    let Some(scripts) = value.get("scripts").and_then(|s| s.as_object()) else {
        return Vec::new();
    };
    let mut names: Vec<String> = scripts.keys().cloned().collect();
    names.sort();
    names
}

fn makefile_targets(cwd: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(cwd.join("Makefile")) else {
        return Vec::new();
    };

    let mut targets = Vec::new();
    for line in content.lines() {
        // Plain targets only: no indentation, no pattern rules, no specials.
        if line.starts_with(char::is_whitespace) || line.starts_with('.') || line.starts_with('#')
        {
            continue;
        }
        let Some((name, _)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty()
            || name.contains(char::is_whitespace)
            || name.contains('$')
            || name.contains('%')
            || name.contains('=')
        {
            continue;
        }
        if !targets.iter().any(|t| t == name) {
            targets.push(name.to_string());
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kinds_from_markers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        std::fs::write(dir.path().join("Makefile"), "build:\n\tcargo build\n").unwrap();

        let kinds = detect_project_types(dir.path());
        assert_eq!(kinds, vec!["rust".to_string(), "make".to_string()]);
    }

    #[test]
    fn empty_dir_has_no_kinds() {
        let dir = tempfile::tempdir().unwrap();
        assert!(detect_project_types(dir.path()).is_empty());
    }

    #[test]
    fn npm_scripts_become_tasks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name":"x","scripts":{"test":"jest","lint":"eslint ."}}"#,
        )
        .unwrap();

        let tasks = discover_tasks(dir.path(), &["node".to_string()]);
        let commands: Vec<&str> = tasks.iter().map(|t| t.command.as_str()).collect();
        assert_eq!(commands, vec!["npm run lint", "npm run test"]);
    }

    #[test]
    fn makefile_targets_become_tasks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Makefile"),
            ".PHONY: all\nall: build\nbuild:\n\tcc main.c\n%.o: %.c\n\tcc -c $<\nVAR=1\n",
        )
        .unwrap();

        let tasks = discover_tasks(dir.path(), &["make".to_string()]);
        let commands: Vec<&str> = tasks.iter().map(|t| t.command.as_str()).collect();
        assert_eq!(commands, vec!["make all", "make build"]);
    }

    #[test]
    fn cargo_kinds_get_standard_verbs() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = discover_tasks(dir.path(), &["rust".to_string()]);
        assert!(tasks.iter().any(|t| t.command == "cargo build"));
        assert!(tasks.iter().any(|t| t.command == "cargo test"));
    }
}
