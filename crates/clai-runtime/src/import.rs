use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use clai_normalize::Normalizer;
use clai_store::{EventApply, NewCommandEvent};
use clai_types::{Scope, ServiceError, ServiceResult};

use crate::storage::StoreHandle;

/// One parsed history entry. Timestamps and durations are best-effort;
/// plain bash history has neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub command: String,
    pub ts_ms: Option<i64>,
    pub duration_ms: Option<i64>,
}

/// Parse plain (bash) history: one command per line.
pub fn parse_bash_history(content: &str) -> Vec<HistoryEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| HistoryEntry {
            command: line.to_string(),
            ts_ms: None,
            duration_ms: None,
        })
        .collect()
}

/// Parse zsh extended history: `: <epoch>:<duration>;<command>`, where a
/// trailing backslash continues the command on the next line. Plain lines
/// (non-extended setups) are accepted too.
pub fn parse_zsh_history(content: &str) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = Vec::new();
    let mut continuation = false;

    for line in content.lines() {
        if continuation {
            if let Some(last) = entries.last_mut() {
                let trimmed = line.strip_suffix('\\').unwrap_or(line);
                last.command.push('\n');
                last.command.push_str(trimmed);
                continuation = line.ends_with('\\');
            }
            continue;
        }

        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(": ") {
            if let Some((meta, command)) = rest.split_once(';') {
                let mut parts = meta.splitn(2, ':');
                let epoch: Option<i64> = parts.next().and_then(|s| s.trim().parse().ok());
                let duration: Option<i64> = parts.next().and_then(|s| s.trim().parse().ok());

                let continued = command.ends_with('\\');
                let command = command.strip_suffix('\\').unwrap_or(command);
                if !command.trim().is_empty() {
                    entries.push(HistoryEntry {
                        command: command.to_string(),
                        ts_ms: epoch.map(|e| e * 1000),
                        duration_ms: duration.map(|d| d * 1000),
                    });
                    continuation = continued;
                }
                continue;
            }
        }

        entries.push(HistoryEntry {
            command: line.to_string(),
            ts_ms: None,
            duration_ms: None,
        });
    }

    entries
}

/// Parse fish history (YAML-ish): `- cmd: <command>` followed by optional
/// `  when: <epoch>` lines.
pub fn parse_fish_history(content: &str) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = Vec::new();

    for line in content.lines() {
        if let Some(command) = line.strip_prefix("- cmd: ") {
            let command = command.trim();
            if !command.is_empty() {
                entries.push(HistoryEntry {
                    command: command.to_string(),
                    ts_ms: None,
                    duration_ms: None,
                });
            }
        } else if let Some(when) = line.trim_start().strip_prefix("when: ") {
            if let (Some(last), Ok(epoch)) = (entries.last_mut(), when.trim().parse::<i64>()) {
                last.ts_ms = Some(epoch * 1000);
            }
        }
    }

    entries
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: bool,
}

/// Bulk-import shell history into the store under a synthetic session.
/// Imports are idempotent per shell: a meta marker short-circuits repeats
/// unless forced.
pub struct HistoryImporter<'a> {
    pub store: &'a StoreHandle,
    pub normalizer: &'a Normalizer,
    pub tuning: clai_store::AggregateTuning,
}

impl HistoryImporter<'_> {
    pub fn import(
        &self,
        shell: &str,
        path: Option<&str>,
        skip_if_imported: bool,
        force: bool,
        now_ms: i64,
    ) -> ServiceResult<ImportResult> {
        let marker = format!("import:{}", shell);
        if skip_if_imported && !force {
            let already = self
                .store
                .write(|store| store.meta_get(&marker))
                .map_err(unavailable)?;
            if already.is_some() {
                return Ok(ImportResult {
                    imported: 0,
                    skipped: true,
                });
            }
        }

        let path = match path {
            Some(p) => PathBuf::from(p),
            None => default_history_path(shell)?,
        };
        let content = std::fs::read_to_string(&path).map_err(|err| {
            ServiceError::InvalidArgument(format!(
                "cannot read history file {}: {}",
                path.display(),
                err
            ))
        })?;

        let entries = match shell {
            "bash" | "sh" => parse_bash_history(&content),
            "zsh" => parse_zsh_history(&content),
            "fish" => parse_fish_history(&content),
            other => {
                return Err(ServiceError::InvalidArgument(format!(
                    "unsupported shell for import: {}",
                    other
                )))
            }
        };

        let session_id = format!("history-import-{}", shell);
        let scopes = vec![Scope::Global.key(), Scope::Session(session_id.clone()).key()];
        let mut imported = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            let normalized = self.normalizer.normalize(&entry.command);
            if normalized.cmd_norm.is_empty() {
                continue;
            }
            // Synthetic spacing keeps per-entry order without real clocks.
            let ts_ms = entry
                .ts_ms
                .unwrap_or(now_ms - (entries.len() - index) as i64 * 1000);

            let apply = EventApply {
                event: NewCommandEvent {
                    session_id: session_id.clone(),
                    command_id: format!("import-{}", index),
                    ts_ms,
                    cwd: String::new(),
                    repo_key: None,
                    branch: None,
                    cmd_raw: normalized.cmd_raw.clone(),
                    cmd_norm: normalized.cmd_norm.clone(),
                    cmd_truncated: normalized.cmd_truncated,
                    template_id: normalized.template_id.clone(),
                    exit_code: None,
                    duration_ms: entry.duration_ms,
                },
                slots: normalized.slots.clone(),
                prev_template_id: None,
                scopes: scopes.clone(),
                tuning: self.tuning,
                defer_decay: true,
            };
            let outcome = self
                .store
                .write(|store| store.apply_command_end(&apply))
                .map_err(unavailable)?;
            if matches!(outcome, clai_store::ApplyOutcome::Applied(_)) {
                imported += 1;
            }
        }

        self.store
            .write(|store| store.meta_set(&marker, &now_ms.to_string()))
            .map_err(unavailable)?;

        info!(shell, imported, "history import complete");
        Ok(ImportResult {
            imported,
            skipped: false,
        })
    }
}

fn default_history_path(shell: &str) -> ServiceResult<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        ServiceError::InvalidArgument("no HOME directory for history lookup".to_string())
    })?;
    let path = match shell {
        "bash" | "sh" => home.join(".bash_history"),
        "zsh" => home.join(".zsh_history"),
        "fish" => home.join(".local/share/fish/fish_history"),
        other => {
            return Err(ServiceError::InvalidArgument(format!(
                "unsupported shell for import: {}",
                other
            )))
        }
    };
    Ok(path)
}

fn unavailable(err: clai_store::Error) -> ServiceError {
    ServiceError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_lines_become_entries() {
        let entries = parse_bash_history("git status\n\nls -la\n#comment\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "git status");
        assert!(entries[0].ts_ms.is_none());
    }

    #[test]
    fn zsh_extended_format_parses_meta() {
        let content = ": 1700000000:2;git status\n: 1700000005:0;ls -la\n";
        let entries = parse_zsh_history(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "git status");
        assert_eq!(entries[0].ts_ms, Some(1_700_000_000_000));
        assert_eq!(entries[0].duration_ms, Some(2_000));
    }

    #[test]
    fn zsh_multiline_continuation_is_joined() {
        let content = ": 1700000000:0;echo one \\\ntwo\n: 1700000001:0;ls\n";
        let entries = parse_zsh_history(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "echo one \ntwo");
        assert_eq!(entries[1].command, "ls");
    }

    #[test]
    fn zsh_plain_lines_still_parse() {
        let entries = parse_zsh_history("git status\nls\n");
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ts_ms.is_none());
    }

    #[test]
    fn fish_blocks_parse_cmd_and_when() {
        let content = "- cmd: git status\n  when: 1700000000\n- cmd: ls -la\n  when: 1700000005\n";
        let entries = parse_fish_history(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "git status");
        assert_eq!(entries[0].ts_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn import_is_idempotent_via_marker() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history");
        std::fs::write(&history, "git status\nls -la\n").unwrap();

        let store = StoreHandle::open_in_memory().unwrap();
        let normalizer = Normalizer::default();
        let importer = HistoryImporter {
            store: &store,
            normalizer: &normalizer,
            tuning: clai_store::AggregateTuning::default(),
        };

        let first = importer
            .import("bash", Some(history.to_str().unwrap()), true, false, 1_000_000)
            .unwrap();
        assert_eq!(first.imported, 2);
        assert!(!first.skipped);

        let second = importer
            .import("bash", Some(history.to_str().unwrap()), true, false, 2_000_000)
            .unwrap();
        assert_eq!(second.imported, 0);
        assert!(second.skipped);

        let third = importer
            .import("bash", Some(history.to_str().unwrap()), true, true, 3_000_000)
            .unwrap();
        assert!(!third.skipped);
        // Same command ids: replays are duplicates, not double counts.
        assert_eq!(third.imported, 0);

        let stats = store
            .read(|s| s.top_stats("global", None, 10))
            .unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].success_count + stats[0].failure_count, 0);
    }
}
