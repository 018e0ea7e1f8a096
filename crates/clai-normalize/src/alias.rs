use std::collections::HashMap;

/// Maximum alias expansion depth. Guards against definition cycles
/// (`alias ll='ls -l'; alias ls='ll'`).
const MAX_EXPANSION_DEPTH: usize = 3;

/// Per-shell alias table captured once at session start via `<shell> -ic
/// alias`. Expansion itself is pure; only the capture touches the system.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    entries: HashMap<String, String>,
}

impl AliasMap {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Parse the output of the POSIX `alias` builtin. Accepts both
    /// `name='value'` and bash's `alias name='value'` prefix form; lines
    /// that do not look like definitions are skipped.
    pub fn parse_alias_output(output: &str) -> Self {
        let mut entries = HashMap::new();

        for line in output.lines() {
            let line = line.trim();
            let line = line.strip_prefix("alias ").unwrap_or(line);
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .unwrap_or(value);
            if !value.is_empty() {
                entries.insert(name.to_string(), value.to_string());
            }
        }

        Self { entries }
    }

    /// Expand the head token of a token list, bounded by
    /// `MAX_EXPANSION_DEPTH`. Returns the (possibly rewritten) token list.
    pub fn expand(&self, mut tokens: Vec<String>) -> Vec<String> {
        if self.entries.is_empty() {
            return tokens;
        }

        for _ in 0..MAX_EXPANSION_DEPTH {
            let Some(head) = tokens.first() else {
                return tokens;
            };
            let Some(expansion) = self.entries.get(head) else {
                return tokens;
            };
            let mut expanded: Vec<String> = crate::token::tokenize(expansion);
            if expanded.first().map(String::as_str) == Some(head.as_str()) {
                // Self-referential alias (`alias ls='ls --color'`): splice
                // once and stop.
                expanded.extend(tokens.into_iter().skip(1));
                return expanded;
            }
            expanded.extend(tokens.into_iter().skip(1));
            tokens = expanded;
        }

        tokens
    }
}
