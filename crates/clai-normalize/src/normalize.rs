use serde::Serialize;
use sha2::{Digest, Sha256};

use clai_types::{SlotKind, SlotValue};

use crate::alias::AliasMap;
use crate::sanitize::{collapse_whitespace, sanitize_raw};
use crate::slots::classify_token;
use crate::token::tokenize;

/// Stable template id: first 32 hex chars (128 bits) of SHA-256 over
/// `cmd_norm`.
pub fn template_id_for(cmd_norm: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cmd_norm.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Alias expansion gate; off by default so normalization stays
    /// deterministic without captured shell state.
    pub expand_aliases: bool,
    pub aliases: AliasMap,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            expand_aliases: false,
            aliases: AliasMap::default(),
        }
    }
}

/// Output of one normalization pass.
#[derive(Debug, Clone, Serialize)]
pub struct Normalized {
    pub cmd_raw: String,
    pub cmd_truncated: bool,
    pub cmd_norm: String,
    pub template_id: String,
    pub slots: Vec<SlotValue>,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Normalize raw bytes straight off the wire.
    pub fn normalize_bytes(&self, raw: &[u8]) -> Normalized {
        let (sanitized, truncated) = sanitize_raw(raw);
        self.normalize_sanitized(sanitized, truncated)
    }

    /// Normalize text that is already valid UTF-8 (still sanitized for
    /// control characters and the size cap).
    pub fn normalize(&self, raw: &str) -> Normalized {
        self.normalize_bytes(raw.as_bytes())
    }

    fn normalize_sanitized(&self, sanitized: String, truncated: bool) -> Normalized {
        let collapsed = collapse_whitespace(&sanitized);

        let mut tokens = tokenize(&collapsed);
        if self.options.expand_aliases && !self.options.aliases.is_empty() {
            tokens = self.options.aliases.expand(tokens);
        }

        let mut slots: Vec<SlotValue> = Vec::new();
        let mut normalized_tokens: Vec<String> = Vec::with_capacity(tokens.len());

        for (index, token) in tokens.into_iter().enumerate() {
            match classify_token(&token) {
                Some(kind) => {
                    normalized_tokens.push(kind.placeholder().to_string());
                    slots.push(SlotValue {
                        index,
                        kind,
                        value: token,
                    });
                }
                None => normalized_tokens.push(token),
            }
        }

        let cmd_norm = normalized_tokens.join(" ");
        let template_id = template_id_for(&cmd_norm);

        Normalized {
            cmd_raw: sanitized,
            cmd_truncated: truncated,
            cmd_norm,
            template_id,
            slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(cmd: &str) -> Normalized {
        Normalizer::default().normalize(cmd)
    }

    #[test]
    fn paths_and_ints_become_slots() {
        let result = norm("head -n 20 /var/log/syslog");
        assert_eq!(result.cmd_norm, "head -n <INT> <PATH>");
        assert_eq!(result.slots.len(), 2);
        assert_eq!(result.slots[0].kind, SlotKind::Int);
        assert_eq!(result.slots[0].value, "20");
        assert_eq!(result.slots[1].kind, SlotKind::Path);
        assert_eq!(result.slots[1].value, "/var/log/syslog");
    }

    #[test]
    fn subcommands_survive() {
        let result = norm("git commit -m 'fix parser'");
        assert_eq!(result.cmd_norm, "git commit -m <STR>");
    }

    #[test]
    fn template_id_is_stable_and_short() {
        let a = norm("git checkout a1b2c3d");
        let b = norm("git   checkout    a1b2c3d");
        assert_eq!(a.template_id, b.template_id);
        assert_eq!(a.template_id.len(), 32);
        assert!(a.template_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_slot_values_share_a_template() {
        let a = norm("git checkout a1b2c3d");
        let b = norm("git checkout 99fe001");
        assert_eq!(a.cmd_norm, "git checkout <HEX>");
        assert_eq!(a.template_id, b.template_id);
        assert_ne!(a.slots[0].value, b.slots[0].value);
    }

    #[test]
    fn normalization_is_idempotent() {
        for cmd in [
            "git checkout a1b2c3d",
            "curl https://example.com/x.tar.gz",
            "head -n 20 /var/log/syslog",
            "echo 'hello world'",
            "git status",
        ] {
            let once = norm(cmd);
            let twice = norm(&once.cmd_norm);
            assert_eq!(once.template_id, twice.template_id, "cmd: {}", cmd);
            assert_eq!(once.cmd_norm, twice.cmd_norm, "cmd: {}", cmd);
        }
    }

    #[test]
    fn alias_expansion_is_gated() {
        let mut entries = std::collections::HashMap::new();
        entries.insert("gs".to_string(), "git status".to_string());
        let aliases = AliasMap::new(entries);

        let off = Normalizer::default().normalize("gs");
        assert_eq!(off.cmd_norm, "gs");

        let on = Normalizer::new(NormalizeOptions {
            expand_aliases: true,
            aliases,
        })
        .normalize("gs");
        assert_eq!(on.cmd_norm, "git status");
    }

    #[test]
    fn slot_indices_point_into_normalized_tokens() {
        let result = norm("cp /a/b /c/d");
        assert_eq!(result.cmd_norm, "cp <PATH> <PATH>");
        assert_eq!(result.slots[0].index, 1);
        assert_eq!(result.slots[1].index, 2);
    }

    #[test]
    fn empty_command_normalizes_to_empty() {
        let result = norm("   ");
        assert_eq!(result.cmd_norm, "");
        assert!(result.slots.is_empty());
        // Even the empty template has a stable id.
        assert_eq!(result.template_id, template_id_for(""));
    }
}
