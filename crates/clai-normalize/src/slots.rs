use clai_types::SlotKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// One slot-replacement rule. Rules form a fixed ordered registry; the
/// first rule whose `applies` returns a kind wins.
#[derive(Debug, Clone, Copy)]
pub struct SlotRule {
    pub rule_id: &'static str,
    pub applies: fn(&str) -> Option<SlotKind>,
}

/// Subcommand words of common tools that must survive normalization as
/// literals even when a rule would otherwise match.
static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "add", "apply", "branch", "build", "checkout", "clean", "clone", "commit", "config",
        "diff", "exec", "fetch", "fmt", "init", "install", "list", "log", "merge", "pull", "push",
        "rebase", "remove", "reset", "restart", "restore", "run", "show", "start", "stash",
        "status", "stop", "switch", "test", "uninstall", "update", "upgrade", "watch",
    ]
    .into_iter()
    .collect()
});

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static HEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").unwrap());
static BLOB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=_-]{32,}$").unwrap());

fn path_rule(token: &str) -> Option<SlotKind> {
    if token.len() > 1 && (token.starts_with('/') || token.starts_with("~/")) {
        Some(SlotKind::Path)
    } else {
        None
    }
}

fn int_rule(token: &str) -> Option<SlotKind> {
    INT_RE.is_match(token).then_some(SlotKind::Int)
}

fn hex_rule(token: &str) -> Option<SlotKind> {
    // Git SHA-ish: hex alphabet, abbreviation length through full id.
    HEX_RE.is_match(token).then_some(SlotKind::Hex)
}

fn url_rule(token: &str) -> Option<SlotKind> {
    URL_RE.is_match(token).then_some(SlotKind::Url)
}

fn str_rule(token: &str) -> Option<SlotKind> {
    let bytes = token.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        Some(SlotKind::Str)
    } else {
        None
    }
}

fn blob_rule(token: &str) -> Option<SlotKind> {
    // Long base64/hex payloads. The leading-dash guard keeps long option
    // names literal.
    if !token.starts_with('-') && BLOB_RE.is_match(token) {
        Some(SlotKind::Blob)
    } else {
        None
    }
}

static REGISTRY: &[SlotRule] = &[
    SlotRule {
        rule_id: "abs_path",
        applies: path_rule,
    },
    SlotRule {
        rule_id: "int",
        applies: int_rule,
    },
    SlotRule {
        rule_id: "hex",
        applies: hex_rule,
    },
    SlotRule {
        rule_id: "url",
        applies: url_rule,
    },
    SlotRule {
        rule_id: "quoted_str",
        applies: str_rule,
    },
    SlotRule {
        rule_id: "blob",
        applies: blob_rule,
    },
];

/// The ordered rule registry.
pub fn rule_registry() -> &'static [SlotRule] {
    REGISTRY
}

/// Classify a single token. Keywords are exempt; otherwise the first
/// matching rule wins.
pub fn classify_token(token: &str) -> Option<SlotKind> {
    if KEYWORDS.contains(token) {
        return None;
    }
    for rule in REGISTRY {
        if let Some(kind) = (rule.applies)(token) {
            return Some(kind);
        }
    }
    None
}
