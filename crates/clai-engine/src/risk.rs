use clai_types::Risk;
use once_cell::sync::Lazy;
use regex::Regex;

/// One curated detector. The fixed capability set keeps the registry
/// static: a predicate over rendered command text plus a label.
pub struct RiskRule {
    pub label: &'static str,
    pub risk: Risk,
    pub matches: fn(&str) -> bool,
}

static RM_FORCE_RECURSIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^rm\s+(?:-[A-Za-z]*\s+)*-[A-Za-z]*[rR]").unwrap());
static DD_TO_DEVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^dd\s.*\bof=/dev/\S+").unwrap());
static CHMOD_WORLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^chmod\s+(?:-[A-Za-z]*\s+)*-R\s+777\b").unwrap());
static GIT_FORCE_PUSH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^git\s+push\s.*(?:--force\b|-f\b)").unwrap());
static GIT_HARD_RESET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^git\s+reset\s+--hard\b").unwrap());
static GIT_CLEAN_FORCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^git\s+clean\s.*-[A-Za-z]*f").unwrap());

fn has_rf_flags(command: &str) -> bool {
    let mut recursive = false;
    let mut force = false;
    for token in command.split_whitespace().skip(1) {
        if let Some(flags) = token.strip_prefix('-') {
            if flags.starts_with('-') {
                recursive |= flags == "-recursive";
                force |= flags == "-force";
                continue;
            }
            recursive |= flags.contains('r') || flags.contains('R');
            force |= flags.contains('f');
        }
    }
    recursive && force
}

fn rm_target_is_critical(command: &str) -> bool {
    command
        .split_whitespace()
        .skip(1)
        .filter(|t| !t.starts_with('-'))
        .any(|t| matches!(t, "/" | "/*" | "~" | "~/" | "." | "./" | "/home" | "/etc" | "/usr"))
}

fn rm_critical(command: &str) -> bool {
    command.starts_with("rm")
        && RM_FORCE_RECURSIVE.is_match(command)
        && has_rf_flags(command)
        && rm_target_is_critical(command)
}

fn rm_recursive_force(command: &str) -> bool {
    command.starts_with("rm") && has_rf_flags(command)
}

fn dd_block_device(command: &str) -> bool {
    DD_TO_DEVICE.is_match(command)
}

fn mkfs(command: &str) -> bool {
    command
        .split_whitespace()
        .next()
        .is_some_and(|tool| tool == "mkfs" || tool.starts_with("mkfs."))
}

fn chmod_world_writable(command: &str) -> bool {
    CHMOD_WORLD.is_match(command)
}

fn fork_bomb(command: &str) -> bool {
    let squashed: String = command.chars().filter(|c| !c.is_whitespace()).collect();
    squashed.contains(":(){:|:&};:") || squashed.contains(":(){:|:&};")
}

fn shred(command: &str) -> bool {
    command.split_whitespace().next() == Some("shred")
}

fn git_history_rewrite(command: &str) -> bool {
    GIT_FORCE_PUSH.is_match(command)
        || GIT_HARD_RESET.is_match(command)
        || GIT_CLEAN_FORCE.is_match(command)
}

// Ordered registry; first match decides the label. Destructive entries come
// first so a command matching both tiers is labeled destructive.
static REGISTRY: &[RiskRule] = &[
    RiskRule {
        label: "rm_critical_path",
        risk: Risk::Destructive,
        matches: rm_critical,
    },
    RiskRule {
        label: "dd_block_device",
        risk: Risk::Destructive,
        matches: dd_block_device,
    },
    RiskRule {
        label: "mkfs",
        risk: Risk::Destructive,
        matches: mkfs,
    },
    RiskRule {
        label: "chmod_world_writable",
        risk: Risk::Destructive,
        matches: chmod_world_writable,
    },
    RiskRule {
        label: "fork_bomb",
        risk: Risk::Destructive,
        matches: fork_bomb,
    },
    RiskRule {
        label: "shred",
        risk: Risk::Destructive,
        matches: shred,
    },
    RiskRule {
        label: "rm_recursive_force",
        risk: Risk::Caution,
        matches: rm_recursive_force,
    },
    RiskRule {
        label: "git_history_rewrite",
        risk: Risk::Caution,
        matches: git_history_rewrite,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
    pub risk: Risk,
    /// Label of the rule that fired, for reason tags. None when safe.
    pub rule: Option<&'static str>,
}

/// Assess rendered command text against the registry.
pub fn assess_risk(command: &str) -> RiskAssessment {
    let trimmed = command.trim();
    for rule in REGISTRY {
        if (rule.matches)(trimmed) {
            return RiskAssessment {
                risk: rule.risk,
                rule: Some(rule.label),
            };
        }
    }
    RiskAssessment {
        risk: Risk::Safe,
        rule: None,
    }
}
