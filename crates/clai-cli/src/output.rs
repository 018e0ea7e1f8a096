use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use clai_types::{Risk, Suggestion};

pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// One suggestion line: rank, command, then a dim annotation with source,
/// confidence, and (when present) the risk label.
pub fn format_suggestion(index: usize, suggestion: &Suggestion, color: bool) -> String {
    let risk_label = match suggestion.risk {
        Risk::Destructive => Some("destructive"),
        Risk::Caution => Some("caution"),
        Risk::Safe => None,
    };

    let mut annotation = format!(
        "[{} {:.0}%",
        suggestion.source.as_str(),
        suggestion.confidence * 100.0
    );
    if let Some(label) = risk_label {
        annotation.push(' ');
        annotation.push_str(label);
    }
    annotation.push(']');
    if !suggestion.reasons.is_empty() {
        annotation.push_str(&format!(" {}", suggestion.reasons.join(",")));
    }

    if color {
        let command = match suggestion.risk {
            Risk::Destructive => suggestion.command.red().bold().to_string(),
            Risk::Caution => suggestion.command.yellow().to_string(),
            Risk::Safe => suggestion.command.clone(),
        };
        format!("{:>2}. {}  {}", index + 1, command, annotation.dimmed())
    } else {
        format!("{:>2}. {}  {}", index + 1, suggestion.command, annotation)
    }
}

pub fn format_exit_marker(exit_code: Option<i32>, color: bool) -> String {
    match exit_code {
        Some(0) => {
            if color {
                "ok".green().to_string()
            } else {
                "ok".to_string()
            }
        }
        Some(code) => {
            let text = format!("exit {}", code);
            if color {
                text.red().to_string()
            } else {
                text
            }
        }
        None => "-".to_string(),
    }
}

pub fn format_ts(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}
