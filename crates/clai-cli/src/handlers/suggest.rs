use anyhow::Result;

use clai_types::{RpcRequest, SuggestResponse};

use super::CliContext;
use crate::output;

#[allow(clippy::too_many_arguments)]
pub fn handle(
    ctx: &CliContext,
    buffer: &str,
    session: Option<String>,
    cwd: Option<String>,
    max_results: Option<usize>,
    json: bool,
) -> Result<()> {
    if clai_core::suggestions_disabled() {
        return Ok(());
    }

    let session_id = session
        .or_else(clai_core::session_id_from_env)
        .unwrap_or_else(|| "cli".to_string());
    let cwd = match cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?.to_string_lossy().into_owned(),
    };

    let response: SuggestResponse = ctx.client().call_expect(&RpcRequest::Suggest {
        session_id,
        cwd,
        buffer: buffer.to_string(),
        max_results,
        last_template_id: None,
        timeout_ms: Some(500),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.suggestions.is_empty() {
        println!("no suggestions yet");
        return Ok(());
    }

    let color = output::use_color();
    for (index, suggestion) in response.suggestions.iter().enumerate() {
        println!("{}", output::format_suggestion(index, suggestion, color));
    }
    if response.truncated {
        println!("(truncated: deadline hit while assembling)");
    }
    Ok(())
}
