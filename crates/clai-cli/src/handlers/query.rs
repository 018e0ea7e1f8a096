use anyhow::Result;

use clai_types::{CommandEvent, QueryFilter, RpcRequest};

use super::CliContext;
use crate::output;

#[allow(clippy::too_many_arguments)]
pub fn handle(
    ctx: &CliContext,
    prefix: Option<String>,
    substring: Option<String>,
    session: Option<String>,
    here: bool,
    successes: bool,
    failures: bool,
    limit: usize,
    offset: usize,
    json: bool,
) -> Result<()> {
    let cwd = if here {
        Some(std::env::current_dir()?.to_string_lossy().into_owned())
    } else {
        None
    };

    let filter = QueryFilter {
        session_id: session,
        cwd,
        repo_key: None,
        prefix,
        substring,
        success_only: successes,
        failure_only: failures,
        limit,
        offset,
    };

    let rows: Vec<CommandEvent> = ctx
        .client()
        .call_expect(&RpcRequest::QueryCommands { filter })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("no matching commands");
        return Ok(());
    }

    let color = output::use_color();
    for row in &rows {
        println!(
            "{}  {:>8}  {}",
            output::format_ts(row.ts_ms),
            output::format_exit_marker(row.exit_code, color),
            row.cmd_raw
        );
    }
    Ok(())
}
