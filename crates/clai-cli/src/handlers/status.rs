use anyhow::Result;
use serde_json::Value;

use clai_types::RpcRequest;

use super::CliContext;

pub fn handle(ctx: &CliContext, json: bool) -> Result<()> {
    let health: Value = ctx.client().call_expect(&RpcRequest::Health {})?;

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    let degraded = health
        .get("degraded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    println!(
        "daemon: {}",
        if degraded { "degraded (in-memory ring active)" } else { "healthy" }
    );
    for (label, key) in [
        ("live sessions", "live_sessions"),
        ("events stored", "event_count"),
        ("events ingested", "ingested"),
        ("events dropped", "dropped"),
        ("duplicate ends", "duplicates"),
        ("schema version", "schema_version"),
    ] {
        if let Some(value) = health.get(key) {
            println!("{:>16}: {}", label, value);
        }
    }
    Ok(())
}
