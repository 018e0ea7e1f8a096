use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use clai_runtime::ClaiDaemon;
use clai_types::{RpcRequest, ServiceError, ShimEvent, WireResponse};

/// Fallback per-call deadline when the client does not send a budget.
const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;
/// Bulk import gets a much longer leash.
const IMPORT_TIMEOUT_MS: u64 = 120_000;
/// Suggest must answer fast or not at all.
const SUGGEST_TIMEOUT_MS: u64 = 1_000;

/// Serve the daemon socket until ctrl-c, then drain ingest and remove the
/// socket file.
pub async fn serve(daemon: Arc<ClaiDaemon>, socket_path: &Path) -> Result<()> {
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if socket_path.exists() {
        std::fs::remove_file(socket_path)
            .with_context(|| format!("removing stale socket {}", socket_path.display()))?;
    }
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("binding {}", socket_path.display()))?;
    info!(socket = %socket_path.display(), "listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _addr) = accepted?;
                let daemon = daemon.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, daemon).await {
                        debug!(error = %err, "connection error");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    daemon.shutdown(Duration::from_secs(5));
    let _ = std::fs::remove_file(socket_path);
    Ok(())
}

async fn handle_connection(stream: UnixStream, daemon: Arc<ClaiDaemon>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // An `op` field selects an RPC (one reply line); a `type` field is
        // a shim event record (no reply). Anything else is skipped.
        let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
            debug!("skipping malformed line");
            continue;
        };

        if value.get("op").is_some() {
            let response = match serde_json::from_value::<RpcRequest>(value) {
                Ok(request) => dispatch_with_deadline(daemon.clone(), request).await,
                Err(err) => WireResponse::err(&ServiceError::InvalidArgument(format!(
                    "malformed request: {}",
                    err
                ))),
            };
            let mut payload = serde_json::to_string(&response)?;
            payload.push('\n');
            write_half.write_all(payload.as_bytes()).await?;
            continue;
        }

        match serde_json::from_value::<ShimEvent>(value) {
            Ok(event) => {
                let daemon = daemon.clone();
                // No reply line, but applied in order: a command_end racing
                // ahead of its command_start would never pair up.
                let _ = tokio::task::spawn_blocking(move || apply_shim_event(&daemon, event)).await;
            }
            Err(err) => {
                debug!(error = %err, "skipping unknown event line");
            }
        }
    }

    Ok(())
}

async fn dispatch_with_deadline(daemon: Arc<ClaiDaemon>, request: RpcRequest) -> WireResponse {
    let method = request.op_name();
    let budget = match &request {
        RpcRequest::Suggest { timeout_ms, .. } => timeout_ms.unwrap_or(SUGGEST_TIMEOUT_MS),
        RpcRequest::ImportHistory { .. } => IMPORT_TIMEOUT_MS,
        _ => DEFAULT_CALL_TIMEOUT_MS,
    };

    let start = Instant::now();
    let task = tokio::task::spawn_blocking(move || dispatch(&daemon, request));
    let response = match tokio::time::timeout(Duration::from_millis(budget), task).await {
        Ok(Ok(response)) => response,
        Ok(Err(join_err)) => WireResponse::err(&ServiceError::Internal(format!(
            "handler panicked: {}",
            join_err
        ))),
        // The blocking task is abandoned; it must not commit partial state
        // observable as this call's success.
        Err(_) => WireResponse::err(&ServiceError::DeadlineExceeded(format!(
            "{} exceeded {} ms",
            method, budget
        ))),
    };

    // Access log: method, latency, status. Never command text.
    let latency_ms = start.elapsed().as_millis() as u64;
    if response.ok {
        info!(method, latency_ms, ok = true, "rpc");
    } else {
        let kind = response
            .error
            .as_ref()
            .map(|e| e.kind.as_str())
            .unwrap_or("unknown");
        warn!(method, latency_ms, ok = false, kind, "rpc");
    }
    response
}

fn dispatch(daemon: &ClaiDaemon, request: RpcRequest) -> WireResponse {
    match request {
        RpcRequest::SessionStart {
            session_id,
            cwd,
            started_ms,
            shell,
            host,
            user,
            incognito,
        } => reply(
            daemon
                .session_start(&session_id, &cwd, started_ms, shell, host, user, incognito)
                .map(|_| serde_json::json!({})),
        ),
        RpcRequest::SessionEnd {
            session_id,
            ended_ms,
        } => reply(
            daemon
                .session_end(&session_id, ended_ms)
                .map(|_| serde_json::json!({})),
        ),
        RpcRequest::CommandStart {
            session_id,
            command_id,
            cwd,
            command,
            ts_ms,
            repo_key,
            branch,
            ephemeral,
        } => reply(
            daemon
                .command_start(
                    &session_id,
                    &command_id,
                    &cwd,
                    &command,
                    ts_ms,
                    repo_key,
                    branch,
                    ephemeral,
                )
                .map(|_| serde_json::json!({})),
        ),
        RpcRequest::CommandEnd {
            session_id,
            command_id,
            exit_code,
            duration_ms,
            ts_ms,
        } => reply(
            daemon
                .command_end(&session_id, &command_id, exit_code, duration_ms, ts_ms)
                .map(|_| serde_json::json!({})),
        ),
        RpcRequest::Suggest {
            session_id,
            cwd,
            buffer,
            max_results,
            last_template_id,
            timeout_ms,
        } => reply(
            daemon
                .suggest(
                    &session_id,
                    &cwd,
                    &buffer,
                    max_results,
                    last_template_id,
                    timeout_ms,
                )
                .and_then(|response| {
                    serde_json::to_value(response)
                        .map_err(|err| ServiceError::Internal(err.to_string()))
                }),
        ),
        RpcRequest::QueryCommands { filter } => reply(
            daemon
                .query_commands(filter)
                .and_then(|rows| {
                    serde_json::to_value(rows)
                        .map_err(|err| ServiceError::Internal(err.to_string()))
                }),
        ),
        RpcRequest::ImportHistory {
            shell,
            path,
            skip_if_imported,
            force,
        } => reply(
            daemon
                .import_history(&shell, path.as_deref(), skip_if_imported, force)
                .and_then(|result| {
                    serde_json::to_value(result)
                        .map_err(|err| ServiceError::Internal(err.to_string()))
                }),
        ),
        RpcRequest::Feedback {
            session_id,
            suggestion_text,
            action,
        } => reply(
            daemon
                .feedback(&session_id, &suggestion_text, action)
                .map(|_| serde_json::json!({})),
        ),
        RpcRequest::Health {} => {
            let health = daemon.health();
            reply(
                serde_json::to_value(health)
                    .map_err(|err| ServiceError::Internal(err.to_string())),
            )
        }
    }
}

fn reply(result: Result<serde_json::Value, ServiceError>) -> WireResponse {
    match result {
        Ok(data) => WireResponse::ok(data),
        Err(err) => WireResponse::err(&err),
    }
}

fn apply_shim_event(daemon: &ClaiDaemon, event: ShimEvent) {
    let now = clai_runtime::now_ms();
    let result = match event {
        ShimEvent::SessionStart {
            session_id,
            cwd,
            started_ms,
            shell,
        } => daemon.session_start(
            &session_id,
            if cwd.is_empty() { "/" } else { &cwd },
            started_ms.unwrap_or(now),
            shell,
            None,
            None,
            false,
        ),
        ShimEvent::SessionEnd {
            session_id,
            ended_ms,
        } => daemon.session_end(&session_id, ended_ms),
        ShimEvent::CommandStart {
            session_id,
            command_id,
            cwd,
            command,
            ts_ms,
            ephemeral,
        } => daemon.command_start(
            &session_id,
            &command_id,
            &cwd,
            &command,
            ts_ms.unwrap_or(now),
            None,
            None,
            ephemeral,
        ),
        ShimEvent::CommandEnd {
            session_id,
            command_id,
            exit_code,
            duration_ms,
            ts_ms,
        } => daemon.command_end(
            &session_id,
            &command_id,
            exit_code,
            duration_ms.unwrap_or(0),
            ts_ms.unwrap_or(now),
        ),
    };
    if let Err(err) = result {
        // Shim ingestion is fire-and-forget; errors are local only.
        debug!(kind = err.kind(), "shim event rejected");
    }
}
