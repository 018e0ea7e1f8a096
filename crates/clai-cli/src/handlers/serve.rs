use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use clai_runtime::{ClaiDaemon, Config};

use super::CliContext;

pub fn handle(ctx: &CliContext, socket: Option<&str>) -> Result<()> {
    ctx.paths.ensure_dirs()?;
    init_tracing(ctx);

    let config = Config::load_from(&ctx.paths.config_file())?;
    let daemon = Arc::new(ClaiDaemon::open(&ctx.paths, config)?);
    let socket_path = ctx.socket_path(socket);

    std::fs::write(ctx.paths.pid_file(), std::process::id().to_string())
        .with_context(|| format!("writing {}", ctx.paths.pid_file().display()))?;
    info!(home = %ctx.paths.home.display(), "serving");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(crate::rpc::serve(daemon, &socket_path));

    let _ = std::fs::remove_file(ctx.paths.pid_file());
    result
}

/// File-backed subscriber: the access log and runtime diagnostics land in
/// `logs/daemon.log`. RUST_LOG overrides the default level.
fn init_tracing(ctx: &CliContext) {
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(ctx.paths.log_file())
    else {
        return;
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .try_init();
}
