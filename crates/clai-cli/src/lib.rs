mod args;
mod handlers;
mod output;
pub mod rpc;

use anyhow::Result;

pub use args::{Cli, Commands};
use handlers::CliContext;

pub fn run(cli: Cli) -> Result<()> {
    let ctx = CliContext::resolve(cli.home.as_deref())?;

    match cli.command {
        Commands::Serve { socket } => handlers::serve::handle(&ctx, socket.as_deref()),
        Commands::Suggest {
            buffer,
            session,
            cwd,
            max_results,
            json,
        } => handlers::suggest::handle(&ctx, &buffer, session, cwd, max_results, json),
        Commands::Query {
            prefix,
            substring,
            session,
            here,
            successes,
            failures,
            limit,
            offset,
            json,
        } => handlers::query::handle(
            &ctx, prefix, substring, session, here, successes, failures, limit, offset, json,
        ),
        Commands::Import { shell, path, force } => {
            handlers::import::handle(&ctx, &shell, path, force)
        }
        Commands::Status { json } => handlers::status::handle(&ctx, json),
    }
}
