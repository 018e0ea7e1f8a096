use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "clai", version, about = "Local command-intelligence daemon for interactive shells")]
pub struct Cli {
    /// Base directory override (defaults to CLAI_HOME, then the platform
    /// data directory)
    #[arg(long, global = true)]
    pub home: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the daemon in the foreground, serving the local socket
    Serve {
        /// Socket path override (defaults to CLAI_SOCKET, then the cache dir)
        #[arg(long)]
        socket: Option<String>,
    },

    /// Query ranked next-command suggestions from the running daemon
    Suggest {
        /// Current line buffer (prefix) to complete
        #[arg(default_value = "")]
        buffer: String,

        /// Session to suggest for (defaults to CLAI_SESSION_ID)
        #[arg(long)]
        session: Option<String>,

        /// Working directory context (defaults to the current directory)
        #[arg(long)]
        cwd: Option<String>,

        /// Maximum number of suggestions
        #[arg(long, short = 'n')]
        max_results: Option<usize>,

        /// Emit raw JSON instead of formatted output
        #[arg(long)]
        json: bool,
    },

    /// Search recorded command history
    Query {
        /// Normalized-command prefix filter
        #[arg(long)]
        prefix: Option<String>,

        /// Raw-text substring filter
        #[arg(long)]
        substring: Option<String>,

        /// Restrict to one session (id or unique prefix)
        #[arg(long)]
        session: Option<String>,

        /// Restrict to the current working directory
        #[arg(long)]
        here: bool,

        /// Only commands that exited 0
        #[arg(long, conflicts_with = "failures")]
        successes: bool,

        /// Only commands that exited non-zero
        #[arg(long)]
        failures: bool,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Emit raw JSON instead of formatted output
        #[arg(long)]
        json: bool,
    },

    /// Import existing shell history into the store
    Import {
        /// Shell whose history to import (bash, zsh, fish)
        shell: String,

        /// History file override
        #[arg(long)]
        path: Option<String>,

        /// Re-import even if this shell was imported before
        #[arg(long)]
        force: bool,
    },

    /// Show daemon health
    Status {
        /// Emit raw JSON instead of formatted output
        #[arg(long)]
        json: bool,
    },
}
