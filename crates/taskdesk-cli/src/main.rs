#![forbid(unsafe_code)]

mod cmd;
mod output;
mod prompt;

use clap::{Parser, Subcommand};
use std::env;
use std::io;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "taskdesk: chat-driven ticket assignment and daily digests for Odoo",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Assign tickets referenced in chat text",
        long_about = "Scan text for ticket codes, rank candidate developers for each ticket, and assign after confirmation.",
        after_help = "EXAMPLES:\n    # Paste messages on stdin\n    taskdesk assign\n\n    # Read a saved export and only report decisions\n    taskdesk assign --input viber.txt --dry-run"
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(
        about = "Print today's to-do digest",
        long_about = "List the logged-in user's tickets in the configured to-do stages, grouped by project.",
        after_help = "EXAMPLES:\n    # Digest for today\n    taskdesk digest\n\n    # Back-dated header with a custom signature\n    taskdesk digest --date 2026-10-15 --by \"Ama\""
    )]
    Digest(cmd::digest::DigestArgs),
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose || env::var("DEBUG").is_ok() {
        "taskdesk=debug,warn"
    } else {
        "warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TASKDESK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let format = env::var("TASKDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(command = ?cli.command, "starting");

    match cli.command {
        Commands::Assign(ref args) => cmd::assign::run_assign(args),
        Commands::Digest(ref args) => cmd::digest::run_digest(args),
    }
}
