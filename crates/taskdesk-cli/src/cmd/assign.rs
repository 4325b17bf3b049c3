//! `taskdesk assign`: route ticket codes pasted from chat to developers.
//!
//! Fatal setup errors (config, credentials, no codes, login) end the run with
//! exit 1. After login every code is processed in sorted order; a failure on
//! one code is reported and the run moves on.

use crate::cmd::{load_config, load_credentials, login};
use crate::output::{CliError, fail, write_error};
use crate::prompt::ConsolePrompt;
use anyhow::Context as _;
use chrono::Utc;
use clap::Args;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use taskdesk_core::error::ErrorCode;
use taskdesk_core::extract::{TicketCode, extract_codes};
use taskdesk_core::gateway::{self, Collection, RecordGateway};
use taskdesk_core::model::User;
use taskdesk_triage::engine::{AssignmentEngine, Decider, EngineError, Outcome};
use tracing::{info, warn};

/// Controlling terminal; answers come from here once stdin held the messages.
const TERMINAL: &str = "/dev/tty";

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// JSON config with stage names, preferences, and roles.
    #[arg(long, default_value = "config/assign_from_viber.json")]
    pub config: PathBuf,

    /// Text file to scan for ticket codes; stdin when omitted.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Dotenv file supplying ODOO_* credentials.
    #[arg(long, default_value = ".env")]
    pub dotenv: PathBuf,

    /// Report each decision without writing it.
    #[arg(long)]
    pub dry_run: bool,
}

/// How many codes reached an outcome and how many were aborted by a fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub finished: usize,
    pub aborted: usize,
}

pub fn run_assign(args: &AssignArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let credentials = load_credentials(&args.dotenv)?;

    let text = read_text(args)?;
    let codes = extract_codes(&text);
    if codes.is_empty() {
        return fail(CliError::coded(
            ErrorCode::NoTicketCodes,
            "No ticket codes found",
        ));
    }
    info!(codes = codes.len(), dry_run = args.dry_run, "ticket codes extracted");

    let session = login(&credentials)?;
    print_login(&session, &mut io::stdout().lock())?;

    let engine = AssignmentEngine::from_config(&session, &config, args.dry_run);
    let answers = answer_input(
        args.input.is_none(),
        || File::open(TERMINAL),
        &mut io::stderr(),
    )?;
    let mut prompt = ConsolePrompt::new(answers, io::stdout());

    let tally = process_codes(
        &engine,
        &codes,
        &mut prompt,
        &mut io::stdout(),
        &mut io::stderr(),
    )?;
    info!(finished = tally.finished, aborted = tally.aborted, "run complete");
    Ok(())
}

fn read_text(args: &AssignArgs) -> anyhow::Result<String> {
    if let Some(path) = &args.input {
        return fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    println!("Paste Viber messages. End with Ctrl-D:");
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

/// Pick the stream operator answers are read from.
///
/// When the messages were read from stdin it is exhausted, so answers come
/// from the terminal instead. Without one, a note goes to `notes` and every
/// prompt reads blank.
fn answer_input(
    text_from_stdin: bool,
    open_terminal: impl FnOnce() -> io::Result<File>,
    notes: &mut dyn Write,
) -> io::Result<Box<dyn BufRead>> {
    if !text_from_stdin {
        return Ok(Box::new(io::stdin().lock()));
    }
    match open_terminal() {
        Ok(tty) => Ok(Box::new(BufReader::new(tty))),
        Err(err) => {
            warn!(error = %err, "no terminal available for answers");
            writeln!(
                notes,
                "note: stdin held the messages and no terminal is available, so every ticket \
                 will be skipped; pass --input <file> to answer prompts"
            )?;
            Ok(Box::new(io::empty()))
        }
    }
}

fn print_login(session: &dyn RecordGateway, out: &mut dyn Write) -> anyhow::Result<()> {
    let me: Vec<User> = gateway::read(session, Collection::User, &[session.uid()], User::FIELDS)
        .context("failed to read the logged-in user")?;
    if let Some(me) = me.first() {
        writeln!(
            out,
            "Login OK: {} ({})",
            me.name,
            me.login.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

/// Walk every code in order. A fault on one code is written to `errors` and
/// the loop moves on.
pub fn process_codes(
    engine: &AssignmentEngine<'_>,
    codes: &BTreeSet<TicketCode>,
    decider: &mut dyn Decider,
    out: &mut dyn Write,
    errors: &mut dyn Write,
) -> io::Result<RunTally> {
    let mut tally = RunTally::default();
    for code in codes {
        writeln!(out, "\n=== {code} ===")?;
        out.flush()?;
        match engine.process(code, Utc::now(), decider) {
            Ok(outcome) => {
                write_outcome(out, &outcome)?;
                tally.finished += 1;
            }
            Err(err) => {
                warn!(%code, error = %err, "ticket aborted");
                write_error(errors, &ticket_failure(&err))?;
                tally.aborted += 1;
            }
        }
    }
    Ok(tally)
}

fn ticket_failure(err: &EngineError) -> CliError {
    err.code().map_or_else(
        || CliError::new(err.to_string()),
        |code| CliError::coded(code, format!("{}: {err}", code.message())),
    )
}

/// One transcript line (two when preferences went unresolved) per outcome.
pub fn write_outcome(out: &mut dyn Write, outcome: &Outcome) -> io::Result<()> {
    match outcome {
        Outcome::NotFound => writeln!(out, "No task found"),
        Outcome::InvalidTicketSelection { .. } => writeln!(out, "Invalid selection, skipping"),
        Outcome::NoProject { .. } => writeln!(out, "Task has no project; skipping"),
        Outcome::NoOpenStages => writeln!(out, "No open stages found; skipping"),
        Outcome::NoCandidates { unresolved } => {
            if !unresolved.is_empty() {
                writeln!(out, "Preferred devs not found: {}", unresolved.join(", "))?;
            }
            writeln!(out, "No candidates found")
        }
        Outcome::Skipped => writeln!(out, "Skipped"),
        Outcome::InvalidSelection { .. } => writeln!(out, "Invalid selection, skipped"),
        Outcome::DryRun {
            ticket_id,
            assignee,
        } => writeln!(out, "Dry-run: would assign task {ticket_id} to {assignee}"),
        Outcome::Assigned { assignee, .. } => writeln!(out, "Assigned to {assignee}"),
        Outcome::WriteFailed { .. } => writeln!(out, "Assign failed"),
    }
}
