//! `taskdesk digest`: the logged-in user's to-do tickets, grouped by project.

use crate::cmd::{load_config, load_credentials, login};
use crate::output::{CliError, fail};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::io;
use std::path::PathBuf;
use taskdesk_triage::digest::{Digest, load_todo_tickets};
use taskdesk_triage::stages::{StageError, resolve_todo_stages};

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// JSON config; must list `todo_stage_names`.
    #[arg(long, default_value = "config/assign_from_viber.json")]
    pub config: PathBuf,

    /// Dotenv file supplying ODOO_* credentials.
    #[arg(long, default_value = ".env")]
    pub dotenv: PathBuf,

    /// Signature in the header line.
    #[arg(long, default_value = "NMH Ama @name")]
    pub by: String,

    /// Header date (YYYY-MM-DD); today when omitted.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

pub fn run_digest(args: &DigestArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    if config.todo_stage_names.is_empty() {
        return fail(stage_error(&StageError::MissingTodoConfig));
    }
    let credentials = load_credentials(&args.dotenv)?;
    let session = login(&credentials)?;

    let stage_ids = resolve_todo_stages(&session, &config.todo_stage_names)
        .or_else(|err| fail(stage_error(&err)))?;
    let tickets = load_todo_tickets(&session, &stage_ids)?;

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let stdout = io::stdout();
    Digest::build(date, &args.by, &tickets).render(&mut stdout.lock())?;
    Ok(())
}

fn stage_error(err: &StageError) -> CliError {
    CliError::coded(err.code(), err.to_string())
}
