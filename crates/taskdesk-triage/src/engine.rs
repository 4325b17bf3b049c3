//! Per-ticket assignment: lookup, open-stage resolution, workload, candidate
//! ranking, operator decision, and the single `user_id` write.
//!
//! Each call to [`AssignmentEngine::process`] walks one ticket code to a
//! terminal [`Outcome`]. Dead ends (not found, no project, no stages, no
//! candidates, skipped or invalid choices, a refused write) are outcomes, not
//! errors. Gateway faults and prompt I/O failures surface as [`EngineError`];
//! they end the current ticket only, and callers move on to the next code.
//!
//! The human decision is supplied through [`Decider`], so the whole flow runs
//! against scripted answers in tests.

use crate::candidates::{CandidatePool, build_ranked, select_pool};
use crate::policy::{PreferencePolicy, RolePolicy};
use crate::rank::Candidate;
use crate::stages::{StageError, resolve_open_stages};
use crate::workload::load_workload;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::io;
use std::ops::ControlFlow;
use taskdesk_core::config::AppConfig;
use taskdesk_core::error::ErrorCode;
use taskdesk_core::extract::TicketCode;
use taskdesk_core::gateway::{self, Collection, Domain, GatewayError, RecordGateway, SearchOptions};
use taskdesk_core::model::{RecordId, Relation, Ticket};
use tracing::{debug, info, instrument, warn};

/// Everything the operator sees before choosing an assignee.
#[derive(Debug)]
pub struct Proposal<'a> {
    pub ticket: &'a Ticket,
    pub project: &'a Relation,
    pub pool: &'a CandidatePool,
    /// Ranked, never empty.
    pub candidates: &'a [Candidate],
    /// The default suggestion: `candidates[0]`.
    pub top: &'a Candidate,
}

/// Source of operator decisions.
pub trait Decider {
    /// Several tickets share `code`; return the raw 1-based pick.
    fn pick_ticket(&mut self, code: &TicketCode, matches: &[Ticket]) -> io::Result<String>;

    /// Show the proposal and ask whether to assign the top candidate.
    fn confirm(&mut self, proposal: &Proposal<'_>) -> io::Result<bool>;

    /// Ask for a raw 1-based candidate index; blank means skip.
    fn pick_candidate(&mut self, proposal: &Proposal<'_>) -> io::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("'{input}' is not a number")]
    NotANumber { input: String },

    #[error("{index} is outside 1..={len}")]
    OutOfRange { index: usize, len: usize },
}

/// Parse a 1-based choice among `len` entries into a 0-based index.
/// Blank input is `Ok(None)`.
///
/// # Errors
///
/// [`SelectionError`] for non-numeric or out-of-range input.
pub fn parse_selection(raw: &str, len: usize) -> Result<Option<usize>, SelectionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let index: usize = trimmed.parse().map_err(|_| SelectionError::NotANumber {
        input: trimmed.to_string(),
    })?;
    if index == 0 || index > len {
        return Err(SelectionError::OutOfRange { index, len });
    }
    Ok(Some(index - 1))
}

/// Terminal state of one ticket code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    /// Several tickets matched and the pick was not a valid index.
    InvalidTicketSelection { input: String },
    NoProject { ticket_id: RecordId },
    NoOpenStages,
    NoCandidates { unresolved: Vec<String> },
    Skipped,
    InvalidSelection { reason: SelectionError },
    DryRun { ticket_id: RecordId, assignee: String },
    Assigned { ticket_id: RecordId, assignee: String },
    WriteFailed { ticket_id: RecordId, assignee: String },
}

impl Outcome {
    /// Error code for dead ends; `None` for operator-driven or successful ends.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotFound => Some(ErrorCode::TicketNotFound),
            Self::InvalidTicketSelection { .. } | Self::InvalidSelection { .. } => {
                Some(ErrorCode::InvalidSelection)
            }
            Self::NoProject { .. } => Some(ErrorCode::NoProject),
            Self::NoOpenStages => Some(ErrorCode::NoOpenStages),
            Self::NoCandidates { .. } => Some(ErrorCode::NoCandidates),
            Self::WriteFailed { .. } => Some(ErrorCode::WriteFailed),
            Self::Skipped | Self::DryRun { .. } | Self::Assigned { .. } => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("prompt failed: {0}")]
    Prompt(#[from] io::Error),
}

impl EngineError {
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Gateway(e) => Some(e.code()),
            Self::Stage(e) => Some(e.code()),
            Self::Prompt(_) => None,
        }
    }
}

/// Settings that shape every assignment in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSettings {
    pub open_stage_names: Vec<String>,
    pub recent_days: u32,
    /// Report the decision without writing it.
    pub dry_run: bool,
}

pub struct AssignmentEngine<'a> {
    gateway: &'a dyn RecordGateway,
    settings: AssignmentSettings,
    preferences: PreferencePolicy,
    roles: RolePolicy,
}

impl<'a> AssignmentEngine<'a> {
    #[must_use]
    pub fn new(
        gateway: &'a dyn RecordGateway,
        settings: AssignmentSettings,
        preferences: PreferencePolicy,
        roles: RolePolicy,
    ) -> Self {
        Self {
            gateway,
            settings,
            preferences,
            roles,
        }
    }

    #[must_use]
    pub fn from_config(gateway: &'a dyn RecordGateway, config: &AppConfig, dry_run: bool) -> Self {
        Self::new(
            gateway,
            AssignmentSettings {
                open_stage_names: config.open_stage_names.clone(),
                recent_days: config.recent_days,
                dry_run,
            },
            PreferencePolicy::new(config.preferred_developers.clone()),
            RolePolicy::new(config.developer_roles.clone()),
        )
    }

    /// Drive one ticket code to its terminal outcome.
    ///
    /// # Errors
    ///
    /// Gateway faults and prompt I/O failures; both end this ticket only.
    #[instrument(skip_all, fields(code = %code))]
    pub fn process(
        &self,
        code: &TicketCode,
        now: DateTime<Utc>,
        decider: &mut dyn Decider,
    ) -> Result<Outcome, EngineError> {
        let matches: Vec<Ticket> = gateway::search(
            self.gateway,
            Collection::Ticket,
            &Domain::new().equals("code", code.as_str()),
            Ticket::LOOKUP_FIELDS,
            &SearchOptions::default(),
        )?;
        let ticket = match select_ticket(code, matches, decider)? {
            ControlFlow::Continue(ticket) => ticket,
            ControlFlow::Break(outcome) => return Ok(outcome),
        };

        let Some(project) = ticket.project.clone() else {
            return Ok(Outcome::NoProject {
                ticket_id: ticket.id,
            });
        };

        let open = match resolve_open_stages(self.gateway, &self.settings.open_stage_names) {
            Ok(open) => open,
            Err(StageError::NoOpenStages) => return Ok(Outcome::NoOpenStages),
            Err(other) => return Err(other.into()),
        };
        debug!(stages = ?open.ids, source = ?open.source, "open stages resolved");

        let workload = load_workload(
            self.gateway,
            project.id,
            &open,
            now,
            self.settings.recent_days,
        )?;
        if !workload.timestamp_failures().is_empty() {
            warn!(
                project = project.id,
                unreadable = workload.timestamp_failures().len(),
                "some write dates could not be parsed; those tickets never count as recent"
            );
        }

        let pool = select_pool(self.gateway, &project, &self.preferences, &workload)?;
        if pool.is_empty() {
            return Ok(Outcome::NoCandidates {
                unresolved: pool.unresolved,
            });
        }

        let candidates = build_ranked(self.gateway, &pool, &workload, &self.roles)?;
        let Some(top) = candidates.first() else {
            return Ok(Outcome::NoCandidates {
                unresolved: pool.unresolved,
            });
        };

        let proposal = Proposal {
            ticket: &ticket,
            project: &project,
            pool: &pool,
            candidates: &candidates,
            top,
        };
        let chosen = match decide(&proposal, decider)? {
            ControlFlow::Continue(chosen) => chosen,
            ControlFlow::Break(outcome) => return Ok(outcome),
        };

        if self.settings.dry_run {
            return Ok(Outcome::DryRun {
                ticket_id: ticket.id,
                assignee: chosen.name.clone(),
            });
        }

        let written = self.gateway.write(
            Collection::Ticket,
            &[ticket.id],
            &json!({ "user_id": chosen.id }),
        )?;
        info!(ticket = ticket.id, assignee = chosen.id, written, "assignment written");

        Ok(if written {
            Outcome::Assigned {
                ticket_id: ticket.id,
                assignee: chosen.name.clone(),
            }
        } else {
            Outcome::WriteFailed {
                ticket_id: ticket.id,
                assignee: chosen.name.clone(),
            }
        })
    }
}

fn select_ticket(
    code: &TicketCode,
    mut matches: Vec<Ticket>,
    decider: &mut dyn Decider,
) -> Result<ControlFlow<Outcome, Ticket>, EngineError> {
    if matches.len() <= 1 {
        return Ok(matches
            .pop()
            .map_or(ControlFlow::Break(Outcome::NotFound), ControlFlow::Continue));
    }

    let raw = decider.pick_ticket(code, &matches)?;
    Ok(match parse_selection(&raw, matches.len()) {
        Ok(Some(index)) => ControlFlow::Continue(matches.swap_remove(index)),
        Ok(None) | Err(_) => ControlFlow::Break(Outcome::InvalidTicketSelection {
            input: raw.trim().to_string(),
        }),
    })
}

fn decide<'p>(
    proposal: &Proposal<'p>,
    decider: &mut dyn Decider,
) -> Result<ControlFlow<Outcome, &'p Candidate>, EngineError> {
    if decider.confirm(proposal)? {
        return Ok(ControlFlow::Continue(proposal.top));
    }

    let raw = decider.pick_candidate(proposal)?;
    Ok(match parse_selection(&raw, proposal.candidates.len()) {
        Ok(None) => ControlFlow::Break(Outcome::Skipped),
        Ok(Some(index)) => proposal.candidates.get(index).map_or(
            ControlFlow::Break(Outcome::InvalidSelection {
                reason: SelectionError::OutOfRange {
                    index: index + 1,
                    len: proposal.candidates.len(),
                },
            }),
            ControlFlow::Continue,
        ),
        Err(reason) => ControlFlow::Break(Outcome::InvalidSelection { reason }),
    })
}
