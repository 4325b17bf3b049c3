//! Per-developer open-ticket load within one project.
//!
//! Every open, assigned ticket counts toward its assignee's load. A developer
//! is *recent* when at least one of those tickets was written within the
//! trailing window; the boundary instant (`now - window`) is inclusive.
//! Timestamps that cannot be read still count toward load, never toward
//! recency, and are kept as [`TimestampFailure`] entries.

use crate::stages::OpenStages;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use serde_json::Value;
use taskdesk_core::gateway::{
    self, Collection, Comparison, Domain, GatewayError, RecordGateway, SearchOptions,
};
use taskdesk_core::model::{RecordId, Ticket};
use tracing::debug;

/// Server timestamp layout (naive UTC); fractional seconds are optional.
pub const WRITE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("no write date")]
    Missing,

    #[error("unparsable write date '{raw}'")]
    Malformed { raw: String },
}

/// A ticket whose recency could not be judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFailure {
    pub ticket_id: RecordId,
    pub reason: TimestampError,
}

/// Parse a server `write_date` as UTC.
///
/// # Errors
///
/// [`TimestampError::Missing`] for an absent value and
/// [`TimestampError::Malformed`] for anything not in [`WRITE_DATE_FORMAT`].
pub fn parse_write_date(raw: Option<&str>) -> Result<DateTime<Utc>, TimestampError> {
    let raw = raw.ok_or(TimestampError::Missing)?;
    NaiveDateTime::parse_from_str(raw.trim(), WRITE_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| TimestampError::Malformed {
            raw: raw.to_string(),
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    counts: BTreeMap<RecordId, u32>,
    recent: BTreeMap<RecordId, bool>,
    timestamp_failures: Vec<TimestampFailure>,
}

impl Workload {
    /// Tally `tickets` (already filtered to open, assigned ones).
    ///
    /// A window reaching past the earliest representable instant covers
    /// every timestamp.
    #[must_use]
    pub fn aggregate(tickets: &[Ticket], now: DateTime<Utc>, window: TimeDelta) -> Self {
        let cutoff = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut workload = Self::default();

        for ticket in tickets {
            let Some(assignee) = &ticket.assignee else {
                continue;
            };
            *workload.counts.entry(assignee.id).or_insert(0) += 1;
            let recent = workload.recent.entry(assignee.id).or_insert(false);

            match parse_write_date(ticket.write_date.as_deref()) {
                Ok(written) => {
                    if written >= cutoff {
                        *recent = true;
                    }
                }
                Err(reason) => {
                    debug!(ticket = ticket.id, %reason, "recency not evaluated");
                    workload.timestamp_failures.push(TimestampFailure {
                        ticket_id: ticket.id,
                        reason,
                    });
                }
            }
        }

        workload
    }

    /// Open tickets held by `developer`; 0 when absent.
    #[must_use]
    pub fn count(&self, developer: RecordId) -> u32 {
        self.counts.get(&developer).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_recent(&self, developer: RecordId) -> bool {
        self.recent.get(&developer).copied().unwrap_or(false)
    }

    /// Developers holding at least one open ticket, ascending by id.
    pub fn developers(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.counts.keys().copied()
    }

    #[must_use]
    pub fn timestamp_failures(&self) -> &[TimestampFailure] {
        &self.timestamp_failures
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Query open, assigned tickets in `project_id` and tally them.
///
/// # Errors
///
/// Propagates gateway faults.
pub fn load_workload(
    gateway: &dyn RecordGateway,
    project_id: RecordId,
    open: &OpenStages,
    now: DateTime<Utc>,
    recent_days: u32,
) -> Result<Workload, GatewayError> {
    let open_ids: Vec<Value> = open.ids.iter().copied().map(Value::from).collect();
    let domain = Domain::new().all_of(&[
        ("project_id", Comparison::Eq, Value::from(project_id)),
        ("stage_id", Comparison::In, Value::Array(open_ids)),
        ("user_id", Comparison::NotEq, Value::Bool(false)),
    ]);
    let tickets: Vec<Ticket> = gateway::search(
        gateway,
        Collection::Ticket,
        &domain,
        Ticket::WORKLOAD_FIELDS,
        &SearchOptions::default(),
    )?;

    let workload = Workload::aggregate(&tickets, now, TimeDelta::days(i64::from(recent_days)));
    debug!(
        project_id,
        open_tickets = tickets.len(),
        developers = workload.counts.len(),
        "workload tallied"
    );
    Ok(workload)
}
