//! Daily to-do digest: the authenticated user's tickets in the to-do stages,
//! grouped by project and rendered as plain text.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::io::{self, Write};
use taskdesk_core::gateway::{self, Collection, Domain, GatewayError, RecordGateway, SearchOptions};
use taskdesk_core::model::{RecordId, Ticket};
use tracing::debug;

/// Group heading for tickets without a project.
pub const NO_PROJECT: &str = "No Project";

/// Server-side ordering of digest tickets.
pub const DIGEST_ORDER: &str = "project_id asc, code asc";

/// Header date layout, e.g. `15 Oct 2026`.
pub const HEADER_DATE_FORMAT: &str = "%d %b %Y";

/// Fetch the session user's tickets sitting in `stage_ids`.
///
/// # Errors
///
/// Propagates gateway faults.
pub fn load_todo_tickets(
    gateway: &dyn RecordGateway,
    stage_ids: &[RecordId],
) -> Result<Vec<Ticket>, GatewayError> {
    let domain = Domain::new()
        .equals("user_id", gateway.uid())
        .is_in("stage_id", stage_ids.iter().copied());
    let tickets: Vec<Ticket> = gateway::search(
        gateway,
        Collection::Ticket,
        &domain,
        Ticket::DIGEST_FIELDS,
        &SearchOptions::order(DIGEST_ORDER),
    )?;
    debug!(tickets = tickets.len(), "to-do tickets loaded");
    Ok(tickets)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestLine {
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    date: NaiveDate,
    signature: String,
    /// Project name → lines, in fetch order within each group.
    groups: BTreeMap<String, Vec<DigestLine>>,
}

impl Digest {
    #[must_use]
    pub fn build(date: NaiveDate, signature: &str, tickets: &[Ticket]) -> Self {
        let mut groups: BTreeMap<String, Vec<DigestLine>> = BTreeMap::new();
        for ticket in tickets {
            let project = ticket
                .project
                .as_ref()
                .map_or(NO_PROJECT, |p| p.name.as_str());
            groups
                .entry(project.to_string())
                .or_default()
                .push(DigestLine {
                    code: ticket.code.clone().unwrap_or_else(|| "-".to_string()),
                    title: ticket.title().to_string(),
                });
        }
        Self {
            date,
            signature: signature.to_string(),
            groups,
        }
    }

    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "{} To Do List By {}",
            self.date.format(HEADER_DATE_FORMAT),
            self.signature
        )
    }

    /// Project names in render order.
    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// # Errors
    ///
    /// Propagates write failures on `out`.
    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self.header())?;
        writeln!(out)?;
        for (project, lines) in &self.groups {
            writeln!(out, "{project}")?;
            for line in lines {
                writeln!(out, "{} - {project} - {}", line.code, line.title)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
