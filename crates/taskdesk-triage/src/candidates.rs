//! Candidate-set selection and enrichment for one ticket.

use crate::policy::{PreferenceLookup, PreferencePolicy, ProjectKey, RolePolicy, resolve_preferred};
use crate::rank::{Candidate, rank};
use crate::workload::Workload;
use taskdesk_core::gateway::{self, Collection, GatewayError, RecordGateway};
use taskdesk_core::model::{RecordId, Relation, User};
use tracing::debug;

/// Why these developers were chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolSource {
    /// The project's preference entry, matched under this key.
    Preferred(ProjectKey),
    /// Everyone carrying open tickets in the project.
    Workload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    pub source: PoolSource,
    pub ids: Vec<RecordId>,
    /// Preferred identifiers that matched no user.
    pub unresolved: Vec<String>,
}

impl CandidatePool {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Pick the developers to consider for a ticket in `project`.
///
/// A matching preference entry supplies the pool regardless of workload, so
/// preferred developers with no open tickets stay in. When the entry resolves
/// to nobody, the pool falls back to the workload holders.
///
/// # Errors
///
/// Propagates gateway faults from user resolution.
pub fn select_pool(
    gateway: &dyn RecordGateway,
    project: &Relation,
    preferences: &PreferencePolicy,
    workload: &Workload,
) -> Result<CandidatePool, GatewayError> {
    let mut unresolved = Vec::new();

    if let PreferenceLookup::Found { key, developers } = preferences.lookup(project) {
        debug!(project = project.name.as_str(), %key, "preference entry matched");
        let preferred = resolve_preferred(gateway, developers)?;
        if !preferred.ids.is_empty() {
            return Ok(CandidatePool {
                source: PoolSource::Preferred(key),
                ids: preferred.ids,
                unresolved: preferred.unresolved,
            });
        }
        unresolved = preferred.unresolved;
    }

    Ok(CandidatePool {
        source: PoolSource::Workload,
        ids: workload.developers().collect(),
        unresolved,
    })
}

/// Attach load, recency, and role to each user record.
#[must_use]
pub fn enrich(users: Vec<User>, workload: &Workload, roles: &RolePolicy) -> Vec<Candidate> {
    users
        .into_iter()
        .map(|user| Candidate {
            role: roles.resolve(&user),
            open_tickets: workload.count(user.id),
            recent: workload.is_recent(user.id),
            id: user.id,
            name: user.name,
        })
        .collect()
}

/// Fetch, enrich, and rank the pool's users.
///
/// # Errors
///
/// Propagates gateway faults from the user read.
pub fn build_ranked(
    gateway: &dyn RecordGateway,
    pool: &CandidatePool,
    workload: &Workload,
    roles: &RolePolicy,
) -> Result<Vec<Candidate>, GatewayError> {
    let users: Vec<User> = gateway::read(gateway, Collection::User, &pool.ids, User::FIELDS)?;
    Ok(rank(enrich(users, workload, roles)))
}
