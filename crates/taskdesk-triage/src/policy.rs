//! Developer preference and role policies.
//!
//! Both are ordered lookups over a short list of keys: the first key present
//! in the policy wins, and absence is an explicit variant rather than an
//! empty value.

use std::collections::BTreeMap;
use std::fmt;
use taskdesk_core::gateway::{self, Collection, Comparison, Domain, GatewayError, RecordGateway, SearchOptions};
use taskdesk_core::model::{RecordId, Relation, User};
use tracing::debug;

/// Config key that applies to projects without their own entry.
pub const FALLBACK_PROJECT_KEY: &str = "default";

/// The policy key a project matched under, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectKey {
    Name(String),
    Id(RecordId),
    Fallback,
}

impl ProjectKey {
    /// Keys to try for `project`: exact name, stringified id, fallback.
    #[must_use]
    pub fn precedence(project: &Relation) -> [Self; 3] {
        [
            Self::Name(project.name.clone()),
            Self::Id(project.id),
            Self::Fallback,
        ]
    }

    /// The string this key is stored under in the config file.
    #[must_use]
    pub fn config_key(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Id(id) => id.to_string(),
            Self::Fallback => FALLBACK_PROJECT_KEY.to_string(),
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name '{name}'"),
            Self::Id(id) => write!(f, "id {id}"),
            Self::Fallback => write!(f, "'{FALLBACK_PROJECT_KEY}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceLookup<'a> {
    Found {
        key: ProjectKey,
        developers: &'a [String],
    },
    NotFound,
}

/// Project key → ordered developer identifiers (login, email, or name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencePolicy {
    entries: BTreeMap<String, Vec<String>>,
}

impl PreferencePolicy {
    #[must_use]
    pub const fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    /// At most one entry applies per project.
    #[must_use]
    pub fn lookup(&self, project: &Relation) -> PreferenceLookup<'_> {
        ProjectKey::precedence(project)
            .into_iter()
            .find_map(|key| {
                self.entries
                    .get(&key.config_key())
                    .map(|developers| PreferenceLookup::Found {
                        key,
                        developers: developers.as_slice(),
                    })
            })
            .unwrap_or(PreferenceLookup::NotFound)
    }
}

/// A developer's role label, or the `unknown` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Labeled(String),
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Labeled(label) => f.write_str(label),
            Self::Unknown => f.write_str("-"),
        }
    }
}

/// Developer identity (name, login, or email) → role label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePolicy {
    roles: BTreeMap<String, String>,
}

impl RolePolicy {
    #[must_use]
    pub const fn new(roles: BTreeMap<String, String>) -> Self {
        Self { roles }
    }

    /// First of name, login, email present in the policy wins.
    #[must_use]
    pub fn resolve(&self, user: &User) -> Role {
        user.identity_keys()
            .find_map(|key| self.roles.get(key))
            .map_or(Role::Unknown, |label| Role::Labeled(label.clone()))
    }
}

/// Outcome of resolving a preference list against the user directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferredDevelopers {
    /// Resolved user ids in list order, without duplicates.
    pub ids: Vec<RecordId>,
    /// Identifiers that matched no user.
    pub unresolved: Vec<String>,
}

/// Find the user whose login, email, or name equals `identifier`.
///
/// # Errors
///
/// Propagates gateway faults.
pub fn find_user(
    gateway: &dyn RecordGateway,
    identifier: &str,
) -> Result<Option<User>, GatewayError> {
    let domain = Domain::new().any_of(&[
        ("login", Comparison::Eq, identifier.into()),
        ("email", Comparison::Eq, identifier.into()),
        ("name", Comparison::Eq, identifier.into()),
    ]);
    let mut users: Vec<User> = gateway::search(
        gateway,
        Collection::User,
        &domain,
        User::FIELDS,
        &SearchOptions::limit(1),
    )?;
    Ok(users.pop())
}

/// Resolve each identifier; unresolved ones are collected, not fatal.
///
/// # Errors
///
/// Propagates gateway faults.
pub fn resolve_preferred(
    gateway: &dyn RecordGateway,
    identifiers: &[String],
) -> Result<PreferredDevelopers, GatewayError> {
    let mut resolved = PreferredDevelopers::default();
    for identifier in identifiers {
        match find_user(gateway, identifier)? {
            Some(user) => {
                if !resolved.ids.contains(&user.id) {
                    resolved.ids.push(user.id);
                }
            }
            None => {
                debug!(identifier = identifier.as_str(), "preferred developer not found");
                resolved.unresolved.push(identifier.clone());
            }
        }
    }
    Ok(resolved)
}
