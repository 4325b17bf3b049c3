use super::relation::{self, RecordId, Relation};
use super::text;
use serde::Deserialize;

/// A `project.task` record. Every field except `id` is optional so the same
/// type decodes narrow projections such as the workload query's.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ticket {
    pub id: RecordId,
    #[serde(default, deserialize_with = "text::optional")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text::optional")]
    pub code: Option<String>,
    #[serde(default, rename = "project_id", deserialize_with = "relation::optional")]
    pub project: Option<Relation>,
    #[serde(default, rename = "user_id", deserialize_with = "relation::optional")]
    pub assignee: Option<Relation>,
    #[serde(default, deserialize_with = "text::optional")]
    pub priority: Option<String>,
    #[serde(default, rename = "stage_id", deserialize_with = "relation::optional")]
    pub stage: Option<Relation>,
    #[serde(default, deserialize_with = "text::optional")]
    pub write_date: Option<String>,
}

impl Ticket {
    /// Projection used when looking a ticket up by code.
    pub const LOOKUP_FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "code",
        "project_id",
        "user_id",
        "priority",
        "stage_id",
        "write_date",
    ];

    /// Projection used when tallying workload.
    pub const WORKLOAD_FIELDS: &'static [&'static str] = &["id", "user_id", "write_date"];

    /// Projection used by the daily digest.
    pub const DIGEST_FIELDS: &'static [&'static str] =
        &["id", "name", "code", "project_id", "stage_id"];

    #[must_use]
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or("-")
    }

    #[must_use]
    pub fn assignee_name(&self) -> &str {
        self.assignee.as_ref().map_or("-", |r| r.name.as_str())
    }

    #[must_use]
    pub fn project_name(&self) -> &str {
        self.project.as_ref().map_or("-", |r| r.name.as_str())
    }

    #[must_use]
    pub fn priority_label(&self) -> &str {
        self.priority.as_deref().unwrap_or("0")
    }
}
