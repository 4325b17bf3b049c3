use super::relation::RecordId;
use serde::Deserialize;

/// A `project.task.type` record. `fold` marks closed/terminal stages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stage {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fold: bool,
}

impl Stage {
    pub const FIELDS: &'static [&'static str] = &["id", "name", "fold"];
}
