use serde::{Deserialize, Deserializer};
use std::fmt;

/// Primary key of a remote record.
pub type RecordId = i64;

/// A many-to-one reference: the target id plus its display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    pub id: RecordId,
    pub name: String,
}

impl Relation {
    #[must_use]
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRelation {
    Pair(RecordId, String),
    Id(RecordId),
    Flag(bool),
    Null,
}

/// Deserialize `[id, "name"]`, a bare id, `false`, or `null`.
///
/// # Errors
///
/// Fails for any other JSON shape, or for `true`.
pub fn optional<'de, D>(deserializer: D) -> Result<Option<Relation>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawRelation::deserialize(deserializer)? {
        RawRelation::Pair(id, name) => Ok(Some(Relation { id, name })),
        RawRelation::Id(id) => Ok(Some(Relation {
            id,
            name: String::new(),
        })),
        RawRelation::Flag(false) | RawRelation::Null => Ok(None),
        RawRelation::Flag(true) => Err(serde::de::Error::custom(
            "relation field cannot be `true`",
        )),
    }
}
