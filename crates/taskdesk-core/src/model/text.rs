use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Integer(i64),
    Flag(bool),
    Null,
}

/// Deserialize a string field where Odoo may send `false` for "unset".
///
/// Integers are stringified so selection fields such as `priority` decode
/// regardless of server version.
///
/// # Errors
///
/// Fails for arrays, objects, floats, and `true`.
pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawText::deserialize(deserializer)? {
        RawText::Text(s) => Ok(Some(s)),
        RawText::Integer(n) => Ok(Some(n.to_string())),
        RawText::Flag(false) | RawText::Null => Ok(None),
        RawText::Flag(true) => Err(serde::de::Error::custom("text field cannot be `true`")),
    }
}
