use super::relation::RecordId;
use super::text;
use serde::Deserialize;

/// A `res.users` record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "text::optional")]
    pub login: Option<String>,
    #[serde(default, deserialize_with = "text::optional")]
    pub email: Option<String>,
}

impl User {
    pub const FIELDS: &'static [&'static str] = &["id", "name", "login", "email"];

    /// Identity keys in role-lookup precedence: name, login, email.
    pub fn identity_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.login.as_deref())
            .chain(self.email.as_deref())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_keys_skip_unset_values() {
        let user: User = serde_json::from_value(json!({
            "id": 1, "name": "Alice", "login": false, "email": "alice@example.com"
        }))
        .expect("decode");
        let keys: Vec<&str> = user.identity_keys().collect();
        assert_eq!(keys, vec!["Alice", "alice@example.com"]);
    }
}
