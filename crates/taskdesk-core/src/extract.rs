//! Ticket-code extraction from free-form chat text.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\bTSK-[A-Z0-9]+-\d+\b").expect("ticket code pattern is valid")
});

/// A ticket reference such as `TSK-AB-12`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketCode(String);

impl TicketCode {
    /// Validate a single token against the reference pattern.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        CODE_RE
            .find(trimmed)
            .filter(|m| m.start() == 0 && m.end() == trimmed.len())
            .map(|m| Self(m.as_str().to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collect every distinct ticket code in `text`, sorted.
#[must_use]
pub fn extract_codes(text: &str) -> BTreeSet<TicketCode> {
    CODE_RE
        .find_iter(text)
        .map(|m| TicketCode(m.as_str().to_string()))
        .collect()
}
