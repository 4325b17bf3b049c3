//! Remote record gateway: the narrow search/read/write capability taskdesk
//! uses to talk to the project-management backend.
//!
//! - [`RecordGateway`] is the seam every algorithm depends on.
//! - [`odoo::OdooClient`] authenticates against a live server over JSON-RPC.
//! - [`memory::MemoryGateway`] evaluates the same [`Domain`] language over
//!   in-memory records.

pub mod memory;
pub mod odoo;

use crate::error::ErrorCode;
use crate::model::RecordId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Record collections taskdesk reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Ticket,
    User,
    Stage,
}

impl Collection {
    /// The Odoo model backing this collection.
    #[must_use]
    pub const fn model_name(self) -> &'static str {
        match self {
            Self::Ticket => "project.task",
            Self::User => "res.users",
            Self::Stage => "project.task.type",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication failed for '{user}' on database '{db}'")]
    AuthenticationFailed { user: String, db: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("remote fault {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("unexpected {context} payload: {source}")]
    Decode {
        context: &'static str,
        source: serde_json::Error,
    },
}

impl GatewayError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AuthenticationFailed { .. } => ErrorCode::AuthenticationFailed,
            Self::Transport { .. } => ErrorCode::GatewayTransport,
            Self::Remote { .. } => ErrorCode::GatewayRemote,
            Self::Decode { .. } => ErrorCode::GatewayDecode,
        }
    }
}

/// Comparison operators understood by the domain language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    In,
    NotIn,
}

impl Comparison {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// One element of a prefix-notation domain.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainNode {
    Or,
    And,
    Not,
    Term {
        field: String,
        op: Comparison,
        value: Value,
    },
}

/// A boolean filter over records, in Odoo's prefix ("Polish") notation.
///
/// Operators take the next two (or, for `Not`, one) expressions as operands;
/// top-level expressions are implicitly AND-ed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain {
    nodes: Vec<DomainNode>,
}

impl Domain {
    /// The empty domain, matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn term(mut self, field: &str, op: Comparison, value: impl Into<Value>) -> Self {
        self.nodes.push(DomainNode::Term {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn equals(self, field: &str, value: impl Into<Value>) -> Self {
        self.term(field, Comparison::Eq, value)
    }

    #[must_use]
    pub fn is_in<T: Into<Value>>(self, field: &str, values: impl IntoIterator<Item = T>) -> Self {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.term(field, Comparison::In, Value::Array(list))
    }

    /// Match when any of `terms` holds: `n - 1` `|` operators, then the terms.
    #[must_use]
    pub fn any_of(self, terms: &[(&str, Comparison, Value)]) -> Self {
        self.joined(DomainNode::Or, terms)
    }

    /// Match when every one of `terms` holds, as one explicit `&` group.
    #[must_use]
    pub fn all_of(self, terms: &[(&str, Comparison, Value)]) -> Self {
        self.joined(DomainNode::And, terms)
    }

    /// Match when the single term does not hold (`!` prefix).
    #[must_use]
    pub fn excluding(mut self, field: &str, op: Comparison, value: impl Into<Value>) -> Self {
        self.nodes.push(DomainNode::Not);
        self.term(field, op, value)
    }

    fn joined(mut self, operator: DomainNode, terms: &[(&str, Comparison, Value)]) -> Self {
        for _ in 1..terms.len() {
            self.nodes.push(operator.clone());
        }
        for (field, op, value) in terms {
            self.nodes.push(DomainNode::Term {
                field: (*field).to_string(),
                op: *op,
                value: value.clone(),
            });
        }
        self
    }

    #[must_use]
    pub fn nodes(&self) -> &[DomainNode] {
        &self.nodes
    }

    /// Wire representation: `["|", ["field", "=", value], ...]`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.nodes
                .iter()
                .map(|node| match node {
                    DomainNode::Or => Value::from("|"),
                    DomainNode::And => Value::from("&"),
                    DomainNode::Not => Value::from("!"),
                    DomainNode::Term { field, op, value } => Value::Array(vec![
                        Value::from(field.as_str()),
                        Value::from(op.as_str()),
                        value.clone(),
                    ]),
                })
                .collect(),
        )
    }
}

impl Serialize for Domain {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Optional `search_read` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    /// Comma-separated `field [asc|desc]` clauses, e.g. `"project_id asc, code asc"`.
    pub order: Option<String>,
}

impl SearchOptions {
    #[must_use]
    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            order: None,
        }
    }

    #[must_use]
    pub fn order(order: &str) -> Self {
        Self {
            limit: None,
            order: Some(order.to_string()),
        }
    }
}

/// An authenticated session against the record store.
///
/// Implementations block until the remote call completes. Records come back
/// as raw JSON objects; use [`search`] and [`read`] for typed access.
pub trait RecordGateway {
    /// The authenticated user's id.
    fn uid(&self) -> RecordId;

    fn search_read(
        &self,
        collection: Collection,
        domain: &Domain,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<Value>, GatewayError>;

    fn read(
        &self,
        collection: Collection,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<Value>, GatewayError>;

    /// Apply `values` to every record in `ids`; the server's boolean verdict.
    fn write(
        &self,
        collection: Collection,
        ids: &[RecordId],
        values: &Value,
    ) -> Result<bool, GatewayError>;
}

fn decode<T: DeserializeOwned>(records: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    records
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| GatewayError::Decode {
            context: "record",
            source,
        })
}

/// Typed `search_read`.
///
/// # Errors
///
/// Propagates gateway faults and record decode failures.
pub fn search<T: DeserializeOwned>(
    gateway: &dyn RecordGateway,
    collection: Collection,
    domain: &Domain,
    fields: &[&str],
    options: &SearchOptions,
) -> Result<Vec<T>, GatewayError> {
    decode(gateway.search_read(collection, domain, fields, options)?)
}

/// Typed `read`.
///
/// # Errors
///
/// Propagates gateway faults and record decode failures.
pub fn read<T: DeserializeOwned>(
    gateway: &dyn RecordGateway,
    collection: Collection,
    ids: &[RecordId],
    fields: &[&str],
) -> Result<Vec<T>, GatewayError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    decode(gateway.read(collection, ids, fields)?)
}
