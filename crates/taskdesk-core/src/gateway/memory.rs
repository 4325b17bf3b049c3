//! In-memory record store that evaluates [`Domain`] filters the way the
//! server does. Relation fields may be stored as `[id, "name"]` pairs or bare
//! ids and always compare by id; `false`/`null`/absent mean "unset".

use super::{Collection, Comparison, Domain, DomainNode, GatewayError, RecordGateway, SearchOptions};
use crate::model::RecordId;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BTreeMap;

type Record = Map<String, Value>;

/// A write issued through the gateway, recorded whether or not it applied.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCall {
    pub collection: Collection,
    pub ids: Vec<RecordId>,
    pub values: Value,
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    uid: RecordId,
    tables: RefCell<BTreeMap<Collection, Vec<Record>>>,
    writes: RefCell<Vec<WriteCall>>,
    searches: RefCell<Vec<Collection>>,
    reject_writes: Cell<bool>,
    faulty: Cell<Option<Collection>>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new(uid: RecordId) -> Self {
        Self {
            uid,
            ..Self::default()
        }
    }

    /// Seed `collection` with JSON objects; non-object values are ignored.
    #[must_use]
    pub fn with_records(self, collection: Collection, records: Vec<Value>) -> Self {
        self.tables
            .borrow_mut()
            .entry(collection)
            .or_default()
            .extend(records.into_iter().filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            }));
        self
    }

    /// Make every subsequent write report `false` without applying.
    pub fn reject_writes(&self) {
        self.reject_writes.set(true);
    }

    /// Make every search and read on `collection` fail with a remote fault.
    pub fn fail_on(&self, collection: Collection) {
        self.faulty.set(Some(collection));
    }

    #[must_use]
    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.borrow().clone()
    }

    /// Number of `search_read` calls issued against `collection`.
    #[must_use]
    pub fn search_count(&self, collection: Collection) -> usize {
        self.searches
            .borrow()
            .iter()
            .filter(|c| **c == collection)
            .count()
    }

    /// Current raw state of one record.
    #[must_use]
    pub fn record(&self, collection: Collection, id: RecordId) -> Option<Value> {
        self.tables
            .borrow()
            .get(&collection)?
            .iter()
            .find(|r| record_id(r) == Some(id))
            .cloned()
            .map(Value::Object)
    }

    fn check_fault(&self, collection: Collection) -> Result<(), GatewayError> {
        if self.faulty.get() == Some(collection) {
            return Err(GatewayError::Remote {
                code: 200,
                message: format!("injected fault on {collection}"),
            });
        }
        Ok(())
    }
}

fn record_id(record: &Record) -> Option<RecordId> {
    record.get("id").and_then(Value::as_i64)
}

/// Collapse relation pairs to their id and `null` to `false`.
fn scalar(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Bool(false),
        Some(Value::Array(pair)) if pair.len() == 2 && pair[0].is_i64() => pair[0].clone(),
        Some(other) => other.clone(),
    }
}

fn term_matches(record: &Record, field: &str, op: Comparison, expected: &Value) -> bool {
    let actual = scalar(record.get(field));
    let expected_scalar = scalar(Some(expected));
    let contains = || match expected {
        Value::Array(options) => options.iter().any(|o| scalar(Some(o)) == actual),
        _ => false,
    };
    match op {
        Comparison::Eq => actual == expected_scalar,
        Comparison::NotEq => actual != expected_scalar,
        Comparison::In => contains(),
        Comparison::NotIn => !contains(),
    }
}

/// Evaluate the expression starting at `pos`; returns its value and the
/// position just past it. Missing operands evaluate to `true`.
fn eval_at(nodes: &[DomainNode], pos: usize, record: &Record) -> (bool, usize) {
    match nodes.get(pos) {
        None => (true, pos),
        Some(DomainNode::Or) => {
            let (lhs, next) = eval_at(nodes, pos + 1, record);
            let (rhs, end) = eval_at(nodes, next, record);
            (lhs || rhs, end)
        }
        Some(DomainNode::And) => {
            let (lhs, next) = eval_at(nodes, pos + 1, record);
            let (rhs, end) = eval_at(nodes, next, record);
            (lhs && rhs, end)
        }
        Some(DomainNode::Not) => {
            let (inner, end) = eval_at(nodes, pos + 1, record);
            (!inner, end)
        }
        Some(DomainNode::Term { field, op, value }) => {
            (term_matches(record, field, *op, value), pos + 1)
        }
    }
}

fn matches(domain: &Domain, record: &Record) -> bool {
    let nodes = domain.nodes();
    let mut pos = 0;
    let mut all = true;
    while pos < nodes.len() {
        let (value, next) = eval_at(nodes, pos, record);
        all &= value;
        pos = next;
    }
    all
}

/// Sort key: set values before unset ones; relations order by display name.
fn sort_key(value: Option<&Value>) -> (u8, i64, String) {
    match value {
        None | Some(Value::Null | Value::Bool(false)) => (1, 0, String::new()),
        Some(Value::Array(pair)) => (
            0,
            0,
            pair.get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Some(Value::Number(n)) => (0, n.as_i64().unwrap_or_default(), String::new()),
        Some(Value::String(s)) => (0, 0, s.clone()),
        Some(other) => (0, 0, other.to_string()),
    }
}

fn parse_order(order: &str) -> Vec<(String, bool)> {
    order
        .split(',')
        .filter_map(|clause| {
            let mut parts = clause.split_whitespace();
            let field = parts.next()?;
            let descending = parts
                .next()
                .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));
            Some((field.to_string(), descending))
        })
        .collect()
}

fn compare(a: &Record, b: &Record, clauses: &[(String, bool)]) -> Ordering {
    for (field, descending) in clauses {
        let ord = sort_key(a.get(field)).cmp(&sort_key(b.get(field)));
        let ord = if *descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Keep `id` plus the requested fields; absent fields read as `false`.
fn project(record: &Record, fields: &[&str]) -> Value {
    let mut out = Map::new();
    if let Some(id) = record.get("id") {
        out.insert("id".to_string(), id.clone());
    }
    for field in fields {
        out.insert(
            (*field).to_string(),
            record.get(*field).cloned().unwrap_or(Value::Bool(false)),
        );
    }
    Value::Object(out)
}

impl RecordGateway for MemoryGateway {
    fn uid(&self) -> RecordId {
        self.uid
    }

    fn search_read(
        &self,
        collection: Collection,
        domain: &Domain,
        fields: &[&str],
        options: &SearchOptions,
    ) -> Result<Vec<Value>, GatewayError> {
        self.searches.borrow_mut().push(collection);
        self.check_fault(collection)?;

        let tables = self.tables.borrow();
        let mut hits: Vec<&Record> = tables
            .get(&collection)
            .map(|rows| rows.iter().filter(|r| matches(domain, r)).collect())
            .unwrap_or_default();

        if let Some(order) = &options.order {
            let clauses = parse_order(order);
            hits.sort_by(|a, b| compare(a, b, &clauses));
        }

        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|r| project(r, fields))
            .collect())
    }

    fn read(
        &self,
        collection: Collection,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<Value>, GatewayError> {
        self.check_fault(collection)?;
        let tables = self.tables.borrow();
        let Some(rows) = tables.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| rows.iter().find(|r| record_id(r) == Some(*id)))
            .map(|r| project(r, fields))
            .collect())
    }

    fn write(
        &self,
        collection: Collection,
        ids: &[RecordId],
        values: &Value,
    ) -> Result<bool, GatewayError> {
        self.writes.borrow_mut().push(WriteCall {
            collection,
            ids: ids.to_vec(),
            values: values.clone(),
        });
        if self.reject_writes.get() {
            return Ok(false);
        }
        let Value::Object(changes) = values else {
            return Ok(false);
        };

        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(collection).or_default();
        let mut applied = 0;
        for row in rows
            .iter_mut()
            .filter(|r| record_id(r).is_some_and(|id| ids.contains(&id)))
        {
            for (key, value) in changes {
                row.insert(key.clone(), value.clone());
            }
            applied += 1;
        }
        Ok(applied == ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tickets() -> MemoryGateway {
        MemoryGateway::new(1).with_records(
            Collection::Ticket,
            vec![
                json!({"id": 1, "code": "TSK-B-2", "project_id": [42, "Beta"], "user_id": [5, "Bob"], "stage_id": [1, "New"]}),
                json!({"id": 2, "code": "TSK-A-1", "project_id": [41, "Alpha"], "user_id": false, "stage_id": [2, "Doing"]}),
                json!({"id": 3, "code": "TSK-A-3", "project_id": [41, "Alpha"], "user_id": [6, "Cara"], "stage_id": [9, "Done"]}),
                json!({"id": 4, "code": "TSK-A-2", "project_id": false, "user_id": [5, "Bob"], "stage_id": [1, "New"]}),
            ],
        )
    }

    fn ids(values: &[Value]) -> Vec<i64> {
        values.iter().filter_map(|v| v["id"].as_i64()).collect()
    }

    #[test]
    fn implicit_and_with_relations_compared_by_id() {
        let gw = tickets();
        let domain = Domain::new()
            .equals("project_id", 41)
            .is_in("stage_id", [1, 2, 9])
            .term("user_id", Comparison::NotEq, false);
        let hits = gw
            .search_read(Collection::Ticket, &domain, &["id"], &SearchOptions::default())
            .expect("search");
        assert_eq!(ids(&hits), vec![3]);
    }

    #[test]
    fn prefix_or_and_not() {
        let gw = tickets();
        let domain = Domain::new().any_of(&[
            ("code", Comparison::Eq, json!("TSK-A-1")),
            ("code", Comparison::Eq, json!("TSK-B-2")),
        ]);
        let hits = gw
            .search_read(Collection::Ticket, &domain, &[], &SearchOptions::default())
            .expect("search");
        assert_eq!(ids(&hits), vec![1, 2]);

        let negated = Domain::new().excluding("stage_id", Comparison::In, json!([1]));
        let hits = gw
            .search_read(Collection::Ticket, &negated, &[], &SearchOptions::default())
            .expect("search");
        assert_eq!(ids(&hits), vec![2, 3]);

        let both = Domain::new().all_of(&[
            ("code", Comparison::NotEq, json!("TSK-A-1")),
            ("stage_id", Comparison::NotIn, json!([1])),
        ]);
        let hits = gw
            .search_read(Collection::Ticket, &both, &[], &SearchOptions::default())
            .expect("search");
        assert_eq!(ids(&hits), vec![3]);
    }

    #[test]
    fn order_by_relation_name_then_field_with_unset_last() {
        let gw = tickets();
        let hits = gw
            .search_read(
                Collection::Ticket,
                &Domain::new(),
                &["code"],
                &SearchOptions::order("project_id asc, code asc"),
            )
            .expect("search");
        assert_eq!(ids(&hits), vec![2, 3, 1, 4]);
    }

    #[test]
    fn limit_and_projection() {
        let gw = tickets();
        let hits = gw
            .search_read(
                Collection::Ticket,
                &Domain::new(),
                &["code", "priority"],
                &SearchOptions::limit(1),
            )
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], json!({"id": 1, "code": "TSK-B-2", "priority": false}));
    }

    #[test]
    fn write_applies_and_is_recorded() {
        let gw = tickets();
        let ok = gw
            .write(Collection::Ticket, &[2], &json!({"user_id": 5}))
            .expect("write");
        assert!(ok);
        assert_eq!(gw.writes().len(), 1);
        let record = gw.record(Collection::Ticket, 2).expect("record");
        assert_eq!(record["user_id"], 5);

        let reassigned = gw
            .search_read(
                Collection::Ticket,
                &Domain::new().equals("user_id", 5),
                &[],
                &SearchOptions::default(),
            )
            .expect("search");
        assert_eq!(ids(&reassigned), vec![1, 2, 4]);
    }

    #[test]
    fn rejected_and_missing_writes_report_false() {
        let gw = tickets();
        assert!(!gw
            .write(Collection::Ticket, &[99], &json!({"user_id": 5}))
            .expect("write"));
        gw.reject_writes();
        assert!(!gw
            .write(Collection::Ticket, &[1], &json!({"user_id": 6}))
            .expect("write"));
        assert_eq!(gw.writes().len(), 2);
    }

    #[test]
    fn injected_fault_surfaces_as_remote_error() {
        let gw = tickets();
        gw.fail_on(Collection::Ticket);
        let err = gw
            .search_read(Collection::Ticket, &Domain::new(), &[], &SearchOptions::default())
            .expect_err("fault");
        assert!(matches!(err, GatewayError::Remote { .. }));
        assert_eq!(gw.search_count(Collection::Ticket), 1);
    }
}
