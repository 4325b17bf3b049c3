//! Odoo JSON-RPC transport.
//!
//! Every call is a blocking `POST <url>/jsonrpc` carrying
//! `{"jsonrpc": "2.0", "method": "call", "params": {service, method, args}}`.
//! Authentication goes through `common.authenticate`; record access through
//! `object.execute_kw`.

use super::{Collection, Domain, GatewayError, RecordGateway, SearchOptions};
use crate::config::Credentials;
use crate::model::RecordId;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::cell::Cell;
use tracing::{debug, instrument};

/// Unauthenticated connection to an Odoo server.
pub struct OdooClient {
    agent: ureq::Agent,
    endpoint: String,
    next_id: Cell<u64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcFaultData>,
}

#[derive(Debug, Deserialize)]
struct RpcFaultData {
    #[serde(default)]
    message: Option<String>,
}

fn rpc_body(id: u64, service: &str, method: &str, args: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "call",
        "params": {
            "service": service,
            "method": method,
            "args": args,
        },
        "id": id,
    })
}

fn unpack(response: RpcResponse) -> Result<Value, GatewayError> {
    if let Some(fault) = response.error {
        // The server's exception text lives in `data.message`; the top-level
        // message is a generic "Odoo Server Error".
        let message = fault
            .data
            .and_then(|d| d.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(fault.message);
        return Err(GatewayError::Remote {
            code: fault.code,
            message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// `authenticate` answers with a positive uid, or `false` on rejection.
fn parse_uid(value: &Value) -> Option<RecordId> {
    value.as_i64().filter(|uid| *uid > 0)
}

impl OdooClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .user_agent(concat!("taskdesk/", env!("CARGO_PKG_VERSION")))
                .build(),
            endpoint: format!("{}/jsonrpc", base_url.trim_end_matches('/')),
            next_id: Cell::new(1),
        }
    }

    fn call(&self, service: &str, method: &str, args: Value) -> Result<Value, GatewayError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let body = rpc_body(id, service, method, args);
        let response = self
            .agent
            .post(&self.endpoint)
            .send_json(body)
            .map_err(|err| GatewayError::Transport {
                url: self.endpoint.clone(),
                message: err.to_string(),
            })?;

        let decoded: RpcResponse =
            response
                .into_json()
                .map_err(|err| GatewayError::Transport {
                    url: self.endpoint.clone(),
                    message: format!("invalid JSON-RPC response: {err}"),
                })?;
        unpack(decoded)
    }

    /// Perform the login handshake and return a session bound to the uid.
    ///
    /// # Errors
    ///
    /// [`GatewayError::AuthenticationFailed`] when the server rejects the
    /// credentials; transport and remote faults otherwise.
    #[instrument(skip_all, fields(url = %credentials.url, db = %credentials.db))]
    pub fn login(self, credentials: &Credentials) -> Result<OdooSession, GatewayError> {
        let result = self.call(
            "common",
            "authenticate",
            json!([credentials.db, credentials.user, credentials.password, {}]),
        )?;

        let uid = parse_uid(&result).ok_or_else(|| GatewayError::AuthenticationFailed {
            user: credentials.user.clone(),
            db: credentials.db.clone(),
        })?;
        debug!(uid, "authenticated");

        Ok(OdooSession {
            client: self,
            db: credentials.db.clone(),
            password: credentials.password.clone(),
            uid,
        })
    }
}

/// An authenticated Odoo session. Acquired once per run and shared read-only.
pub struct OdooSession {
    client: OdooClient,
    db: String,
    password: String,
    uid: RecordId,
}

impl OdooSession {
    fn execute_kw(
        &self,
        collection: Collection,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, GatewayError> {
        debug!(model = collection.model_name(), method, "execute_kw");
        self.client.call(
            "object",
            "execute_kw",
            json!([
                self.db,
                self.uid,
                self.password,
                collection.model_name(),
                method,
                args,
                kwargs
            ]),
        )
    }
}

fn into_records(value: Value) -> Result<Vec<Value>, GatewayError> {
    serde_json::from_value(value).map_err(|source| GatewayError::Decode {
        context: "record list",
        source,
    })
}

fn search_kwargs(fields: &[&str], options: &SearchOptions) -> Value {
    let mut kwargs = Map::new();
    kwargs.insert("fields".to_string(), json!(fields));
    if let Some(limit) = options.limit {
        kwargs.insert("limit".to_string(), json!(limit));
    }
    if let Some(order) = &options.order {
        kwargs.insert("order".to_string(), json!(order));
    }
    Value::Object(kwargs)
}

impl RecordGateway for OdooSession {
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
        let result = self.execute_kw(
            collection,
            "search_read",
            json!([domain.to_json()]),
            search_kwargs(fields, options),
        )?;
        into_records(result)
    }

    fn read(
        &self,
        collection: Collection,
        ids: &[RecordId],
        fields: &[&str],
    ) -> Result<Vec<Value>, GatewayError> {
        let result = self.execute_kw(collection, "read", json!([ids]), json!({ "fields": fields }))?;
        into_records(result)
    }

    fn write(
        &self,
        collection: Collection,
        ids: &[RecordId],
        values: &Value,
    ) -> Result<bool, GatewayError> {
        let result = self.execute_kw(collection, "write", json!([ids, values]), json!({}))?;
        Ok(match result {
            Value::Bool(ok) => ok,
            Value::Null => false,
            other => other.as_i64().is_some_and(|n| n != 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_wraps_call_params() {
        let body = rpc_body(3, "common", "authenticate", json!(["db", "u", "p", {}]));
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "call");
        assert_eq!(body["id"], 3);
        assert_eq!(body["params"]["service"], "common");
        assert_eq!(body["params"]["args"][0], "db");
    }

    #[test]
    fn unpack_prefers_detailed_fault_message() {
        let response: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": 200,
                "message": "Odoo Server Error",
                "data": {"name": "odoo.exceptions.AccessError", "message": "no access to project.task"}
            }
        }))
        .expect("decode");
        match unpack(response) {
            Err(GatewayError::Remote { code, message }) => {
                assert_eq!(code, 200);
                assert_eq!(message, "no access to project.task");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unpack_returns_result() {
        let response: RpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": [1, 2]}))
                .expect("decode");
        assert_eq!(unpack(response).expect("ok"), json!([1, 2]));
    }

    #[test]
    fn uid_false_or_zero_is_rejection() {
        assert_eq!(parse_uid(&json!(7)), Some(7));
        assert_eq!(parse_uid(&json!(false)), None);
        assert_eq!(parse_uid(&json!(0)), None);
    }

    #[test]
    fn kwargs_include_optional_limit_and_order() {
        let bare = search_kwargs(&["id"], &SearchOptions::default());
        assert_eq!(bare, json!({"fields": ["id"]}));

        let opts = SearchOptions {
            limit: Some(1),
            order: Some("code asc".to_string()),
        };
        let full = search_kwargs(&["id", "name"], &opts);
        assert_eq!(full["limit"], 1);
        assert_eq!(full["order"], "code asc");
    }

    #[test]
    fn login_against_closed_port_is_transport_error() {
        let client = OdooClient::new("http://127.0.0.1:9");
        let creds = Credentials {
            url: "http://127.0.0.1:9".to_string(),
            db: "db".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
        };
        match client.login(&creds) {
            Err(GatewayError::Transport { url, .. }) => {
                assert_eq!(url, "http://127.0.0.1:9/jsonrpc");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("login should not succeed"),
        }
    }
}
