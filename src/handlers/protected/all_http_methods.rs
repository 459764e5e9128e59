// handlers/protected/all_http_methods.rs - ANY /functions/v1/all-http-methods
//
// One endpoint per HTTP verb over the todos table, so clients can observe which verbs
// need an Access-Control-Allow-Methods entry in the preflight response.
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Map, Value};

use super::body_id;
use crate::dispatch::{Dispatcher, OperationOutput, OperationRequest};
use crate::error::ApiError;
use crate::filter::FilterWhere;
use crate::handlers::{parse_json_body, timestamp};
use crate::middleware::AuthUser;
use crate::state::AppState;
use crate::types::{Record, Table};

pub const DEFAULT_USER_ID: &str = "00000000-0000-0000-0000-000000000001";

const ALLOWED: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

pub async fn all_http_methods(
    State(state): State<AppState>,
    method: Method,
    auth: Result<AuthUser, ApiError>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if method == Method::OPTIONS {
        tracing::debug!("Handling OPTIONS preflight request");
        return Ok("ok".into_response());
    }
    tracing::debug!("Handling {} request", method);

    let auth = auth?;
    let dispatcher = Dispatcher::new(state.store.as_ref(), &auth);

    match method {
        Method::GET => {
            let output = dispatcher
                .dispatch(OperationRequest::Read {
                    table: Table::Todos,
                    filters: FilterWhere::new(),
                })
                .await?;
            let mut todos = output.into_records();
            todos.sort_by(|a, b| compare_ids(a.get("id"), b.get("id")));

            Ok(reply(&method, StatusCode::OK, "Retrieved todos using HTTP GET".into(), Value::from(todos)))
        }
        Method::POST => {
            let body = parse_json_body(&body)?;
            let task = match body.get("task") {
                None | Some(Value::Null) => return Err(ApiError::invalid_request("Missing 'task' field")),
                Some(Value::String(s)) if s.is_empty() => {
                    return Err(ApiError::invalid_request("Missing 'task' field"))
                }
                Some(task) => task.clone(),
            };
            let user_id = match body.get("user_id") {
                Some(Value::String(s)) if !s.is_empty() => Value::String(s.clone()),
                _ => Value::from(DEFAULT_USER_ID),
            };

            let mut data = Record::new();
            data.insert("task".into(), task);
            data.insert("user_id".into(), user_id);

            let output = dispatcher
                .dispatch(OperationRequest::Create { table: Table::Todos, data })
                .await?;
            Ok(reply(&method, StatusCode::CREATED, "Created todo using HTTP POST".into(), single(output)))
        }
        Method::PUT | Method::PATCH => {
            let body = parse_json_body(&body)?;
            let id = body_id(&body, "Missing 'id' field")?;

            let mut data = Record::new();
            for field in ["task", "is_complete"] {
                if let Some(value) = body.get(field) {
                    data.insert(field.to_string(), value.clone());
                }
            }

            let output = dispatcher
                .dispatch(OperationRequest::Update { table: Table::Todos, id: id.clone(), data })
                .await?;
            let verb = if method == Method::PUT { "Updated" } else { "Patched" };
            let message = format!("{} todo {} using HTTP {}", verb, id, method);
            Ok(reply(&method, StatusCode::OK, message, single(output)))
        }
        Method::DELETE => {
            let body = parse_json_body(&body)?;
            let id = body_id(&body, "Missing 'id' field")?;

            let output = dispatcher
                .dispatch(OperationRequest::Delete { table: Table::Todos, id: id.clone() })
                .await?;
            let message = format!("Deleted todo {} using HTTP DELETE", id);
            Ok(reply(&method, StatusCode::OK, message, single(output)))
        }
        other => Err(ApiError::method_not_allowed(format!("Method {} not supported", other), ALLOWED)),
    }
}

fn single(output: OperationOutput) -> Value {
    serde_json::to_value(output).unwrap_or(Value::Null)
}

/// GET, HEAD and POST are CORS "simple" methods and never trigger a preflight.
fn is_simple(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::POST)
}

fn method_type(method: &Method) -> &'static str {
    if is_simple(method) {
        "simple - no Access-Control-Allow-Methods needed"
    } else {
        "non-simple - REQUIRES Access-Control-Allow-Methods"
    }
}

fn cors_note(method: &Method) -> String {
    if is_simple(method) {
        format!("{} is a simple method and works with basic CORS headers", method)
    } else {
        format!("{} requires Access-Control-Allow-Methods header in CORS preflight!", method)
    }
}

fn reply(method: &Method, status: StatusCode, message: String, data: Value) -> Response {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("method".into(), json!(method.as_str()));
    body.insert("methodType".into(), json!(method_type(method)));
    body.insert("message".into(), json!(message));
    body.insert("timestamp".into(), json!(timestamp()));
    body.insert("data".into(), data);
    body.insert("corsNote".into(), json!(cors_note(method)));

    (status, Json(Value::Object(body))).into_response()
}

/// Ascending id order: numbers numerically, then anything else by its text.
fn compare_ids(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            let text = |v: Option<&Value>| v.map(|v| v.to_string()).unwrap_or_default();
            text(a).cmp(&text(b))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_simple_methods() {
        assert!(is_simple(&Method::GET));
        assert!(is_simple(&Method::POST));
        assert!(!is_simple(&Method::PATCH));
        assert_eq!(method_type(&Method::DELETE), "non-simple - REQUIRES Access-Control-Allow-Methods");
        assert_eq!(
            cors_note(&Method::PUT),
            "PUT requires Access-Control-Allow-Methods header in CORS preflight!"
        );
    }

    #[test]
    fn orders_ids_numerically() {
        let mut ids = vec![json!(10), json!(2), json!("b"), json!(1)];
        ids.sort_by(|a, b| compare_ids(Some(a), Some(b)));
        assert_eq!(ids, vec![json!(1), json!(2), json!(10), json!("b")]);
    }
}
