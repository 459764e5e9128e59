use serde_json::{json, Map, Value};

use super::DispatchError;
use crate::filter::{validate_identifier, FilterWhere};
use crate::types::{OperationKind, Record, RecordId, Table};

/// One inbound CRUD request, discriminated by its `operation` field.
///
/// Wire shape:
/// ```json
/// { "operation": "create" | "read" | "update" | "delete",
///   "table": "todos",
///   "id": 1,
///   "data": { "task": "buy milk" },
///   "filters": { "user_id": "u1" } }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Create { table: Table, data: Record },
    Read { table: Table, filters: FilterWhere },
    Update { table: Table, id: RecordId, data: Record },
    Delete { table: Table, id: RecordId },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Create { .. } => OperationKind::Create,
            OperationRequest::Read { .. } => OperationKind::Read,
            OperationRequest::Update { .. } => OperationKind::Update,
            OperationRequest::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn table(&self) -> Table {
        match self {
            OperationRequest::Create { table, .. }
            | OperationRequest::Read { table, .. }
            | OperationRequest::Update { table, .. }
            | OperationRequest::Delete { table, .. } => *table,
        }
    }

    /// Parse and validate a request body.
    ///
    /// Fields are checked in the order `operation`, `table`, `id`, `data`, so the first
    /// missing one is the one reported.
    pub fn from_json(body: &Value) -> Result<Self, DispatchError> {
        let body = body
            .as_object()
            .ok_or_else(|| DispatchError::InvalidRequest("Request body must be a JSON object".to_string()))?;

        let kind = parse_kind(body)?;
        let table = parse_table(body)?;

        Ok(match kind {
            OperationKind::Create => OperationRequest::Create {
                table,
                data: parse_data(body)?,
            },
            OperationKind::Read => OperationRequest::Read {
                table,
                filters: parse_filters(body)?,
            },
            OperationKind::Update => {
                let id = parse_id(body)?;
                OperationRequest::Update {
                    table,
                    id,
                    data: parse_data(body)?,
                }
            }
            OperationKind::Delete => OperationRequest::Delete {
                table,
                id: parse_id(body)?,
            },
        })
    }

    /// Re-check the invariants a typed request cannot express: `data` non-empty with plain column names.
    pub fn validate(&self) -> Result<(), DispatchError> {
        match self {
            OperationRequest::Create { data, .. } | OperationRequest::Update { data, .. } => check_data(data),
            OperationRequest::Read { .. } | OperationRequest::Delete { .. } => Ok(()),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "operation": self.kind().as_str(),
            "table": self.table().as_str(),
        });

        match self {
            OperationRequest::Create { data, .. } => {
                body["data"] = Value::Object(data.clone());
            }
            OperationRequest::Read { filters, .. } => {
                if !filters.is_empty() {
                    body["filters"] = Value::Object(filters.to_map());
                }
            }
            OperationRequest::Update { id, data, .. } => {
                body["id"] = id.to_value();
                body["data"] = Value::Object(data.clone());
            }
            OperationRequest::Delete { id, .. } => {
                body["id"] = id.to_value();
            }
        }

        body
    }
}

/// A field counts as absent when missing or `null`.
fn required<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a Value, DispatchError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(DispatchError::missing(field)),
        Some(value) => Ok(value),
    }
}

fn parse_kind(body: &Map<String, Value>) -> Result<OperationKind, DispatchError> {
    match required(body, "operation")? {
        Value::String(s) if s.is_empty() => Err(DispatchError::missing("operation")),
        Value::String(s) => s
            .parse()
            .map_err(|literal| DispatchError::InvalidRequest(format!("Unknown operation: {}", literal))),
        other => Err(DispatchError::InvalidRequest(format!("Unknown operation: {}", other))),
    }
}

fn parse_table(body: &Map<String, Value>) -> Result<Table, DispatchError> {
    match required(body, "table")? {
        Value::String(s) if s.is_empty() => Err(DispatchError::missing("table")),
        Value::String(s) => s.parse().map_err(DispatchError::InvalidRequest),
        _ => Err(DispatchError::InvalidRequest("'table' must be a string".to_string())),
    }
}

fn parse_id(body: &Map<String, Value>) -> Result<RecordId, DispatchError> {
    let value = required(body, "id")?;
    RecordId::from_value(value)
        .ok_or_else(|| DispatchError::InvalidRequest("'id' must be an integer or a string".to_string()))
}

fn parse_data(body: &Map<String, Value>) -> Result<Record, DispatchError> {
    match required(body, "data")? {
        Value::Object(data) => {
            check_data(data)?;
            Ok(data.clone())
        }
        _ => Err(DispatchError::InvalidRequest("'data' must be a JSON object".to_string())),
    }
}

fn parse_filters(body: &Map<String, Value>) -> Result<FilterWhere, DispatchError> {
    match body.get("filters") {
        None => Ok(FilterWhere::new()),
        Some(value) => Ok(FilterWhere::from_value(value)?),
    }
}

fn check_data(data: &Record) -> Result<(), DispatchError> {
    if data.is_empty() {
        return Err(DispatchError::InvalidRequest("'data' must not be empty".to_string()));
    }
    for column in data.keys() {
        validate_identifier(column)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(body: Value) -> String {
        match OperationRequest::from_json(&body) {
            Err(DispatchError::InvalidRequest(msg)) => msg,
            other => panic!("expected INVALID_REQUEST for {}, got {:?}", body, other),
        }
    }

    #[test]
    fn parses_every_operation_kind() {
        let create = OperationRequest::from_json(&json!({
            "operation": "create", "table": "todos", "data": {"task": "buy milk"}
        }))
        .unwrap();
        assert_eq!(create.kind(), OperationKind::Create);
        assert_eq!(create.table(), Table::Todos);

        let read = OperationRequest::from_json(&json!({
            "operation": "read", "table": "countries", "filters": {"name": "Chile"}
        }))
        .unwrap();
        match read {
            OperationRequest::Read { filters, .. } => assert_eq!(filters.conditions().len(), 1),
            other => panic!("unexpected {:?}", other),
        }

        let update = OperationRequest::from_json(&json!({
            "operation": "update", "table": "todos", "id": "abc", "data": {"is_complete": true}
        }))
        .unwrap();
        assert!(matches!(update, OperationRequest::Update { id: RecordId::Text(_), .. }));

        let delete = OperationRequest::from_json(&json!({
            "operation": "delete", "table": "messages", "id": 4
        }))
        .unwrap();
        assert_eq!(
            delete,
            OperationRequest::Delete { table: Table::Messages, id: RecordId::Int(4) }
        );
    }

    #[test]
    fn read_filters_are_optional() {
        let read = OperationRequest::from_json(&json!({"operation": "read", "table": "todos"})).unwrap();
        assert_eq!(read, OperationRequest::Read { table: Table::Todos, filters: FilterWhere::new() });

        let null_filters =
            OperationRequest::from_json(&json!({"operation": "read", "table": "todos", "filters": null})).unwrap();
        assert_eq!(null_filters, read);
    }

    #[test]
    fn reports_the_missing_field_per_kind() {
        assert_eq!(invalid(json!({"table": "todos"})), "Missing 'operation' field");
        assert_eq!(invalid(json!({"operation": "", "table": "todos"})), "Missing 'operation' field");

        assert_eq!(invalid(json!({"operation": "create", "data": {"a": 1}})), "Missing 'table' field");
        assert_eq!(invalid(json!({"operation": "create", "table": "todos"})), "Missing 'data' field");

        assert_eq!(invalid(json!({"operation": "read"})), "Missing 'table' field");

        assert_eq!(invalid(json!({"operation": "update", "id": 1, "data": {"a": 1}})), "Missing 'table' field");
        assert_eq!(invalid(json!({"operation": "update", "table": "todos", "data": {"a": 1}})), "Missing 'id' field");
        assert_eq!(invalid(json!({"operation": "update", "table": "todos", "id": 1})), "Missing 'data' field");
        assert_eq!(
            invalid(json!({"operation": "update", "table": "todos", "id": null, "data": {"a": 1}})),
            "Missing 'id' field"
        );

        assert_eq!(invalid(json!({"operation": "delete", "id": 1})), "Missing 'table' field");
        assert_eq!(invalid(json!({"operation": "delete", "table": "todos"})), "Missing 'id' field");
    }

    #[test]
    fn unknown_operation_names_the_literal() {
        assert_eq!(invalid(json!({"operation": "upsert", "table": "todos"})), "Unknown operation: upsert");
        assert_eq!(invalid(json!({"operation": 7, "table": "todos"})), "Unknown operation: 7");
    }

    #[test]
    fn rejects_malformed_fields() {
        assert_eq!(invalid(json!(["create"])), "Request body must be a JSON object");
        assert_eq!(invalid(json!({"operation": "read", "table": "users"})), "Unknown table: users");
        assert_eq!(invalid(json!({"operation": "read", "table": 3})), "'table' must be a string");
        assert_eq!(
            invalid(json!({"operation": "create", "table": "todos", "data": "task"})),
            "'data' must be a JSON object"
        );
        assert_eq!(
            invalid(json!({"operation": "create", "table": "todos", "data": {}})),
            "'data' must not be empty"
        );
        assert_eq!(
            invalid(json!({"operation": "delete", "table": "todos", "id": 1.5})),
            "'id' must be an integer or a string"
        );
        assert_eq!(
            invalid(json!({"operation": "read", "table": "todos", "filters": [1]})),
            "'filters' must be a JSON object"
        );
        assert_eq!(
            invalid(json!({"operation": "create", "table": "todos", "data": {"task;--": 1}})),
            "Invalid column name: task;--"
        );
    }

    #[test]
    fn serializes_back_to_the_wire_shape() {
        let body = json!({"operation": "update", "table": "todos", "id": 3, "data": {"is_complete": true}});
        let request = OperationRequest::from_json(&body).unwrap();
        assert_eq!(request.to_json(), body);

        let read = OperationRequest::Read { table: Table::Todos, filters: FilterWhere::new() };
        assert_eq!(read.to_json(), json!({"operation": "read", "table": "todos"}));
    }
}
