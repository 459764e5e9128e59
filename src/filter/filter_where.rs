use serde_json::{Map, Number, Value};

use super::error::FilterError;

/// One `column = value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub column: String,
    pub value: Value,
}

/// Unordered conjunction of equality predicates, as accepted by a `read` operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterWhere {
    conditions: Vec<FilterCondition>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `{ column: value }` mapping, rejecting column names that are not plain identifiers.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, FilterError> {
        let mut filter = Self::new();
        for (column, value) in map {
            filter = filter.eq(column, value.clone())?;
        }
        Ok(filter)
    }

    pub fn from_value(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Self::from_map(map),
            _ => Err(FilterError::NotAnObject),
        }
    }

    pub fn eq(mut self, column: &str, value: Value) -> Result<Self, FilterError> {
        validate_identifier(column)?;
        self.conditions.push(FilterCondition { column: column.to_string(), value });
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.conditions
            .iter()
            .map(|c| (c.column.clone(), c.value.clone()))
            .collect()
    }

    /// True when every predicate holds for the record. A missing column only matches `null`.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|condition| {
            let actual = record.get(&condition.column).unwrap_or(&Value::Null);
            loosely_equal(actual, &condition.value)
        })
    }

    /// Render a WHERE clause with numbered text parameters starting at `$starting_param_index + 1`.
    ///
    /// Columns are compared through their text form, so `"1"` and `1` select the same rows,
    /// matching what the in-memory matcher does.
    pub fn to_sql(&self, starting_param_index: usize) -> (String, Vec<String>) {
        let mut params = Vec::new();
        let mut sql_conditions = Vec::new();

        for condition in &self.conditions {
            let column = quote_identifier(&condition.column);
            match scalar_text(&condition.value) {
                None => sql_conditions.push(format!("{} IS NULL", column)),
                Some(text) => {
                    params.push(text);
                    sql_conditions.push(format!(
                        "{}::text = ${}",
                        column,
                        starting_param_index + params.len()
                    ));
                }
            }
        }

        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        (where_clause, params)
    }
}

/// Column and table names must be plain SQL identifiers.
pub fn validate_identifier(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid && name.len() <= 63 {
        Ok(())
    } else {
        Err(FilterError::InvalidColumn(name.to_string()))
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Text form used for comparisons; `None` for JSON null.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Equality as seen through a text-typed REST filter: identical JSON, or identical text form.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => match (integer(x), integer(y)) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        },
        _ => scalar_text(a) == scalar_text(b),
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FilterWhere::new();
        assert!(filter.matches(&record(json!({"a": 1}))));
        assert_eq!(filter.to_sql(0), ("1=1".to_string(), vec![]));
    }

    #[test]
    fn conjunction_requires_every_predicate() {
        let filter = FilterWhere::from_value(&json!({"a": 1, "b": 2})).unwrap();
        assert!(filter.matches(&record(json!({"a": 1, "b": 2, "c": 3}))));
        assert!(!filter.matches(&record(json!({"a": 1, "b": 3}))));
        assert!(!filter.matches(&record(json!({"a": 1}))));
    }

    #[test]
    fn numbers_and_strings_compare_by_text() {
        assert!(loosely_equal(&json!(1), &json!("1")));
        assert!(loosely_equal(&json!(true), &json!("true")));
        assert!(loosely_equal(&json!(2.0), &json!(2)));
        assert!(!loosely_equal(&json!(1), &json!("01")));
        assert!(!loosely_equal(&Value::Null, &json!("null")));
    }

    #[test]
    fn large_integers_compare_exactly() {
        assert!(!loosely_equal(&json!(9007199254740992_i64), &json!(9007199254740993_i64)));
        assert!(loosely_equal(&json!(9007199254740993_i64), &json!(9007199254740993_u64)));
        assert!(!loosely_equal(&json!(u64::MAX), &json!(-1)));
    }

    #[test]
    fn null_filter_matches_missing_column() {
        let filter = FilterWhere::from_value(&json!({"deleted": null})).unwrap();
        assert!(filter.matches(&record(json!({"a": 1}))));
        assert!(!filter.matches(&record(json!({"deleted": false}))));
    }

    #[test]
    fn renders_numbered_params() {
        let filter = FilterWhere::new()
            .eq("user_id", json!("u1"))
            .unwrap()
            .eq("is_complete", json!(false))
            .unwrap()
            .eq("archived_at", Value::Null)
            .unwrap();
        let (sql, params) = filter.to_sql(1);
        assert_eq!(
            sql,
            "\"user_id\"::text = $2 AND \"is_complete\"::text = $3 AND \"archived_at\" IS NULL"
        );
        assert_eq!(params, vec!["u1".to_string(), "false".to_string()]);
    }

    #[test]
    fn rejects_non_identifier_columns() {
        assert_eq!(
            FilterWhere::from_value(&json!({"a; DROP TABLE todos": 1})),
            Err(FilterError::InvalidColumn("a; DROP TABLE todos".to_string()))
        );
        assert_eq!(FilterWhere::from_value(&json!([1, 2])), Err(FilterError::NotAnObject));
        assert!(validate_identifier("_private1").is_ok());
        assert!(validate_identifier("1st").is_err());
        assert!(validate_identifier("").is_err());
    }
}
