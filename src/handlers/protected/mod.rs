// handlers/protected/mod.rs - functions that act on behalf of a verified caller
pub mod all_http_methods;
pub mod db_ops;
pub mod delete_method;
pub mod get_claims_demo;

pub use all_http_methods::all_http_methods;
pub use db_ops::db_ops;
pub use delete_method::delete_method;
pub use get_claims_demo::get_claims_demo;

use serde_json::Value;

use crate::error::ApiError;
use crate::types::RecordId;

/// The `id` field of a request body; absent, null, or non-scalar ids are rejected with `missing`.
pub(crate) fn body_id(body: &Value, missing: &str) -> Result<RecordId, ApiError> {
    body.get("id")
        .and_then(RecordId::from_value)
        .ok_or_else(|| ApiError::invalid_request(missing))
}
