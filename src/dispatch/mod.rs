//! Generic CRUD dispatch: a tagged operation request is validated, forwarded to exactly one
//! data-store call, and the result normalized for the `{success, data}` envelope.

pub mod dispatcher;
pub mod operation;

use thiserror::Error;

pub use dispatcher::{Dispatcher, OperationOutput};
pub use operation::OperationRequest;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Missing or malformed input, detected before any data access.
    #[error("{0}")]
    InvalidRequest(String),

    /// The data store reported failure; message is passed through verbatim.
    #[error("{0}")]
    Upstream(String),

    /// Anything unexpected while dispatching.
    #[error("{0}")]
    Internal(String),
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::InvalidRequest(_) => "INVALID_REQUEST",
            DispatchError::Upstream(_) => "UPSTREAM_ERROR",
            DispatchError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        DispatchError::InvalidRequest(format!("Missing '{}' field", field))
    }
}

impl From<crate::filter::FilterError> for DispatchError {
    fn from(err: crate::filter::FilterError) -> Self {
        DispatchError::InvalidRequest(err.to_string())
    }
}
