pub mod error;
pub mod filter_where;

pub use error::FilterError;
pub use filter_where::{loosely_equal, quote_identifier, validate_identifier, FilterCondition, FilterWhere};
