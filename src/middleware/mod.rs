pub mod auth;
pub mod panic;
pub mod response;

pub use auth::{extract_jwt_from_headers, AuthUser};
pub use panic::handle_panic;
pub use response::{ApiResponse, ApiResult};
