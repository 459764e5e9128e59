// handlers/public/mod.rs - functions reachable without a caller token
pub mod cors_sdk_demo;
pub mod generate_upload_url;
pub mod root;
pub mod test_sdk_version;

pub use cors_sdk_demo::cors_sdk_demo;
pub use generate_upload_url::generate_upload_url;
pub use root::{health, root};
pub use test_sdk_version::test_sdk_version;
