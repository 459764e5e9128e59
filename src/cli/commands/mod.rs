pub mod claims;
pub mod cors;
pub mod db;
pub mod token;
pub mod upload;
