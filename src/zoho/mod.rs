pub mod api_types;
pub mod auth;
pub mod cache;
pub mod client;
pub mod types;
