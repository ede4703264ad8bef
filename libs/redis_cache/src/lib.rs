pub mod connection;
pub mod json_cache;
