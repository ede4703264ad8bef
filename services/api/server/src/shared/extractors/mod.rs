pub mod payload;
pub mod request_id;
pub mod session;
pub mod validations;
