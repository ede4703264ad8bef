//! Plain types and rules for users and meter readings. Nothing in here
//! touches storage or HTTP.

pub mod audit;
pub mod meter_reading;
pub mod user;
