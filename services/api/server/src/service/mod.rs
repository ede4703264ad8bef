pub mod meter_readings;
pub mod users;
