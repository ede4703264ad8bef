pub(crate) mod core;
pub(crate) mod error_recorder;
pub(crate) mod meter_error_v1;
