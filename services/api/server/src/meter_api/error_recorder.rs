use std::sync::Arc;

use telemetry::metrics::Telemetry;
use uuid::Uuid;

use crate::meter_api::meter_error_v1::MeterV1Error;
use crate::metrics::ServerMetrics;

/// Handler error types that can be converted to [`MeterV1Error`].
pub trait IntoMeterV1Error {
    /// Label for the `request_errors` counter.
    fn error_code(&self) -> &'static str;

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error;
}

/// Records error metrics and converts handler errors to [`MeterV1Error`].
pub struct ErrorRecorder<'a> {
    telemetry: &'a Arc<Telemetry<ServerMetrics>>,
    handler_name: &'a str,
    request_id: &'a Uuid,
}

impl<'a> ErrorRecorder<'a> {
    pub fn new(
        telemetry: &'a Arc<Telemetry<ServerMetrics>>,
        handler_name: &'a str,
        request_id: &'a Uuid,
    ) -> Self {
        Self {
            telemetry,
            handler_name,
            request_id,
        }
    }

    pub fn record<E: IntoMeterV1Error>(&self, e: E) -> MeterV1Error {
        let code = e.error_code();
        self.telemetry.maybe_use_metrics(|m| {
            m.record_error(self.handler_name, code);
        });
        e.into_meter_v1_error(self.request_id)
    }
}
