use uuid::Uuid;

use crate::meter_api::core::v1::errors::{
    store_error_code, store_error_to_meter_v1_error,
};
use crate::meter_api::error_recorder::IntoMeterV1Error;
use crate::meter_api::meter_error_v1::{MeterV1Detail, MeterV1Error};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid or unauthorized user")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoMeterV1Error for Error {
    fn error_code(&self) -> &'static str {
        match self {
            Error::Forbidden => "forbidden",
            Error::Store(e) => store_error_code(e),
        }
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        match self {
            Error::Forbidden => MeterV1Error::forbidden(
                "Invalid or unauthorized user".to_string(),
                vec![MeterV1Detail {
                    field: None,
                    code: "forbidden".to_string(),
                    message: "The audit log is restricted to administrators"
                        .to_string(),
                    suggestion: String::new(),
                }],
                request_id.to_string(),
            ),
            Error::Store(e) => store_error_to_meter_v1_error(e, request_id),
        }
    }
}
