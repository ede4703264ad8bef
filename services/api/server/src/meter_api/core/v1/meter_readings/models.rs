use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::domain::meter_reading::{
    MeterReadingRecord, NewDetail, ReadingDetail, TypeTotal, is_blank_reading_type,
    validate_meter_number,
};
use crate::meter_api::core::v1::users::models::UserResponse;

fn meter_number(value: &str) -> Result<(), ValidationError> {
    validate_meter_number(value).map_err(|e| {
        ValidationError::new("invalid_number_meter").with_message(e.to_string().into())
    })
}

fn reading_type(value: &str) -> Result<(), ValidationError> {
    if is_blank_reading_type(value) {
        return Err(ValidationError::new("blank_type")
            .with_message("type must not be blank".into()));
    }
    Ok(())
}

/// A new reading for the logged-in user
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReadingRequest {
    #[validate(custom(function = "meter_number"))]
    #[schema(example = "GAS-0042")]
    pub number_meter: String,
    #[validate(
        length(min = 1, message = "at least one reading detail is required"),
        nested
    )]
    pub details_list: Vec<ReadingDetailRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReadingDetailRequest {
    #[serde(rename = "type")]
    #[validate(custom(function = "reading_type"))]
    #[schema(example = "gas")]
    pub reading_type: String,
    #[validate(range(min = 0.0, message = "value must not be negative"))]
    #[schema(example = 123.4)]
    pub value: f64,
}

impl From<ReadingDetailRequest> for NewDetail {
    fn from(value: ReadingDetailRequest) -> Self {
        Self {
            reading_type: value.reading_type,
            value: value.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeterReadingResponse {
    pub id: i64,
    pub number_meter: String,
    #[schema(example = "2024-02-14T09:05:07Z")]
    pub date: DateTime<Utc>,
    pub user: UserResponse,
    pub details_list: Vec<ReadingDetailResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDetailResponse {
    pub meter_reading_id: i64,
    #[serde(rename = "type")]
    pub reading_type: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TypeTotalResponse {
    #[serde(rename = "type")]
    pub reading_type: String,
    pub total: f64,
}

impl From<ReadingDetail> for ReadingDetailResponse {
    fn from(value: ReadingDetail) -> Self {
        Self {
            meter_reading_id: value.meter_reading_id,
            reading_type: value.reading_type,
            value: value.value,
        }
    }
}

impl From<MeterReadingRecord> for MeterReadingResponse {
    fn from(value: MeterReadingRecord) -> Self {
        Self {
            id: value.id,
            number_meter: value.number_meter,
            date: value.date,
            user: value.owner.into(),
            details_list: value.details.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TypeTotal> for TypeTotalResponse {
    fn from(value: TypeTotal) -> Self {
        Self {
            reading_type: value.reading_type,
            total: value.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{UserProfile, UserRole};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn responses_use_the_public_field_names() {
        let record = MeterReadingRecord {
            id: 4,
            number_meter: "W-1".to_string(),
            date: Utc.with_ymd_and_hms(2024, 2, 14, 9, 5, 7).unwrap(),
            owner: UserProfile {
                id: 2,
                name: "bob".to_string(),
                role: UserRole::User,
            },
            details: vec![ReadingDetail {
                id: 11,
                meter_reading_id: 4,
                reading_type: "water".to_string(),
                value: 12.5,
            }],
        };

        let json = serde_json::to_value(MeterReadingResponse::from(record)).unwrap();
        assert_eq!(
            json,
            json!({
                "id": 4,
                "numberMeter": "W-1",
                "date": "2024-02-14T09:05:07Z",
                "user": { "id": 2, "name": "bob", "role": "USER" },
                "detailsList": [
                    { "meterReadingId": 4, "type": "water", "value": 12.5 }
                ]
            })
        );
    }

    #[test]
    fn submit_requests_are_validated_field_by_field() {
        let request: SubmitReadingRequest = serde_json::from_value(json!({
            "numberMeter": "M 1",
            "detailsList": [{ "type": "gas", "value": -2.0 }]
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("number_meter"));
        assert!(fields.contains_key("details_list"));
    }

    #[test]
    fn whitespace_reading_types_are_rejected() {
        let request: SubmitReadingRequest = serde_json::from_value(json!({
            "numberMeter": "M1",
            "detailsList": [{ "type": "gas", "value": 1.0 }, { "type": "   ", "value": 1.0 }]
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        let Some(validator::ValidationErrorsKind::List(items)) =
            errors.errors().get("details_list")
        else {
            panic!("expected per-item errors: {errors:?}");
        };
        assert_eq!(items.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(
            items[&1].field_errors()["reading_type"][0].code,
            "blank_type"
        );
    }

    #[test]
    fn well_formed_submit_requests_pass() {
        let request: SubmitReadingRequest = serde_json::from_value(json!({
            "numberMeter": "M1",
            "detailsList": [{ "type": "gas", "value": 0.0 }]
        }))
        .unwrap();

        assert!(request.validate().is_ok());
    }
}
