use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use super::user::UserProfile;

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingDetail {
    pub id: i64,
    pub meter_reading_id: i64,
    pub reading_type: String,
    pub value: f64,
}

/// A stored reading with its owner and detail rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReadingRecord {
    pub id: i64,
    pub number_meter: String,
    pub date: DateTime<Utc>,
    pub owner: UserProfile,
    pub details: Vec<ReadingDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDetail {
    pub reading_type: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMeterReading {
    pub number_meter: String,
    pub date: DateTime<Utc>,
    pub owner: UserProfile,
    pub details: Vec<NewDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeTotal {
    pub reading_type: String,
    pub total: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReadingValidationError {
    #[error("Invalid numberMeter")]
    InvalidNumberMeter,

    #[error("Invalid month")]
    InvalidMonth(u32),

    #[error("At least one reading detail is required")]
    EmptyDetails,

    #[error("Reading type must not be blank")]
    BlankType { index: usize },

    #[error("Reading value must be a finite, non-negative number")]
    InvalidValue { index: usize },
}

/// A meter number is a single non-empty token.
pub fn validate_meter_number(number: &str) -> Result<(), ReadingValidationError> {
    if number.is_empty() || number.chars().any(char::is_whitespace) {
        return Err(ReadingValidationError::InvalidNumberMeter);
    }
    Ok(())
}

pub fn is_blank_reading_type(reading_type: &str) -> bool {
    reading_type.trim().is_empty()
}

pub fn validate_month(month: u32) -> Result<(), ReadingValidationError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(ReadingValidationError::InvalidMonth(month))
    }
}

pub fn validate_details(details: &[NewDetail]) -> Result<(), ReadingValidationError> {
    if details.is_empty() {
        return Err(ReadingValidationError::EmptyDetails);
    }

    for (index, detail) in details.iter().enumerate() {
        if is_blank_reading_type(&detail.reading_type) {
            return Err(ReadingValidationError::BlankType { index });
        }
        if !detail.value.is_finite() || detail.value < 0.0 {
            return Err(ReadingValidationError::InvalidValue { index });
        }
    }

    Ok(())
}

/// The reading with the highest id.
pub fn current_reading<'a, I>(readings: I) -> Option<&'a MeterReadingRecord>
where
    I: IntoIterator<Item = &'a MeterReadingRecord>,
{
    readings.into_iter().max_by_key(|r| r.id)
}

/// Keeps readings taken in `month` of any year, in their original order.
pub fn filter_by_month(
    readings: Vec<MeterReadingRecord>,
    month: u32,
) -> Vec<MeterReadingRecord> {
    readings
        .into_iter()
        .filter(|r| r.date.month() == month)
        .collect()
}

/// Sums detail values per reading type, ordered by type.
pub fn totals_by_type(readings: &[MeterReadingRecord]) -> Vec<TypeTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for detail in readings.iter().flat_map(|r| &r.details) {
        *totals.entry(detail.reading_type.as_str()).or_default() += detail.value;
    }

    totals
        .into_iter()
        .map(|(reading_type, total)| TypeTotal {
            reading_type: reading_type.to_string(),
            total,
        })
        .collect()
}
