use std::sync::Arc;

use chrono::Utc;

use crate::domain::meter_reading::{
    self, MeterReadingRecord, NewDetail, NewMeterReading,
    ReadingValidationError, TypeTotal,
};
use crate::domain::user::{UserProfile, has_role_admin};
use crate::store::{MeterReadingStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum MeterReadingError {
    #[error(transparent)]
    Validation(#[from] ReadingValidationError),

    #[error("Invalid or unauthorized user")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct MeterReadingService {
    readings: Arc<dyn MeterReadingStore>,
}

impl MeterReadingService {
    pub fn new(readings: Arc<dyn MeterReadingStore>) -> Self {
        Self { readings }
    }

    /// Stores a new reading for `user`, stamped with the current time.
    pub async fn submit_reading(
        &self,
        user: &UserProfile,
        number_meter: String,
        details: Vec<NewDetail>,
    ) -> Result<MeterReadingRecord, MeterReadingError> {
        meter_reading::validate_meter_number(&number_meter)?;
        meter_reading::validate_details(&details)?;

        let record = self
            .readings
            .create(NewMeterReading {
                number_meter,
                date: Utc::now(),
                owner: user.clone(),
                details,
            })
            .await?;

        tracing::info!(
            user_id = user.id,
            reading_id = record.id,
            details = record.details.len(),
            "meter reading submitted"
        );
        Ok(record)
    }

    /// Zero or one readings: the newest one by id.
    pub async fn get_current_readings(
        &self,
        user: &UserProfile,
    ) -> Result<Vec<MeterReadingRecord>, MeterReadingError> {
        let latest = self.readings.latest_for_user(user).await?;
        Ok(latest.into_iter().collect())
    }

    pub async fn get_readings_history(
        &self,
        user: &UserProfile,
    ) -> Result<Vec<MeterReadingRecord>, MeterReadingError> {
        Ok(self.readings.list_for_user(user).await?)
    }

    pub async fn get_readings_by_month(
        &self,
        user: &UserProfile,
        month: u32,
    ) -> Result<Vec<MeterReadingRecord>, MeterReadingError> {
        meter_reading::validate_month(month)?;

        let readings = self.readings.list_for_user(user).await?;
        Ok(meter_reading::filter_by_month(readings, month))
    }

    pub async fn get_all_readings_history(
        &self,
        user: &UserProfile,
    ) -> Result<Vec<MeterReadingRecord>, MeterReadingError> {
        if !has_role_admin(user) {
            return Err(MeterReadingError::Forbidden);
        }

        Ok(self.readings.list_all().await?)
    }

    pub async fn get_totals_by_type(
        &self,
        user: &UserProfile,
    ) -> Result<Vec<TypeTotal>, MeterReadingError> {
        let readings = self.readings.list_for_user(user).await?;
        Ok(meter_reading::totals_by_type(&readings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::meter_reading::ReadingDetail;
    use crate::domain::user::UserRole;
    use crate::store::MockMeterReadingStore;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn user(role: UserRole) -> UserProfile {
        UserProfile {
            id: 1,
            name: "alice".to_string(),
            role,
        }
    }

    fn stored(id: i64, month: u32, details: &[(&str, f64)]) -> MeterReadingRecord {
        MeterReadingRecord {
            id,
            number_meter: "M1".to_string(),
            date: Utc.with_ymd_and_hms(2024, month, 1, 12, 0, 0).unwrap(),
            owner: user(UserRole::User),
            details: details
                .iter()
                .map(|(t, v)| ReadingDetail {
                    id,
                    meter_reading_id: id,
                    reading_type: t.to_string(),
                    value: *v,
                })
                .collect(),
        }
    }

    fn gas(value: f64) -> NewDetail {
        NewDetail {
            reading_type: "gas".to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn submit_stamps_the_reading_and_stores_it() {
        let mut store = MockMeterReadingStore::new();
        store
            .expect_create()
            .withf(|r| r.number_meter == "M1" && r.owner.id == 1 && r.details.len() == 1)
            .returning(|r| {
                Ok(MeterReadingRecord {
                    id: 10,
                    number_meter: r.number_meter,
                    date: r.date,
                    owner: r.owner,
                    details: vec![],
                })
            });

        let before = Utc::now();
        let record = MeterReadingService::new(Arc::new(store))
            .submit_reading(&user(UserRole::User), "M1".to_string(), vec![gas(1.0)])
            .await
            .unwrap();

        assert_eq!(record.id, 10);
        assert!(record.date >= before);
    }

    #[tokio::test]
    async fn submit_rejects_bad_input_before_storing() {
        let mut store = MockMeterReadingStore::new();
        store.expect_create().never();
        let service = MeterReadingService::new(Arc::new(store));
        let alice = user(UserRole::User);

        let cases = [
            ("M 1", vec![gas(1.0)], ReadingValidationError::InvalidNumberMeter),
            ("", vec![gas(1.0)], ReadingValidationError::InvalidNumberMeter),
            ("M1", vec![], ReadingValidationError::EmptyDetails),
            ("M1", vec![gas(-1.0)], ReadingValidationError::InvalidValue { index: 0 }),
        ];

        for (meter, details, expected) in cases {
            match service.submit_reading(&alice, meter.to_string(), details).await {
                Err(MeterReadingError::Validation(e)) => assert_eq!(e, expected),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn current_readings_hold_at_most_the_latest() {
        let alice = user(UserRole::User);

        let mut store = MockMeterReadingStore::new();
        store
            .expect_latest_for_user()
            .returning(|_| Ok(Some(stored(7, 1, &[]))));
        let current = MeterReadingService::new(Arc::new(store))
            .get_current_readings(&alice)
            .await
            .unwrap();
        assert_eq!(current.iter().map(|r| r.id).collect::<Vec<_>>(), vec![7]);

        let mut empty = MockMeterReadingStore::new();
        empty.expect_latest_for_user().returning(|_| Ok(None));
        let current = MeterReadingService::new(Arc::new(empty))
            .get_current_readings(&alice)
            .await
            .unwrap();
        assert!(current.is_empty());
    }

    #[tokio::test]
    async fn month_lookup_validates_and_filters() {
        let mut store = MockMeterReadingStore::new();
        store
            .expect_list_for_user()
            .times(1)
            .returning(|_| Ok(vec![stored(1, 2, &[]), stored(2, 3, &[]), stored(3, 2, &[])]));
        let service = MeterReadingService::new(Arc::new(store));
        let alice = user(UserRole::User);

        assert!(matches!(
            service.get_readings_by_month(&alice, 13).await,
            Err(MeterReadingError::Validation(
                ReadingValidationError::InvalidMonth(13)
            ))
        ));

        let february = service.get_readings_by_month(&alice, 2).await.unwrap();
        assert_eq!(february.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn global_history_is_for_admins_only() {
        let mut store = MockMeterReadingStore::new();
        store
            .expect_list_all()
            .times(1)
            .returning(|| Ok(vec![stored(1, 1, &[])]));
        let service = MeterReadingService::new(Arc::new(store));

        assert!(matches!(
            service.get_all_readings_history(&user(UserRole::User)).await,
            Err(MeterReadingError::Forbidden)
        ));
        assert_eq!(
            service
                .get_all_readings_history(&user(UserRole::Admin))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn totals_cover_the_users_history() {
        let mut store = MockMeterReadingStore::new();
        store.expect_list_for_user().returning(|_| {
            Ok(vec![
                stored(1, 1, &[("gas", 1.5), ("water", 2.0)]),
                stored(2, 2, &[("gas", 2.5)]),
            ])
        });

        let totals = MeterReadingService::new(Arc::new(store))
            .get_totals_by_type(&user(UserRole::User))
            .await
            .unwrap();

        assert_eq!(
            totals,
            vec![
                TypeTotal {
                    reading_type: "gas".to_string(),
                    total: 4.0
                },
                TypeTotal {
                    reading_type: "water".to_string(),
                    total: 2.0
                },
            ]
        );
    }
}
