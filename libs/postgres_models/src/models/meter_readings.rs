use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::users::User;
use crate::schema::{mtr, mtr_readings, usr};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::mtr)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MeterReading {
    pub id: i64,
    pub number_meter: String,
    pub date: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::mtr)]
pub struct NewMeterReading {
    pub number_meter: String,
    pub date: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq,
)]
#[diesel(table_name = crate::schema::mtr_readings)]
#[diesel(belongs_to(MeterReading, foreign_key = mtr_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MeterReadingDetail {
    pub id: i64,
    pub mtr_id: i64,
    pub reading_type: String,
    pub value: f64,
}

/// A detail row waiting for its parent id.
#[derive(Debug, Clone)]
pub struct NewDetail {
    pub reading_type: String,
    pub value: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::mtr_readings)]
struct NewMeterReadingDetail {
    mtr_id: i64,
    reading_type: String,
    value: f64,
}

/// A reading joined with its detail rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingWithDetails {
    pub reading: MeterReading,
    pub details: Vec<MeterReadingDetail>,
}

impl MeterReading {
    /// Insert a reading and its details.
    ///
    /// Run this inside a transaction so a failing detail insert does not
    /// leave an orphaned `mtr` row behind.
    pub async fn create_with_details(
        entry: NewMeterReading,
        details: Vec<NewDetail>,
        conn: &mut AsyncPgConnection,
    ) -> Result<ReadingWithDetails, diesel::result::Error> {
        let reading = diesel::insert_into(mtr::table)
            .values(&entry)
            .returning(MeterReading::as_returning())
            .get_result(conn)
            .await?;

        let rows: Vec<NewMeterReadingDetail> = details
            .into_iter()
            .map(|d| NewMeterReadingDetail {
                mtr_id: reading.id,
                reading_type: d.reading_type,
                value: d.value,
            })
            .collect();

        let details = diesel::insert_into(mtr_readings::table)
            .values(&rows)
            .returning(MeterReadingDetail::as_returning())
            .get_results(conn)
            .await?;

        Ok(ReadingWithDetails { reading, details })
    }

    /// The reading with the highest id for the user, if any.
    pub async fn latest_for_user(
        owner_id: i64,
        conn: &mut AsyncPgConnection,
    ) -> Result<Option<ReadingWithDetails>, diesel::result::Error> {
        let latest = mtr::table
            .filter(mtr::user_id.eq(owner_id))
            .order(mtr::id.desc())
            .select(MeterReading::as_select())
            .first(conn)
            .await
            .optional()?;

        match latest {
            Some(reading) => {
                let mut loaded = Self::attach_details(vec![reading], conn).await?;
                Ok(loaded.pop())
            }
            None => Ok(None),
        }
    }

    pub async fn list_for_user(
        owner_id: i64,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<ReadingWithDetails>, diesel::result::Error> {
        let readings = mtr::table
            .filter(mtr::user_id.eq(owner_id))
            .order(mtr::id.asc())
            .select(MeterReading::as_select())
            .load(conn)
            .await?;

        Self::attach_details(readings, conn).await
    }

    /// Every reading in the system together with its owner.
    pub async fn list_all_with_owners(
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<(User, ReadingWithDetails)>, diesel::result::Error> {
        let rows: Vec<(MeterReading, User)> = mtr::table
            .inner_join(usr::table)
            .order(mtr::id.asc())
            .select((MeterReading::as_select(), User::as_select()))
            .load(conn)
            .await?;

        let (readings, owners): (Vec<MeterReading>, Vec<User>) =
            rows.into_iter().unzip();
        let loaded = Self::attach_details(readings, conn).await?;

        Ok(owners.into_iter().zip(loaded).collect())
    }

    async fn attach_details(
        readings: Vec<MeterReading>,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<ReadingWithDetails>, diesel::result::Error> {
        if readings.is_empty() {
            return Ok(Vec::new());
        }

        let details = MeterReadingDetail::belonging_to(&readings)
            .order(mtr_readings::id.asc())
            .select(MeterReadingDetail::as_select())
            .load(conn)
            .await?;

        let grouped = details.grouped_by(&readings);

        Ok(readings
            .into_iter()
            .zip(grouped)
            .map(|(reading, details)| ReadingWithDetails { reading, details })
            .collect())
    }
}
