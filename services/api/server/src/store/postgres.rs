use async_trait::async_trait;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use futures::FutureExt;
use postgres_models::connection::{
    Pool, WithConnectionError, with_connection, with_transaction,
};
use postgres_models::models::audit::{Audit, NewAudit};
use postgres_models::models::meter_readings::{
    MeterReading, NewDetail as NewDetailRow, NewMeterReading as NewMeterReadingRow,
    ReadingWithDetails,
};
use postgres_models::models::users::{NewUser, User};

use super::{AuditStore, MeterReadingStore, StoreError, StoreResult, UserStore};
use crate::domain::audit::AuditEntry;
use crate::domain::meter_reading::{
    MeterReadingRecord, NewMeterReading, ReadingDetail,
};
use crate::domain::user::{NewUserAccount, UserAccount, UserProfile};

impl From<WithConnectionError<DieselError>> for StoreError {
    fn from(value: WithConnectionError<DieselError>) -> Self {
        match value {
            WithConnectionError::Pool(e) => StoreError::Unavailable(e.to_string()),
            WithConnectionError::Operation(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => StoreError::Duplicate(info.message().to_string()),
            WithConnectionError::Operation(e) => StoreError::Query(e.to_string()),
        }
    }
}

fn account(row: User) -> StoreResult<UserAccount> {
    let role = row
        .role
        .parse()
        .map_err(|e| StoreError::Query(format!("user {}: {e}", row.id)))?;

    Ok(UserAccount {
        id: row.id,
        name: row.name,
        password_hash: row.password,
        role,
    })
}

fn record(owner: UserProfile, row: ReadingWithDetails) -> MeterReadingRecord {
    MeterReadingRecord {
        id: row.reading.id,
        number_meter: row.reading.number_meter,
        date: row.reading.date,
        owner,
        details: row
            .details
            .into_iter()
            .map(|d| ReadingDetail {
                id: d.id,
                meter_reading_id: d.mtr_id,
                reading_type: d.reading_type,
                value: d.value,
            })
            .collect(),
    }
}

/// Writes go to the read-write pool, lookups to the read-only replica.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
    read_only_pool: Pool,
}

impl PostgresStore {
    pub fn new(pool: Pool, read_only_pool: Pool) -> Self {
        Self {
            pool,
            read_only_pool,
        }
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create(&self, user: NewUserAccount) -> StoreResult<UserAccount> {
        let entry = NewUser {
            name: user.name,
            password: user.password_hash,
            role: user.role.to_string(),
        };

        let row = with_connection(&self.pool, |mut conn| async move {
            User::create(entry, &mut conn).await
        })
        .await?;

        account(row)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserAccount>> {
        // Registration is followed by lookups straight away, stay on the primary.
        let row = with_connection(&self.pool, |mut conn| async move {
            User::find_by_id(id, &mut conn).await
        })
        .await?;

        row.map(account).transpose()
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<UserAccount>> {
        let row = with_connection(&self.pool, |mut conn| async move {
            User::find_by_name(name, &mut conn).await
        })
        .await?;

        row.map(account).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<UserAccount>> {
        let rows = with_connection(&self.read_only_pool, |mut conn| async move {
            User::list(&mut conn).await
        })
        .await?;

        rows.into_iter().map(account).collect()
    }
}

#[async_trait]
impl MeterReadingStore for PostgresStore {
    async fn create(
        &self,
        reading: NewMeterReading,
    ) -> StoreResult<MeterReadingRecord> {
        let entry = NewMeterReadingRow {
            number_meter: reading.number_meter,
            date: reading.date,
            user_id: reading.owner.id,
        };
        let details: Vec<NewDetailRow> = reading
            .details
            .into_iter()
            .map(|d| NewDetailRow {
                reading_type: d.reading_type,
                value: d.value,
            })
            .collect();

        let row = with_transaction(&self.pool, |conn| {
            async move {
                MeterReading::create_with_details(entry, details, conn).await
            }
            .boxed()
        })
        .await?;

        Ok(record(reading.owner, row))
    }

    async fn latest_for_user(
        &self,
        owner: &UserProfile,
    ) -> StoreResult<Option<MeterReadingRecord>> {
        let owner_id = owner.id;
        let row = with_connection(&self.pool, |mut conn| async move {
            MeterReading::latest_for_user(owner_id, &mut conn).await
        })
        .await?;

        Ok(row.map(|r| record(owner.clone(), r)))
    }

    async fn list_for_user(
        &self,
        owner: &UserProfile,
    ) -> StoreResult<Vec<MeterReadingRecord>> {
        let owner_id = owner.id;
        let rows = with_connection(&self.pool, |mut conn| async move {
            MeterReading::list_for_user(owner_id, &mut conn).await
        })
        .await?;

        Ok(rows.into_iter().map(|r| record(owner.clone(), r)).collect())
    }

    async fn list_all(&self) -> StoreResult<Vec<MeterReadingRecord>> {
        let rows = with_connection(&self.read_only_pool, |mut conn| async move {
            MeterReading::list_all_with_owners(&mut conn).await
        })
        .await?;

        rows.into_iter()
            .map(|(owner, row)| Ok(record(account(owner)?.profile(), row)))
            .collect()
    }
}

#[async_trait]
impl AuditStore for PostgresStore {
    async fn append(&self, message: String) -> StoreResult<AuditEntry> {
        let row = with_connection(&self.pool, |mut conn| async move {
            Audit::create(NewAudit { message }, &mut conn).await
        })
        .await?;

        Ok(AuditEntry {
            id: row.id,
            message: row.message,
            created_at: row.created_at,
        })
    }

    async fn latest(&self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = with_connection(&self.read_only_pool, |mut conn| async move {
            Audit::get_latest(limit, &mut conn).await
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AuditEntry {
                id: row.id,
                message: row.message,
                created_at: row.created_at,
            })
            .collect())
    }
}
