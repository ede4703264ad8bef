use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    AuditStore, MeterReadingStore, SessionStore, StoreError, StoreResult,
    UserStore,
};
use crate::domain::audit::AuditEntry;
use crate::domain::meter_reading::{
    self, MeterReadingRecord, NewMeterReading, ReadingDetail,
};
use crate::domain::user::{NewUserAccount, UserAccount, UserProfile};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, UserAccount>,
    readings: BTreeMap<i64, MeterReadingRecord>,
    audit: Vec<AuditEntry>,
    next_user_id: i64,
    next_reading_id: i64,
    next_detail_id: i64,
    next_audit_id: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// Users, readings and audit rows kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUserAccount) -> StoreResult<UserAccount> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        if tables.users.values().any(|u| u.name == user.name) {
            return Err(StoreError::Duplicate(format!(
                "user `{}` already exists",
                user.name
            )));
        }

        let account = UserAccount {
            id: next(&mut tables.next_user_id),
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserAccount>> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<UserAccount>> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.users.values().find(|u| u.name == name).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<UserAccount>> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.users.values().cloned().collect())
    }
}

#[async_trait]
impl MeterReadingStore for MemoryStore {
    async fn create(
        &self,
        reading: NewMeterReading,
    ) -> StoreResult<MeterReadingRecord> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        if !tables.users.contains_key(&reading.owner.id) {
            return Err(StoreError::Query(format!(
                "user {} does not exist",
                reading.owner.id
            )));
        }

        let id = next(&mut tables.next_reading_id);
        let details = reading
            .details
            .into_iter()
            .map(|d| ReadingDetail {
                id: next(&mut tables.next_detail_id),
                meter_reading_id: id,
                reading_type: d.reading_type,
                value: d.value,
            })
            .collect();

        let record = MeterReadingRecord {
            id,
            number_meter: reading.number_meter,
            date: reading.date,
            owner: reading.owner,
            details,
        };
        tables.readings.insert(id, record.clone());
        Ok(record)
    }

    async fn latest_for_user(
        &self,
        owner: &UserProfile,
    ) -> StoreResult<Option<MeterReadingRecord>> {
        let tables = self.inner.read().map_err(poisoned)?;
        let owned = tables.readings.values().filter(|r| r.owner.id == owner.id);
        Ok(meter_reading::current_reading(owned).cloned())
    }

    async fn list_for_user(
        &self,
        owner: &UserProfile,
    ) -> StoreResult<Vec<MeterReadingRecord>> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables
            .readings
            .values()
            .filter(|r| r.owner.id == owner.id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> StoreResult<Vec<MeterReadingRecord>> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.readings.values().cloned().collect())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, message: String) -> StoreResult<AuditEntry> {
        let mut tables = self.inner.write().map_err(poisoned)?;
        let entry = AuditEntry {
            id: next(&mut tables.next_audit_id),
            message,
            created_at: Utc::now(),
        };
        tables.audit.push(entry.clone());
        Ok(entry)
    }

    async fn latest(&self, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        let tables = self.inner.read().map_err(poisoned)?;
        Ok(tables.audit.iter().rev().take(limit).cloned().collect())
    }
}

/// Sessions with a per-entry deadline. Expired entries are dropped on
/// lookup and swept whenever a session is created.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<Uuid, (UserProfile, Instant)>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: UserProfile, ttl: Duration) -> StoreResult<Uuid> {
        let session_id = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.inner.write().map_err(poisoned)?;
        sessions.retain(|_, (_, deadline)| *deadline > now);
        sessions.insert(session_id, (user, now + ttl));
        Ok(session_id)
    }

    async fn get(&self, session_id: Uuid) -> StoreResult<Option<UserProfile>> {
        let mut sessions = self.inner.write().map_err(poisoned)?;
        match sessions.get(&session_id) {
            Some((user, deadline)) if *deadline > Instant::now() => {
                Ok(Some(user.clone()))
            }
            Some(_) => {
                sessions.remove(&session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, session_id: Uuid) -> StoreResult<()> {
        let mut sessions = self.inner.write().map_err(poisoned)?;
        sessions.remove(&session_id);
        Ok(())
    }
}
