use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

#[derive(Queryable, Selectable, Debug, Clone, serde::Serialize)]
#[diesel(table_name = crate::schema::audit)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Audit {
    pub id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::audit)]
pub struct NewAudit {
    pub message: String,
}

impl Audit {
    pub async fn create(
        entry: NewAudit,
        conn: &mut AsyncPgConnection,
    ) -> Result<Self, diesel::result::Error> {
        use crate::schema::audit::dsl::*;

        diesel::insert_into(audit)
            .values(&entry)
            .returning(Audit::as_returning())
            .get_result(conn)
            .await
    }

    /// Get the last N audit entries ordered by most recent first.
    pub async fn get_latest(
        limit: i64,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::audit::dsl::*;

        audit
            .order((created_at.desc(), id.desc()))
            .limit(limit)
            .select(Audit::as_select())
            .load(conn)
            .await
    }
}
