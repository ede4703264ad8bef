use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::usr)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub password: String,
    pub role: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::usr)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub role: String,
}

impl User {
    pub async fn create(
        entry: NewUser,
        conn: &mut AsyncPgConnection,
    ) -> Result<Self, diesel::result::Error> {
        use crate::schema::usr::dsl::*;

        diesel::insert_into(usr)
            .values(&entry)
            .returning(User::as_returning())
            .get_result(conn)
            .await
    }

    pub async fn find_by_id(
        user_id: i64,
        conn: &mut AsyncPgConnection,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::usr::dsl::*;

        usr.find(user_id)
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    pub async fn find_by_name(
        user_name: &str,
        conn: &mut AsyncPgConnection,
    ) -> Result<Option<Self>, diesel::result::Error> {
        use crate::schema::usr::dsl::*;

        usr.filter(name.eq(user_name))
            .select(User::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// All users ordered by id.
    pub async fn list(
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        use crate::schema::usr::dsl::*;

        usr.order(id.asc()).select(User::as_select()).load(conn).await
    }
}
