use crate::{schema::users, timestamp::Timestamp};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(
    Queryable, Serialize, Debug, Clone, Identifiable, Insertable,
)]
#[table_name = "users"]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: Timestamp,
}

pub fn get(id: Uuid, connection: &PgConnection) -> QueryResult<User> {
    users::table.find(id).get_result::<User>(connection)
}

/// Locks the user row until the surrounding transaction ends.
pub fn lock(id: Uuid, connection: &PgConnection) -> QueryResult<Uuid> {
    users::table
        .find(id)
        .select(users::id)
        .for_update()
        .get_result(connection)
}

pub fn find_by_username(
    username: &str,
    connection: &PgConnection,
) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(username))
        .get_result::<User>(connection)
        .optional()
}

pub fn insert(user: User, connection: &PgConnection) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(user)
        .get_result(connection)
}

pub fn update_password(
    id: Uuid,
    password: String,
    connection: &PgConnection,
) -> QueryResult<User> {
    diesel::update(users::table.find(id))
        .set(users::password.eq(password))
        .get_result(connection)
}

pub fn delete(id: Uuid, connection: &PgConnection) -> QueryResult<usize> {
    diesel::delete(users::table.find(id)).execute(connection)
}
