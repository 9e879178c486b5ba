use crate::{db::users::User, schema::api_keys, timestamp::Timestamp};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(
    Associations,
    Queryable,
    Serialize,
    Debug,
    Clone,
    Identifiable,
    Insertable,
)]
#[table_name = "api_keys"]
#[belongs_to(User, foreign_key = "user_id")]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub revoked: bool,
    pub expires_at: Option<Timestamp>,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

pub fn all_from_user(
    user_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<ApiKey>> {
    api_keys::table
        .filter(api_keys::user_id.eq(user_id))
        .order(api_keys::created_at.desc())
        .load::<ApiKey>(connection)
}

/// Live (not revoked) keys sharing a display prefix.
pub fn candidates(
    prefix: &str,
    connection: &PgConnection,
) -> QueryResult<Vec<ApiKey>> {
    api_keys::table
        .filter(api_keys::prefix.eq(prefix))
        .filter(api_keys::revoked.eq(false))
        .load::<ApiKey>(connection)
}

pub fn insert(key: ApiKey, connection: &PgConnection) -> QueryResult<ApiKey> {
    diesel::insert_into(api_keys::table)
        .values(key)
        .get_result(connection)
}

pub fn touch(
    id: Uuid,
    now: Timestamp,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::update(api_keys::table.find(id))
        .set(api_keys::last_used_at.eq(Some(now)))
        .execute(connection)
}

/// Revokes a key owned by `user_id`. Returns `false` if no such key exists.
pub fn revoke(
    id: Uuid,
    user_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<bool> {
    diesel::update(
        api_keys::table
            .filter(api_keys::id.eq(id))
            .filter(api_keys::user_id.eq(user_id)),
    )
    .set(api_keys::revoked.eq(true))
    .execute(connection)
    .map(|rows| rows == 1)
}
