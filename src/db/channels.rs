use crate::{db::users::User, schema::channels, timestamp::Timestamp};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(
    Associations,
    Queryable,
    Serialize,
    Debug,
    Clone,
    PartialEq,
    Identifiable,
    Insertable,
)]
#[table_name = "channels"]
#[belongs_to(User, foreign_key = "owner_id")]
pub struct Channel {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub profile_image_url: Option<String>,
    pub banner_image_url: Option<String>,
    #[serde(skip_serializing)]
    pub admin_subscriber_count: i64,
    pub created_at: Timestamp,
}

/// Owner-editable channel fields. `None` leaves a column untouched.
#[derive(AsChangeset, Debug, Default)]
#[table_name = "channels"]
pub struct ChannelChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub banner_image_url: Option<String>,
}

impl ChannelChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.profile_image_url.is_none()
            && self.banner_image_url.is_none()
    }
}

pub fn all(connection: &PgConnection) -> QueryResult<Vec<Channel>> {
    channels::table
        .order(channels::created_at.desc())
        .load::<Channel>(connection)
}

pub fn all_from_owner(
    owner_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<Channel>> {
    channels::table
        .filter(channels::owner_id.eq(owner_id))
        .order(channels::created_at.asc())
        .load::<Channel>(connection)
}

pub fn count_owned(
    owner_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<i64> {
    channels::table
        .filter(channels::owner_id.eq(owner_id))
        .count()
        .get_result(connection)
}

pub fn get(id: Uuid, connection: &PgConnection) -> QueryResult<Channel> {
    channels::table.find(id).get_result::<Channel>(connection)
}

pub fn find(
    id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Option<Channel>> {
    get(id, connection).optional()
}

/// Like `find`, but holds the row lock until the surrounding transaction
/// ends.
pub fn find_for_update(
    id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Option<Channel>> {
    channels::table
        .find(id)
        .for_update()
        .get_result::<Channel>(connection)
        .optional()
}

/// Resolves a path segment that may hold either a channel id or its slug.
pub fn get_by_id_or_slug(
    raw: &str,
    connection: &PgConnection,
) -> QueryResult<Channel> {
    match Uuid::parse_str(raw) {
        Ok(id) => get(id, connection),
        Err(_) => channels::table
            .filter(channels::slug.eq(raw))
            .get_result::<Channel>(connection),
    }
}

pub fn slug_taken(slug: &str, connection: &PgConnection) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        channels::table.filter(channels::slug.eq(slug)),
    ))
    .get_result(connection)
}

pub fn insert(
    channel: Channel,
    connection: &PgConnection,
) -> QueryResult<Channel> {
    diesel::insert_into(channels::table)
        .values(channel)
        .get_result(connection)
}

pub fn update(
    id: Uuid,
    changes: &ChannelChanges,
    connection: &PgConnection,
) -> QueryResult<Channel> {
    if changes.is_empty() {
        return get(id, connection);
    }
    diesel::update(channels::table.find(id))
        .set(changes)
        .get_result(connection)
}

pub fn set_admin_subscriber_count(
    id: Uuid,
    count: i64,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::update(channels::table.find(id))
        .set(channels::admin_subscriber_count.eq(count))
        .execute(connection)
}
