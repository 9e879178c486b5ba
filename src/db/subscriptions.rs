use crate::{
    db::channels::Channel,
    schema::{channels, subscriptions, users},
    timestamp::Timestamp,
};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Queryable, Insertable, Debug, Clone)]
#[table_name = "subscriptions"]
pub struct Subscription {
    pub user_id: Uuid,
    pub channel_id: Uuid,
    pub created_at: Timestamp,
}

pub fn count_for_channel(
    channel_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<i64> {
    subscriptions::table
        .filter(subscriptions::channel_id.eq(channel_id))
        .count()
        .get_result(connection)
}

/// Returns `false` when the user was already subscribed.
pub fn insert(
    subscription: &Subscription,
    connection: &PgConnection,
) -> QueryResult<bool> {
    diesel::insert_into(subscriptions::table)
        .values(subscription)
        .on_conflict_do_nothing()
        .execute(connection)
        .map(|rows| rows == 1)
}

/// Returns `false` when there was nothing to delete.
pub fn delete(
    user_id: Uuid,
    channel_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<bool> {
    diesel::delete(subscriptions::table.find((user_id, channel_id)))
        .execute(connection)
        .map(|rows| rows == 1)
}

/// Channels a user subscribes to, newest subscription first.
pub fn channels_for_user(
    user_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<(Subscription, Channel)>> {
    subscriptions::table
        .filter(subscriptions::user_id.eq(user_id))
        .inner_join(channels::table)
        .order(subscriptions::created_at.desc())
        .load::<(Subscription, Channel)>(connection)
}

/// Subscribers of a channel as (username, subscribed at).
pub fn subscribers_of(
    channel_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<(String, Timestamp)>> {
    subscriptions::table
        .filter(subscriptions::channel_id.eq(channel_id))
        .inner_join(users::table)
        .select((users::username, subscriptions::created_at))
        .order(subscriptions::created_at.desc())
        .load::<(String, Timestamp)>(connection)
}
