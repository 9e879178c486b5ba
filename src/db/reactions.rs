use crate::{schema::reactions, timestamp::Timestamp};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Queryable, Insertable, Debug, Clone)]
#[table_name = "reactions"]
pub struct Reaction {
    pub article_id: Uuid,
    pub user_id: Uuid,
    pub is_like: bool,
    pub created_at: Timestamp,
}

pub fn current(
    article_id: Uuid,
    user_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Option<bool>> {
    reactions::table
        .find((article_id, user_id))
        .select(reactions::is_like)
        .get_result::<bool>(connection)
        .optional()
}

/// Returns `false` when a reaction for the pair already exists.
pub fn insert(
    reaction: &Reaction,
    connection: &PgConnection,
) -> QueryResult<bool> {
    diesel::insert_into(reactions::table)
        .values(reaction)
        .on_conflict_do_nothing()
        .execute(connection)
        .map(|rows| rows == 1)
}

pub fn set_is_like(
    article_id: Uuid,
    user_id: Uuid,
    is_like: bool,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::update(reactions::table.find((article_id, user_id)))
        .set(reactions::is_like.eq(is_like))
        .execute(connection)
}

pub fn delete(
    article_id: Uuid,
    user_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::delete(reactions::table.find((article_id, user_id)))
        .execute(connection)
}

pub fn count(
    article_id: Uuid,
    is_like: bool,
    connection: &PgConnection,
) -> QueryResult<i64> {
    reactions::table
        .filter(reactions::article_id.eq(article_id))
        .filter(reactions::is_like.eq(is_like))
        .count()
        .get_result(connection)
}
