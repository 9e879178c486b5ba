use crate::{schema::article_views, timestamp::Timestamp};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Queryable, Insertable, Debug, Clone)]
#[table_name = "article_views"]
pub struct ArticleView {
    pub article_id: Uuid,
    pub client_identifier: String,
    pub created_at: Timestamp,
}

pub fn exists(
    article_id: Uuid,
    client_identifier: &str,
    connection: &PgConnection,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        article_views::table.find((article_id, client_identifier)),
    ))
    .get_result(connection)
}

/// Returns `false` when the (article, client) pair was already recorded.
pub fn insert(
    view: &ArticleView,
    connection: &PgConnection,
) -> QueryResult<bool> {
    diesel::insert_into(article_views::table)
        .values(view)
        .on_conflict_do_nothing()
        .execute(connection)
        .map(|rows| rows == 1)
}
