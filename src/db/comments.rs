use crate::{
    db::{articles::Article, users::User},
    schema::{comments, users},
    timestamp::Timestamp,
};
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
#[table_name = "comments"]
#[belongs_to(Article, foreign_key = "article_id")]
#[belongs_to(User, foreign_key = "author_id")]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
}

/// A comment with its author's username, oldest first.
pub fn all_from_article(
    article_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<(Comment, String)>> {
    comments::table
        .filter(comments::article_id.eq(article_id))
        .inner_join(users::table)
        .select((comments::all_columns, users::username))
        .order(comments::created_at.asc())
        .load::<(Comment, String)>(connection)
}

pub fn get(id: Uuid, connection: &PgConnection) -> QueryResult<Comment> {
    comments::table.find(id).get_result::<Comment>(connection)
}

pub fn insert(
    comment: Comment,
    connection: &PgConnection,
) -> QueryResult<Comment> {
    diesel::insert_into(comments::table)
        .values(comment)
        .get_result(connection)
}

pub fn delete(id: Uuid, connection: &PgConnection) -> QueryResult<usize> {
    diesel::delete(comments::table.find(id)).execute(connection)
}
