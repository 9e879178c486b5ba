use crate::{
    db::users::User,
    schema::{tokens, users},
    timestamp::Timestamp,
};
use diesel::prelude::*;
use uuid::Uuid;

pub type TokenId = Uuid;

#[derive(Queryable, Debug, Associations, Insertable)]
#[table_name = "tokens"]
#[belongs_to(User, foreign_key = "user_id")]
pub struct Token {
    pub id: TokenId,
    pub user_id: Uuid,
    pub expires: Timestamp,
}

/// Looks up a session token together with the user it belongs to.
pub fn get_with_user(
    id: TokenId,
    connection: &PgConnection,
) -> QueryResult<(Token, User)> {
    tokens::table
        .find(id)
        .inner_join(users::table)
        .get_result::<(Token, User)>(connection)
}

pub fn insert(token: Token, connection: &PgConnection) -> QueryResult<Token> {
    diesel::insert_into(tokens::table)
        .values(token)
        .get_result(connection)
}

pub fn delete(id: TokenId, connection: &PgConnection) -> QueryResult<usize> {
    diesel::delete(tokens::table.find(id)).execute(connection)
}

pub fn delete_expired(
    user_id: Uuid,
    now: Timestamp,
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::delete(
        tokens::table
            .filter(tokens::user_id.eq(user_id))
            .filter(tokens::expires.lt(now)),
    )
    .execute(connection)
}
