use crate::{
    db::channels::Channel,
    schema::{article_categories, articles},
    timestamp::Timestamp,
};
use diesel::{
    deserialize::{self, FromSql},
    pg::Pg,
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
    sql_types,
};
use serde::{Deserialize, Serialize};
use std::{fmt, io::Write, str::FromStr};
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
)]
#[sql_type = "sql_types::Text"]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }

    pub fn toggled(self) -> ArticleStatus {
        match self {
            ArticleStatus::Draft => ArticleStatus::Published,
            ArticleStatus::Published => ArticleStatus::Draft,
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ArticleStatus::Draft),
            "published" => Ok(ArticleStatus::Published),
            other => Err(format!("unknown article status {:?}", other)),
        }
    }
}

impl ToSql<sql_types::Text, Pg> for ArticleStatus {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<sql_types::Text, Pg> for ArticleStatus {
    fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<sql_types::Text, Pg>>::from_sql(bytes)?;
        raw.parse().map_err(Into::into)
    }
}

#[derive(
    Associations,
    Queryable,
    Debug,
    Clone,
    PartialEq,
    Identifiable,
    Insertable,
)]
#[table_name = "articles"]
#[belongs_to(Channel, foreign_key = "channel_id")]
pub struct Article {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ArticleStatus,
    pub view_count: i64,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
}

impl Article {
    /// Drafts exist only for their author; published articles for anyone.
    pub fn visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.status == ArticleStatus::Published
            || viewer == Some(self.author_id)
    }
}

/// Author-editable article fields. `None` leaves a column untouched.
#[derive(AsChangeset, Debug, Default)]
#[table_name = "articles"]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<ArticleStatus>,
    pub view_count: Option<i64>,
    pub edited_at: Option<Timestamp>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.location_name.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.status.is_none()
            && self.view_count.is_none()
            && self.edited_at.is_none()
    }
}

#[derive(Debug, Default)]
pub struct ListFilter {
    pub channel: Option<Uuid>,
    pub category: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

pub fn list_published(
    filter: &ListFilter,
    connection: &PgConnection,
) -> QueryResult<Vec<Article>> {
    let mut query = articles::table
        .filter(articles::status.eq(ArticleStatus::Published))
        .into_boxed();
    if let Some(channel) = filter.channel {
        query = query.filter(articles::channel_id.eq(channel));
    }
    if let Some(category) = filter.category {
        query = query.filter(
            articles::id.eq_any(
                article_categories::table
                    .select(article_categories::article_id)
                    .filter(article_categories::category_id.eq(category)),
            ),
        );
    }
    query
        .order(articles::created_at.desc())
        .limit(filter.limit)
        .offset(filter.offset)
        .load::<Article>(connection)
}

pub fn get(id: Uuid, connection: &PgConnection) -> QueryResult<Article> {
    articles::table.find(id).get_result::<Article>(connection)
}

/// Resolves a path segment that may hold either an article id or its slug.
pub fn get_by_id_or_slug(
    raw: &str,
    connection: &PgConnection,
) -> QueryResult<Article> {
    match Uuid::parse_str(raw) {
        Ok(id) => get(id, connection),
        Err(_) => articles::table
            .filter(articles::slug.eq(raw))
            .get_result::<Article>(connection),
    }
}

pub fn exists(id: Uuid, connection: &PgConnection) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(articles::table.find(id)))
        .get_result(connection)
}

pub fn slug_taken(slug: &str, connection: &PgConnection) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        articles::table.filter(articles::slug.eq(slug)),
    ))
    .get_result(connection)
}

/// Most recent article in `channel` titled exactly `title` created after
/// `since`.
pub fn find_recent_with_title(
    channel: Uuid,
    title: &str,
    since: Timestamp,
    connection: &PgConnection,
) -> QueryResult<Option<Uuid>> {
    articles::table
        .select(articles::id)
        .filter(articles::channel_id.eq(channel))
        .filter(articles::title.eq(title))
        .filter(articles::created_at.gt(since))
        .order(articles::created_at.desc())
        .first::<Uuid>(connection)
        .optional()
}

pub fn count_created_since(
    channel: Uuid,
    since: Timestamp,
    connection: &PgConnection,
) -> QueryResult<i64> {
    articles::table
        .filter(articles::channel_id.eq(channel))
        .filter(articles::created_at.gt(since))
        .count()
        .get_result(connection)
}

/// Inserts `article` unless its slug is already in use, in which case
/// `None` comes back and nothing is written.
pub fn insert_if_slug_free(
    article: &Article,
    connection: &PgConnection,
) -> QueryResult<Option<Article>> {
    diesel::insert_into(articles::table)
        .values(article)
        .on_conflict(articles::slug)
        .do_nothing()
        .get_result::<Article>(connection)
        .optional()
}

pub fn update(
    id: Uuid,
    changes: &ArticleChanges,
    connection: &PgConnection,
) -> QueryResult<Article> {
    if changes.is_empty() {
        return get(id, connection);
    }
    diesel::update(articles::table.find(id))
        .set(changes)
        .get_result(connection)
}

pub fn view_count(
    id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Option<i64>> {
    articles::table
        .find(id)
        .select(articles::view_count)
        .get_result::<i64>(connection)
        .optional()
}

pub fn increment_view_count(
    id: Uuid,
    connection: &PgConnection,
) -> QueryResult<i64> {
    diesel::update(articles::table.find(id))
        .set(articles::view_count.eq(articles::view_count + 1))
        .returning(articles::view_count)
        .get_result(connection)
}

pub fn delete(id: Uuid, connection: &PgConnection) -> QueryResult<usize> {
    diesel::delete(articles::table.find(id)).execute(connection)
}
