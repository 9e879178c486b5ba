use crate::schema::{article_categories, categories};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Queryable, Serialize, Debug, Clone, PartialEq, Identifiable)]
#[table_name = "categories"]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Insertable, Debug)]
#[table_name = "article_categories"]
pub struct ArticleCategory {
    pub article_id: Uuid,
    pub category_id: Uuid,
}

pub fn all(connection: &PgConnection) -> QueryResult<Vec<Category>> {
    categories::table
        .order(categories::name.asc())
        .load::<Category>(connection)
}

/// Returns the ids from `ids` that name no category.
pub fn unknown(
    ids: &[Uuid],
    connection: &PgConnection,
) -> QueryResult<Vec<Uuid>> {
    let known = categories::table
        .select(categories::id)
        .filter(categories::id.eq_any(ids))
        .load::<Uuid>(connection)?;
    Ok(ids.iter().filter(|id| !known.contains(id)).cloned().collect())
}

pub fn for_article(
    article_id: Uuid,
    connection: &PgConnection,
) -> QueryResult<Vec<Category>> {
    article_categories::table
        .filter(article_categories::article_id.eq(article_id))
        .inner_join(categories::table)
        .select((categories::id, categories::name, categories::slug))
        .order(categories::name.asc())
        .load::<Category>(connection)
}

pub fn attach(
    article_id: Uuid,
    category_ids: &[Uuid],
    connection: &PgConnection,
) -> QueryResult<usize> {
    if category_ids.is_empty() {
        return Ok(0);
    }
    let rows: Vec<ArticleCategory> = category_ids
        .iter()
        .map(|&category_id| ArticleCategory {
            article_id,
            category_id,
        })
        .collect();
    diesel::insert_into(article_categories::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(connection)
}

/// Replaces the category set of an article.
pub fn replace(
    article_id: Uuid,
    category_ids: &[Uuid],
    connection: &PgConnection,
) -> QueryResult<usize> {
    diesel::delete(
        article_categories::table
            .filter(article_categories::article_id.eq(article_id)),
    )
    .execute(connection)?;
    attach(article_id, category_ids, connection)
}
