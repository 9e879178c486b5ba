//! Programmatic content API, authenticated with an `X-API-Key` header
//! instead of a session.

use crate::{
    api::v1::{
        articles::{publish_limits, visible, ArticleDetail, ArticleForm},
        channels::ChannelDetail,
        check, describe, ok_resp, ErrorBody, JSONResp,
    },
    config::Config,
    db::{
        api_keys,
        articles::Article,
        categories::{self, Category},
        channels, DbConn,
    },
    engagement::publishing::{self, PublishLimits},
    error::Error,
    keys,
    timestamp::Timestamp,
};
use diesel::pg::PgConnection;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
    State,
};
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_BATCH: usize = 10;

/// A verified, live API key.
pub struct ApiKeyAuth {
    pub key_id: Uuid,
    pub user_id: Uuid,
}

impl<'a, 'r> FromRequest<'a, 'r> for ApiKeyAuth {
    type Error = ();

    fn from_request(
        request: &'a Request<'r>,
    ) -> Outcome<ApiKeyAuth, Self::Error> {
        let raw = match request.headers().get_one("X-API-Key") {
            Some(raw) => raw.trim(),
            None => return Outcome::Failure((Status::Unauthorized, ())),
        };
        let prefix = match keys::display_prefix(raw) {
            Some(prefix) => prefix,
            None => {
                log::debug!("Malformed API key presented");
                return Outcome::Failure((Status::Unauthorized, ()));
            }
        };

        let conn = request.guard::<DbConn>()?;
        let candidates = match api_keys::candidates(&prefix, &conn) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::error!("Could not look up API key {}: {}", prefix, e);
                return Outcome::Failure((Status::InternalServerError, ()));
            }
        };
        let key = candidates.into_iter().find(|key| {
            keys::verify(raw, key).unwrap_or_else(|e| {
                log::error!("Could not verify API key {}: {}", key.id, e);
                false
            })
        });
        let key = match key {
            Some(key) => key,
            None => {
                log::warn!("Rejected API key with prefix {}", prefix);
                return Outcome::Failure((Status::Unauthorized, ()));
            }
        };

        let now = Timestamp::now();
        if !keys::is_usable(&key, now) {
            log::info!("API key {} has expired", key.id);
            return Outcome::Failure((Status::Unauthorized, ()));
        }
        if let Err(e) = api_keys::touch(key.id, now, &conn) {
            log::error!("Could not record use of API key {}: {}", key.id, e);
        }

        Outcome::Success(ApiKeyAuth {
            key_id: key.id,
            user_id: key.user_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Batch {
    articles: Vec<ArticleForm>,
}

/// Outcome of one entry of a batch, in submission order.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    index: usize,
    created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct BatchResult {
    created: usize,
    failed: usize,
    results: Vec<BatchItem>,
}

fn batch_item(index: usize, outcome: Result<Article, Error>) -> BatchItem {
    match outcome {
        Ok(article) => BatchItem {
            index,
            created: true,
            id: Some(article.id),
            slug: Some(article.slug),
            code: None,
            error: None,
        },
        Err(e) => {
            let (status, body) = describe(e);
            BatchItem {
                index,
                created: false,
                id: None,
                slug: None,
                code: Some(status.code),
                error: Some(body),
            }
        }
    }
}

fn summarize(results: Vec<BatchItem>) -> BatchResult {
    let created = results.iter().filter(|item| item.created).count();
    BatchResult {
        created,
        failed: results.len() - created,
        results,
    }
}

fn create_one(
    connection: &PgConnection,
    user: Uuid,
    form: ArticleForm,
    limits: &PublishLimits,
) -> Result<Article, Error> {
    check(&form)?;
    publishing::create_article(
        connection,
        user,
        form.into_draft(),
        Timestamp::now(),
        limits,
    )
}

#[post("/content/articles", data = "<form>")]
pub fn content_article_create(
    key: ApiKeyAuth,
    conn: DbConn,
    config: State<Config>,
    form: Json<ArticleForm>,
) -> JSONResp<ArticleDetail> {
    let article = create_one(
        &conn,
        key.user_id,
        form.into_inner(),
        &publish_limits(&config),
    )?;
    log::info!("API key {} created article {}", key.key_id, article.slug);
    ok_resp(ArticleDetail::load(article, &conn)?)
}

/// Creates each article independently; one failing entry does not undo
/// or stop the others.
#[post("/content/articles/batch", data = "<batch>")]
pub fn content_article_batch(
    key: ApiKeyAuth,
    conn: DbConn,
    config: State<Config>,
    batch: Json<Batch>,
) -> JSONResp<BatchResult> {
    let batch = batch.into_inner();
    if batch.articles.is_empty() {
        return Err(Error::invalid("articles", "must not be empty").into());
    }
    if batch.articles.len() > MAX_BATCH {
        return Err(Error::invalid(
            "articles",
            format!("at most {} articles per batch", MAX_BATCH),
        )
        .into());
    }

    let limits = publish_limits(&config);
    let results: Vec<BatchItem> = batch
        .articles
        .into_iter()
        .enumerate()
        .map(|(index, form)| {
            batch_item(index, create_one(&conn, key.user_id, form, &limits))
        })
        .collect();
    let result = summarize(results);
    log::info!(
        "API key {} batch: {} created, {} failed",
        key.key_id,
        result.created,
        result.failed
    );
    ok_resp(result)
}

#[get("/content/articles/<id>")]
pub fn content_article_get(
    key: ApiKeyAuth,
    conn: DbConn,
    id: String,
) -> JSONResp<ArticleDetail> {
    let article = visible(&id, Some(key.user_id), &conn)?;
    ok_resp(ArticleDetail::load(article, &conn)?)
}

/// Channels the key's owner can publish into.
#[get("/content/channels")]
pub fn content_channel_list(
    key: ApiKeyAuth,
    conn: DbConn,
) -> JSONResp<Vec<ChannelDetail>> {
    let owned = channels::all_from_owner(key.user_id, &conn)?;
    ok_resp(ChannelDetail::load_all(owned, &conn)?)
}

#[get("/content/categories")]
pub fn content_category_list(
    _key: ApiKeyAuth,
    conn: DbConn,
) -> JSONResp<Vec<Category>> {
    ok_resp(categories::all(&conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::articles::ArticleStatus;

    fn article(slug: &str) -> Article {
        Article {
            id: Uuid::new_v4(),
            slug: slug.into(),
            title: "Harbour reopens".into(),
            content: "Boats are back.".into(),
            channel_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            location_name: None,
            latitude: None,
            longitude: None,
            status: ArticleStatus::Published,
            view_count: 0,
            created_at: Timestamp::from_secs(0),
            edited_at: None,
        }
    }

    #[test]
    fn batch_reports_each_entry() {
        let created = article("harbour-reopens");
        let existing = Uuid::new_v4();
        let results = vec![
            batch_item(0, Ok(created.clone())),
            batch_item(
                1,
                Err(Error::Conflict {
                    message: "duplicate".into(),
                    existing: Some(existing),
                }),
            ),
            batch_item(2, Err(Error::LimitReached("quota".into()))),
        ];
        let result = summarize(results);
        assert_eq!(result.created, 1);
        assert_eq!(result.failed, 2);

        let json = serde_json::to_value(&result).unwrap();
        let items = json["results"].as_array().unwrap();
        assert_eq!(items[0]["id"], created.id.to_string());
        assert_eq!(items[0]["slug"], "harbour-reopens");
        assert!(items[0].get("error").is_none());
        assert_eq!(items[1]["code"], 409);
        assert_eq!(items[1]["error"]["existing_id"], existing.to_string());
        assert_eq!(items[2]["code"], 403);
        assert_eq!(items[2]["created"], false);
    }
}
