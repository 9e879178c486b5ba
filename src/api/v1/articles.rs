use crate::{
    api::v1::{
        check, ok_resp, parse_id, user_err_resp, ClientAddr, JSONResp,
        ValidToken,
    },
    config::Config,
    db::{
        articles::{self, Article, ArticleChanges, ArticleStatus, ListFilter},
        categories::{self, Category},
        channels, DbConn,
    },
    engagement::{
        publishing::{self, ArticleDraft, Location, PublishLimits},
        reactions::{self, ReactionSummary},
        views::{self, ClientIdentity, ViewOutcome},
    },
    error::Error,
    timestamp::Timestamp,
};
use diesel::{pg::PgConnection, Connection, QueryResult};
use rocket::State;
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const PAGE_SIZE: i64 = 20;

#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub location: Option<Location>,
    pub status: ArticleStatus,
    pub view_count: i64,
    pub categories: Vec<Category>,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
}

impl ArticleDetail {
    pub fn load(
        article: Article,
        connection: &PgConnection,
    ) -> QueryResult<ArticleDetail> {
        let categories = categories::for_article(article.id, connection)?;
        Ok(ArticleDetail {
            location: Location::of(&article),
            id: article.id,
            slug: article.slug,
            title: article.title,
            content: article.content,
            channel_id: article.channel_id,
            author_id: article.author_id,
            status: article.status,
            view_count: article.view_count,
            categories,
            created_at: article.created_at,
            edited_at: article.edited_at,
        })
    }

    pub fn load_all(
        found: Vec<Article>,
        connection: &PgConnection,
    ) -> QueryResult<Vec<ArticleDetail>> {
        found
            .into_iter()
            .map(|article| ArticleDetail::load(article, connection))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ArticleForm {
    pub channel_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    #[validate(nested)]
    pub location: Option<Location>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
}

impl ArticleForm {
    pub fn into_draft(self) -> ArticleDraft {
        ArticleDraft {
            channel_id: self.channel_id,
            title: self.title,
            content: self.content,
            category_ids: self.category_ids,
            location: self.location,
            status: self.status.unwrap_or(ArticleStatus::Published),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ArticleUpdate {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    #[validate(length(min = 1))]
    content: Option<String>,
    #[validate(nested)]
    location: Option<Location>,
    category_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionForm {
    #[serde(rename = "isLike")]
    is_like: bool,
}

#[derive(Debug, Serialize)]
pub struct ReactionResp {
    #[serde(flatten)]
    summary: ReactionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed: Option<bool>,
    #[serde(rename = "isLike", skip_serializing_if = "Option::is_none")]
    is_like: Option<bool>,
}

pub fn publish_limits(config: &Config) -> PublishLimits {
    PublishLimits {
        daily_articles_per_channel: config.daily_article_limit,
    }
}

/// Loads an article by id as `viewer` may see it. Someone else's draft is
/// reported as missing.
pub fn visible(
    raw: &str,
    viewer: Option<Uuid>,
    connection: &PgConnection,
) -> Result<Article, Error> {
    let article = articles::get(parse_id(raw, "article")?, connection)?;
    hide_drafts(article, viewer)
}

fn hide_drafts(
    article: Article,
    viewer: Option<Uuid>,
) -> Result<Article, Error> {
    if article.visible_to(viewer) {
        Ok(article)
    } else {
        Err(Error::NotFound("article"))
    }
}

/// Loads an article the caller wrote, for author-only operations.
fn authored(
    raw: &str,
    user: Uuid,
    connection: &PgConnection,
) -> Result<Article, Error> {
    let article = articles::get(parse_id(raw, "article")?, connection)?;
    if article.author_id != user {
        return Err(Error::forbidden("only the author can change this article"));
    }
    Ok(article)
}

#[get("/articles?<channel>&<category>&<page>")]
pub fn article_list(
    conn: DbConn,
    channel: Option<String>,
    category: Option<String>,
    page: Option<i64>,
) -> JSONResp<Vec<ArticleDetail>> {
    let page = page.unwrap_or(1);
    if page < 1 {
        return user_err_resp("page must be 1 or greater");
    }
    let channel = match channel {
        Some(raw) => Some(channels::get_by_id_or_slug(&raw, &conn)?.id),
        None => None,
    };
    let category = match category {
        Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| {
            Error::invalid("category", "must be a category id")
        })?),
        None => None,
    };

    let filter = ListFilter {
        channel,
        category,
        limit: PAGE_SIZE,
        offset: (page - 1) * PAGE_SIZE,
    };
    let found = articles::list_published(&filter, &conn)?;
    ok_resp(ArticleDetail::load_all(found, &conn)?)
}

#[post("/articles", data = "<form>")]
pub fn article_create(
    token: ValidToken,
    conn: DbConn,
    config: State<Config>,
    form: Json<ArticleForm>,
) -> JSONResp<ArticleDetail> {
    check(&*form)?;
    let article = publishing::create_article(
        &*conn,
        token.user_id,
        form.into_inner().into_draft(),
        Timestamp::now(),
        &publish_limits(&config),
    )?;
    ok_resp(ArticleDetail::load(article, &conn)?)
}

#[get("/articles/<id_or_slug>")]
pub fn article_get(
    token: Option<ValidToken>,
    conn: DbConn,
    id_or_slug: String,
) -> JSONResp<ArticleDetail> {
    let article = articles::get_by_id_or_slug(&id_or_slug, &conn)?;
    let article = hide_drafts(article, token.map(|t| t.user_id))?;
    ok_resp(ArticleDetail::load(article, &conn)?)
}

#[patch("/articles/<id>", data = "<update>")]
pub fn article_update(
    token: ValidToken,
    conn: DbConn,
    id: String,
    update: Json<ArticleUpdate>,
) -> JSONResp<ArticleDetail> {
    check(&*update)?;
    let update = update.into_inner();
    let article = conn.transaction::<_, Error, _>(|| {
        let article = authored(&id, token.user_id, &conn)?;
        if let Some(ids) = &update.category_ids {
            publishing::ensure_known_categories(&*conn, ids)?;
            categories::replace(article.id, ids, &conn)?;
        }
        let (location_name, latitude, longitude) = match update.location {
            Some(l) => (Some(l.name), Some(l.lat), Some(l.lng)),
            None => (None, None, None),
        };
        let changes = ArticleChanges {
            title: update.title,
            content: update.content,
            location_name,
            latitude,
            longitude,
            edited_at: Some(Timestamp::now()),
            ..Default::default()
        };
        Ok(articles::update(article.id, &changes, &conn)?)
    })?;
    ok_resp(ArticleDetail::load(article, &conn)?)
}

#[delete("/articles/<id>")]
pub fn article_delete(
    token: ValidToken,
    conn: DbConn,
    id: String,
) -> JSONResp<String> {
    let article = authored(&id, token.user_id, &conn)?;
    articles::delete(article.id, &conn)?;
    log::info!("User {} deleted article {}", token.username, article.slug);
    ok_resp(format!("Deleted article {}", article.slug))
}

#[post("/articles/<id>/toggle-status")]
pub fn article_toggle_status(
    token: ValidToken,
    conn: DbConn,
    id: String,
) -> JSONResp<ArticleDetail> {
    let article = authored(&id, token.user_id, &conn)?;
    let changes = ArticleChanges {
        status: Some(article.status.toggled()),
        ..Default::default()
    };
    let article = articles::update(article.id, &changes, &conn)?;
    log::info!("Article {} is now {}", article.slug, article.status);
    ok_resp(ArticleDetail::load(article, &conn)?)
}

#[post("/articles/<id>/view")]
pub fn article_view(
    token: Option<ValidToken>,
    addr: ClientAddr,
    config: State<Config>,
    conn: DbConn,
    id: String,
) -> JSONResp<ViewOutcome> {
    let viewer = token.map(|t| t.user_id);
    let article = visible(&id, viewer, &conn)?.id;
    let client = match ClientIdentity::resolve(
        viewer,
        addr.0,
        &config.anonymous_id_salt,
    ) {
        Some(client) => client,
        None => return user_err_resp("Could not identify the client"),
    };
    ok_resp(views::record_view(&*conn, article, &client)?)
}

#[post("/articles/<id>/reactions", data = "<form>")]
pub fn reaction_set(
    token: ValidToken,
    conn: DbConn,
    id: String,
    form: Json<ReactionForm>,
) -> JSONResp<ReactionResp> {
    let article = visible(&id, Some(token.user_id), &conn)?.id;
    let summary = reactions::set_reaction(
        &*conn,
        article,
        Some(token.user_id),
        form.is_like,
    )?;
    let removed = summary.user_reaction.is_none();
    ok_resp(ReactionResp {
        summary,
        removed: if removed { Some(true) } else { None },
        is_like: if removed { Some(form.is_like) } else { None },
    })
}

#[get("/articles/<id>/reactions")]
pub fn reaction_get(
    token: Option<ValidToken>,
    conn: DbConn,
    id: String,
) -> JSONResp<ReactionSummary> {
    let viewer = token.map(|t| t.user_id);
    let article = visible(&id, viewer, &conn)?.id;
    ok_resp(reactions::reaction_summary(&*conn, article, viewer)?)
}
