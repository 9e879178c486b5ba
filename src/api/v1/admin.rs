//! Operator routes, reachable only by usernames on the admin allow-list.

use crate::{
    api::v1::{
        articles::ArticleDetail, check, ok_resp, parse_id, AdminToken,
        JSONResp,
    },
    db::{
        articles::{self, ArticleChanges, ArticleStatus},
        channels::{self, Channel},
        DbConn,
    },
    engagement::subscribers::{self, SubscriberCount},
    error::Error,
};
use diesel::pg::PgConnection;
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A channel with its full subscriber breakdown.
#[derive(Debug, Serialize)]
pub struct AdminChannel {
    #[serde(flatten)]
    channel: Channel,
    #[serde(flatten)]
    counts: SubscriberCount,
}

impl AdminChannel {
    fn load(
        channel: Channel,
        connection: &PgConnection,
    ) -> Result<AdminChannel, Error> {
        let counts =
            subscribers::effective_subscriber_count(connection, channel.id)?;
        Ok(AdminChannel { channel, counts })
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscriberTarget {
    subscriber_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminArticleUpdate {
    #[validate(range(min = 0))]
    view_count: Option<i64>,
    status: Option<ArticleStatus>,
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
}

#[get("/admin-channels")]
pub fn admin_channel_list(
    _admin: AdminToken,
    conn: DbConn,
) -> JSONResp<Vec<AdminChannel>> {
    let listed = channels::all(&conn)?
        .into_iter()
        .map(|channel| AdminChannel::load(channel, &conn))
        .collect::<Result<Vec<_>, Error>>()?;
    ok_resp(listed)
}

#[patch("/admin-channels/<id>", data = "<target>")]
pub fn admin_channel_update(
    admin: AdminToken,
    conn: DbConn,
    id: String,
    target: Json<SubscriberTarget>,
) -> JSONResp<AdminChannel> {
    let channel = channels::get(parse_id(&id, "channel")?, &conn)?;
    log::info!(
        "Admin {} sets channel {} subscriber target to {}",
        admin.0.username,
        channel.slug,
        target.subscriber_count
    );
    let counts = subscribers::set_target_subscriber_count(
        &*conn,
        channel.id,
        target.subscriber_count,
    )?;
    let channel = channels::get(channel.id, &conn)?;
    ok_resp(AdminChannel { channel, counts })
}

#[get("/admin-articles/<id>")]
pub fn admin_article_get(
    _admin: AdminToken,
    conn: DbConn,
    id: String,
) -> JSONResp<ArticleDetail> {
    let article = articles::get(parse_id(&id, "article")?, &conn)?;
    ok_resp(ArticleDetail::load(article, &conn)?)
}

#[patch("/admin-articles/<id>", data = "<update>")]
pub fn admin_article_update(
    admin: AdminToken,
    conn: DbConn,
    id: String,
    update: Json<AdminArticleUpdate>,
) -> JSONResp<ArticleDetail> {
    check(&*update)?;
    let update = update.into_inner();
    let article = articles::get(parse_id(&id, "article")?, &conn)?;
    let changes = ArticleChanges {
        title: update.title,
        status: update.status,
        view_count: update.view_count,
        ..Default::default()
    };
    let article = articles::update(article.id, &changes, &conn)?;
    log::info!(
        "Admin {} updated article {} ({} views, {})",
        admin.0.username,
        article.slug,
        article.view_count,
        article.status
    );
    ok_resp(ArticleDetail::load(article, &conn)?)
}
