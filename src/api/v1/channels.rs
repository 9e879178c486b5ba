use crate::{
    api::v1::{check, ok_resp, JSONResp, ValidToken},
    db::{
        channels::{self, Channel, ChannelChanges},
        subscriptions, DbConn,
    },
    engagement::{
        publishing::{self, NewChannel},
        subscribers::{self, SubscriptionChange},
    },
    error::Error,
    timestamp::Timestamp,
};
use diesel::pg::PgConnection;
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A channel as shown to everyone: only the effective subscriber count is
/// exposed.
#[derive(Debug, Serialize)]
pub struct ChannelDetail {
    #[serde(flatten)]
    channel: Channel,
    subscriber_count: i64,
}

impl ChannelDetail {
    pub fn load(
        channel: Channel,
        connection: &PgConnection,
    ) -> Result<ChannelDetail, Error> {
        let counts =
            subscribers::effective_subscriber_count(connection, channel.id)?;
        Ok(ChannelDetail {
            channel,
            subscriber_count: counts.subscriber_count,
        })
    }

    pub fn load_all(
        found: Vec<Channel>,
        connection: &PgConnection,
    ) -> Result<Vec<ChannelDetail>, Error> {
        found
            .into_iter()
            .map(|channel| ChannelDetail::load(channel, connection))
            .collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChannelForm {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    description: String,
    #[validate(url)]
    profile_image_url: Option<String>,
    #[validate(url)]
    banner_image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChannelUpdate {
    #[validate(length(min = 1, max = 100))]
    name: Option<String>,
    #[validate(length(max = 2000))]
    description: Option<String>,
    #[validate(url)]
    profile_image_url: Option<String>,
    #[validate(url)]
    banner_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriberView {
    username: String,
    subscribed_at: Timestamp,
}

fn owned(
    raw: &str,
    user: Uuid,
    connection: &PgConnection,
) -> Result<Channel, Error> {
    let channel = channels::get_by_id_or_slug(raw, connection)?;
    if channel.owner_id != user {
        return Err(Error::forbidden("only the channel owner can do this"));
    }
    Ok(channel)
}

#[get("/channels")]
pub fn channel_list(conn: DbConn) -> JSONResp<Vec<ChannelDetail>> {
    let found = channels::all(&conn)?;
    ok_resp(ChannelDetail::load_all(found, &conn)?)
}

#[post("/channels", data = "<form>")]
pub fn channel_create(
    token: ValidToken,
    conn: DbConn,
    form: Json<ChannelForm>,
) -> JSONResp<ChannelDetail> {
    check(&*form)?;
    let form = form.into_inner();
    let channel = publishing::create_channel(
        &*conn,
        token.user_id,
        NewChannel {
            name: form.name,
            description: form.description,
            profile_image_url: form.profile_image_url,
            banner_image_url: form.banner_image_url,
        },
        Timestamp::now(),
    )?;
    log::info!("User {} created channel {}", token.username, channel.slug);
    ok_resp(ChannelDetail::load(channel, &conn)?)
}

#[get("/channels/<id_or_slug>")]
pub fn channel_get(
    conn: DbConn,
    id_or_slug: String,
) -> JSONResp<ChannelDetail> {
    let channel = channels::get_by_id_or_slug(&id_or_slug, &conn)?;
    ok_resp(ChannelDetail::load(channel, &conn)?)
}

#[patch("/channels/<id_or_slug>", data = "<update>")]
pub fn channel_update(
    token: ValidToken,
    conn: DbConn,
    id_or_slug: String,
    update: Json<ChannelUpdate>,
) -> JSONResp<ChannelDetail> {
    check(&*update)?;
    let update = update.into_inner();
    let channel = owned(&id_or_slug, token.user_id, &conn)?;
    let changes = ChannelChanges {
        name: update.name,
        description: update.description,
        profile_image_url: update.profile_image_url,
        banner_image_url: update.banner_image_url,
    };
    let channel = channels::update(channel.id, &changes, &conn)?;
    ok_resp(ChannelDetail::load(channel, &conn)?)
}

#[post("/channels/<id>/subscribe")]
pub fn channel_subscribe(
    token: ValidToken,
    conn: DbConn,
    id: String,
) -> JSONResp<SubscriptionChange> {
    let channel = channels::get_by_id_or_slug(&id, &conn)?;
    ok_resp(subscribers::subscribe(&*conn, token.user_id, channel.id)?)
}

#[delete("/channels/<id>/subscribe")]
pub fn channel_unsubscribe(
    token: ValidToken,
    conn: DbConn,
    id: String,
) -> JSONResp<SubscriptionChange> {
    let channel = channels::get_by_id_or_slug(&id, &conn)?;
    ok_resp(subscribers::unsubscribe(&*conn, token.user_id, channel.id)?)
}

#[get("/channels/<id>/subscribers")]
pub fn channel_subscribers(
    token: ValidToken,
    conn: DbConn,
    id: String,
) -> JSONResp<Vec<SubscriberView>> {
    let channel = owned(&id, token.user_id, &conn)?;
    let listed = subscriptions::subscribers_of(channel.id, &conn)?
        .into_iter()
        .map(|(username, subscribed_at)| SubscriberView {
            username,
            subscribed_at,
        })
        .collect();
    ok_resp(listed)
}
