use crate::{
    api::v1::{check, ok_resp, ApiError, JSONResp, ValidToken},
    db::{
        channels::Channel, subscriptions, tokens, tokens::Token, users,
        users::User, DbConn,
    },
    error::Error,
    state::Environment,
    timestamp::Timestamp,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use rocket::{
    http::{Cookie, Cookies, Status},
    State,
};
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiTokenResp {
    api_token: tokens::TokenId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLogin {
    username: String,
    password: String,
    #[serde(default)]
    persistent: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3, max = 32))]
    username: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPassword {
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribedChannel {
    #[serde(flatten)]
    channel: Channel,
    subscribed_at: Timestamp,
}

#[post("/user/login", data = "<login>")]
pub fn user_login(
    mut cookies: Cookies<'_>,
    conn: DbConn,
    rocket_env: State<Environment>,
    login: Json<UserLogin>,
) -> JSONResp<ApiTokenResp> {
    let invalid =
        || ApiError::new(Status::Unauthorized, "Invalid username/password.");
    let user = users::find_by_username(&login.username, &conn)?
        .ok_or_else(invalid)?;
    if !verify(login.password.clone(), &user.password)? {
        return Err(invalid());
    }

    let api_token = Uuid::new_v4();

    let expiration = time::now()
        + if login.persistent {
            time::Duration::days(365 * 20)
        } else {
            time::Duration::days(1)
        };
    let token = Token {
        id: api_token,
        user_id: user.id,
        expires: Timestamp(expiration.to_timespec()),
    };
    let mut cookie = Cookie::new("api_token", api_token.to_string());
    cookie.set_secure(rocket_env.inner().0.is_prod());
    cookie.set_expires(expiration);
    cookies.add_private(cookie);

    let purged = tokens::delete_expired(user.id, Timestamp::now(), &conn)?;
    if purged > 0 {
        log::debug!("Purged {} expired tokens of {}", purged, user.username);
    }
    tokens::insert(token, &conn)?;
    log::info!("User {} logged in", user.username);
    ok_resp(ApiTokenResp { api_token })
}

#[post("/user", data = "<user>")]
pub fn user_create(
    conn: DbConn,
    user: Json<NewUser>,
    rocket_env: State<Environment>,
) -> JSONResp<User> {
    check(&*user)?;
    if users::find_by_username(&user.username, &conn)?.is_some() {
        return Err(Error::Conflict {
            message: format!("User {} already exists", user.username),
            existing: None,
        }
        .into());
    }

    let hashed_pass = hash(user.password.clone(), DEFAULT_COST)?;
    if !rocket_env.inner().0.is_prod() {
        log::debug!("Hashed password for new user {}", user.username);
    }

    let created = users::insert(
        User {
            id: Uuid::new_v4(),
            username: user.username.clone(),
            password: hashed_pass,
            created_at: Timestamp::now(),
        },
        &conn,
    )?;
    log::info!("Created user {}", created.username);
    ok_resp(created)
}

#[put("/user", data = "<user>")]
pub fn user_change_pass(
    token: ValidToken,
    conn: DbConn,
    user: Json<NewPassword>,
) -> JSONResp<String> {
    check(&*user)?;
    let hashed_pass = hash(user.password.clone(), DEFAULT_COST)?;
    users::update_password(token.user_id, hashed_pass, &conn)?;

    ok_resp(format!("Changed password for user {}", token.username))
}

#[post("/user/logout")]
pub fn user_logout(
    token: ValidToken,
    conn: DbConn,
    mut cookies: Cookies<'_>,
) -> JSONResp<&'static str> {
    cookies.remove_private(Cookie::named("api_token"));
    tokens::delete(token.id, &conn)?;
    ok_resp("Successfully logged out")
}

#[delete("/user")]
pub fn user_delete(
    token: ValidToken,
    conn: DbConn,
    mut cookies: Cookies<'_>,
) -> JSONResp<String> {
    cookies.remove_private(Cookie::named("api_token"));
    users::delete(token.user_id, &conn)?;
    log::info!("Deleted user {}", token.username);
    ok_resp(format!("Deleted user {}", token.username))
}

#[get("/index")]
pub fn user_index(token: ValidToken, conn: DbConn) -> JSONResp<User> {
    ok_resp(users::get(token.user_id, &conn)?)
}

#[get("/user/subscriptions")]
pub fn user_subscriptions(
    token: ValidToken,
    conn: DbConn,
) -> JSONResp<Vec<SubscribedChannel>> {
    let subscribed = subscriptions::channels_for_user(token.user_id, &conn)?
        .into_iter()
        .map(|(subscription, channel)| SubscribedChannel {
            channel,
            subscribed_at: subscription.created_at,
        })
        .collect();
    ok_resp(subscribed)
}
