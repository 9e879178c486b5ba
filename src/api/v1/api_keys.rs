use crate::{
    api::v1::{check, ok_resp, parse_id, JSONResp, ValidToken},
    db::{api_keys, api_keys::ApiKey, DbConn},
    error::Error,
    keys,
    timestamp::Timestamp,
};
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct NewKey {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(range(min = 1, max = 3650))]
    expires_in_days: Option<i64>,
}

/// The only response that ever carries the raw key.
#[derive(Debug, Serialize)]
pub struct CreatedKey {
    #[serde(flatten)]
    api_key: ApiKey,
    key: String,
}

#[get("/api-keys")]
pub fn key_list(token: ValidToken, conn: DbConn) -> JSONResp<Vec<ApiKey>> {
    ok_resp(api_keys::all_from_user(token.user_id, &conn)?)
}

#[post("/api-keys", data = "<form>")]
pub fn key_create(
    token: ValidToken,
    conn: DbConn,
    form: Json<NewKey>,
) -> JSONResp<CreatedKey> {
    check(&*form)?;
    let form = form.into_inner();
    let generated = keys::generate();
    let now = Timestamp::now();
    let api_key = api_keys::insert(
        ApiKey {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            name: form.name,
            prefix: generated.prefix,
            key_hash: keys::hash(&generated.secret, bcrypt::DEFAULT_COST)?,
            revoked: false,
            expires_at: form
                .expires_in_days
                .map(|days| now + time::Duration::days(days)),
            last_used_at: None,
            created_at: now,
        },
        &conn,
    )?;
    log::info!(
        "User {} created API key {} ({})",
        token.username,
        api_key.id,
        api_key.prefix
    );
    ok_resp(CreatedKey {
        api_key,
        key: generated.secret,
    })
}

#[delete("/api-keys/<id>")]
pub fn key_revoke(
    token: ValidToken,
    conn: DbConn,
    id: String,
) -> JSONResp<&'static str> {
    let id = parse_id(&id, "API key")?;
    if !api_keys::revoke(id, token.user_id, &conn)? {
        return Err(Error::NotFound("API key").into());
    }
    log::info!("User {} revoked API key {}", token.username, id);
    ok_resp("Revoked API key")
}
