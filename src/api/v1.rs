pub mod admin;
pub mod api_keys;
pub mod articles;
pub mod categories;
pub mod channels;
pub mod comments;
pub mod content;
pub mod users;

use crate::{
    config::Config,
    db::{tokens, DbConn},
    error::{Error, FieldError},
    timestamp::Timestamp,
};
use bcrypt::BcryptError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
    response::{status::Custom, Responder, Response},
    State,
};
use rocket_contrib::json::Json;
use serde::{Deserialize, Serialize};
use std::{net::IpAddr, result::Result};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct Resp<T> {
    status: String,
    contents: T,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ErrorBody {
    fn message<M: Into<String>>(message: M) -> ErrorBody {
        ErrorBody {
            message: message.into(),
            existing_id: None,
            fields: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError(Custom<Json<Resp<ErrorBody>>>);
impl ApiError {
    fn new<M: Into<String>>(status: Status, message: M) -> ApiError {
        ApiError::with_body(status, ErrorBody::message(message))
    }

    fn with_body(status: Status, body: ErrorBody) -> ApiError {
        ApiError(Custom(
            status,
            Json(Resp {
                status: "error".into(),
                contents: body,
            }),
        ))
    }

    fn internal(error: &dyn std::error::Error) -> ApiError {
        log::error!("{}", error);
        ApiError::new(
            Status::InternalServerError,
            String::from("Internal error"),
        )
    }
}

/// Maps a domain error onto its HTTP status and response body.
pub fn describe(error: Error) -> (Status, ErrorBody) {
    let message = error.to_string();
    match error {
        Error::Unauthorized => (Status::Unauthorized, ErrorBody::message(message)),
        Error::Forbidden(_) | Error::LimitReached(_) => {
            (Status::Forbidden, ErrorBody::message(message))
        }
        Error::NotFound(_) => (Status::NotFound, ErrorBody::message(message)),
        Error::Persistence(DieselError::NotFound) => {
            (Status::NotFound, ErrorBody::message("not found"))
        }
        Error::Conflict { existing, .. } => (
            Status::Conflict,
            ErrorBody {
                message,
                existing_id: existing,
                fields: Vec::new(),
            },
        ),
        Error::InvalidInput(fields) => (
            Status::BadRequest,
            ErrorBody {
                message,
                existing_id: None,
                fields,
            },
        ),
        Error::Persistence(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            info,
        )) => {
            log::warn!("Unique constraint rejected a write: {}", info.message());
            (Status::Conflict, ErrorBody::message("already exists"))
        }
        Error::Persistence(e) => {
            log::error!("Persistence error: {}", e);
            (
                Status::InternalServerError,
                ErrorBody::message("Internal error"),
            )
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let (status, body) = describe(error);
        ApiError::with_body(status, body)
    }
}

/// Allow error handling with `?` for store errors.
impl From<DieselError> for ApiError {
    fn from(error: DieselError) -> Self {
        ApiError::from(Error::from(error))
    }
}

impl From<BcryptError> for ApiError {
    fn from(error: BcryptError) -> Self {
        ApiError::internal(&error)
    }
}

impl<'r> Responder<'r> for ApiError {
    fn respond_to(self, req: &Request) -> Result<Response<'r>, Status> {
        self.0.respond_to(req)
    }
}

pub type JSONResp<T> = Result<Json<Resp<T>>, ApiError>;

pub fn ok_resp<T: Serialize>(x: T) -> JSONResp<T> {
    Ok(Json(Resp {
        status: "ok".into(),
        contents: x,
    }))
}

pub fn user_err_resp<U: Into<String>, T>(x: U) -> JSONResp<T> {
    Err(ApiError::new(Status::BadRequest, x.into()))
}

/// Path ids that are not UUIDs cannot name anything.
pub fn parse_id(raw: &str, what: &'static str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound(what))
}

pub fn check<T: Validate>(value: &T) -> Result<(), Error> {
    value.validate().map_err(Error::from)
}

pub struct ValidToken {
    pub id: tokens::TokenId,
    pub user_id: Uuid,
    pub username: String,
}

fn presented_token(request: &Request) -> Option<tokens::TokenId> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|bearer| {
            let split_bearer: Vec<&str> =
                bearer.split_ascii_whitespace().collect();
            match split_bearer[..] {
                [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => {
                    Uuid::parse_str(token).ok().map(|token| {
                        log::debug!("Found header token {}", token);
                        token
                    })
                }
                _ => None,
            }
        })
        .or_else(|| {
            request
                .cookies()
                .get_private("api_token")
                .and_then(|cookie| cookie.value().parse().ok())
                .map(|token| {
                    log::debug!("Found cookie token {}", token);
                    token
                })
        })
}

impl<'a, 'r> FromRequest<'a, 'r> for ValidToken {
    type Error = ();

    fn from_request(
        request: &'a Request<'r>,
    ) -> Outcome<ValidToken, Self::Error> {
        let token_id = match presented_token(request) {
            Some(token) => token,
            None => return Outcome::Failure((Status::Unauthorized, ())),
        };

        let conn = request.guard::<DbConn>()?;
        let (token, user) = match tokens::get_with_user(token_id, &conn) {
            Ok(found) => found,
            Err(DieselError::NotFound) => {
                return Outcome::Failure((Status::Unauthorized, ()))
            }
            Err(e) => {
                log::error!("Could not look up token {}: {}", token_id, e);
                return Outcome::Failure((Status::InternalServerError, ()));
            }
        };
        if token.expires < Timestamp::now() {
            return Outcome::Failure((Status::Unauthorized, ()));
        }

        Outcome::Success(ValidToken {
            id: token.id,
            user_id: user.id,
            username: user.username,
        })
    }
}

/// A session belonging to one of the configured administrators.
pub struct AdminToken(pub ValidToken);

impl<'a, 'r> FromRequest<'a, 'r> for AdminToken {
    type Error = ();

    fn from_request(
        request: &'a Request<'r>,
    ) -> Outcome<AdminToken, Self::Error> {
        let token = request.guard::<ValidToken>()?;
        let config = request.guard::<State<Config>>()?;
        if !config.is_admin(&token.username) {
            log::warn!("User {} tried to use an admin route", token.username);
            return Outcome::Failure((Status::Forbidden, ()));
        }
        Outcome::Success(AdminToken(token))
    }
}

/// The caller's address, as Rocket resolves it (honouring `X-Real-IP`).
pub struct ClientAddr(pub Option<IpAddr>);

impl<'a, 'r> FromRequest<'a, 'r> for ClientAddr {
    type Error = ();

    fn from_request(
        request: &'a Request<'r>,
    ) -> Outcome<ClientAddr, Self::Error> {
        Outcome::Success(ClientAddr(request.client_ip()))
    }
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> ApiError {
    ApiError::new(Status::BadRequest, "Bad request")
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> ApiError {
    ApiError::new(Status::Unauthorized, "Authentication required")
}

#[catch(403)]
pub fn forbidden(_req: &Request) -> ApiError {
    ApiError::new(Status::Forbidden, "Forbidden")
}

#[catch(404)]
pub fn not_found(req: &Request) -> ApiError {
    ApiError::new(Status::NotFound, format!("Nothing at {}", req.uri()))
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> ApiError {
    ApiError::new(Status::UnprocessableEntity, "Malformed request body")
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> ApiError {
    ApiError::new(Status::InternalServerError, "Internal error")
}

#[catch(503)]
pub fn unavailable(_req: &Request) -> ApiError {
    ApiError::new(Status::ServiceUnavailable, "Service unavailable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = vec![
            (Error::Unauthorized, Status::Unauthorized),
            (Error::Forbidden(Cow::Borrowed("no")), Status::Forbidden),
            (Error::LimitReached("quota".into()), Status::Forbidden),
            (Error::NotFound("article"), Status::NotFound),
            (Error::Persistence(DieselError::NotFound), Status::NotFound),
            (Error::invalid("title", "empty"), Status::BadRequest),
            (
                Error::Persistence(DieselError::RollbackTransaction),
                Status::InternalServerError,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(describe(error).0, expected);
        }
    }

    #[test]
    fn conflict_carries_existing_id() {
        let existing = Uuid::new_v4();
        let (status, body) = describe(Error::Conflict {
            message: "duplicate".into(),
            existing: Some(existing),
        });
        assert_eq!(status, Status::Conflict);
        assert_eq!(body.existing_id, Some(existing));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["existing_id"], existing.to_string());
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn internal_errors_stay_opaque() {
        let (_, body) =
            describe(Error::Persistence(DieselError::RollbackTransaction));
        assert_eq!(body.message, "Internal error");
    }

    #[test]
    fn malformed_ids_are_not_found() {
        assert!(matches!(
            parse_id("not-a-uuid", "channel"),
            Err(Error::NotFound("channel"))
        ));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "channel").unwrap(), id);
    }
}
