pub mod api_keys;
pub mod articles;
pub mod categories;
pub mod channels;
pub mod comments;
pub mod ledger;
pub mod reactions;
pub mod subscriptions;
pub mod tokens;
pub mod users;
pub mod views;

use diesel::pg::PgConnection;
use r2d2_diesel::ConnectionManager;
use rocket::{
    http::Status,
    request::{self, FromRequest, Outcome, Request},
    State,
};
use std::ops::Deref;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Builds the connection pool, failing fast if the database is unreachable.
pub fn init_pool(database_url: &str, size: u32) -> Pool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder()
        .max_size(size)
        .build(manager)
        .expect("failed to initialize database pool")
}

/// Builds a pool that connects on first checkout instead of at startup.
pub fn lazy_pool(database_url: &str, size: u32) -> Pool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder()
        .max_size(size)
        .min_idle(Some(0))
        .build_unchecked(manager)
}

pub struct DbConn(
    pub r2d2::PooledConnection<ConnectionManager<PgConnection>>,
);

impl<'a, 'r> FromRequest<'a, 'r> for DbConn {
    type Error = ();

    fn from_request(request: &'a Request<'r>) -> request::Outcome<DbConn, ()> {
        let pool = request.guard::<State<Pool>>()?;
        match pool.get() {
            Ok(conn) => Outcome::Success(DbConn(conn)),
            Err(e) => {
                log::error!("Could not check out a database connection: {}", e);
                Outcome::Failure((Status::ServiceUnavailable, ()))
            }
        }
    }
}

impl Deref for DbConn {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
