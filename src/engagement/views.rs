use crate::{
    engagement::Transactional,
    error::{Error, Result},
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use uuid::Uuid;

/// Who a view is attributed to. Signed-in users are always identified by
/// their account, even when an address is also known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentity {
    User(Uuid),
    Anonymous(String),
}

impl ClientIdentity {
    pub fn resolve(
        user: Option<Uuid>,
        ip: Option<IpAddr>,
        salt: &str,
    ) -> Option<ClientIdentity> {
        match (user, ip) {
            (Some(id), _) => Some(ClientIdentity::User(id)),
            (None, Some(ip)) => {
                Some(ClientIdentity::Anonymous(anonymous_digest(ip, salt)))
            }
            (None, None) => None,
        }
    }

    /// The value stored in `article_views.client_identifier`.
    pub fn key(&self) -> String {
        match self {
            ClientIdentity::User(id) => format!("user:{}", id),
            ClientIdentity::Anonymous(digest) => format!("anon:{}", digest),
        }
    }
}

fn anonymous_digest(ip: IpAddr, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"|");
    hasher.update(ip.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewOutcome {
    pub counted: bool,
    pub view_count: i64,
}

pub trait ViewStore: Transactional {
    /// Stored view count, or `None` if the article does not exist.
    fn view_count(&self, article: Uuid) -> Result<Option<i64>>;

    fn has_viewed(&self, article: Uuid, client: &str) -> Result<bool>;

    /// Records a view. `false` means the pair was already recorded.
    fn insert_view(&self, article: Uuid, client: &str) -> Result<bool>;

    /// Adds one to the stored count and returns the new value.
    fn increment_view_count(&self, article: Uuid) -> Result<i64>;
}

/// Counts a view of `article` at most once per client.
///
/// The increment applies to whatever count is stored, including values
/// set by an operator, and is never recomputed from recorded views.
pub fn record_view<S: ViewStore>(
    store: &S,
    article: Uuid,
    client: &ClientIdentity,
) -> Result<ViewOutcome> {
    let key = client.key();
    store.atomically(|| {
        let current = store
            .view_count(article)?
            .ok_or(Error::NotFound("article"))?;

        if store.has_viewed(article, &key)? {
            return Ok(ViewOutcome {
                counted: false,
                view_count: current,
            });
        }

        if !store.insert_view(article, &key)? {
            // Lost the race against a concurrent first view.
            log::debug!("View of {} by {} already recorded", article, key);
            let settled = store.view_count(article)?.unwrap_or(current);
            return Ok(ViewOutcome {
                counted: false,
                view_count: settled,
            });
        }

        let view_count = store.increment_view_count(article)?;
        Ok(ViewOutcome {
            counted: true,
            view_count,
        })
    })
}
