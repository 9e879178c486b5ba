use crate::{
    engagement::Transactional,
    error::{Error, Result},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    NoReaction,
    Liked,
    Disliked,
}

/// What a transition does to the stored reaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Insert(bool),
    Update(bool),
    Delete,
}

impl ReactionState {
    pub fn from_stored(is_like: Option<bool>) -> ReactionState {
        match is_like {
            None => ReactionState::NoReaction,
            Some(true) => ReactionState::Liked,
            Some(false) => ReactionState::Disliked,
        }
    }

    pub fn user_reaction(self) -> Option<bool> {
        match self {
            ReactionState::NoReaction => None,
            ReactionState::Liked => Some(true),
            ReactionState::Disliked => Some(false),
        }
    }

    /// Casting the reaction already held clears it; anything else switches
    /// to the submitted one.
    pub fn submit(self, is_like: bool) -> (ReactionState, RowChange) {
        let target = ReactionState::from_stored(Some(is_like));
        match self {
            ReactionState::NoReaction => (target, RowChange::Insert(is_like)),
            current if current == target => {
                (ReactionState::NoReaction, RowChange::Delete)
            }
            _ => (target, RowChange::Update(is_like)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionSummary {
    pub likes: i64,
    pub dislikes: i64,
    #[serde(rename = "userReaction")]
    pub user_reaction: Option<bool>,
}

pub trait ReactionStore: Transactional {
    fn article_exists(&self, article: Uuid) -> Result<bool>;

    fn reaction(&self, article: Uuid, user: Uuid) -> Result<Option<bool>>;

    /// `false` means a reaction for the pair already exists.
    fn insert_reaction(
        &self,
        article: Uuid,
        user: Uuid,
        is_like: bool,
    ) -> Result<bool>;

    /// `false` means no row was left to update.
    fn update_reaction(
        &self,
        article: Uuid,
        user: Uuid,
        is_like: bool,
    ) -> Result<bool>;

    fn delete_reaction(&self, article: Uuid, user: Uuid) -> Result<()>;

    fn count_reactions(&self, article: Uuid, is_like: bool) -> Result<i64>;
}

/// Applies a like (`true`) or dislike (`false`) from `user` to `article`.
///
/// Counts in the result are recounted from stored rows after the change.
pub fn set_reaction<S: ReactionStore>(
    store: &S,
    article: Uuid,
    user: Option<Uuid>,
    is_like: bool,
) -> Result<ReactionSummary> {
    let user = user.ok_or(Error::Unauthorized)?;
    store.atomically(|| {
        if !store.article_exists(article)? {
            return Err(Error::NotFound("article"));
        }
        let state = ReactionState::from_stored(store.reaction(article, user)?);
        let (next, change) = state.submit(is_like);
        let settled = match change {
            RowChange::Insert(value) => {
                if store.insert_reaction(article, user, value)? {
                    next
                } else {
                    log::debug!(
                        "Reaction of {} on {} created concurrently",
                        user,
                        article
                    );
                    ReactionState::from_stored(store.reaction(article, user)?)
                }
            }
            RowChange::Update(value) => {
                if store.update_reaction(article, user, value)? {
                    next
                } else {
                    log::debug!(
                        "Reaction of {} on {} removed concurrently",
                        user,
                        article
                    );
                    ReactionState::from_stored(store.reaction(article, user)?)
                }
            }
            RowChange::Delete => {
                store.delete_reaction(article, user)?;
                next
            }
        };
        summarize(store, article, settled)
    })
}

/// Current counts for `article`, plus the caller's own reaction if known.
pub fn reaction_summary<S: ReactionStore>(
    store: &S,
    article: Uuid,
    user: Option<Uuid>,
) -> Result<ReactionSummary> {
    if !store.article_exists(article)? {
        return Err(Error::NotFound("article"));
    }
    let state = match user {
        Some(user) => ReactionState::from_stored(store.reaction(article, user)?),
        None => ReactionState::NoReaction,
    };
    summarize(store, article, state)
}

fn summarize<S: ReactionStore>(
    store: &S,
    article: Uuid,
    state: ReactionState,
) -> Result<ReactionSummary> {
    Ok(ReactionSummary {
        likes: store.count_reactions(article, true)?,
        dislikes: store.count_reactions(article, false)?,
        user_reaction: state.user_reaction(),
    })
}
