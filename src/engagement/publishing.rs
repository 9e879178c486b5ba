use crate::{
    db::{
        articles::{Article, ArticleStatus},
        channels::Channel,
    },
    engagement::Transactional,
    error::{Error, Result},
    timestamp::Timestamp,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const DUPLICATE_WINDOW_HOURS: i64 = 24;
pub const MAX_SLUG_ATTEMPTS: u32 = 10;
pub const MAX_CHANNELS_PER_ACCOUNT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl Location {
    pub fn of(article: &Article) -> Option<Location> {
        match (&article.location_name, article.latitude, article.longitude) {
            (Some(name), Some(lat), Some(lng)) => Some(Location {
                name: name.clone(),
                lat,
                lng,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub channel_id: Uuid,
    pub title: String,
    pub content: String,
    pub category_ids: Vec<Uuid>,
    pub location: Option<Location>,
    pub status: ArticleStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct PublishLimits {
    pub daily_articles_per_channel: i64,
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub description: String,
    pub profile_image_url: Option<String>,
    pub banner_image_url: Option<String>,
}

pub trait ChannelStore: Transactional {
    /// Holds the owner's row lock until the transaction ends, serializing
    /// channel creation per account.
    fn lock_owner(&self, owner: Uuid) -> Result<()>;

    fn count_owned_channels(&self, owner: Uuid) -> Result<i64>;

    fn channel_slug_taken(&self, slug: &str) -> Result<bool>;

    fn insert_channel(&self, channel: Channel) -> Result<Channel>;
}

pub trait ArticleStore: Transactional {
    /// Loads the channel and holds its row lock until the transaction
    /// ends, serializing article creation per channel.
    fn lock_channel(&self, id: Uuid) -> Result<Option<Channel>>;

    /// The ids from `ids` that name no category.
    fn unknown_categories(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// An article in `channel` titled exactly `title` created after `since`.
    fn recent_article_with_title(
        &self,
        channel: Uuid,
        title: &str,
        since: Timestamp,
    ) -> Result<Option<Uuid>>;

    fn count_articles_since(&self, channel: Uuid, since: Timestamp)
        -> Result<i64>;

    fn slug_taken(&self, slug: &str) -> Result<bool>;

    /// Inserts the article and its categories. `None` means the slug was
    /// claimed in the meantime and nothing was written.
    fn insert_article(
        &self,
        article: &Article,
        categories: &[Uuid],
    ) -> Result<Option<Article>>;
}

pub fn slug_base(text: &str) -> String {
    let base = slug::slugify(text);
    if base.is_empty() {
        String::from("untitled")
    } else {
        base
    }
}

fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt + 1)
    }
}

/// Offers `base`, `base-2`, `base-3`, ... to `claim` until it takes one.
pub fn claim_slug<T, F>(base: &str, mut claim: F) -> Result<T>
where
    F: FnMut(String) -> Result<Option<T>>,
{
    for attempt in 0..MAX_SLUG_ATTEMPTS {
        if let Some(claimed) = claim(slug_candidate(base, attempt))? {
            return Ok(claimed);
        }
    }
    Err(slug_exhausted(base))
}

/// Finds the first free slug among `base`, `base-2`, `base-3`, ...
pub fn free_slug<F>(base: &str, mut taken: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    claim_slug(base, |candidate| {
        Ok(if taken(&candidate)? {
            None
        } else {
            Some(candidate)
        })
    })
}

fn slug_exhausted(base: &str) -> Error {
    Error::Conflict {
        message: format!(
            "no free slug for {:?} after {} attempts",
            base, MAX_SLUG_ATTEMPTS
        ),
        existing: None,
    }
}

pub fn ensure_known_categories<S: ArticleStore>(
    store: &S,
    ids: &[Uuid],
) -> Result<()> {
    let unknown = store.unknown_categories(ids)?;
    if unknown.is_empty() {
        return Ok(());
    }
    let listed: Vec<String> = unknown.iter().map(Uuid::to_string).collect();
    Err(Error::invalid(
        "category_ids",
        format!("unknown categories: {}", listed.join(", ")),
    ))
}

pub fn check_channel_quota(owned: i64) -> Result<()> {
    if owned >= MAX_CHANNELS_PER_ACCOUNT {
        return Err(Error::LimitReached(format!(
            "an account may own at most {} channels",
            MAX_CHANNELS_PER_ACCOUNT
        )));
    }
    Ok(())
}

/// Creates a channel owned by `owner`, who may own at most
/// `MAX_CHANNELS_PER_ACCOUNT` channels.
pub fn create_channel<S: ChannelStore>(
    store: &S,
    owner: Uuid,
    new: NewChannel,
    now: Timestamp,
) -> Result<Channel> {
    store.atomically(|| {
        store.lock_owner(owner)?;
        check_channel_quota(store.count_owned_channels(owner)?)?;
        let slug = free_slug(&slug_base(&new.name), |candidate| {
            store.channel_slug_taken(candidate)
        })?;
        let channel = store.insert_channel(Channel {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: new.name,
            slug,
            description: new.description,
            profile_image_url: new.profile_image_url,
            banner_image_url: new.banner_image_url,
            admin_subscriber_count: 0,
            created_at: now,
        })?;
        log::info!("Created channel {} for {}", channel.slug, owner);
        Ok(channel)
    })
}

/// Creates an article on behalf of `author`, who must own the channel.
///
/// Rejected with `Conflict` when the channel already has an article with
/// the same title from the last 24 hours, and with `LimitReached` when the
/// channel has hit its rolling daily quota.
pub fn create_article<S: ArticleStore>(
    store: &S,
    author: Uuid,
    draft: ArticleDraft,
    now: Timestamp,
    limits: &PublishLimits,
) -> Result<Article> {
    store.atomically(|| {
        let channel = store
            .lock_channel(draft.channel_id)?
            .ok_or(Error::NotFound("channel"))?;
        if channel.owner_id != author {
            return Err(Error::forbidden(
                "only the channel owner can publish into it",
            ));
        }

        ensure_known_categories(store, &draft.category_ids)?;

        let window_start = now - time::Duration::hours(DUPLICATE_WINDOW_HOURS);
        if let Some(existing) =
            store.recent_article_with_title(channel.id, &draft.title, window_start)?
        {
            return Err(Error::Conflict {
                message: format!(
                    "an article titled {:?} was created in this channel within the last {} hours",
                    draft.title, DUPLICATE_WINDOW_HOURS
                ),
                existing: Some(existing),
            });
        }

        let recent = store.count_articles_since(channel.id, window_start)?;
        if recent >= limits.daily_articles_per_channel {
            return Err(Error::LimitReached(format!(
                "channel reached its limit of {} articles per {} hours",
                limits.daily_articles_per_channel, DUPLICATE_WINDOW_HOURS
            )));
        }

        let base = slug_base(&draft.title);
        let (location_name, latitude, longitude) = match &draft.location {
            Some(l) => (Some(l.name.clone()), Some(l.lat), Some(l.lng)),
            None => (None, None, None),
        };
        claim_slug(&base, |slug| {
            if store.slug_taken(&slug)? {
                return Ok(None);
            }
            let article = Article {
                id: Uuid::new_v4(),
                slug,
                title: draft.title.clone(),
                content: draft.content.clone(),
                channel_id: channel.id,
                author_id: author,
                location_name: location_name.clone(),
                latitude,
                longitude,
                status: draft.status,
                view_count: 0,
                created_at: now,
                edited_at: None,
            };
            let created = store.insert_article(&article, &draft.category_ids)?;
            if let Some(created) = &created {
                log::info!(
                    "Created article {} ({}) in channel {}",
                    created.id,
                    created.slug,
                    channel.id
                );
            }
            Ok(created)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::memory::MemoryLedger;

    const LIMITS: PublishLimits = PublishLimits {
        daily_articles_per_channel: 100,
    };

    fn draft(channel: Uuid, title: &str) -> ArticleDraft {
        ArticleDraft {
            channel_id: channel,
            title: title.to_string(),
            content: "Body".to_string(),
            category_ids: Vec::new(),
            location: None,
            status: ArticleStatus::Published,
        }
    }

    fn hours(h: i64) -> time::Duration {
        time::Duration::hours(h)
    }

    #[test]
    fn duplicate_title_within_window_conflicts_with_existing_id() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);
        let now = Timestamp::from_secs(1_000_000);

        let first =
            create_article(&ledger, owner, draft(channel, "Launch"), now, &LIMITS)
                .unwrap();
        let err = create_article(
            &ledger,
            owner,
            draft(channel, "Launch"),
            now + hours(23),
            &LIMITS,
        )
        .unwrap_err();
        match err {
            Error::Conflict { existing, .. } => {
                assert_eq!(existing, Some(first.id))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn duplicate_title_after_window_succeeds_with_new_slug() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);
        let now = Timestamp::from_secs(1_000_000);

        let first =
            create_article(&ledger, owner, draft(channel, "Launch"), now, &LIMITS)
                .unwrap();
        let second = create_article(
            &ledger,
            owner,
            draft(channel, "Launch"),
            now + hours(25),
            &LIMITS,
        )
        .unwrap();
        assert_eq!(first.slug, "launch");
        assert_eq!(second.slug, "launch-2");
    }

    #[test]
    fn same_title_in_another_channel_is_fine() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let a = ledger.add_channel(owner);
        let b = ledger.add_channel(owner);
        let now = Timestamp::from_secs(1_000_000);

        create_article(&ledger, owner, draft(a, "Launch"), now, &LIMITS).unwrap();
        let other =
            create_article(&ledger, owner, draft(b, "Launch"), now, &LIMITS)
                .unwrap();
        assert_eq!(other.slug, "launch-2");
    }

    #[test]
    fn slug_search_gives_up_after_bounded_attempts() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);
        ledger.reserve_slug("busy");
        for n in 2..=MAX_SLUG_ATTEMPTS {
            ledger.reserve_slug(&format!("busy-{}", n));
        }

        let err = create_article(
            &ledger,
            owner,
            draft(channel, "Busy"),
            Timestamp::from_secs(0),
            &LIMITS,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Conflict { existing: None, .. }));
    }

    #[test]
    fn only_owner_may_publish() {
        let ledger = MemoryLedger::default();
        let channel = ledger.add_channel(Uuid::new_v4());
        let err = create_article(
            &ledger,
            Uuid::new_v4(),
            draft(channel, "Intruder"),
            Timestamp::from_secs(0),
            &LIMITS,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn unknown_categories_are_invalid_input() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);
        let known = ledger.add_category();
        let mut d = draft(channel, "Tagged");
        d.category_ids = vec![known, Uuid::new_v4()];

        let err = create_article(&ledger, owner, d, Timestamp::from_secs(0), &LIMITS)
            .unwrap_err();
        match err {
            Error::InvalidInput(fields) => {
                assert_eq!(fields[0].field, "category_ids")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn categories_are_attached() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);
        let mut d = draft(channel, "Tagged");
        d.category_ids = vec![ledger.add_category(), ledger.add_category()];

        let article =
            create_article(&ledger, owner, d, Timestamp::from_secs(0), &LIMITS)
                .unwrap();
        assert_eq!(ledger.category_rows(article.id), 2);
    }

    #[test]
    fn daily_limit_applies_per_channel() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);
        let limits = PublishLimits {
            daily_articles_per_channel: 2,
        };
        let now = Timestamp::from_secs(1_000_000);

        create_article(&ledger, owner, draft(channel, "One"), now, &limits).unwrap();
        create_article(&ledger, owner, draft(channel, "Two"), now, &limits).unwrap();
        let err =
            create_article(&ledger, owner, draft(channel, "Three"), now, &limits)
                .unwrap_err();
        assert!(matches!(err, Error::LimitReached(_)));

        create_article(
            &ledger,
            owner,
            draft(channel, "Three"),
            now + hours(25),
            &limits,
        )
        .unwrap();
    }

    #[test]
    fn location_is_stored_with_article() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);
        let mut d = draft(channel, "Somewhere");
        d.location = Some(Location {
            name: "Lisbon".into(),
            lat: 38.72,
            lng: -9.14,
        });

        let article =
            create_article(&ledger, owner, d.clone(), Timestamp::from_secs(0), &LIMITS)
                .unwrap();
        assert_eq!(Location::of(&article), d.location);
    }

    fn new_channel(name: &str) -> NewChannel {
        NewChannel {
            name: name.to_string(),
            description: String::new(),
            profile_image_url: None,
            banner_image_url: None,
        }
    }

    #[test]
    fn article_creation_locks_the_channel_before_checking_it() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        let channel = ledger.add_channel(owner);

        create_article(
            &ledger,
            owner,
            draft(channel, "Locked"),
            Timestamp::from_secs(0),
            &LIMITS,
        )
        .unwrap();
        let journal = ledger.journal();
        assert_eq!(journal[0], format!("lock channel {}", channel));
        assert!(journal.contains(&format!("count articles {}", channel)));
    }

    #[test]
    fn eleventh_channel_is_refused() {
        let ledger = MemoryLedger::default();
        let owner = Uuid::new_v4();
        for n in 0..MAX_CHANNELS_PER_ACCOUNT {
            create_channel(
                &ledger,
                owner,
                new_channel(&format!("Desk {}", n)),
                Timestamp::from_secs(0),
            )
            .unwrap();
        }

        let err = create_channel(
            &ledger,
            owner,
            new_channel("One too many"),
            Timestamp::from_secs(0),
        )
        .unwrap_err();
        assert!(matches!(err, Error::LimitReached(_)));
        assert_eq!(
            ledger.channels_owned_by(owner),
            MAX_CHANNELS_PER_ACCOUNT as usize
        );

        let journal = ledger.journal();
        let lock = journal
            .iter()
            .rposition(|e| *e == format!("lock owner {}", owner))
            .unwrap();
        let count = journal
            .iter()
            .rposition(|e| *e == format!("count channels {}", owner))
            .unwrap();
        assert!(lock < count);
    }

    #[test]
    fn channel_slugs_skip_taken_names() {
        let ledger = MemoryLedger::default();
        let first = create_channel(
            &ledger,
            Uuid::new_v4(),
            new_channel("Harbour News"),
            Timestamp::from_secs(0),
        )
        .unwrap();
        let second = create_channel(
            &ledger,
            Uuid::new_v4(),
            new_channel("Harbour News"),
            Timestamp::from_secs(0),
        )
        .unwrap();
        assert_eq!(first.slug, "harbour-news");
        assert_eq!(second.slug, "harbour-news-2");
    }

    #[test]
    fn channel_quota() {
        assert!(check_channel_quota(MAX_CHANNELS_PER_ACCOUNT - 1).is_ok());
        assert!(matches!(
            check_channel_quota(MAX_CHANNELS_PER_ACCOUNT),
            Err(Error::LimitReached(_))
        ));
    }

    #[test]
    fn slugs() {
        assert_eq!(slug_base("Hello, World!"), "hello-world");
        assert_eq!(slug_base("!!!"), "untitled");
        let taken = ["news", "news-2"];
        let slug =
            free_slug("news", |s| Ok(taken.contains(&s))).unwrap();
        assert_eq!(slug, "news-3");

        let offered = std::cell::RefCell::new(Vec::new());
        let err = claim_slug::<(), _>("busy", |s| {
            offered.borrow_mut().push(s);
            Ok(None)
        })
        .unwrap_err();
        assert!(matches!(err, Error::Conflict { existing: None, .. }));
        let offered = offered.into_inner();
        assert_eq!(offered.len(), MAX_SLUG_ATTEMPTS as usize);
        assert_eq!(offered[1], "busy-2");
    }
}
