//! In-memory store used by the engagement unit tests.

use crate::{
    db::{
        articles::{Article, ArticleStatus},
        channels::Channel,
    },
    engagement::{
        publishing::{ArticleStore, ChannelStore},
        reactions::ReactionStore,
        subscribers::SubscriptionStore, views::ViewStore, Transactional,
    },
    error::{Error, Result},
    timestamp::Timestamp,
};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
};
use uuid::Uuid;

#[derive(Clone, Default)]
struct Tables {
    articles: HashMap<Uuid, Article>,
    article_categories: HashSet<(Uuid, Uuid)>,
    categories: HashSet<Uuid>,
    channels: HashMap<Uuid, Channel>,
    reserved_slugs: HashSet<String>,
    views: HashSet<(Uuid, String)>,
    reactions: HashMap<(Uuid, Uuid), bool>,
    subscriptions: HashSet<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct MemoryLedger {
    tables: RefCell<Tables>,
    /// Row locks and guard queries, in the order they were issued.
    journal: RefCell<Vec<String>>,
    /// The next `insert_view` finds the pair already recorded and counted
    /// by a concurrent request.
    pub race_next_view: Cell<bool>,
    /// The next `insert_reaction` finds a row with this value already in
    /// place.
    pub race_next_reaction: Cell<Option<bool>>,
    /// The next `update_reaction` finds the row already deleted by a
    /// concurrent toggle-off.
    pub race_next_update: Cell<bool>,
    /// The next `increment_view_count` fails.
    pub fail_next_increment: Cell<bool>,
}

impl MemoryLedger {
    pub fn add_channel(&self, owner: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let channel = Channel {
            id,
            owner_id: owner,
            name: format!("channel {}", id),
            slug: id.to_string(),
            description: String::new(),
            profile_image_url: None,
            banner_image_url: None,
            admin_subscriber_count: 0,
            created_at: Timestamp::from_secs(0),
        };
        self.tables.borrow_mut().channels.insert(id, channel);
        id
    }

    pub fn add_article(
        &self,
        channel: Uuid,
        title: &str,
        created_at: Timestamp,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut tables = self.tables.borrow_mut();
        let author = tables.channels[&channel].owner_id;
        tables.articles.insert(
            id,
            Article {
                id,
                slug: id.to_string(),
                title: title.to_string(),
                content: String::new(),
                channel_id: channel,
                author_id: author,
                location_name: None,
                latitude: None,
                longitude: None,
                status: ArticleStatus::Published,
                view_count: 0,
                created_at,
                edited_at: None,
            },
        );
        id
    }

    pub fn add_category(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.borrow_mut().categories.insert(id);
        id
    }

    pub fn reserve_slug(&self, slug: &str) {
        self.tables.borrow_mut().reserved_slugs.insert(slug.to_string());
    }

    pub fn set_view_count(&self, article: Uuid, count: i64) {
        if let Some(a) = self.tables.borrow_mut().articles.get_mut(&article) {
            a.view_count = count;
        }
    }

    pub fn set_admin_count(&self, channel: Uuid, count: i64) {
        if let Some(c) = self.tables.borrow_mut().channels.get_mut(&channel) {
            c.admin_subscriber_count = count;
        }
    }

    pub fn view_count_of(&self, article: Uuid) -> i64 {
        self.tables.borrow().articles[&article].view_count
    }

    pub fn view_rows(&self, article: Uuid) -> usize {
        let tables = self.tables.borrow();
        tables.views.iter().filter(|(a, _)| *a == article).count()
    }

    pub fn reaction_rows(&self, article: Uuid) -> usize {
        let tables = self.tables.borrow();
        tables.reactions.keys().filter(|(a, _)| *a == article).count()
    }

    pub fn category_rows(&self, article: Uuid) -> usize {
        let tables = self.tables.borrow();
        tables
            .article_categories
            .iter()
            .filter(|(a, _)| *a == article)
            .count()
    }

    pub fn subscription_rows(&self, channel: Uuid) -> usize {
        let tables = self.tables.borrow();
        tables
            .subscriptions
            .iter()
            .filter(|(_, c)| *c == channel)
            .count()
    }

    pub fn channels_owned_by(&self, owner: Uuid) -> usize {
        let tables = self.tables.borrow();
        tables.channels.values().filter(|c| c.owner_id == owner).count()
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    fn note(&self, entry: String) {
        self.journal.borrow_mut().push(entry);
    }

    fn slug_in_use(tables: &Tables, slug: &str) -> bool {
        tables.reserved_slugs.contains(slug)
            || tables.articles.values().any(|a| a.slug == slug)
    }
}

impl Transactional for MemoryLedger {
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let snapshot = self.tables.borrow().clone();
        let result = f();
        if result.is_err() {
            *self.tables.borrow_mut() = snapshot;
        }
        result
    }
}

impl ViewStore for MemoryLedger {
    fn view_count(&self, article: Uuid) -> Result<Option<i64>> {
        Ok(self
            .tables
            .borrow()
            .articles
            .get(&article)
            .map(|a| a.view_count))
    }

    fn has_viewed(&self, article: Uuid, client: &str) -> Result<bool> {
        Ok(self
            .tables
            .borrow()
            .views
            .contains(&(article, client.to_string())))
    }

    fn insert_view(&self, article: Uuid, client: &str) -> Result<bool> {
        let mut tables = self.tables.borrow_mut();
        if self.race_next_view.replace(false) {
            tables.views.insert((article, client.to_string()));
            if let Some(a) = tables.articles.get_mut(&article) {
                a.view_count += 1;
            }
            return Ok(false);
        }
        Ok(tables.views.insert((article, client.to_string())))
    }

    fn increment_view_count(&self, article: Uuid) -> Result<i64> {
        if self.fail_next_increment.replace(false) {
            return Err(Error::Persistence(
                diesel::result::Error::RollbackTransaction,
            ));
        }
        let mut tables = self.tables.borrow_mut();
        let a = tables
            .articles
            .get_mut(&article)
            .ok_or(Error::NotFound("article"))?;
        a.view_count += 1;
        Ok(a.view_count)
    }
}

impl ReactionStore for MemoryLedger {
    fn article_exists(&self, article: Uuid) -> Result<bool> {
        Ok(self.tables.borrow().articles.contains_key(&article))
    }

    fn reaction(&self, article: Uuid, user: Uuid) -> Result<Option<bool>> {
        Ok(self.tables.borrow().reactions.get(&(article, user)).cloned())
    }

    fn insert_reaction(
        &self,
        article: Uuid,
        user: Uuid,
        is_like: bool,
    ) -> Result<bool> {
        let mut tables = self.tables.borrow_mut();
        if let Some(winner) = self.race_next_reaction.replace(None) {
            tables.reactions.insert((article, user), winner);
        }
        if tables.reactions.contains_key(&(article, user)) {
            return Ok(false);
        }
        tables.reactions.insert((article, user), is_like);
        Ok(true)
    }

    fn update_reaction(
        &self,
        article: Uuid,
        user: Uuid,
        is_like: bool,
    ) -> Result<bool> {
        let mut tables = self.tables.borrow_mut();
        if self.race_next_update.replace(false) {
            tables.reactions.remove(&(article, user));
        }
        match tables.reactions.get_mut(&(article, user)) {
            Some(r) => {
                *r = is_like;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_reaction(&self, article: Uuid, user: Uuid) -> Result<()> {
        self.tables.borrow_mut().reactions.remove(&(article, user));
        Ok(())
    }

    fn count_reactions(&self, article: Uuid, is_like: bool) -> Result<i64> {
        let tables = self.tables.borrow();
        Ok(tables
            .reactions
            .iter()
            .filter(|((a, _), v)| *a == article && **v == is_like)
            .count() as i64)
    }
}

impl SubscriptionStore for MemoryLedger {
    fn admin_subscriber_count(&self, channel: Uuid) -> Result<Option<i64>> {
        Ok(self
            .tables
            .borrow()
            .channels
            .get(&channel)
            .map(|c| c.admin_subscriber_count))
    }

    fn count_subscriptions(&self, channel: Uuid) -> Result<i64> {
        Ok(self.subscription_rows(channel) as i64)
    }

    fn insert_subscription(&self, user: Uuid, channel: Uuid) -> Result<bool> {
        Ok(self.tables.borrow_mut().subscriptions.insert((user, channel)))
    }

    fn delete_subscription(&self, user: Uuid, channel: Uuid) -> Result<bool> {
        Ok(self.tables.borrow_mut().subscriptions.remove(&(user, channel)))
    }

    fn set_admin_subscriber_count(
        &self,
        channel: Uuid,
        value: i64,
    ) -> Result<()> {
        self.set_admin_count(channel, value);
        Ok(())
    }
}

impl ChannelStore for MemoryLedger {
    fn lock_owner(&self, owner: Uuid) -> Result<()> {
        self.note(format!("lock owner {}", owner));
        Ok(())
    }

    fn count_owned_channels(&self, owner: Uuid) -> Result<i64> {
        self.note(format!("count channels {}", owner));
        Ok(self.channels_owned_by(owner) as i64)
    }

    fn channel_slug_taken(&self, slug: &str) -> Result<bool> {
        let tables = self.tables.borrow();
        Ok(tables.channels.values().any(|c| c.slug == slug))
    }

    fn insert_channel(&self, channel: Channel) -> Result<Channel> {
        self.tables
            .borrow_mut()
            .channels
            .insert(channel.id, channel.clone());
        Ok(channel)
    }
}

impl ArticleStore for MemoryLedger {
    fn lock_channel(&self, id: Uuid) -> Result<Option<Channel>> {
        self.note(format!("lock channel {}", id));
        Ok(self.tables.borrow().channels.get(&id).cloned())
    }

    fn unknown_categories(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let tables = self.tables.borrow();
        Ok(ids
            .iter()
            .filter(|id| !tables.categories.contains(*id))
            .cloned()
            .collect())
    }

    fn recent_article_with_title(
        &self,
        channel: Uuid,
        title: &str,
        since: Timestamp,
    ) -> Result<Option<Uuid>> {
        let tables = self.tables.borrow();
        let mut matches: Vec<&Article> = tables
            .articles
            .values()
            .filter(|a| {
                a.channel_id == channel && a.title == title && a.created_at > since
            })
            .collect();
        matches.sort_by(|a, b| {
            b.created_at
                .partial_cmp(&a.created_at)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(matches.first().map(|a| a.id))
    }

    fn count_articles_since(
        &self,
        channel: Uuid,
        since: Timestamp,
    ) -> Result<i64> {
        self.note(format!("count articles {}", channel));
        let tables = self.tables.borrow();
        Ok(tables
            .articles
            .values()
            .filter(|a| a.channel_id == channel && a.created_at > since)
            .count() as i64)
    }

    fn slug_taken(&self, slug: &str) -> Result<bool> {
        Ok(Self::slug_in_use(&self.tables.borrow(), slug))
    }

    fn insert_article(
        &self,
        article: &Article,
        categories: &[Uuid],
    ) -> Result<Option<Article>> {
        let mut tables = self.tables.borrow_mut();
        if Self::slug_in_use(&tables, &article.slug) {
            return Ok(None);
        }
        for &category in categories {
            tables.article_categories.insert((article.id, category));
        }
        tables.articles.insert(article.id, article.clone());
        Ok(Some(article.clone()))
    }
}
