//! Engagement store traits backed by PostgreSQL.

use crate::{
    db::{
        articles::{self, Article},
        categories,
        channels::{self, Channel},
        reactions::{self, Reaction},
        subscriptions::{self, Subscription},
        users,
        views::{self, ArticleView},
    },
    engagement::{
        publishing::{ArticleStore, ChannelStore},
        reactions::ReactionStore,
        subscribers::SubscriptionStore, views::ViewStore, Transactional,
    },
    error::Result,
    timestamp::Timestamp,
};
use diesel::{pg::PgConnection, Connection};
use uuid::Uuid;

impl Transactional for PgConnection {
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.transaction(f)
    }
}

impl ViewStore for PgConnection {
    fn view_count(&self, article: Uuid) -> Result<Option<i64>> {
        Ok(articles::view_count(article, self)?)
    }

    fn has_viewed(&self, article: Uuid, client: &str) -> Result<bool> {
        Ok(views::exists(article, client, self)?)
    }

    fn insert_view(&self, article: Uuid, client: &str) -> Result<bool> {
        let view = ArticleView {
            article_id: article,
            client_identifier: client.to_string(),
            created_at: Timestamp::now(),
        };
        Ok(views::insert(&view, self)?)
    }

    fn increment_view_count(&self, article: Uuid) -> Result<i64> {
        Ok(articles::increment_view_count(article, self)?)
    }
}

impl ReactionStore for PgConnection {
    fn article_exists(&self, article: Uuid) -> Result<bool> {
        Ok(articles::exists(article, self)?)
    }

    fn reaction(&self, article: Uuid, user: Uuid) -> Result<Option<bool>> {
        Ok(reactions::current(article, user, self)?)
    }

    fn insert_reaction(
        &self,
        article: Uuid,
        user: Uuid,
        is_like: bool,
    ) -> Result<bool> {
        let reaction = Reaction {
            article_id: article,
            user_id: user,
            is_like,
            created_at: Timestamp::now(),
        };
        Ok(reactions::insert(&reaction, self)?)
    }

    fn update_reaction(
        &self,
        article: Uuid,
        user: Uuid,
        is_like: bool,
    ) -> Result<bool> {
        Ok(reactions::set_is_like(article, user, is_like, self)? == 1)
    }

    fn delete_reaction(&self, article: Uuid, user: Uuid) -> Result<()> {
        reactions::delete(article, user, self)?;
        Ok(())
    }

    fn count_reactions(&self, article: Uuid, is_like: bool) -> Result<i64> {
        Ok(reactions::count(article, is_like, self)?)
    }
}

impl SubscriptionStore for PgConnection {
    fn admin_subscriber_count(&self, channel: Uuid) -> Result<Option<i64>> {
        Ok(channels::find(channel, self)?.map(|c| c.admin_subscriber_count))
    }

    fn count_subscriptions(&self, channel: Uuid) -> Result<i64> {
        Ok(subscriptions::count_for_channel(channel, self)?)
    }

    fn insert_subscription(&self, user: Uuid, channel: Uuid) -> Result<bool> {
        let subscription = Subscription {
            user_id: user,
            channel_id: channel,
            created_at: Timestamp::now(),
        };
        Ok(subscriptions::insert(&subscription, self)?)
    }

    fn delete_subscription(&self, user: Uuid, channel: Uuid) -> Result<bool> {
        Ok(subscriptions::delete(user, channel, self)?)
    }

    fn set_admin_subscriber_count(
        &self,
        channel: Uuid,
        value: i64,
    ) -> Result<()> {
        channels::set_admin_subscriber_count(channel, value, self)?;
        Ok(())
    }
}

impl ChannelStore for PgConnection {
    fn lock_owner(&self, owner: Uuid) -> Result<()> {
        users::lock(owner, self)?;
        Ok(())
    }

    fn count_owned_channels(&self, owner: Uuid) -> Result<i64> {
        Ok(channels::count_owned(owner, self)?)
    }

    fn channel_slug_taken(&self, slug: &str) -> Result<bool> {
        Ok(channels::slug_taken(slug, self)?)
    }

    fn insert_channel(&self, channel: Channel) -> Result<Channel> {
        Ok(channels::insert(channel, self)?)
    }
}

impl ArticleStore for PgConnection {
    fn lock_channel(&self, id: Uuid) -> Result<Option<Channel>> {
        Ok(channels::find_for_update(id, self)?)
    }

    fn unknown_categories(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(categories::unknown(ids, self)?)
    }

    fn recent_article_with_title(
        &self,
        channel: Uuid,
        title: &str,
        since: Timestamp,
    ) -> Result<Option<Uuid>> {
        Ok(articles::find_recent_with_title(channel, title, since, self)?)
    }

    fn count_articles_since(
        &self,
        channel: Uuid,
        since: Timestamp,
    ) -> Result<i64> {
        Ok(articles::count_created_since(channel, since, self)?)
    }

    fn slug_taken(&self, slug: &str) -> Result<bool> {
        Ok(articles::slug_taken(slug, self)?)
    }

    fn insert_article(
        &self,
        article: &Article,
        category_ids: &[Uuid],
    ) -> Result<Option<Article>> {
        let created = match articles::insert_if_slug_free(article, self)? {
            Some(created) => created,
            None => return Ok(None),
        };
        categories::attach(created.id, category_ids, self)?;
        Ok(Some(created))
    }
}
