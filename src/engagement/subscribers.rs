use crate::{
    engagement::Transactional,
    error::{Error, Result},
};
use serde::Serialize;
use uuid::Uuid;

/// A channel's subscriber figures: real subscriptions, the operator
/// offset, and the total shown publicly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriberCount {
    pub real_subscriber_count: i64,
    pub admin_subscriber_count: i64,
    pub subscriber_count: i64,
}

impl SubscriberCount {
    pub fn new(real: i64, admin: i64) -> SubscriberCount {
        let real = real.max(0);
        let admin = admin.max(0);
        SubscriberCount {
            real_subscriber_count: real,
            admin_subscriber_count: admin,
            subscriber_count: real + admin,
        }
    }
}

/// The offset needed on top of `real` subscriptions to display `target`.
pub fn override_for_target(target: i64, real: i64) -> i64 {
    (target - real).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionChange {
    pub subscribed: bool,
    /// Whether a row was actually created or removed.
    pub changed: bool,
    #[serde(flatten)]
    pub counts: SubscriberCount,
}

pub trait SubscriptionStore: Transactional {
    /// The stored operator offset, or `None` if the channel does not exist.
    fn admin_subscriber_count(&self, channel: Uuid) -> Result<Option<i64>>;

    fn count_subscriptions(&self, channel: Uuid) -> Result<i64>;

    /// `false` means the user was already subscribed.
    fn insert_subscription(&self, user: Uuid, channel: Uuid) -> Result<bool>;

    /// `false` means there was no subscription to remove.
    fn delete_subscription(&self, user: Uuid, channel: Uuid) -> Result<bool>;

    fn set_admin_subscriber_count(&self, channel: Uuid, value: i64)
        -> Result<()>;
}

fn counts<S: SubscriptionStore>(
    store: &S,
    channel: Uuid,
) -> Result<SubscriberCount> {
    let admin = store
        .admin_subscriber_count(channel)?
        .ok_or(Error::NotFound("channel"))?;
    let real = store.count_subscriptions(channel)?;
    Ok(SubscriberCount::new(real, admin))
}

pub fn effective_subscriber_count<S: SubscriptionStore>(
    store: &S,
    channel: Uuid,
) -> Result<SubscriberCount> {
    counts(store, channel)
}

/// Stores the offset that makes the channel display `target` subscribers
/// given its current real subscriptions. The offset is not revisited when
/// real subscriptions change later.
pub fn set_target_subscriber_count<S: SubscriptionStore>(
    store: &S,
    channel: Uuid,
    target: i64,
) -> Result<SubscriberCount> {
    if target < 0 {
        return Err(Error::invalid(
            "subscriber_count",
            "must be zero or greater",
        ));
    }
    store.atomically(|| {
        let current = counts(store, channel)?;
        let admin = override_for_target(target, current.real_subscriber_count);
        store.set_admin_subscriber_count(channel, admin)?;
        log::info!(
            "Channel {} subscriber target {} ({} real, override {} -> {})",
            channel,
            target,
            current.real_subscriber_count,
            current.admin_subscriber_count,
            admin
        );
        Ok(SubscriberCount::new(current.real_subscriber_count, admin))
    })
}

pub fn subscribe<S: SubscriptionStore>(
    store: &S,
    user: Uuid,
    channel: Uuid,
) -> Result<SubscriptionChange> {
    store.atomically(|| {
        counts(store, channel)?;
        let changed = store.insert_subscription(user, channel)?;
        Ok(SubscriptionChange {
            subscribed: true,
            changed,
            counts: counts(store, channel)?,
        })
    })
}

pub fn unsubscribe<S: SubscriptionStore>(
    store: &S,
    user: Uuid,
    channel: Uuid,
) -> Result<SubscriptionChange> {
    store.atomically(|| {
        counts(store, channel)?;
        let changed = store.delete_subscription(user, channel)?;
        Ok(SubscriptionChange {
            subscribed: false,
            changed,
            counts: counts(store, channel)?,
        })
    })
}
