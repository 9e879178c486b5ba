//! Engagement accounting: view counting, reactions, subscriber totals and
//! the guards applied when articles are created.
//!
//! The logic is written against small store traits. `PgConnection`
//! implements them in `db::ledger`; unit tests run the same code against an
//! in-memory ledger. Unique constraints in the store are the authority on
//! races: an insert that reports "already present" converges on the stored
//! state instead of failing the request.

pub mod publishing;
pub mod reactions;
pub mod subscribers;
pub mod views;

#[cfg(test)]
pub(crate) mod memory;

use crate::error::Result;

pub trait Transactional {
    /// Runs `f` so that either all of its writes land or none do.
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>;
}
