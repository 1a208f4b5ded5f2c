//! Persistence for users, profiles, tweets, likes and follow edges.
//!
//! Uniqueness of usernames, likes and follow edges is enforced by the store
//! itself. Callers treat a `false` from `insert_like`/`insert_friendship` or a
//! [`StoreError::Conflict`] as the authoritative "already exists" answer.

pub mod memory;
pub mod scylla;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{FriendShip, Like, Profile, Tweet, User};

pub use self::memory::MemoryStore;
pub use self::scylla::ScyllaStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("query failed: {0}")]
    Query(#[from] ::scylla::transport::errors::QueryError),

    #[error("malformed row in {table}: {reason}")]
    Decode { table: &'static str, reason: String },
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Create a user and its profile.
    ///
    /// # Errors
    /// Returns `Conflict` if the username is already registered.
    async fn insert_user(&self, user: &User, profile: &Profile) -> Result<(), StoreError>;

    async fn user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn profile(&self, profile_id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn update_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn insert_tweet(&self, tweet: &Tweet) -> Result<(), StoreError>;

    async fn tweet(&self, tweet_id: Uuid) -> Result<Option<Tweet>, StoreError>;

    /// Every tweet, newest first.
    async fn tweets(&self) -> Result<Vec<Tweet>, StoreError>;

    /// Tweets authored by `user_id`, newest first.
    async fn tweets_by_user(&self, user_id: Uuid) -> Result<Vec<Tweet>, StoreError>;

    /// Remove a tweet together with all of its likes.
    async fn delete_tweet(&self, tweet: &Tweet) -> Result<(), StoreError>;

    /// Returns `false` when `like.user_id` already likes `like.tweet_id`.
    async fn insert_like(&self, like: &Like) -> Result<bool, StoreError>;

    async fn delete_like(&self, tweet_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    async fn liked_tweet_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>, StoreError>;

    /// Returns `false` when the (following, followed) edge already exists.
    async fn insert_friendship(&self, friendship: &FriendShip) -> Result<bool, StoreError>;

    /// Returns `false` when there was no such edge.
    async fn delete_friendship(&self, following: Uuid, followed: Uuid)
        -> Result<bool, StoreError>;

    /// Edges where `user_id` is the follower.
    async fn following(&self, user_id: Uuid) -> Result<Vec<FriendShip>, StoreError>;

    /// Edges where `user_id` is the one being followed.
    async fn followers(&self, user_id: Uuid) -> Result<Vec<FriendShip>, StoreError>;
}

/// Newest first; ties broken by id so listings are stable.
pub(crate) fn sort_newest_first(tweets: &mut [Tweet]) {
    tweets.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.tweet_id.cmp(&b.tweet_id))
    });
}
