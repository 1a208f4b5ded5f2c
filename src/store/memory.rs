use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{sort_newest_first, Store, StoreError};
use crate::models::{FriendShip, Like, Profile, Tweet, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    usernames: HashMap<String, Uuid>,
    profiles: HashMap<Uuid, Profile>,
    tweets: HashMap<Uuid, Tweet>,
    /// Keyed by (tweet_id, user_id).
    likes: HashMap<(Uuid, Uuid), Like>,
    /// Keyed by (following, followed).
    friendships: HashMap<(Uuid, Uuid), FriendShip>,
}

/// In-process store. Every operation runs under one lock, so uniqueness
/// checks and the writes they guard cannot interleave.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User, profile: &Profile) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.usernames.contains_key(&user.username) {
            return Err(StoreError::Conflict(format!(
                "username {} already exists",
                user.username
            )));
        }
        tables.usernames.insert(user.username.clone(), user.user_id);
        tables.users.insert(user.user_id, user.clone());
        tables.profiles.insert(profile.profile_id, profile.clone());
        Ok(())
    }

    async fn user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().users.get(&user_id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn profile(&self, profile_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().profiles.get(&profile_id).cloned())
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.tables
            .write()
            .profiles
            .insert(profile.profile_id, profile.clone());
        Ok(())
    }

    async fn insert_tweet(&self, tweet: &Tweet) -> Result<(), StoreError> {
        self.tables
            .write()
            .tweets
            .insert(tweet.tweet_id, tweet.clone());
        Ok(())
    }

    async fn tweet(&self, tweet_id: Uuid) -> Result<Option<Tweet>, StoreError> {
        Ok(self.tables.read().tweets.get(&tweet_id).cloned())
    }

    async fn tweets(&self) -> Result<Vec<Tweet>, StoreError> {
        let mut tweets: Vec<Tweet> = self.tables.read().tweets.values().cloned().collect();
        sort_newest_first(&mut tweets);
        Ok(tweets)
    }

    async fn tweets_by_user(&self, user_id: Uuid) -> Result<Vec<Tweet>, StoreError> {
        let mut tweets: Vec<Tweet> = self
            .tables
            .read()
            .tweets
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        sort_newest_first(&mut tweets);
        Ok(tweets)
    }

    async fn delete_tweet(&self, tweet: &Tweet) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.tweets.remove(&tweet.tweet_id);
        tables
            .likes
            .retain(|(tweet_id, _), _| *tweet_id != tweet.tweet_id);
        Ok(())
    }

    async fn insert_like(&self, like: &Like) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let key = (like.tweet_id, like.user_id);
        if tables.likes.contains_key(&key) {
            return Ok(false);
        }
        tables.likes.insert(key, like.clone());
        Ok(true)
    }

    async fn delete_like(&self, tweet_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.tables.write().likes.remove(&(tweet_id, user_id));
        Ok(())
    }

    async fn liked_tweet_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>, StoreError> {
        Ok(self
            .tables
            .read()
            .likes
            .keys()
            .filter(|(_, liker)| *liker == user_id)
            .map(|(tweet_id, _)| *tweet_id)
            .collect())
    }

    async fn insert_friendship(&self, friendship: &FriendShip) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let key = (friendship.following, friendship.followed);
        if tables.friendships.contains_key(&key) {
            return Ok(false);
        }
        tables.friendships.insert(key, friendship.clone());
        Ok(true)
    }

    async fn delete_friendship(
        &self,
        following: Uuid,
        followed: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .friendships
            .remove(&(following, followed))
            .is_some())
    }

    async fn following(&self, user_id: Uuid) -> Result<Vec<FriendShip>, StoreError> {
        let mut edges: Vec<FriendShip> = self
            .tables
            .read()
            .friendships
            .values()
            .filter(|f| f.following == user_id)
            .cloned()
            .collect();
        edges.sort_by_key(|f| f.created_at);
        Ok(edges)
    }

    async fn followers(&self, user_id: Uuid) -> Result<Vec<FriendShip>, StoreError> {
        let mut edges: Vec<FriendShip> = self
            .tables
            .read()
            .friendships
            .values()
            .filter(|f| f.followed == user_id)
            .cloned()
            .collect();
        edges.sort_by_key(|f| f.created_at);
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn user(name: &str) -> (User, Profile) {
        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: String::new(),
            profile_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let profile = Profile {
            profile_id: user.profile_id,
            user_id: user.user_id,
            display_name: name.to_string(),
            bio: String::new(),
            updated_at: now,
        };
        (user, profile)
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        let (alice, profile) = user("alice");
        store.insert_user(&alice, &profile).await.unwrap();

        let (again, profile) = user("alice");
        let err = store.insert_user(&again, &profile).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(
            store.user_by_username("alice").await.unwrap().unwrap().user_id,
            alice.user_id
        );
    }

    #[tokio::test]
    async fn deleting_a_tweet_drops_its_likes() {
        let store = MemoryStore::new();
        let (alice, profile) = user("alice");
        store.insert_user(&alice, &profile).await.unwrap();

        let tweet = Tweet {
            tweet_id: Uuid::new_v4(),
            user_id: alice.user_id,
            content: "hello".to_string(),
            created_at: Utc::now(),
        };
        store.insert_tweet(&tweet).await.unwrap();
        let like = Like {
            like_id: Uuid::new_v4(),
            tweet_id: tweet.tweet_id,
            user_id: alice.user_id,
            created_at: Utc::now(),
        };
        assert!(store.insert_like(&like).await.unwrap());
        assert!(!store.insert_like(&like).await.unwrap());

        store.delete_tweet(&tweet).await.unwrap();
        assert!(store.tweet(tweet.tweet_id).await.unwrap().is_none());
        assert!(store.liked_tweet_ids(alice.user_id).await.unwrap().is_empty());
    }
}
