use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::debug;
use scylla::{
    frame::response::result::{CqlValue, Row},
    frame::value::CqlTimestamp,
    QueryResult, Session,
};
use uuid::Uuid;

use super::{sort_newest_first, Store, StoreError};
use crate::models::{FriendShip, Like, Profile, Tweet, User};

/// Store backed by a ScyllaDB keyspace laid out by [`crate::db::create_schema`].
///
/// The session must already be bound to the keyspace (`use_keyspace`).
pub struct ScyllaStore {
    session: Arc<Session>,
}

impl ScyllaStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    async fn fetch_tweet(&self, tweet_id: Uuid) -> Result<Option<Tweet>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT tweet_id, user_id, content, created_at FROM tweets WHERE tweet_id = ?",
                (tweet_id,),
            )
            .await?;
        rows(result).first().map(tweet_from_row).transpose()
    }
}

fn to_cql(at: DateTime<Utc>) -> CqlTimestamp {
    CqlTimestamp(at.timestamp_millis())
}

fn from_cql(timestamp: CqlTimestamp) -> DateTime<Utc> {
    let millis = timestamp.0;
    let seconds = millis.div_euclid(1000);
    let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;
    DateTime::<Utc>::from_timestamp(seconds, nanos).unwrap_or_default()
}

fn rows(result: QueryResult) -> Vec<Row> {
    result.rows.unwrap_or_default()
}

/// Outcome of a conditional (`IF [NOT] EXISTS`) statement.
fn applied(result: QueryResult) -> bool {
    lwt_applied(&rows(result))
}

fn lwt_applied(rows: &[Row]) -> bool {
    rows.first()
        .and_then(|row| row.columns.first())
        .map(|value| matches!(value, Some(CqlValue::Boolean(true))))
        .unwrap_or(false)
}

fn column<'a>(row: &'a Row, index: usize, table: &'static str) -> Result<&'a CqlValue, StoreError> {
    row.columns
        .get(index)
        .and_then(Option::as_ref)
        .ok_or_else(|| StoreError::Decode {
            table,
            reason: format!("column {index} is missing"),
        })
}

fn uuid_at(row: &Row, index: usize, table: &'static str) -> Result<Uuid, StoreError> {
    match column(row, index, table)? {
        CqlValue::Uuid(uuid) => Ok(*uuid),
        other => Err(StoreError::Decode {
            table,
            reason: format!("column {index}: expected uuid, got {other:?}"),
        }),
    }
}

fn text_at(row: &Row, index: usize, table: &'static str) -> Result<String, StoreError> {
    match row.columns.get(index) {
        // Scylla hands back empty text columns as null.
        Some(None) => Ok(String::new()),
        Some(Some(CqlValue::Text(text))) | Some(Some(CqlValue::Ascii(text))) => Ok(text.clone()),
        other => Err(StoreError::Decode {
            table,
            reason: format!("column {index}: expected text, got {other:?}"),
        }),
    }
}

fn timestamp_at(row: &Row, index: usize, table: &'static str) -> Result<DateTime<Utc>, StoreError> {
    match column(row, index, table)? {
        CqlValue::Timestamp(ts) => Ok(from_cql(*ts)),
        other => Err(StoreError::Decode {
            table,
            reason: format!("column {index}: expected timestamp, got {other:?}"),
        }),
    }
}

fn user_from_row(row: &Row) -> Result<User, StoreError> {
    Ok(User {
        user_id: uuid_at(row, 0, "users")?,
        username: text_at(row, 1, "users")?,
        email: text_at(row, 2, "users")?,
        password_hash: text_at(row, 3, "users")?,
        profile_id: uuid_at(row, 4, "users")?,
        created_at: timestamp_at(row, 5, "users")?,
        updated_at: timestamp_at(row, 6, "users")?,
    })
}

fn profile_from_row(row: &Row) -> Result<Profile, StoreError> {
    Ok(Profile {
        profile_id: uuid_at(row, 0, "profiles")?,
        user_id: uuid_at(row, 1, "profiles")?,
        display_name: text_at(row, 2, "profiles")?,
        bio: text_at(row, 3, "profiles")?,
        updated_at: timestamp_at(row, 4, "profiles")?,
    })
}

fn tweet_from_row(row: &Row) -> Result<Tweet, StoreError> {
    Ok(Tweet {
        tweet_id: uuid_at(row, 0, "tweets")?,
        user_id: uuid_at(row, 1, "tweets")?,
        content: text_at(row, 2, "tweets")?,
        created_at: timestamp_at(row, 3, "tweets")?,
    })
}

/// Both follow tables store (owner, other, friendship_id, created_at);
/// `owner_is_follower` says which side the partition key is.
fn friendship_from_row(
    row: &Row,
    table: &'static str,
    owner_is_follower: bool,
) -> Result<FriendShip, StoreError> {
    let owner = uuid_at(row, 0, table)?;
    let other = uuid_at(row, 1, table)?;
    let (following, followed) = if owner_is_follower {
        (owner, other)
    } else {
        (other, owner)
    };
    Ok(FriendShip {
        friendship_id: uuid_at(row, 2, table)?,
        following,
        followed,
        created_at: timestamp_at(row, 3, table)?,
    })
}

const USER_COLUMNS: &str =
    "user_id, username, email, password_hash, profile_id, created_at, updated_at";

#[async_trait]
impl Store for ScyllaStore {
    async fn insert_user(&self, user: &User, profile: &Profile) -> Result<(), StoreError> {
        // The rows under a fresh user_id are unreachable until the username
        // points at them, so the claim goes last.
        self.session
            .query(
                "INSERT INTO users (user_id, username, email, password_hash, profile_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                (
                    user.user_id,
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    user.profile_id,
                    to_cql(user.created_at),
                    to_cql(user.updated_at),
                ),
            )
            .await?;
        self.update_profile(profile).await?;

        let claimed = self
            .session
            .query(
                "INSERT INTO users_by_username (username, user_id) VALUES (?, ?) IF NOT EXISTS",
                (&user.username, user.user_id),
            )
            .await?;
        if applied(claimed) {
            return Ok(());
        }

        debug!("Username {} taken, removing rows of {}", user.username, user.user_id);
        self.session
            .query("DELETE FROM profiles WHERE profile_id = ?", (profile.profile_id,))
            .await?;
        self.session
            .query("DELETE FROM users WHERE user_id = ?", (user.user_id,))
            .await?;
        Err(StoreError::Conflict(format!(
            "username {} already exists",
            user.username
        )))
    }

    async fn user_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let result = self
            .session
            .query(
                format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"),
                (user_id,),
            )
            .await?;
        rows(result).first().map(user_from_row).transpose()
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT user_id FROM users_by_username WHERE username = ?",
                (username,),
            )
            .await?;
        match rows(result).first() {
            Some(row) => {
                let user_id = uuid_at(row, 0, "users_by_username")?;
                self.user_by_id(user_id).await
            }
            None => Ok(None),
        }
    }

    async fn profile(&self, profile_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT profile_id, user_id, display_name, bio, updated_at FROM profiles WHERE profile_id = ?",
                (profile_id,),
            )
            .await?;
        rows(result).first().map(profile_from_row).transpose()
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.session
            .query(
                "INSERT INTO profiles (profile_id, user_id, display_name, bio, updated_at) VALUES (?, ?, ?, ?, ?)",
                (
                    profile.profile_id,
                    profile.user_id,
                    &profile.display_name,
                    &profile.bio,
                    to_cql(profile.updated_at),
                ),
            )
            .await?;
        Ok(())
    }

    async fn insert_tweet(&self, tweet: &Tweet) -> Result<(), StoreError> {
        let created_at = to_cql(tweet.created_at);
        self.session
            .query(
                "INSERT INTO tweets (tweet_id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
                (tweet.tweet_id, tweet.user_id, &tweet.content, created_at),
            )
            .await?;
        self.session
            .query(
                "INSERT INTO user_timeline (user_id, created_at, tweet_id) VALUES (?, ?, ?)",
                (tweet.user_id, created_at, tweet.tweet_id),
            )
            .await?;
        Ok(())
    }

    async fn tweet(&self, tweet_id: Uuid) -> Result<Option<Tweet>, StoreError> {
        self.fetch_tweet(tweet_id).await
    }

    async fn tweets(&self) -> Result<Vec<Tweet>, StoreError> {
        let result = self
            .session
            .query("SELECT tweet_id, user_id, content, created_at FROM tweets", ())
            .await?;
        let mut tweets = rows(result)
            .iter()
            .map(tweet_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        sort_newest_first(&mut tweets);
        Ok(tweets)
    }

    async fn tweets_by_user(&self, user_id: Uuid) -> Result<Vec<Tweet>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT tweet_id FROM user_timeline WHERE user_id = ?",
                (user_id,),
            )
            .await?;
        let tweet_ids = rows(result)
            .iter()
            .map(|row| uuid_at(row, 0, "user_timeline"))
            .collect::<Result<Vec<_>, _>>()?;

        let fetched = try_join_all(tweet_ids.into_iter().map(|id| self.fetch_tweet(id))).await?;
        let mut tweets: Vec<Tweet> = fetched.into_iter().flatten().collect();
        sort_newest_first(&mut tweets);
        debug!("Found {} tweets for user {}", tweets.len(), user_id);
        Ok(tweets)
    }

    async fn delete_tweet(&self, tweet: &Tweet) -> Result<(), StoreError> {
        let likers = self
            .session
            .query("SELECT user_id FROM likes WHERE tweet_id = ?", (tweet.tweet_id,))
            .await?;
        for row in rows(likers) {
            let user_id = uuid_at(&row, 0, "likes")?;
            self.session
                .query(
                    "DELETE FROM likes_by_user WHERE user_id = ? AND tweet_id = ?",
                    (user_id, tweet.tweet_id),
                )
                .await?;
        }
        self.session
            .query("DELETE FROM likes WHERE tweet_id = ?", (tweet.tweet_id,))
            .await?;
        self.session
            .query(
                "DELETE FROM user_timeline WHERE user_id = ? AND created_at = ? AND tweet_id = ?",
                (tweet.user_id, to_cql(tweet.created_at), tweet.tweet_id),
            )
            .await?;
        self.session
            .query("DELETE FROM tweets WHERE tweet_id = ?", (tweet.tweet_id,))
            .await?;
        Ok(())
    }

    async fn insert_like(&self, like: &Like) -> Result<bool, StoreError> {
        let result = self
            .session
            .query(
                "INSERT INTO likes (tweet_id, user_id, like_id, created_at) VALUES (?, ?, ?, ?) IF NOT EXISTS",
                (like.tweet_id, like.user_id, like.like_id, to_cql(like.created_at)),
            )
            .await?;
        if !applied(result) {
            return Ok(false);
        }
        self.session
            .query(
                "INSERT INTO likes_by_user (user_id, tweet_id) VALUES (?, ?)",
                (like.user_id, like.tweet_id),
            )
            .await?;
        Ok(true)
    }

    async fn delete_like(&self, tweet_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.session
            .query(
                "DELETE FROM likes WHERE tweet_id = ? AND user_id = ?",
                (tweet_id, user_id),
            )
            .await?;
        self.session
            .query(
                "DELETE FROM likes_by_user WHERE user_id = ? AND tweet_id = ?",
                (user_id, tweet_id),
            )
            .await?;
        Ok(())
    }

    async fn liked_tweet_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT tweet_id FROM likes_by_user WHERE user_id = ?",
                (user_id,),
            )
            .await?;
        rows(result)
            .iter()
            .map(|row| uuid_at(row, 0, "likes_by_user"))
            .collect()
    }

    async fn insert_friendship(&self, friendship: &FriendShip) -> Result<bool, StoreError> {
        let created_at = to_cql(friendship.created_at);
        let result = self
            .session
            .query(
                "INSERT INTO following (following_id, followed_id, friendship_id, created_at) VALUES (?, ?, ?, ?) IF NOT EXISTS",
                (
                    friendship.following,
                    friendship.followed,
                    friendship.friendship_id,
                    created_at,
                ),
            )
            .await?;
        if !applied(result) {
            return Ok(false);
        }
        self.session
            .query(
                "INSERT INTO followers (followed_id, following_id, friendship_id, created_at) VALUES (?, ?, ?, ?)",
                (
                    friendship.followed,
                    friendship.following,
                    friendship.friendship_id,
                    created_at,
                ),
            )
            .await?;
        Ok(true)
    }

    async fn delete_friendship(
        &self,
        following: Uuid,
        followed: Uuid,
    ) -> Result<bool, StoreError> {
        let result = self
            .session
            .query(
                "DELETE FROM following WHERE following_id = ? AND followed_id = ? IF EXISTS",
                (following, followed),
            )
            .await?;
        if !applied(result) {
            return Ok(false);
        }
        self.session
            .query(
                "DELETE FROM followers WHERE followed_id = ? AND following_id = ?",
                (followed, following),
            )
            .await?;
        Ok(true)
    }

    async fn following(&self, user_id: Uuid) -> Result<Vec<FriendShip>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT following_id, followed_id, friendship_id, created_at FROM following WHERE following_id = ?",
                (user_id,),
            )
            .await?;
        rows(result)
            .iter()
            .map(|row| friendship_from_row(row, "following", true))
            .collect()
    }

    async fn followers(&self, user_id: Uuid) -> Result<Vec<FriendShip>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT followed_id, following_id, friendship_id, created_at FROM followers WHERE followed_id = ?",
                (user_id,),
            )
            .await?;
        rows(result)
            .iter()
            .map(|row| friendship_from_row(row, "followers", false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_survive_the_millisecond_conversion() {
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_000_000).unwrap();
        assert_eq!(from_cql(to_cql(at)), at);
    }

    #[test]
    fn decodes_text_and_null_text() {
        let row = Row {
            columns: vec![Some(CqlValue::Text("hello".to_string())), None],
        };
        assert_eq!(text_at(&row, 0, "tweets").unwrap(), "hello");
        assert_eq!(text_at(&row, 1, "tweets").unwrap(), "");
        assert!(uuid_at(&row, 0, "tweets").is_err());
    }

    #[test]
    fn reads_lwt_applied_flag() {
        let row = Row {
            columns: vec![Some(CqlValue::Boolean(false))],
        };
        assert!(!lwt_applied(&[row]));
        assert!(!lwt_applied(&[]));
        assert!(lwt_applied(&[Row {
            columns: vec![Some(CqlValue::Boolean(true)), None],
        }]));
    }

    async fn cluster_store() -> ScyllaStore {
        let config = crate::config::Config::load().unwrap();
        let session = crate::db::create_session(&config.scylla).await.unwrap();
        ScyllaStore::new(Arc::new(session))
    }

    fn account(username: &str) -> (User, Profile) {
        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: String::new(),
            password_hash: "x".to_string(),
            profile_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let profile = Profile {
            profile_id: user.profile_id,
            user_id: user.user_id,
            display_name: username.to_string(),
            bio: String::new(),
            updated_at: now,
        };
        (user, profile)
    }

    #[tokio::test]
    #[ignore = "needs a ScyllaDB node at SCYLLA_NODES"]
    async fn losing_signup_leaves_no_rows_behind() {
        let store = cluster_store().await;
        let username = format!("u{}", Uuid::new_v4().simple());
        let (winner, winner_profile) = account(&username);
        let (loser, loser_profile) = account(&username);

        store.insert_user(&winner, &winner_profile).await.unwrap();
        assert!(matches!(
            store.insert_user(&loser, &loser_profile).await,
            Err(StoreError::Conflict(_))
        ));

        let found = store.user_by_username(&username).await.unwrap().unwrap();
        assert_eq!(found.user_id, winner.user_id);
        assert!(store.user_by_id(loser.user_id).await.unwrap().is_none());
        assert!(store.profile(loser.profile_id).await.unwrap().is_none());
    }
}
