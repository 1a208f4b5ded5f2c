use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display attributes of a user, one per account.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub bio: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tweet {
    pub tweet_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Like {
    pub like_id: Uuid,
    pub tweet_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Directed follow edge: `following` is the actor, `followed` the target.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendShip {
    pub friendship_id: Uuid,
    pub following: Uuid,
    pub followed: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigninForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTweetForm {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEditForm {
    pub display_name: String,
    pub bio: String,
}

/// A tweet joined with its author.
#[derive(Debug, Clone)]
pub struct TweetView {
    pub tweet: Tweet,
    pub author: User,
}

#[derive(Debug, Clone)]
pub struct FeedItem {
    pub tweet: Tweet,
    pub author: User,
    pub liked: bool,
}

#[derive(Debug, Clone)]
pub struct HomeFeed {
    pub viewer: User,
    pub items: Vec<FeedItem>,
    pub following: Vec<User>,
}

/// A follow edge joined with the user on the other side of it.
#[derive(Debug, Clone)]
pub struct FriendView {
    pub friendship: FriendShip,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub profile: Profile,
    pub owner: User,
    pub tweets: Vec<TweetView>,
    pub following_count: usize,
    pub follower_count: usize,
    pub viewer_follows: bool,
    pub is_own: bool,
}
