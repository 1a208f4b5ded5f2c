//! Account, tweet, like and follow operations.
//!
//! Handlers stay thin: every rule about who may do what lives here, and every
//! uniqueness decision is taken by the [`Store`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, ValidationError};
use crate::models::{
    FeedItem, FriendShip, FriendView, HomeFeed, Like, Profile, ProfileEditForm, ProfilePage,
    SignupForm, Tweet, TweetView, User,
};
use crate::store::{Store, StoreError};

pub const MAX_TWEET_CHARS: usize = 140;
pub const MAX_USERNAME_CHARS: usize = 150;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;
pub const MAX_BIO_CHARS: usize = 160;

/// First path segments the router already owns; a user named like one of
/// these could never be followed.
const RESERVED_USERNAMES: &[&str] = &[
    "home", "signup", "signin", "signout", "profile", "tweets", "static",
];

#[derive(Clone)]
pub struct Service {
    store: Arc<dyn Store>,
    bcrypt_cost: u32,
}

impl Service {
    pub fn new(store: Arc<dyn Store>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    // Accounts

    pub async fn signup(&self, form: &SignupForm) -> Result<User, AppError> {
        let username = form.username.trim();
        validate_username(username)?;
        let email = form.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            return Err(ValidationError::InvalidEmail.into());
        }
        if form.password1 != form.password2 {
            return Err(ValidationError::PasswordMismatch.into());
        }
        if form.password1.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_CHARS,
            }
            .into());
        }

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(&form.password1, self.bcrypt_cost)?,
            profile_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let profile = Profile {
            profile_id: user.profile_id,
            user_id: user.user_id,
            display_name: user.username.clone(),
            bio: String::new(),
            updated_at: now,
        };

        match self.store.insert_user(&user, &profile).await {
            Ok(()) => {
                info!("User created: {} ({})", user.username, user.user_id);
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => {
                debug!("Signup rejected, username taken: {}", user.username);
                Err(ValidationError::UsernameTaken(user.username).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .store
            .user_by_username(username.trim())
            .await?
            .ok_or(AppError::Authentication)?;
        if !verify_password(password, &user.password_hash)? {
            warn!("Failed sign-in for {}", user.username);
            return Err(AppError::Authentication);
        }
        Ok(user)
    }

    pub async fn user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<User, AppError> {
        self.store
            .user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {username}")))
    }

    // Tweets

    pub async fn create_tweet(&self, author: Uuid, content: &str) -> Result<Uuid, AppError> {
        let content = content.trim();
        let length = content.chars().count();
        if length == 0 || length > MAX_TWEET_CHARS {
            return Err(ValidationError::ContentLength {
                max: MAX_TWEET_CHARS,
            }
            .into());
        }

        let tweet = Tweet {
            tweet_id: Uuid::new_v4(),
            user_id: author,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_tweet(&tweet).await?;
        info!("Tweet created successfully: {}", tweet.tweet_id);
        Ok(tweet.tweet_id)
    }

    pub async fn tweet(&self, tweet_id: Uuid) -> Result<Tweet, AppError> {
        self.store
            .tweet(tweet_id)
            .await?
            .ok_or_else(|| AppError::not_found("Tweet"))
    }

    pub async fn tweet_detail(&self, tweet_id: Uuid) -> Result<TweetView, AppError> {
        let tweet = self.tweet(tweet_id).await?;
        let author = self.user(tweet.user_id).await?;
        Ok(TweetView { tweet, author })
    }

    /// Fetch a tweet only if `requester` wrote it.
    pub async fn owned_tweet(&self, tweet_id: Uuid, requester: Uuid) -> Result<Tweet, AppError> {
        let tweet = self.tweet(tweet_id).await?;
        if tweet.user_id != requester {
            warn!("User {} may not modify tweet {}", requester, tweet_id);
            return Err(AppError::Forbidden);
        }
        Ok(tweet)
    }

    pub async fn delete_tweet(&self, tweet_id: Uuid, requester: Uuid) -> Result<(), AppError> {
        let tweet = self.owned_tweet(tweet_id, requester).await?;
        self.store.delete_tweet(&tweet).await?;
        info!("Tweet deleted: {}", tweet_id);
        Ok(())
    }

    // Likes

    /// Liking twice leaves a single like in place.
    pub async fn like(&self, tweet_id: Uuid, requester: Uuid) -> Result<(), AppError> {
        self.tweet(tweet_id).await?;
        let like = Like {
            like_id: Uuid::new_v4(),
            tweet_id,
            user_id: requester,
            created_at: Utc::now(),
        };
        if self.store.insert_like(&like).await? {
            debug!("User {} liked tweet {}", requester, tweet_id);
        } else {
            debug!("User {} already likes tweet {}", requester, tweet_id);
        }
        Ok(())
    }

    pub async fn unlike(&self, tweet_id: Uuid, requester: Uuid) -> Result<(), AppError> {
        self.store.delete_like(tweet_id, requester).await?;
        debug!("User {} unliked tweet {}", requester, tweet_id);
        Ok(())
    }

    pub async fn has_liked(&self, tweet_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.store.liked_tweet_ids(user_id).await?.contains(&tweet_id))
    }

    // Follow relationship

    pub async fn follow(&self, actor: Uuid, target_username: &str) -> Result<User, AppError> {
        let target = self.user_by_username(target_username).await?;
        if target.user_id == actor {
            return Err(ValidationError::SelfFollow.into());
        }

        let friendship = FriendShip {
            friendship_id: Uuid::new_v4(),
            following: actor,
            followed: target.user_id,
            created_at: Utc::now(),
        };
        if !self.store.insert_friendship(&friendship).await? {
            return Err(ValidationError::AlreadyFollowing(target.username).into());
        }
        info!("User {} now follows {}", actor, target.username);
        Ok(target)
    }

    pub async fn unfollow(&self, actor: Uuid, target_username: &str) -> Result<User, AppError> {
        let target = self.user_by_username(target_username).await?;
        if target.user_id == actor {
            return Err(ValidationError::SelfUnfollow.into());
        }
        if !self.store.delete_friendship(actor, target.user_id).await? {
            return Err(ValidationError::NotFollowing.into());
        }
        info!("User {} unfollowed {}", actor, target.username);
        Ok(target)
    }

    /// Who `username` follows.
    pub async fn following_list(&self, username: &str) -> Result<(User, Vec<FriendView>), AppError> {
        let user = self.user_by_username(username).await?;
        let edges = self.store.following(user.user_id).await?;
        let views = self.friend_views(edges, |f| f.followed).await?;
        Ok((user, views))
    }

    /// Who follows `username`.
    pub async fn follower_list(&self, username: &str) -> Result<(User, Vec<FriendView>), AppError> {
        let user = self.user_by_username(username).await?;
        let edges = self.store.followers(user.user_id).await?;
        let views = self.friend_views(edges, |f| f.following).await?;
        Ok((user, views))
    }

    async fn friend_views(
        &self,
        edges: Vec<FriendShip>,
        counterpart: impl Fn(&FriendShip) -> Uuid,
    ) -> Result<Vec<FriendView>, AppError> {
        let ids: Vec<Uuid> = edges.iter().map(&counterpart).collect();
        let users = self.users_by_id(&ids).await?;
        Ok(edges
            .into_iter()
            .filter_map(|friendship| {
                users.get(&counterpart(&friendship)).cloned().map(|user| FriendView {
                    friendship,
                    user,
                })
            })
            .collect())
    }

    async fn users_by_id(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, AppError> {
        let unique: HashSet<Uuid> = ids.iter().copied().collect();
        let users = try_join_all(unique.into_iter().map(|id| self.store.user_by_id(id))).await?;
        Ok(users
            .into_iter()
            .flatten()
            .map(|user| (user.user_id, user))
            .collect())
    }

    // Pages

    /// Every tweet, newest first, marked with whether `viewer` likes it.
    pub async fn home(&self, viewer: User) -> Result<HomeFeed, AppError> {
        let tweets = self.store.tweets().await?;
        let liked = self.store.liked_tweet_ids(viewer.user_id).await?;

        let author_ids: Vec<Uuid> = tweets.iter().map(|t| t.user_id).collect();
        let authors = self.users_by_id(&author_ids).await?;
        let items = tweets
            .into_iter()
            .filter_map(|tweet| {
                let author = authors.get(&tweet.user_id)?.clone();
                let liked = liked.contains(&tweet.tweet_id);
                Some(FeedItem {
                    tweet,
                    author,
                    liked,
                })
            })
            .collect();

        let edges = self.store.following(viewer.user_id).await?;
        let following = self
            .friend_views(edges, |f| f.followed)
            .await?
            .into_iter()
            .map(|view| view.user)
            .collect();

        Ok(HomeFeed {
            viewer,
            items,
            following,
        })
    }

    pub async fn profile_page(&self, profile_id: Uuid, viewer: Uuid) -> Result<ProfilePage, AppError> {
        let profile = self
            .store
            .profile(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))?;
        let owner = self.user(profile.user_id).await?;

        let tweets = self
            .store
            .tweets_by_user(owner.user_id)
            .await?
            .into_iter()
            .map(|tweet| TweetView {
                tweet,
                author: owner.clone(),
            })
            .collect();
        let following = self.store.following(owner.user_id).await?;
        let followers = self.store.followers(owner.user_id).await?;
        let viewer_follows = followers.iter().any(|f| f.following == viewer);

        Ok(ProfilePage {
            is_own: owner.user_id == viewer,
            profile,
            owner,
            tweets,
            following_count: following.len(),
            follower_count: followers.len(),
            viewer_follows,
        })
    }

    /// Fetch a profile only if `requester` owns it.
    pub async fn owned_profile(&self, profile_id: Uuid, requester: Uuid) -> Result<Profile, AppError> {
        let profile = self
            .store
            .profile(profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))?;
        if profile.user_id != requester {
            warn!("User {} may not edit profile {}", requester, profile_id);
            return Err(AppError::Forbidden);
        }
        Ok(profile)
    }

    pub async fn edit_profile(
        &self,
        requester: Uuid,
        profile_id: Uuid,
        form: &ProfileEditForm,
    ) -> Result<Profile, AppError> {
        let mut profile = self.owned_profile(profile_id, requester).await?;

        let display_name = form.display_name.trim();
        check_length("Display name", display_name, 1, MAX_DISPLAY_NAME_CHARS)?;
        let bio = form.bio.trim();
        check_length("Bio", bio, 0, MAX_BIO_CHARS)?;

        profile.display_name = display_name.to_string();
        profile.bio = bio.to_string();
        profile.updated_at = Utc::now();
        self.store.update_profile(&profile).await?;
        info!("Profile updated: {}", profile_id);
        Ok(profile)
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let length = username.chars().count();
    let allowed = |c: char| c.is_ascii_alphanumeric() || "@.+-_".contains(c);
    if length == 0
        || length > MAX_USERNAME_CHARS
        || !username.chars().all(allowed)
        || username.chars().all(|c| c == '.')
    {
        return Err(ValidationError::InvalidUsername);
    }
    if RESERVED_USERNAMES.contains(&username.to_ascii_lowercase().as_str()) {
        return Err(ValidationError::ReservedUsername(username.to_string()));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length < min || length > max {
        return Err(ValidationError::FieldLength { field, min, max });
    }
    Ok(())
}
