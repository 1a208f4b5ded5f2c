use std::error::Error;

use env_logger::{Builder, Env};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use log::{info, warn};
use uuid::Uuid;

use twitter_web::config::Config;
use twitter_web::db;
use twitter_web::error::AppError;
use twitter_web::models::{SignupForm, User};
use twitter_web::service::{Service, MAX_TWEET_CHARS};

const SEED_PASSWORD: &str = "password123";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    info!("Starting data seeding...");

    let config = Config::load()?;
    let store = db::open_store(config.store, &config.scylla).await?;
    let service = Service::new(store, config.bcrypt_cost);

    let num_users = 100;
    let tweets_per_user = 20;

    let users = seed_users(&service, num_users).await?;
    let tweet_ids = seed_tweets(&service, &users, tweets_per_user).await?;
    seed_relationships(&service, &users, &tweet_ids).await?;

    info!("Seeding completed! Every account uses the password {SEED_PASSWORD:?}");
    Ok(())
}

async fn seed_users(service: &Service, count: usize) -> Result<Vec<User>, AppError> {
    info!("Creating {} users...", count);
    let mut users = Vec::new();

    while users.len() < count {
        let form = SignupForm {
            username: Username().fake(),
            email: SafeEmail().fake(),
            password1: SEED_PASSWORD.to_string(),
            password2: SEED_PASSWORD.to_string(),
        };
        match service.signup(&form).await {
            Ok(user) => {
                info!(
                    "Created user {}/{}: {} ({})",
                    users.len() + 1,
                    count,
                    user.username,
                    user.user_id
                );
                users.push(user);
            }
            Err(AppError::Validation(e)) => warn!("Skipping {}: {}", form.username, e),
            Err(e) => return Err(e),
        }
    }

    Ok(users)
}

async fn seed_tweets(
    service: &Service,
    users: &[User],
    tweets_per_user: usize,
) -> Result<Vec<Uuid>, AppError> {
    info!("Creating {} tweets per user...", tweets_per_user);
    let total_tweets = users.len() * tweets_per_user;
    let mut tweet_ids = Vec::with_capacity(total_tweets);

    for user in users {
        for _ in 0..tweets_per_user {
            let content: String = Sentence(3..10).fake();
            let content: String = content.chars().take(MAX_TWEET_CHARS).collect();
            tweet_ids.push(service.create_tweet(user.user_id, &content).await?);

            if tweet_ids.len() % 100 == 0 {
                info!("Created {}/{} tweets", tweet_ids.len(), total_tweets);
            }
        }
    }

    Ok(tweet_ids)
}

/// Each user follows a handful of others and likes a handful of tweets.
async fn seed_relationships(
    service: &Service,
    users: &[User],
    tweet_ids: &[Uuid],
) -> Result<(), AppError> {
    if users.len() < 2 || tweet_ids.is_empty() {
        return Ok(());
    }
    let mut follows = 0;
    let mut likes = 0;

    for user in users {
        for _ in 0..(0..10).fake::<usize>() {
            let target = &users[(0..users.len()).fake::<usize>()];
            match service.follow(user.user_id, &target.username).await {
                Ok(_) => follows += 1,
                Err(AppError::Validation(_)) => {}
                Err(e) => return Err(e),
            }
        }
        for _ in 0..(0..20).fake::<usize>() {
            let tweet_id = tweet_ids[(0..tweet_ids.len()).fake::<usize>()];
            service.like(tweet_id, user.user_id).await?;
            likes += 1;
        }
    }

    info!("Created {} follows and {} like requests", follows, likes);
    Ok(())
}
