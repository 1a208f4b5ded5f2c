use std::sync::Arc;

use log::info;
use scylla::transport::errors::{NewSessionError, QueryError};
use scylla::{Session, SessionBuilder};
use thiserror::Error;

use crate::config::{ScyllaConfig, StoreKind};
use crate::store::{MemoryStore, ScyllaStore, Store};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to connect to ScyllaDB: {0}")]
    Connect(#[from] NewSessionError),

    #[error("schema setup failed: {0}")]
    Schema(#[from] QueryError),
}

/// Connect, make sure the schema exists and bind the session to the keyspace.
pub async fn create_session(config: &ScyllaConfig) -> Result<Session, DbError> {
    let mut builder = SessionBuilder::new();
    for node in &config.nodes {
        builder = builder.known_node(node);
    }
    let session = builder.build().await?;

    create_schema(&session, &config.keyspace, config.replication_factor).await?;
    session.use_keyspace(&config.keyspace, false).await?;

    Ok(session)
}

/// Build the store selected by configuration.
pub async fn open_store(kind: StoreKind, config: &ScyllaConfig) -> Result<Arc<dyn Store>, DbError> {
    match kind {
        StoreKind::Scylla => {
            let session = create_session(config).await?;
            info!("Connected to ScyllaDB keyspace {}", config.keyspace);
            Ok(Arc::new(ScyllaStore::new(Arc::new(session))))
        }
        StoreKind::Memory => {
            info!("Using in-memory store, data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Primary keys carry the uniqueness rules: one row per username, per
/// (tweet, liker) and per (follower, followed).
const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS {ks}.users (
        user_id uuid PRIMARY KEY,
        username text,
        email text,
        password_hash text,
        profile_id uuid,
        created_at timestamp,
        updated_at timestamp
    )",
    "CREATE TABLE IF NOT EXISTS {ks}.users_by_username (
        username text PRIMARY KEY,
        user_id uuid
    )",
    "CREATE TABLE IF NOT EXISTS {ks}.profiles (
        profile_id uuid PRIMARY KEY,
        user_id uuid,
        display_name text,
        bio text,
        updated_at timestamp
    )",
    "CREATE TABLE IF NOT EXISTS {ks}.tweets (
        tweet_id uuid PRIMARY KEY,
        user_id uuid,
        content text,
        created_at timestamp
    )",
    "CREATE TABLE IF NOT EXISTS {ks}.user_timeline (
        user_id uuid,
        created_at timestamp,
        tweet_id uuid,
        PRIMARY KEY (user_id, created_at, tweet_id)
    ) WITH CLUSTERING ORDER BY (created_at DESC, tweet_id ASC)",
    "CREATE TABLE IF NOT EXISTS {ks}.likes (
        tweet_id uuid,
        user_id uuid,
        like_id uuid,
        created_at timestamp,
        PRIMARY KEY (tweet_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS {ks}.likes_by_user (
        user_id uuid,
        tweet_id uuid,
        PRIMARY KEY (user_id, tweet_id)
    )",
    "CREATE TABLE IF NOT EXISTS {ks}.following (
        following_id uuid,
        followed_id uuid,
        friendship_id uuid,
        created_at timestamp,
        PRIMARY KEY (following_id, followed_id)
    )",
    "CREATE TABLE IF NOT EXISTS {ks}.followers (
        followed_id uuid,
        following_id uuid,
        friendship_id uuid,
        created_at timestamp,
        PRIMARY KEY (followed_id, following_id)
    )",
];

pub async fn create_schema(
    session: &Session,
    keyspace: &str,
    replication_factor: u32,
) -> Result<(), QueryError> {
    session
        .query(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
            ),
            (),
        )
        .await?;

    for table in TABLES {
        session.query(table.replace("{ks}", keyspace), ()).await?;
    }

    info!("Schema ready in keyspace {}", keyspace);
    Ok(())
}
