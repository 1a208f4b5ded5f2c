use std::{env, fmt::Display, str::FromStr};

use actix_web::cookie::Key;
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Scylla,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scylla" => Ok(StoreKind::Scylla),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store {other}, expected scylla or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub nodes: Vec<String>,
    pub keyspace: String,
    pub replication_factor: u32,
}

pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub workers: usize,
    pub store: StoreKind,
    pub scylla: ScyllaConfig,
    pub bcrypt_cost: u32,
    pub session_key: Key,
    pub cookie_secure: bool,
}

const MIN_SESSION_KEY_LEN: usize = 64;

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let nodes: String = try_load(&lookup, "SCYLLA_NODES", "127.0.0.1:9042")?;
        let keyspace: String = try_load(&lookup, "SCYLLA_KEYSPACE", "twitter_clone")?;
        if keyspace.is_empty() || !keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Invalid {
                key: "SCYLLA_KEYSPACE",
                value: keyspace,
                reason: "keyspace names are letters, digits and underscores".to_string(),
            });
        }

        let bcrypt_cost: u32 =
            try_load(&lookup, "BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: "bcrypt cost must be between 4 and 31".to_string(),
            });
        }

        Ok(Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", "127.0.0.1")?,
            port: try_load(&lookup, "PORT", "8080")?,
            workers: try_load(&lookup, "WORKERS", &num_cpus::get().to_string())?,
            store: try_load(&lookup, "STORE", "scylla")?,
            scylla: ScyllaConfig {
                nodes: nodes
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(String::from)
                    .collect(),
                keyspace,
                replication_factor: try_load(&lookup, "SCYLLA_REPLICATION", "1")?,
            },
            bcrypt_cost,
            session_key: session_key(lookup("SESSION_KEY"))?,
            cookie_secure: try_load(&lookup, "COOKIE_SECURE", "false")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }
    })
}

fn session_key(raw: Option<String>) -> Result<Key, ConfigError> {
    match raw {
        Some(raw) if raw.len() >= MIN_SESSION_KEY_LEN => Ok(Key::derive_from(raw.as_bytes())),
        Some(raw) => Err(ConfigError::Invalid {
            key: "SESSION_KEY",
            value: "<redacted>".to_string(),
            reason: format!(
                "must be at least {MIN_SESSION_KEY_LEN} bytes, got {}",
                raw.len()
            ),
        }),
        None => {
            warn!("SESSION_KEY not set, sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreKind::Scylla);
        assert_eq!(config.scylla.nodes, vec!["127.0.0.1:9042".to_string()]);
        assert_eq!(config.scylla.keyspace, "twitter_clone");
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn parses_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("STORE", "memory"),
            ("SCYLLA_NODES", "10.0.0.1:9042, 10.0.0.2:9042"),
            ("BCRYPT_COST", "4"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.scylla.nodes.len(), 2);
        assert_eq!(config.bcrypt_cost, 4);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("STORE", "postgres")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SESSION_KEY", "short")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SCYLLA_KEYSPACE", "a-b")])).is_err());
        assert!(Config::from_lookup(lookup(&[("BCRYPT_COST", "2")])).is_err());
    }
}
