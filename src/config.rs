use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::rating::CommitMode;
use crate::session::CleanupConfig;
use crate::shared::PlayerId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string; in-memory stores are used when absent
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub admin_ids: HashSet<PlayerId>,
    pub command_prefix: String,
    pub commit_mode: CommitMode,
    /// Idle-session expiry; sessions never expire when `None`
    pub cleanup: Option<CleanupConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let admin_ids = match var("ELOBOT_ADMIN_IDS") {
            Some(raw) => raw
                .split(',')
                .filter(|id| !id.trim().is_empty())
                .map(|id| {
                    id.parse::<PlayerId>().map_err(|_| ConfigError::InvalidValue {
                        name: "ELOBOT_ADMIN_IDS",
                        value: id.to_string(),
                    })
                })
                .collect::<Result<HashSet<_>, _>>()?,
            None => HashSet::new(),
        };

        let commit_mode = match var("ELOBOT_COMMIT_MODE") {
            Some(raw) => raw
                .trim()
                .parse::<CommitMode>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "ELOBOT_COMMIT_MODE",
                    value: raw,
                })?,
            None => CommitMode::default(),
        };

        let cleanup = match var("ELOBOT_SESSION_IDLE_SECS") {
            Some(raw) => {
                let idle = parse_secs("ELOBOT_SESSION_IDLE_SECS", &raw)?;
                let mut config = CleanupConfig {
                    inactivity_threshold: idle,
                    ..CleanupConfig::default()
                };
                if let Some(raw) = var("ELOBOT_CLEANUP_INTERVAL_SECS") {
                    config.cleanup_interval = parse_secs("ELOBOT_CLEANUP_INTERVAL_SECS", &raw)?;
                }
                Some(config)
            }
            None => None,
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            bind_addr: var("ELOBOT_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            admin_ids,
            command_prefix: var("ELOBOT_COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()),
            commit_mode,
            cleanup,
        })
    }
}

fn parse_secs(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}
