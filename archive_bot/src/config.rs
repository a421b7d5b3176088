use std::env;
use std::time::Duration;

use archive_core::cache::recency::DEFAULT_USER_CACHE_SIZE;
use archive_core::helpers::dto::UploaderPrivacy;
use archive_core::upload::SweeperConfig;
use archive_core::upload::UserId;
use archive_core::{ArchiveError, ArchiveResult};

const DEFAULT_DB_PATH: &str = "archive_db";

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: String,
    pub user_cache_size: usize,
    pub sweeper: SweeperConfig,
    pub privacy: UploaderPrivacy,
    pub admin_user_ids: Vec<UserId>,
}

impl Config {
    /// Read settings from the environment. `TELOXIDE_TOKEN` is read by `Bot::from_env`.
    pub fn from_env() -> ArchiveResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ArchiveResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SweeperConfig::default();

        let user_cache_size = parse_or("USER_CACHE_SIZE", &lookup, DEFAULT_USER_CACHE_SIZE as i64)?;
        if user_cache_size <= 0 {
            return Err(ArchiveError::InvalidConfiguration(format!(
                "USER_CACHE_SIZE must be positive, got {}",
                user_cache_size
            )));
        }

        let ttl_secs = parse_or("UPLOAD_SESSION_TTL_SECS", &lookup, defaults.max_age.as_secs())?;
        let interval_secs = parse_or("UPLOAD_SWEEP_INTERVAL_SECS", &lookup, defaults.interval.as_secs())?;
        if interval_secs == 0 {
            return Err(ArchiveError::InvalidConfiguration(
                "UPLOAD_SWEEP_INTERVAL_SECS must be positive".to_string(),
            ));
        }

        let admin_user_ids = match lookup("ADMIN_USER_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| {
                    id.parse::<UserId>().map_err(|_| {
                        ArchiveError::InvalidConfiguration(format!("invalid admin user id: {}", id))
                    })
                })
                .collect::<ArchiveResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            db_path: lookup("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            user_cache_size: user_cache_size as usize,
            sweeper: SweeperConfig {
                interval: Duration::from_secs(interval_secs),
                max_age: Duration::from_secs(ttl_secs),
            },
            privacy: UploaderPrivacy::from_setting(lookup("UPLOADER_PRIVACY").as_deref()),
            admin_user_ids,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> ArchiveResult<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ArchiveError::InvalidConfiguration(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}
