//! Configuration management
//!
//! Read from the environment (and `.env` through dotenvy):
//!
//! | Variable | Default |
//! |---|---|
//! | `DATABASE_URL` | `postgresql://localhost/scalelink` |
//! | `DATABASE_MAX_CONNECTIONS` | 5 |
//! | `DATABASE_CONNECT_TIMEOUT` | 10 (seconds) |
//! | `SCALELINK_LOCAL_FOLDER` | OS temp dir |
//! | `SCALELINK_EXCLUDED_GROUP_ID` | 7 |
//! | `SCALELINK_IMAGE_SIZE` | 120 |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::delivery::image::DEFAULT_IMAGE_SIZE;
use crate::delivery::keymap::{SlotQuery, DEFAULT_EXCLUDED_GROUP_ID};
use crate::delivery::{DeliverySettings, PushSettings};

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/scalelink";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Local side of deliveries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Temporary files are written here before upload
    pub local_folder: PathBuf,
    /// Scale group left out of the key map
    pub excluded_group_id: i64,
    pub image_size: u32,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_vars(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            var(key).and_then(|s| s.trim().parse().ok())
        }

        Config {
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections: parsed(&var, "DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: parsed(&var, "DATABASE_CONNECT_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            delivery: DeliveryConfig {
                local_folder: var("SCALELINK_LOCAL_FOLDER")
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(std::env::temp_dir),
                excluded_group_id: parsed(&var, "SCALELINK_EXCLUDED_GROUP_ID")
                    .unwrap_or(DEFAULT_EXCLUDED_GROUP_ID),
                image_size: parsed(&var, "SCALELINK_IMAGE_SIZE").unwrap_or(DEFAULT_IMAGE_SIZE),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.delivery.image_size == 0 {
            anyhow::bail!("Image size must be greater than 0");
        }

        if !self.delivery.local_folder.is_dir() {
            tracing::warn!(
                "Local folder {} does not exist - uploads will fail",
                self.delivery.local_folder.display()
            );
        }

        Ok(())
    }

    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            push: PushSettings {
                local_folder: self.delivery.local_folder.clone(),
                image_size: self.delivery.image_size,
            },
            slot_query: SlotQuery {
                excluded_group_id: self.delivery.excluded_group_id,
                ..SlotQuery::default()
            },
        }
    }
}
