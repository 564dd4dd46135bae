use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::{DatabaseConfig, DbResult};

/// Writers wait up to the connect timeout for a competing transaction
/// instead of failing with `SQLITE_BUSY`.
pub fn connect_options(config: &DatabaseConfig) -> DbResult<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.connect_timeout_seconds));
    Ok(options)
}

/// In-memory databases live only as long as their connection and every
/// connection opens its own, so the pool holds exactly one and never
/// recycles it.
pub fn pool_options(config: &DatabaseConfig) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds));

    if is_memory(&config.database_url) {
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options
    }
}

pub fn is_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Strips query parameters so credentials or options never reach the logs.
pub fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
