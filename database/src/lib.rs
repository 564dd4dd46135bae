// Storage layer for the knowledge graph: SQLite pool, embedded migrations
// and repositories for entities, relationships and users.

pub mod config;
pub mod error;
pub mod repositories;
pub mod utils;

pub use error::{DbError, DbResult};
pub use kgviz_config::DatabaseConfig;
pub use repositories::{EntityRepository, RelationshipRepository, UserRepository};
pub use sqlx;

use sqlx::{Sqlite, SqlitePool, Transaction};

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let options = config::connect_options(config)?;
        let pool = config::pool_options(config).connect_with(options).await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to {}",
            config::redact(&config.database_url)
        );
        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied.
    pub async fn in_memory() -> DbResult<Self> {
        let db = Self::connect(&DatabaseConfig::in_memory()).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
