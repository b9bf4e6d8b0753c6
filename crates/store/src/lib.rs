//! Persistent local cache of monitors and groups.
//!
//! [`LocalStore`] is the service object the rest of the console talks to.
//! It owns a lazily-opened SQLite pool with two collections (`groups` and
//! `devices`), degrades to a no-op when no storage location is configured,
//! and publishes locally-originated group mutations on a change feed so the
//! sync channel can relay them to other clients.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub mod changes;
pub mod error;
pub mod repositories;
pub mod store;

pub use changes::GroupChange;
pub use error::StoreError;
pub use store::{LocalStore, StoreConfig};

pub type DbPool = sqlx::SqlitePool;

/// Create a connection pool from a SQLite URL, creating the file if absent.
///
/// In-memory databases are pinned to a single long-lived connection, since
/// every SQLite connection to `:memory:` opens a separate database.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };

    pool_options.connect_with(options).await
}

/// Apply the embedded schema migrations (version-tagged).
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

