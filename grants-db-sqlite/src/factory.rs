use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use grants_core::db::repository::{GrantRepository, RepositoryError};
use grants_core::db::{DbConfig, RepositoryFactory};

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. **`GRANTS_DB_SQLITE_SEEDS_DIR`**, if set.
/// 2. **`./seeds`**, if the directory exists in the current working directory.
/// 3. **`$CARGO_MANIFEST_DIR/seeds`** as last resort (dev/tests run from the
///    build tree).
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("GRANTS_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// Maps a [`DbConfig::connection_string`] to a sqlx URL.
///
/// * `":memory:"` opens an in-memory database.
/// * Anything already starting with `sqlite:` is passed through.
/// * A bare file path is opened read-write and created if missing.
pub(crate) fn database_url(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        "sqlite::memory:".to_string()
    } else if connection_string.starts_with("sqlite:") {
        connection_string.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", connection_string)
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`grants_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use grants_core::db::RepositoryRegistry;
/// use grants_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens the database, applies migrations, then loads the seed files
    /// (tax year configuration and default brackets).
    ///
    /// For packaged distribution, set `GRANTS_DB_SQLITE_SEEDS_DIR` or run
    /// with a `seeds` directory in the current working directory.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn GrantRepository>, RepositoryError> {
        let url = database_url(&config.connection_string);
        let repo = SqliteRepository::new(&url)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{:#}", e)))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;

        let seeds = seeds_dir();
        repo.run_seeds(&seeds)
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;

        info!(url = %url, seeds = %seeds.display(), "opened sqlite repository");
        Ok(Box::new(repo))
    }
}
