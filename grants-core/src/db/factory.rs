use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::repository::{GrantRepository, RepositoryError};

/// Which store to open and how to reach it.
///
/// `backend` selects a registered [`RepositoryFactory`] by name and
/// `connection_string` is handed to it untouched.
///
/// | backend  | connection_string examples   |
/// |----------|------------------------------|
/// | `sqlite` | `grants.db`, `:memory:`      |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens repositories for one storage backend.
///
/// Backend crates export a unit struct implementing this trait, which the
/// binaries register with a [`RepositoryRegistry`] at startup.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name matched against [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Opens a ready-to-use repository. Implementations may run migrations
    /// here.
    async fn create(&self, config: &DbConfig)
    -> Result<Box<dyn GrantRepository>, RepositoryError>;
}

/// Backend factories keyed by name.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory, replacing any previous one with the same name.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a repository with the factory named by `config.backend`.
    ///
    /// # Errors
    /// * [`RepositoryError::Configuration`] if no such backend is registered.
    /// * Whatever the selected factory returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn GrantRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown backend '{}'; available: {:?}",
                config.backend,
                self.available_backends()
            )));
        };

        factory.create(config).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::{GacGrantFilter, GrantFilter, InsertOutcome};
    use crate::models::{
        GlobalAffairsGrant, Grant, NewGlobalAffairsGrant, NewGrant, NewTaxCalculation, TaxBracket,
        TaxCalculation, TaxYearConfig,
    };

    // Only routing is under test; every data method answers NotFound.
    struct StubRepository;

    #[async_trait]
    impl GrantRepository for StubRepository {
        async fn get_tax_year_config(&self, _year: i32) -> Result<TaxYearConfig, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
        async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn get_tax_brackets(
            &self,
            _tax_year: i32,
        ) -> Result<Vec<TaxBracket>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn insert_tax_bracket(&self, _bracket: &TaxBracket) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn delete_tax_brackets(&self, _tax_year: i32) -> Result<u64, RepositoryError> {
            Ok(0)
        }
        async fn replace_tax_brackets(
            &self,
            _tax_year: i32,
            _brackets: &[TaxBracket],
        ) -> Result<u64, RepositoryError> {
            Ok(0)
        }
        async fn insert_grant(&self, _grant: &NewGrant) -> Result<InsertOutcome, RepositoryError> {
            Ok(InsertOutcome::Inserted(1))
        }
        async fn get_grant(&self, _id: i64) -> Result<Grant, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
        async fn list_grants(&self, _filter: &GrantFilter) -> Result<Vec<Grant>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn all_grants(&self) -> Result<Vec<Grant>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn count_grants(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
        async fn delete_all_grants(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
        async fn set_notable(&self, _id: i64, _reason: &str) -> Result<(), RepositoryError> {
            Err(RepositoryError::NotFound)
        }
        async fn reset_notable_flags(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
        async fn insert_gac_grant(
            &self,
            _grant: &NewGlobalAffairsGrant,
        ) -> Result<InsertOutcome, RepositoryError> {
            Ok(InsertOutcome::Inserted(1))
        }
        async fn get_gac_grant(&self, _id: i64) -> Result<GlobalAffairsGrant, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
        async fn list_gac_grants(
            &self,
            _filter: &GacGrantFilter,
        ) -> Result<Vec<GlobalAffairsGrant>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn all_gac_grants(&self) -> Result<Vec<GlobalAffairsGrant>, RepositoryError> {
            Ok(Vec::new())
        }
        async fn delete_all_gac_grants(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
        async fn create_calculation(
            &self,
            _calc: NewTaxCalculation,
        ) -> Result<TaxCalculation, RepositoryError> {
            Err(RepositoryError::Database("read-only stub".to_string()))
        }
        async fn get_calculation(&self, _id: i64) -> Result<TaxCalculation, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
        async fn latest_calculation_for_session(
            &self,
            _session_key: &str,
        ) -> Result<TaxCalculation, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
    }

    /// Records whether `create` ran.
    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RepositoryFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }
        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn GrantRepository>, RepositoryError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Box::new(StubRepository))
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl RepositoryFactory for FailingFactory {
        fn backend_name(&self) -> &'static str {
            "failing"
        }
        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn GrantRepository>, RepositoryError> {
            Err(RepositoryError::Connection("refused".to_string()))
        }
    }

    fn stub_factory(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        let factory = StubFactory {
            name,
            called: flag.clone(),
        };
        (Box::new(factory), flag)
    }

    fn config_for(backend: &str) -> DbConfig {
        DbConfig {
            backend: backend.to_string(),
            connection_string: ":memory:".to_string(),
        }
    }

    // ===== DbConfig tests =====

    #[test]
    fn db_config_defaults_to_in_memory_sqlite() {
        let config = DbConfig::default();

        assert_eq!(config, config_for("sqlite"));
    }

    // ===== registration tests =====

    #[test]
    fn empty_registry_lists_nothing() {
        assert!(RepositoryRegistry::new().available_backends().is_empty());
    }

    #[test]
    fn backends_are_listed_alphabetically() {
        let mut registry = RepositoryRegistry::new();
        registry.register(stub_factory("sqlite").0);
        registry.register(stub_factory("postgres").0);

        assert_eq!(registry.available_backends(), vec!["postgres", "sqlite"]);
    }

    #[test]
    fn registering_same_name_twice_keeps_one_entry() {
        let mut registry = RepositoryRegistry::new();
        registry.register(stub_factory("sqlite").0);
        registry.register(stub_factory("sqlite").0);

        assert_eq!(registry.available_backends(), vec!["sqlite"]);
    }

    // ===== create tests =====

    #[tokio::test]
    async fn create_routes_to_named_factory_only() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, sqlite_called) = stub_factory("sqlite");
        let (postgres, postgres_called) = stub_factory("postgres");
        registry.register(sqlite);
        registry.register(postgres);

        let repo = registry.create(&config_for("sqlite")).await;

        assert!(repo.is_ok());
        assert!(sqlite_called.load(Ordering::SeqCst));
        assert!(!postgres_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn created_repository_is_usable() {
        let mut registry = RepositoryRegistry::new();
        registry.register(stub_factory("sqlite").0);

        let repo = registry.create(&config_for("sqlite")).await.unwrap();

        assert_eq!(repo.count_grants().await, Ok(0));
    }

    #[tokio::test]
    async fn unknown_backend_names_requested_and_available() {
        let mut registry = RepositoryRegistry::new();
        registry.register(stub_factory("sqlite").0);

        match registry.create(&config_for("postgres")).await {
            Err(RepositoryError::Configuration(msg)) => {
                assert!(msg.contains("postgres"));
                assert!(msg.contains("sqlite"));
            }
            Err(other) => panic!("expected Configuration error, got {other:?}"),
            Ok(_) => panic!("expected Configuration error, got a repository"),
        }
    }

    #[tokio::test]
    async fn factory_errors_are_propagated() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(FailingFactory));

        let result = registry.create(&config_for("failing")).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Connection(msg)) if msg == "refused"
        ));
    }
}
