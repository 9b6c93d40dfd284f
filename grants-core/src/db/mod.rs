pub mod factory;
pub mod filter;
pub mod repository;

pub use factory::{DbConfig, RepositoryFactory, RepositoryRegistry};
pub use filter::{DEFAULT_SEARCH_LIMIT, GacGrantFilter, GrantFilter, GrantSort, MAX_SEARCH_LIMIT};
pub use repository::{GrantRepository, InsertOutcome, RepositoryError};
