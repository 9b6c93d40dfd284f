pub mod calculations;
pub mod db;
pub mod flagging;
pub mod models;
pub mod service;
pub mod stats;

pub use db::repository::{GrantRepository, InsertOutcome, RepositoryError};
pub use models::*;
pub use service::{ContributionError, ContributionService, load_allocation_config};
