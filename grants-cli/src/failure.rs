//! Maps a failed command to what the user sees and the process exit code.
//!
//! | Kind         | Exit | Shown to the user                         |
//! |--------------|------|-------------------------------------------|
//! | `Validation` | 2    | the rejected input or configuration       |
//! | `Calculation`| 3    | the failed ratio, blamed on the grant data |
//! | `NotFound`   | 4    | the missing grant or calculation          |
//! | `Server`     | 1    | a generic message; detail goes to the log |

use anyhow::Error;
use grants_core::{ContributionError, RepositoryError};

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Calculation,
    NotFound,
    Server,
}

impl FailureKind {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Server => 1,
            Self::Validation => 2,
            Self::Calculation => 3,
            Self::NotFound => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

const SERVER_MESSAGE: &str =
    "the command failed unexpectedly; see the log output (--log-level debug) for details";

impl Failure {
    fn server() -> Self {
        Self {
            kind: FailureKind::Server,
            message: SERVER_MESSAGE.to_string(),
        }
    }
}

/// Classifies `err` by the first typed error found in its chain.
pub fn describe_failure(err: &Error) -> Failure {
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<ContributionError>() {
            return from_contribution_error(err);
        }
        if let Some(err) = cause.downcast_ref::<ConfigError>() {
            return Failure {
                kind: FailureKind::Validation,
                message: err.to_string(),
            };
        }
        if cause.downcast_ref::<RepositoryError>().is_some() {
            return Failure::server();
        }
    }
    Failure::server()
}

fn from_contribution_error(err: &ContributionError) -> Failure {
    match err.kind() {
        "validation" => Failure {
            kind: FailureKind::Validation,
            message: err.to_string(),
        },
        "calculation" => Failure {
            kind: FailureKind::Calculation,
            message: format!("{err}; the grant data may be incomplete"),
        },
        "not_found" => Failure {
            kind: FailureKind::NotFound,
            message: err.to_string(),
        },
        _ => Failure::server(),
    }
}
