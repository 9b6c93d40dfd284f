//! The `grants` command-line front end.
//!
//! | Module    | Purpose                                              |
//! |-----------|------------------------------------------------------|
//! | `app`     | command handlers over a [`grants_core::GrantRepository`] |
//! | `config`  | `grants.toml` loading and command-line overrides     |
//! | `failure` | error kinds, user-facing messages and exit codes     |
//! | `logging` | tracing subscriber with a reloadable filter and file sink |
//! | `render`  | plain-text output                                    |
//! | `utils`   | amount parsing and percentage formatting             |

pub mod app;
pub mod config;
pub mod failure;
pub mod logging;
pub mod render;
pub mod utils;
