use thiserror::Error;

use crate::http::HttpMethod;

pub type Result<T> = std::result::Result<T, RoutecraftError>;

/// Load-time failures. Any of these must abort startup: a route that silently
/// fails to register is worse than a crash.
#[derive(Debug, Error)]
pub enum RoutecraftError {
    #[error("No route declared for {owner}::{method}")]
    MissingRoute { owner: String, method: String },

    #[error("No HTTP method declared for {owner}::{method}")]
    MissingHttpMethod { owner: String, method: String },

    #[error("Handler {owner}::{method} has no declarations")]
    UndeclaredHandler { owner: String, method: String },

    #[error("Declarations target {owner}::{method}, which is not a handler of that type")]
    UnknownHandler { owner: String, method: String },

    #[error("Handler {owner}::{method} is asynchronous but not marked with async_handler")]
    UnmarkedAsyncHandler { owner: String, method: String },

    #[error("Route {method} {path} is registered more than once")]
    DuplicateRoute { method: HttpMethod, path: String },

    #[error("Route {path} conflicts with {existing}: parameter names differ on the same path shape")]
    ConflictingRoute { path: String, existing: String },

    #[error("Invalid configuration value for {key}: {message}")]
    Config { key: String, message: String },
}

impl RoutecraftError {
    pub(crate) fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }
}
