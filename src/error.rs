use thiserror::Error;

use crate::{
    domain::locator::LocatorKey,
    services::{browser::BrowserError, search_provider::SearchError},
};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("required element {0} not found")]
    ElementNotFound(LocatorKey),
    #[error("session looks logged out: {0}")]
    AuthenticationStale(String),
    #[error("not a profile url: {0}")]
    InvalidProfileUrl(String),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("session could not be re-established after {0} login attempts")]
    RetryBudgetExhausted(u32),
}

impl ScrapeError {
    /// Errors that are answered by logging in again and retrying the action.
    pub fn requires_relogin(&self) -> bool {
        matches!(
            self,
            ScrapeError::AuthenticationStale(_) | ScrapeError::Browser(_)
        )
    }

    /// Errors that abort the whole batch rather than one candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::Store(_) | ScrapeError::RetryBudgetExhausted(_)
        )
    }
}
