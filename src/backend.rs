//! What the storefront needs from the hosted data backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewSweet, Purchase, Sweet, SweetPatch, UserProfile};

/// A failed backend call. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Transport failure before any response arrived.
    #[error("{0}")]
    Network(String),
    /// The backend answered with an error status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("not signed in")]
    SignedOut,
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::SignedOut | BackendError::Rejected { status: 401, .. })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// `None` when there is no valid session.
    async fn current_user(&self) -> Result<Option<UserProfile>, BackendError>;

    /// The whole catalog, newest first.
    async fn select_sweets(&self) -> Result<Vec<Sweet>, BackendError>;

    async fn insert_sweet(&self, sweet: &NewSweet) -> Result<Sweet, BackendError>;

    async fn update_sweet(&self, id: &str, patch: &SweetPatch) -> Result<Sweet, BackendError>;

    async fn delete_sweet(&self, id: &str) -> Result<(), BackendError>;

    /// Takes the stock and records the purchase in one call.
    async fn purchase(&self, id: &str, quantity: i64) -> Result<Purchase, BackendError>;

    async fn restock(&self, id: &str, quantity: i64) -> Result<Sweet, BackendError>;

    /// The signed-in user's own purchase records.
    async fn purchases(&self) -> Result<Vec<Purchase>, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;
}
