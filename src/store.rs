//! Persistence port shared by the MongoDB and in-memory adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::filter::SweetFilter;
use crate::models::{Purchase, Sweet, SweetPatch, User};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store query failed: {0}")]
    Query(String),
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;
        match *err.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
                StoreError::Connection(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Users, sweets and purchases. Sweets are listed newest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn list_sweets(&self, filter: &SweetFilter) -> Result<Vec<Sweet>, StoreError>;

    async fn find_sweet(&self, id: &str) -> Result<Option<Sweet>, StoreError>;

    async fn insert_sweet(&self, sweet: &Sweet) -> Result<(), StoreError>;

    /// Returns the updated sweet, or `None` when no sweet has this id.
    async fn update_sweet(&self, id: &str, patch: &SweetPatch)
        -> Result<Option<Sweet>, StoreError>;

    /// Returns whether a sweet was removed.
    async fn delete_sweet(&self, id: &str) -> Result<bool, StoreError>;

    /// Atomically lowers the stock by `quantity` if at least that much is
    /// available. `None` means the sweet is missing or short.
    async fn take_stock(&self, id: &str, quantity: i64) -> Result<Option<Sweet>, StoreError>;

    async fn add_stock(&self, id: &str, quantity: i64) -> Result<Option<Sweet>, StoreError>;

    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError>;

    async fn list_purchases(&self, user_id: &str) -> Result<Vec<Purchase>, StoreError>;
}
