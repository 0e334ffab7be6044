//! The storefront: a session, the catalog it browses, and the item actions.
//!
//! Every action checks what it can locally first (signed in, admin role,
//! quantity bounds, confirmation, complete form) and refuses without calling
//! the backend when a check fails. After a successful mutation the catalog
//! is fetched again; after a failed one local state is left alone.

use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::catalog::Catalog;
use crate::filter::SweetFilter;
use crate::form::{FormError, SweetForm};
use crate::models::{Purchase, Sweet, SweetPatch};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("not signed in")]
    SignedOut,
    #[error("only administrators can {0}")]
    NotAdmin(&'static str),
    #[error("no sweet with id {0}")]
    UnknownSweet(String),
    #[error("quantity must be between 1 and {available}, got {requested}")]
    InvalidQuantity { requested: i64, available: i64 },
    #[error("restock quantity must be at least 1, got {0}")]
    InvalidRestock(i64),
    #[error("nothing to update")]
    EmptyUpdate,
    #[error("delete cancelled")]
    Cancelled,
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("{action} failed: {source}")]
    Backend {
        action: &'static str,
        #[source]
        source: BackendError,
    },
}

pub struct Storefront<B> {
    backend: B,
    session: Session,
    catalog: Catalog,
}

impl<B: Backend> Storefront<B> {
    /// A storefront whose session has not been resolved yet.
    pub fn new(backend: B) -> Self {
        Storefront {
            backend,
            session: Session::new(),
            catalog: Catalog::new(),
        }
    }

    /// Resolves the session and, when signed in, loads the catalog.
    pub async fn start(backend: B) -> Result<Self, BackendError> {
        let mut storefront = Self::new(backend);
        storefront.session.resolve(&storefront.backend).await?;
        if storefront.session.is_authenticated() {
            storefront.reload().await;
        }
        Ok(storefront)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn set_filter(&mut self, filter: SweetFilter) {
        self.catalog.set_filter(filter);
    }

    pub fn update_filter(&mut self, edit: impl FnOnce(&mut SweetFilter)) {
        self.catalog.update_filter(edit);
    }

    pub async fn refresh(&mut self) -> Result<(), ActionError> {
        self.require_user()?;
        let result = self.catalog.refresh(&self.backend).await;
        result.map_err(|e| self.failed("Fetch", e))
    }

    pub async fn purchase(&mut self, id: &str, quantity: i64) -> Result<Purchase, ActionError> {
        self.require_user()?;
        let available = self.known(id)?.quantity;
        if quantity < 1 || quantity > available {
            return Err(ActionError::InvalidQuantity {
                requested: quantity,
                available,
            });
        }

        let result = self.backend.purchase(id, quantity).await;
        let purchase = result.map_err(|e| self.failed("Purchase", e))?;
        self.reload().await;
        Ok(purchase)
    }

    pub async fn restock(&mut self, id: &str, quantity: i64) -> Result<Sweet, ActionError> {
        self.require_admin("restock")?;
        self.known(id)?;
        if quantity < 1 {
            return Err(ActionError::InvalidRestock(quantity));
        }

        let result = self.backend.restock(id, quantity).await;
        let sweet = result.map_err(|e| self.failed("Restock", e))?;
        self.reload().await;
        Ok(sweet)
    }

    /// `confirm` is asked before anything is sent; `false` cancels.
    pub async fn delete(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&Sweet) -> bool,
    ) -> Result<(), ActionError> {
        self.require_admin("delete sweets")?;
        if !confirm(self.known(id)?) {
            return Err(ActionError::Cancelled);
        }

        let result = self.backend.delete_sweet(id).await;
        result.map_err(|e| self.failed("Delete", e))?;
        self.reload().await;
        Ok(())
    }

    pub async fn edit(&mut self, id: &str, patch: &SweetPatch) -> Result<Sweet, ActionError> {
        self.require_admin("edit sweets")?;
        self.known(id)?;
        if patch.is_empty() {
            return Err(ActionError::EmptyUpdate);
        }

        let result = self.backend.update_sweet(id, patch).await;
        let sweet = result.map_err(|e| self.failed("Update", e))?;
        self.reload().await;
        Ok(sweet)
    }

    pub async fn create(&mut self, form: &SweetForm) -> Result<Sweet, ActionError> {
        self.require_admin("add sweets")?;
        let new_sweet = form.parse()?;

        let result = self.backend.insert_sweet(&new_sweet).await;
        let sweet = result.map_err(|e| self.failed("Add sweet", e))?;
        self.reload().await;
        Ok(sweet)
    }

    pub async fn history(&mut self) -> Result<Vec<Purchase>, ActionError> {
        self.require_user()?;
        let result = self.backend.purchases().await;
        result.map_err(|e| self.failed("History", e))
    }

    pub async fn sign_out(&mut self) -> Result<(), ActionError> {
        let result = self.session.sign_out(&self.backend).await;
        self.catalog.clear();
        result.map_err(|source| ActionError::Backend {
            action: "Sign out",
            source,
        })
    }

    fn require_user(&self) -> Result<(), ActionError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ActionError::SignedOut)
        }
    }

    fn require_admin(&self, what: &'static str) -> Result<(), ActionError> {
        self.require_user()?;
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(ActionError::NotAdmin(what))
        }
    }

    fn known(&self, id: &str) -> Result<&Sweet, ActionError> {
        self.catalog
            .find(id)
            .ok_or_else(|| ActionError::UnknownSweet(id.to_string()))
    }

    /// Wraps a backend failure; a rejected token ends the session.
    fn failed(&mut self, action: &'static str, source: BackendError) -> ActionError {
        if source.is_unauthorized() {
            log::warn!("session rejected by backend during {}", action);
            self.session.invalidate();
            self.catalog.clear();
        }
        ActionError::Backend { action, source }
    }

    async fn reload(&mut self) {
        // Already logged by the catalog; the action itself succeeded.
        let _ = self.catalog.refresh(&self.backend).await;
    }
}
