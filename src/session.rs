//! Who is using the storefront.
//!
//! A [`Session`] starts out [`SessionState::Loading`]; resolving it against
//! the backend moves it to `Authenticated` or `Unauthenticated`, and signing
//! out moves an authenticated session to `Unauthenticated`. Nothing else
//! renders while the session is loading.

use crate::backend::{Backend, BackendError};
use crate::models::{Sweet, UserProfile};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    Authenticated(UserProfile),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    state: SessionState,
}

/// Which controls an item card shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub purchase: bool,
    pub restock: bool,
    pub edit: bool,
    pub delete: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            state: SessionState::Loading,
        }
    }

    /// Looks up the current identity. A failed lookup leaves the session
    /// unauthenticated and returns the error.
    pub async fn resolve<B: Backend + ?Sized>(&mut self, backend: &B) -> Result<(), BackendError> {
        match backend.current_user().await {
            Ok(Some(user)) => {
                log::info!("signed in as {} ({:?})", user.email, user.role);
                self.state = SessionState::Authenticated(user);
                Ok(())
            }
            Ok(None) => {
                self.state = SessionState::Unauthenticated;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Unauthenticated;
                Err(e)
            }
        }
    }

    pub async fn sign_out<B: Backend + ?Sized>(&mut self, backend: &B) -> Result<(), BackendError> {
        if let SessionState::Authenticated(user) = &self.state {
            log::info!("signing out {}", user.email);
        }
        // Local state is dropped even if the backend call fails.
        let result = backend.sign_out().await;
        self.state = SessionState::Unauthenticated;
        result
    }

    /// Drops the identity after the backend refused it.
    pub fn invalidate(&mut self) {
        self.state = SessionState::Unauthenticated;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(UserProfile::is_admin)
    }

    /// Whether the "add sweet" control is shown.
    pub fn can_create(&self) -> bool {
        self.is_admin()
    }

    pub fn controls(&self, sweet: &Sweet) -> Controls {
        if !self.is_authenticated() {
            return Controls::default();
        }
        let admin = self.is_admin();
        Controls {
            purchase: sweet.in_stock(),
            restock: admin,
            edit: admin,
            delete: admin,
        }
    }
}
