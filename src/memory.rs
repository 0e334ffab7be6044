//! In-process [`Store`] used by tests and `DATABASE_URL=memory` runs.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::filter::SweetFilter;
use crate::models::{Purchase, Sweet, SweetPatch, User};
use crate::store::{Store, StoreError};

#[derive(Default)]
struct State {
    users: Vec<User>,
    // newest first
    sweets: Vec<Sweet>,
    purchases: Vec<Purchase>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Connection("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_sweets(&self, filter: &SweetFilter) -> Result<Vec<Sweet>, StoreError> {
        let state = self.lock()?;
        Ok(filter.apply(&state.sweets))
    }

    async fn find_sweet(&self, id: &str) -> Result<Option<Sweet>, StoreError> {
        let state = self.lock()?;
        Ok(state.sweets.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_sweet(&self, sweet: &Sweet) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.sweets.iter().any(|s| s.id == sweet.id) {
            return Err(StoreError::Duplicate(format!("sweet {}", sweet.id)));
        }
        state.sweets.insert(0, sweet.clone());
        Ok(())
    }

    async fn update_sweet(
        &self,
        id: &str,
        patch: &SweetPatch,
    ) -> Result<Option<Sweet>, StoreError> {
        let mut state = self.lock()?;
        Ok(state.sweets.iter_mut().find(|s| s.id == id).map(|sweet| {
            sweet.apply_patch(patch, Utc::now());
            sweet.clone()
        }))
    }

    async fn delete_sweet(&self, id: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let before = state.sweets.len();
        state.sweets.retain(|s| s.id != id);
        Ok(state.sweets.len() != before)
    }

    async fn take_stock(&self, id: &str, quantity: i64) -> Result<Option<Sweet>, StoreError> {
        let mut state = self.lock()?;
        Ok(state
            .sweets
            .iter_mut()
            .find(|s| s.id == id && s.quantity >= quantity)
            .map(|sweet| {
                sweet.quantity -= quantity;
                sweet.updated_at = Utc::now();
                sweet.clone()
            }))
    }

    async fn add_stock(&self, id: &str, quantity: i64) -> Result<Option<Sweet>, StoreError> {
        let mut state = self.lock()?;
        let Some(sweet) = state.sweets.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        sweet.quantity = sweet
            .quantity
            .checked_add(quantity)
            .filter(|q| *q >= 0)
            .ok_or_else(|| StoreError::Query(format!("stock of {id} out of range")))?;
        sweet.updated_at = Utc::now();
        Ok(Some(sweet.clone()))
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        self.lock()?.purchases.push(purchase.clone());
        Ok(())
    }

    async fn list_purchases(&self, user_id: &str) -> Result<Vec<Purchase>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .purchases
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
