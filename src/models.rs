use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Account document as stored; never sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !looks_like_email(&self.email) {
            return Err(ApiError::Validation("email: value is not a valid email address".into()));
        }
        if self.password.chars().count() < 6 {
            return Err(ApiError::Validation(
                "password: must be at least 6 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: usize,  // Expiration time as UTC timestamp
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserProfile,
}

impl AuthResponse {
    pub fn bearer(access_token: String, user: UserProfile) -> Self {
        AuthResponse {
            access_token,
            token_type: "bearer".into(),
            user,
        }
    }
}

/// A catalog item. `quantity` is the stock and never drops below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default)]
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sweet {
    pub fn from_new(new_sweet: NewSweet, now: DateTime<Utc>) -> Self {
        Sweet {
            id: Uuid::new_v4().to_string(),
            name: new_sweet.name,
            description: new_sweet.description,
            category: new_sweet.category,
            price: new_sweet.price,
            quantity: new_sweet.quantity,
            image_url: new_sweet.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Applies the present fields of `patch` in place.
    pub fn apply_patch(&mut self, patch: &SweetPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = image_url.clone();
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSweet {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default)]
    pub image_url: String,
}

impl NewSweet {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name: must not be empty".into()));
        }
        if self.category.trim().is_empty() {
            return Err(ApiError::Validation("category: must not be empty".into()));
        }
        validate_price(self.price)?;
        validate_stock(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweetPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl SweetPatch {
    pub fn is_empty(&self) -> bool {
        *self == SweetPatch::default()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::BadRequest("No fields to update".into()));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ApiError::Validation("name: must not be empty".into()));
        }
        if matches!(&self.category, Some(category) if category.trim().is_empty()) {
            return Err(ApiError::Validation("category: must not be empty".into()));
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(quantity) = self.quantity {
            validate_stock(quantity)?;
        }
        Ok(())
    }
}

/// Immutable record of a completed purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    pub sweet_id: String,
    pub quantity: i64,
    pub total_price: f64,
    pub purchased_at: DateTime<Utc>,
}

impl Purchase {
    /// Prices the purchase at the item's current price.
    pub fn record(user_id: &str, sweet: &Sweet, quantity: i64, now: DateTime<Utc>) -> Self {
        Purchase {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            sweet_id: sweet.id.clone(),
            quantity,
            total_price: sweet.price * quantity as f64,
            purchased_at: now,
        }
    }
}

/// Largest stock level or stock change a single request may carry.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Body of both the purchase and the restock endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockRequest {
    pub quantity: i64,
}

impl StockRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.quantity <= 0 {
            return Err(ApiError::Validation("quantity: must be greater than 0".into()));
        }
        if self.quantity > MAX_STOCK {
            return Err(ApiError::Validation(format!(
                "quantity: must be at most {MAX_STOCK}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SearchParams {
    /// Price bounds must be finite numbers.
    pub fn validate(&self) -> Result<(), ApiError> {
        for (field, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if matches!(bound, Some(value) if !value.is_finite()) {
                return Err(ApiError::Validation(format!("{field}: must be a finite number")));
            }
        }
        Ok(())
    }
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::Validation("price: must be greater than or equal to 0".into()));
    }
    Ok(())
}

fn validate_stock(quantity: i64) -> Result<(), ApiError> {
    if quantity < 0 {
        return Err(ApiError::Validation(
            "quantity: must be greater than or equal to 0".into(),
        ));
    }
    if quantity > MAX_STOCK {
        return Err(ApiError::Validation(format!("quantity: must be at most {MAX_STOCK}")));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
