//! Password hashing and bearer token handling.

use argon2::{self, Config as ArgonConfig};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;

use crate::error::ApiError;
use crate::models::{Claims, Role, User};
use crate::store::{Store, StoreError};

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let config = ArgonConfig::default();
    argon2::hash_encoded(password.as_bytes(), &salt, &config).map_err(|e| {
        log::error!("Password hashing failed: {}", e);
        ApiError::Internal("Internal Server Error".into())
    })
}

/// A malformed hash counts as a mismatch.
pub fn verify_password(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

/// Emails are compared case-insensitively; they are stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn new_account(
    email: &str,
    password: &str,
    full_name: &str,
    role: Role,
) -> Result<User, ApiError> {
    Ok(User {
        id: uuid::Uuid::new_v4().to_string(),
        email: normalize_email(email),
        full_name: full_name.to_string(),
        role,
        password: hash_password(password)?,
        created_at: Utc::now(),
    })
}

/// Creates the configured administrator unless the email is already taken.
pub async fn ensure_admin(store: &dyn Store, email: &str, password: &str) -> Result<(), ApiError> {
    let existing = store
        .find_user_by_email(&normalize_email(email))
        .await
        .map_err(ApiError::store("Admin seeding failed"))?;
    if let Some(user) = existing {
        if user.role != Role::Admin {
            log::warn!("{} exists but is not an administrator", user.email);
        }
        return Ok(());
    }
    let admin = new_account(email, password, "Administrator", Role::Admin)?;
    match store.insert_user(&admin).await {
        Ok(()) => {
            log::info!("seeded administrator {}", admin.email);
            Ok(())
        }
        Err(StoreError::Duplicate(_)) => Ok(()),
        Err(e) => Err(ApiError::store("Admin seeding failed")(e)),
    }
}

/// Signs and checks the HS256 tokens handed out at login.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        TokenIssuer {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<String, ApiError> {
        let expiration = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| ApiError::Internal("token expiry out of range".into()))?
            .timestamp()
            .max(0) as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            log::error!("Failed to encode token: {}", e);
            ApiError::Internal("Internal Server Error".into())
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("testpassword123").unwrap();
        assert_ne!(hash, "testpassword123");
        assert!(verify_password(&hash, "testpassword123"));
        assert!(!verify_password(&hash, "wrongpassword"));
        assert!(!verify_password("not-a-hash", "testpassword123"));
    }

    #[actix_web::test]
    async fn seeds_the_admin_once() {
        let store = crate::memory::MemoryStore::new();
        ensure_admin(&store, " Admin@Example.com", "adminpassword123")
            .await
            .unwrap();
        ensure_admin(&store, "admin@example.com", "other")
            .await
            .unwrap();

        let admin = store
            .find_user_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password(&admin.password, "adminpassword123"));
    }

    #[test]
    fn tokens_carry_the_subject() {
        let issuer = TokenIssuer::new("secret", Duration::hours(1));
        let token = issuer.issue("user-42").unwrap();
        assert_eq!(issuer.verify(&token).unwrap().sub, "user-42");
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let ours = TokenIssuer::new("secret", Duration::hours(1));
        let theirs = TokenIssuer::new("other", Duration::hours(1));
        let token = theirs.issue("user-42").unwrap();
        assert!(matches!(ours.verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new("secret", Duration::hours(-2));
        let token = issuer.issue("user-42").unwrap();
        assert!(issuer.verify(&token).is_err());
    }
}
