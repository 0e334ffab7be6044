//! [`Backend`] over the sweet shop HTTP API.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{Backend, BackendError};
use crate::models::{
    AuthResponse, LoginInput, NewSweet, Purchase, RegisterInput, Sweet, SweetPatch, UserProfile,
};

#[derive(Deserialize)]
struct Detail {
    detail: String,
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpBackend {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        }
    }

    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let backend = Self::new(base_url);
        *backend.token_slot() = Some(token.into());
        backend
    }

    /// Logs in and keeps the returned bearer token.
    pub async fn sign_in(
        base_url: impl Into<String>,
        email: &str,
        password: &str,
    ) -> Result<Self, BackendError> {
        let backend = Self::new(base_url);
        let body = LoginInput {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = backend.client.post(backend.url("/api/auth/login")).json(&body);
        let auth: AuthResponse = send(request).await?;
        log::debug!("signed in as {}", auth.user.email);
        *backend.token_slot() = Some(auth.access_token);
        Ok(backend)
    }

    /// Creates an account and keeps the returned bearer token.
    pub async fn register(
        base_url: impl Into<String>,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Self, BackendError> {
        let backend = Self::new(base_url);
        let body = RegisterInput {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        let request = backend.client.post(backend.url("/api/auth/register")).json(&body);
        let auth: AuthResponse = send(request).await?;
        log::debug!("registered {}", auth.user.email);
        *backend.token_slot() = Some(auth.access_token);
        Ok(backend)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token_slot(&self) -> MutexGuard<'_, Option<String>> {
        match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, BackendError> {
        let token = self.token_slot().clone().ok_or(BackendError::SignedOut)?;
        Ok(request.bearer_auth(token))
    }
}

async fn rejected(response: reqwest::Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    BackendError::Rejected {
        status: status.as_u16(),
        message: error_message(status, &body),
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Detail>(body) {
        Ok(detail) => detail.detail,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
    }
}

async fn execute(request: RequestBuilder) -> Result<reqwest::Response, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::Network(e.to_string()))?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(rejected(response).await)
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
    execute(request)
        .await?
        .json::<T>()
        .await
        .map_err(|e| BackendError::Network(e.to_string()))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn current_user(&self) -> Result<Option<UserProfile>, BackendError> {
        let request = match self.authorized(self.client.get(self.url("/api/auth/me"))) {
            Ok(request) => request,
            Err(BackendError::SignedOut) => return Ok(None),
            Err(e) => return Err(e),
        };
        match send(request).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn select_sweets(&self) -> Result<Vec<Sweet>, BackendError> {
        send(self.authorized(self.client.get(self.url("/api/sweets")))?).await
    }

    async fn insert_sweet(&self, sweet: &NewSweet) -> Result<Sweet, BackendError> {
        let request = self.client.post(self.url("/api/sweets")).json(sweet);
        send(self.authorized(request)?).await
    }

    async fn update_sweet(&self, id: &str, patch: &SweetPatch) -> Result<Sweet, BackendError> {
        let request = self
            .client
            .put(self.url(&format!("/api/sweets/{id}")))
            .json(patch);
        send(self.authorized(request)?).await
    }

    async fn delete_sweet(&self, id: &str) -> Result<(), BackendError> {
        let request = self.client.delete(self.url(&format!("/api/sweets/{id}")));
        execute(self.authorized(request)?).await?;
        Ok(())
    }

    async fn purchase(&self, id: &str, quantity: i64) -> Result<Purchase, BackendError> {
        let request = self
            .client
            .post(self.url(&format!("/api/sweets/{id}/purchase")))
            .json(&json!({ "quantity": quantity }));
        send(self.authorized(request)?).await
    }

    async fn restock(&self, id: &str, quantity: i64) -> Result<Sweet, BackendError> {
        let request = self
            .client
            .post(self.url(&format!("/api/sweets/{id}/restock")))
            .json(&json!({ "quantity": quantity }));
        send(self.authorized(request)?).await
    }

    async fn purchases(&self) -> Result<Vec<Purchase>, BackendError> {
        send(self.authorized(self.client.get(self.url("/api/purchases")))?).await
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        // Tokens are stateless; forgetting ours is the whole sign-out.
        self.token_slot().take();
        Ok(())
    }
}
