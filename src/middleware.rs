use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage, ResponseError};
use actix_service::{forward_ready, Service};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::auth::TokenIssuer;
use crate::error::ApiError;

/// Requires a valid bearer token and stores its [`Claims`](crate::models::Claims)
/// in the request extensions.
pub struct AuthMiddleware {
    tokens: TokenIssuer,
}

impl AuthMiddleware {
    pub fn new(tokens: TokenIssuer) -> Self {
        AuthMiddleware { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareMiddleware<S>;
    type InitError = ();

    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareMiddleware {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        })
    }
}

pub struct AuthMiddlewareMiddleware<S> {
    service: Rc<S>,
    tokens: TokenIssuer,
}

fn bearer_token(req: &ServiceRequest) -> Result<&str, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization scheme".into()))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = bearer_token(&req).and_then(|token| self.tokens.verify(token));
        let service = self.service.clone();

        Box::pin(async move {
            match claims {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    log::debug!("rejected {} {}: {}", req.method(), req.path(), e);
                    let res = e.error_response();
                    Ok(req.into_response(res).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Claims;
    use actix_web::{test, web, App, HttpRequest, HttpResponse};
    use chrono::Duration;

    async fn whoami(req: HttpRequest) -> HttpResponse {
        let sub = req
            .extensions()
            .get::<Claims>()
            .map(|c| c.sub.clone())
            .unwrap_or_default();
        HttpResponse::Ok().body(sub)
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("secret", Duration::hours(1))
    }

    #[actix_web::test]
    async fn valid_token_reaches_the_handler() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(issuer()))
                .route("/", web::get().to(whoami)),
        )
        .await;
        let token = issuer().issue("user-7").unwrap();
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "user-7");
    }

    #[actix_web::test]
    async fn missing_or_malformed_headers_are_unauthorized() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(issuer()))
                .route("/", web::get().to(whoami)),
        )
        .await;

        for header in [None, Some("Basic abc"), Some("Bearer not-a-jwt")] {
            let mut req = test::TestRequest::get().uri("/");
            if let Some(value) = header {
                req = req.insert_header(("Authorization", value));
            }
            let res = test::call_service(&app, req.to_request()).await;
            assert_eq!(res.status(), 401);
        }
    }
}
