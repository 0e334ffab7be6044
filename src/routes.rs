use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde_json::json;

use crate::auth::{self, TokenIssuer};
use crate::error::ApiError;
use crate::filter::SweetFilter;
use crate::inventory;
use crate::middleware::AuthMiddleware;
use crate::models::{
    AuthResponse, Claims, LoginInput, NewSweet, RegisterInput, Role, SearchParams, StockRequest,
    Sweet, SweetPatch, User,
};
use crate::store::{Store, StoreError};

type StoreData = web::Data<dyn Store>;

/// Mounts every route. Expects a `web::Data<dyn Store>` in the app data.
pub fn configure(tokens: TokenIssuer) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
            ApiError::Validation(err.to_string()).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _| {
            ApiError::Validation(err.to_string()).into()
        }))
        .app_data(web::Data::new(tokens.clone()))
        .route("/", web::get().to(root))
        .route("/health", web::get().to(health))
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(register))
                .route("/login", web::post().to(login))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware::new(tokens.clone()))
                        .route(web::get().to(me)),
                ),
        )
        .service(
            web::scope("/api/sweets")
                .wrap(AuthMiddleware::new(tokens.clone()))
                .route("", web::get().to(list_sweets))
                .route("", web::post().to(create_sweet))
                .route("/search", web::get().to(search_sweets))
                .route("/{sweet_id}", web::put().to(update_sweet))
                .route("/{sweet_id}", web::delete().to(delete_sweet))
                .route("/{sweet_id}/purchase", web::post().to(purchase_sweet))
                .route("/{sweet_id}/restock", web::post().to(restock_sweet)),
        )
        .service(
            web::scope("/api/purchases")
                .wrap(AuthMiddleware::new(tokens))
                .route("", web::get().to(list_purchases)),
        );
    }
}

async fn current_user(req: &HttpRequest, store: &dyn Store) -> Result<User, ApiError> {
    let user_id = req
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;
    store
        .find_user_by_id(&user_id)
        .await
        .map_err(ApiError::store("User lookup failed"))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid authentication credentials".into()))
}

async fn current_admin(req: &HttpRequest, store: &dyn Store) -> Result<User, ApiError> {
    let user = current_user(req, store).await?;
    if user.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to Sweet Shop Management System API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

async fn register(
    store: StoreData,
    tokens: web::Data<TokenIssuer>,
    input: web::Json<RegisterInput>,
) -> Result<HttpResponse, ApiError> {
    let input = input.into_inner();
    input.validate()?;

    let account = auth::new_account(&input.email, &input.password, &input.full_name, Role::User)?;
    store.insert_user(&account).await.map_err(|e| match e {
        StoreError::Duplicate(_) => ApiError::BadRequest("User with this email already exists".into()),
        other => ApiError::store("Registration failed")(other),
    })?;

    log::info!("registered {}", account.email);
    let token = tokens.issue(&account.id)?;
    Ok(HttpResponse::Created().json(AuthResponse::bearer(token, account.profile())))
}

async fn login(
    store: StoreData,
    tokens: web::Data<TokenIssuer>,
    credentials: web::Json<LoginInput>,
) -> Result<HttpResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());
    let user = store
        .find_user_by_email(&auth::normalize_email(&credentials.email))
        .await
        .map_err(ApiError::store("Login failed"))?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&user.password, &credentials.password) {
        return Err(invalid());
    }

    let token = tokens.issue(&user.id)?;
    Ok(HttpResponse::Ok().json(AuthResponse::bearer(token, user.profile())))
}

async fn me(req: HttpRequest, store: StoreData) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req, store.get_ref()).await?;
    Ok(HttpResponse::Ok().json(user.profile()))
}

async fn list_sweets(req: HttpRequest, store: StoreData) -> Result<HttpResponse, ApiError> {
    current_user(&req, store.get_ref()).await?;
    let sweets = store
        .list_sweets(&SweetFilter::default())
        .await
        .map_err(ApiError::store("Failed to fetch sweets"))?;
    Ok(HttpResponse::Ok().json(sweets))
}

async fn search_sweets(
    req: HttpRequest,
    store: StoreData,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, ApiError> {
    current_user(&req, store.get_ref()).await?;
    params.validate()?;
    let filter = SweetFilter::from(params.into_inner());
    let sweets = store
        .list_sweets(&filter)
        .await
        .map_err(ApiError::store("Search failed"))?;
    Ok(HttpResponse::Ok().json(sweets))
}

async fn create_sweet(
    req: HttpRequest,
    store: StoreData,
    data: web::Json<NewSweet>,
) -> Result<HttpResponse, ApiError> {
    current_admin(&req, store.get_ref()).await?;
    data.validate()?;

    let sweet = Sweet::from_new(data.into_inner(), chrono::Utc::now());
    store
        .insert_sweet(&sweet)
        .await
        .map_err(ApiError::store("Failed to create sweet"))?;
    log::info!("created sweet {} ({})", sweet.name, sweet.id);
    Ok(HttpResponse::Created().json(sweet))
}

async fn update_sweet(
    req: HttpRequest,
    store: StoreData,
    sweet_id: web::Path<String>,
    patch: web::Json<SweetPatch>,
) -> Result<HttpResponse, ApiError> {
    current_admin(&req, store.get_ref()).await?;
    patch.validate()?;

    let sweet = store
        .update_sweet(&sweet_id, &patch)
        .await
        .map_err(ApiError::store("Failed to update sweet"))?
        .ok_or_else(ApiError::sweet_not_found)?;
    Ok(HttpResponse::Ok().json(sweet))
}

async fn delete_sweet(
    req: HttpRequest,
    store: StoreData,
    sweet_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    current_admin(&req, store.get_ref()).await?;

    let deleted = store
        .delete_sweet(&sweet_id)
        .await
        .map_err(ApiError::store("Failed to delete sweet"))?;
    if !deleted {
        return Err(ApiError::sweet_not_found());
    }
    log::info!("deleted sweet {}", sweet_id);
    Ok(HttpResponse::NoContent().finish())
}

async fn purchase_sweet(
    req: HttpRequest,
    store: StoreData,
    sweet_id: web::Path<String>,
    data: web::Json<StockRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req, store.get_ref()).await?;
    data.validate()?;

    let purchase = inventory::purchase(store.get_ref(), &user.id, &sweet_id, data.quantity).await?;
    Ok(HttpResponse::Ok().json(purchase))
}

async fn restock_sweet(
    req: HttpRequest,
    store: StoreData,
    sweet_id: web::Path<String>,
    data: web::Json<StockRequest>,
) -> Result<HttpResponse, ApiError> {
    current_admin(&req, store.get_ref()).await?;
    data.validate()?;

    let sweet = inventory::restock(store.get_ref(), &sweet_id, data.quantity).await?;
    Ok(HttpResponse::Ok().json(sweet))
}

async fn list_purchases(req: HttpRequest, store: StoreData) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req, store.get_ref()).await?;
    let purchases = store
        .list_purchases(&user.id)
        .await
        .map_err(ApiError::store("Failed to fetch purchases"))?;
    Ok(HttpResponse::Ok().json(purchases))
}
