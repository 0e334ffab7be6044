use std::io;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use sweet_shop::auth::{self, TokenIssuer};
use sweet_shop::config::{Config, StoreKind};
use sweet_shop::db::{self, MongoStore};
use sweet_shop::memory::MemoryStore;
use sweet_shop::routes;
use sweet_shop::store::Store;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok(); // Load environment variables from .env file
    env_logger::init(); // Initialize the logger

    let config = Config::from_env().map_err(io::Error::other)?;

    let store: Arc<dyn Store> = match &config.store {
        StoreKind::Mongo { url, database } => {
            let db = db::connect(url, database).await.map_err(io::Error::other)?;
            Arc::new(MongoStore::new(&db).await.map_err(io::Error::other)?)
        }
        StoreKind::Memory => {
            log::warn!("using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(admin) = &config.admin {
        auth::ensure_admin(store.as_ref(), &admin.email, &admin.password)
            .await
            .map_err(io::Error::other)?;
    }

    let tokens = TokenIssuer::new(
        config.jwt_secret.clone(),
        chrono::Duration::hours(config.token_ttl_hours),
    );
    let store = web::Data::from(store);

    log::info!("listening on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(store.clone()) // Share the store with handlers
            .configure(routes::configure(tokens.clone()))
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}
