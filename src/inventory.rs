//! Stock movements on the backend.
//!
//! A purchase first takes stock with a single conditional update, so two
//! buyers racing for the last units cannot both succeed and stock never
//! drops below zero. The purchase record is written afterwards; if that
//! write fails the units are put back.

use chrono::Utc;

use crate::error::ApiError;
use crate::models::{Purchase, Sweet};
use crate::store::Store;

pub async fn purchase(
    store: &dyn Store,
    user_id: &str,
    sweet_id: &str,
    quantity: i64,
) -> Result<Purchase, ApiError> {
    let taken = store
        .take_stock(sweet_id, quantity)
        .await
        .map_err(ApiError::store("Purchase failed"))?;

    let Some(sweet) = taken else {
        return Err(
            match store
                .find_sweet(sweet_id)
                .await
                .map_err(ApiError::store("Purchase failed"))?
            {
                Some(current) => ApiError::InsufficientStock {
                    available: current.quantity,
                },
                None => ApiError::sweet_not_found(),
            },
        );
    };

    let record = Purchase::record(user_id, &sweet, quantity, Utc::now());
    if let Err(e) = store.insert_purchase(&record).await {
        log::error!("purchase record for sweet {} failed: {}", sweet_id, e);
        if let Err(restore) = store.add_stock(sweet_id, quantity).await {
            log::error!(
                "could not return {} units to sweet {}: {}",
                quantity,
                sweet_id,
                restore
            );
        }
        return Err(ApiError::store("Purchase failed")(e));
    }

    log::info!(
        "user {} bought {} x {} for {:.2}",
        user_id,
        quantity,
        sweet.name,
        record.total_price
    );
    Ok(record)
}

pub async fn restock(store: &dyn Store, sweet_id: &str, quantity: i64) -> Result<Sweet, ApiError> {
    let sweet = store
        .add_stock(sweet_id, quantity)
        .await
        .map_err(ApiError::store("Restock failed"))?
        .ok_or_else(ApiError::sweet_not_found)?;
    log::info!("restocked {} by {} to {}", sweet.name, quantity, sweet.quantity);
    Ok(sweet)
}
