use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::filter::SweetFilter;
use crate::models::{Purchase, Sweet, SweetPatch, User};
use crate::store::{Store, StoreError};

const DUPLICATE_KEY: i32 = 11000;

pub async fn connect(database_url: &str, database_name: &str) -> Result<Database, StoreError> {
    // Parse the connection string into client options
    let client_options = ClientOptions::parse(database_url).await?;
    let client = Client::with_options(client_options)?;
    Ok(client.database(database_name))
}

/// [`Store`] backed by the `users`, `sweets` and `purchases` collections.
#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
    sweets: Collection<Sweet>,
    purchases: Collection<Purchase>,
}

impl MongoStore {
    /// Binds the collections and makes sure the unique indexes exist.
    pub async fn new(db: &Database) -> Result<Self, StoreError> {
        let store = MongoStore {
            users: db.collection("users"),
            sweets: db.collection("sweets"),
            purchases: db.collection("purchases"),
        };
        store
            .users
            .create_index(unique_index("email"), None)
            .await?;
        store
            .sweets
            .create_index(unique_index("id"), None)
            .await?;
        Ok(store)
    }

    async fn adjust_stock(&self, filter: Document, delta: i64) -> Result<Option<Sweet>, StoreError> {
        let update = doc! {
            "$inc": { "quantity": delta },
            "$set": { "updated_at": now_bson()? },
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self.sweets.find_one_and_update(filter, update, options).await?)
    }
}

fn unique_index(field: &str) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn now_bson() -> Result<bson::Bson, StoreError> {
    bson::to_bson(&Utc::now()).map_err(|e| StoreError::Query(e.to_string()))
}

fn newest_first(field: &str) -> FindOptions {
    FindOptions::builder().sort(doc! { field: -1 }).build()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Escapes regex metacharacters so a search term matches literally.
pub fn escape_regex(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Translates a [`SweetFilter`] into a MongoDB query document.
pub fn filter_document(filter: &SweetFilter) -> Document {
    let mut query = Document::new();
    if !filter.search.is_empty() {
        query.insert(
            "name",
            doc! { "$regex": escape_regex(&filter.search), "$options": "i" },
        );
    }
    if !filter.category.is_empty() {
        query.insert("category", filter.category.as_str());
    }
    let mut price = Document::new();
    if let Some(min) = filter.min_price {
        price.insert("$gte", min);
    }
    if let Some(max) = filter.max_price {
        price.insert("$lte", max);
    }
    if !price.is_empty() {
        query.insert("price", price);
    }
    query
}

/// Builds the `$set` document for a patch, stamping `updated_at`.
pub fn patch_document(patch: &SweetPatch) -> Result<Document, StoreError> {
    let mut set = bson::to_document(patch).map_err(|e| StoreError::Query(e.to_string()))?;
    set.insert("updated_at", now_bson()?);
    Ok(doc! { "$set": set })
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        match self.users.insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(StoreError::Duplicate(format!("email {}", user.email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "id": id }, None).await?)
    }

    async fn list_sweets(&self, filter: &SweetFilter) -> Result<Vec<Sweet>, StoreError> {
        let cursor = self
            .sweets
            .find(filter_document(filter), newest_first("created_at"))
            .await?;
        let sweets: Vec<Sweet> = cursor.try_collect().await?;
        Ok(sweets)
    }

    async fn find_sweet(&self, id: &str) -> Result<Option<Sweet>, StoreError> {
        Ok(self.sweets.find_one(doc! { "id": id }, None).await?)
    }

    async fn insert_sweet(&self, sweet: &Sweet) -> Result<(), StoreError> {
        match self.sweets.insert_one(sweet, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate(format!("sweet {}", sweet.id))),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_sweet(
        &self,
        id: &str,
        patch: &SweetPatch,
    ) -> Result<Option<Sweet>, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .sweets
            .find_one_and_update(doc! { "id": id }, patch_document(patch)?, options)
            .await?)
    }

    async fn delete_sweet(&self, id: &str) -> Result<bool, StoreError> {
        let result = self.sweets.delete_one(doc! { "id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn take_stock(&self, id: &str, quantity: i64) -> Result<Option<Sweet>, StoreError> {
        // The guard and the decrement run as one document update.
        self.adjust_stock(doc! { "id": id, "quantity": { "$gte": quantity } }, -quantity)
            .await
    }

    async fn add_stock(&self, id: &str, quantity: i64) -> Result<Option<Sweet>, StoreError> {
        self.adjust_stock(doc! { "id": id }, quantity).await
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        self.purchases.insert_one(purchase, None).await?;
        Ok(())
    }

    async fn list_purchases(&self, user_id: &str) -> Result<Vec<Purchase>, StoreError> {
        let cursor = self
            .purchases
            .find(doc! { "user_id": user_id }, newest_first("purchased_at"))
            .await?;
        let purchases: Vec<Purchase> = cursor.try_collect().await?;
        Ok(purchases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_regex_metacharacters() {
        assert_eq!(escape_regex("m&m's (mini)"), "m&m's \\(mini\\)");
        assert_eq!(escape_regex("a.b*"), "a\\.b\\*");
    }

    #[test]
    fn empty_filter_selects_everything() {
        assert!(filter_document(&SweetFilter::default()).is_empty());
    }

    #[test]
    fn full_filter_builds_every_clause() {
        let filter = SweetFilter {
            search: "bar".into(),
            category: "chocolate".into(),
            min_price: Some(1.0),
            max_price: Some(3.0),
        };
        let query = filter_document(&filter);
        assert_eq!(
            query,
            doc! {
                "name": { "$regex": "bar", "$options": "i" },
                "category": "chocolate",
                "price": { "$gte": 1.0, "$lte": 3.0 },
            }
        );
    }

    #[test]
    fn single_bound_only_sets_that_operator() {
        let filter = SweetFilter {
            max_price: Some(2.5),
            ..SweetFilter::default()
        };
        assert_eq!(filter_document(&filter), doc! { "price": { "$lte": 2.5 } });
    }

    #[test]
    fn patch_document_sets_present_fields_only() {
        let patch = SweetPatch {
            quantity: Some(7),
            ..SweetPatch::default()
        };
        let update = patch_document(&patch).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_i64("quantity").unwrap(), 7);
        assert!(set.contains_key("updated_at"));
        assert!(!set.contains_key("name"));
    }
}
