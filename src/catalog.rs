//! The fetched catalog and the filtered view derived from it.

use crate::backend::{Backend, BackendError};
use crate::filter::SweetFilter;
use crate::models::Sweet;

/// Holds every fetched sweet plus the filtered view. Any change to the list
/// or the filter recomputes the view before returning.
///
/// A new catalog is loading until its first list arrives or the first fetch
/// fails.
#[derive(Debug)]
pub struct Catalog {
    items: Vec<Sweet>,
    filter: SweetFilter,
    view: Vec<Sweet>,
    loading: bool,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            items: Vec::new(),
            filter: SweetFilter::default(),
            view: Vec::new(),
            loading: true,
        }
    }

    pub fn items(&self) -> &[Sweet] {
        &self.items
    }

    pub fn view(&self) -> &[Sweet] {
        &self.view
    }

    pub fn filter(&self) -> &SweetFilter {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_items(&mut self, items: Vec<Sweet>) {
        self.items = items;
        self.loading = false;
        self.recompute();
    }

    pub fn set_filter(&mut self, filter: SweetFilter) {
        self.filter = filter;
        self.recompute();
    }

    /// Edits the current filter in place.
    pub fn update_filter(&mut self, edit: impl FnOnce(&mut SweetFilter)) {
        edit(&mut self.filter);
        self.recompute();
    }

    pub fn clear(&mut self) {
        self.set_items(Vec::new());
    }

    pub fn find(&self, id: &str) -> Option<&Sweet> {
        self.items.iter().find(|s| s.id == id)
    }

    /// Distinct categories in the order they first appear.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for sweet in &self.items {
            if !seen.contains(&sweet.category.as_str()) {
                seen.push(&sweet.category);
            }
        }
        seen
    }

    /// Re-fetches the whole list. On failure the previous list stays.
    pub async fn refresh<B: Backend + ?Sized>(&mut self, backend: &B) -> Result<(), BackendError> {
        let result = backend.select_sweets().await;
        match result {
            Ok(items) => {
                log::debug!("fetched {} sweets", items.len());
                self.set_items(items);
                Ok(())
            }
            Err(e) => {
                log::error!("Error fetching sweets: {}", e);
                self.loading = false;
                Err(e)
            }
        }
    }

    fn recompute(&mut self) {
        self.view = self.filter.apply(&self.items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::models::NewSweet;
    use chrono::Utc;

    fn sweet(name: &str, category: &str, price: f64) -> Sweet {
        Sweet::from_new(
            NewSweet {
                name: name.into(),
                description: String::new(),
                category: category.into(),
                price,
                quantity: 1,
                image_url: String::new(),
            },
            Utc::now(),
        )
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.set_items(vec![
            sweet("Gummy Bear", "gummy", 0.5),
            sweet("Choco Bar", "chocolate", 2.0),
            sweet("Cola Bottle", "gummy", 4.0),
        ]);
        catalog
    }

    fn view_names(catalog: &Catalog) -> Vec<&str> {
        catalog.view().iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn view_follows_filter_changes() {
        let mut catalog = catalog();
        assert_eq!(catalog.view().len(), 3);

        catalog.update_filter(|f| f.category = "gummy".into());
        assert_eq!(view_names(&catalog), ["Gummy Bear", "Cola Bottle"]);

        catalog.update_filter(|f| f.max_price = Some(1.0));
        assert_eq!(view_names(&catalog), ["Gummy Bear"]);

        catalog.set_filter(SweetFilter::default());
        assert_eq!(catalog.view().len(), 3);
    }

    #[test]
    fn view_follows_list_changes() {
        let mut catalog = catalog();
        catalog.update_filter(|f| f.search = "bar".into());
        assert_eq!(view_names(&catalog), ["Choco Bar"]);

        catalog.set_items(vec![sweet("Candy Bar", "chocolate", 1.0)]);
        assert_eq!(view_names(&catalog), ["Candy Bar"]);
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        assert_eq!(catalog().categories(), ["gummy", "chocolate"]);
    }

    #[test]
    fn loading_until_the_first_list_arrives() {
        let mut catalog = Catalog::new();
        assert!(catalog.is_loading());
        assert!(catalog.view().is_empty());

        catalog.update_filter(|f| f.search = "bar".into());
        assert!(catalog.is_loading());

        catalog.set_items(Vec::new());
        assert!(!catalog.is_loading());
    }

    #[actix_web::test]
    async fn first_failed_fetch_stops_loading() {
        let mut backend = MockBackend::new();
        backend
            .expect_select_sweets()
            .times(1)
            .returning(|| Err(BackendError::Network("timeout".into())));

        let mut catalog = Catalog::new();
        assert!(catalog.refresh(&backend).await.is_err());
        assert!(!catalog.is_loading());
        assert!(catalog.items().is_empty());
    }

    #[actix_web::test]
    async fn refresh_replaces_the_list() {
        let fetched = vec![sweet("Toffee", "other", 1.0)];
        let mut backend = MockBackend::new();
        let reply = fetched.clone();
        backend
            .expect_select_sweets()
            .times(1)
            .returning(move || Ok(reply.clone()));

        let mut catalog = catalog();
        catalog.refresh(&backend).await.unwrap();

        assert_eq!(catalog.items(), fetched.as_slice());
        assert_eq!(catalog.view(), fetched.as_slice());
        assert!(!catalog.is_loading());
    }

    #[actix_web::test]
    async fn failed_refresh_keeps_previous_list() {
        let mut backend = MockBackend::new();
        backend
            .expect_select_sweets()
            .returning(|| Err(BackendError::Network("timeout".into())));

        let mut catalog = catalog();
        assert!(catalog.refresh(&backend).await.is_err());
        assert_eq!(catalog.items().len(), 3);
        assert!(!catalog.is_loading());
    }
}
