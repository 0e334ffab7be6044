//! Catalog filtering.
//!
//! A [`SweetFilter`] combines four independent criteria that must all hold:
//! case-insensitive name substring, exact category, and inclusive lower and
//! upper price bounds. Empty criteria match everything. Filtering keeps the
//! order of its input.

use thiserror::Error;

use crate::models::{SearchParams, Sweet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid price bound: {0:?}")]
    InvalidPrice(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweetFilter {
    pub search: String,
    pub category: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SweetFilter {
    /// Builds a filter from raw text inputs. Blank bounds are left open.
    pub fn from_inputs(
        search: &str,
        category: &str,
        min_price: &str,
        max_price: &str,
    ) -> Result<Self, FilterError> {
        Ok(SweetFilter {
            search: search.to_string(),
            category: category.to_string(),
            min_price: parse_bound(min_price)?,
            max_price: parse_bound(max_price)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.category.is_empty()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    pub fn matches(&self, sweet: &Sweet) -> bool {
        if !self.search.is_empty()
            && !sweet
                .name
                .to_lowercase()
                .contains(&self.search.to_lowercase())
        {
            return false;
        }
        if !self.category.is_empty() && sweet.category != self.category {
            return false;
        }
        if matches!(self.min_price, Some(min) if sweet.price < min) {
            return false;
        }
        if matches!(self.max_price, Some(max) if sweet.price > max) {
            return false;
        }
        true
    }

    pub fn apply(&self, sweets: &[Sweet]) -> Vec<Sweet> {
        sweets.iter().filter(|sweet| self.matches(sweet)).cloned().collect()
    }
}

impl From<SearchParams> for SweetFilter {
    fn from(params: SearchParams) -> Self {
        SweetFilter {
            search: params.name.unwrap_or_default(),
            category: params.category.unwrap_or_default(),
            min_price: params.min_price,
            max_price: params.max_price,
        }
    }
}

/// Parses one price bound; blank means unbounded.
pub fn parse_bound(raw: &str) -> Result<Option<f64>, FilterError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(FilterError::InvalidPrice(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::{fixture, rstest};

    fn sweet(name: &str, category: &str, price: f64) -> Sweet {
        let now = Utc::now();
        Sweet {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.into(),
            description: String::new(),
            category: category.into(),
            price,
            quantity: 10,
            image_url: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[fixture]
    fn catalog() -> Vec<Sweet> {
        vec![
            sweet("Gummy Bear", "gummy", 0.5),
            sweet("Choco Bar", "chocolate", 2.0),
            sweet("Sour Gummy Worm", "gummy", 4.0),
            sweet("Lemon Drop", "hard candy", 1.0),
        ]
    }

    fn names(sweets: &[Sweet]) -> Vec<&str> {
        sweets.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let items = vec![sweet("Gummy Bear", "gummy", 1.0), sweet("Choco Bar", "chocolate", 1.0)];
        let filter = SweetFilter {
            search: "gummy".into(),
            ..SweetFilter::default()
        };
        assert_eq!(names(&filter.apply(&items)), ["Gummy Bear"]);
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let items = vec![
            sweet("A", "x", 0.5),
            sweet("B", "x", 2.0),
            sweet("C", "x", 4.0),
        ];
        let filter = SweetFilter::from_inputs("", "", "1", "3").unwrap();
        assert_eq!(names(&filter.apply(&items)), ["B"]);

        let edges = SweetFilter::from_inputs("", "", "0.5", "4").unwrap();
        assert_eq!(edges.apply(&items).len(), 3);
    }

    #[rstest]
    fn empty_filter_matches_everything(catalog: Vec<Sweet>) {
        let filter = SweetFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&catalog), catalog);
    }

    #[rstest]
    fn category_is_exact(catalog: Vec<Sweet>) {
        let filter = SweetFilter {
            category: "gummy".into(),
            ..SweetFilter::default()
        };
        assert_eq!(names(&filter.apply(&catalog)), ["Gummy Bear", "Sour Gummy Worm"]);

        let partial = SweetFilter {
            category: "gum".into(),
            ..SweetFilter::default()
        };
        assert!(partial.apply(&catalog).is_empty());
    }

    #[rstest]
    #[case::search_and_category("gummy", "gummy", "", "", &["Gummy Bear", "Sour Gummy Worm"])]
    #[case::search_and_min("GUMMY", "", "1", "", &["Sour Gummy Worm"])]
    #[case::category_and_max("", "gummy", "", "1", &["Gummy Bear"])]
    #[case::nothing_left("choco", "gummy", "", "", &[])]
    fn criteria_are_anded(
        catalog: Vec<Sweet>,
        #[case] search: &str,
        #[case] category: &str,
        #[case] min: &str,
        #[case] max: &str,
        #[case] expected: &[&str],
    ) {
        let filter = SweetFilter::from_inputs(search, category, min, max).unwrap();
        let result = filter.apply(&catalog);
        assert_eq!(names(&result), expected);
        assert!(result.iter().all(|s| filter.matches(s)));
    }

    #[rstest]
    fn keeps_order_and_is_idempotent(catalog: Vec<Sweet>) {
        let filter = SweetFilter::from_inputs("o", "", "", "3").unwrap();
        let once = filter.apply(&catalog);
        assert_eq!(names(&once), ["Choco Bar", "Lemon Drop"]);
        assert_eq!(filter.apply(&once), once);
        assert_eq!(filter.apply(&catalog), once);
    }

    #[rstest]
    #[case("  ", None)]
    #[case("2.5", Some(2.5))]
    #[case(" 3 ", Some(3.0))]
    fn parses_bounds(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_bound(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("cheap")]
    #[case("NaN")]
    #[case("inf")]
    fn rejects_non_numeric_bounds(#[case] raw: &str) {
        assert!(matches!(
            SweetFilter::from_inputs("", "", raw, ""),
            Err(FilterError::InvalidPrice(_))
        ));
    }

    #[test]
    fn search_params_map_onto_filter() {
        let filter = SweetFilter::from(SearchParams {
            name: Some("bar".into()),
            category: None,
            min_price: Some(1.0),
            max_price: None,
        });
        assert_eq!(filter.search, "bar");
        assert!(filter.category.is_empty());
        assert_eq!(filter.min_price, Some(1.0));
    }
}
