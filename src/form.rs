//! The "add sweet" form.

use thiserror::Error;

use crate::models::NewSweet;

pub const CATEGORIES: [&str; 5] = ["chocolate", "gummy", "hard candy", "lollipop", "other"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("price must be a non-negative number, got {0:?}")]
    Price(String),
    #[error("quantity must be a non-negative whole number, got {0:?}")]
    Quantity(String),
}

/// Raw text as typed; nothing is parsed until [`SweetForm::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweetForm {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub quantity: String,
    pub image_url: String,
}

impl Default for SweetForm {
    fn default() -> Self {
        SweetForm {
            name: String::new(),
            description: String::new(),
            category: CATEGORIES[0].to_string(),
            price: String::new(),
            quantity: String::new(),
            image_url: String::new(),
        }
    }
}

impl SweetForm {
    /// Submission is enabled once every required field has a value.
    pub fn is_complete(&self) -> bool {
        self.first_missing().is_none()
    }

    fn first_missing(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("category", &self.category),
            ("price", &self.price),
            ("quantity", &self.quantity),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }

    pub fn parse(&self) -> Result<NewSweet, FormError> {
        if let Some(field) = self.first_missing() {
            return Err(FormError::Missing(field));
        }
        let price = self
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| FormError::Price(self.price.clone()))?;
        let quantity = self
            .quantity
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|q| *q >= 0)
            .ok_or_else(|| FormError::Quantity(self.quantity.clone()))?;

        Ok(NewSweet {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            price,
            quantity,
            image_url: self.image_url.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn filled() -> SweetForm {
        SweetForm {
            name: "Test Chocolate".into(),
            description: "Delicious test chocolate".into(),
            price: "3.99".into(),
            quantity: "50".into(),
            ..SweetForm::default()
        }
    }

    #[test]
    fn defaults_to_chocolate_and_is_incomplete() {
        let form = SweetForm::default();
        assert_eq!(form.category, "chocolate");
        assert!(!form.is_complete());
    }

    #[test]
    fn parses_a_complete_form() {
        let form = filled();
        assert!(form.is_complete());
        let sweet = form.parse().unwrap();
        assert_eq!(sweet.price, 3.99);
        assert_eq!(sweet.quantity, 50);
        assert_eq!(sweet.category, "chocolate");
        assert!(sweet.image_url.is_empty());
    }

    #[rstest]
    #[case::name(SweetForm { name: " ".into(), ..filled() }, FormError::Missing("name"))]
    #[case::price(SweetForm { price: String::new(), ..filled() }, FormError::Missing("price"))]
    #[case::bad_price(SweetForm { price: "cheap".into(), ..filled() }, FormError::Price("cheap".into()))]
    #[case::negative_price(SweetForm { price: "-1".into(), ..filled() }, FormError::Price("-1".into()))]
    #[case::fractional_quantity(SweetForm { quantity: "2.5".into(), ..filled() }, FormError::Quantity("2.5".into()))]
    #[case::negative_quantity(SweetForm { quantity: "-3".into(), ..filled() }, FormError::Quantity("-3".into()))]
    fn rejects_bad_input(#[case] form: SweetForm, #[case] expected: FormError) {
        assert_eq!(form.parse().unwrap_err(), expected);
    }
}
