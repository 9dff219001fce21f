//! Catalogue product record and the admin product form.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Price, ProductId};

/// An uploaded product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// A product as listed by the catalogue endpoints.
///
/// Everything but the ID is defaulted: order lines embed partial product
/// documents and the storefront renders whatever is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl Product {
    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// URL of the first image, used for cards and cart lines.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(|image| image.url.as_str())
    }
}

/// Errors from validating the admin product form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required text field was blank.
    #[error("{0} is required")]
    Required(&'static str),
    /// Price was not a number greater than zero.
    #[error("price must be greater than zero")]
    InvalidPrice,
    /// Stock was not a whole number of zero or more.
    #[error("stock must be a whole number of zero or more")]
    InvalidStock,
    /// A new product was submitted without any image.
    #[error("Please select at least one image")]
    NoImages,
}

/// Validated text fields of the admin product form.
///
/// Serializes as the `PUT /api/product/:id` body; creation sends the same
/// fields as multipart parts alongside the images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: u32,
}

impl ProductDraft {
    /// Validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns the first failing field: blank title, description or
    /// category, a price that is not a positive number, or a stock that is
    /// not a non-negative integer.
    pub fn parse(
        title: &str,
        description: &str,
        category: &str,
        price: &str,
        stock: &str,
    ) -> Result<Self, ValidationError> {
        let title = required(title, "title")?;
        let description = required(description, "description")?;
        let category = required(category, "category")?;

        let price: Decimal = price.trim().parse().map_err(|_| ValidationError::InvalidPrice)?;
        if price <= Decimal::ZERO {
            return Err(ValidationError::InvalidPrice);
        }
        let stock: u32 = stock.trim().parse().map_err(|_| ValidationError::InvalidStock)?;

        Ok(Self {
            title,
            description,
            category,
            price,
            stock,
        })
    }

    /// Prefill values for the edit form.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price.amount(),
            stock: u32::try_from(product.stock.max(0)).unwrap_or(u32::MAX),
        }
    }

    /// Text parts for the multipart create request.
    #[must_use]
    pub fn form_fields(&self) -> [(&'static str, String); 5] {
        [
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("category", self.category.clone()),
            ("price", self.price.to_string()),
            ("stock", self.stock.to_string()),
        ]
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(value.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_parses_and_trims() {
        let draft = ProductDraft::parse(" Mug ", "Ceramic", "kitchen", "249.50", "12").unwrap();
        assert_eq!(draft.title, "Mug");
        assert_eq!(draft.stock, 12);
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            serde_json::json!({
                "title": "Mug",
                "description": "Ceramic",
                "category": "kitchen",
                "price": 249.5,
                "stock": 12
            })
        );
    }

    #[test]
    fn test_draft_rejects_bad_fields() {
        assert_eq!(
            ProductDraft::parse("", "d", "c", "1", "1"),
            Err(ValidationError::Required("title"))
        );
        assert_eq!(
            ProductDraft::parse("t", "d", "  ", "1", "1"),
            Err(ValidationError::Required("category"))
        );
        assert_eq!(
            ProductDraft::parse("t", "d", "c", "0", "1"),
            Err(ValidationError::InvalidPrice)
        );
        assert_eq!(
            ProductDraft::parse("t", "d", "c", "abc", "1"),
            Err(ValidationError::InvalidPrice)
        );
        assert_eq!(
            ProductDraft::parse("t", "d", "c", "10", "-1"),
            Err(ValidationError::InvalidStock)
        );
        assert!(ProductDraft::parse("t", "d", "c", "10", "0").is_ok());
    }

    #[test]
    fn test_partial_document_deserializes() {
        let product: Product =
            serde_json::from_str(r#"{"_id":"p1","title":"Mug","price":250}"#).unwrap();
        assert_eq!(product.title, "Mug");
        assert_eq!(product.stock, 0);
        assert!(!product.in_stock());
        assert!(product.thumbnail().is_none());
    }

    #[test]
    fn test_thumbnail_is_first_image() {
        let product: Product = serde_json::from_str(
            r#"{"_id":"p1","stock":3,"images":[{"url":"https://img/1.png","id":"a"},{"url":"https://img/2.png"}]}"#,
        )
        .unwrap();
        assert!(product.in_stock());
        assert_eq!(product.thumbnail(), Some("https://img/1.png"));
    }
}
