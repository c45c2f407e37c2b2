//! Read-only product catalog.

use crumb_core::{CurrencyCode, Price, ProductId};
use serde::{Deserialize, Serialize};

/// Errors building a [`ProductCatalog`].
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog must contain at least one product")]
    Empty,
    #[error("duplicate product id {0}")]
    DuplicateId(ProductId),
}

/// A purchasable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Price,
    /// Path of the product image under `/static`.
    pub image: String,
}

impl Product {
    /// Create a new product.
    #[must_use]
    pub fn new(id: i32, name: &str, unit_price: Price, image: &str) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.to_owned(),
            unit_price,
            image: image.to_owned(),
        }
    }
}

/// A fixed, non-empty list of products.
///
/// The first product is the default selection for a new checkout.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    head: Product,
    tail: Vec<Product>,
}

impl ProductCatalog {
    /// Build a catalog from a list of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or contains duplicate IDs.
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut iter = products.into_iter();
        let head = iter.next().ok_or(CatalogError::Empty)?;
        let tail: Vec<Product> = iter.collect();

        let mut seen = vec![head.id];
        for product in &tail {
            if seen.contains(&product.id) {
                return Err(CatalogError::DuplicateId(product.id));
            }
            seen.push(product.id);
        }

        Ok(Self { head, tail })
    }

    /// The default product for a fresh checkout.
    #[must_use]
    pub const fn first(&self) -> &Product {
        &self.head
    }

    /// Look up a product by ID.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.iter().find(|product| product.id == id)
    }

    /// Iterate over all products in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    /// Always `false`; a catalog cannot be empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self {
            head: Product::new(
                1,
                "Classic Oat Granola, case of 6",
                Price::from_cents(4500, CurrencyCode::USD),
                "/static/images/granola-classic.svg",
            ),
            tail: vec![
                Product::new(
                    2,
                    "Dark Cocoa Granola, case of 6",
                    Price::from_cents(4900, CurrencyCode::USD),
                    "/static/images/granola-cocoa.svg",
                ),
                Product::new(
                    3,
                    "Maple Pecan Granola, case of 6",
                    Price::from_cents(5250, CurrencyCode::USD),
                    "/static/images/granola-maple.svg",
                ),
            ],
        }
    }
}
