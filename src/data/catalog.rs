//! Product catalog
//!
//! Read-only, insertion-ordered list of products. A catalog that fails
//! validation is a startup error; at runtime the catalog cannot fail.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::models::Product;
use crate::error::AppError;

/// In-memory product catalog
///
/// Cheap to clone; all clones share the same product list.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Arc<[Product]>,
}

impl Catalog {
    /// Build a catalog from a product list
    ///
    /// # Errors
    /// Returns `AppError::Catalog` if the list is empty, ids repeat,
    /// a name is blank, or a price is not a positive finite number.
    pub fn new(products: Vec<Product>) -> Result<Self, AppError> {
        if products.is_empty() {
            return Err(AppError::Catalog("catalog contains no products".to_string()));
        }

        let mut seen = HashSet::with_capacity(products.len());
        for product in &products {
            if !seen.insert(product.id) {
                return Err(AppError::Catalog(format!(
                    "duplicate product id {}",
                    product.id
                )));
            }
            if product.name.trim().is_empty() {
                return Err(AppError::Catalog(format!(
                    "product {} has an empty name",
                    product.id
                )));
            }
            if !product.price.is_finite() || product.price <= 0.0 {
                return Err(AppError::Catalog(format!(
                    "product {} has invalid price {}",
                    product.id, product.price
                )));
            }
        }

        Ok(Self {
            products: products.into(),
        })
    }

    /// Load a catalog from a JSON file holding an array of products
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        let products: Vec<Product> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Catalog(format!("failed to parse {}: {e}", path.display()))
        })?;
        Self::new(products)
    }

    /// Load from `path` if given, otherwise fall back to the built-in list
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let catalog = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::builtin(),
        };

        crate::metrics::CATALOG_PRODUCTS.set(catalog.len() as i64);
        tracing::info!(products = catalog.len(), source = ?path, "Catalog loaded");

        Ok(catalog)
    }

    /// The shop's default product list
    pub fn builtin() -> Self {
        let products = vec![
            Product::new(1, "macbook pro m4", 4000.0, "/images/macbook-pro-m4.jpg"),
            Product::new(2, "samsung z fold 7", 2000.0, "/images/z-fold-7.jpg"),
            Product::new(3, "gaming pc", 600.0, "/images/gaming-pc.png"),
            Product::new(4, "i watch", 150.0, "/images/iwatch.jfif"),
            Product::new(5, "xiaomi 17 pro", 1100.0, "/images/xiaomi-17-pro.jpg"),
            Product::new(6, "iphone 17", 1300.0, "/images/iphone-17.webp"),
            Product::new(7, "bluetooth speaker", 300.0, "/images/speaker.png"),
            Product::new(8, "wireless headphones", 200.0, "/images/headphones.png"),
            Product::new(9, "ipad pro 5th gen", 1600.0, "/images/ipad-pro-5th-gen.avif"),
            Product::new(10, "playstation 5", 500.0, "/images/playstation-5.jpg"),
            Product::new(11, "xbox series x", 400.0, "/images/xbox-series-x.png"),
            Product::new(12, "samsung 40' tv", 300.0, "/images/samsung-40-tv.webp"),
            Product::new(13, "ugreen powerbank", 700.0, "/images/ugreen-powerbank.webp"),
        ];

        Self {
            products: products.into(),
        }
    }

    /// All products, in insertion order
    pub fn list(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
