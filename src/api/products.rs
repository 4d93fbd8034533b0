//! Catalog endpoint
//!
//! - GET /api/products

use axum::{Json, extract::State};

use crate::AppState;
use crate::data::Product;

/// GET /api/products
///
/// Returns the full catalog in insertion order. Public; no session needed.
pub async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.catalog.list().to_vec())
}
