//! API layer
//!
//! JSON endpoints consumed by the shop frontend:
//! - Catalog
//! - Session status
//! - Metrics (Prometheus)

mod dto;
mod metrics;
mod products;
mod status;

pub use dto::AuthStatusResponse;
pub use metrics::{metrics_router, track_http_metrics};

use axum::{Router, routing::get};

use crate::AppState;

/// Create the `/api` router
///
/// Routes:
/// - GET /products
/// - GET /auth/status
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list_products))
        .route("/auth/status", get(status::auth_status))
}
