//! Data models
//!
//! Plain structs served by the API. Products are loaded once at startup
//! and never mutated afterwards.

use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Product
// =============================================================================

/// A sellable catalog item
///
/// Field names match what the shop frontend reads (`img` for the image path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique, stable identifier
    pub id: u32,
    pub name: String,
    /// Unit price, strictly positive
    #[serde(serialize_with = "serialize_price")]
    pub price: f64,
    /// Image path relative to the frontend root (e.g. "/images/speaker.png")
    #[serde(rename = "img")]
    pub image: String,
}

impl Product {
    pub fn new(id: u32, name: impl Into<String>, price: f64, image: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image: image.into(),
        }
    }
}

/// Whole prices go out as JSON integers (`4000`, not `4000.0`)
fn serialize_price<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

    if price.fract() == 0.0 && price.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*price as i64)
    } else {
        serializer.serialize_f64(*price)
    }
}
