//! Favourites API types.
//!
//! The remote API is authoritative for the favourite set; there is no local
//! cache and no optimistic update. Every toggle is a full round trip.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for a favourite toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavouriteRequest {
    pub visitor_id: Uuid,
    pub session_id: Uuid,
    pub property_id: String,
    /// Which UI surface the toggle came from (card, detail page, map popup).
    pub source: String,
}

/// Result of toggling a favourite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToggleFavouriteResult {
    /// State after the toggle.
    pub is_favourited: bool,
    /// Visitor's total favourite count after the toggle.
    pub count: u64,
}

/// A visitor's favourites as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FavouritesList {
    #[serde(default)]
    pub favourites: Vec<String>,
    #[serde(default)]
    pub count: u64,
}

impl FavouritesList {
    pub fn contains(&self, property_id: &str) -> bool {
        self.favourites.iter().any(|id| id == property_id)
    }
}
