//! Favourites domain wrappers.
//!
//! Thin translation over the favourites API client: inject the ambient
//! visitor/session identity, and derive the convenience predicates from
//! the full list. No local cache and no optimistic update; the remote API
//! stays authoritative and every toggle is a round trip.

use tracker_core::{
    FavouritesList, Result, ToggleFavouriteRequest, ToggleFavouriteResult,
};
use tracker_transport::FavouritesClient;
use uuid::Uuid;

/// Toggles a property for the ambient visitor.
pub async fn toggle_favourite(
    client: &FavouritesClient,
    visitor_id: Uuid,
    session_id: Uuid,
    property_id: &str,
    source: &str,
) -> Result<ToggleFavouriteResult> {
    let request = ToggleFavouriteRequest {
        visitor_id,
        session_id,
        property_id: property_id.to_string(),
        source: source.to_string(),
    };
    client.toggle_favourite(&request).await
}

/// Fetches the visitor's favourites.
pub async fn get_favourites(client: &FavouritesClient, visitor_id: Uuid) -> Result<FavouritesList> {
    client.get_favourites(visitor_id).await
}

/// Whether one property is currently favourited. A full list fetch; there
/// is deliberately no cached set to consult.
pub async fn is_favourited(
    client: &FavouritesClient,
    visitor_id: Uuid,
    property_id: &str,
) -> Result<bool> {
    Ok(client.get_favourites(visitor_id).await?.contains(property_id))
}

/// The visitor's favourite count.
pub async fn favourites_count(client: &FavouritesClient, visitor_id: Uuid) -> Result<u64> {
    Ok(client.get_favourites(visitor_id).await?.count)
}
