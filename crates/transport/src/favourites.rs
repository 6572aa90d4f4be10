//! Favourites API client.
//!
//! Unlike event delivery, these calls return `Result`: the response is
//! user-visible state (heart icons, counters), so the UI layer decides how
//! to degrade. There is still no retry and no local cache; the remote API
//! is authoritative for the favourite set.

use tracing::debug;
use uuid::Uuid;

use tracker_core::{Error, FavouritesList, Result, ToggleFavouriteRequest, ToggleFavouriteResult};

use crate::config::TransportConfig;

const TOGGLE_FAVOURITE_PATH: &str = "toggle-favourite";
const GET_FAVOURITES_PATH: &str = "get-favourites";

/// Client for the favourites endpoints.
#[derive(Clone)]
pub struct FavouritesClient {
    http: reqwest::Client,
    config: TransportConfig,
}

impl FavouritesClient {
    /// Creates a client sharing the transport's HTTP client.
    pub fn new(http: reqwest::Client, config: TransportConfig) -> Self {
        Self { http, config }
    }

    /// Toggles a property in the visitor's favourites.
    pub async fn toggle_favourite(
        &self,
        request: &ToggleFavouriteRequest,
    ) -> Result<ToggleFavouriteResult> {
        if !self.config.is_configured() {
            return Err(Error::config("tracking API url/key not configured"));
        }

        let endpoint = self.config.endpoint(TOGGLE_FAVOURITE_PATH);
        let response = self
            .http
            .post(&endpoint)
            .header("x-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{endpoint}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "{endpoint}: status {}",
                response.status()
            )));
        }

        let result: ToggleFavouriteResult = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("{endpoint}: invalid response: {e}")))?;

        debug!(
            property_id = %request.property_id,
            is_favourited = result.is_favourited,
            "favourite toggled"
        );
        Ok(result)
    }

    /// Fetches the visitor's favourites.
    pub async fn get_favourites(&self, visitor_id: Uuid) -> Result<FavouritesList> {
        if !self.config.is_configured() {
            return Err(Error::config("tracking API url/key not configured"));
        }

        let endpoint = self.config.endpoint(GET_FAVOURITES_PATH);
        let response = self
            .http
            .get(&endpoint)
            .header("x-api-key", &self.config.api_key)
            .query(&[("visitor_id", visitor_id.to_string())])
            .send()
            .await
            .map_err(|e| Error::transport(format!("{endpoint}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "{endpoint}: status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::transport(format!("{endpoint}: invalid response: {e}")))
    }
}
