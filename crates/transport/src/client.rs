//! Event delivery client.

use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, warn};
use validator::Validate;

use tracker_core::{Error, EventPayload, Result};

use crate::config::TransportConfig;

/// Path of the event ingestion endpoint.
const TRACK_EVENT_PATH: &str = "track-event";

/// Content type for beacon bodies. Beacons cannot set custom headers, and a
/// plain-text body keeps the request CORS-simple, so delivery never waits
/// on a preflight round trip the page teardown could interrupt.
const BEACON_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

/// Delivery client for canonical tracking events.
///
/// At-most-once, best-effort: no retries, and no error ever reaches the
/// caller. A broken tracking backend must never break the page.
#[derive(Clone)]
pub struct EventTransport {
    http: reqwest::Client,
    config: TransportConfig,
}

impl EventTransport {
    /// Creates a new transport.
    ///
    /// Missing configuration is detected here and logged once; the
    /// transport still constructs, and every send becomes a logged no-op.
    pub fn new(config: TransportConfig) -> Result<Self> {
        if !config.is_configured() {
            warn!("tracking API url/key not configured, events will be dropped");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Returns the underlying HTTP client, shared with the favourites API.
    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Awaitable send: JSON POST with the API key header.
    ///
    /// Used for everything that happens mid-session. Failures are logged
    /// with endpoint context and swallowed.
    pub async fn send_event(&self, payload: &EventPayload) {
        if !self.config.is_configured() {
            debug!(event_type = %payload.event_type, "transport not configured, dropping event");
            return;
        }

        if let Err(e) = payload.validate() {
            // The server enforces its own limits; this is observability only.
            warn!(event_type = %payload.event_type, error = %e, "event payload failed validation");
        }

        let endpoint = self.config.endpoint(TRACK_EVENT_PATH);
        let result = self
            .http
            .post(&endpoint)
            .header("x-api-key", &self.config.api_key)
            .json(payload)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    endpoint,
                    status = %response.status(),
                    event_type = %payload.event_type,
                    "event rejected by tracking API"
                );
            }
            Ok(_) => {
                debug!(event_type = %payload.event_type, "event delivered");
            }
            Err(e) => {
                warn!(endpoint, event_type = %payload.event_type, error = %e, "event delivery failed");
            }
        }
    }

    /// Fire-and-forget send for page-exit events.
    ///
    /// Dispatches a detached task and returns immediately. The API key
    /// travels as a query parameter and the body as a plain-text blob (see
    /// [`BEACON_CONTENT_TYPE`]). Returns `false` when the beacon primitive
    /// is unavailable (no async runtime on this thread); callers fall back
    /// to [`send_event`](Self::send_event).
    pub fn send_beacon(&self, payload: &EventPayload) -> bool {
        if !self.config.is_configured() {
            debug!(event_type = %payload.event_type, "transport not configured, dropping beacon");
            return true;
        }

        let url = match beacon_url(&self.config.endpoint(TRACK_EVENT_PATH), &self.config.api_key) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "invalid beacon endpoint, dropping event");
                return true;
            }
        };

        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to serialize beacon payload");
                return true;
            }
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime for beacon dispatch, falling back to awaitable send");
            return false;
        };

        let http = self.http.clone();
        let event_type = payload.event_type.clone();
        handle.spawn(async move {
            match http
                .post(url)
                .header(CONTENT_TYPE, BEACON_CONTENT_TYPE)
                .body(body)
                .send()
                .await
            {
                Ok(response) if !response.status().is_success() => {
                    debug!(event_type, status = %response.status(), "beacon rejected");
                }
                Ok(_) => debug!(event_type, "beacon delivered"),
                Err(e) => debug!(event_type, error = %e, "beacon delivery failed"),
            }
        });

        true
    }

    /// Delivery for events that coincide with page teardown or navigation.
    ///
    /// Prefers the beacon, and awaits a normal send only when the beacon
    /// path is unavailable. Callers choose this over [`send_event`] exactly
    /// when the triggering action may outlive the page; that is a
    /// reliability/latency tradeoff, not an implementation detail.
    pub async fn send_exit_event(&self, payload: &EventPayload) {
        if !self.send_beacon(payload) {
            self.send_event(payload).await;
        }
    }
}

/// Builds the beacon URL: the track-event endpoint with the API key as a
/// query parameter.
fn beacon_url(endpoint: &str, api_key: &str) -> Result<Url> {
    let mut url =
        Url::parse(endpoint).map_err(|e| Error::transport(format!("bad endpoint {endpoint}: {e}")))?;
    url.query_pairs_mut().append_pair("api_key", api_key);
    Ok(url)
}
