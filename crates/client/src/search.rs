//! Search store-and-forward.
//!
//! A navigating search submission cannot reliably finish a request before
//! the page is torn down, and beacons are finicky across browsers for this
//! case. So the submission is persisted synchronously before navigation
//! and replayed as a normal fetch-based event once the results page loads.
//! The record is deleted before sending (a refresh can never double-send)
//! and rejected when older than the staleness window.

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use url::Url;

use tracker_core::{
    EventPayload, EventScope, PendingSearchRecord, SearchSubmission, PENDING_SEARCH_STORAGE_KEY,
};
use tracker_storage::KeyValueStorage;
use tracker_transport::EventTransport;

/// Persists one pending search record, newest wins.
///
/// Called immediately before the navigation is initiated. Failures are
/// logged and swallowed; the search itself must never block on tracking.
pub fn store_search_for_tracking(storage: &dyn KeyValueStorage, submission: SearchSubmission) {
    let record = PendingSearchRecord::from_submission(submission, Utc::now());
    match serde_json::to_string(&record) {
        Ok(raw) => {
            if let Err(e) = storage.set(PENDING_SEARCH_STORAGE_KEY, &raw) {
                warn!(error = %e, "failed to persist pending search record");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize pending search record"),
    }
}

/// Replays the pending search record, if there is a fresh one.
///
/// Returns `true` when an event was forwarded. The record is consumed
/// (read then immediately deleted) whatever happens next, so at most one
/// page load ever replays it.
pub async fn send_pending_search_event(
    storage: &dyn KeyValueStorage,
    transport: &EventTransport,
    scope: &EventScope,
) -> bool {
    let raw = match storage.get(PENDING_SEARCH_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no pending search record");
            return false;
        }
        Err(e) => {
            warn!(error = %e, "failed to read pending search record");
            return false;
        }
    };

    // Consume before sending: a refresh must find nothing.
    if let Err(e) = storage.remove(PENDING_SEARCH_STORAGE_KEY) {
        warn!(error = %e, "failed to delete pending search record");
    }

    let record: PendingSearchRecord = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "corrupt pending search record, dropping");
            return false;
        }
    };

    let now = Utc::now();
    if record.is_stale(now) {
        debug!(age_ms = record.age_ms(now), "pending search record stale, dropping");
        return false;
    }

    let payload = EventPayload::build("search", scope, Some(pending_event_data(&record, now)));
    transport.send_event(&payload).await;
    true
}

/// Reconstructs a search submission from results-page query parameters.
///
/// Fallback for direct URL arrivals (bookmarks, shared links); used only
/// when [`send_pending_search_event`] found nothing. Returns `None` when
/// the URL is unparseable or carries no query parameters at all.
pub fn extract_search_params_from_url(page_url: &str) -> Option<SearchSubmission> {
    let url = Url::parse(page_url).ok()?;
    if url.query_pairs().next().is_none() {
        return None;
    }

    let mut submission = SearchSubmission {
        source_page: url.path().to_string(),
        source_component: "url_params".to_string(),
        ..Default::default()
    };

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "type" | "listing_type" => submission.listing_type = value.into_owned(),
            "location" => submission.location = Some(value.into_owned()),
            "postcode" => submission.postcode = Some(value.into_owned()),
            "min_price" => submission.min_price = value.parse().ok(),
            "max_price" => submission.max_price = value.parse().ok(),
            "bedrooms" => submission.bedrooms = value.parse().ok(),
            "bathrooms" => submission.bathrooms = value.parse().ok(),
            "property_type" => submission.property_type = Some(value.into_owned()),
            // Pagination/sorting are not search filters.
            "page" | "sort" => {}
            other => {
                submission
                    .filters
                    .insert(other.to_string(), Value::String(value.into_owned()));
            }
        }
    }

    Some(submission)
}

fn pending_event_data(record: &PendingSearchRecord, now: chrono::DateTime<Utc>) -> Map<String, Value> {
    let mut data = match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    // The store timestamp is internal; what observability wants is how
    // long the record waited across the navigation.
    data.remove("timestamp_ms");
    data.insert("tracking_delay_ms".into(), json!(record.age_ms(now)));
    data
}
