//! Generic interaction tracking.
//!
//! Contact clicks, non-navigating searches, filter changes, CTAs and
//! shares. Everything here happens mid-session, so it all takes the
//! awaitable fetch-style transport.

use serde_json::{json, Map, Value};

use tracker_core::{EventPayload, EventScope, SearchSubmission};
use tracker_transport::EventTransport;

/// Sends a `phone_click` event.
pub async fn track_phone_click(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: Option<&str>,
    source: &str,
) {
    let mut data = Map::new();
    if let Some(id) = property_id {
        data.insert("property_id".into(), json!(id));
    }
    data.insert("source".into(), json!(source));
    let payload = EventPayload::build("phone_click", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends an `email_click` event.
pub async fn track_email_click(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: Option<&str>,
    source: &str,
) {
    let mut data = Map::new();
    if let Some(id) = property_id {
        data.insert("property_id".into(), json!(id));
    }
    data.insert("source".into(), json!(source));
    let payload = EventPayload::build("email_click", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `search` event for a search that does NOT navigate away (ajax
/// refinement on a results page). Navigating searches go through the
/// store-and-forward path in [`crate::search`] instead.
pub async fn track_search(
    transport: &EventTransport,
    scope: &EventScope,
    submission: &SearchSubmission,
) {
    let payload = EventPayload::build("search", scope, Some(submission_event_data(submission)));
    transport.send_event(&payload).await;
}

/// Sends a `filter_change` event.
pub async fn track_filter_change(
    transport: &EventTransport,
    scope: &EventScope,
    filter_name: &str,
    value: Value,
) {
    let mut data = Map::new();
    data.insert("filter_name".into(), json!(filter_name));
    data.insert("value".into(), value);
    let payload = EventPayload::build("filter_change", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `cta_click` event.
pub async fn track_cta_click(
    transport: &EventTransport,
    scope: &EventScope,
    label: &str,
    destination: Option<&str>,
) {
    let mut data = Map::new();
    data.insert("label".into(), json!(label));
    if let Some(destination) = destination {
        data.insert("destination".into(), json!(destination));
    }
    let payload = EventPayload::build("cta_click", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `share` event for non-blog content.
pub async fn track_share(
    transport: &EventTransport,
    scope: &EventScope,
    content_type: &str,
    content_id: Option<&str>,
    platform: &str,
) {
    let mut data = Map::new();
    data.insert("content_type".into(), json!(content_type));
    if let Some(id) = content_id {
        data.insert("content_id".into(), json!(id));
    }
    data.insert("platform".into(), json!(platform));
    let payload = EventPayload::build("share", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Flattens a search submission into event data.
pub(crate) fn submission_event_data(submission: &SearchSubmission) -> Map<String, Value> {
    let mut data = match serde_json::to_value(submission) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    // Options serialize as null on SearchSubmission; drop them.
    data.retain(|_, v| !v.is_null());
    data.insert(
        "filters_count".into(),
        json!(submission.active_filter_count()),
    );
    data
}
