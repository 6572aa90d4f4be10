//! Property engagement tracking.
//!
//! Translation functions from property-page actions to canonical events,
//! plus the ephemeral view timer the facade owns and passes in. The timer
//! is the `armed → tracked-once` state machine: armed by the setup call,
//! consumed by whichever exit signal arrives first.

use serde_json::{json, Map};
use std::time::Instant;
use tracing::debug;

use tracker_core::{EventPayload, EventScope};
use tracker_transport::EventTransport;

/// Duration floor for property views. Anything shorter is an instant
/// bounce and sends nothing.
pub const MIN_PROPERTY_VIEW_SECS: u64 = 3;

/// Armed view timer for one property page.
#[derive(Debug, Clone)]
pub struct PropertyViewTimer {
    pub property_id: String,
    started_at: Instant,
    fired: bool,
}

impl PropertyViewTimer {
    pub fn new(property_id: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            started_at: Instant::now(),
            fired: false,
        }
    }

    /// Consumes the single shot using the wall clock.
    pub fn take(&mut self) -> Option<u64> {
        let elapsed = self.started_at.elapsed().as_secs();
        self.take_at(elapsed)
    }

    /// Consumes the single shot at a given elapsed time.
    ///
    /// The first exit signal consumes the arm whether or not the floor is
    /// met; later signals return `None` either way.
    pub fn take_at(&mut self, elapsed_secs: u64) -> Option<u64> {
        if self.fired {
            return None;
        }
        self.fired = true;
        (elapsed_secs >= MIN_PROPERTY_VIEW_SECS).then_some(elapsed_secs)
    }
}

/// Sends a `property_view` event.
pub async fn track_property_view(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: &str,
) {
    let mut data = Map::new();
    data.insert("property_id".into(), json!(property_id));
    let payload = EventPayload::build("property_view", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `property_view_duration` event for a finished view.
///
/// Exit-coincident, so it rides the beacon path. Durations under the floor
/// send nothing.
pub async fn track_property_duration(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: &str,
    view_duration_seconds: u64,
) {
    if view_duration_seconds < MIN_PROPERTY_VIEW_SECS {
        debug!(
            property_id,
            view_duration_seconds, "property view under duration floor, not tracked"
        );
        return;
    }

    let mut data = Map::new();
    data.insert("property_id".into(), json!(property_id));
    data.insert(
        "view_duration_seconds".into(),
        json!(view_duration_seconds),
    );
    let payload = EventPayload::build("property_view_duration", scope, Some(data));
    transport.send_exit_event(&payload).await;
}

/// Sends a `virtual_tour_click` event.
pub async fn track_virtual_tour_click(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: &str,
) {
    let mut data = Map::new();
    data.insert("property_id".into(), json!(property_id));
    let payload = EventPayload::build("virtual_tour_click", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `map_view` event; `property_id` is absent on the area-wide map.
pub async fn track_map_view(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: Option<&str>,
) {
    let mut data = Map::new();
    if let Some(id) = property_id {
        data.insert("property_id".into(), json!(id));
    }
    let payload = EventPayload::build("map_view", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `gallery_view` event.
pub async fn track_gallery_view(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: &str,
    image_index: Option<u32>,
) {
    let mut data = Map::new();
    data.insert("property_id".into(), json!(property_id));
    if let Some(index) = image_index {
        data.insert("image_index".into(), json!(index));
    }
    let payload = EventPayload::build("gallery_view", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `similar_properties_click` event.
pub async fn track_similar_properties_click(
    transport: &EventTransport,
    scope: &EventScope,
    property_id: &str,
) {
    let mut data = Map::new();
    data.insert("property_id".into(), json!(property_id));
    let payload = EventPayload::build("similar_properties_click", scope, Some(data));
    transport.send_event(&payload).await;
}
