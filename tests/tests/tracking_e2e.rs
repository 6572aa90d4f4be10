//! Full tracking flows against the mock ingestion API.

use integration_tests::fixtures::{consented_storage, test_api_key, tracker_for};
use integration_tests::server::MockIngestionServer;

#[tokio::test]
async fn test_property_browse_flow() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());
    tracker.init().await;

    tracker
        .track_page_view(
            "https://hearth.example/property/prop-42",
            Some("3 bed semi, Leeds"),
            Some("https://hearth.example/search?location=Leeds"),
        )
        .await;
    tracker.track_property_view("prop-42").await;
    tracker.track_gallery_view("prop-42", Some(2)).await;
    tracker.track_virtual_tour_click("prop-42").await;

    let events = server.wait_for_events(4).await;
    assert_eq!(
        server.event_types(),
        vec![
            "page_view",
            "property_view",
            "gallery_view",
            "virtual_tour_click"
        ]
    );

    // Every event carries the same identity and the ambient page context.
    let session_id = events[0].payload["session_id"].as_str().unwrap().to_string();
    let visitor_id = events[0].payload["visitor_id"].as_str().unwrap().to_string();
    for event in &events {
        assert_eq!(event.payload["session_id"], session_id.as_str());
        assert_eq!(event.payload["visitor_id"], visitor_id.as_str());
        assert_eq!(
            event.payload["page_url"],
            "https://hearth.example/property/prop-42"
        );
        assert_eq!(event.header_api_key.as_deref(), Some(test_api_key().as_str()));
    }

    // Listing id is promoted to the top level.
    assert_eq!(events[1].payload["property_id"], "prop-42");
    assert_eq!(events[2].payload["event_data"]["image_index"], 2);
}

#[tokio::test]
async fn test_measured_exit_duration_uses_beacon() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());

    tracker
        .track_page_view("https://hearth.example/property/prop-7", None, None)
        .await;
    // Embedder-measured dwell above the floor goes out on the exit path.
    tracker.track_property_duration("prop-7", 42).await;

    server.wait_for_events(2).await;
    let durations = server.events_of_type("property_view_duration");
    assert_eq!(durations.len(), 1);
    assert_eq!(durations[0].payload["event_data"]["view_duration_seconds"], 42);

    // Exit delivery carries the key as a query parameter, not a header.
    assert_eq!(
        durations[0].query_api_key.as_deref(),
        Some(test_api_key().as_str())
    );
    assert_eq!(durations[0].header_api_key, None);
}

#[tokio::test]
async fn test_sub_floor_dwell_emits_no_duration() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());

    tracker.setup_property_duration_tracking("prop-9");
    // Exit signals arrive immediately, well under the 3 second floor.
    tracker.notify_visibility_hidden().await;
    tracker.notify_page_exit().await;

    server.settle().await;
    assert!(server.events_of_type("property_view_duration").is_empty());
}

#[tokio::test]
async fn test_blog_scroll_milestones_fire_once_each() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());

    tracker
        .track_page_view("https://hearth.example/blog/moving-guide", None, None)
        .await;
    tracker.track_blog_view("moving-guide").await;
    tracker.setup_blog_duration_tracking("moving-guide");

    // Jumpy scrolling: only the highest milestone at each step fires, and
    // a regression then a repeat add nothing.
    for pct in [10, 30, 60, 40, 60, 100] {
        tracker.record_scroll_depth(pct).await;
    }

    server.wait_for_events(5).await;
    let milestones: Vec<i64> = server
        .events_of_type("scroll_depth")
        .iter()
        .map(|e| e.payload["event_data"]["depth_percentage"].as_i64().unwrap())
        .collect();
    assert_eq!(milestones, vec![25, 50, 100]);
}

#[tokio::test]
async fn test_enquiry_funnel() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());

    tracker
        .track_page_view("https://hearth.example/property/prop-3", None, None)
        .await;
    tracker.setup_enquiry_form_tracking(Some("prop-3"));

    // Focus on two fields, then submit.
    tracker.notify_enquiry_field_focus().await;
    tracker.notify_enquiry_field_focus().await;
    tracker.notify_enquiry_submit(Some("viewing_request")).await;

    server.wait_for_events(3).await;
    assert_eq!(server.events_of_type("enquiry_started").len(), 1);

    let submitted = server.events_of_type("enquiry_submitted");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].payload["property_id"], "prop-3");
    assert_eq!(
        submitted[0].payload["event_data"]["enquiry_type"],
        "viewing_request"
    );
}

#[tokio::test]
async fn test_generic_event_and_interactions() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());

    tracker
        .track_page_view("https://hearth.example/contact", None, None)
        .await;
    tracker.track_phone_click(None, "footer").await;
    tracker
        .track_filter_change("bedrooms", serde_json::json!(3))
        .await;
    tracker
        .track_event("mortgage_calculator_used", None)
        .await;

    server.wait_for_events(4).await;
    assert_eq!(
        server.event_types(),
        vec![
            "page_view",
            "phone_click",
            "filter_change",
            "mortgage_calculator_used"
        ]
    );
}
