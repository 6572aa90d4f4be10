//! Favourites round trips against the mock API.

use std::sync::Arc;

use integration_tests::fixtures::{consented_storage, tracker_for};
use integration_tests::server::MockIngestionServer;
use tracker_core::Error;
use tracker_storage::MemoryStorage;

#[tokio::test]
async fn test_toggle_round_trip() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());

    let toggled = tracker.toggle_favourite("prop-42", "listing_card").await.unwrap();
    assert!(toggled.is_favourited);
    assert_eq!(toggled.count, 1);

    assert!(tracker.is_favourited("prop-42").await);
    assert!(!tracker.is_favourited("prop-7").await);
    assert_eq!(tracker.favourites_count().await, 1);

    // Toggling again removes it.
    let untoggled = tracker.toggle_favourite("prop-42", "listing_card").await.unwrap();
    assert!(!untoggled.is_favourited);
    assert_eq!(untoggled.count, 0);
    assert!(!tracker.is_favourited("prop-42").await);
}

#[tokio::test]
async fn test_get_favourites_lists_all() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, consented_storage());

    tracker.toggle_favourite("prop-1", "listing_card").await.unwrap();
    tracker.toggle_favourite("prop-2", "detail_page").await.unwrap();

    let list = tracker.get_favourites().await.unwrap();
    assert_eq!(list.count, 2);
    assert!(list.contains("prop-1"));
    assert!(list.contains("prop-2"));
}

#[tokio::test]
async fn test_unconsented_favourites_degrade() {
    let server = MockIngestionServer::start().await;
    let tracker = tracker_for(&server.url, Arc::new(MemoryStorage::new()));

    // Mutation needs an identity, so it refuses outright.
    let result = tracker.toggle_favourite("prop-1", "listing_card").await;
    assert!(matches!(result, Err(Error::ConsentRequired)));

    // Reads degrade to empty instead of erroring.
    assert!(tracker.get_favourites().await.unwrap().favourites.is_empty());
    assert!(!tracker.is_favourited("prop-1").await);
    assert_eq!(tracker.favourites_count().await, 0);

    server.settle().await;
    assert_eq!(server.event_count(), 0);
}

#[tokio::test]
async fn test_unreachable_api_surfaces_transport_error() {
    // Nothing listening on this port.
    let tracker = tracker_for("http://127.0.0.1:9", consented_storage());

    let result = tracker.toggle_favourite("prop-1", "listing_card").await;
    assert!(matches!(result, Err(Error::Transport(_))));

    // Predicates swallow the failure.
    assert!(!tracker.is_favourited("prop-1").await);
    assert_eq!(tracker.favourites_count().await, 0);
}
