//! Hearth behavioural tracking SDK
//!
//! Headless smoke binary exercising the tracker the way an embedding
//! frontend would:
//! - consent decision, then identity/session bootstrap
//! - page and property events over the configured ingestion endpoint
//! - a navigating search persisted and replayed across "page loads"

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use tracker_client::{Tracker, TrackerConfig};
use tracker_core::{ConsentRecord, ConsentUpdate, SearchSubmission, CONSENT_STORAGE_KEY};
use tracker_storage::{FileStorage, KeyValueStorage};
use tracker_telemetry::init_tracing_from_env;

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    /// Directory the file-backed storage persists under.
    #[serde(default = "default_storage_dir")]
    storage_dir: String,

    #[serde(default)]
    tracker: TrackerConfig,
}

fn default_storage_dir() -> String {
    ".hearth".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            tracker: TrackerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Hearth tracker v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        api_url = %config.tracker.api_url,
        storage_dir = %config.storage_dir,
        "Loaded tracker config"
    );

    let storage = Arc::new(
        FileStorage::new(&config.storage_dir).context("Failed to open tracking storage")?,
    );

    let tracker =
        Tracker::new(config.tracker.clone(), storage.clone()).context("Failed to build tracker")?;

    // Stand-in for the consent banner: persist the decision, then notify.
    let consent = ConsentRecord::decided(true, false, "2024-03");
    storage
        .set(CONSENT_STORAGE_KEY, &serde_json::to_string(&consent)?)
        .context("Failed to persist consent decision")?;
    tracker.notify_consent_update(ConsentUpdate {
        analytics: true,
        marketing: false,
    });
    tracker.init().await;

    info!(
        visitor_id = %tracker.visitor_id(),
        session_id = %tracker.session_id(),
        "Identity established"
    );

    // A browse: landing page, then a property page with a duration timer.
    tracker
        .track_page_view("https://hearth.example/", Some("Hearth"), None)
        .await;
    tracker
        .track_page_view(
            "https://hearth.example/property/prop-42",
            Some("3 bed semi, Leeds"),
            Some("https://hearth.example/"),
        )
        .await;
    tracker.track_property_view("prop-42").await;
    tracker.setup_property_duration_tracking("prop-42");
    tracker.track_gallery_view("prop-42", Some(0)).await;
    tracker.notify_page_exit().await;

    // A navigating search: persist before "navigation", replay "on load".
    tracker.store_search_for_tracking(SearchSubmission {
        listing_type: "sale".to_string(),
        location: Some("Leeds".to_string()),
        min_price: Some(200_000),
        max_price: Some(350_000),
        bedrooms: Some(3),
        source_page: "/".to_string(),
        source_component: "hero_search".to_string(),
        ..Default::default()
    });
    tracker
        .track_page_view(
            "https://hearth.example/search?location=Leeds",
            Some("Search results"),
            Some("https://hearth.example/"),
        )
        .await;
    let replayed = tracker.send_pending_search_event().await;
    info!(replayed, "Pending search replay");

    info!(
        session_duration_secs = ?tracker.session_duration_secs(),
        "Done"
    );

    tracker.shutdown();
    Ok(())
}

fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("HEARTH")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested tracker config from environment
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(api_url) = std::env::var("HEARTH_TRACKER_API_URL") {
        config.tracker.api_url = api_url;
    }
    if let Ok(api_key) = std::env::var("HEARTH_TRACKER_API_KEY") {
        config.tracker.api_key = api_key;
    }
    if let Ok(enabled) = std::env::var("HEARTH_TRACKER_ENABLED") {
        config.tracker.enabled = enabled != "false" && enabled != "0";
    }
    if let Ok(debug) = std::env::var("HEARTH_TRACKER_DEBUG") {
        config.tracker.debug = debug == "true" || debug == "1";
    }
    if let Ok(dir) = std::env::var("HEARTH_STORAGE_DIR") {
        config.storage_dir = dir;
    }

    Ok(config)
}
