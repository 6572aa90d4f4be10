//! Blog engagement tracking.
//!
//! Read-duration tracking mirrors the property timer with a higher floor,
//! and adds monotonic scroll-depth milestones: each of 25/50/75/100% fires
//! at most once per page life, regressions and repeats below the running
//! max are ignored, and a jump reports only the highest milestone reached
//! (skipped intermediates are not back-filled).

use serde_json::{json, Map};
use std::time::Instant;
use tracing::debug;

use tracker_core::{EventPayload, EventScope};
use tracker_transport::EventTransport;

/// Duration floor for blog reads. Higher than the property floor: landing
/// on an article and bouncing takes longer than bouncing off a listing.
pub const MIN_BLOG_READ_SECS: u64 = 5;

/// Scroll-depth milestones, percent of article scrolled.
pub const SCROLL_MILESTONES: [u8; 4] = [25, 50, 75, 100];

/// Armed read timer and scroll state for one article page.
#[derive(Debug, Clone)]
pub struct BlogReadTimer {
    pub article_id: String,
    started_at: Instant,
    fired: bool,
    max_scroll_pct: u8,
    fired_milestones: [bool; 4],
}

impl BlogReadTimer {
    pub fn new(article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            started_at: Instant::now(),
            fired: false,
            max_scroll_pct: 0,
            fired_milestones: [false; 4],
        }
    }

    /// Deepest scroll position seen so far, percent.
    pub fn max_scroll_pct(&self) -> u8 {
        self.max_scroll_pct
    }

    /// Records a scroll position and returns the milestone to fire, if any.
    ///
    /// Positions at or below the running max are ignored, and each
    /// milestone fires at most once. A position is attributed to the
    /// highest milestone it reaches; milestones jumped over stay unfired.
    pub fn record_scroll(&mut self, scroll_pct: u8) -> Option<u8> {
        let scroll_pct = scroll_pct.min(100);
        if scroll_pct <= self.max_scroll_pct {
            return None;
        }
        self.max_scroll_pct = scroll_pct;

        let (index, milestone) = SCROLL_MILESTONES
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| scroll_pct >= **m)?;

        if self.fired_milestones[index] {
            return None;
        }
        self.fired_milestones[index] = true;
        Some(*milestone)
    }

    /// Consumes the single duration shot using the wall clock.
    pub fn take(&mut self) -> Option<u64> {
        let elapsed = self.started_at.elapsed().as_secs();
        self.take_at(elapsed)
    }

    /// Consumes the single duration shot at a given elapsed time.
    pub fn take_at(&mut self, elapsed_secs: u64) -> Option<u64> {
        if self.fired {
            return None;
        }
        self.fired = true;
        (elapsed_secs >= MIN_BLOG_READ_SECS).then_some(elapsed_secs)
    }
}

/// Sends a `blog_view` event.
pub async fn track_blog_view(transport: &EventTransport, scope: &EventScope, article_id: &str) {
    let mut data = Map::new();
    data.insert("article_id".into(), json!(article_id));
    let payload = EventPayload::build("blog_view", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `blog_read_duration` event for a finished read.
///
/// Exit-coincident, so it rides the beacon path.
pub async fn track_blog_duration(
    transport: &EventTransport,
    scope: &EventScope,
    article_id: &str,
    read_duration_seconds: u64,
    max_scroll_pct: Option<u8>,
) {
    if read_duration_seconds < MIN_BLOG_READ_SECS {
        debug!(
            article_id,
            read_duration_seconds, "blog read under duration floor, not tracked"
        );
        return;
    }

    let mut data = Map::new();
    data.insert("article_id".into(), json!(article_id));
    data.insert(
        "read_duration_seconds".into(),
        json!(read_duration_seconds),
    );
    if let Some(pct) = max_scroll_pct {
        data.insert("max_scroll_pct".into(), json!(pct));
    }
    let payload = EventPayload::build("blog_read_duration", scope, Some(data));
    transport.send_exit_event(&payload).await;
}

/// Sends a `scroll_depth` milestone event.
pub async fn track_scroll_milestone(
    transport: &EventTransport,
    scope: &EventScope,
    article_id: &str,
    milestone_pct: u8,
) {
    let mut data = Map::new();
    data.insert("article_id".into(), json!(article_id));
    data.insert("depth_percentage".into(), json!(milestone_pct));
    let payload = EventPayload::build("scroll_depth", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `blog_share` event.
pub async fn track_blog_share(
    transport: &EventTransport,
    scope: &EventScope,
    article_id: &str,
    platform: &str,
) {
    let mut data = Map::new();
    data.insert("article_id".into(), json!(article_id));
    data.insert("platform".into(), json!(platform));
    let payload = EventPayload::build("blog_share", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `blog_link_click` event for an outbound link in an article.
pub async fn track_blog_link_click(
    transport: &EventTransport,
    scope: &EventScope,
    article_id: &str,
    link_url: &str,
) {
    let mut data = Map::new();
    data.insert("article_id".into(), json!(article_id));
    data.insert("link_url".into(), json!(link_url));
    let payload = EventPayload::build("blog_link_click", scope, Some(data));
    transport.send_event(&payload).await;
}

/// Sends a `related_article_click` event.
pub async fn track_related_article_click(
    transport: &EventTransport,
    scope: &EventScope,
    article_id: &str,
    related_article_id: &str,
) {
    let mut data = Map::new();
    data.insert("article_id".into(), json!(article_id));
    data.insert("related_article_id".into(), json!(related_article_id));
    let payload = EventPayload::build("related_article_click", scope, Some(data));
    transport.send_event(&payload).await;
}
