//! The tracker facade.
//!
//! One `Tracker` per page, owning the consent flag, the session manager,
//! the transports, and every piece of ephemeral per-page state (armed
//! timers, enquiry form state, ambient page context). Every public
//! tracking method runs the same guard before doing any work: disabled or
//! unconsented means a silent no-op, before any event is built and before
//! any session/visitor state is touched.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use tracker_core::{
    ConsentUpdate, Error, EventPayload, EventScope, FavouritesList, PageContext, Result,
    SearchSubmission, ToggleFavouriteResult,
};
use tracker_storage::KeyValueStorage;
use tracker_transport::{EventTransport, FavouritesClient, TransportConfig};

use crate::blog::{self, BlogReadTimer};
use crate::consent::{ConsentListener, ConsentStore, SubscriptionId};
use crate::enquiry::{self, EnquiryFormState};
use crate::favourites;
use crate::interaction;
use crate::property::{self, PropertyViewTimer};
use crate::search;
use crate::session::SessionManager;

/// Tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the tracking API.
    pub api_url: String,
    /// API key for the tracking API.
    pub api_key: String,
    /// Master switch; when false every method is a no-op.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Log every dispatched event at info level.
    #[serde(default)]
    pub debug: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            enabled: default_enabled(),
            debug: false,
        }
    }
}

/// Stateful tracking facade consumed by page/UI code.
pub struct Tracker {
    storage: Arc<dyn KeyValueStorage>,
    consent: Arc<ConsentStore>,
    sessions: SessionManager,
    transport: EventTransport,
    favourites: FavouritesClient,

    /// Consent flag shared with the subscribed listener callbacks.
    consent_given: Arc<AtomicBool>,
    enabled: AtomicBool,
    debug: AtomicBool,
    initialized: AtomicBool,

    // Ephemeral per-page state, owned here and passed into domain modules.
    page: Mutex<PageContext>,
    property_timer: Mutex<Option<PropertyViewTimer>>,
    blog_timer: Mutex<Option<BlogReadTimer>>,
    enquiry_form: Mutex<Option<EnquiryFormState>>,

    consent_subscription: Mutex<Option<SubscriptionId>>,
}

impl Tracker {
    /// Builds a tracker over the given storage.
    ///
    /// The consent flag is seeded from the persisted decision and then kept
    /// current by a listener subscribed to the consent store; the banner's
    /// notifications reach it through [`notify_consent_update`](Self::notify_consent_update).
    pub fn new(config: TrackerConfig, storage: Arc<dyn KeyValueStorage>) -> Result<Self> {
        let transport_config = TransportConfig::new(&config.api_url, &config.api_key);
        let transport = EventTransport::new(transport_config.clone())?;
        let favourites = FavouritesClient::new(transport.http(), transport_config);

        let consent = Arc::new(ConsentStore::new(storage.clone()));
        let sessions = SessionManager::new(storage.clone(), consent.clone());

        let consent_given = Arc::new(AtomicBool::new(consent.has_analytics_consent()));

        let subscription = {
            let granted_flag = consent_given.clone();
            let revoked_flag = consent_given.clone();
            consent.subscribe(ConsentListener {
                on_granted: Box::new(move || {
                    granted_flag.store(true, Ordering::SeqCst);
                }),
                on_revoked: Box::new(move || {
                    revoked_flag.store(false, Ordering::SeqCst);
                }),
            })
        };

        Ok(Self {
            storage,
            consent,
            sessions,
            transport,
            favourites,
            consent_given,
            enabled: AtomicBool::new(config.enabled),
            debug: AtomicBool::new(config.debug),
            initialized: AtomicBool::new(false),
            page: Mutex::new(PageContext::default()),
            property_timer: Mutex::new(None),
            blog_timer: Mutex::new(None),
            enquiry_form: Mutex::new(None),
            consent_subscription: Mutex::new(Some(subscription)),
        })
    }

    // ---- lifecycle ----------------------------------------------------

    /// Initializes the tracker for this page.
    ///
    /// Idempotent, and itself consent-gated: without analytics consent it
    /// logs and returns without marking itself initialized, so a later
    /// call after consent arrives still works. On the page that follows a
    /// navigating search, this is where the pending record gets replayed.
    pub async fn init(&self) {
        if !self.should_track() {
            info!("tracker init skipped: disabled or no analytics consent");
            return;
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("tracker already initialized");
            return;
        }

        debug!("tracker initialized");
        self.send_pending_search_event().await;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Manual consent override, mirroring the automatic listener. Used
    /// when the tracker is constructed after the decision already exists.
    pub fn set_consent(&self, granted: bool) {
        self.consent_given.store(granted, Ordering::SeqCst);
        debug!(granted, "consent set manually");
    }

    pub fn has_consent(&self) -> bool {
        self.consent_given.load(Ordering::SeqCst)
    }

    /// Relays a consent banner notification to the consent store, whose
    /// listeners in turn update this tracker's flag.
    pub fn notify_consent_update(&self, update: ConsentUpdate) {
        self.consent.handle_consent_update(update);
    }

    pub fn consent_store(&self) -> Arc<ConsentStore> {
        self.consent.clone()
    }

    pub fn set_tracking_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::SeqCst);
    }

    /// Removes everything persisted about this visitor. Exposed for the
    /// consent banner's revoke path; the tracker does not call it itself.
    pub fn clear_all_tracking_data(&self) {
        self.sessions.clear_all_tracking_data();
    }

    /// Unsubscribes from consent notifications. Also runs on drop; long
    /// lived single-page-app contexts should call it at teardown.
    pub fn shutdown(&self) {
        if let Some(id) = self.consent_subscription.lock().take() {
            self.consent.unsubscribe(id);
        }
    }

    // ---- identity -----------------------------------------------------

    /// The current session id.
    ///
    /// This is the conflated accessor: every call records one page
    /// activity (see [`SessionManager::record_activity_and_session_id`]).
    /// Not gated: without analytics consent the session lives only in
    /// memory, so the caller always gets an id and persistence stays
    /// consent-gated underneath.
    pub fn session_id(&self) -> Uuid {
        self.sessions.record_activity_and_session_id()
    }

    /// The visitor id. Without analytics consent this is a
    /// process-lifetime id, never persisted and regenerated on reload.
    pub fn visitor_id(&self) -> Uuid {
        self.sessions.visitor_id()
    }

    /// Seconds since the current session began. Non-mutating.
    pub fn session_duration_secs(&self) -> Option<i64> {
        self.sessions.session_duration_secs()
    }

    // ---- page + generic -----------------------------------------------

    /// Records a page view and updates the ambient page context every
    /// subsequent event on this page is built from.
    pub async fn track_page_view(
        &self,
        url: &str,
        title: Option<&str>,
        referrer: Option<&str>,
    ) {
        if !self.should_track() {
            return;
        }
        *self.page.lock() = PageContext::new(
            url,
            title.map(str::to_string),
            referrer.map(str::to_string),
        );

        let scope = self.event_scope();
        let payload = EventPayload::build("page_view", &scope, None);
        self.transport.send_event(&payload).await;
        self.log_dispatch("page_view");
    }

    /// Sends a free-form event.
    pub async fn track_event(&self, event_type: &str, data: Option<Map<String, Value>>) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        let payload = EventPayload::build(event_type, &scope, data);
        self.transport.send_event(&payload).await;
        self.log_dispatch(event_type);
    }

    // ---- property -----------------------------------------------------

    pub async fn track_property_view(&self, property_id: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        property::track_property_view(&self.transport, &scope, property_id).await;
        self.log_dispatch("property_view");
    }

    /// Arms the property view timer for this page.
    pub fn setup_property_duration_tracking(&self, property_id: &str) {
        if !self.should_track() {
            return;
        }
        *self.property_timer.lock() = Some(PropertyViewTimer::new(property_id));
    }

    /// Sends a property duration directly (the embedder measured it).
    pub async fn track_property_duration(&self, property_id: &str, view_duration_seconds: u64) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        property::track_property_duration(
            &self.transport,
            &scope,
            property_id,
            view_duration_seconds,
        )
        .await;
        self.log_dispatch("property_view_duration");
    }

    pub async fn track_virtual_tour_click(&self, property_id: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        property::track_virtual_tour_click(&self.transport, &scope, property_id).await;
        self.log_dispatch("virtual_tour_click");
    }

    pub async fn track_map_view(&self, property_id: Option<&str>) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        property::track_map_view(&self.transport, &scope, property_id).await;
        self.log_dispatch("map_view");
    }

    pub async fn track_gallery_view(&self, property_id: &str, image_index: Option<u32>) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        property::track_gallery_view(&self.transport, &scope, property_id, image_index).await;
        self.log_dispatch("gallery_view");
    }

    pub async fn track_similar_properties_click(&self, property_id: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        property::track_similar_properties_click(&self.transport, &scope, property_id).await;
        self.log_dispatch("similar_properties_click");
    }

    // ---- blog ---------------------------------------------------------

    pub async fn track_blog_view(&self, article_id: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        blog::track_blog_view(&self.transport, &scope, article_id).await;
        self.log_dispatch("blog_view");
    }

    /// Arms the blog read timer (duration and scroll depth) for this page.
    pub fn setup_blog_duration_tracking(&self, article_id: &str) {
        if !self.should_track() {
            return;
        }
        *self.blog_timer.lock() = Some(BlogReadTimer::new(article_id));
    }

    /// Sends a blog read duration directly (the embedder measured it).
    pub async fn track_blog_duration(
        &self,
        article_id: &str,
        read_duration_seconds: u64,
        max_scroll_pct: Option<u8>,
    ) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        blog::track_blog_duration(
            &self.transport,
            &scope,
            article_id,
            read_duration_seconds,
            max_scroll_pct,
        )
        .await;
        self.log_dispatch("blog_read_duration");
    }

    /// Feeds a scroll position to the armed blog timer, firing a milestone
    /// event when a new 25/50/75/100% threshold is crossed.
    pub async fn record_scroll_depth(&self, scroll_pct: u8) {
        if !self.should_track() {
            return;
        }
        let fired = {
            let mut timer = self.blog_timer.lock();
            timer.as_mut().and_then(|t| {
                t.record_scroll(scroll_pct)
                    .map(|milestone| (t.article_id.clone(), milestone))
            })
        };

        if let Some((article_id, milestone)) = fired {
            let scope = self.event_scope();
            blog::track_scroll_milestone(&self.transport, &scope, &article_id, milestone).await;
            self.log_dispatch("scroll_depth");
        }
    }

    pub async fn track_blog_share(&self, article_id: &str, platform: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        blog::track_blog_share(&self.transport, &scope, article_id, platform).await;
        self.log_dispatch("blog_share");
    }

    pub async fn track_blog_link_click(&self, article_id: &str, link_url: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        blog::track_blog_link_click(&self.transport, &scope, article_id, link_url).await;
        self.log_dispatch("blog_link_click");
    }

    pub async fn track_related_article_click(&self, article_id: &str, related_article_id: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        blog::track_related_article_click(&self.transport, &scope, article_id, related_article_id)
            .await;
        self.log_dispatch("related_article_click");
    }

    // ---- exit signals -------------------------------------------------

    /// The embedder's `beforeunload`/`pagehide` signal. Fires any armed
    /// duration timers, each at most once across all exit signals.
    pub async fn notify_page_exit(&self) {
        self.fire_armed_timers().await;
    }

    /// The embedder's tab-hidden (`visibilitychange`) signal. Same
    /// single-shot timers as [`notify_page_exit`]: whichever signal
    /// arrives first wins.
    pub async fn notify_visibility_hidden(&self) {
        self.fire_armed_timers().await;
    }

    async fn fire_armed_timers(&self) {
        if !self.should_track() {
            return;
        }

        let property_fired = {
            let mut timer = self.property_timer.lock();
            timer
                .as_mut()
                .and_then(|t| t.take().map(|secs| (t.property_id.clone(), secs)))
        };
        if let Some((property_id, secs)) = property_fired {
            let scope = self.event_scope();
            property::track_property_duration(&self.transport, &scope, &property_id, secs).await;
            self.log_dispatch("property_view_duration");
        }

        let blog_fired = {
            let mut timer = self.blog_timer.lock();
            timer.as_mut().and_then(|t| {
                t.take()
                    .map(|secs| (t.article_id.clone(), secs, t.max_scroll_pct()))
            })
        };
        if let Some((article_id, secs, max_scroll)) = blog_fired {
            let scope = self.event_scope();
            blog::track_blog_duration(
                &self.transport,
                &scope,
                &article_id,
                secs,
                Some(max_scroll),
            )
            .await;
            self.log_dispatch("blog_read_duration");
        }
    }

    // ---- interactions -------------------------------------------------

    pub async fn track_phone_click(&self, property_id: Option<&str>, source: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        interaction::track_phone_click(&self.transport, &scope, property_id, source).await;
        self.log_dispatch("phone_click");
    }

    pub async fn track_email_click(&self, property_id: Option<&str>, source: &str) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        interaction::track_email_click(&self.transport, &scope, property_id, source).await;
        self.log_dispatch("email_click");
    }

    /// Tracks a non-navigating search (ajax refinement). Navigating
    /// searches use [`store_search_for_tracking`](Self::store_search_for_tracking).
    pub async fn track_search(&self, submission: &SearchSubmission) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        interaction::track_search(&self.transport, &scope, submission).await;
        self.log_dispatch("search");
    }

    pub async fn track_filter_change(&self, filter_name: &str, value: Value) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        interaction::track_filter_change(&self.transport, &scope, filter_name, value).await;
        self.log_dispatch("filter_change");
    }

    pub async fn track_cta_click(&self, label: &str, destination: Option<&str>) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        interaction::track_cta_click(&self.transport, &scope, label, destination).await;
        self.log_dispatch("cta_click");
    }

    pub async fn track_share(
        &self,
        content_type: &str,
        content_id: Option<&str>,
        platform: &str,
    ) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        interaction::track_share(&self.transport, &scope, content_type, content_id, platform)
            .await;
        self.log_dispatch("share");
    }

    // ---- enquiry funnel ------------------------------------------------

    pub async fn track_enquiry_started(&self, property_id: Option<&str>) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        enquiry::track_enquiry_started(&self.transport, &scope, property_id).await;
        self.log_dispatch("enquiry_started");
    }

    pub async fn track_enquiry_submitted(
        &self,
        property_id: Option<&str>,
        enquiry_type: Option<&str>,
    ) {
        if !self.should_track() {
            return;
        }
        let scope = self.event_scope();
        enquiry::track_enquiry_submitted(&self.transport, &scope, property_id, enquiry_type).await;
        self.log_dispatch("enquiry_submitted");
    }

    /// Arms auto-tracking for one enquiry form instance.
    pub fn setup_enquiry_form_tracking(&self, property_id: Option<&str>) {
        if !self.should_track() {
            return;
        }
        *self.enquiry_form.lock() = Some(EnquiryFormState::new(property_id.map(str::to_string)));
    }

    /// The embedder's field-focus signal; fires `enquiry_started` exactly
    /// once per form instance.
    pub async fn notify_enquiry_field_focus(&self) {
        if !self.should_track() {
            return;
        }
        let started = {
            let mut form = self.enquiry_form.lock();
            form.as_mut()
                .and_then(|f| f.take_started().then(|| f.property_id.clone()))
        };
        if let Some(property_id) = started {
            let scope = self.event_scope();
            enquiry::track_enquiry_started(&self.transport, &scope, property_id.as_deref()).await;
            self.log_dispatch("enquiry_started");
        }
    }

    /// The embedder's submit signal; fires `enquiry_submitted` whatever
    /// the validation outcome.
    pub async fn notify_enquiry_submit(&self, enquiry_type: Option<&str>) {
        if !self.should_track() {
            return;
        }
        let property_id = self
            .enquiry_form
            .lock()
            .as_ref()
            .and_then(|f| f.property_id.clone());
        let scope = self.event_scope();
        enquiry::track_enquiry_submitted(
            &self.transport,
            &scope,
            property_id.as_deref(),
            enquiry_type,
        )
        .await;
        self.log_dispatch("enquiry_submitted");
    }

    // ---- search store-and-forward --------------------------------------

    /// Persists a navigating search for replay on the results page. Call
    /// synchronously before initiating the navigation.
    pub fn store_search_for_tracking(&self, submission: SearchSubmission) {
        if !self.should_track() {
            return;
        }
        search::store_search_for_tracking(self.storage.as_ref(), submission);
    }

    /// Replays the pending search record, if a fresh one exists. Returns
    /// whether an event was forwarded. Also run by [`init`](Self::init).
    pub async fn send_pending_search_event(&self) -> bool {
        if !self.should_track() {
            return false;
        }
        let scope = self.event_scope();
        let sent =
            search::send_pending_search_event(self.storage.as_ref(), &self.transport, &scope)
                .await;
        if sent {
            self.log_dispatch("search");
        }
        sent
    }

    /// Fallback for direct URL arrivals on a results page: reconstructs
    /// the search from query parameters and tracks it. Only for when
    /// [`send_pending_search_event`](Self::send_pending_search_event)
    /// found nothing.
    pub async fn track_search_from_url(&self, page_url: &str) -> bool {
        if !self.should_track() {
            return false;
        }
        match search::extract_search_params_from_url(page_url) {
            Some(submission) => {
                self.track_search(&submission).await;
                true
            }
            None => false,
        }
    }

    // ---- favourites ----------------------------------------------------

    /// Toggles a favourite. Needs a visitor identity, so it requires
    /// consent; mutating silently with a throwaway id would corrupt the
    /// remote set.
    pub async fn toggle_favourite(
        &self,
        property_id: &str,
        source: &str,
    ) -> Result<ToggleFavouriteResult> {
        if !self.should_track() {
            return Err(Error::ConsentRequired);
        }
        let visitor_id = self.sessions.visitor_id();
        let session_id = self.sessions.record_activity_and_session_id();
        favourites::toggle_favourite(&self.favourites, visitor_id, session_id, property_id, source)
            .await
    }

    /// The visitor's favourites; empty without consent.
    pub async fn get_favourites(&self) -> Result<FavouritesList> {
        if !self.should_track() {
            return Ok(FavouritesList::default());
        }
        favourites::get_favourites(&self.favourites, self.sessions.visitor_id()).await
    }

    /// Whether one property is favourited; `false` without consent or on
    /// any API failure (logged, never surfaced).
    pub async fn is_favourited(&self, property_id: &str) -> bool {
        if !self.should_track() {
            return false;
        }
        match favourites::is_favourited(&self.favourites, self.sessions.visitor_id(), property_id)
            .await
        {
            Ok(favourited) => favourited,
            Err(e) => {
                debug!(error = %e, property_id, "favourite lookup failed");
                false
            }
        }
    }

    /// The visitor's favourite count; zero without consent or on failure.
    pub async fn favourites_count(&self) -> u64 {
        if !self.should_track() {
            return 0;
        }
        match favourites::favourites_count(&self.favourites, self.sessions.visitor_id()).await {
            Ok(count) => count,
            Err(e) => {
                debug!(error = %e, "favourite count lookup failed");
                0
            }
        }
    }

    // ---- internals -----------------------------------------------------

    /// The guard every public tracking method runs first. No event is
    /// built and no session/visitor state is touched when it fails.
    fn should_track(&self) -> bool {
        if !self.enabled.load(Ordering::SeqCst) {
            debug!("tracking disabled, skipping");
            return false;
        }
        if !self.consent_given.load(Ordering::SeqCst) {
            debug!("analytics consent absent, skipping");
            return false;
        }
        true
    }

    /// Snapshots the ambient state an event is built from. Bumps the
    /// session activity counter: one event, one page activity.
    fn event_scope(&self) -> EventScope {
        EventScope {
            session_id: self.sessions.record_activity_and_session_id(),
            visitor_id: self.sessions.visitor_id(),
            page: self.page.lock().clone(),
        }
    }

    fn log_dispatch(&self, event_type: &str) {
        if self.debug.load(Ordering::SeqCst) {
            info!(event_type, "tracking event dispatched");
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
