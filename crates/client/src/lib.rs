//! Behavioural tracking client for the Hearth property platform.
//!
//! Composition, leaves first: the consent store gates everything; the
//! session manager derives visitor/session identity over persisted storage;
//! domain modules translate semantic actions (property viewed, blog read,
//! enquiry submitted) into canonical events and pick the right transport
//! for each; the search module store-and-forwards submissions across
//! navigations; and the [`Tracker`] facade wires it all together behind a
//! consent-and-enabled guard.

pub mod blog;
pub mod consent;
pub mod enquiry;
pub mod favourites;
pub mod interaction;
pub mod property;
pub mod search;
pub mod session;
pub mod tracker;

pub use consent::{ConsentListener, ConsentStore, SubscriptionId};
pub use session::SessionManager;
pub use tracker::{Tracker, TrackerConfig};
