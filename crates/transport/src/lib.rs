//! HTTP event delivery for the Hearth tracking SDK.
//!
//! Two delivery mechanisms with one contract between them: the awaitable
//! fetch-style send is used mid-session, the fire-and-forget beacon-style
//! send exactly where the page may be torn down before a normal request
//! completes (duration/exit events). Event delivery never returns errors to
//! the caller; the favourites client does, because its responses carry
//! user-visible state.

pub mod client;
pub mod config;
pub mod favourites;

pub use client::EventTransport;
pub use config::TransportConfig;
pub use favourites::FavouritesClient;
