//! Structured logging setup for the Hearth tracking SDK.
//!
//! The SDK itself only emits `tracing` events; installing a subscriber is
//! the embedding application's call. This crate is the setup used by the
//! smoke binary and any embedder that wants the same defaults.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, init_tracing_from_env, TelemetryConfig};
