//! HTTP API layer for ripple.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: feed, post mutations (like/comment/repost),
//!   notifications, search
//! - **Extractors**: authentication via request extensions
//! - **Middleware**: bearer-token auth
//! - **Streaming**: WebSocket fan-out of realtime events
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod streaming;

pub use endpoints::router;
pub use streaming::{StreamingState, streaming_handler};
