//! Common utilities and shared types for ripple.
//!
//! This crate provides foundational components used across all ripple crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Channel routing**: Broadcast channel name derivation via [`channels`]
//! - **Metrics**: Counter-based instrumentation via [`Metrics`]

pub mod channels;
pub mod config;
pub mod error;
pub mod id;
pub mod metrics;

pub use channels::{Channel, notification_channel, post_channel};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use metrics::{Metrics, MetricsSnapshot, get_metrics};
