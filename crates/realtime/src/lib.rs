//! Realtime fan-out for ripple.
//!
//! Two halves share the channel contract from `ripple_common::channels`:
//!
//! - **Server side**: [`RedisPubSub`] publishes mutation events to the relay
//!   and fans received messages into a local broadcast for the WebSocket
//!   layer.
//! - **Client side**: [`client`] holds the per-session subscription
//!   registry, view-state reconciliation, and the optimistic-mutation
//!   runner.

pub mod client;
pub mod pubsub;

pub use client::{FeedViewState, InFlightGuard, SubscriptionManager};
pub use pubsub::{PubSubStreamBridge, RedisPubSub};
