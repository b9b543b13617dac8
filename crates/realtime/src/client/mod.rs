//! Client-side session components.
//!
//! A client session owns a [`SubscriptionManager`] tracking its visible post
//! channels, a [`FeedViewState`] reconciling incoming events, and an
//! [`InFlightGuard`] serializing optimistic mutations per post.

pub mod optimistic;
pub mod subscriptions;
pub mod view;

pub use optimistic::{InFlightGuard, Outcome};
pub use subscriptions::{ChannelTransport, SubscriptionManager};
pub use view::{FeedViewState, PostCounters};
