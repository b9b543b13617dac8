//! Broadcast channel name derivation.
//!
//! Publishers and subscribers agree on channel identity solely through these
//! derivations. Any mismatch silently breaks delivery, so every channel name
//! in the system must come from here.

/// Prefix for per-post update channels.
pub const POST_PREFIX: &str = "post-";
/// Prefix for per-user notification channels.
pub const NOTIFICATION_PREFIX: &str = "notifications-";

/// Channel for updates to a single post (likes, comments, reposts).
#[must_use]
pub fn post_channel(post_id: &str) -> String {
    format!("{POST_PREFIX}{post_id}")
}

/// Channel for a user's personal notification stream.
#[must_use]
pub fn notification_channel(user_id: &str) -> String {
    format!("{NOTIFICATION_PREFIX}{user_id}")
}

/// A parsed channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// Per-post update channel carrying the post id.
    Post(String),
    /// Per-user notification channel carrying the user id.
    Notifications(String),
}

impl Channel {
    /// Parse a channel name back into its family and entity id.
    ///
    /// Returns `None` for names that neither family produces.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(post_id) = name.strip_prefix(POST_PREFIX) {
            return Some(Self::Post(post_id.to_string()));
        }
        if let Some(user_id) = name.strip_prefix(NOTIFICATION_PREFIX) {
            return Some(Self::Notifications(user_id.to_string()));
        }
        None
    }
}
