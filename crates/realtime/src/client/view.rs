//! Client view-state reconciliation.
//!
//! Incoming `post-updated` events carry absolute counter values, so applying
//! one is a pure overwrite: replaying or duplicating the same event is
//! harmless. Events originating from this client's own identity are
//! discarded: the optimistic local update is already authoritative and
//! re-applying the echo would double-count.
//!
//! A late event can still overwrite a newer one (no cross-event ordering on
//! the wire); the store remains the source of truth on the next full fetch.

use ripple_core::services::PostUpdated;
use std::collections::{HashMap, HashSet};

/// Cached counters for one post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostCounters {
    pub like_count: i32,
    pub comment_count: i32,
    pub repost_count: i32,
}

/// Per-session view state for the feed.
#[derive(Debug)]
pub struct FeedViewState {
    viewer_id: String,
    counters: HashMap<String, PostCounters>,
    liked: HashSet<String>,
    notifications_stale: bool,
}

impl FeedViewState {
    /// Create view state for the given local identity.
    #[must_use]
    pub fn new(viewer_id: impl Into<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            counters: HashMap::new(),
            liked: HashSet::new(),
            notifications_stale: false,
        }
    }

    /// Seed state for a post from a full fetch.
    pub fn track_post(&mut self, post_id: &str, counters: PostCounters, liked: bool) {
        self.counters.insert(post_id.to_string(), counters);
        if liked {
            self.liked.insert(post_id.to_string());
        } else {
            self.liked.remove(post_id);
        }
    }

    /// Cached counters for a post.
    #[must_use]
    pub fn counters(&self, post_id: &str) -> Option<PostCounters> {
        self.counters.get(post_id).copied()
    }

    /// Does the local user like this post?
    #[must_use]
    pub fn is_liked(&self, post_id: &str) -> bool {
        self.liked.contains(post_id)
    }

    /// Reconcile a `post-updated` event into the cache.
    ///
    /// Returns `false` when the event was discarded as a self-echo.
    pub fn apply_post_updated(&mut self, event: &PostUpdated) -> bool {
        if event.user_id == self.viewer_id {
            return false;
        }

        // Absolute overwrite, never delta application
        self.counters.insert(
            event.post_id.clone(),
            PostCounters {
                like_count: event.like_count,
                comment_count: event.comment_count,
                repost_count: event.repost_count,
            },
        );

        if let Some(liked) = event.liked {
            if liked {
                self.liked.insert(event.post_id.clone());
            } else {
                self.liked.remove(&event.post_id);
            }
        }

        true
    }

    /// Apply a local like toggle optimistically (and revert by calling with
    /// the opposite flag).
    pub fn apply_local_like(&mut self, post_id: &str, liked: bool) {
        let entry = self.counters.entry(post_id.to_string()).or_default();
        if liked {
            entry.like_count += 1;
            self.liked.insert(post_id.to_string());
        } else {
            entry.like_count = (entry.like_count - 1).max(0);
            self.liked.remove(post_id);
        }
    }

    /// Record that a `new-notification` push arrived; the notification list
    /// is refetched rather than merged incrementally.
    pub fn mark_notifications_stale(&mut self) {
        self.notifications_stale = true;
    }

    /// Consume the refetch signal.
    pub fn take_notifications_stale(&mut self) -> bool {
        std::mem::take(&mut self.notifications_stale)
    }
}
