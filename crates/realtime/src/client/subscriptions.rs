//! Client-side subscription registry.
//!
//! Owns the channel handles for one client session. The set of subscribed
//! post channels follows the visible post set; the personal notification
//! channel is attached once at session start. All handles are released
//! synchronously on teardown so the underlying relay subscription never
//! outlives the view.

use ripple_common::{Channel, notification_channel, post_channel};
use std::collections::{HashMap, HashSet};

/// The realtime connection a client subscribes through.
///
/// Subscribing yields a handle that must be returned to release the
/// subscription; re-subscribing an already-held channel never reaches the
/// transport (the registry guards it).
pub trait ChannelTransport {
    /// Opaque per-subscription handle.
    type Handle;
    /// Transport error type.
    type Error;

    /// Subscribe to a channel.
    fn subscribe(&mut self, channel: &str) -> Result<Self::Handle, Self::Error>;

    /// Release a subscription.
    fn unsubscribe(&mut self, channel: &str, handle: Self::Handle) -> Result<(), Self::Error>;
}

/// Per-session subscription manager.
pub struct SubscriptionManager<T: ChannelTransport> {
    transport: T,
    subscriptions: HashMap<String, T::Handle>,
}

impl<T: ChannelTransport> SubscriptionManager<T> {
    /// Create a manager over a transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            subscriptions: HashMap::new(),
        }
    }

    /// Reconcile post-channel subscriptions against the visible post set.
    ///
    /// Newly visible ids are subscribed; departed ids are released.
    /// Idempotent: syncing the same set twice is a no-op. The notification
    /// channel is never touched here.
    pub fn sync_posts(&mut self, visible_post_ids: &[String]) -> Result<(), T::Error> {
        let wanted: HashSet<String> = visible_post_ids
            .iter()
            .map(|id| post_channel(id))
            .collect();

        for channel in &wanted {
            if !self.subscriptions.contains_key(channel) {
                let handle = self.transport.subscribe(channel)?;
                self.subscriptions.insert(channel.clone(), handle);
            }
        }

        let departed: Vec<String> = self
            .subscriptions
            .keys()
            .filter(|c| matches!(Channel::parse(c), Some(Channel::Post(_))) && !wanted.contains(*c))
            .cloned()
            .collect();

        for channel in departed {
            if let Some(handle) = self.subscriptions.remove(&channel) {
                self.transport.unsubscribe(&channel, handle)?;
            }
        }

        Ok(())
    }

    /// Subscribe the user's personal notification channel.
    ///
    /// Called once at session start; repeated calls are no-ops.
    pub fn subscribe_notifications(&mut self, user_id: &str) -> Result<(), T::Error> {
        let channel = notification_channel(user_id);
        if !self.subscriptions.contains_key(&channel) {
            let handle = self.transport.subscribe(&channel)?;
            self.subscriptions.insert(channel, handle);
        }
        Ok(())
    }

    /// Is the given channel currently subscribed?
    #[must_use]
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.contains_key(channel)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Release every subscription. Errors are ignored: teardown must not
    /// leave handles behind because one release failed.
    pub fn teardown(&mut self) {
        for (channel, handle) in self.subscriptions.drain() {
            let _ = self.transport.unsubscribe(&channel, handle);
        }
    }
}

impl<T: ChannelTransport> Drop for SubscriptionManager<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Fake transport recording subscribe/unsubscribe calls.
    #[derive(Default)]
    struct FakeTransport {
        log: Rc<RefCell<Vec<String>>>,
        next_handle: u64,
    }

    impl FakeTransport {
        fn with_log(log: Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                log,
                next_handle: 0,
            }
        }
    }

    impl ChannelTransport for FakeTransport {
        type Handle = u64;
        type Error = ();

        fn subscribe(&mut self, channel: &str) -> Result<u64, ()> {
            self.next_handle += 1;
            self.log.borrow_mut().push(format!("sub:{channel}"));
            Ok(self.next_handle)
        }

        fn unsubscribe(&mut self, channel: &str, _handle: u64) -> Result<(), ()> {
            self.log.borrow_mut().push(format!("unsub:{channel}"));
            Ok(())
        }
    }

    fn manager() -> (SubscriptionManager<FakeTransport>, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let manager = SubscriptionManager::new(FakeTransport::with_log(log.clone()));
        (manager, log)
    }

    #[test]
    fn test_sync_subscribes_visible_posts() {
        let (mut manager, log) = manager();

        manager
            .sync_posts(&["p1".to_string(), "p2".to_string()])
            .unwrap();

        assert_eq!(manager.subscription_count(), 2);
        assert!(manager.is_subscribed("post-p1"));
        assert!(manager.is_subscribed("post-p2"));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let (mut manager, log) = manager();

        let visible = vec!["p1".to_string()];
        manager.sync_posts(&visible).unwrap();
        manager.sync_posts(&visible).unwrap();

        // Second sync reached neither subscribe nor unsubscribe
        assert_eq!(log.borrow().as_slice(), ["sub:post-p1"]);
    }

    #[test]
    fn test_sync_releases_departed_posts() {
        let (mut manager, log) = manager();

        manager
            .sync_posts(&["p1".to_string(), "p2".to_string()])
            .unwrap();
        manager.sync_posts(&["p2".to_string()]).unwrap();

        assert!(!manager.is_subscribed("post-p1"));
        assert!(manager.is_subscribed("post-p2"));
        assert!(log.borrow().contains(&"unsub:post-p1".to_string()));
    }

    #[test]
    fn test_sync_leaves_notification_channel_alone() {
        let (mut manager, _log) = manager();

        manager.subscribe_notifications("u1").unwrap();
        manager.sync_posts(&["p1".to_string()]).unwrap();
        manager.sync_posts(&[]).unwrap();

        assert!(manager.is_subscribed("notifications-u1"));
        assert!(!manager.is_subscribed("post-p1"));
    }

    #[test]
    fn test_subscribe_notifications_once() {
        let (mut manager, log) = manager();

        manager.subscribe_notifications("u1").unwrap();
        manager.subscribe_notifications("u1").unwrap();

        assert_eq!(log.borrow().as_slice(), ["sub:notifications-u1"]);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let (mut manager, log) = manager();

        manager.subscribe_notifications("u1").unwrap();
        manager.sync_posts(&["p1".to_string()]).unwrap();
        manager.teardown();

        assert_eq!(manager.subscription_count(), 0);
        let log = log.borrow();
        assert!(log.contains(&"unsub:post-p1".to_string()));
        assert!(log.contains(&"unsub:notifications-u1".to_string()));
    }

    #[test]
    fn test_drop_releases_everything() {
        let log = {
            let (mut manager, log) = manager();
            manager.sync_posts(&["p1".to_string()]).unwrap();
            drop(manager);
            log
        };

        assert!(log.borrow().contains(&"unsub:post-p1".to_string()));
    }
}
