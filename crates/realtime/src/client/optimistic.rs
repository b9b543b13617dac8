//! Optimistic mutation runner.
//!
//! One abstraction for every optimistic action: apply the local delta, run
//! the request, and on failure revert the delta. A per-key in-flight guard
//! makes a second submission while one is pending a no-op, which is what
//! keeps the like button from double-firing.
//!
//! Everything is result-typed; no control flow through panics or exceptions.

use std::collections::HashSet;
use std::future::Future;

/// Outcome of an optimistic mutation.
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// The request committed; the value is the authoritative server
    /// response, which the caller reconciles into local state.
    Committed(T),
    /// The request failed and the local delta was reverted.
    RolledBack(E),
    /// A mutation for this key was already in flight; nothing was applied.
    InFlight,
}

impl<T, E> Outcome<T, E> {
    /// Did the mutation commit?
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Tracks keys (post ids) with a mutation in flight.
#[derive(Debug, Default)]
pub struct InFlightGuard {
    keys: HashSet<String>,
}

impl InFlightGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Is a mutation for this key pending?
    #[must_use]
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn try_begin(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    fn finish(&mut self, key: &str) {
        self.keys.remove(key);
    }
}

/// Run an optimistic mutation.
///
/// `apply` is executed immediately against local state; `commit` performs the
/// request; `revert` undoes `apply` when the request fails. State mutations
/// are interleaved, never concurrent: the client runs a single-threaded
/// event loop, and the suspension point is the request await.
pub async fn run<S, T, E, Fut>(
    guard: &mut InFlightGuard,
    key: &str,
    state: &mut S,
    apply: impl FnOnce(&mut S),
    revert: impl FnOnce(&mut S),
    commit: impl FnOnce() -> Fut,
) -> Outcome<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    if !guard.try_begin(key) {
        return Outcome::InFlight;
    }

    apply(state);
    let result = commit().await;
    guard.finish(key);

    match result {
        Ok(value) => Outcome::Committed(value),
        Err(e) => {
            revert(state);
            Outcome::RolledBack(e)
        }
    }
}
