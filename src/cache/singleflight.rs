//! Per-key deduplication of in-flight operations.
//!
//! The first caller for a key becomes the leader and its future is shared;
//! callers arriving while it runs await the same future and receive a clone
//! of its output. The entry is removed once the leader is done, so the next
//! call for that key runs again.

use std::future::Future;
use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};

pub struct SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    calls: DashMap<K, Shared<BoxFuture<'static, T>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: DashMap::new(),
        }
    }

    /// Run `f` for `key` unless a call for the same key is already running,
    /// in which case wait for that call instead.
    pub async fn run<F, Fut>(&self, key: K, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (call, leader) = match self.calls.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let call = f().boxed().shared();
                entry.insert(call.clone());
                (call, true)
            }
        };

        if !leader {
            return call.await;
        }

        // Removes the entry even if the leader is cancelled; waiting
        // callers keep driving their own clone of the shared future.
        let _done = Forget {
            calls: &self.calls,
            key,
        };
        call.await
    }

    /// Number of keys with a call in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.len()
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

struct Forget<'a, K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    calls: &'a DashMap<K, Shared<BoxFuture<'static, T>>>,
    key: K,
}

impl<K, T> Drop for Forget<'_, K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.calls.remove(&self.key);
    }
}
