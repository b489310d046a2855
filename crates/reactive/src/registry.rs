//! Multiplexer registry.
//!
//! Routes subscriptions with the same key to one live multiplexer. The
//! registry is an ordinary value; callers that want sharing pass the same
//! registry (it is cheap to clone) to every subscription.

use crate::multiplexer::{Multiplexer, MultiplexerId};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    multiplexers: Mutex<HashMap<String, Multiplexer>>,
    next_key: AtomicU64,
}

/// A map from subscription key to live multiplexer.
#[derive(Clone, Default)]
pub struct MultiplexerRegistry {
    inner: Arc<Inner>,
}

impl MultiplexerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the multiplexer registered under `key`.
    pub fn get(&self, key: &str) -> Option<Multiplexer> {
        self.inner.multiplexers.lock().get(key).cloned()
    }

    /// Returns the number of live multiplexers.
    pub fn len(&self) -> usize {
        self.inner.multiplexers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.multiplexers.lock().is_empty()
    }

    /// Returns all registered keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.multiplexers.lock().keys().cloned().collect()
    }

    /// A key no other subscription on this registry will receive.
    pub fn fresh_key(&self) -> String {
        let n = self.inner.next_key.fetch_add(1, Ordering::Relaxed) + 1;
        format!("anonymous:{n}")
    }

    /// Registers `multiplexer` under `key` unless a live one is already
    /// there. Returns the registered multiplexer and whether it is the one
    /// passed in.
    pub(crate) fn insert_if_absent(
        &self,
        key: &str,
        multiplexer: Multiplexer,
    ) -> (Multiplexer, bool) {
        let mut multiplexers = self.inner.multiplexers.lock();
        match multiplexers.get(key) {
            Some(existing) if !existing.is_stopped() => (existing.clone(), false),
            _ => {
                multiplexers.insert(key.to_string(), multiplexer.clone());
                (multiplexer, true)
            }
        }
    }

    /// Removes `key` if it still maps to multiplexer `id`.
    pub(crate) fn remove_if(&self, key: &str, id: MultiplexerId) -> bool {
        let mut multiplexers = self.inner.multiplexers.lock();
        if multiplexers.get(key).map(Multiplexer::id) == Some(id) {
            multiplexers.remove(key);
            tracing::debug!(key, multiplexer = id, "multiplexer unregistered");
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for MultiplexerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiplexerRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
