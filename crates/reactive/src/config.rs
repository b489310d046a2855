//! Subscription and driver configuration.

use crate::handle::HandleOptions;
use crate::multiplexer::MultiplexerOptions;
use liveset_core::{CloneFn, EqualsFn};
use liveset_diff::DiffOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between polls.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 10_000;

/// Computes the registry key for a subscription. Subscriptions with equal
/// keys share one multiplexer. The flag is the resolved ordering.
pub type MultiplexerIdFn = Arc<dyn Fn(&ObserveOptions, bool) -> String + Send + Sync>;

/// Options for `observe_changes` and `observe`.
#[derive(Clone)]
pub struct ObserveOptions {
    /// Force ordered or unordered delivery; inferred from the callbacks
    /// when `None`.
    pub ordered: Option<bool>,
    /// Copy documents before the multiplexer caches them.
    pub clone_documents: bool,
    /// Copy strategy; a deep copy when `None`.
    pub clone: Option<CloneFn>,
    /// Field equality used by diffing drivers.
    pub equals: Option<EqualsFn>,
    /// Registry key; a fresh key per subscription when `None`.
    pub multiplexer_id: Option<MultiplexerIdFn>,
    /// Callbacks promise not to mutate payloads.
    pub non_mutating_callbacks: bool,
    /// Document observers only: hide the initial result set.
    pub suppress_initial: bool,
    /// Document observers only: skip index bookkeeping.
    pub no_indices: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            ordered: None,
            clone_documents: true,
            clone: None,
            equals: None,
            multiplexer_id: None,
            non_mutating_callbacks: true,
            suppress_initial: false,
            no_indices: false,
        }
    }
}

impl ObserveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = Some(ordered);
        self
    }

    pub fn clone_with(mut self, clone: CloneFn) -> Self {
        self.clone = Some(clone);
        self
    }

    pub fn equals(mut self, equals: EqualsFn) -> Self {
        self.equals = Some(equals);
        self
    }

    /// Shares one multiplexer between every subscription using `key`.
    pub fn shared_as(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.multiplexer_id(Arc::new(move |_, _| key.clone()))
    }

    pub fn multiplexer_id(mut self, f: MultiplexerIdFn) -> Self {
        self.multiplexer_id = Some(f);
        self
    }

    pub fn non_mutating_callbacks(mut self, non_mutating: bool) -> Self {
        self.non_mutating_callbacks = non_mutating;
        self
    }

    pub fn suppress_initial(mut self, suppress: bool) -> Self {
        self.suppress_initial = suppress;
        self
    }

    pub fn no_indices(mut self, no_indices: bool) -> Self {
        self.no_indices = no_indices;
        self
    }

    pub fn multiplexer_options(&self, ordered: bool) -> MultiplexerOptions {
        MultiplexerOptions {
            ordered,
            clone_documents: self.clone_documents,
            clone: self.clone.clone(),
        }
    }

    pub fn handle_options(&self) -> HandleOptions {
        HandleOptions {
            non_mutating_callbacks: self.non_mutating_callbacks,
            clone: self.clone.clone(),
        }
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            equals: self.equals.clone(),
            projection: None,
        }
    }
}

impl fmt::Debug for ObserveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserveOptions")
            .field("ordered", &self.ordered)
            .field("clone_documents", &self.clone_documents)
            .field("clone", &self.clone.as_ref().map(|_| "<fn>"))
            .field("equals", &self.equals.as_ref().map(|_| "<fn>"))
            .field("multiplexer_id", &self.multiplexer_id.as_ref().map(|_| "<fn>"))
            .field("non_mutating_callbacks", &self.non_mutating_callbacks)
            .field("suppress_initial", &self.suppress_initial)
            .field("no_indices", &self.no_indices)
            .finish()
    }
}

/// Polling driver configuration.
///
/// ```rust
/// use liveset_reactive::PollingConfig;
/// use std::time::Duration;
///
/// let config: PollingConfig = serde_json::from_str(r#"{"interval_ms": 250}"#).unwrap();
/// assert_eq!(config.interval(), Some(Duration::from_millis(250)));
///
/// // `null` disables periodic polling.
/// let config: PollingConfig = serde_json::from_str(r#"{"interval_ms": null}"#).unwrap();
/// assert_eq!(config.interval(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Milliseconds between polls; `None` polls only once, at init.
    pub interval_ms: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: Some(DEFAULT_POLLING_INTERVAL_MS),
        }
    }
}

impl PollingConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval_ms: Some(interval.as_millis() as u64),
        }
    }

    pub fn disabled() -> Self {
        Self { interval_ms: None }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
