//! Observe handles.
//!
//! A handle is one subscriber's registration with a multiplexer. The
//! multiplexer owns the delivery side ([`HandleCore`]); the subscriber holds
//! an [`ObserveHandle`] to cancel.

use crate::callbacks::ObserveCallbacks;
use crate::multiplexer::Multiplexer;
use liveset_core::{default_clone, Change, ChangedFields, CloneFn, Document, Id, Primitive, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a handle, process-wide.
pub type HandleId = u64;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Per-handle delivery options.
#[derive(Clone)]
pub struct HandleOptions {
    /// Callbacks promise not to mutate payloads, so they may share them.
    pub non_mutating_callbacks: bool,
    /// Copy strategy for private payload copies; a deep copy when `None`.
    pub clone: Option<CloneFn>,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            non_mutating_callbacks: true,
            clone: None,
        }
    }
}

impl fmt::Debug for HandleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleOptions")
            .field("non_mutating_callbacks", &self.non_mutating_callbacks)
            .field("clone", &self.clone.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// A change as fanned out to handles; payloads are shared.
#[derive(Clone, Debug)]
pub(crate) enum Event {
    Added {
        id: Id,
        doc: Arc<Document>,
    },
    AddedBefore {
        id: Id,
        doc: Arc<Document>,
        before: Option<Id>,
    },
    Changed {
        id: Id,
        fields: Arc<ChangedFields>,
    },
    MovedBefore {
        id: Id,
        before: Option<Id>,
    },
    Removed {
        id: Id,
    },
}

impl Event {
    pub(crate) fn primitive(&self) -> Primitive {
        match self {
            Event::Added { .. } => Primitive::Added,
            Event::AddedBefore { .. } => Primitive::AddedBefore,
            Event::Changed { .. } => Primitive::Changed,
            Event::MovedBefore { .. } => Primitive::MovedBefore,
            Event::Removed { .. } => Primitive::Removed,
        }
    }
}

impl From<Change> for Event {
    fn from(change: Change) -> Self {
        match change {
            Change::Added { id, doc } => Event::Added {
                id,
                doc: Arc::new(doc),
            },
            Change::AddedBefore { id, doc, before } => Event::AddedBefore {
                id,
                doc: Arc::new(doc),
                before,
            },
            Change::Changed { id, fields } => Event::Changed {
                id,
                fields: Arc::new(fields),
            },
            Change::MovedBefore { id, before } => Event::MovedBefore { id, before },
            Change::Removed { id } => Event::Removed { id },
        }
    }
}

/// The multiplexer's side of a handle.
pub(crate) struct HandleCore {
    id: HandleId,
    callbacks: ObserveCallbacks,
    non_mutating: bool,
    clone: CloneFn,
    stopped: AtomicBool,
}

impl HandleCore {
    pub(crate) fn new(callbacks: ObserveCallbacks, options: &HandleOptions) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            callbacks,
            non_mutating: options.non_mutating_callbacks,
            clone: options.clone.clone().unwrap_or_else(default_clone),
            stopped: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Marks the handle stopped; returns false if it already was.
    pub(crate) fn mark_stopped(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }

    fn doc(&self, doc: &Arc<Document>) -> Arc<Document> {
        if self.non_mutating {
            doc.clone()
        } else {
            Arc::new((self.clone)(doc))
        }
    }

    fn fields(&self, fields: &Arc<ChangedFields>) -> Arc<ChangedFields> {
        if self.non_mutating {
            fields.clone()
        } else {
            Arc::new(ChangedFields::clone(fields))
        }
    }

    /// Delivers one event to this handle's callbacks.
    ///
    /// Inserts are translated between the two forms: `added` falls back to
    /// `added_before(.., None)`, and `added_before` falls back to `added`
    /// with the position dropped. Moves reach only `moved_before`.
    pub(crate) async fn deliver(&self, event: &Event) -> Result<()> {
        if self.is_stopped() {
            return Ok(());
        }
        let cb = &self.callbacks;
        match event {
            Event::Added { id, doc } => {
                if let Some(added) = &cb.added {
                    added(id.clone(), self.doc(doc)).await
                } else if let Some(added_before) = &cb.added_before {
                    added_before(id.clone(), self.doc(doc), None).await
                } else {
                    Ok(())
                }
            }
            Event::AddedBefore { id, doc, before } => {
                if let Some(added_before) = &cb.added_before {
                    added_before(id.clone(), self.doc(doc), before.clone()).await
                } else if let Some(added) = &cb.added {
                    added(id.clone(), self.doc(doc)).await
                } else {
                    Ok(())
                }
            }
            Event::Changed { id, fields } => match &cb.changed {
                Some(changed) => changed(id.clone(), self.fields(fields)).await,
                None => Ok(()),
            },
            Event::MovedBefore { id, before } => match &cb.moved_before {
                Some(moved_before) => moved_before(id.clone(), before.clone()).await,
                None => Ok(()),
            },
            Event::Removed { id } => match &cb.removed {
                Some(removed) => removed(id.clone()).await,
                None => Ok(()),
            },
        }
    }
}

/// A subscriber's registration with a multiplexer.
///
/// Dropping the handle does not stop it; call [`ObserveHandle::stop`].
#[derive(Clone)]
pub struct ObserveHandle {
    core: Arc<HandleCore>,
    multiplexer: Multiplexer,
}

impl ObserveHandle {
    pub(crate) fn new(core: Arc<HandleCore>, multiplexer: Multiplexer) -> Self {
        Self { core, multiplexer }
    }

    /// Returns the handle ID.
    #[inline]
    pub fn id(&self) -> HandleId {
        self.core.id()
    }

    /// Returns whether this handle has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.core.is_stopped()
    }

    /// The multiplexer this handle is registered with.
    pub fn multiplexer(&self) -> &Multiplexer {
        &self.multiplexer
    }

    /// Stops delivery and deregisters from the multiplexer. Stopping the
    /// last handle stops the multiplexer. Calling this twice is harmless.
    pub fn stop(&self) {
        if self.core.mark_stopped() {
            tracing::debug!(handle = self.id(), "observe handle stopped");
            self.multiplexer.remove_handle(self.id());
        }
    }
}

impl fmt::Debug for ObserveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserveHandle")
            .field("id", &self.id())
            .field("stopped", &self.is_stopped())
            .field("multiplexer", &self.multiplexer.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveset_core::doc;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder() -> (ObserveCallbacks, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = log.clone();
        let r = log.clone();
        let callbacks = ObserveCallbacks::new()
            .added(move |id, _| a.lock().push(format!("added {id}")))
            .removed(move |id| r.lock().push(format!("removed {id}")));
        (callbacks, log)
    }

    #[test]
    fn test_handle_ids_increase() {
        let a = HandleCore::new(ObserveCallbacks::new(), &HandleOptions::default());
        let b = HandleCore::new(ObserveCallbacks::new(), &HandleOptions::default());
        assert!(b.id() > a.id());
    }

    #[tokio::test]
    async fn test_added_before_falls_back_to_added() {
        let (callbacks, log) = recorder();
        let core = HandleCore::new(callbacks, &HandleOptions::default());
        let event = Event::AddedBefore {
            id: Id::from("x"),
            doc: Arc::new(Document::new()),
            before: Some(Id::from("y")),
        };
        core.deliver(&event).await.unwrap();
        assert_eq!(*log.lock(), vec!["added x"]);
    }

    #[tokio::test]
    async fn test_added_falls_back_to_added_before() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let callbacks = ObserveCallbacks::new().added_before(move |id, _, before| {
            *sink.lock() = Some((id, before));
        });
        let core = HandleCore::new(callbacks, &HandleOptions::default());
        core.deliver(&Event::Added {
            id: Id::from("x"),
            doc: Arc::new(Document::new()),
        })
        .await
        .unwrap();
        assert_eq!(*seen.lock(), Some((Id::from("x"), None)));
    }

    #[tokio::test]
    async fn test_moves_only_reach_moved_before() {
        let (callbacks, log) = recorder();
        let core = HandleCore::new(callbacks, &HandleOptions::default());
        core.deliver(&Event::MovedBefore {
            id: Id::from("x"),
            before: None,
        })
        .await
        .unwrap();
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stopped_core_delivers_nothing() {
        let (callbacks, log) = recorder();
        let core = HandleCore::new(callbacks, &HandleOptions::default());
        assert!(core.mark_stopped());
        assert!(!core.mark_stopped());
        core.deliver(&Event::Removed { id: Id::from("x") })
            .await
            .unwrap();
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_payload_sharing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callbacks = ObserveCallbacks::new().added(move |_, doc| sink.lock().push(doc));
        let payload = Arc::new(doc([("n", json!(1))]));
        let event = Event::Added {
            id: Id::from("x"),
            doc: payload.clone(),
        };

        let shared = HandleCore::new(callbacks.clone(), &HandleOptions::default());
        shared.deliver(&event).await.unwrap();

        let private = HandleCore::new(
            callbacks,
            &HandleOptions {
                non_mutating_callbacks: false,
                clone: None,
            },
        );
        private.deliver(&event).await.unwrap();

        let seen = seen.lock();
        assert!(Arc::ptr_eq(&seen[0], &payload));
        assert!(!Arc::ptr_eq(&seen[1], &payload));
        assert_eq!(*seen[1], *payload);
    }
}
