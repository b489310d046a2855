//! `observe`: subscribe to a live query at the document level.
//!
//! Document callbacks see whole documents rather than field deltas, and the
//! ordered forms see positions. The adapter keeps its own cache of the
//! result set so it can reconstruct old documents and indices from the
//! primitive stream.

use crate::callbacks::ObserveCallbacks;
use crate::config::ObserveOptions;
use crate::driver::ObserveDriver;
use crate::handle::ObserveHandle;
use crate::observe::observe_changes;
use crate::registry::MultiplexerRegistry;
use futures::future;
use liveset_cache::{CacheOptions, ChangeCache};
use liveset_core::{default_clone, ChangedFields, CloneFn, Document, Error, Id, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

pub type DocAddedFn = Arc<dyn Fn(Id, Document) + Send + Sync>;
pub type DocAddedAtFn = Arc<dyn Fn(Id, Document, Option<usize>, Option<Id>) + Send + Sync>;
pub type DocChangedFn = Arc<dyn Fn(Id, Document, Document) + Send + Sync>;
pub type DocChangedAtFn = Arc<dyn Fn(Id, Document, Document, Option<usize>) + Send + Sync>;
pub type DocRemovedFn = Arc<dyn Fn(Id, Document) + Send + Sync>;
pub type DocRemovedAtFn = Arc<dyn Fn(Id, Document, Option<usize>) + Send + Sync>;
pub type DocMovedToFn =
    Arc<dyn Fn(Id, Document, Option<usize>, Option<usize>, Option<Id>) + Send + Sync>;

/// Document-level callbacks.
///
/// The `_at` forms and `moved_to` make the subscription ordered. Indices are
/// `None` when the subscription sets `no_indices`.
///
/// # Example
///
/// ```rust
/// use liveset_reactive::DocumentCallbacks;
///
/// let callbacks = DocumentCallbacks::new()
///     .added_at(|id, doc, index, _before| println!("{id} at {index:?}: {doc:?}"))
///     .changed(|id, new, old| println!("{id}: {old:?} -> {new:?}"));
/// assert!(callbacks.is_ordered());
/// ```
#[derive(Clone, Default)]
pub struct DocumentCallbacks {
    added: Option<DocAddedFn>,
    added_at: Option<DocAddedAtFn>,
    changed: Option<DocChangedFn>,
    changed_at: Option<DocChangedAtFn>,
    removed: Option<DocRemovedFn>,
    removed_at: Option<DocRemovedAtFn>,
    moved_to: Option<DocMovedToFn>,
}

impl DocumentCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn added<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Document) + Send + Sync + 'static,
    {
        self.added = Some(Arc::new(f));
        self
    }

    /// `f(id, doc, index, before)`.
    pub fn added_at<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Document, Option<usize>, Option<Id>) + Send + Sync + 'static,
    {
        self.added_at = Some(Arc::new(f));
        self
    }

    /// `f(id, new_doc, old_doc)`.
    pub fn changed<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Document, Document) + Send + Sync + 'static,
    {
        self.changed = Some(Arc::new(f));
        self
    }

    /// `f(id, new_doc, old_doc, index)`.
    pub fn changed_at<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Document, Document, Option<usize>) + Send + Sync + 'static,
    {
        self.changed_at = Some(Arc::new(f));
        self
    }

    pub fn removed<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Document) + Send + Sync + 'static,
    {
        self.removed = Some(Arc::new(f));
        self
    }

    /// `f(id, old_doc, index)`.
    pub fn removed_at<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Document, Option<usize>) + Send + Sync + 'static,
    {
        self.removed_at = Some(Arc::new(f));
        self
    }

    /// `f(id, doc, from, to, before)`, where `to` is the index the document
    /// ends up at.
    pub fn moved_to<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Document, Option<usize>, Option<usize>, Option<Id>) + Send + Sync + 'static,
    {
        self.moved_to = Some(Arc::new(f));
        self
    }

    /// Returns true if any positional callback was supplied.
    pub fn is_ordered(&self) -> bool {
        self.added_at.is_some()
            || self.changed_at.is_some()
            || self.removed_at.is_some()
            || self.moved_to.is_some()
    }

    /// Rejects callback sets that supply both the plain and positional form
    /// of the same callback.
    pub fn validate(&self) -> Result<()> {
        if self.added.is_some() && self.added_at.is_some() {
            return Err(Error::invalid_callbacks("specify only one of added and added_at"));
        }
        if self.changed.is_some() && self.changed_at.is_some() {
            return Err(Error::invalid_callbacks(
                "specify only one of changed and changed_at",
            ));
        }
        if self.removed.is_some() && self.removed_at.is_some() {
            return Err(Error::invalid_callbacks(
                "specify only one of removed and removed_at",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for DocumentCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCallbacks")
            .field("added", &self.added.is_some())
            .field("added_at", &self.added_at.is_some())
            .field("changed", &self.changed.is_some())
            .field("changed_at", &self.changed_at.is_some())
            .field("removed", &self.removed.is_some())
            .field("removed_at", &self.removed_at.is_some())
            .field("moved_to", &self.moved_to.is_some())
            .finish()
    }
}

struct AdapterState {
    cache: ChangeCache,
    suppressed: bool,
}

/// Translates the primitive stream into document callbacks.
struct Adapter {
    callbacks: DocumentCallbacks,
    indices: bool,
    copy: CloneFn,
    state: Mutex<AdapterState>,
}

impl Adapter {
    fn new(callbacks: DocumentCallbacks, ordered: bool, options: &ObserveOptions) -> Self {
        let cache = ChangeCache::new(CacheOptions {
            ordered,
            clone_documents: false,
            clone: None,
        });
        Self {
            callbacks,
            indices: !options.no_indices,
            copy: options.clone.clone().unwrap_or_else(default_clone),
            state: Mutex::new(AdapterState {
                cache,
                suppressed: options.suppress_initial,
            }),
        }
    }

    fn unsuppress(&self) {
        self.state.lock().suppressed = false;
    }

    fn index_of(&self, cache: &ChangeCache, id: &Id) -> Result<Option<usize>> {
        if self.indices {
            cache.index_of(id)
        } else {
            Ok(None)
        }
    }

    fn added(&self, id: Id, doc: &Document) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.cache.added(id.clone(), (self.copy)(doc))?;
            if state.suppressed {
                return Ok(());
            }
        }
        if let Some(added) = &self.callbacks.added {
            added(id, (self.copy)(doc));
        }
        Ok(())
    }

    fn added_before(&self, id: Id, doc: &Document, before: Option<Id>) -> Result<()> {
        let index = {
            let mut state = self.state.lock();
            state
                .cache
                .added_before(id.clone(), (self.copy)(doc), before.as_ref())?;
            if state.suppressed {
                return Ok(());
            }
            if self.callbacks.added_at.is_some() {
                self.index_of(&state.cache, &id)?
            } else {
                None
            }
        };
        if let Some(added_at) = &self.callbacks.added_at {
            added_at(id, (self.copy)(doc), index, before);
        } else if let Some(added) = &self.callbacks.added {
            added(id, (self.copy)(doc));
        }
        Ok(())
    }

    fn changed(&self, id: Id, fields: &ChangedFields) -> Result<()> {
        let (old, new, index) = {
            let mut state = self.state.lock();
            let old = state
                .cache
                .get(&id)
                .map(|doc| (self.copy)(doc))
                .ok_or_else(|| Error::not_found(&id))?;
            state.cache.changed(&id, fields)?;
            let new = state
                .cache
                .get(&id)
                .map(|doc| (self.copy)(doc))
                .ok_or_else(|| Error::not_found(&id))?;
            let index = if self.callbacks.changed_at.is_some() {
                self.index_of(&state.cache, &id)?
            } else {
                None
            };
            (old, new, index)
        };
        if let Some(changed_at) = &self.callbacks.changed_at {
            changed_at(id, new, old, index);
        } else if let Some(changed) = &self.callbacks.changed {
            changed(id, new, old);
        }
        Ok(())
    }

    fn moved_before(&self, id: Id, before: Option<Id>) -> Result<()> {
        let (doc, from, to) = {
            let mut state = self.state.lock();
            let from = self.index_of(&state.cache, &id)?;
            let to = match &before {
                Some(before) => self.index_of(&state.cache, before)?,
                None if self.indices => Some(state.cache.len()),
                None => None,
            };
            state.cache.moved_before(&id, before.as_ref())?;
            // Removing the document first shifts later positions down by one.
            let to = match (from, to) {
                (Some(from), Some(to)) if to > from => Some(to - 1),
                _ => to,
            };
            let doc = state
                .cache
                .get(&id)
                .map(|doc| (self.copy)(doc))
                .ok_or_else(|| Error::not_found(&id))?;
            (doc, from, to)
        };
        if let Some(moved_to) = &self.callbacks.moved_to {
            moved_to(id, doc, from, to, before);
        }
        Ok(())
    }

    fn removed(&self, id: Id) -> Result<()> {
        let (doc, index) = {
            let mut state = self.state.lock();
            let index = if self.callbacks.removed_at.is_some() {
                self.index_of(&state.cache, &id)?
            } else {
                None
            };
            (state.cache.removed(&id)?, index)
        };
        if let Some(removed_at) = &self.callbacks.removed_at {
            removed_at(id, doc, index);
        } else if let Some(removed) = &self.callbacks.removed {
            removed(id, doc);
        }
        Ok(())
    }

    /// Builds the primitive callbacks that feed this adapter.
    fn observe_callbacks(self: &Arc<Self>, ordered: bool) -> ObserveCallbacks {
        let (a, c, m, r) = (self.clone(), self.clone(), self.clone(), self.clone());
        let callbacks = if ordered {
            ObserveCallbacks::new()
                .added_before_async(move |id, doc, before| {
                    future::ready(a.added_before(id, &doc, before))
                })
                .moved_before_async(move |id, before| future::ready(m.moved_before(id, before)))
        } else {
            drop(m);
            ObserveCallbacks::new().added_async(move |id, doc| future::ready(a.added(id, &doc)))
        };
        callbacks
            .changed_async(move |id, fields| future::ready(c.changed(id, &fields)))
            .removed_async(move |id| future::ready(r.removed(id)))
    }
}

/// Subscribes document-level `callbacks` to the live query identified by
/// `options`.
///
/// Works like [`observe_changes`] and shares multiplexers with it. With
/// `suppress_initial` the initial result set is cached but not reported.
///
/// # Errors
///
/// `InvalidCallbacks` if a callback is given in both forms, or if
/// positional callbacks are combined with `ordered(false)`.
pub async fn observe<F>(
    registry: &MultiplexerRegistry,
    callbacks: DocumentCallbacks,
    options: ObserveOptions,
    make_driver: F,
) -> Result<ObserveHandle>
where
    F: FnOnce(&ObserveOptions, bool) -> Arc<dyn ObserveDriver>,
{
    callbacks.validate()?;
    let ordered = match options.ordered {
        Some(false) if callbacks.is_ordered() => {
            return Err(Error::invalid_callbacks(
                "positional callbacks need an ordered subscription",
            ))
        }
        Some(ordered) => ordered,
        None => callbacks.is_ordered(),
    };

    let adapter = Arc::new(Adapter::new(callbacks, ordered, &options));
    // The adapter copies payloads itself.
    let inner_options = options.ordered(ordered).non_mutating_callbacks(true);
    let handle = observe_changes(
        registry,
        adapter.observe_callbacks(ordered),
        inner_options,
        make_driver,
    )
    .await?;
    adapter.unsuppress();
    Ok(handle)
}
