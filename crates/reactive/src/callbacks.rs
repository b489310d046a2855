//! Primitive-level subscriber callbacks.

use futures::future::{BoxFuture, FutureExt};
use liveset_core::{ChangedFields, Document, Error, Id, Primitive, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The future returned by every callback.
pub type CallbackFuture = BoxFuture<'static, Result<()>>;

pub type AddedFn = Arc<dyn Fn(Id, Arc<Document>) -> CallbackFuture + Send + Sync>;
pub type AddedBeforeFn =
    Arc<dyn Fn(Id, Arc<Document>, Option<Id>) -> CallbackFuture + Send + Sync>;
pub type ChangedFn = Arc<dyn Fn(Id, Arc<ChangedFields>) -> CallbackFuture + Send + Sync>;
pub type MovedBeforeFn = Arc<dyn Fn(Id, Option<Id>) -> CallbackFuture + Send + Sync>;
pub type RemovedFn = Arc<dyn Fn(Id) -> CallbackFuture + Send + Sync>;

fn done() -> CallbackFuture {
    futures::future::ready(Ok(())).boxed()
}

/// The callbacks a subscriber supplies. Each is optional; the set supplied
/// decides which primitives the subscriber observes.
///
/// Every callback has a synchronous form (`added`) and an asynchronous form
/// (`added_async`). An asynchronous callback holds up the multiplexer's
/// queue until it resolves.
///
/// # Example
///
/// ```rust
/// use liveset_reactive::ObserveCallbacks;
///
/// let callbacks = ObserveCallbacks::new()
///     .added_before(|id, doc, before| println!("{id} {doc:?} before {before:?}"))
///     .removed_async(|id| async move {
///         println!("gone: {id}");
///         Ok(())
///     });
/// assert!(callbacks.is_ordered());
/// ```
#[derive(Clone, Default)]
pub struct ObserveCallbacks {
    pub(crate) added: Option<AddedFn>,
    pub(crate) added_before: Option<AddedBeforeFn>,
    pub(crate) changed: Option<ChangedFn>,
    pub(crate) moved_before: Option<MovedBeforeFn>,
    pub(crate) removed: Option<RemovedFn>,
}

impl ObserveCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn added<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Arc<Document>) + Send + Sync + 'static,
    {
        self.added = Some(Arc::new(move |id, doc| {
            f(id, doc);
            done()
        }));
        self
    }

    pub fn added_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Id, Arc<Document>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.added = Some(Arc::new(move |id, doc| f(id, doc).boxed()));
        self
    }

    pub fn added_before<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Arc<Document>, Option<Id>) + Send + Sync + 'static,
    {
        self.added_before = Some(Arc::new(move |id, doc, before| {
            f(id, doc, before);
            done()
        }));
        self
    }

    pub fn added_before_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Id, Arc<Document>, Option<Id>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.added_before = Some(Arc::new(move |id, doc, before| f(id, doc, before).boxed()));
        self
    }

    pub fn changed<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Arc<ChangedFields>) + Send + Sync + 'static,
    {
        self.changed = Some(Arc::new(move |id, fields| {
            f(id, fields);
            done()
        }));
        self
    }

    pub fn changed_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Id, Arc<ChangedFields>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.changed = Some(Arc::new(move |id, fields| f(id, fields).boxed()));
        self
    }

    pub fn moved_before<F>(mut self, f: F) -> Self
    where
        F: Fn(Id, Option<Id>) + Send + Sync + 'static,
    {
        self.moved_before = Some(Arc::new(move |id, before| {
            f(id, before);
            done()
        }));
        self
    }

    pub fn moved_before_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Id, Option<Id>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.moved_before = Some(Arc::new(move |id, before| f(id, before).boxed()));
        self
    }

    pub fn removed<F>(mut self, f: F) -> Self
    where
        F: Fn(Id) + Send + Sync + 'static,
    {
        self.removed = Some(Arc::new(move |id| {
            f(id);
            done()
        }));
        self
    }

    pub fn removed_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Id) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.removed = Some(Arc::new(move |id| f(id).boxed()));
        self
    }

    /// Returns true if a callback for `primitive` was supplied.
    pub fn observes(&self, primitive: Primitive) -> bool {
        match primitive {
            Primitive::Added => self.added.is_some(),
            Primitive::AddedBefore => self.added_before.is_some(),
            Primitive::Changed => self.changed.is_some(),
            Primitive::MovedBefore => self.moved_before.is_some(),
            Primitive::Removed => self.removed.is_some(),
        }
    }

    /// Returns true if any positional callback was supplied.
    pub fn is_ordered(&self) -> bool {
        self.added_before.is_some() || self.moved_before.is_some()
    }

    /// Rejects callback sets that supply both insert forms.
    pub fn validate(&self) -> Result<()> {
        if self.added.is_some() && self.added_before.is_some() {
            return Err(Error::invalid_callbacks(
                "specify only one of added and added_before",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ObserveCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observed: Vec<&str> = Primitive::ALL
            .iter()
            .filter(|p| self.observes(**p))
            .map(|p| p.name())
            .collect();
        f.debug_struct("ObserveCallbacks")
            .field("observes", &observed)
            .finish()
    }
}
