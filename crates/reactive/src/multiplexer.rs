//! Observe multiplexer.
//!
//! One multiplexer serves every subscriber of the same live query. It keeps
//! the current result set in a [`ChangeCache`], forwards each change to every
//! registered handle, and replays the cache to handles that join late.
//!
//! All mutation and delivery happens inside tasks on the multiplexer's
//! [`TaskQueue`], so subscribers see changes in the order they were reported
//! even when callbacks suspend.

use crate::callbacks::ObserveCallbacks;
use crate::handle::{Event, HandleCore, HandleId, HandleOptions, ObserveHandle};
use futures::future::{join_all, FutureExt};
use liveset_cache::{CacheOptions, ChangeCache, ResultSet};
use liveset_core::{
    default_clone, Change, ChangedFields, CloneFn, Document, Error, Id, Primitive, Result,
};
use liveset_queue::{Completion, TaskQueue};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Unique identifier for a multiplexer, process-wide.
pub type MultiplexerId = u64;

static NEXT_MULTIPLEXER_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a multiplexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The driver is still reporting the initial result set.
    CollectingInitial,
    /// The initial result set is complete.
    Ready,
    /// The last handle left or the driver failed; the queue is destroyed.
    Stopped,
}

/// Construction options for a [`Multiplexer`].
#[derive(Clone)]
pub struct MultiplexerOptions {
    pub ordered: bool,
    /// Copy documents before caching them.
    pub clone_documents: bool,
    /// Copy strategy; a deep copy when `None`.
    pub clone: Option<CloneFn>,
}

impl Default for MultiplexerOptions {
    fn default() -> Self {
        Self {
            ordered: false,
            clone_documents: true,
            clone: None,
        }
    }
}

impl MultiplexerOptions {
    pub fn ordered() -> Self {
        Self {
            ordered: true,
            ..Self::default()
        }
    }

    pub fn unordered() -> Self {
        Self::default()
    }
}

type StopHook = Box<dyn FnOnce() + Send>;

struct State {
    cache: ChangeCache,
    handles: BTreeMap<HandleId, Arc<HandleCore>>,
    pending_adds: usize,
    stopped: bool,
}

struct Inner {
    id: MultiplexerId,
    ordered: bool,
    clone_documents: bool,
    clone: CloneFn,
    queue: TaskQueue,
    state: Mutex<State>,
    phase: watch::Sender<Phase>,
    on_stop: Mutex<Option<StopHook>>,
}

/// Fans one stream of changes out to many handles.
///
/// Cloning yields another reference to the same multiplexer. Every method
/// that touches the result set enqueues exactly one task at call time and
/// returns a [`Completion`] for it.
#[derive(Clone)]
pub struct Multiplexer {
    inner: Arc<Inner>,
}

impl Multiplexer {
    /// Creates a multiplexer in the `CollectingInitial` phase.
    pub fn new(options: MultiplexerOptions) -> Self {
        let id = NEXT_MULTIPLEXER_ID.fetch_add(1, Ordering::Relaxed);
        let (phase, _) = watch::channel(Phase::CollectingInitial);
        let queue = TaskQueue::with_error_handler(move |task, error| {
            tracing::warn!(multiplexer = id, task, error = %error, "multiplexer task failed");
        });
        // Documents are copied once on the way in, below.
        let cache = ChangeCache::new(CacheOptions {
            ordered: options.ordered,
            clone_documents: false,
            clone: None,
        });
        Self {
            inner: Arc::new(Inner {
                id,
                ordered: options.ordered,
                clone_documents: options.clone_documents,
                clone: options.clone.unwrap_or_else(default_clone),
                queue,
                state: Mutex::new(State {
                    cache,
                    handles: BTreeMap::new(),
                    pending_adds: 0,
                    stopped: false,
                }),
                phase,
                on_stop: Mutex::new(None),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> MultiplexerId {
        self.inner.id
    }

    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.inner.ordered
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    pub fn is_stopped(&self) -> bool {
        self.phase() == Phase::Stopped
    }

    /// Number of registered handles.
    pub fn handle_count(&self) -> usize {
        self.inner.state.lock().handles.len()
    }

    /// Installs the hook that runs once when the multiplexer stops.
    pub fn on_stop<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.inner.on_stop.lock() = Some(Box::new(hook));
    }

    /// Which primitives a driver should report.
    pub fn observes(&self, primitive: Primitive) -> bool {
        match primitive {
            Primitive::AddedBefore | Primitive::MovedBefore => self.inner.ordered,
            Primitive::Added => !self.inner.ordered,
            // The cache needs every update regardless of what handles want.
            Primitive::Changed | Primitive::Removed => true,
        }
    }

    pub fn added(&self, id: Id, doc: Document) -> Completion<()> {
        self.apply(Change::Added { id, doc })
    }

    pub fn added_before(&self, id: Id, doc: Document, before: Option<Id>) -> Completion<()> {
        self.apply(Change::AddedBefore { id, doc, before })
    }

    pub fn changed(&self, id: Id, fields: ChangedFields) -> Completion<()> {
        self.apply(Change::Changed { id, fields })
    }

    pub fn moved_before(&self, id: Id, before: Option<Id>) -> Completion<()> {
        self.apply(Change::MovedBefore { id, before })
    }

    pub fn removed(&self, id: Id) -> Completion<()> {
        self.apply(Change::Removed { id })
    }

    /// Applies a change to the cache and delivers it to every handle.
    ///
    /// With no handles registered the change is dropped. A change that
    /// violates the cache invariants fails the completion and reaches no
    /// handle.
    pub fn apply(&self, change: Change) -> Completion<()> {
        let inner = self.inner.clone();
        let name = change.primitive().name();
        self.inner.queue.run_task(name, move || async move {
            let event = Event::from(change);
            let handles = {
                let mut state = inner.state.lock();
                if state.handles.is_empty() {
                    return Ok(());
                }
                inner.apply_to_cache(&mut state.cache, &event)?;
                state.handles.values().cloned().collect::<Vec<_>>()
            };
            fan_out(inner.id, &handles, &event).await;
            Ok(())
        })
    }

    /// Marks the initial result set complete and releases waiting handles.
    pub fn ready(&self) -> Completion<()> {
        let inner = self.inner.clone();
        self.inner.queue.run_task("ready", move || async move {
            let changed = inner.phase.send_if_modified(|phase| {
                if *phase == Phase::CollectingInitial {
                    *phase = Phase::Ready;
                    true
                } else {
                    false
                }
            });
            if changed {
                tracing::debug!(multiplexer = inner.id, "multiplexer ready");
            }
            Ok(())
        })
    }

    /// Registers a handle and replays the current result set to it.
    ///
    /// Registration and replay are enqueued now, as one task; the returned
    /// future resolves once they have run and the multiplexer is ready.
    /// Dropping the future before it resolves deregisters the handle.
    ///
    /// # Errors
    ///
    /// `Stopped` if the multiplexer has stopped, `InvalidCallbacks` if the
    /// callbacks supply both insert forms. The future fails with `Stopped`
    /// if the multiplexer stops before becoming ready.
    pub fn add_handle(
        &self,
        callbacks: ObserveCallbacks,
        options: HandleOptions,
    ) -> Result<impl Future<Output = Result<ObserveHandle>> + Send + 'static> {
        callbacks.validate()?;
        {
            let mut state = self.inner.state.lock();
            if state.stopped {
                return Err(Error::Stopped);
            }
            state.pending_adds += 1;
        }

        let core = Arc::new(HandleCore::new(callbacks, &options));
        let mut pending = PendingAdd {
            multiplexer: self.clone(),
            core: core.clone(),
            registered: false,
        };
        let ready = self.inner.phase.subscribe();

        let inner = self.inner.clone();
        let task_core = core.clone();
        let initial = self.inner.queue.run_task("initial_adds", move || async move {
            let docs = {
                let mut state = inner.state.lock();
                // Abandoned before this task ran.
                if task_core.is_stopped() {
                    return Ok(());
                }
                state.handles.insert(task_core.id(), task_core.clone());
                state.cache.snapshot().to_vec()
            };
            for (id, doc) in docs {
                let doc = Arc::new(doc);
                let event = if inner.ordered {
                    Event::AddedBefore {
                        id,
                        doc,
                        before: None,
                    }
                } else {
                    Event::Added { id, doc }
                };
                deliver_guarded(inner.id, &task_core, &event).await;
            }
            Ok(())
        });

        let multiplexer = self.clone();
        Ok(async move {
            initial.await.map_err(|err| match err {
                Error::QueueDestroyed => Error::Stopped,
                err => err,
            })?;
            wait_ready(ready).await?;
            pending.registered = true;
            drop(pending);
            Ok(ObserveHandle::new(core, multiplexer))
        })
    }

    /// Deregisters a handle. With no handles and no pending adds left, the
    /// multiplexer stops.
    pub fn remove_handle(&self, id: HandleId) {
        let stop = {
            let mut state = self.inner.state.lock();
            state.handles.remove(&id);
            self.inner.should_stop(&mut state)
        };
        if stop {
            self.stop();
        }
    }

    /// Stops the multiplexer regardless of pending adds. Every waiting
    /// `add_handle` future fails with `Stopped`.
    pub(crate) fn fail(&self) {
        let stop = {
            let mut state = self.inner.state.lock();
            !std::mem::replace(&mut state.stopped, true)
        };
        if stop {
            self.stop();
        }
    }

    /// Resolves with whether `id` is in the result set.
    pub fn has(&self, id: Id) -> Completion<bool> {
        self.with_snapshot(move |docs| docs.contains(&id))
    }

    /// Resolves with a copy of the document for `id`.
    pub fn get(&self, id: Id) -> Completion<Option<Document>> {
        self.with_snapshot(move |docs| docs.get(&id).cloned())
    }

    /// Resolves with a copy of the result set.
    pub fn snapshot(&self) -> Completion<ResultSet> {
        self.with_snapshot(ResultSet::clone)
    }

    /// Runs `f` against the live result set inside the queue.
    pub fn with_snapshot<T, F>(&self, f: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce(&ResultSet) -> T + Send + 'static,
    {
        let inner = self.inner.clone();
        self.inner.queue.run_task("snapshot", move || async move {
            let state = inner.state.lock();
            Ok(f(state.cache.snapshot()))
        })
    }

    /// Resolves once every change submitted before this call is delivered.
    pub fn flush(&self) -> Completion<()> {
        self.inner.queue.flush()
    }

    fn stop(&self) {
        self.inner.phase.send_replace(Phase::Stopped);
        self.inner.queue.destroy();
        let hook = self.inner.on_stop.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        tracing::debug!(multiplexer = self.inner.id, "multiplexer stopped");
    }
}

impl Inner {
    /// Decides, under the state lock, whether to stop. Returns true once.
    fn should_stop(&self, state: &mut State) -> bool {
        if !state.stopped && state.handles.is_empty() && state.pending_adds == 0 {
            state.stopped = true;
            true
        } else {
            false
        }
    }

    fn copy(&self, doc: &Document) -> Document {
        if self.clone_documents {
            (self.clone)(doc)
        } else {
            doc.clone()
        }
    }

    fn apply_to_cache(&self, cache: &mut ChangeCache, event: &Event) -> Result<()> {
        match event {
            Event::Added { id, doc } => cache.added(id.clone(), self.copy(doc)),
            Event::AddedBefore { id, doc, before } => {
                cache.added_before(id.clone(), self.copy(doc), before.as_ref())
            }
            Event::Changed { id, fields } => cache.changed(id, fields),
            Event::MovedBefore { id, before } => cache.moved_before(id, before.as_ref()),
            Event::Removed { id } => cache.removed(id).map(|_| ()),
        }
    }
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("id", &self.inner.id)
            .field("ordered", &self.inner.ordered)
            .field("phase", &self.phase())
            .field("handles", &self.handle_count())
            .finish()
    }
}

/// Accounts for an `add_handle` call until its future resolves.
struct PendingAdd {
    multiplexer: Multiplexer,
    core: Arc<HandleCore>,
    registered: bool,
}

impl Drop for PendingAdd {
    fn drop(&mut self) {
        let inner = &self.multiplexer.inner;
        let stop = {
            let mut state = inner.state.lock();
            state.pending_adds = state.pending_adds.saturating_sub(1);
            if !self.registered {
                self.core.mark_stopped();
                state.handles.remove(&self.core.id());
            }
            inner.should_stop(&mut state)
        };
        if stop {
            self.multiplexer.stop();
        }
    }
}

async fn wait_ready(mut ready: watch::Receiver<Phase>) -> Result<()> {
    match ready.wait_for(|phase| *phase != Phase::CollectingInitial).await {
        Ok(phase) if *phase == Phase::Ready => Ok(()),
        _ => Err(Error::Stopped),
    }
}

async fn deliver_guarded(multiplexer: MultiplexerId, handle: &HandleCore, event: &Event) {
    let outcome = AssertUnwindSafe(handle.deliver(event)).catch_unwind().await;
    let error = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(error)) => error,
        Err(payload) => Error::task_panicked(event.primitive().name(), payload),
    };
    tracing::warn!(
        multiplexer,
        handle = handle.id(),
        primitive = %event.primitive(),
        error = %error,
        "observe callback failed"
    );
}

async fn fan_out(multiplexer: MultiplexerId, handles: &[Arc<HandleCore>], event: &Event) {
    join_all(
        handles
            .iter()
            .map(|handle| deliver_guarded(multiplexer, handle, event)),
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveset_core::{doc, FieldChange};
    use serde_json::json;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    fn unordered_recorder() -> (ObserveCallbacks, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let (a, c, r) = (log.clone(), log.clone(), log.clone());
        let callbacks = ObserveCallbacks::new()
            .added(move |id, _| a.lock().push(format!("added {id}")))
            .changed(move |id, _| c.lock().push(format!("changed {id}")))
            .removed(move |id| r.lock().push(format!("removed {id}")));
        (callbacks, log)
    }

    fn anchor(before: Option<Id>) -> String {
        before.map_or_else(|| "end".to_string(), |id| id.encode())
    }

    fn ordered_recorder() -> (ObserveCallbacks, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let (a, m, r) = (log.clone(), log.clone(), log.clone());
        let callbacks = ObserveCallbacks::new()
            .added_before(move |id, _, before| {
                a.lock().push(format!("added {id} before {}", anchor(before)))
            })
            .moved_before(move |id, before| {
                m.lock().push(format!("moved {id} before {}", anchor(before)))
            })
            .removed(move |id| r.lock().push(format!("removed {id}")));
        (callbacks, log)
    }

    async fn ready_handle(mux: &Multiplexer, callbacks: ObserveCallbacks) -> ObserveHandle {
        let pending = mux.add_handle(callbacks, HandleOptions::default()).unwrap();
        mux.ready().await.unwrap();
        pending.await.unwrap()
    }

    #[tokio::test]
    async fn test_events_without_handles_are_dropped() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        mux.added(Id::from("a"), Document::new()).await.unwrap();
        assert_eq!(mux.snapshot().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_delivers_to_handle_and_caches() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let (callbacks, log) = unordered_recorder();
        let _handle = ready_handle(&mux, callbacks).await;

        mux.added(Id::from("a"), doc([("n", json!(1))]));
        let mut fields = ChangedFields::new();
        fields.insert("n".into(), FieldChange::Set(json!(2)));
        mux.changed(Id::from("a"), fields);
        mux.flush().await.unwrap();

        assert_eq!(*log.lock(), vec!["added a", "changed a"]);
        assert_eq!(
            mux.get(Id::from("a")).await.unwrap(),
            Some(doc([("n", json!(2))]))
        );
        assert!(mux.has(Id::from("a")).await.unwrap());
    }

    #[tokio::test]
    async fn test_slow_callback_keeps_order() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let callbacks = ObserveCallbacks::new().added_async(move |id, _| {
            let sink = sink.clone();
            async move {
                if id == Id::from("1") {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                sink.lock().push(id.encode());
                Ok(())
            }
        });
        let _handle = ready_handle(&mux, callbacks).await;

        let first = mux.added(Id::from("1"), Document::new());
        let second = mux.added(Id::from("2"), Document::new());
        second.await.unwrap();
        first.await.unwrap();

        assert_eq!(*log.lock(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_invariant_violation_fails_completion() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let (callbacks, log) = unordered_recorder();
        let _handle = ready_handle(&mux, callbacks).await;

        mux.added(Id::from("a"), Document::new()).await.unwrap();
        let err = mux.added(Id::from("a"), Document::new()).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateId { .. }));
        let err = mux.removed(Id::from("zz")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        assert_eq!(*log.lock(), vec!["added a"]);
    }

    #[tokio::test]
    async fn test_late_join_replays_cache() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let (first, _) = unordered_recorder();
        let _first = ready_handle(&mux, first).await;

        mux.added(Id::from("a"), Document::new());
        mux.added(Id::from("b"), Document::new());
        mux.removed(Id::from("a"));

        let (late, log) = unordered_recorder();
        let _late = mux
            .add_handle(late, HandleOptions::default())
            .unwrap()
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["added b"]);
    }

    #[tokio::test]
    async fn test_ordered_replay_uses_added_before() {
        let mux = Multiplexer::new(MultiplexerOptions::ordered());
        let (first, _) = ordered_recorder();
        let _first = ready_handle(&mux, first).await;

        mux.added_before(Id::from("b"), Document::new(), None);
        mux.added_before(Id::from("a"), Document::new(), Some(Id::from("b")));

        let (late, log) = ordered_recorder();
        let _late = mux
            .add_handle(late, HandleOptions::default())
            .unwrap()
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["added a before end", "added b before end"]);
    }

    #[tokio::test]
    async fn test_unordered_handle_on_ordered_multiplexer() {
        let mux = Multiplexer::new(MultiplexerOptions::ordered());
        let (callbacks, log) = unordered_recorder();
        let _handle = ready_handle(&mux, callbacks).await;

        mux.added_before(Id::from("a"), Document::new(), None);
        mux.added_before(Id::from("b"), Document::new(), Some(Id::from("a")));
        mux.moved_before(Id::from("a"), Some(Id::from("b")));
        mux.flush().await.unwrap();

        assert_eq!(*log.lock(), vec!["added a", "added b"]);
        let order: Vec<Id> = mux
            .with_snapshot(|docs| docs.iter().map(|(id, _)| id.clone()).collect())
            .await
            .unwrap();
        assert_eq!(order, vec![Id::from("a"), Id::from("b")]);
    }

    #[tokio::test]
    async fn test_add_handle_waits_for_ready() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let (callbacks, _) = unordered_recorder();
        let pending = mux.add_handle(callbacks, HandleOptions::default()).unwrap();
        let waiter = tokio::spawn(pending);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        mux.ready().await.unwrap();
        let handle = waiter.await.unwrap().unwrap();
        assert!(mux.is_ready());
        assert!(!handle.is_stopped());
    }

    #[tokio::test]
    async fn test_last_stop_stops_multiplexer() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let stopped = Arc::new(Mutex::new(0));
        let counter = stopped.clone();
        mux.on_stop(move || *counter.lock() += 1);

        let (a, _) = unordered_recorder();
        let (b, _) = unordered_recorder();
        let a = ready_handle(&mux, a).await;
        let b = ready_handle(&mux, b).await;
        assert_eq!(mux.handle_count(), 2);

        a.stop();
        a.stop();
        assert!(!mux.is_stopped());

        b.stop();
        assert!(mux.is_stopped());
        assert_eq!(*stopped.lock(), 1);

        assert!(matches!(
            mux.add_handle(ObserveCallbacks::new(), HandleOptions::default()),
            Err(Error::Stopped)
        ));
        assert_eq!(mux.flush().await, Err(Error::QueueDestroyed));
    }

    #[tokio::test]
    async fn test_dropped_pending_add_deregisters() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let (callbacks, _) = unordered_recorder();
        let pending = mux.add_handle(callbacks, HandleOptions::default()).unwrap();
        mux.flush().await.unwrap();
        assert_eq!(mux.handle_count(), 1);

        drop(pending);
        assert_eq!(mux.handle_count(), 0);
        assert!(mux.is_stopped());
    }

    #[tokio::test]
    async fn test_abandoned_adds_stop_before_ready() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let (a, _) = unordered_recorder();
        let (b, _) = unordered_recorder();
        let first = tokio::spawn(mux.add_handle(a, HandleOptions::default()).unwrap());
        let second = mux.add_handle(b, HandleOptions::default()).unwrap();
        mux.flush().await.unwrap();

        // Abandon the second registration and abort the first: nothing
        // remains, so the multiplexer stops while still collecting.
        drop(second);
        first.abort();
        let _ = first.await;
        assert!(mux.is_stopped());
    }

    #[tokio::test]
    async fn test_fail_releases_waiting_adds() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let stopped = Arc::new(Mutex::new(0));
        let counter = stopped.clone();
        mux.on_stop(move || *counter.lock() += 1);

        let (a, _) = unordered_recorder();
        let (b, _) = unordered_recorder();
        let first = tokio::spawn(mux.add_handle(a, HandleOptions::default()).unwrap());
        let second = mux.add_handle(b, HandleOptions::default()).unwrap();

        mux.fail();
        mux.fail();
        assert!(mux.is_stopped());
        assert_eq!(*stopped.lock(), 1);

        let waited = tokio::time::timeout(Duration::from_secs(1), second).await;
        assert!(matches!(waited, Ok(Err(Error::Stopped))));
        let waited = tokio::time::timeout(Duration::from_secs(1), first).await;
        assert!(matches!(waited, Ok(Ok(Err(Error::Stopped)))));
    }

    #[tokio::test]
    async fn test_failing_callback_is_isolated() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let failing = ObserveCallbacks::new()
            .added_async(|_, _| async { Err(Error::callback("nope")) })
            .removed(|_| panic!("removed callback panicked"));
        let (healthy, log) = unordered_recorder();
        let _a = ready_handle(&mux, failing).await;
        let _b = ready_handle(&mux, healthy).await;

        mux.added(Id::from("x"), Document::new()).await.unwrap();
        mux.removed(Id::from("x")).await.unwrap();

        assert_eq!(*log.lock(), vec!["added x", "removed x"]);
    }

    #[tokio::test]
    async fn test_mutating_handles_get_private_copies() {
        let mux = Multiplexer::new(MultiplexerOptions::unordered());
        let seen: Arc<Mutex<Vec<Arc<Document>>>> = Arc::new(Mutex::new(Vec::new()));
        let (s1, s2) = (seen.clone(), seen.clone());
        let shared = ObserveCallbacks::new().added(move |_, doc| s1.lock().push(doc));
        let private = ObserveCallbacks::new().added(move |_, doc| s2.lock().push(doc));

        let _shared = ready_handle(&mux, shared).await;
        let _private = mux
            .add_handle(
                private,
                HandleOptions {
                    non_mutating_callbacks: false,
                    clone: None,
                },
            )
            .unwrap()
            .await
            .unwrap();

        mux.added(Id::from("x"), doc([("n", json!(1))])).await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(!Arc::ptr_eq(&seen[0], &seen[1]));
        assert_eq!(seen[0], seen[1]);
    }

    #[test]
    fn test_observes_by_mode() {
        let ordered = Multiplexer::new(MultiplexerOptions::ordered());
        assert!(ordered.observes(Primitive::AddedBefore));
        assert!(ordered.observes(Primitive::MovedBefore));
        assert!(!ordered.observes(Primitive::Added));
        assert!(ordered.observes(Primitive::Changed));

        let unordered = Multiplexer::new(MultiplexerOptions::unordered());
        assert!(unordered.observes(Primitive::Added));
        assert!(!unordered.observes(Primitive::MovedBefore));
        assert!(unordered.observes(Primitive::Removed));
    }
}
