//! Serial task queue.
//!
//! Tasks run one at a time in submission order on a drain loop spawned onto
//! the Tokio runtime. A task that suspends holds the queue until it
//! finishes, so effects become visible strictly in FIFO order.

use crate::completion::Completion;
use futures::future::BoxFuture;
use futures::FutureExt;
use liveset_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Receives errors that no caller is waiting for.
pub type ErrorHandler = Arc<dyn Fn(&'static str, Error) + Send + Sync>;

fn log_unhandled(task: &'static str, error: Error) {
    tracing::warn!(task, error = %error, "unhandled error in queued task");
}

struct Task {
    name: &'static str,
    future: BoxFuture<'static, ()>,
}

#[derive(Default)]
struct State {
    tasks: VecDeque<Task>,
    running: bool,
    destroyed: bool,
}

struct Inner {
    state: Mutex<State>,
    on_error: ErrorHandler,
}

/// A FIFO queue of asynchronous tasks with at most one task in flight.
///
/// Cloning yields another handle to the same queue. Submitting requires a
/// Tokio runtime context.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    /// Creates a queue whose unhandled errors are logged with `tracing`.
    pub fn new() -> Self {
        Self::with_error_handler(log_unhandled)
    }

    /// Creates a queue with a custom fallback error handler.
    pub fn with_error_handler<H>(handler: H) -> Self
    where
        H: Fn(&'static str, Error) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                on_error: Arc::new(handler),
            }),
        }
    }

    /// Enqueues a task whose result nobody awaits. Errors and panics go to
    /// the fallback handler.
    pub fn queue_task<F, Fut>(&self, name: &'static str, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let on_error = self.inner.on_error.clone();
        let future = async move {
            if let Err(err) = guarded(name, f).await {
                on_error(name, err);
            }
        };
        self.push(Task {
            name,
            future: future.boxed(),
        });
    }

    /// Enqueues a task and returns a future for its result.
    ///
    /// The task is enqueued now, not when the completion is first polled.
    pub fn run_task<T, F, Fut>(&self, name: &'static str, f: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let on_error = self.inner.on_error.clone();
        let future = async move {
            let result = guarded(name, f).await;
            if let Err(Err(err)) = tx.send(result) {
                on_error(name, err);
            }
        };
        self.push(Task {
            name,
            future: future.boxed(),
        });
        Completion::new(rx)
    }

    /// Resolves once every task submitted before this call has finished.
    pub fn flush(&self) -> Completion<()> {
        self.run_task("flush", || async { Ok(()) })
    }

    /// Drops every pending task without running it and rejects later
    /// submissions. Their completions resolve to `Err(QueueDestroyed)`.
    /// A task already in flight runs to completion.
    pub fn destroy(&self) {
        let dropped = {
            let mut state = self.inner.state.lock();
            state.destroyed = true;
            std::mem::take(&mut state.tasks)
        };
        tracing::debug!(pending = dropped.len(), "task queue destroyed");
        drop(dropped);
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.inner.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true while the drain loop is active.
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.lock().destroyed
    }

    fn push(&self, task: Task) {
        let start = {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                tracing::debug!(task = task.name, "discarding task submitted to destroyed queue");
                return;
            }
            state.tasks.push_back(task);
            !std::mem::replace(&mut state.running, true)
        };
        if start {
            tokio::spawn(drain(self.inner.clone()));
        }
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TaskQueue")
            .field("pending", &state.tasks.len())
            .field("running", &state.running)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

async fn drain(inner: Arc<Inner>) {
    loop {
        let task = {
            let mut state = inner.state.lock();
            match state.tasks.pop_front() {
                Some(task) => task,
                None => {
                    state.running = false;
                    return;
                }
            }
        };
        tracing::trace!(task = task.name, "running queued task");
        task.future.await;
    }
}

/// Runs `f`, converting a panic into `Error::TaskPanicked`.
async fn guarded<T, F, Fut>(name: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(async move { f().await }).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::task_panicked(name, payload)),
    }
}
