//! Polling driver.
//!
//! Re-runs a query on an interval and reports the difference from the
//! multiplexer's current result set.

use crate::config::PollingConfig;
use crate::driver::ObserveDriver;
use crate::multiplexer::Multiplexer;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use hashbrown::HashSet;
use liveset_cache::IdMap;
use liveset_core::{Document, Error, Id, Result};
use liveset_diff::{diff_ordered, diff_unordered, DiffOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A query that can be re-run.
pub trait QuerySource: Send + Sync + 'static {
    /// Runs the query, returning `(id, document)` pairs in result order.
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<(Id, Document)>>>;
}

/// Drives a multiplexer by polling a [`QuerySource`].
pub struct PollingDriver<S> {
    source: Arc<S>,
    ordered: bool,
    interval: Option<Duration>,
    diff: DiffOptions,
    task: Mutex<Option<JoinHandle<()>>>,
    // Held for the whole of one poll; manual and interval polls take turns.
    running: Arc<AsyncMutex<()>>,
    stopped: AtomicBool,
}

impl<S: QuerySource> PollingDriver<S> {
    pub fn new(source: S, ordered: bool, config: &PollingConfig) -> Self {
        Self {
            source: Arc::new(source),
            ordered,
            interval: config.interval(),
            diff: DiffOptions::default(),
            task: Mutex::new(None),
            running: Arc::new(AsyncMutex::new(())),
            stopped: AtomicBool::new(false),
        }
    }

    /// Sets the equality and projection used when diffing polls.
    pub fn with_diff_options(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }

    /// Runs one poll against `multiplexer` and waits for its changes to be
    /// delivered. Waits for a poll already in flight to finish first.
    pub async fn poll(&self, multiplexer: &Multiplexer) -> Result<()> {
        let _running = self.running.lock().await;
        poll_once(&*self.source, multiplexer, self.ordered, &self.diff).await
    }

    /// Returns true while the background poll loop is alive.
    pub fn is_polling(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    fn start_polling(&self, multiplexer: Multiplexer, period: Duration) {
        let source = self.source.clone();
        let ordered = self.ordered;
        let diff = self.diff.clone();
        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if multiplexer.is_stopped() {
                    break;
                }
                let outcome = {
                    let _running = running.lock().await;
                    poll_once(&*source, &multiplexer, ordered, &diff).await
                };
                match outcome {
                    Ok(()) => {}
                    Err(Error::QueueDestroyed) | Err(Error::Stopped) => break,
                    Err(err) => {
                        tracing::warn!(
                            multiplexer = multiplexer.id(),
                            error = %err,
                            "poll failed"
                        );
                    }
                }
            }
            tracing::debug!(multiplexer = multiplexer.id(), "polling loop exited");
        });
        *self.task.lock() = Some(task);
    }
}

impl<S: QuerySource> ObserveDriver for PollingDriver<S> {
    fn init(&self, multiplexer: Multiplexer) -> BoxFuture<'_, Result<()>> {
        async move {
            let docs = fetch_checked(&*self.source).await?;
            tracing::debug!(
                multiplexer = multiplexer.id(),
                count = docs.len(),
                "reporting initial result set"
            );
            let adds = docs.into_iter().map(|(id, doc)| {
                if self.ordered {
                    multiplexer.added_before(id, doc, None)
                } else {
                    multiplexer.added(id, doc)
                }
            });
            try_join_all(adds.collect::<Vec<_>>()).await?;
            multiplexer.ready().await?;

            if let Some(period) = self.interval {
                if !self.stopped.load(Ordering::Acquire) {
                    self.start_polling(multiplexer, period);
                }
            }
            Ok(())
        }
        .boxed()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

/// Fetches and rejects duplicate ids.
async fn fetch_checked<S: QuerySource + ?Sized>(source: &S) -> Result<Vec<(Id, Document)>> {
    let docs = source.fetch().await?;
    let mut seen = HashSet::with_capacity(docs.len());
    for (id, _) in &docs {
        if !seen.insert(id.encode()) {
            return Err(Error::duplicate_id(id));
        }
    }
    Ok(docs)
}

async fn poll_once<S: QuerySource + ?Sized>(
    source: &S,
    multiplexer: &Multiplexer,
    ordered: bool,
    diff: &DiffOptions,
) -> Result<()> {
    let fresh = fetch_checked(source).await?;
    multiplexer.flush().await?;

    let changes = if ordered {
        let current = multiplexer.with_snapshot(|docs| docs.to_vec()).await?;
        diff_ordered(&current, &fresh, diff)
    } else {
        let current = multiplexer.with_snapshot(|docs| docs.to_id_map()).await?;
        let fresh: IdMap<Document> = fresh.into_iter().collect();
        diff_unordered(&current, &fresh, diff)
    };

    if !changes.is_empty() {
        tracing::trace!(
            multiplexer = multiplexer.id(),
            changes = changes.len(),
            "poll found changes"
        );
    }
    let applied: Vec<_> = changes.into_iter().map(|c| multiplexer.apply(c)).collect();
    try_join_all(applied).await?;
    multiplexer.flush().await
}
