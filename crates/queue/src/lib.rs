//! liveset queue - a serial asynchronous task queue.
//!
//! Every multiplexer owns one [`TaskQueue`]. All of its mutation and
//! delivery runs inside queued tasks, so events are observed in exactly the
//! order they were submitted even when subscriber callbacks suspend.
//!
//! ```rust,no_run
//! # async fn demo() {
//! use liveset_queue::TaskQueue;
//!
//! let queue = TaskQueue::new();
//! let answer = queue.run_task("compute", || async { Ok(6 * 7) });
//! queue.queue_task("log", || async {
//!     tracing::info!("runs after compute");
//!     Ok(())
//! });
//! assert_eq!(answer.await, Ok(42));
//! queue.flush().await.unwrap();
//! # }
//! ```

mod completion;
mod queue;

pub use completion::Completion;
pub use queue::{ErrorHandler, TaskQueue};
