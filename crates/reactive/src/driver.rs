//! Driver interface.
//!
//! A driver produces the change stream for one multiplexer: it reports the
//! initial result set, calls [`Multiplexer::ready`], then keeps reporting
//! changes until stopped.

use crate::multiplexer::Multiplexer;
use futures::future::BoxFuture;
use liveset_core::Result;

/// Feeds a multiplexer.
pub trait ObserveDriver: Send + Sync {
    /// Reports the initial result set and calls `ready()` exactly once.
    /// Later changes may be reported from background tasks.
    fn init(&self, multiplexer: Multiplexer) -> BoxFuture<'_, Result<()>>;

    /// Stops reporting. Called when the multiplexer's last handle stops.
    fn stop(&self);
}
