//! liveset reactive - live-query observation.
//!
//! A driver reports changes to a query's result set; a [`Multiplexer`]
//! caches the result set and fans each change out to every subscriber of
//! that query, in order, replaying the cached set to subscribers that join
//! late.
//!
//! # Core Concepts
//!
//! - `Multiplexer`: one per live query; owns the cache and the handle set
//! - `ObserveHandle`: a subscriber's registration, used to stop it
//! - `ObserveDriver`: the source of changes (see `PollingDriver`)
//! - `MultiplexerRegistry`: shares multiplexers between equal subscriptions
//!
//! # Entry Points
//!
//! - `observe_changes()`: primitive callbacks (`added`, `changed`, ...)
//! - `observe()`: document callbacks with old documents and indices
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::future::{BoxFuture, FutureExt};
//! use liveset_core::{doc, Document, Id, Result};
//! use liveset_reactive::{
//!     observe_changes, MultiplexerRegistry, ObserveCallbacks, ObserveDriver, ObserveOptions,
//!     PollingConfig, PollingDriver, QuerySource,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Users;
//!
//! impl QuerySource for Users {
//!     fn fetch(&self) -> BoxFuture<'_, Result<Vec<(Id, Document)>>> {
//!         async { Ok(vec![(Id::from("u1"), doc([("name", json!("Ada"))]))]) }.boxed()
//!     }
//! }
//!
//! # async fn demo() -> Result<()> {
//! let registry = MultiplexerRegistry::new();
//! let callbacks = ObserveCallbacks::new()
//!     .added(|id, doc| println!("added {id}: {doc:?}"))
//!     .removed(|id| println!("removed {id}"));
//! let handle = observe_changes(
//!     &registry,
//!     callbacks,
//!     ObserveOptions::new().shared_as("users"),
//!     |_, ordered| Arc::new(PollingDriver::new(Users, ordered, &PollingConfig::default()))
//!         as Arc<dyn ObserveDriver>,
//! )
//! .await?;
//! handle.stop();
//! # Ok(())
//! # }
//! ```

pub mod callbacks;
pub mod config;
pub mod driver;
pub mod handle;
pub mod multiplexer;
pub mod observe;
pub mod observe_docs;
pub mod polling;
pub mod registry;

pub use callbacks::{CallbackFuture, ObserveCallbacks};
pub use config::{MultiplexerIdFn, ObserveOptions, PollingConfig, DEFAULT_POLLING_INTERVAL_MS};
pub use driver::ObserveDriver;
pub use handle::{HandleId, HandleOptions, ObserveHandle};
pub use multiplexer::{Multiplexer, MultiplexerId, MultiplexerOptions, Phase};
pub use observe::observe_changes;
pub use observe_docs::{observe, DocumentCallbacks};
pub use polling::{PollingDriver, QuerySource};
pub use registry::MultiplexerRegistry;
