//! liveset cache - materialized result sets driven by change primitives.
//!
//! - `OrderedMap`: linked map with O(1) positional insert, remove and move
//! - `IdMap`: unordered map keyed by canonical id
//! - `ResultSet`: either of the above, holding documents
//! - `ChangeCache`: applies `Change`s to a `ResultSet`, enforcing membership
//!   invariants
//!
//! # Example
//!
//! ```rust
//! use liveset_cache::{CacheOptions, ChangeCache};
//! use liveset_core::{Document, Id};
//!
//! let mut cache = ChangeCache::new(CacheOptions::ordered());
//! cache.added(Id::from("a"), Document::new()).unwrap();
//! cache.added(Id::from("b"), Document::new()).unwrap();
//! cache.moved_before(&Id::from("b"), Some(&Id::from("a"))).unwrap();
//!
//! let order: Vec<_> = cache.iter().map(|(id, _)| id.clone()).collect();
//! assert_eq!(order, vec![Id::from("b"), Id::from("a")]);
//! ```

pub mod change_cache;
pub mod id_map;
pub mod ordered_map;
pub mod result_set;

pub use change_cache::{CacheOptions, ChangeCache};
pub use id_map::IdMap;
pub use ordered_map::OrderedMap;
pub use result_set::ResultSet;
