//! liveset diff - compute change streams between two result sets.
//!
//! Used by polling drivers that re-run a query and need to report the
//! difference to a multiplexer:
//!
//! - `diff_unordered`: membership and field changes
//! - `diff_ordered`: the same plus a minimal set of moves, computed from the
//!   longest increasing subsequence of old positions
//! - `make_changed_fields`: field-level patch between two documents
//!
//! # Example
//!
//! ```rust
//! use liveset_core::{doc, Change, Id};
//! use liveset_diff::{diff_ordered, DiffOptions};
//! use serde_json::json;
//!
//! let entry = |id: &str| (Id::from(id), doc([("v", json!(1))]));
//! let old = vec![entry("1"), entry("2"), entry("3")];
//! let new = vec![entry("3"), entry("1"), entry("2")];
//!
//! let changes = diff_ordered(&old, &new, &DiffOptions::default());
//! assert_eq!(changes, vec![Change::moved_before("3", Some(Id::from("1")))]);
//! ```

mod fields;
mod options;
mod ordered;
mod unordered;

pub use fields::make_changed_fields;
pub use options::{DiffOptions, ProjectionFn};
pub use ordered::{diff_ordered, unmoved_positions};
pub use unordered::diff_unordered;
