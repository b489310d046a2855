//! liveset core - identifiers, documents and change primitives.
//!
//! This crate provides the foundational types shared by every liveset crate:
//!
//! - `Id`: document identifiers with a lossless, type-tagged canonical string
//! - `Document`: a JSON object body, plus `ChangedFields` patches
//! - `Change`/`Primitive`: the five change primitives
//! - `Error`: error types for cache, queue and multiplexer operations
//!
//! # Example
//!
//! ```rust
//! use liveset_core::{apply_changes, doc, ChangedFields, FieldChange, Id};
//! use serde_json::json;
//!
//! let id = Id::timestamp(1_700_000_000_000);
//! assert_eq!(Id::decode(&id.encode()).unwrap(), id);
//!
//! let mut d = doc([("name", json!("Alice")), ("age", json!(30))]);
//! let mut fields = ChangedFields::new();
//! fields.insert("age".into(), FieldChange::Unset);
//! apply_changes(&mut d, &fields);
//! assert!(!d.contains_key("age"));
//! ```

mod change;
mod document;
mod error;
mod id;

pub use change::{Change, Primitive};
pub use document::{
    apply_changes, deep_clone, deep_equals, default_clone, default_equals, doc, ChangedFields,
    CloneFn, Document, EqualsFn, FieldChange, Value,
};
pub use error::{Error, Result};
pub use id::Id;
