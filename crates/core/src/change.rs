//! Change primitives.
//!
//! A change stream is a sequence of [`Change`] values. Replaying a stream
//! against an empty result set reproduces the result set it describes.

use crate::document::{ChangedFields, Document};
use crate::id::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a change, without its payload.
///
/// Subscribers declare which primitives they want delivered by supplying the
/// matching callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Primitive {
    Added,
    AddedBefore,
    Changed,
    MovedBefore,
    Removed,
}

impl Primitive {
    /// All primitives, in declaration order.
    pub const ALL: [Primitive; 5] = [
        Primitive::Added,
        Primitive::AddedBefore,
        Primitive::Changed,
        Primitive::MovedBefore,
        Primitive::Removed,
    ];

    /// Returns the callback name for this primitive.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Added => "added",
            Primitive::AddedBefore => "addedBefore",
            Primitive::Changed => "changed",
            Primitive::MovedBefore => "movedBefore",
            Primitive::Removed => "removed",
        }
    }

    /// Returns true for primitives that carry position information.
    #[inline]
    pub fn is_positional(self) -> bool {
        matches!(self, Primitive::AddedBefore | Primitive::MovedBefore)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single change to a result set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Change {
    /// Unordered insert.
    Added { id: Id, doc: Document },
    /// Ordered insert before `before`, or append when `before` is `None`.
    AddedBefore {
        id: Id,
        doc: Document,
        before: Option<Id>,
    },
    /// Partial update.
    Changed { id: Id, fields: ChangedFields },
    /// Reposition before `before`, or to the end when `before` is `None`.
    MovedBefore { id: Id, before: Option<Id> },
    /// Removal.
    Removed { id: Id },
}

impl Change {
    /// Creates an unordered insert.
    pub fn added(id: impl Into<Id>, doc: Document) -> Self {
        Change::Added { id: id.into(), doc }
    }

    /// Creates an ordered insert.
    pub fn added_before(id: impl Into<Id>, doc: Document, before: Option<Id>) -> Self {
        Change::AddedBefore {
            id: id.into(),
            doc,
            before,
        }
    }

    /// Creates a partial update.
    pub fn changed(id: impl Into<Id>, fields: ChangedFields) -> Self {
        Change::Changed {
            id: id.into(),
            fields,
        }
    }

    /// Creates a move.
    pub fn moved_before(id: impl Into<Id>, before: Option<Id>) -> Self {
        Change::MovedBefore {
            id: id.into(),
            before,
        }
    }

    /// Creates a removal.
    pub fn removed(id: impl Into<Id>) -> Self {
        Change::Removed { id: id.into() }
    }

    /// Returns the kind of this change.
    pub fn primitive(&self) -> Primitive {
        match self {
            Change::Added { .. } => Primitive::Added,
            Change::AddedBefore { .. } => Primitive::AddedBefore,
            Change::Changed { .. } => Primitive::Changed,
            Change::MovedBefore { .. } => Primitive::MovedBefore,
            Change::Removed { .. } => Primitive::Removed,
        }
    }

    /// Returns the id of the document this change targets.
    pub fn id(&self) -> &Id {
        match self {
            Change::Added { id, .. }
            | Change::AddedBefore { id, .. }
            | Change::Changed { id, .. }
            | Change::MovedBefore { id, .. }
            | Change::Removed { id } => id,
        }
    }

    /// Returns the anchor of a positional change.
    pub fn before(&self) -> Option<&Id> {
        match self {
            Change::AddedBefore { before, .. } | Change::MovedBefore { before, .. } => {
                before.as_ref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{doc, FieldChange};
    use serde_json::json;

    #[test]
    fn test_primitive_of_change() {
        assert_eq!(
            Change::added("a", Document::new()).primitive(),
            Primitive::Added
        );
        assert_eq!(
            Change::moved_before("a", None).primitive(),
            Primitive::MovedBefore
        );
        assert_eq!(Change::removed("a").primitive(), Primitive::Removed);
    }

    #[test]
    fn test_change_accessors() {
        let change = Change::added_before("b", Document::new(), Some(Id::from("a")));
        assert_eq!(change.id(), &Id::from("b"));
        assert_eq!(change.before(), Some(&Id::from("a")));
        assert_eq!(Change::removed("b").before(), None);
    }

    #[test]
    fn test_primitive_names() {
        let names: Vec<&str> = Primitive::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec!["added", "addedBefore", "changed", "movedBefore", "removed"]
        );
        assert!(Primitive::AddedBefore.is_positional());
        assert!(!Primitive::Changed.is_positional());
    }

    #[test]
    fn test_change_serde() {
        let mut fields = ChangedFields::new();
        fields.insert("f".into(), FieldChange::Unset);
        let change = Change::changed(7i64, fields);
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["op"], json!("changed"));
        assert_eq!(value["fields"]["f"], json!("unset"));
        let back: Change = serde_json::from_value(value).unwrap();
        assert_eq!(back, change);

        let change = Change::added_before("x", doc([("n", json!(1))]), None);
        let back: Change = serde_json::from_str(&serde_json::to_string(&change).unwrap()).unwrap();
        assert_eq!(back, change);
    }
}
