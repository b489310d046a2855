//! Documents and field-level patches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A field value.
pub type Value = serde_json::Value;

/// A document body: field name to value, without the identifier field.
pub type Document = serde_json::Map<String, Value>;

/// A field-level patch, keyed by field name.
pub type ChangedFields = BTreeMap<String, FieldChange>;

/// Strategy used to copy a document.
pub type CloneFn = Arc<dyn Fn(&Document) -> Document + Send + Sync>;

/// Predicate used to compare two field values (or two whole documents
/// wrapped as objects).
pub type EqualsFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// A single field's change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldChange {
    /// Set the field to the value.
    Set(Value),
    /// Delete the field.
    Unset,
}

impl FieldChange {
    /// Returns the new value, or `None` if the field is being deleted.
    #[inline]
    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldChange::Set(v) => Some(v),
            FieldChange::Unset => None,
        }
    }

    /// Returns true if this change deletes the field.
    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, FieldChange::Unset)
    }
}

/// Applies a patch to a document in place.
///
/// `Unset` removes the field entirely rather than storing a null.
pub fn apply_changes(doc: &mut Document, fields: &ChangedFields) {
    for (key, change) in fields {
        match change {
            FieldChange::Set(value) => {
                doc.insert(key.clone(), value.clone());
            }
            FieldChange::Unset => {
                doc.remove(key);
            }
        }
    }
}

/// Default copy strategy: a full structural copy.
pub fn deep_clone(doc: &Document) -> Document {
    doc.clone()
}

/// Default equality predicate: structural equality.
pub fn deep_equals(a: &Value, b: &Value) -> bool {
    a == b
}

/// Returns the default [`CloneFn`].
pub fn default_clone() -> CloneFn {
    Arc::new(deep_clone)
}

/// Returns the default [`EqualsFn`].
pub fn default_equals() -> EqualsFn {
    Arc::new(deep_equals)
}

/// Builds a document from `(field, value)` pairs.
pub fn doc<I, K>(fields: I) -> Document
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_set_and_unset() {
        let mut d = doc([("f", json!(1)), ("g", json!("keep"))]);
        let mut fields = ChangedFields::new();
        fields.insert("f".into(), FieldChange::Unset);
        fields.insert("h".into(), FieldChange::Set(json!(true)));

        apply_changes(&mut d, &fields);

        assert!(!d.contains_key("f"));
        assert_eq!(d.get("g"), Some(&json!("keep")));
        assert_eq!(d.get("h"), Some(&json!(true)));
    }

    #[test]
    fn test_unset_is_not_null() {
        let mut d = doc([("f", json!(1))]);
        let mut fields = ChangedFields::new();
        fields.insert("f".into(), FieldChange::Unset);
        apply_changes(&mut d, &fields);
        assert_eq!(d.get("f"), None);

        let mut fields = ChangedFields::new();
        fields.insert("f".into(), FieldChange::Set(Value::Null));
        apply_changes(&mut d, &fields);
        assert_eq!(d.get("f"), Some(&Value::Null));
    }

    #[test]
    fn test_field_change_serde() {
        let set = FieldChange::Set(json!(3));
        assert_eq!(serde_json::to_value(&set).unwrap(), json!({"set": 3}));
        assert_eq!(
            serde_json::to_value(&FieldChange::Unset).unwrap(),
            json!("unset")
        );
        let back: FieldChange = serde_json::from_value(json!("unset")).unwrap();
        assert!(back.is_unset());
    }

    #[test]
    fn test_defaults() {
        let d = doc([("a", json!({"nested": [1, 2]}))]);
        let copy = default_clone()(&d);
        assert_eq!(copy, d);
        assert!(default_equals()(&json!([1, 2]), &json!([1, 2])));
        assert!(!default_equals()(&json!(1), &json!(1.0)));
    }
}
