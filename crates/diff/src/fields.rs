//! Field-level document diffs.

use liveset_core::{ChangedFields, Document, FieldChange, Value};

/// Computes the patch that turns `old` into `new`.
///
/// Fields only in `new`, or present in both but unequal under `equals`,
/// become `Set`; fields only in `old` become `Unset`.
pub fn make_changed_fields<E>(old: &Document, new: &Document, equals: E) -> ChangedFields
where
    E: Fn(&Value, &Value) -> bool,
{
    let mut fields = ChangedFields::new();
    for (key, old_value) in old {
        match new.get(key) {
            Some(new_value) if !equals(old_value, new_value) => {
                fields.insert(key.clone(), FieldChange::Set(new_value.clone()));
            }
            Some(_) => {}
            None => {
                fields.insert(key.clone(), FieldChange::Unset);
            }
        }
    }
    for (key, new_value) in new {
        if !old.contains_key(key) {
            fields.insert(key.clone(), FieldChange::Set(new_value.clone()));
        }
    }
    fields
}
