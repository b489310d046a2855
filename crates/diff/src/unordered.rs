//! Unordered result-set diff.

use crate::fields::make_changed_fields;
use crate::options::DiffOptions;
use liveset_cache::IdMap;
use liveset_core::{Change, Document};

/// Computes the changes that turn `old` into `new`, ignoring order.
///
/// Ids in `new` are walked first and produce `Added` or `Changed`; ids only
/// in `old` then produce `Removed`.
pub fn diff_unordered(
    old: &IdMap<Document>,
    new: &IdMap<Document>,
    options: &DiffOptions,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new_doc) in new {
        match old.get(id) {
            None => changes.push(Change::added(id.clone(), options.project(new_doc))),
            Some(old_doc) => {
                if options.docs_equal(old_doc, new_doc) {
                    continue;
                }
                let fields = make_changed_fields(
                    &options.project(old_doc),
                    &options.project(new_doc),
                    |a, b| options.values_equal(a, b),
                );
                if !fields.is_empty() {
                    changes.push(Change::changed(id.clone(), fields));
                }
            }
        }
    }

    for id in old.keys() {
        if !new.contains(id) {
            changes.push(Change::removed(id.clone()));
        }
    }

    changes
}
