//! Ordered result-set diff.
//!
//! Documents that keep their relative order are found as the longest
//! increasing subsequence of their old positions, taken in new order. Those
//! stay put; everything else in both sets is moved. The new list is then
//! walked in groups, each closed by an unmoved anchor (and the last by the
//! end of the list), placing the group's members before the anchor.

use crate::fields::make_changed_fields;
use crate::options::DiffOptions;
use hashbrown::{HashMap, HashSet};
use liveset_core::{Change, Document, Id};

/// Returns the positions in `old_positions` that form its longest
/// increasing subsequence, in ascending order. `None` entries are skipped.
///
/// The inner search scans backwards from the current best length, which is
/// O(N·k) for k reorderings and quick when few documents moved.
pub fn unmoved_positions(old_positions: &[Option<usize>]) -> Vec<usize> {
    let n = old_positions.len();
    // seq_ends[j]: position of the last element of the best subsequence of
    // length j + 1 found so far.
    let mut seq_ends: Vec<usize> = Vec::with_capacity(n);
    let mut ptrs: Vec<Option<usize>> = vec![None; n];

    for (i, old) in old_positions.iter().enumerate() {
        let Some(old) = *old else { continue };
        let mut j = seq_ends.len();
        while j > 0 {
            if old_positions[seq_ends[j - 1]] < Some(old) {
                break;
            }
            j -= 1;
        }
        ptrs[i] = if j == 0 { None } else { Some(seq_ends[j - 1]) };
        if j == seq_ends.len() {
            seq_ends.push(i);
        } else {
            seq_ends[j] = i;
        }
    }

    let mut unmoved = Vec::with_capacity(seq_ends.len());
    let mut cursor = seq_ends.last().copied();
    while let Some(i) = cursor {
        unmoved.push(i);
        cursor = ptrs[i];
    }
    unmoved.reverse();
    unmoved
}

/// Computes the changes that turn the ordered list `old` into `new`.
///
/// `Removed` changes come first, then for each group in new order:
/// `AddedBefore` for new ids, `Changed` (if any) followed by `MovedBefore`
/// for relocated ids, and finally `Changed` for the group's anchor. Ids in
/// both lists that were not relocated never produce `MovedBefore`.
pub fn diff_ordered(
    old: &[(Id, Document)],
    new: &[(Id, Document)],
    options: &DiffOptions,
) -> Vec<Change> {
    let old_index: HashMap<String, usize> = old
        .iter()
        .enumerate()
        .map(|(i, (id, _))| (id.encode(), i))
        .collect();
    let new_keys: Vec<String> = new.iter().map(|(id, _)| id.encode()).collect();
    let new_present: HashSet<&str> = new_keys.iter().map(String::as_str).collect();

    let old_positions: Vec<Option<usize>> = new_keys
        .iter()
        .map(|key| old_index.get(key).copied())
        .collect();
    let mut anchors = unmoved_positions(&old_positions);
    // Virtual anchor at the end of the list.
    anchors.push(new.len());

    let mut changes = Vec::new();

    for (id, _) in old {
        if !new_present.contains(id.encode().as_str()) {
            changes.push(Change::removed(id.clone()));
        }
    }

    let mut start = 0;
    for end in anchors {
        let anchor = new.get(end).map(|(id, _)| id.clone());

        for i in start..end {
            let (id, new_doc) = &new[i];
            match old_positions[i] {
                None => changes.push(Change::added_before(
                    id.clone(),
                    options.project(new_doc),
                    anchor.clone(),
                )),
                Some(old_pos) => {
                    push_changed(&mut changes, id, &old[old_pos].1, new_doc, options);
                    changes.push(Change::moved_before(id.clone(), anchor.clone()));
                }
            }
        }

        if let (Some((id, new_doc)), Some(Some(old_pos))) = (new.get(end), old_positions.get(end)) {
            push_changed(&mut changes, id, &old[*old_pos].1, new_doc, options);
        }
        start = end + 1;
    }

    changes
}

fn push_changed(
    changes: &mut Vec<Change>,
    id: &Id,
    old_doc: &Document,
    new_doc: &Document,
    options: &DiffOptions,
) {
    let fields = make_changed_fields(
        &options.project(old_doc),
        &options.project(new_doc),
        |a, b| options.values_equal(a, b),
    );
    if !fields.is_empty() {
        changes.push(Change::changed(id.clone(), fields));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveset_core::{doc, ChangedFields, FieldChange, Primitive};
    use serde_json::json;

    fn list(ids: &[&str]) -> Vec<(Id, Document)> {
        ids.iter()
            .map(|id| (Id::from(*id), doc([("name", json!(id))])))
            .collect()
    }

    fn moves(changes: &[Change]) -> usize {
        changes
            .iter()
            .filter(|c| c.primitive() == Primitive::MovedBefore)
            .count()
    }

    #[test]
    fn test_unmoved_positions() {
        let seq = [Some(2), Some(0), Some(1)];
        assert_eq!(unmoved_positions(&seq), vec![1, 2]);

        let seq = [Some(0), None, Some(1), Some(2)];
        assert_eq!(unmoved_positions(&seq), vec![0, 2, 3]);

        let seq = [Some(3), Some(2), Some(1), Some(0)];
        assert_eq!(unmoved_positions(&seq).len(), 1);

        assert!(unmoved_positions(&[None, None]).is_empty());
        assert!(unmoved_positions(&[]).is_empty());
    }

    #[test]
    fn test_identical_lists_produce_nothing() {
        let a = list(&["a", "b", "c"]);
        assert!(diff_ordered(&a, &a, &DiffOptions::default()).is_empty());
    }

    #[test]
    fn test_rotation_is_one_move() {
        let old = list(&["1", "2", "3"]);
        let new = list(&["3", "1", "2"]);
        let changes = diff_ordered(&old, &new, &DiffOptions::default());
        assert_eq!(
            changes,
            vec![Change::moved_before("3", Some(Id::from("1")))]
        );
    }

    #[test]
    fn test_move_to_end() {
        let old = list(&["a", "b", "c"]);
        let new = list(&["b", "c", "a"]);
        let changes = diff_ordered(&old, &new, &DiffOptions::default());
        assert_eq!(changes, vec![Change::moved_before("a", None)]);
    }

    #[test]
    fn test_add_and_remove() {
        let old = list(&["a", "b", "c"]);
        let new = list(&["x", "a", "c", "y"]);
        let changes = diff_ordered(&old, &new, &DiffOptions::default());
        assert_eq!(
            changes,
            vec![
                Change::removed("b"),
                Change::added_before("x", doc([("name", json!("x"))]), Some(Id::from("a"))),
                Change::added_before("y", doc([("name", json!("y"))]), None),
            ]
        );
    }

    #[test]
    fn test_tie_keeps_later_anchor() {
        let old = list(&["a", "b"]);
        let mut new = list(&["b", "a"]);
        new[1].1.insert("name".into(), json!("A"));

        let changes = diff_ordered(&old, &new, &DiffOptions::default());
        let mut fields = ChangedFields::new();
        fields.insert("name".into(), FieldChange::Set(json!("A")));
        // Ties go to the later element: a stays and b moves before it.
        assert_eq!(
            changes,
            vec![
                Change::moved_before("b", Some(Id::from("a"))),
                Change::changed("a", fields),
            ]
        );
    }

    #[test]
    fn test_changed_precedes_move() {
        let old = list(&["a", "b", "c"]);
        let mut new = list(&["c", "a", "b"]);
        new[0].1.insert("name".into(), json!("C"));

        let changes = diff_ordered(&old, &new, &DiffOptions::default());
        let mut fields = ChangedFields::new();
        fields.insert("name".into(), FieldChange::Set(json!("C")));
        assert_eq!(
            changes,
            vec![
                Change::changed("c", fields),
                Change::moved_before("c", Some(Id::from("a"))),
            ]
        );
    }

    #[test]
    fn test_anchor_reports_change_only() {
        let old = list(&["a", "b"]);
        let mut new = list(&["a", "b"]);
        new[0].1.insert("extra".into(), json!(true));

        let changes = diff_ordered(&old, &new, &DiffOptions::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].primitive(), Primitive::Changed);
        assert_eq!(moves(&changes), 0);
    }

    #[test]
    fn test_reverse_moves_all_but_one() {
        let old = list(&["a", "b", "c", "d"]);
        let new = list(&["d", "c", "b", "a"]);
        let changes = diff_ordered(&old, &new, &DiffOptions::default());
        assert_eq!(moves(&changes), 3);
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn test_empty_sides() {
        let a = list(&["a", "b"]);
        let adds = diff_ordered(&[], &a, &DiffOptions::default());
        assert_eq!(adds.len(), 2);
        assert!(adds.iter().all(|c| c.before().is_none()));

        let removes = diff_ordered(&a, &[], &DiffOptions::default());
        assert_eq!(removes, vec![Change::removed("a"), Change::removed("b")]);
    }
}
