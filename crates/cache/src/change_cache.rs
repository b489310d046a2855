//! Change cache: replays change primitives onto a [`ResultSet`].

use crate::result_set::{Iter, ResultSet};
use liveset_core::{
    apply_changes, default_clone, Change, ChangedFields, CloneFn, Document, Error, Id, Result,
};
use std::fmt;

/// Construction options for a [`ChangeCache`].
#[derive(Clone)]
pub struct CacheOptions {
    /// Keep documents in list order and accept positional primitives.
    pub ordered: bool,
    /// Run inserted documents through the copy strategy.
    pub clone_documents: bool,
    /// Copy strategy; a deep copy when `None`.
    pub clone: Option<CloneFn>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ordered: false,
            clone_documents: true,
            clone: None,
        }
    }
}

impl CacheOptions {
    pub fn ordered() -> Self {
        Self {
            ordered: true,
            ..Self::default()
        }
    }

    pub fn unordered() -> Self {
        Self::default()
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("ordered", &self.ordered)
            .field("clone_documents", &self.clone_documents)
            .field("clone", &self.clone.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// A result set kept current by applying change primitives.
///
/// Every primitive checks the result-set invariants before mutating:
/// no duplicate ids, anchors must exist, updates and removals target
/// existing ids. A rejected primitive leaves the cache unchanged.
pub struct ChangeCache {
    docs: ResultSet,
    clone_documents: bool,
    clone: CloneFn,
}

impl ChangeCache {
    /// Creates an empty cache.
    pub fn new(options: CacheOptions) -> Self {
        Self {
            docs: ResultSet::new(options.ordered),
            clone_documents: options.clone_documents,
            clone: options.clone.unwrap_or_else(default_clone),
        }
    }

    /// Returns true if the cache keeps document order.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.docs.is_ordered()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.docs.contains(id)
    }

    pub fn get(&self, id: &Id) -> Option<&Document> {
        self.docs.get(id)
    }

    /// Returns the position of `id`, or `None` if it is not cached.
    ///
    /// # Errors
    ///
    /// `Unsupported` on an unordered cache.
    pub fn index_of(&self, id: &Id) -> Result<Option<usize>> {
        match &self.docs {
            ResultSet::Ordered(map) => Ok(map.index_of(id)),
            ResultSet::Unordered(_) => Err(Error::unsupported(
                "index_of requires an ordered cache",
            )),
        }
    }

    /// The live result set.
    pub fn snapshot(&self) -> &ResultSet {
        &self.docs
    }

    pub fn iter(&self) -> Iter<'_> {
        self.docs.iter()
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Id, &Document),
    {
        for (id, doc) in self.docs.iter() {
            f(id, doc);
        }
    }

    /// Unordered insert. On an ordered cache the document is appended.
    pub fn added(&mut self, id: Id, doc: Document) -> Result<()> {
        if self.docs.contains(&id) {
            return Err(Error::duplicate_id(&id));
        }
        let doc = self.prepare(doc);
        match &mut self.docs {
            ResultSet::Ordered(map) => map.push_back(id, doc),
            ResultSet::Unordered(map) => {
                map.insert(id, doc);
                Ok(())
            }
        }
    }

    /// Positional insert. On an unordered cache the anchor is still checked
    /// but the position is discarded.
    pub fn added_before(&mut self, id: Id, doc: Document, before: Option<&Id>) -> Result<()> {
        if self.docs.contains(&id) {
            return Err(Error::duplicate_id(&id));
        }
        if let Some(anchor) = before {
            if !self.docs.contains(anchor) {
                return Err(Error::anchor_not_found(anchor));
            }
        }
        let doc = self.prepare(doc);
        match &mut self.docs {
            ResultSet::Ordered(map) => map.insert_before(id, doc, before),
            ResultSet::Unordered(map) => {
                map.insert(id, doc);
                Ok(())
            }
        }
    }

    /// Applies a field patch. `Unset` deletes the field.
    pub fn changed(&mut self, id: &Id, fields: &ChangedFields) -> Result<()> {
        let doc = match &mut self.docs {
            ResultSet::Ordered(map) => map.get_mut(id),
            ResultSet::Unordered(map) => map.get_mut(id),
        }
        .ok_or_else(|| Error::not_found(id))?;
        apply_changes(doc, fields);
        Ok(())
    }

    /// Repositions `id`. On an unordered cache the ids are checked and
    /// nothing else happens.
    pub fn moved_before(&mut self, id: &Id, before: Option<&Id>) -> Result<()> {
        match &mut self.docs {
            ResultSet::Ordered(map) => map.move_before(id, before),
            ResultSet::Unordered(map) => {
                if !map.contains(id) {
                    return Err(Error::not_found(id));
                }
                match before {
                    Some(anchor) if !map.contains(anchor) => Err(Error::anchor_not_found(anchor)),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Removes `id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is not cached.
    pub fn removed(&mut self, id: &Id) -> Result<Document> {
        match &mut self.docs {
            ResultSet::Ordered(map) => map.remove(id),
            ResultSet::Unordered(map) => map.remove(id),
        }
        .ok_or_else(|| Error::not_found(id))
    }

    /// Applies any primitive.
    pub fn apply(&mut self, change: Change) -> Result<()> {
        match change {
            Change::Added { id, doc } => self.added(id, doc),
            Change::AddedBefore { id, doc, before } => self.added_before(id, doc, before.as_ref()),
            Change::Changed { id, fields } => self.changed(&id, &fields),
            Change::MovedBefore { id, before } => self.moved_before(&id, before.as_ref()),
            Change::Removed { id } => self.removed(&id).map(|_| ()),
        }
    }

    fn prepare(&self, doc: Document) -> Document {
        if self.clone_documents {
            (self.clone)(&doc)
        } else {
            doc
        }
    }
}

impl fmt::Debug for ChangeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeCache")
            .field("docs", &self.docs)
            .field("clone_documents", &self.clone_documents)
            .finish()
    }
}
