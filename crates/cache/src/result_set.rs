//! Materialized result sets.

use crate::id_map::{self, IdMap};
use crate::ordered_map::{self, OrderedMap};
use liveset_core::{Document, Id};

/// The current membership (and, when ordered, order) of a query's results.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultSet {
    Ordered(OrderedMap<Document>),
    Unordered(IdMap<Document>),
}

impl ResultSet {
    /// Creates an empty result set.
    pub fn new(ordered: bool) -> Self {
        if ordered {
            ResultSet::Ordered(OrderedMap::new())
        } else {
            ResultSet::Unordered(IdMap::new())
        }
    }

    #[inline]
    pub fn is_ordered(&self) -> bool {
        matches!(self, ResultSet::Ordered(_))
    }

    pub fn len(&self) -> usize {
        match self {
            ResultSet::Ordered(m) => m.len(),
            ResultSet::Unordered(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &Id) -> bool {
        match self {
            ResultSet::Ordered(m) => m.contains(id),
            ResultSet::Unordered(m) => m.contains(id),
        }
    }

    pub fn get(&self, id: &Id) -> Option<&Document> {
        match self {
            ResultSet::Ordered(m) => m.get(id),
            ResultSet::Unordered(m) => m.get(id),
        }
    }

    /// Iterates over documents; in list order when ordered.
    pub fn iter(&self) -> Iter<'_> {
        match self {
            ResultSet::Ordered(m) => Iter::Ordered(m.iter()),
            ResultSet::Unordered(m) => Iter::Unordered(m.iter()),
        }
    }

    /// Copies the entries out as a vector.
    pub fn to_vec(&self) -> Vec<(Id, Document)> {
        self.iter()
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect()
    }

    /// Copies the entries into an unordered map.
    pub fn to_id_map(&self) -> IdMap<Document> {
        self.iter()
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = (&'a Id, &'a Document);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`ResultSet`].
pub enum Iter<'a> {
    Ordered(ordered_map::Iter<'a, Document>),
    Unordered(id_map::Iter<'a, Document>),
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Id, &'a Document);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Ordered(it) => it.next(),
            Iter::Unordered(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Ordered(it) => it.size_hint(),
            Iter::Unordered(it) => it.size_hint(),
        }
    }
}
