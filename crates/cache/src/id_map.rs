//! Unordered map keyed by canonical identifier.

use hashbrown::hash_map::{self, HashMap};
use liveset_core::Id;

/// A hash map from [`Id`] to `V`.
///
/// Entries are indexed by the id's canonical string; the original `Id` is
/// kept next to the value so iteration never has to decode.
#[derive(Clone, Debug)]
pub struct IdMap<V> {
    entries: HashMap<String, (Id, V)>,
}

impl<V> Default for IdMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IdMap<V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the map contains `id`.
    pub fn contains(&self, id: &Id) -> bool {
        self.entries.contains_key(&id.encode())
    }

    /// Returns true if the map contains the canonical key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Gets the value for `id`.
    pub fn get(&self, id: &Id) -> Option<&V> {
        self.entries.get(&id.encode()).map(|(_, v)| v)
    }

    /// Gets the value for a canonical key.
    pub fn get_by_key(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|(_, v)| v)
    }

    /// Gets a mutable reference to the value for `id`.
    pub fn get_mut(&mut self, id: &Id) -> Option<&mut V> {
        self.entries.get_mut(&id.encode()).map(|(_, v)| v)
    }

    /// Inserts a value, returning the previous value for the same id.
    pub fn insert(&mut self, id: Id, value: V) -> Option<V> {
        self.entries
            .insert(id.encode(), (id, value))
            .map(|(_, old)| old)
    }

    /// Removes the value for `id`.
    pub fn remove(&mut self, id: &Id) -> Option<V> {
        self.entries.remove(&id.encode()).map(|(_, v)| v)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over `(id, value)` pairs in unspecified order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.entries.values(),
        }
    }

    /// Iterates over ids in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &Id> {
        self.entries.values().map(|(id, _)| id)
    }

    /// Iterates over values in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|(_, v)| v)
    }
}

impl<V: PartialEq> PartialEq for IdMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(key, (_, v))| other.get_by_key(key) == Some(v))
    }
}

impl<V> FromIterator<(Id, V)> for IdMap<V> {
    fn from_iter<I: IntoIterator<Item = (Id, V)>>(iter: I) -> Self {
        let mut map = IdMap::new();
        for (id, value) in iter {
            map.insert(id, value);
        }
        map
    }
}

impl<'a, V> IntoIterator for &'a IdMap<V> {
    type Item = (&'a Id, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over an [`IdMap`].
pub struct Iter<'a, V> {
    inner: hash_map::Values<'a, String, (Id, V)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a Id, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(id, v)| (id, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
