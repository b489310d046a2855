//! Insertion-ordered map with O(1) positional insert, remove and move.
//!
//! Nodes live in a slot arena and are linked in both directions. A hash
//! index from the canonical id to the slot gives constant-time lookup, so
//! every positional operation is a lookup plus a pointer splice.

use hashbrown::HashMap;
use liveset_core::{Error, Id, Result};

type Slot = usize;

#[derive(Clone, Debug)]
struct Node<V> {
    id: Id,
    value: V,
    prev: Option<Slot>,
    next: Option<Slot>,
}

/// An ordered map from [`Id`] to `V`.
#[derive(Clone, Debug)]
pub struct OrderedMap<V> {
    nodes: Vec<Option<Node<V>>>,
    free: Vec<Slot>,
    index: HashMap<String, Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> OrderedMap<V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns true if the map contains `id`.
    pub fn contains(&self, id: &Id) -> bool {
        self.index.contains_key(&id.encode())
    }

    /// Gets the value for `id`.
    pub fn get(&self, id: &Id) -> Option<&V> {
        let slot = self.slot_of(id)?;
        self.node(slot).map(|n| &n.value)
    }

    /// Gets a mutable reference to the value for `id`.
    pub fn get_mut(&mut self, id: &Id) -> Option<&mut V> {
        let slot = self.slot_of(id)?;
        self.nodes[slot].as_mut().map(|n| &mut n.value)
    }

    /// Returns the first entry.
    pub fn first(&self) -> Option<(&Id, &V)> {
        self.head.and_then(|s| self.node(s)).map(|n| (&n.id, &n.value))
    }

    /// Returns the last entry.
    pub fn last(&self) -> Option<(&Id, &V)> {
        self.tail.and_then(|s| self.node(s)).map(|n| (&n.id, &n.value))
    }

    /// Inserts `value` immediately before `before`, or at the end when
    /// `before` is `None`.
    ///
    /// # Errors
    ///
    /// `DuplicateId` if `id` is already present, `AnchorNotFound` if
    /// `before` is not.
    pub fn insert_before(&mut self, id: Id, value: V, before: Option<&Id>) -> Result<()> {
        let key = id.encode();
        if self.index.contains_key(&key) {
            return Err(Error::duplicate_id(&id));
        }
        let anchor = match before {
            Some(b) => Some(self.slot_of(b).ok_or_else(|| Error::anchor_not_found(b))?),
            None => None,
        };

        let node = Node {
            id,
            value,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, slot);
        self.link_before(slot, anchor);
        Ok(())
    }

    /// Appends `value` at the end.
    pub fn push_back(&mut self, id: Id, value: V) -> Result<()> {
        self.insert_before(id, value, None)
    }

    /// Removes `id`, returning its value. Removing an absent id does nothing.
    pub fn remove(&mut self, id: &Id) -> Option<V> {
        let slot = self.index.remove(&id.encode())?;
        self.unlink(slot);
        let node = self.nodes[slot].take()?;
        self.free.push(slot);
        Some(node.value)
    }

    /// Moves `id` immediately before `before`, or to the end when `before`
    /// is `None`. The map is left untouched on error.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is absent, `AnchorNotFound` if `before` is absent,
    /// `InvalidOperation` if `before` is `id` itself.
    pub fn move_before(&mut self, id: &Id, before: Option<&Id>) -> Result<()> {
        let slot = self.slot_of(id).ok_or_else(|| Error::not_found(id))?;
        let anchor = match before {
            Some(b) => {
                let anchor = self.slot_of(b).ok_or_else(|| Error::anchor_not_found(b))?;
                if anchor == slot {
                    return Err(Error::invalid_operation(format!(
                        "cannot move {id} before itself"
                    )));
                }
                Some(anchor)
            }
            None => None,
        };

        let current_next = self.node(slot).and_then(|n| n.next);
        if current_next == anchor {
            return Ok(());
        }
        self.unlink(slot);
        self.link_before(slot, anchor);
        Ok(())
    }

    /// Returns the zero-based position of `id`. Walks from the head.
    pub fn index_of(&self, id: &Id) -> Option<usize> {
        let target = self.slot_of(id)?;
        let mut cursor = self.head;
        let mut position = 0;
        while let Some(slot) = cursor {
            if slot == target {
                return Some(position);
            }
            position += 1;
            cursor = self.node(slot).and_then(|n| n.next);
        }
        None
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterates over `(id, value)` pairs in list order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            map: self,
            cursor: self.head,
            remaining: self.len(),
        }
    }

    /// Iterates over ids in list order.
    pub fn keys(&self) -> impl Iterator<Item = &Id> {
        self.iter().map(|(id, _)| id)
    }

    /// Iterates over values in list order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    #[inline]
    fn slot_of(&self, id: &Id) -> Option<Slot> {
        self.index.get(&id.encode()).copied()
    }

    #[inline]
    fn node(&self, slot: Slot) -> Option<&Node<V>> {
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    fn set_prev(&mut self, slot: Slot, prev: Option<Slot>) {
        if let Some(node) = self.nodes[slot].as_mut() {
            node.prev = prev;
        }
    }

    fn set_next(&mut self, slot: Slot, next: Option<Slot>) {
        if let Some(node) = self.nodes[slot].as_mut() {
            node.next = next;
        }
    }

    fn unlink(&mut self, slot: Slot) {
        let (prev, next) = match self.node(slot) {
            Some(n) => (n.prev, n.next),
            None => return,
        };
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.head = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.tail = prev,
        }
        self.set_prev(slot, None);
        self.set_next(slot, None);
    }

    fn link_before(&mut self, slot: Slot, anchor: Option<Slot>) {
        let prev = match anchor {
            Some(a) => self.node(a).and_then(|n| n.prev),
            None => self.tail,
        };
        self.set_prev(slot, prev);
        self.set_next(slot, anchor);
        match prev {
            Some(p) => self.set_next(p, Some(slot)),
            None => self.head = Some(slot),
        }
        match anchor {
            Some(a) => self.set_prev(a, Some(slot)),
            None => self.tail = Some(slot),
        }
    }
}

impl<V: PartialEq> PartialEq for OrderedMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((a, va), (b, vb))| a == b && va == vb)
    }
}

impl<V> FromIterator<(Id, V)> for OrderedMap<V> {
    /// Later duplicates of an id are ignored.
    fn from_iter<I: IntoIterator<Item = (Id, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (id, value) in iter {
            let _ = map.push_back(id, value);
        }
        map
    }
}

impl<'a, V> IntoIterator for &'a OrderedMap<V> {
    type Item = (&'a Id, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over an [`OrderedMap`] in list order.
pub struct Iter<'a, V> {
    map: &'a OrderedMap<V>,
    cursor: Option<Slot>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a Id, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.map.node(self.cursor?)?;
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.id, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
