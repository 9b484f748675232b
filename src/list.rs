//! # Splice list
//!
//! A doubly linked list over a slot arena. This is the container that
//! backs parameter tables and header lists: elements are threaded through
//! prev/next links so that insertion, removal, and replacement next to a
//! known element are O(1) splices, while the links themselves are slot
//! indices rather than pointers, so an element can belong to at most one
//! list by construction.
//!
//! A [`NodeId`] is a direct reference to a current member. It stays valid
//! until that member is removed; handing a stale or foreign id to a splice
//! operation is a contract violation, guarded by `debug_assert!` rather
//! than a runtime check on the hot path.
//!
//! ## Examples
//!
//! ```rust
//! use sipmsg::list::SpliceList;
//!
//! let mut list = SpliceList::new();
//! let a = list.push_back("a");
//! let b = list.push_back("b");
//! list.push_back("c");
//!
//! list.remove(b);
//! assert_eq!(list.iter().copied().collect::<Vec<_>>(), ["a", "c"]);
//!
//! list.replace_with_run(a, ["x", "y"]);
//! assert_eq!(list.iter().copied().collect::<Vec<_>>(), ["x", "y", "c"]);
//! ```

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Direct reference to a list member. Invalidated by removal of that
/// member; never reuse an id across lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied {
        item: T,
        prev: Option<NodeId>,
        next: Option<NodeId>,
    },
    /// Free slot, holding the next entry of the free chain.
    Free(Option<usize>),
}

/// Doubly linked list with O(1) splice given a [`NodeId`].
#[derive(Debug, Clone)]
pub struct SpliceList<T> {
    slots: Vec<Slot<T>>,
    free: Option<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> SpliceList<T> {
    pub fn new() -> Self {
        SpliceList {
            slots: Vec::new(),
            free: None,
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        SpliceList {
            slots: Vec::with_capacity(cap),
            free: None,
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Empties the list for reuse, keeping the slot arena's capacity.
    pub fn re_init(&mut self) {
        self.slots.clear();
        self.free = None;
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// True if `id` currently names a member of this list.
    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Slot::Occupied { .. }))
    }

    fn alloc(&mut self, item: T, prev: Option<NodeId>, next: Option<NodeId>) -> NodeId {
        let slot = Slot::Occupied { item, prev, next };
        let id = match self.free {
            Some(idx) => {
                self.free = match self.slots[idx] {
                    Slot::Free(next_free) => next_free,
                    Slot::Occupied { .. } => unreachable!("free chain points at occupied slot"),
                };
                self.slots[idx] = slot;
                NodeId(idx)
            }
            None => {
                self.slots.push(slot);
                NodeId(self.slots.len() - 1)
            }
        };
        self.len += 1;
        id
    }

    fn links(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        match &self.slots[id.0] {
            Slot::Occupied { prev, next, .. } => (*prev, *next),
            Slot::Free(_) => panic!("stale NodeId"),
        }
    }

    fn set_prev(&mut self, id: NodeId, new_prev: Option<NodeId>) {
        match &mut self.slots[id.0] {
            Slot::Occupied { prev, .. } => *prev = new_prev,
            Slot::Free(_) => panic!("stale NodeId"),
        }
    }

    fn set_next(&mut self, id: NodeId, new_next: Option<NodeId>) {
        match &mut self.slots[id.0] {
            Slot::Occupied { next, .. } => *next = new_next,
            Slot::Free(_) => panic!("stale NodeId"),
        }
    }

    pub fn push_front(&mut self, item: T) -> NodeId {
        let old_head = self.head;
        let id = self.alloc(item, None, old_head);
        match old_head {
            Some(h) => self.set_prev(h, Some(id)),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    pub fn push_back(&mut self, item: T) -> NodeId {
        let old_tail = self.tail;
        let id = self.alloc(item, old_tail, None);
        match old_tail {
            Some(t) => self.set_next(t, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Inserts `item` immediately before the member `at`.
    pub fn insert_before(&mut self, at: NodeId, item: T) -> NodeId {
        debug_assert!(self.contains(at), "insert_before on stale NodeId");
        let (prev, _) = self.links(at);
        let id = self.alloc(item, prev, Some(at));
        self.set_prev(at, Some(id));
        match prev {
            Some(p) => self.set_next(p, Some(id)),
            None => self.head = Some(id),
        }
        id
    }

    /// Unlinks `at` in O(1), fixing head/tail; the removed slot's own
    /// links are cleared (it joins the free chain).
    pub fn remove(&mut self, at: NodeId) -> T {
        debug_assert!(self.contains(at), "remove on stale NodeId");
        let (prev, next) = self.links(at);
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.head = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.tail = prev,
        }
        let slot = std::mem::replace(&mut self.slots[at.0], Slot::Free(self.free));
        self.free = Some(at.0);
        self.len -= 1;
        match slot {
            Slot::Occupied { item, .. } => item,
            Slot::Free(_) => unreachable!(),
        }
    }

    /// Replaces the member `at` in place, keeping its position. Returns
    /// the previous item.
    pub fn replace(&mut self, at: NodeId, item: T) -> T {
        debug_assert!(self.contains(at), "replace on stale NodeId");
        match &mut self.slots[at.0] {
            Slot::Occupied { item: slot, .. } => std::mem::replace(slot, item),
            Slot::Free(_) => unreachable!(),
        }
    }

    /// Splices an entire ordered run in place of the member `at`,
    /// preserving order; the length changes by (run length − 1). An empty
    /// run degenerates to plain removal. Returns the replaced item.
    pub fn replace_with_run<I>(&mut self, at: NodeId, run: I) -> T
    where
        I: IntoIterator<Item = T>,
    {
        debug_assert!(self.contains(at), "replace_with_run on stale NodeId");
        let mut run = run.into_iter();
        let first = match run.next() {
            Some(first) => first,
            None => return self.remove(at),
        };
        let old = self.replace(at, first);
        let mut anchor = at;
        for item in run {
            let (_, next) = self.links(anchor);
            anchor = match next {
                Some(n) => self.insert_before(n, item),
                None => self.push_back(item),
            };
        }
        old
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        debug_assert!(self.contains(id));
        self.links(id).1
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        debug_assert!(self.contains(id));
        self.links(id).0
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied { item, .. }) => Some(item),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Occupied { item, .. }) => Some(item),
            _ => None,
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|id| self.get(id))
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|id| self.get(id))
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.head.map(|id| self.remove(id))
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.tail.map(|id| self.remove(id))
    }

    /// Iterates members front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            next: self.head,
        }
    }

    /// Iterates member ids front to back.
    pub fn ids(&self) -> Ids<'_, T> {
        Ids {
            list: self,
            next: self.head,
        }
    }

    /// Mutating bidirectional cursor, positioned before the first member.
    pub fn cursor_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut {
            next: self.head,
            current: None,
            list: self,
        }
    }
}

impl<T> Default for SpliceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for SpliceList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Eq> Eq for SpliceList<T> {}

impl<T> FromIterator<T> for SpliceList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = SpliceList::new();
        for item in iter {
            list.push_back(item);
        }
        list
    }
}

pub struct Iter<'a, T> {
    list: &'a SpliceList<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let id = self.next?;
        self.next = self.list.links(id).1;
        self.list.get(id)
    }
}

pub struct Ids<'a, T> {
    list: &'a SpliceList<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for Ids<'a, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.list.links(id).1;
        Some(id)
    }
}

/// Mutating cursor over a [`SpliceList`].
///
/// The cursor starts before the first member; `advance` steps onto the
/// next one. Operations on "the current member" reject misuse: calling
/// them before the first advance, after exhaustion, or right after a
/// removal yields [`Error::CursorMisuse`].
pub struct CursorMut<'a, T> {
    list: &'a mut SpliceList<T>,
    /// Member the next `advance` will step onto.
    next: Option<NodeId>,
    current: Option<NodeId>,
}

impl<'a, T> CursorMut<'a, T> {
    /// Steps onto the next member and returns it, or `None` at the end.
    pub fn advance(&mut self) -> Option<&T> {
        let id = self.next?;
        self.next = self.list.links(id).1;
        self.current = Some(id);
        self.list.get(id)
    }

    /// Id of the current member, if positioned on one.
    pub fn current_id(&self) -> Option<NodeId> {
        self.current
    }

    /// Inserts before the current member.
    pub fn insert_before(&mut self, item: T) -> Result<NodeId> {
        let at = self
            .current
            .ok_or(Error::CursorMisuse("insert_before with no current element"))?;
        Ok(self.list.insert_before(at, item))
    }

    /// Removes and returns the current member; the cursor ends up between
    /// its former neighbors.
    pub fn remove_current(&mut self) -> Result<T> {
        let at = self
            .current
            .take()
            .ok_or(Error::CursorMisuse("remove without prior advance"))?;
        Ok(self.list.remove(at))
    }

    /// Replaces the current member in place, returning the previous item.
    pub fn replace_current(&mut self, item: T) -> Result<T> {
        let at = self
            .current
            .ok_or(Error::CursorMisuse("replace without prior advance"))?;
        Ok(self.list.replace(at, item))
    }
}

impl<T: Serialize> Serialize for SpliceList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len))?;
        for item in self.iter() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for SpliceList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ListVisitor<T>(std::marker::PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for ListVisitor<T> {
            type Value = SpliceList<T>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a sequence")
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<SpliceList<T>, A::Error> {
                let mut list = SpliceList::new();
                while let Some(item) = seq.next_element()? {
                    list.push_back(item);
                }
                Ok(list)
            }
        }

        deserializer.deserialize_seq(ListVisitor(std::marker::PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(list: &SpliceList<i32>) -> Vec<i32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_push_and_iterate() {
        let mut list = SpliceList::new();
        list.push_back(2);
        list.push_back(3);
        list.push_front(1);
        assert_eq!(collect(&list), [1, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_remove_middle_of_five() {
        let mut list = SpliceList::new();
        let ids: Vec<_> = (1..=5).map(|n| list.push_back(n)).collect();
        let removed = list.remove(ids[2]);
        assert_eq!(removed, 3);
        assert_eq!(list.len(), 4);
        // Former neighbors are now adjacent.
        assert_eq!(collect(&list), [1, 2, 4, 5]);
        assert_eq!(list.next(ids[1]), Some(ids[3]));
        assert_eq!(list.prev(ids[3]), Some(ids[1]));
        // The removed slot is no longer a member.
        assert!(!list.contains(ids[2]));
    }

    #[test]
    fn test_remove_sole_element() {
        let mut list = SpliceList::new();
        let id = list.push_back(42);
        assert_eq!(list.remove(id), 42);
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
        assert_eq!(list.tail(), None);
    }

    #[test]
    fn test_remove_at_boundaries() {
        let mut list = SpliceList::new();
        let a = list.push_back(1);
        list.push_back(2);
        let c = list.push_back(3);
        list.remove(a);
        assert_eq!(collect(&list), [2, 3]);
        list.remove(c);
        assert_eq!(collect(&list), [2]);
    }

    #[test]
    fn test_replace_single() {
        let mut list = SpliceList::new();
        list.push_back(1);
        let b = list.push_back(2);
        list.push_back(3);
        assert_eq!(list.replace(b, 20), 2);
        assert_eq!(collect(&list), [1, 20, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_replace_with_run() {
        let mut list = SpliceList::new();
        list.push_back(1);
        let b = list.push_back(2);
        list.push_back(3);
        list.replace_with_run(b, [20, 21, 22]);
        assert_eq!(collect(&list), [1, 20, 21, 22, 3]);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn test_replace_with_empty_run_is_removal() {
        let mut list = SpliceList::new();
        let a = list.push_back(1);
        list.push_back(2);
        list.replace_with_run(a, std::iter::empty());
        assert_eq!(collect(&list), [2]);
    }

    #[test]
    fn test_replace_run_at_tail() {
        let mut list = SpliceList::new();
        list.push_back(1);
        let b = list.push_back(2);
        list.replace_with_run(b, [20, 21]);
        assert_eq!(collect(&list), [1, 20, 21]);
        assert_eq!(list.back(), Some(&21));
    }

    #[test]
    fn test_slot_reuse_after_removal() {
        let mut list = SpliceList::new();
        let a = list.push_back(1);
        list.push_back(2);
        list.remove(a);
        // The freed slot is recycled rather than growing the arena.
        list.push_back(3);
        assert_eq!(list.slots.len(), 2);
        assert_eq!(collect(&list), [2, 3]);
    }

    #[test]
    fn test_cursor_walk_and_remove() {
        let mut list: SpliceList<i32> = [1, 2, 3, 4].into_iter().collect();
        let mut cursor = list.cursor_mut();
        while let Some(&n) = cursor.advance() {
            if n % 2 == 0 {
                cursor.remove_current().unwrap();
            }
        }
        assert_eq!(collect(&list), [1, 3]);
    }

    #[test]
    fn test_cursor_rejects_remove_without_advance() {
        let mut list: SpliceList<i32> = [1].into_iter().collect();
        let mut cursor = list.cursor_mut();
        assert!(matches!(
            cursor.remove_current(),
            Err(Error::CursorMisuse(_))
        ));
    }

    #[test]
    fn test_cursor_rejects_double_remove() {
        let mut list: SpliceList<i32> = [1, 2].into_iter().collect();
        let mut cursor = list.cursor_mut();
        cursor.advance();
        cursor.remove_current().unwrap();
        assert!(cursor.remove_current().is_err());
        // But the walk continues past the removal.
        assert_eq!(cursor.advance(), Some(&2));
    }

    #[test]
    fn test_cursor_insert_and_replace() {
        let mut list: SpliceList<i32> = [1, 3].into_iter().collect();
        let mut cursor = list.cursor_mut();
        cursor.advance();
        cursor.advance();
        cursor.insert_before(2).unwrap();
        cursor.replace_current(30).unwrap();
        assert_eq!(collect(&list), [1, 2, 30]);
    }

    #[test]
    fn test_re_init_keeps_nothing() {
        let mut list: SpliceList<i32> = [1, 2, 3].into_iter().collect();
        list.re_init();
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
        list.push_back(9);
        assert_eq!(collect(&list), [9]);
    }
}
