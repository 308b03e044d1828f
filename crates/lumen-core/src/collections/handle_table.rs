// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A generic arena mapping opaque integer ids to pooled objects.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

/// An opaque id stored in a [`HandleTable`].
///
/// Ids are dense slot indices. A freed index is handed out again by the next
/// insertion; there is no generation counter, so holders of a stale id must not
/// outlive the object they refer to.
pub trait TableId: Copy + Eq + Hash + Debug {
    /// Builds an id from a slot index.
    fn from_index(index: u32) -> Self;
    /// Returns the slot index of this id.
    fn index(self) -> u32;
}

/// Declares a typed [`TableId`] newtype.
#[macro_export]
macro_rules! lumen_id {
    ($(#[$outer:meta])* $vis:vis struct $name:ident;) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name(pub u32);

        impl $crate::collections::TableId for $name {
            #[inline]
            fn from_index(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            fn index(self) -> u32 {
                self.0
            }
        }
    };
}

/// A pool of `T` addressed by typed ids with LIFO reuse of freed slots.
///
/// Not safe for concurrent structural mutation; the owning manager serializes
/// `insert`/`remove` calls.
#[derive(Debug, Clone)]
pub struct HandleTable<T, I: TableId> {
    slots: Vec<Option<T>>,
    free_indices: Vec<u32>,
    len: usize,
    _marker: PhantomData<I>,
}

impl<T, I: TableId> Default for HandleTable<T, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, I: TableId> HandleTable<T, I> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Creates an empty table with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_indices: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Inserts a value and returns its id.
    pub fn insert(&mut self, value: T) -> I {
        self.insert_with(|_| value)
    }

    /// Inserts a value built from the id it is about to receive.
    pub fn insert_with(&mut self, build: impl FnOnce(I) -> T) -> I {
        let index = match self.free_indices.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                (self.slots.len() - 1) as u32
            }
        };
        let id = I::from_index(index);
        self.slots[index as usize] = Some(build(id));
        self.len += 1;
        id
    }

    /// Returns the element behind `id`, if alive.
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.index() as usize).and_then(Option::as_ref)
    }

    /// Returns the element behind `id` mutably, if alive.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
    }

    /// Returns two distinct elements mutably at once.
    ///
    /// Returns `None` if the ids are equal or either is not alive.
    pub fn get_pair_mut(&mut self, a: I, b: I) -> Option<(&mut T, &mut T)> {
        let (ia, ib) = (a.index() as usize, b.index() as usize);
        if ia == ib || ia >= self.slots.len() || ib >= self.slots.len() {
            return None;
        }
        if ia < ib {
            let (left, right) = self.slots.split_at_mut(ib);
            Some((left[ia].as_mut()?, right[0].as_mut()?))
        } else {
            let (left, right) = self.slots.split_at_mut(ia);
            Some((right[0].as_mut()?, left[ib].as_mut()?))
        }
    }

    /// Removes the element behind `id` and frees its slot.
    pub fn remove(&mut self, id: I) -> Option<T> {
        let value = self.slots.get_mut(id.index() as usize)?.take()?;
        self.free_indices.push(id.index());
        self.len -= 1;
        Some(value)
    }

    /// Returns `true` if `id` refers to a live element.
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no element is alive.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over live elements with their ids, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|v| (I::from_index(index as u32), v)))
    }

    /// Iterates mutably over live elements with their ids, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|v| (I::from_index(index as u32), v)))
    }

    /// Collects the ids of all live elements.
    pub fn ids(&self) -> Vec<I> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_indices.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::lumen_id! {
        struct TestId;
    }

    #[test]
    fn insert_get_remove() {
        let mut table: HandleTable<&str, TestId> = HandleTable::new();
        let a = table.insert("a");
        let b = table.insert("b");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a), Some(&"a"));
        assert_eq!(table.remove(a), Some("a"));
        assert!(!table.contains(a));
        assert_eq!(table.get(b), Some(&"b"));
        assert_eq!(table.remove(a), None, "double remove is a no-op");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn freed_indices_are_reused_lifo() {
        let mut table: HandleTable<u32, TestId> = HandleTable::new();
        let a = table.insert(1);
        let b = table.insert(2);
        let _c = table.insert(3);
        table.remove(a);
        table.remove(b);
        assert_eq!(table.insert(4), b);
        assert_eq!(table.insert(5), a);
        assert_eq!(table.insert(6), TestId(3));
    }

    #[test]
    fn insert_with_receives_final_id() {
        let mut table: HandleTable<TestId, TestId> = HandleTable::new();
        let id = table.insert_with(|id| id);
        assert_eq!(table.get(id), Some(&id));
    }

    #[test]
    fn pair_access() {
        let mut table: HandleTable<u32, TestId> = HandleTable::new();
        let a = table.insert(1);
        let b = table.insert(2);
        let (x, y) = table.get_pair_mut(b, a).unwrap();
        std::mem::swap(x, y);
        assert_eq!(table.get(a), Some(&2));
        assert!(table.get_pair_mut(a, a).is_none());
    }
}
