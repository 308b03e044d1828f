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

//! Shader combination switches.

use lumen_core::{ContentHash, ContentHasher, PropertyId};
use serde::{Deserialize, Serialize};

/// An ordered set of `(property, value)` shader combination switches.
///
/// Two sets are equal iff they hold the same pairs. Absent properties read as
/// zero, so a set never stores a zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderProperties {
    properties: Vec<(PropertyId, i32)>,
}

impl ShaderProperties {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from unordered pairs. Zero values are dropped.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (PropertyId, i32)>) -> Self {
        let mut set = Self::new();
        for (property_id, value) in pairs {
            set.set(property_id, value);
        }
        set
    }

    /// The value of a switch, zero when absent.
    pub fn get(&self, property_id: PropertyId) -> i32 {
        self.properties
            .binary_search_by_key(&property_id, |(id, _)| *id)
            .map_or(0, |index| self.properties[index].1)
    }

    /// Returns `true` if the switch is present, meaning non-zero.
    pub fn contains(&self, property_id: PropertyId) -> bool {
        self.get(property_id) != 0
    }

    /// Sets a switch; setting zero removes it.
    pub fn set(&mut self, property_id: PropertyId, value: i32) {
        match self
            .properties
            .binary_search_by_key(&property_id, |(id, _)| *id)
        {
            Ok(index) if value == 0 => {
                self.properties.remove(index);
            }
            Ok(index) => self.properties[index].1 = value,
            Err(_) if value == 0 => {}
            Err(index) => self.properties.insert(index, (property_id, value)),
        }
    }

    /// Removes a switch.
    pub fn remove(&mut self, property_id: PropertyId) {
        self.set(property_id, 0);
    }

    /// Number of non-zero switches.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if no switch is on.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, i32)> + '_ {
        self.properties.iter().copied()
    }

    /// Keeps only the switches accepted by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(PropertyId, i32) -> bool) {
        self.properties.retain(|(id, value)| keep(*id, *value));
    }
}

impl ContentHash for ShaderProperties {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(self.properties.len() as u32);
        for (property_id, value) in &self.properties {
            hasher.write(property_id).write_i32(*value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_means_absent() {
        let id = PropertyId::from_name("USE_NORMAL_MAP");
        let mut set = ShaderProperties::new();
        set.set(id, 0);
        assert!(set.is_empty());
        set.set(id, 1);
        assert!(set.contains(id));
        set.set(id, 0);
        assert_eq!(set, ShaderProperties::new());
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = PropertyId::from_name("A");
        let b = PropertyId::from_name("B");
        let first = ShaderProperties::from_pairs([(a, 1), (b, 2)]);
        let second = ShaderProperties::from_pairs([(b, 2), (a, 1)]);
        assert_eq!(first, second);
        assert_eq!(
            ContentHasher::new().write(&first).finish(),
            ContentHasher::new().write(&second).finish()
        );
        assert_ne!(first, ShaderProperties::from_pairs([(a, 1), (b, 3)]));
    }
}
