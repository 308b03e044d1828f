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

//! An ordered set of material properties.

use super::property::{MaterialProperty, MaterialPropertyValue, Usage};
use lumen_core::PropertyId;

/// Material properties sorted by id.
///
/// Lookups are binary searches. Every write goes through [`MaterialProperties::set`],
/// which reports whether anything changed so callers can skip redundant
/// downstream work. Two generation counters let dependents detect changes
/// without comparing values:
/// - `change_generation` moves on any change.
/// - `shader_combination_generation` moves only when a change can select a
///   different pipeline state (shader combination or fixed-function state usages).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialProperties {
    properties: Vec<MaterialProperty>,
    change_generation: u64,
    shader_combination_generation: u64,
}

impl MaterialProperties {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from unordered properties. Later duplicates replace earlier ones.
    pub fn from_properties(properties: impl IntoIterator<Item = MaterialProperty>) -> Self {
        let mut set = Self::new();
        for property in properties {
            match set.search(property.property_id) {
                Ok(index) => set.properties[index] = property,
                Err(index) => set.properties.insert(index, property),
            }
        }
        set
    }

    fn search(&self, property_id: PropertyId) -> Result<usize, usize> {
        self.properties
            .binary_search_by_key(&property_id, |property| property.property_id)
    }

    /// Properties in id order.
    pub fn as_slice(&self) -> &[MaterialProperty] {
        &self.properties
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Looks a property up by id.
    pub fn get(&self, property_id: PropertyId) -> Option<&MaterialProperty> {
        self.search(property_id).ok().map(|index| &self.properties[index])
    }

    /// Looks a property value up by id.
    pub fn value(&self, property_id: PropertyId) -> Option<&MaterialPropertyValue> {
        self.get(property_id).map(|property| &property.value)
    }

    /// Counter moved by every change.
    pub fn change_generation(&self) -> u64 {
        self.change_generation
    }

    /// Counter moved by changes that can alter the pipeline state.
    pub fn shader_combination_generation(&self) -> u64 {
        self.shader_combination_generation
    }

    fn note_change(&mut self, usage: Usage) {
        self.change_generation += 1;
        if usage == Usage::ShaderCombination || usage.is_pipeline_state() {
            self.shader_combination_generation += 1;
        }
    }

    /// Sets a property value, inserting the property if unknown.
    ///
    /// `usage` is only used when the property is inserted; an existing property
    /// keeps its declared usage. A value whose type differs from the declared one
    /// is rejected and reported as unchanged. The `overwritten` flag is updated
    /// even when the value itself is the same. Returns whether the value changed.
    pub fn set(
        &mut self,
        property_id: PropertyId,
        usage: Usage,
        value: MaterialPropertyValue,
        overwritten: bool,
    ) -> bool {
        match self.search(property_id) {
            Ok(index) => {
                let property = &mut self.properties[index];
                if property.value_type() != value.value_type() {
                    log::warn!(
                        "Ignoring write of a {:?} to property {} declared as {:?}",
                        value.value_type(),
                        property_id,
                        property.value_type()
                    );
                    return false;
                }
                property.overwritten = overwritten;
                if property.value == value && property.reference_id.is_none() {
                    return false;
                }
                property.value = value;
                property.reference_id = None;
                let usage = property.usage;
                self.note_change(usage);
                true
            }
            Err(index) => {
                let mut property = MaterialProperty::new(property_id, usage, value);
                property.overwritten = overwritten;
                self.properties.insert(index, property);
                self.note_change(usage);
                true
            }
        }
    }

    /// Inserts or replaces a whole property, returning whether it changed.
    pub fn set_property(&mut self, property: MaterialProperty) -> bool {
        match self.search(property.property_id) {
            Ok(index) => {
                let current = &mut self.properties[index];
                let changed = current.value != property.value
                    || current.usage != property.usage
                    || current.reference_id != property.reference_id;
                let overwritten_changed = current.overwritten != property.overwritten;
                *current = property;
                if changed {
                    self.note_change(property.usage);
                }
                changed || overwritten_changed
            }
            Err(index) => {
                self.properties.insert(index, property);
                self.note_change(property.usage);
                true
            }
        }
    }

    /// Clears the `overwritten` flag of a property.
    pub fn clear_overwritten(&mut self, property_id: PropertyId) {
        if let Ok(index) = self.search(property_id) {
            self.properties[index].overwritten = false;
        }
    }

    /// Removes a property.
    pub fn remove(&mut self, property_id: PropertyId) -> Option<MaterialProperty> {
        let index = self.search(property_id).ok()?;
        let property = self.properties.remove(index);
        self.note_change(property.usage);
        Some(property)
    }

    /// Iterates over the properties with a given usage.
    pub fn with_usage(&self, usage: Usage) -> impl Iterator<Item = &MaterialProperty> {
        self.properties
            .iter()
            .filter(move |property| property.usage == usage)
    }

    /// Iterates over the properties.
    pub fn iter(&self) -> std::slice::Iter<'_, MaterialProperty> {
        self.properties.iter()
    }
}

impl<'a> IntoIterator for &'a MaterialProperties {
    type Item = &'a MaterialProperty;
    type IntoIter = std::slice::Iter<'a, MaterialProperty>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::api::CullMode;

    const ROUGHNESS: PropertyId = PropertyId::from_name("Roughness");
    const USE_NORMAL_MAP: PropertyId = PropertyId::from_name("USE_NORMAL_MAP");

    #[test]
    fn properties_stay_sorted() {
        let set = MaterialProperties::from_properties([
            MaterialProperty::new(ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.5)),
            MaterialProperty::new(
                USE_NORMAL_MAP,
                Usage::ShaderCombination,
                MaterialPropertyValue::Boolean(false),
            ),
            MaterialProperty::new(
                PropertyId::from_name("CullMode"),
                Usage::RasterizerState,
                MaterialPropertyValue::CullMode(CullMode::Back),
            ),
        ]);
        let ids: Vec<_> = set.iter().map(|property| property.property_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(set.value(ROUGHNESS), Some(&MaterialPropertyValue::Float(0.5)));
    }

    #[test]
    fn set_reports_changes_only() {
        let mut set = MaterialProperties::new();
        assert!(set.set(ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.5), false));
        assert!(!set.set(ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.5), false));
        assert!(set.set(ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.25), true));
        assert!(set.get(ROUGHNESS).unwrap().overwritten);
        assert_eq!(set.change_generation(), 2);
        assert_eq!(set.shader_combination_generation(), 0);
    }

    #[test]
    fn type_mismatch_is_ignored() {
        let mut set = MaterialProperties::new();
        set.set(ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.5), false);
        assert!(!set.set(ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Integer(1), false));
        assert_eq!(set.value(ROUGHNESS), Some(&MaterialPropertyValue::Float(0.5)));
    }

    #[test]
    fn combination_changes_move_their_generation() {
        let mut set = MaterialProperties::new();
        set.set(
            USE_NORMAL_MAP,
            Usage::ShaderCombination,
            MaterialPropertyValue::Boolean(false),
            false,
        );
        let generation = set.shader_combination_generation();
        set.set(
            USE_NORMAL_MAP,
            Usage::ShaderCombination,
            MaterialPropertyValue::Boolean(true),
            false,
        );
        assert_eq!(set.shader_combination_generation(), generation + 1);
    }
}
