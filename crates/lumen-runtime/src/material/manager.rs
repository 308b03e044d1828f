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

//! The material resource manager and the material tree.

use super::properties::MaterialProperties;
use super::property::{MaterialProperty, MaterialPropertyValue, Usage};
use super::resource::{MaterialResource, MaterialResourceId};
use crate::blueprint::MaterialBlueprintResourceManager;
use crate::error::MaterialError;
use crate::pipeline::PipelineStateCache;
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::collections::HandleTable;
use lumen_core::format::MaterialFile;
use lumen_core::{MaterialTechniqueId, PropertyId};
use std::sync::Arc;

/// Owns every material resource and keeps the material tree consistent.
///
/// A child inherits the techniques and properties of its parent when it is
/// parented. Later writes to a parent property flow down to every descendant
/// that has not set the property itself. Parent links are acyclic: any
/// reparenting that would make a material its own ancestor is rejected.
#[derive(Debug, Default)]
pub struct MaterialResourceManager {
    resources: HandleTable<MaterialResource, MaterialResourceId>,
    by_asset: AHashMap<AssetId, MaterialResourceId>,
}

impl MaterialResourceManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root material.
    pub fn create(
        &mut self,
        asset_id: Option<AssetId>,
        techniques: &[(MaterialTechniqueId, AssetId)],
        properties: MaterialProperties,
    ) -> MaterialResourceId {
        let id = self.resources.insert_with(|id| {
            let mut resource = MaterialResource::new(id, asset_id);
            for (material_technique_id, material_blueprint_asset_id) in techniques {
                resource.set_technique(*material_technique_id, *material_blueprint_asset_id);
            }
            resource.properties = properties;
            resource
        });
        if let Some(asset_id) = asset_id {
            if let Some(previous) = self.by_asset.insert(asset_id, id) {
                log::warn!(
                    "Material asset {} now maps to {:?}, replacing {:?}",
                    asset_id,
                    id,
                    previous
                );
            }
        }
        id
    }

    /// Creates a material inheriting everything from `parent`.
    pub fn create_child(&mut self, parent: MaterialResourceId) -> Result<MaterialResourceId, MaterialError> {
        if !self.resources.contains(parent) {
            return Err(MaterialError::NotFound(parent));
        }
        let child = self.create(None, &[], MaterialProperties::new());
        self.set_parent(child, Some(parent))?;
        Ok(child)
    }

    /// A material by id.
    pub fn get(&self, id: MaterialResourceId) -> Option<&MaterialResource> {
        self.resources.get(id)
    }

    /// A material by asset.
    pub fn get_by_asset(&self, asset_id: AssetId) -> Option<&MaterialResource> {
        self.id_of(asset_id).and_then(|id| self.resources.get(id))
    }

    /// The id of a loaded material asset.
    pub fn id_of(&self, asset_id: AssetId) -> Option<MaterialResourceId> {
        self.by_asset.get(&asset_id).copied()
    }

    /// Number of materials.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if there is no material.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn resource(&self, id: MaterialResourceId) -> Result<&MaterialResource, MaterialError> {
        self.resources.get(id).ok_or(MaterialError::NotFound(id))
    }

    fn resource_mut(&mut self, id: MaterialResourceId) -> Result<&mut MaterialResource, MaterialError> {
        self.resources.get_mut(id).ok_or(MaterialError::NotFound(id))
    }

    /// Returns `true` if `ancestor` is `material` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: MaterialResourceId, material: MaterialResourceId) -> bool {
        let mut current = Some(material);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.resources.get(id).and_then(|resource| resource.parent);
        }
        false
    }

    /// Moves `child` under `parent`, or makes it a root with `None`.
    ///
    /// The child inherits the parent techniques it lacks and every property it
    /// has not set itself; inherited values flow on to its own descendants. On
    /// error nothing changes.
    pub fn set_parent(
        &mut self,
        child: MaterialResourceId,
        parent: Option<MaterialResourceId>,
    ) -> Result<(), MaterialError> {
        let previous = self.resource(child)?.parent;
        if let Some(parent) = parent {
            self.resource(parent)?;
            if self.is_ancestor_or_self(child, parent) {
                log::error!("Rejected reparenting of {:?} under its descendant {:?}", child, parent);
                return Err(MaterialError::Cycle { child, parent });
            }
        }
        if previous == parent {
            return Ok(());
        }

        if let Some(previous) = previous {
            if let Some(resource) = self.resources.get_mut(previous) {
                if let Ok(index) = resource.children.binary_search(&child) {
                    resource.children.remove(index);
                }
            }
        }
        self.resource_mut(child)?.parent = parent;
        let Some(parent) = parent else {
            return Ok(());
        };

        let (inherited_properties, inherited_techniques) = {
            let resource = self.resource_mut(parent)?;
            if let Err(index) = resource.children.binary_search(&child) {
                resource.children.insert(index, child);
            }
            let techniques: Vec<_> = resource
                .techniques
                .iter()
                .map(|technique| technique.clone_for(child))
                .collect();
            (resource.properties.as_slice().to_vec(), techniques)
        };

        let resource = self.resource_mut(child)?;
        for technique in inherited_techniques {
            if let Err(index) = resource.technique_index(technique.material_technique_id()) {
                resource.techniques.insert(index, technique);
            }
        }
        for property in inherited_properties {
            let local_override = self
                .resource(child)?
                .properties
                .get(property.property_id)
                .is_some_and(|local| local.overwritten);
            if !local_override {
                self.inherit(child, property);
            }
        }
        Ok(())
    }

    /// Writes a property on a material, marking it as set locally, and
    /// propagates the value to every descendant that has not set it itself.
    ///
    /// Returns the number of descendants that received the value.
    pub fn set_property(
        &mut self,
        material: MaterialResourceId,
        property_id: PropertyId,
        usage: Usage,
        value: MaterialPropertyValue,
    ) -> Result<usize, MaterialError> {
        let resource = self.resource_mut(material)?;
        if !resource.properties.set(property_id, usage, value, true) {
            return Ok(0);
        }
        let property = resource
            .properties
            .get(property_id)
            .copied()
            .ok_or(MaterialError::NotFound(material))?;
        Ok(self.propagate(material, property))
    }

    /// Drops the local value of a property: the material takes its parent's
    /// value again, or keeps its current value as an inherited one at the root.
    /// Returns the number of descendants that received a new value.
    pub fn reset_property(&mut self, material: MaterialResourceId, property_id: PropertyId) -> Result<usize, MaterialError> {
        let parent = self.resource(material)?.parent;
        let inherited = parent
            .and_then(|parent| self.resources.get(parent))
            .and_then(|parent| parent.properties.get(property_id).copied());
        self.resource_mut(material)?.properties.clear_overwritten(property_id);
        match inherited {
            Some(property) => Ok(self.inherit(material, property)),
            None => Ok(0),
        }
    }

    /// Applies an inherited property to `material` and pushes it down.
    /// Returns the number of descendants that received it.
    fn inherit(&mut self, material: MaterialResourceId, mut property: MaterialProperty) -> usize {
        property.overwritten = false;
        let Some(resource) = self.resources.get_mut(material) else {
            return 0;
        };
        if !resource.properties.set_property(property) {
            return 0;
        }
        self.propagate(material, property)
    }

    /// Pushes `property` to the descendants of `material` with an explicit
    /// stack. Subtrees whose root set the property itself are skipped.
    fn propagate(&mut self, material: MaterialResourceId, mut property: MaterialProperty) -> usize {
        property.overwritten = false;
        let mut updated = 0;
        let mut stack: Vec<MaterialResourceId> = self
            .resources
            .get(material)
            .map(|resource| resource.children.clone())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            let Some(child) = self.resources.get_mut(id) else {
                log::error!("Material {:?} lists missing child {:?}", material, id);
                continue;
            };
            if child
                .properties
                .get(property.property_id)
                .is_some_and(|local| local.overwritten)
            {
                continue;
            }
            child.properties.set_property(property);
            updated += 1;
            stack.extend_from_slice(&child.children);
        }
        updated
    }

    /// Destroys a material. Its children become roots and keep their values.
    pub fn destroy(&mut self, material: MaterialResourceId) -> Result<MaterialResource, MaterialError> {
        self.set_parent(material, None)?;
        let resource = self
            .resources
            .remove(material)
            .ok_or(MaterialError::NotFound(material))?;
        for child in &resource.children {
            if let Some(child) = self.resources.get_mut(*child) {
                child.parent = None;
            }
        }
        if let Some(asset_id) = resource.asset_id {
            if self.by_asset.get(&asset_id) == Some(&material) {
                self.by_asset.remove(&asset_id);
            }
        }
        log::debug!(
            "Destroyed material {:?}, orphaned {} children",
            material,
            resource.children.len()
        );
        Ok(resource)
    }

    /// Loads a compiled material. A parent material named by the file must be
    /// loaded first, as must every blueprint its techniques use. Loading an
    /// already loaded asset updates it in place and keeps its id.
    pub fn load_material(
        &mut self,
        asset_id: AssetId,
        bytes: &[u8],
        blueprints: &MaterialBlueprintResourceManager,
    ) -> Result<MaterialResourceId, MaterialError> {
        let file = MaterialFile::read(bytes).map_err(|source| MaterialError::Format {
            asset: asset_id,
            source,
        })?;
        let parent = match file.parent_material_asset_id {
            0 => None,
            raw => {
                let parent_asset = AssetId::from_raw(raw);
                Some(self.id_of(parent_asset).ok_or(MaterialError::ParentNotLoaded {
                    material: asset_id,
                    parent: parent_asset,
                })?)
            }
        };
        let mut techniques = Vec::with_capacity(file.techniques.len());
        for record in &file.techniques {
            let blueprint_asset = AssetId::from_raw(record.material_blueprint_asset_id);
            if blueprints.get_by_asset(blueprint_asset).is_none() {
                return Err(MaterialError::BlueprintNotLoaded(blueprint_asset));
            }
            techniques.push((
                MaterialTechniqueId::from_raw(record.material_technique_id),
                blueprint_asset,
            ));
        }
        let mut properties = Vec::with_capacity(file.properties.len());
        for record in &file.properties {
            let mut property = MaterialProperty::from_record(record).map_err(|source| MaterialError::Format {
                asset: asset_id,
                source,
            })?;
            property.overwritten = true;
            properties.push(property);
        }

        let id = match self.id_of(asset_id) {
            Some(id) => {
                let resource = self.resource_mut(id)?;
                for (material_technique_id, blueprint_asset) in &techniques {
                    resource.set_technique(*material_technique_id, *blueprint_asset);
                }
                for property in properties {
                    if self.resource_mut(id)?.properties.set_property(property) {
                        self.propagate(id, property);
                    }
                }
                log::info!("Material {} reloaded", asset_id);
                id
            }
            None => self.create(
                Some(asset_id),
                &techniques,
                MaterialProperties::from_properties(properties),
            ),
        };
        if self.resource(id)?.parent != parent {
            self.set_parent(id, parent)?;
        }
        Ok(id)
    }

    /// Resolves the pipeline state of a technique of a material.
    ///
    /// Returns `None` if the material, technique or blueprint is missing, if
    /// the pipeline state is null, or if it is still being built without a
    /// usable fallback.
    pub fn resolve_technique(
        &mut self,
        material: MaterialResourceId,
        material_technique_id: MaterialTechniqueId,
        blueprints: &MaterialBlueprintResourceManager,
        global: &MaterialProperties,
        asynchronous: bool,
    ) -> Option<Arc<PipelineStateCache>> {
        let resource = self.resources.get_mut(material)?;
        let index = resource.technique_index(material_technique_id).ok()?;
        let technique = &mut resource.techniques[index];
        let Some(blueprint) = blueprints.get_by_asset(technique.material_blueprint_asset_id()) else {
            log::warn!(
                "Material {:?} technique {} uses unloaded blueprint {}",
                material,
                material_technique_id,
                technique.material_blueprint_asset_id()
            );
            return None;
        };
        technique.resolve(
            &resource.properties,
            blueprint,
            global,
            blueprints.pipeline_state_cache(),
            asynchronous,
        )
    }

    /// Forgets every resolved technique using a blueprint.
    pub fn invalidate_blueprint(&mut self, material_blueprint_asset_id: AssetId) {
        for (_, resource) in self.resources.iter_mut() {
            for technique in &mut resource.techniques {
                if technique.material_blueprint_asset_id() == material_blueprint_asset_id {
                    technique.invalidate();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUGHNESS: PropertyId = PropertyId::from_name("Roughness");

    fn roughness(manager: &MaterialResourceManager, id: MaterialResourceId) -> Option<MaterialPropertyValue> {
        manager.get(id)?.properties().value(ROUGHNESS).copied()
    }

    #[test]
    fn writes_skip_children_that_override() {
        let mut manager = MaterialResourceManager::new();
        let parent = manager.create(None, &[], MaterialProperties::new());
        let children: Vec<_> = (0..5).map(|_| manager.create_child(parent).unwrap()).collect();
        for child in &children[..2] {
            manager
                .set_property(*child, ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.1))
                .unwrap();
        }
        let updated = manager
            .set_property(parent, ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.9))
            .unwrap();
        assert_eq!(updated, 3);
        for child in &children[..2] {
            assert_eq!(roughness(&manager, *child), Some(MaterialPropertyValue::Float(0.1)));
        }
        for child in &children[2..] {
            assert_eq!(roughness(&manager, *child), Some(MaterialPropertyValue::Float(0.9)));
        }
    }

    #[test]
    fn grandchildren_follow_through_inheriting_children() {
        let mut manager = MaterialResourceManager::new();
        let root = manager.create(None, &[], MaterialProperties::new());
        let middle = manager.create_child(root).unwrap();
        let leaf = manager.create_child(middle).unwrap();
        let updated = manager
            .set_property(root, ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.5))
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(roughness(&manager, leaf), Some(MaterialPropertyValue::Float(0.5)));
        assert_eq!(
            manager
                .set_property(root, ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.5))
                .unwrap(),
            0
        );
    }

    #[test]
    fn reparenting_under_a_descendant_is_rejected() {
        let mut manager = MaterialResourceManager::new();
        let root = manager.create(None, &[], MaterialProperties::new());
        let child = manager.create_child(root).unwrap();
        let grandchild = manager.create_child(child).unwrap();

        assert!(matches!(
            manager.set_parent(root, Some(grandchild)),
            Err(MaterialError::Cycle { .. })
        ));
        assert!(matches!(
            manager.set_parent(root, Some(root)),
            Err(MaterialError::Cycle { .. })
        ));
        assert_eq!(manager.get(root).unwrap().parent(), None);
        assert_eq!(manager.get(root).unwrap().children(), &[child]);
        assert_eq!(manager.get(child).unwrap().children(), &[grandchild]);
        assert_eq!(manager.get(grandchild).unwrap().parent(), Some(child));
    }

    #[test]
    fn parenting_inherits_techniques_and_properties() {
        let mut manager = MaterialResourceManager::new();
        let technique = MaterialTechniqueId::from_name("Forward");
        let blueprint = AssetId::from_name("Example/MaterialBlueprint/Mesh/Forward");
        let mut properties = MaterialProperties::new();
        properties.set(ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.3), true);
        let parent = manager.create(None, &[(technique, blueprint)], properties);
        let child = manager.create(None, &[], MaterialProperties::new());
        manager.set_parent(child, Some(parent)).unwrap();

        let resource = manager.get(child).unwrap();
        assert_eq!(resource.techniques().len(), 1);
        assert_eq!(resource.techniques()[0].material_resource_id(), child);
        assert!(!resource.properties().get(ROUGHNESS).unwrap().overwritten);
        assert_eq!(roughness(&manager, child), Some(MaterialPropertyValue::Float(0.3)));
    }

    #[test]
    fn destroy_orphans_children() {
        let mut manager = MaterialResourceManager::new();
        let root = manager.create(None, &[], MaterialProperties::new());
        let middle = manager.create_child(root).unwrap();
        let leaf = manager.create_child(middle).unwrap();
        manager
            .set_property(root, ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.7))
            .unwrap();

        manager.destroy(middle).unwrap();
        assert!(manager.get(middle).is_none());
        assert_eq!(manager.get(leaf).unwrap().parent(), None);
        assert!(manager.get(root).unwrap().children().is_empty());
        assert_eq!(roughness(&manager, leaf), Some(MaterialPropertyValue::Float(0.7)));
    }

    #[test]
    fn reset_takes_the_parent_value_again() {
        let mut manager = MaterialResourceManager::new();
        let root = manager.create(None, &[], MaterialProperties::new());
        let child = manager.create_child(root).unwrap();
        manager
            .set_property(root, ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.2))
            .unwrap();
        manager
            .set_property(child, ROUGHNESS, Usage::ShaderUniform, MaterialPropertyValue::Float(0.8))
            .unwrap();
        manager.reset_property(child, ROUGHNESS).unwrap();
        assert_eq!(roughness(&manager, child), Some(MaterialPropertyValue::Float(0.2)));
        assert!(!manager.get(child).unwrap().properties().get(ROUGHNESS).unwrap().overwritten);
    }
}
