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

//! Material resources and their techniques.

use super::properties::MaterialProperties;
use crate::blueprint::MaterialBlueprintResource;
use crate::buffer::PropertyResolver;
use crate::pipeline::{PipelineStateCache, PipelineStateCacheManager, PipelineStateRequest};
use crate::shader::ShaderProperties;
use lumen_core::asset::AssetId;
use lumen_core::MaterialTechniqueId;
use std::sync::Arc;

lumen_core::lumen_id! {
    /// Id of a material resource.
    pub struct MaterialResourceId;
}

/// A texture a technique binds, resolved from the material properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechniqueTexture {
    /// Root parameter the texture binds to.
    pub root_parameter_index: u32,
    /// The texture named by the material, if it resolved.
    pub texture_asset_id: Option<AssetId>,
    /// Texture to bind while the named one is unavailable.
    pub fallback_texture_asset_id: Option<AssetId>,
    /// Index into the blueprint sampler states.
    pub sampler_state_index: Option<u32>,
}

struct Resolved {
    blueprint: Arc<MaterialBlueprintResource>,
    shader_combination_generation: u64,
    change_generation: u64,
    pipeline_state: Option<Arc<PipelineStateCache>>,
}

/// A material drawn with one material blueprint under a technique id.
///
/// Holds the id of its owning material for lookups only. The pipeline state
/// and textures are resolved lazily and re-resolved when the material
/// properties or the blueprint change.
pub struct MaterialTechnique {
    material_technique_id: MaterialTechniqueId,
    material_blueprint_asset_id: AssetId,
    material_resource_id: MaterialResourceId,
    shader_properties: ShaderProperties,
    textures: Vec<TechniqueTexture>,
    resolved: Option<Resolved>,
}

impl MaterialTechnique {
    pub(crate) fn new(
        material_technique_id: MaterialTechniqueId,
        material_blueprint_asset_id: AssetId,
        material_resource_id: MaterialResourceId,
    ) -> Self {
        Self {
            material_technique_id,
            material_blueprint_asset_id,
            material_resource_id,
            shader_properties: ShaderProperties::new(),
            textures: Vec::new(),
            resolved: None,
        }
    }

    pub(crate) fn clone_for(&self, material_resource_id: MaterialResourceId) -> Self {
        Self::new(
            self.material_technique_id,
            self.material_blueprint_asset_id,
            material_resource_id,
        )
    }

    /// The technique id.
    pub fn material_technique_id(&self) -> MaterialTechniqueId {
        self.material_technique_id
    }

    /// The blueprint drawn with.
    pub fn material_blueprint_asset_id(&self) -> AssetId {
        self.material_blueprint_asset_id
    }

    /// The owning material.
    pub fn material_resource_id(&self) -> MaterialResourceId {
        self.material_resource_id
    }

    /// Shader combination of the last resolution.
    pub fn shader_properties(&self) -> &ShaderProperties {
        &self.shader_properties
    }

    /// Textures of the last resolution.
    pub fn textures(&self) -> &[TechniqueTexture] {
        &self.textures
    }

    /// The pipeline state of the last resolution, if it was ready.
    pub fn cached_pipeline_state(&self) -> Option<&Arc<PipelineStateCache>> {
        self.resolved.as_ref().and_then(|resolved| resolved.pipeline_state.as_ref())
    }

    /// Forgets the last resolution.
    pub fn invalidate(&mut self) {
        self.resolved = None;
    }

    fn is_current(&self, blueprint: &Arc<MaterialBlueprintResource>, properties: &MaterialProperties) -> bool {
        self.resolved.as_ref().is_some_and(|resolved| {
            Arc::ptr_eq(&resolved.blueprint, blueprint)
                && resolved.shader_combination_generation == properties.shader_combination_generation()
                && resolved.change_generation == properties.change_generation()
                && resolved.pipeline_state.is_some()
        })
    }

    /// Resolves the shader combination, textures and pipeline state.
    ///
    /// Returns the pipeline state to draw with, `None` when it is null or, in
    /// asynchronous mode, still pending without a usable fallback.
    pub(crate) fn resolve(
        &mut self,
        properties: &MaterialProperties,
        blueprint: &Arc<MaterialBlueprintResource>,
        global: &MaterialProperties,
        cache: &PipelineStateCacheManager,
        asynchronous: bool,
    ) -> Option<Arc<PipelineStateCache>> {
        if self.is_current(blueprint, properties) {
            return self
                .cached_pipeline_state()
                .filter(|cache| !cache.is_null())
                .cloned();
        }
        self.shader_properties = blueprint.shader_properties_for(properties);
        self.textures = resolve_textures(blueprint, properties, global);

        let (pipeline_state, usable) = if asynchronous {
            match cache.request_async(blueprint, &self.shader_properties, properties) {
                PipelineStateRequest::Ready(ready) => (Some(Arc::clone(&ready)), Some(ready)),
                pending => (None, pending.usable().cloned()),
            }
        } else {
            let ready = cache.request(blueprint, &self.shader_properties, properties);
            (Some(Arc::clone(&ready)), Some(ready))
        };
        self.resolved = Some(Resolved {
            blueprint: Arc::clone(blueprint),
            shader_combination_generation: properties.shader_combination_generation(),
            change_generation: properties.change_generation(),
            pipeline_state,
        });
        usable.filter(|cache| !cache.is_null())
    }
}

fn resolve_textures(
    blueprint: &MaterialBlueprintResource,
    properties: &MaterialProperties,
    global: &MaterialProperties,
) -> Vec<TechniqueTexture> {
    let effective = blueprint.effective_properties(properties);
    let resolver = PropertyResolver::new(global).with_material(&effective);
    blueprint
        .textures()
        .iter()
        .map(|declaration| {
            let mut property = declaration.property;
            if let Some(local) = effective.get(property.property_id) {
                if local.value_type() == property.value_type() && !property.usage.is_reference() {
                    property.value = local.value;
                }
            }
            let texture_asset_id = match resolver.resolve(&property) {
                Ok(value) => value.as_texture_asset_id(),
                Err(error) => {
                    log::warn!(
                        "Texture {} of blueprint {}: {}",
                        property.property_id,
                        blueprint.asset_id(),
                        error
                    );
                    None
                }
            };
            TechniqueTexture {
                root_parameter_index: declaration.root_parameter_index,
                texture_asset_id,
                fallback_texture_asset_id: declaration.fallback_texture_asset_id,
                sampler_state_index: declaration.sampler_state_index,
            }
        })
        .collect()
}

impl std::fmt::Debug for MaterialTechnique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialTechnique")
            .field("material_technique_id", &self.material_technique_id)
            .field("material_blueprint_asset_id", &self.material_blueprint_asset_id)
            .field("material_resource_id", &self.material_resource_id)
            .field("resolved", &self.resolved.is_some())
            .finish()
    }
}

/// A material: properties, techniques and its place in the material tree.
#[derive(Debug)]
pub struct MaterialResource {
    pub(crate) id: MaterialResourceId,
    pub(crate) asset_id: Option<AssetId>,
    pub(crate) parent: Option<MaterialResourceId>,
    pub(crate) children: Vec<MaterialResourceId>,
    pub(crate) techniques: Vec<MaterialTechnique>,
    pub(crate) properties: MaterialProperties,
}

impl MaterialResource {
    pub(crate) fn new(id: MaterialResourceId, asset_id: Option<AssetId>) -> Self {
        Self {
            id,
            asset_id,
            parent: None,
            children: Vec::new(),
            techniques: Vec::new(),
            properties: MaterialProperties::new(),
        }
    }

    /// The id of the material.
    pub fn id(&self) -> MaterialResourceId {
        self.id
    }

    /// The material asset it was loaded from.
    pub fn asset_id(&self) -> Option<AssetId> {
        self.asset_id
    }

    /// The parent material.
    pub fn parent(&self) -> Option<MaterialResourceId> {
        self.parent
    }

    /// Direct children, sorted.
    pub fn children(&self) -> &[MaterialResourceId] {
        &self.children
    }

    /// Techniques, sorted by technique id.
    pub fn techniques(&self) -> &[MaterialTechnique] {
        &self.techniques
    }

    /// A technique by id.
    pub fn technique(&self, material_technique_id: MaterialTechniqueId) -> Option<&MaterialTechnique> {
        self.technique_index(material_technique_id)
            .ok()
            .map(|index| &self.techniques[index])
    }

    pub(crate) fn technique_index(&self, material_technique_id: MaterialTechniqueId) -> Result<usize, usize> {
        self.techniques
            .binary_search_by_key(&material_technique_id, MaterialTechnique::material_technique_id)
    }

    /// Adds or replaces a technique.
    pub(crate) fn set_technique(&mut self, material_technique_id: MaterialTechniqueId, material_blueprint_asset_id: AssetId) {
        let technique = MaterialTechnique::new(material_technique_id, material_blueprint_asset_id, self.id);
        match self.technique_index(material_technique_id) {
            Ok(index) => self.techniques[index] = technique,
            Err(index) => self.techniques.insert(index, technique),
        }
    }

    /// The material properties.
    pub fn properties(&self) -> &MaterialProperties {
        &self.properties
    }
}
