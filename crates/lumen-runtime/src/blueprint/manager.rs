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

//! Material blueprint resource manager.

use super::resource::MaterialBlueprintResource;
use crate::error::BlueprintError;
use crate::pipeline::PipelineStateCacheManager;
use crate::shader::ShaderBlueprintResourceManager;
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::collections::HandleTable;
use lumen_core::format::MaterialBlueprintFile;
use lumen_core::renderer::RenderDevice;
use std::sync::Arc;

lumen_core::lumen_id! {
    /// Id of a loaded material blueprint.
    pub struct MaterialBlueprintResourceId;
}

/// Owns the loaded material blueprints and the pipeline state cache shared by
/// all of them.
pub struct MaterialBlueprintResourceManager {
    device: RenderDevice,
    shader_blueprints: Arc<ShaderBlueprintResourceManager>,
    pipeline_state_cache: Arc<PipelineStateCacheManager>,
    resources: HandleTable<Arc<MaterialBlueprintResource>, MaterialBlueprintResourceId>,
    by_asset: AHashMap<AssetId, MaterialBlueprintResourceId>,
}

impl MaterialBlueprintResourceManager {
    /// Creates an empty manager.
    pub fn new(
        device: RenderDevice,
        shader_blueprints: Arc<ShaderBlueprintResourceManager>,
        pipeline_state_cache: Arc<PipelineStateCacheManager>,
    ) -> Self {
        Self {
            device,
            shader_blueprints,
            pipeline_state_cache,
            resources: HandleTable::new(),
            by_asset: AHashMap::new(),
        }
    }

    /// The pipeline state cache.
    pub fn pipeline_state_cache(&self) -> &Arc<PipelineStateCacheManager> {
        &self.pipeline_state_cache
    }

    /// The shader blueprints blueprints are built from.
    pub fn shader_blueprints(&self) -> &Arc<ShaderBlueprintResourceManager> {
        &self.shader_blueprints
    }

    /// Loads a blueprint from its compiled bytes.
    pub fn load(&mut self, asset_id: AssetId, bytes: &[u8]) -> Result<MaterialBlueprintResourceId, BlueprintError> {
        let file = MaterialBlueprintFile::read(bytes)?;
        self.load_file(asset_id, &file)
    }

    /// Loads a blueprint. Loading an already loaded asset replaces it in place,
    /// keeps its id and invalidates its pipeline states.
    pub fn load_file(
        &mut self,
        asset_id: AssetId,
        file: &MaterialBlueprintFile,
    ) -> Result<MaterialBlueprintResourceId, BlueprintError> {
        let resource = Arc::new(MaterialBlueprintResource::load(
            asset_id,
            file,
            &self.device,
            &self.shader_blueprints,
        )?);
        Ok(self.install(resource))
    }

    fn install(&mut self, resource: Arc<MaterialBlueprintResource>) -> MaterialBlueprintResourceId {
        let asset_id = resource.asset_id();
        if let Some(&id) = self.by_asset.get(&asset_id) {
            if let Some(slot) = self.resources.get_mut(id) {
                *slot = resource;
                self.pipeline_state_cache.invalidate(asset_id);
                log::info!("Material blueprint {} reloaded", asset_id);
                return id;
            }
        }
        let id = self.resources.insert(resource);
        self.by_asset.insert(asset_id, id);
        id
    }

    /// Picks up the current version of a reloaded shader blueprint in every
    /// blueprint using it. Returns the affected blueprint assets.
    pub fn refresh_shader_blueprint(&mut self, shader_blueprint_asset_id: AssetId) -> Vec<AssetId> {
        let affected: Vec<_> = self
            .resources
            .iter()
            .filter(|(_, resource)| resource.uses_shader_blueprint(shader_blueprint_asset_id))
            .map(|(id, _)| id)
            .collect();
        let mut assets = Vec::with_capacity(affected.len());
        for id in affected {
            let Some(slot) = self.resources.get_mut(id) else {
                continue;
            };
            let refreshed = slot.with_refreshed_shader_blueprints(&self.shader_blueprints);
            *slot = Arc::new(refreshed);
            self.pipeline_state_cache.invalidate(slot.asset_id());
            assets.push(slot.asset_id());
        }
        self.pipeline_state_cache
            .shader_cache()
            .invalidate(shader_blueprint_asset_id);
        assets
    }

    /// Unloads a blueprint and drops its pipeline states.
    pub fn unload(&mut self, asset_id: AssetId) -> bool {
        let Some(id) = self.by_asset.remove(&asset_id) else {
            return false;
        };
        self.resources.remove(id);
        self.pipeline_state_cache.invalidate(asset_id);
        true
    }

    /// A blueprint by id.
    pub fn get(&self, id: MaterialBlueprintResourceId) -> Option<&Arc<MaterialBlueprintResource>> {
        self.resources.get(id)
    }

    /// A blueprint by asset.
    pub fn get_by_asset(&self, asset_id: AssetId) -> Option<&Arc<MaterialBlueprintResource>> {
        self.by_asset
            .get(&asset_id)
            .and_then(|id| self.resources.get(*id))
    }

    /// The id of a loaded blueprint asset.
    pub fn id_of(&self, asset_id: AssetId) -> Option<MaterialBlueprintResourceId> {
        self.by_asset.get(&asset_id).copied()
    }

    /// Number of loaded blueprints.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if no blueprint is loaded.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Loaded blueprints.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialBlueprintResourceId, &Arc<MaterialBlueprintResource>)> {
        self.resources.iter()
    }
}

impl std::fmt::Debug for MaterialBlueprintResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialBlueprintResourceManager")
            .field("blueprints", &self.resources.len())
            .field("pipeline_state_cache", &self.pipeline_state_cache)
            .finish()
    }
}
