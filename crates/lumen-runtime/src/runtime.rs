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

//! The renderer runtime: every manager wired together behind one owner.

use crate::blueprint::MaterialBlueprintResourceManager;
use crate::compositor::{
    CompositorContext, CompositorNodeResourceManager, CompositorStatistics,
    CompositorWorkspaceInstance, FramebufferManager, RenderTargetTextureManager,
};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::material::{MaterialProperties, MaterialResourceId, MaterialResourceManager};
use crate::pipeline::{
    persistence, PipelineCacheSnapshot, PipelineStateCacheManager, PipelineStateCompiler,
};
use crate::render_queue::RenderQueue;
use crate::scene::SceneResource;
use crate::shader::{ShaderBlueprintResourceManager, ShaderCacheManager, ShaderPieceResourceManager};
use crate::texture::TextureResourceManager;
use ahash::AHashMap;
use lumen_core::asset::{AssetId, AssetManager, AssetPackage};
use lumen_core::collections::HandleTable;
use lumen_core::format::{read_shader_source, AssetFormat};
use lumen_core::renderer::RenderDevice;
use std::sync::Arc;

lumen_core::lumen_id! {
    /// Id of a workspace owned by the runtime.
    pub struct WorkspaceId;
}

/// The kind of an asset loaded through the runtime, used by hot reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadedAssetKind {
    /// A shader piece source.
    ShaderPiece,
    /// A shader blueprint source.
    ShaderBlueprint,
    /// A compiled material blueprint.
    MaterialBlueprint,
    /// A compiled material.
    Material,
    /// A compiled compositor node.
    CompositorNode,
    /// A compiled scene.
    Scene,
}

/// Owns the device, the asset manager and every resource manager.
///
/// Assets are read through the mounted packages. Shader pieces and shader
/// blueprints must be loaded before the material blueprints using them,
/// material blueprints before materials, and materials before scenes.
pub struct RendererRuntime {
    device: RenderDevice,
    config: RuntimeConfig,
    assets: AssetManager,
    shader_pieces: Arc<ShaderPieceResourceManager>,
    shader_blueprints: Arc<ShaderBlueprintResourceManager>,
    blueprints: MaterialBlueprintResourceManager,
    materials: MaterialResourceManager,
    textures: TextureResourceManager,
    nodes: CompositorNodeResourceManager,
    render_targets: RenderTargetTextureManager,
    framebuffers: FramebufferManager,
    workspaces: HandleTable<CompositorWorkspaceInstance, WorkspaceId>,
    scenes: AHashMap<AssetId, Arc<SceneResource>>,
    loaded: AHashMap<AssetId, LoadedAssetKind>,
    global_properties: MaterialProperties,
    persisted: Option<PipelineCacheSnapshot>,
    shut_down: bool,
}

impl RendererRuntime {
    /// Creates the runtime on `device`.
    ///
    /// When a pipeline cache file is configured it is read now; a file written
    /// by another format version or backend, or a corrupted one, is discarded
    /// as a whole. Its content is used by [`RendererRuntime::warm_up`].
    pub fn new(device: RenderDevice, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let shader_pieces = Arc::new(ShaderPieceResourceManager::new());
        let shader_blueprints = Arc::new(ShaderBlueprintResourceManager::new());
        let shader_cache = Arc::new(ShaderCacheManager::new(device.clone(), shader_pieces.clone()));

        let cache_config = &config.pipeline_state_cache;
        let pipeline_state_cache = if cache_config.asynchronous_compilation && cache_config.compiler_threads > 0 {
            PipelineStateCacheManager::with_compiler(
                device.clone(),
                shader_cache,
                PipelineStateCompiler::new(cache_config.compiler_threads),
            )
        } else {
            PipelineStateCacheManager::new(device.clone(), shader_cache)
        };

        let persisted = match &cache_config.cache_file {
            Some(path) => match persistence::load(path, device.backend_type()) {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    log::warn!(
                        "Discarding pipeline state cache '{}': {}",
                        path.display(),
                        error
                    );
                    None
                }
            },
            None => None,
        };

        log::info!(
            "Renderer runtime created on {} ({:?} shaders), {} pipeline compilation",
            device.backend_type(),
            device.shader_language(),
            if pipeline_state_cache.compiler().is_some() {
                "asynchronous"
            } else {
                "synchronous"
            }
        );

        Ok(Self {
            textures: TextureResourceManager::new(device.clone())?,
            render_targets: RenderTargetTextureManager::new(device.clone()),
            framebuffers: FramebufferManager::new(device.clone()),
            blueprints: MaterialBlueprintResourceManager::new(
                device.clone(),
                shader_blueprints.clone(),
                Arc::new(pipeline_state_cache),
            ),
            device,
            config,
            assets: AssetManager::new(),
            shader_pieces,
            shader_blueprints,
            materials: MaterialResourceManager::new(),
            nodes: CompositorNodeResourceManager::new(),
            workspaces: HandleTable::new(),
            scenes: AHashMap::new(),
            loaded: AHashMap::new(),
            global_properties: MaterialProperties::new(),
            persisted,
            shut_down: false,
        })
    }

    /// The device.
    pub fn device(&self) -> &RenderDevice {
        &self.device
    }

    /// The configuration the runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Mounts an asset package on top of the mounted ones.
    pub fn mount_package(&mut self, package: AssetPackage) {
        self.assets.mount(package);
    }

    /// The asset manager.
    pub fn assets(&self) -> &AssetManager {
        &self.assets
    }

    /// The asset manager, mutably.
    pub fn assets_mut(&mut self) -> &mut AssetManager {
        &mut self.assets
    }

    /// Loaded shader pieces.
    pub fn shader_pieces(&self) -> &Arc<ShaderPieceResourceManager> {
        &self.shader_pieces
    }

    /// Loaded shader blueprints.
    pub fn shader_blueprints(&self) -> &Arc<ShaderBlueprintResourceManager> {
        &self.shader_blueprints
    }

    /// Loaded material blueprints.
    pub fn blueprints(&self) -> &MaterialBlueprintResourceManager {
        &self.blueprints
    }

    /// The pipeline state cache.
    pub fn pipeline_state_cache(&self) -> &Arc<PipelineStateCacheManager> {
        self.blueprints.pipeline_state_cache()
    }

    /// Material resources.
    pub fn materials(&self) -> &MaterialResourceManager {
        &self.materials
    }

    /// Material resources, mutably.
    pub fn materials_mut(&mut self) -> &mut MaterialResourceManager {
        &mut self.materials
    }

    /// Textures bound by techniques.
    pub fn textures(&self) -> &TextureResourceManager {
        &self.textures
    }

    /// Textures bound by techniques, mutably.
    pub fn textures_mut(&mut self) -> &mut TextureResourceManager {
        &mut self.textures
    }

    /// Loaded compositor nodes.
    pub fn compositor_nodes(&self) -> &CompositorNodeResourceManager {
        &self.nodes
    }

    /// Shared render target textures.
    pub fn render_targets(&self) -> &RenderTargetTextureManager {
        &self.render_targets
    }

    /// Shared framebuffers.
    pub fn framebuffers(&self) -> &FramebufferManager {
        &self.framebuffers
    }

    /// The global material property table.
    pub fn global_properties(&self) -> &MaterialProperties {
        &self.global_properties
    }

    /// The global material property table, mutably.
    pub fn global_properties_mut(&mut self) -> &mut MaterialProperties {
        &mut self.global_properties
    }

    /// How an asset was loaded, if it was.
    pub fn loaded_asset_kind(&self, asset_id: AssetId) -> Option<LoadedAssetKind> {
        self.loaded.get(&asset_id).copied()
    }

    fn read_source(&self, asset_id: AssetId, format: AssetFormat) -> Result<String, RuntimeError> {
        let bytes = self.assets.read_asset_bytes(asset_id)?;
        Ok(read_shader_source(format, &bytes)?)
    }

    /// Loads a shader piece.
    pub fn load_shader_piece(&mut self, asset_id: AssetId) -> Result<(), RuntimeError> {
        let source = self.read_source(asset_id, AssetFormat::ShaderPiece)?;
        self.shader_pieces.load(asset_id, &source)?;
        self.loaded.insert(asset_id, LoadedAssetKind::ShaderPiece);
        Ok(())
    }

    /// Loads a shader blueprint. Its `@includepiece` pieces should be loaded first.
    pub fn load_shader_blueprint(&mut self, asset_id: AssetId) -> Result<(), RuntimeError> {
        let source = self.read_source(asset_id, AssetFormat::ShaderBlueprint)?;
        self.shader_blueprints
            .load(asset_id, &source, self.shader_pieces.as_ref())?;
        self.loaded.insert(asset_id, LoadedAssetKind::ShaderBlueprint);
        Ok(())
    }

    /// Loads a compiled material blueprint.
    pub fn load_material_blueprint(&mut self, asset_id: AssetId) -> Result<(), RuntimeError> {
        let bytes = self.assets.read_asset_bytes(asset_id)?;
        self.blueprints.load(asset_id, &bytes)?;
        self.materials.invalidate_blueprint(asset_id);
        self.loaded.insert(asset_id, LoadedAssetKind::MaterialBlueprint);
        Ok(())
    }

    /// Loads a compiled material.
    pub fn load_material(&mut self, asset_id: AssetId) -> Result<MaterialResourceId, RuntimeError> {
        let bytes = self.assets.read_asset_bytes(asset_id)?;
        let id = self.materials.load_material(asset_id, &bytes, &self.blueprints)?;
        self.loaded.insert(asset_id, LoadedAssetKind::Material);
        Ok(id)
    }

    /// Loads a compiled compositor node.
    pub fn load_compositor_node(&mut self, asset_id: AssetId) -> Result<(), RuntimeError> {
        let bytes = self.assets.read_asset_bytes(asset_id)?;
        self.nodes.load(asset_id, &bytes)?;
        self.loaded.insert(asset_id, LoadedAssetKind::CompositorNode);
        Ok(())
    }

    /// Loads a compiled scene. Its materials should be loaded first.
    pub fn load_scene(&mut self, asset_id: AssetId) -> Result<Arc<SceneResource>, RuntimeError> {
        let bytes = self.assets.read_asset_bytes(asset_id)?;
        let scene = Arc::new(SceneResource::load(asset_id, &bytes, &self.materials)?);
        self.scenes.insert(asset_id, scene.clone());
        self.loaded.insert(asset_id, LoadedAssetKind::Scene);
        Ok(scene)
    }

    /// A loaded scene.
    pub fn scene(&self, asset_id: AssetId) -> Option<&Arc<SceneResource>> {
        self.scenes.get(&asset_id)
    }

    /// Reads a loaded asset again and replaces it everywhere it is used.
    ///
    /// Pipeline states and shaders depending on the asset are dropped from
    /// their caches and rebuilt on their next request.
    pub fn reload_asset(&mut self, asset_id: AssetId) -> Result<LoadedAssetKind, RuntimeError> {
        let kind = self
            .loaded_asset_kind(asset_id)
            .ok_or(RuntimeError::AssetNotLoaded(asset_id))?;
        match kind {
            LoadedAssetKind::ShaderPiece => {
                self.load_shader_piece(asset_id)?;
                let shader_blueprints = self
                    .shader_blueprints
                    .refresh_piece(asset_id, self.shader_pieces.as_ref());
                for shader_blueprint in shader_blueprints {
                    self.refresh_shader_blueprint(shader_blueprint);
                }
            }
            LoadedAssetKind::ShaderBlueprint => {
                self.load_shader_blueprint(asset_id)?;
                self.refresh_shader_blueprint(asset_id);
            }
            LoadedAssetKind::MaterialBlueprint => self.load_material_blueprint(asset_id)?,
            LoadedAssetKind::Material => {
                self.load_material(asset_id)?;
            }
            LoadedAssetKind::CompositorNode => {
                self.load_compositor_node(asset_id)?;
                for (_, workspace) in self.workspaces.iter_mut() {
                    if workspace.node_asset_ids().contains(&asset_id) {
                        workspace.release(&mut self.render_targets, &mut self.framebuffers);
                    }
                }
            }
            LoadedAssetKind::Scene => {
                self.load_scene(asset_id)?;
            }
        }
        log::info!("Reloaded {:?} asset {}", kind, asset_id);
        Ok(kind)
    }

    fn refresh_shader_blueprint(&mut self, shader_blueprint_asset_id: AssetId) {
        let affected = self.blueprints.refresh_shader_blueprint(shader_blueprint_asset_id);
        for material_blueprint in affected {
            self.materials.invalidate_blueprint(material_blueprint);
        }
    }

    /// Builds the pipeline states recorded by the previous run whose material
    /// blueprint is now loaded. Call once the startup assets are loaded.
    /// Returns the number of pipeline states built.
    pub fn warm_up(&mut self) -> usize {
        let Some(snapshot) = self.persisted.take() else {
            return 0;
        };
        let blueprints = &self.blueprints;
        self.blueprints
            .pipeline_state_cache()
            .warm_up(snapshot, |asset_id| blueprints.get_by_asset(asset_id).cloned())
    }

    /// Creates a workspace executing `node_asset_ids` in order, with buffer
    /// sizes from the configuration.
    pub fn create_workspace(&mut self, node_asset_ids: Vec<AssetId>) -> WorkspaceId {
        let workspace = CompositorWorkspaceInstance::new(node_asset_ids, self.config.workspace_settings());
        self.workspaces.insert(workspace)
    }

    /// A workspace.
    pub fn workspace(&self, id: WorkspaceId) -> Option<&CompositorWorkspaceInstance> {
        self.workspaces.get(id)
    }

    /// A workspace, mutably, to set its output size, pass context or listener.
    pub fn workspace_mut(&mut self, id: WorkspaceId) -> Option<&mut CompositorWorkspaceInstance> {
        self.workspaces.get_mut(id)
    }

    /// Destroys a workspace and hands its render targets back.
    pub fn destroy_workspace(&mut self, id: WorkspaceId) -> bool {
        let Some(mut workspace) = self.workspaces.remove(id) else {
            return false;
        };
        workspace.release(&mut self.render_targets, &mut self.framebuffers);
        true
    }

    /// Executes a workspace over `render_queue` and submits the result.
    pub fn render_workspace(
        &mut self,
        id: WorkspaceId,
        render_queue: &RenderQueue,
    ) -> Result<CompositorStatistics, RuntimeError> {
        let asynchronous = self.config.pipeline_state_cache.asynchronous_compilation;
        let Self {
            device,
            nodes,
            render_targets,
            framebuffers,
            materials,
            blueprints,
            textures,
            global_properties,
            workspaces,
            ..
        } = self;
        let workspace = workspaces
            .get_mut(id)
            .ok_or(RuntimeError::WorkspaceNotFound(id))?;
        let mut context = CompositorContext {
            device,
            nodes,
            render_targets,
            framebuffers,
            materials,
            blueprints,
            textures,
            global_properties,
            render_queue,
            asynchronous,
        };
        Ok(workspace.execute(&mut context)?)
    }

    /// Destroys a material. Its children become roots.
    pub fn destroy_material(&mut self, material: MaterialResourceId) -> Result<(), RuntimeError> {
        let resource = self.materials.destroy(material)?;
        if let Some(asset_id) = resource.asset_id {
            self.loaded.remove(&asset_id);
        }
        for (_, workspace) in self.workspaces.iter_mut() {
            workspace.release_material(material);
        }
        Ok(())
    }

    /// Waits for pending pipeline state builds, releases every workspace and
    /// writes the pipeline state cache when configured. Later calls do nothing.
    pub fn shutdown(&mut self) -> Result<(), RuntimeError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        let pipeline_state_cache = self.blueprints.pipeline_state_cache();
        pipeline_state_cache.wait_until_idle();
        for (_, workspace) in self.workspaces.iter_mut() {
            workspace.release(&mut self.render_targets, &mut self.framebuffers);
        }
        let leaked = self.framebuffers.report_leaks() + self.render_targets.report_leaks();
        if leaked > 0 {
            log::error!("{} compositor resources outlived every workspace", leaked);
        }

        let cache_config = &self.config.pipeline_state_cache;
        if let (true, Some(path)) = (cache_config.save_on_shutdown, &cache_config.cache_file) {
            let snapshot = pipeline_state_cache.snapshot();
            persistence::save(path, &snapshot, self.device.backend_type())?;
        }
        let statistics = pipeline_state_cache.statistics();
        log::info!(
            "Renderer runtime shut down: {} pipeline states, {} builds, {} failures, {} hits, {} misses",
            pipeline_state_cache.len(),
            statistics.builds,
            statistics.failures,
            statistics.hits,
            statistics.misses
        );
        Ok(())
    }
}

impl Drop for RendererRuntime {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            log::error!("Renderer runtime shutdown failed: {}", error);
        }
    }
}

impl std::fmt::Debug for RendererRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRuntime")
            .field("backend", &self.device.backend_type())
            .field("blueprints", &self.blueprints.len())
            .field("materials", &self.materials.len())
            .field("compositor_nodes", &self.nodes.len())
            .field("workspaces", &self.workspaces.len())
            .field("shut_down", &self.shut_down)
            .finish()
    }
}
