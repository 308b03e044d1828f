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

//! Compositor workspace instances: executing nodes into a command buffer.

use super::framebuffer::{FramebufferManager, FramebufferSignature, FramebufferTexture};
use super::node::{CompositorNodeResource, CompositorNodeResourceManager, CompositorPass};
use super::render_target::{RenderTargetTextureManager, RenderTargetTextureSignature};
use crate::blueprint::{
    DefaultMaterialBlueprintResourceListener, MaterialBlueprintResource,
    MaterialBlueprintResourceListener, MaterialBlueprintResourceManager, PassContext,
};
use crate::buffer::{
    InstanceBufferManager, InstancePropertySource, MaterialBufferManager, PassBufferManager,
    PropertyResolver, MATERIAL_INDEX,
};
use crate::error::CompositorError;
use crate::material::{MaterialProperties, MaterialPropertyValue, MaterialResourceId, MaterialResourceManager};
use crate::pipeline::PipelineStateCache;
use crate::render_queue::{RenderQueue, Renderable};
use crate::texture::TextureResourceManager;
use ahash::{AHashMap, AHashSet};
use lumen_core::asset::AssetId;
use lumen_core::renderer::api::{
    Command, CommandBuffer, DescriptorResource, FramebufferId, Viewport,
};
use lumen_core::renderer::{GpuHandle, RenderDevice};
use lumen_core::{MaterialTechniqueId, PropertyId};
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Sizes of the buffers a workspace creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// Requested size of the instance uniform buffer.
    pub instance_uniform_buffer_size: u32,
    /// Requested size of the instance texture buffers.
    pub instance_texture_buffer_size: u32,
    /// Material slots per material uniform buffer page.
    pub material_slots_per_page: u32,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            instance_uniform_buffer_size: 64 * 1024,
            instance_texture_buffer_size: 512 * 1024,
            material_slots_per_page: 64,
        }
    }
}

/// The managers and data a workspace draws with.
pub struct CompositorContext<'a> {
    /// Device commands are submitted to.
    pub device: &'a RenderDevice,
    /// Loaded compositor nodes.
    pub nodes: &'a CompositorNodeResourceManager,
    /// Shared render target textures.
    pub render_targets: &'a mut RenderTargetTextureManager,
    /// Shared framebuffers.
    pub framebuffers: &'a mut FramebufferManager,
    /// Materials drawn.
    pub materials: &'a mut MaterialResourceManager,
    /// Material blueprints and the pipeline state cache.
    pub blueprints: &'a MaterialBlueprintResourceManager,
    /// Textures bound by techniques.
    pub textures: &'a TextureResourceManager,
    /// Global material properties.
    pub global_properties: &'a MaterialProperties,
    /// Renderables drawn by scene passes.
    pub render_queue: &'a RenderQueue,
    /// Request pipeline states without blocking on their build.
    pub asynchronous: bool,
}

/// What one execution did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositorStatistics {
    /// Passes executed.
    pub passes: u32,
    /// Draw calls recorded.
    pub draw_calls: u32,
    /// Draws skipped for a missing, null or pending pipeline state.
    pub skipped_draws: u32,
    /// Pipeline state binds recorded.
    pub pipeline_state_changes: u32,
}

#[derive(Debug)]
struct AcquiredFramebuffer {
    node: AssetId,
    framebuffer: AssetId,
    signature_id: u64,
    handle: GpuHandle<FramebufferId>,
}

/// Per-draw values: the renderable plus the material slot.
struct DrawInstance<'a> {
    renderable: Option<&'a Renderable>,
    material_index: u32,
}

impl InstancePropertySource for DrawInstance<'_> {
    fn instance_property(&self, reference: PropertyId) -> Option<MaterialPropertyValue> {
        if reference == MATERIAL_INDEX {
            return Some(MaterialPropertyValue::Integer(self.material_index as i32));
        }
        self.renderable
            .and_then(|renderable| renderable.instance_property(reference))
    }
}

/// State tracked while recording one pass.
#[derive(Default)]
struct PassState {
    bound_pipeline_state: Option<u64>,
    filled_blueprints: AHashSet<AssetId>,
}

/// A chain of compositor nodes rendered to an output of a given size.
///
/// Render targets and framebuffers are acquired on the first execution and
/// again after the output size changed; [`release`] hands them back.
///
/// [`release`]: CompositorWorkspaceInstance::release
pub struct CompositorWorkspaceInstance {
    node_asset_ids: Vec<AssetId>,
    settings: WorkspaceSettings,
    output_size: [u32; 2],
    pass_context: PassContext,
    listener: Box<dyn MaterialBlueprintResourceListener>,
    acquired: Vec<AcquiredFramebuffer>,
    acquired_size: Option<[u32; 2]>,
    pass_buffers: AHashMap<AssetId, PassBufferManager>,
    material_buffers: AHashMap<AssetId, (Arc<MaterialBlueprintResource>, Option<MaterialBufferManager>)>,
    instance_buffers: Option<InstanceBufferManager>,
    commands: CommandBuffer,
}

impl CompositorWorkspaceInstance {
    /// Creates a workspace executing `node_asset_ids` in order.
    pub fn new(node_asset_ids: Vec<AssetId>, settings: WorkspaceSettings) -> Self {
        Self {
            node_asset_ids,
            settings,
            output_size: [1, 1],
            pass_context: PassContext::default(),
            listener: Box::new(DefaultMaterialBlueprintResourceListener::new()),
            acquired: Vec::new(),
            acquired_size: None,
            pass_buffers: AHashMap::new(),
            material_buffers: AHashMap::new(),
            instance_buffers: None,
            commands: CommandBuffer::new(),
        }
    }

    /// Replaces the listener providing pass values.
    pub fn set_listener(&mut self, listener: Box<dyn MaterialBlueprintResourceListener>) {
        self.listener = listener;
    }

    /// Sets the camera and timing of the next executions.
    pub fn set_pass_context(&mut self, pass_context: PassContext) {
        self.pass_context = pass_context;
    }

    /// Sets the size of the main render target.
    pub fn set_output_size(&mut self, width: u32, height: u32) {
        self.output_size = [width.max(1), height.max(1)];
    }

    /// The executed nodes.
    pub fn node_asset_ids(&self) -> &[AssetId] {
        &self.node_asset_ids
    }

    /// Commands recorded by the last execution.
    pub fn last_commands(&self) -> &CommandBuffer {
        &self.commands
    }

    /// Releases the render targets and framebuffers acquired by this workspace.
    pub fn release(
        &mut self,
        render_targets: &mut RenderTargetTextureManager,
        framebuffers: &mut FramebufferManager,
    ) {
        for acquired in self.acquired.drain(..) {
            framebuffers.release(acquired.signature_id, render_targets);
        }
        self.acquired_size = None;
    }

    /// Forgets the per-material slots of a destroyed material.
    pub fn release_material(&mut self, material: MaterialResourceId) {
        for (_, manager) in self.material_buffers.values_mut() {
            if let Some(manager) = manager {
                manager.release(material);
            }
        }
    }

    fn nodes(&self, nodes: &CompositorNodeResourceManager) -> Result<Vec<Arc<CompositorNodeResource>>, CompositorError> {
        self.node_asset_ids
            .iter()
            .map(|asset_id| nodes.get(*asset_id).cloned().ok_or(CompositorError::NodeNotLoaded(*asset_id)))
            .collect()
    }

    fn acquire_targets(
        &mut self,
        nodes: &[Arc<CompositorNodeResource>],
        render_targets: &mut RenderTargetTextureManager,
        framebuffers: &mut FramebufferManager,
    ) -> Result<(), CompositorError> {
        if self.acquired_size == Some(self.output_size) {
            return Ok(());
        }
        self.release(render_targets, framebuffers);
        for node in nodes {
            for declaration in node.framebuffers() {
                let texture = |asset_id: AssetId| {
                    node.render_target_texture(asset_id)
                        .map(|rt| {
                            let [width, height] = rt.resolved_size(self.output_size);
                            FramebufferTexture {
                                asset_id,
                                signature: RenderTargetTextureSignature::new(
                                    width,
                                    height,
                                    rt.texture_format,
                                    rt.allow_multisample,
                                ),
                            }
                        })
                        .ok_or(CompositorError::UnknownRenderTargetTexture {
                            framebuffer: declaration.asset_id,
                            texture: asset_id,
                        })
                };
                let color_textures = declaration
                    .color_textures
                    .iter()
                    .map(|asset_id| texture(*asset_id))
                    .collect::<Result<Vec<_>, _>>()?;
                let depth_stencil_texture = declaration
                    .depth_stencil_texture
                    .map(texture)
                    .transpose()?;
                let signature = FramebufferSignature::new(color_textures, depth_stencil_texture);
                let handle = framebuffers.acquire(&signature, render_targets)?;
                self.acquired.push(AcquiredFramebuffer {
                    node: node.asset_id(),
                    framebuffer: declaration.asset_id,
                    signature_id: signature.id(),
                    handle,
                });
            }
        }
        self.acquired_size = Some(self.output_size);
        Ok(())
    }

    fn framebuffer(&self, node: AssetId, framebuffer: AssetId) -> Option<&GpuHandle<FramebufferId>> {
        self.acquired
            .iter()
            .find(|acquired| acquired.node == node && acquired.framebuffer == framebuffer)
            .map(|acquired| &acquired.handle)
    }

    /// Executes every node, submits the recorded commands and returns what
    /// was done.
    ///
    /// Draws whose pipeline state is missing, null or still building are
    /// skipped and counted.
    pub fn execute(&mut self, context: &mut CompositorContext<'_>) -> Result<CompositorStatistics, CompositorError> {
        let nodes = self.nodes(context.nodes)?;
        self.acquire_targets(&nodes, context.render_targets, context.framebuffers)?;
        if self.instance_buffers.is_none() {
            self.instance_buffers = Some(InstanceBufferManager::new(
                context.device,
                self.settings.instance_uniform_buffer_size,
                self.settings.instance_texture_buffer_size,
            )?);
        }

        let mut commands = std::mem::take(&mut self.commands);
        commands.clear();
        let mut statistics = CompositorStatistics::default();
        let result = self.record(context, &nodes, &mut commands, &mut statistics);
        self.commands = commands;
        result?;
        context.device.submit(&self.commands)?;
        log::trace!(
            "Workspace executed: {} passes, {} draws, {} skipped",
            statistics.passes,
            statistics.draw_calls,
            statistics.skipped_draws
        );
        Ok(statistics)
    }

    fn record(
        &mut self,
        context: &mut CompositorContext<'_>,
        nodes: &[Arc<CompositorNodeResource>],
        commands: &mut CommandBuffer,
        statistics: &mut CompositorStatistics,
    ) -> Result<(), CompositorError> {
        for node in nodes {
            for target in node.targets() {
                let framebuffer = target
                    .framebuffer
                    .and_then(|framebuffer| self.framebuffer(node.asset_id(), framebuffer))
                    .map(|handle| handle.id());
                let viewport_size = self.output_size;
                commands.push(Command::SetFramebuffer(framebuffer));
                commands.push(Command::SetViewport(Viewport {
                    top_left_x: 0.0,
                    top_left_y: 0.0,
                    width: viewport_size[0] as f32,
                    height: viewport_size[1] as f32,
                }));
                let pass_context = PassContext {
                    viewport_size,
                    ..self.pass_context
                };
                for pass in &target.passes {
                    statistics.passes += 1;
                    self.listener.begin_fill_pass(&pass_context);
                    let mut state = PassState::default();
                    match *pass {
                        CompositorPass::Clear {
                            flags,
                            color,
                            z,
                            stencil,
                        } => commands.push(Command::Clear {
                            flags,
                            color,
                            z,
                            stencil,
                        }),
                        CompositorPass::Scene {
                            material_technique_id,
                            minimum_render_queue_index,
                            maximum_render_queue_index,
                        } => {
                            let renderables = context
                                .render_queue
                                .range(minimum_render_queue_index, maximum_render_queue_index);
                            let mut draws = Vec::with_capacity(renderables.len());
                            for renderable in renderables {
                                match context.materials.resolve_technique(
                                    renderable.material,
                                    material_technique_id,
                                    context.blueprints,
                                    context.global_properties,
                                    context.asynchronous,
                                ) {
                                    Some(pipeline_state) => draws.push((renderable, pipeline_state)),
                                    None => statistics.skipped_draws += 1,
                                }
                            }
                            draws.sort_by_key(|(renderable, pipeline_state)| {
                                (renderable.render_queue_index, pipeline_state.key())
                            });
                            for (renderable, pipeline_state) in draws {
                                self.draw(
                                    context,
                                    &mut state,
                                    commands,
                                    statistics,
                                    renderable.material,
                                    material_technique_id,
                                    &pipeline_state,
                                    Some(renderable),
                                )?;
                            }
                        }
                        CompositorPass::Quad {
                            material_asset_id,
                            material_technique_id,
                        } => {
                            let resolved = context.materials.id_of(material_asset_id).and_then(|material| {
                                context
                                    .materials
                                    .resolve_technique(
                                        material,
                                        material_technique_id,
                                        context.blueprints,
                                        context.global_properties,
                                        context.asynchronous,
                                    )
                                    .map(|pipeline_state| (material, pipeline_state))
                            });
                            match resolved {
                                Some((material, pipeline_state)) => self.draw(
                                    context,
                                    &mut state,
                                    commands,
                                    statistics,
                                    material,
                                    material_technique_id,
                                    &pipeline_state,
                                    None,
                                )?,
                                None => {
                                    log::debug!(
                                        "Quad pass of node {} skipped, material {} not drawable",
                                        node.asset_id(),
                                        material_asset_id
                                    );
                                    statistics.skipped_draws += 1;
                                }
                            }
                        }
                        CompositorPass::Copy {
                            destination_texture_asset_id,
                            source_texture_asset_id,
                        } => {
                            match (
                                context.render_targets.texture(destination_texture_asset_id),
                                context.render_targets.texture(source_texture_asset_id),
                            ) {
                                (Some(destination), Some(source)) => commands.push(Command::CopyResource {
                                    destination: destination.id(),
                                    source: source.id(),
                                }),
                                _ => log::warn!(
                                    "Copy pass of node {}: render target {} or {} is not alive",
                                    node.asset_id(),
                                    source_texture_asset_id,
                                    destination_texture_asset_id
                                ),
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw(
        &mut self,
        context: &mut CompositorContext<'_>,
        state: &mut PassState,
        commands: &mut CommandBuffer,
        statistics: &mut CompositorStatistics,
        material: MaterialResourceId,
        material_technique_id: MaterialTechniqueId,
        pipeline_state: &Arc<PipelineStateCache>,
        renderable: Option<&Renderable>,
    ) -> Result<(), CompositorError> {
        let blueprint_asset_id = pipeline_state.signature().material_blueprint_asset_id();
        let (Some(handle), Some(blueprint)) = (
            pipeline_state.pipeline_state(),
            context.blueprints.get_by_asset(blueprint_asset_id).cloned(),
        ) else {
            statistics.skipped_draws += 1;
            return Ok(());
        };
        let Some(technique) = context
            .materials
            .get(material)
            .and_then(|resource| resource.technique(material_technique_id))
        else {
            statistics.skipped_draws += 1;
            return Ok(());
        };
        let global = context.global_properties;

        if state.bound_pipeline_state != Some(pipeline_state.key()) {
            commands.push(Command::SetGraphicsRootSignature(pipeline_state.root_signature().id()));
            commands.push(Command::SetPipelineState(handle.id()));
            for sampler in blueprint.sampler_states() {
                commands.push(Command::SetGraphicsRootDescriptorTable {
                    root_parameter_index: sampler.root_parameter_index,
                    resource: DescriptorResource::SamplerState(sampler.sampler_state.id()),
                });
            }
            state.bound_pipeline_state = Some(pipeline_state.key());
            statistics.pipeline_state_changes += 1;

            let pass_buffers = pass_buffers_for(&mut self.pass_buffers, context.device, &blueprint)?;
            if state.filled_blueprints.insert(blueprint_asset_id) {
                let resolver = PropertyResolver::new(global).with_pass(self.listener.as_ref());
                pass_buffers.fill_buffer(&resolver, commands)?;
            }
            pass_buffers.bind(commands);
        }

        for texture in technique.textures() {
            let bound = texture
                .texture_asset_id
                .and_then(|asset_id| context.render_targets.texture(asset_id))
                .or_else(|| context.textures.resolve(texture));
            if let Some(bound) = bound {
                commands.push(Command::SetGraphicsRootDescriptorTable {
                    root_parameter_index: texture.root_parameter_index,
                    resource: DescriptorResource::Texture(bound.id()),
                });
            }
        }

        let mut material_index = 0;
        let slots_per_page = self.settings.material_slots_per_page;
        if let Some(material_buffers) =
            material_buffers_for(&mut self.material_buffers, context.device, &blueprint, slots_per_page)
        {
            if let Some(resource) = context.materials.get(material) {
                if let Some(slot) = material_buffers.update(resource, material_technique_id, global)? {
                    material_buffers.upload(commands);
                    material_buffers.bind(slot, commands);
                    material_index = slot.index;
                }
            }
        }

        let instance = DrawInstance {
            renderable,
            material_index,
        };
        if let Some(instance_buffers) = self.instance_buffers.as_mut() {
            let resolver = PropertyResolver::new(global).with_instance(&instance);
            instance_buffers.fill_buffer(&blueprint, &resolver, commands)?;
        }

        match renderable {
            Some(renderable) => commands.push(Command::DrawIndexed {
                index_count: renderable.number_of_indices,
                instance_count: 1,
                start_index: renderable.start_index,
                base_vertex: 0,
            }),
            None => commands.push(Command::Draw {
                vertex_count: 3,
                instance_count: 1,
                start_vertex: 0,
            }),
        }
        statistics.draw_calls += 1;
        Ok(())
    }
}

/// The pass buffers of a blueprint, rebuilt when the blueprint was reloaded.
fn pass_buffers_for<'a>(
    managers: &'a mut AHashMap<AssetId, PassBufferManager>,
    device: &RenderDevice,
    blueprint: &Arc<MaterialBlueprintResource>,
) -> Result<&'a mut PassBufferManager, CompositorError> {
    let manager = match managers.entry(blueprint.asset_id()) {
        Entry::Occupied(entry) => {
            let manager = entry.into_mut();
            if !Arc::ptr_eq(manager.blueprint(), blueprint) {
                *manager = PassBufferManager::new(device, Arc::clone(blueprint))?;
            }
            manager
        }
        Entry::Vacant(entry) => entry.insert(PassBufferManager::new(device, Arc::clone(blueprint))?),
    };
    Ok(manager)
}

/// The material buffers of a blueprint, rebuilt when the blueprint was reloaded.
fn material_buffers_for<'a>(
    managers: &'a mut AHashMap<AssetId, (Arc<MaterialBlueprintResource>, Option<MaterialBufferManager>)>,
    device: &RenderDevice,
    blueprint: &Arc<MaterialBlueprintResource>,
    slots_per_page: u32,
) -> Option<&'a mut MaterialBufferManager> {
    let create = || {
        (
            Arc::clone(blueprint),
            MaterialBufferManager::new(device, Arc::clone(blueprint), slots_per_page),
        )
    };
    let (_, manager) = match managers.entry(blueprint.asset_id()) {
        Entry::Occupied(entry) => {
            let current = entry.into_mut();
            if !Arc::ptr_eq(&current.0, blueprint) {
                *current = create();
            }
            current
        }
        Entry::Vacant(entry) => entry.insert(create()),
    };
    manager.as_mut()
}

impl std::fmt::Debug for CompositorWorkspaceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositorWorkspaceInstance")
            .field("node_asset_ids", &self.node_asset_ids)
            .field("output_size", &self.output_size)
            .field("acquired_framebuffers", &self.acquired.len())
            .finish()
    }
}
