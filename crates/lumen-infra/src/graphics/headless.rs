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

//! A backend that implements the whole renderer API without a GPU.
//!
//! Objects are plain ids in a registry. Shaders keep their source bytes,
//! which double as their bytecode, and submitted command buffers are
//! validated against the live objects. Every creation is counted, which makes
//! the backend the test double of the runtime.

use ahash::{AHashMap, AHashSet};
use lumen_core::renderer::api::{
    BufferUsage, Capabilities, Command, CommandBuffer, DescriptorResource, FramebufferDescriptor,
    FramebufferId, GpuObject, GpuResourceId, GraphicsBackendType, PipelineStateDescriptor,
    PipelineStateId, ProgramId, RootSignatureDescriptor, RootSignatureId, SamplerState,
    SamplerStateId, ShaderId, ShaderSource, ShaderType, TextureBufferId, TextureDescriptor,
    TextureFormat, TextureId, UniformBufferId, VertexAttributes,
};
use lumen_core::renderer::{RenderBackend, RenderError, ResourceError, ShaderError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Settings of a [`HeadlessRenderBackend`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackendConfig {
    /// Reported capabilities. Size limits are enforced by the device.
    pub capabilities: Capabilities,
    /// Shaders whose source contains this text fail to compile.
    pub reject_shader_marker: Option<String>,
    /// Time spent creating each pipeline state, to widen race windows.
    pub pipeline_state_creation_delay: Duration,
}

/// Objects created so far, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStatistics {
    /// Shaders compiled from source.
    pub shaders: u64,
    /// Shaders recreated from bytecode.
    pub shaders_from_bytecode: u64,
    /// Shader compilations rejected.
    pub rejected_shaders: u64,
    /// Programs linked.
    pub programs: u64,
    /// Root signatures.
    pub root_signatures: u64,
    /// Pipeline states.
    pub pipeline_states: u64,
    /// Uniform buffers.
    pub uniform_buffers: u64,
    /// Texture buffers.
    pub texture_buffers: u64,
    /// Textures.
    pub textures: u64,
    /// Sampler states.
    pub sampler_states: u64,
    /// Framebuffers.
    pub framebuffers: u64,
    /// Command buffers submitted.
    pub submissions: u64,
    /// Draw calls submitted.
    pub draw_calls: u64,
    /// Objects released.
    pub released: u64,
}

#[derive(Debug)]
enum ObjectData {
    Shader { shader_type: ShaderType, source: Vec<u8> },
    UniformBuffer { size: u32 },
    TextureBuffer { size: u32 },
    Other,
}

#[derive(Debug, Default)]
struct Registry {
    objects: AHashMap<GpuObject, ObjectData>,
    statistics: HeadlessStatistics,
    last_submission: CommandBuffer,
}

/// The headless backend.
#[derive(Debug)]
pub struct HeadlessRenderBackend {
    config: HeadlessBackendConfig,
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl HeadlessRenderBackend {
    /// A backend with default capabilities.
    pub fn new() -> Self {
        Self::with_config(HeadlessBackendConfig::default())
    }

    /// A backend with the given settings.
    pub fn with_config(mut config: HeadlessBackendConfig) -> Self {
        if config.capabilities.adapter.name.is_empty() {
            config.capabilities.adapter.name = "Lumen headless adapter".to_string();
        }
        Self {
            config,
            next_id: AtomicU64::new(1),
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Creation counters.
    pub fn statistics(&self) -> HeadlessStatistics {
        self.registry().statistics
    }

    /// Number of objects created and not yet released.
    pub fn live_objects(&self) -> usize {
        self.registry().objects.len()
    }

    /// The most recently submitted command buffer.
    pub fn last_submission(&self) -> CommandBuffer {
        self.registry().last_submission.clone()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register<I: GpuResourceId>(
        &self,
        make_id: impl FnOnce(u64) -> I,
        data: ObjectData,
        count: impl FnOnce(&mut HeadlessStatistics),
    ) -> I {
        let id = make_id(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut registry = self.registry();
        registry.objects.insert(id.into_object(), data);
        count(&mut registry.statistics);
        id
    }

    fn require<I: GpuResourceId>(registry: &Registry, id: I) -> Result<(), ResourceError> {
        if registry.objects.contains_key(&id.into_object()) {
            Ok(())
        } else {
            Err(ResourceError::InvalidHandle)
        }
    }

    fn validate(registry: &Registry, commands: &CommandBuffer) -> Result<(), RenderError> {
        let live = |object: GpuObject| registry.objects.contains_key(&object);
        let mut open_debug_events = 0usize;
        for (index, command) in commands.commands().iter().enumerate() {
            let valid = match command {
                Command::SetGraphicsRootSignature(id) => live(id.into_object()),
                Command::SetPipelineState(id) => live(id.into_object()),
                Command::SetGraphicsRootDescriptorTable { resource, .. } => live(match *resource {
                    DescriptorResource::UniformBuffer(id) => id.into_object(),
                    DescriptorResource::TextureBuffer(id) => id.into_object(),
                    DescriptorResource::Texture(id) => id.into_object(),
                    DescriptorResource::SamplerState(id) => id.into_object(),
                }),
                Command::SetFramebuffer(framebuffer) => framebuffer.map_or(true, |id| live(id.into_object())),
                Command::CopyUniformBufferData { buffer, data } => matches!(
                    registry.objects.get(&buffer.into_object()),
                    Some(ObjectData::UniformBuffer { size }) if data.len() <= *size as usize
                ),
                Command::CopyTextureBufferData { buffer, data } => matches!(
                    registry.objects.get(&buffer.into_object()),
                    Some(ObjectData::TextureBuffer { size }) if data.len() <= *size as usize
                ),
                Command::CopyResource { destination, source } => {
                    live(destination.into_object()) && live(source.into_object())
                }
                Command::BeginDebugEvent(_) => {
                    open_debug_events += 1;
                    true
                }
                Command::EndDebugEvent => match open_debug_events.checked_sub(1) {
                    Some(remaining) => {
                        open_debug_events = remaining;
                        true
                    }
                    None => false,
                },
                Command::SetViewport(_)
                | Command::Clear { .. }
                | Command::Draw { .. }
                | Command::DrawIndexed { .. } => true,
            };
            if !valid {
                return Err(RenderError::SubmissionFailed(format!(
                    "command {index} is invalid: {command:?}"
                )));
            }
        }
        if open_debug_events != 0 {
            return Err(RenderError::SubmissionFailed(format!(
                "{open_debug_events} debug events left open"
            )));
        }
        Ok(())
    }
}

impl Default for HeadlessRenderBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for HeadlessRenderBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Headless
    }

    fn capabilities(&self) -> Capabilities {
        self.config.capabilities.clone()
    }

    fn create_shader(&self, source: &ShaderSource<'_>) -> Result<ShaderId, ResourceError> {
        if let Some(marker) = &self.config.reject_shader_marker {
            if source.source_code.contains(marker.as_str()) {
                self.registry().statistics.rejected_shaders += 1;
                log::debug!("Headless backend rejects shader '{}'", source.label);
                return Err(ResourceError::Shader(ShaderError::CompilationError {
                    label: source.label.to_string(),
                    shader_type: source.shader_type,
                    details: format!("source contains the rejected marker '{marker}'"),
                }));
            }
        }
        Ok(self.register(
            ShaderId,
            ObjectData::Shader {
                shader_type: source.shader_type,
                source: source.source_code.as_bytes().to_vec(),
            },
            |statistics| statistics.shaders += 1,
        ))
    }

    fn create_shader_from_bytecode(
        &self,
        shader_type: ShaderType,
        bytecode: &[u8],
    ) -> Result<ShaderId, ResourceError> {
        if std::str::from_utf8(bytecode).is_err() {
            return Err(ResourceError::Shader(ShaderError::InvalidBytecode(
                "headless bytecode is UTF-8 source".to_string(),
            )));
        }
        Ok(self.register(
            ShaderId,
            ObjectData::Shader {
                shader_type,
                source: bytecode.to_vec(),
            },
            |statistics| statistics.shaders_from_bytecode += 1,
        ))
    }

    fn shader_bytecode(&self, shader: ShaderId) -> Option<Vec<u8>> {
        match self.registry().objects.get(&shader.into_object()) {
            Some(ObjectData::Shader { source, .. }) => Some(source.clone()),
            _ => None,
        }
    }

    fn create_program(
        &self,
        root_signature: RootSignatureId,
        _vertex_attributes: &VertexAttributes,
        shaders: &[ShaderId],
    ) -> Result<ProgramId, ResourceError> {
        {
            let registry = self.registry();
            Self::require(&registry, root_signature)?;
            let mut stages = Vec::with_capacity(shaders.len());
            for shader in shaders {
                match registry.objects.get(&shader.into_object()) {
                    Some(ObjectData::Shader { shader_type, .. }) => {
                        if stages.contains(shader_type) {
                            return Err(ResourceError::Shader(ShaderError::LinkError(format!(
                                "two {shader_type:?} shaders"
                            ))));
                        }
                        stages.push(*shader_type);
                    }
                    _ => return Err(ResourceError::InvalidHandle),
                }
            }
        }
        Ok(self.register(ProgramId, ObjectData::Other, |statistics| {
            statistics.programs += 1
        }))
    }

    fn create_root_signature(
        &self,
        _descriptor: &RootSignatureDescriptor,
    ) -> Result<RootSignatureId, ResourceError> {
        Ok(self.register(RootSignatureId, ObjectData::Other, |statistics| {
            statistics.root_signatures += 1
        }))
    }

    fn create_pipeline_state(
        &self,
        descriptor: &PipelineStateDescriptor,
    ) -> Result<PipelineStateId, ResourceError> {
        {
            let registry = self.registry();
            Self::require(&registry, descriptor.root_signature)?;
            Self::require(&registry, descriptor.program)?;
        }
        if !self.config.pipeline_state_creation_delay.is_zero() {
            std::thread::sleep(self.config.pipeline_state_creation_delay);
        }
        Ok(self.register(PipelineStateId, ObjectData::Other, |statistics| {
            statistics.pipeline_states += 1
        }))
    }

    fn create_uniform_buffer(
        &self,
        size: u32,
        _usage: BufferUsage,
    ) -> Result<UniformBufferId, ResourceError> {
        Ok(self.register(
            UniformBufferId,
            ObjectData::UniformBuffer { size },
            |statistics| statistics.uniform_buffers += 1,
        ))
    }

    fn create_texture_buffer(
        &self,
        size: u32,
        _format: TextureFormat,
        _usage: BufferUsage,
    ) -> Result<TextureBufferId, ResourceError> {
        Ok(self.register(
            TextureBufferId,
            ObjectData::TextureBuffer { size },
            |statistics| statistics.texture_buffers += 1,
        ))
    }

    fn create_texture(&self, _descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        Ok(self.register(TextureId, ObjectData::Other, |statistics| {
            statistics.textures += 1
        }))
    }

    fn create_sampler_state(&self, _state: &SamplerState) -> Result<SamplerStateId, ResourceError> {
        Ok(self.register(SamplerStateId, ObjectData::Other, |statistics| {
            statistics.sampler_states += 1
        }))
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, ResourceError> {
        {
            let registry = self.registry();
            for attachment in descriptor
                .color_attachments
                .iter()
                .chain(descriptor.depth_stencil_attachment.iter())
            {
                Self::require(&registry, attachment.texture)?;
            }
        }
        Ok(self.register(FramebufferId, ObjectData::Other, |statistics| {
            statistics.framebuffers += 1
        }))
    }

    fn submit(&self, commands: &CommandBuffer) -> Result<(), RenderError> {
        let mut registry = self.registry();
        Self::validate(&registry, commands)?;
        registry.statistics.submissions += 1;
        registry.statistics.draw_calls += commands.number_of_draw_calls() as u64;
        registry.last_submission = commands.clone();
        Ok(())
    }

    fn release(&self, object: GpuObject) {
        let mut registry = self.registry();
        if registry.objects.remove(&object).is_some() {
            registry.statistics.released += 1;
        } else {
            log::warn!("Headless backend: releasing unknown object {:?}", object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::api::ClearFlags;

    #[test]
    fn submissions_referencing_released_objects_fail() {
        let backend = HeadlessRenderBackend::new();
        let buffer = backend
            .create_uniform_buffer(16, BufferUsage::DynamicDraw)
            .unwrap();

        let mut commands = CommandBuffer::new();
        commands.push(Command::CopyUniformBufferData {
            buffer,
            data: vec![0; 16],
        });
        commands.push(Command::Clear {
            flags: ClearFlags::COLOR,
            color: [0.0; 4],
            z: 1.0,
            stencil: 0,
        });
        backend.submit(&commands).unwrap();

        backend.release(buffer.into_object());
        assert!(matches!(
            backend.submit(&commands),
            Err(RenderError::SubmissionFailed(_))
        ));
        assert_eq!(backend.statistics().submissions, 1);
    }

    #[test]
    fn oversized_uploads_are_rejected() {
        let backend = HeadlessRenderBackend::new();
        let buffer = backend
            .create_uniform_buffer(16, BufferUsage::DynamicDraw)
            .unwrap();
        let mut commands = CommandBuffer::new();
        commands.push(Command::CopyUniformBufferData {
            buffer,
            data: vec![0; 32],
        });
        assert!(backend.submit(&commands).is_err());
    }

    #[test]
    fn unbalanced_debug_events_are_rejected() {
        let backend = HeadlessRenderBackend::new();
        let mut commands = CommandBuffer::new();
        commands.push(Command::BeginDebugEvent("Scene".to_string()));
        assert!(backend.submit(&commands).is_err());
        commands.push(Command::EndDebugEvent);
        assert!(backend.submit(&commands).is_ok());
    }
}
