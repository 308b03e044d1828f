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

//! Shared-ownership GPU handles and the device facade.

use super::api::{
    BufferUsage, Capabilities, CommandBuffer, FramebufferDescriptor, FramebufferId,
    GpuResourceId, GraphicsBackendType, PipelineStateDescriptor, PipelineStateId, ProgramId,
    RootSignatureDescriptor, RootSignatureId, SamplerState, SamplerStateId, ShaderId,
    ShaderLanguage, ShaderSource, ShaderType, TextureBufferId, TextureDescriptor, TextureFormat,
    TextureId, UniformBufferId, VertexAttributes,
};
use super::error::{RenderError, ResourceError, ShaderError};
use super::traits::RenderBackend;
use std::fmt;
use std::sync::Arc;

/// A backend object released when the last owner drops it.
///
/// Handles are created by [`RenderDevice`] only and shared as `Arc<GpuResource<I>>`.
pub struct GpuResource<I: GpuResourceId> {
    id: I,
    backend: Arc<dyn RenderBackend>,
}

impl<I: GpuResourceId> GpuResource<I> {
    /// The backend id. Valid for as long as `self` is alive.
    pub fn id(&self) -> I {
        self.id
    }
}

impl<I: GpuResourceId> Drop for GpuResource<I> {
    fn drop(&mut self) {
        log::trace!("Releasing GPU object {:?}", self.id);
        self.backend.release(self.id.into_object());
    }
}

impl<I: GpuResourceId> fmt::Debug for GpuResource<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GpuResource").field(&self.id).finish()
    }
}

/// A shared GPU handle.
pub type GpuHandle<I> = Arc<GpuResource<I>>;

/// Front door to the selected backend.
///
/// Capabilities are queried once at construction and never again, so
/// capability-gated decisions stay stable for the lifetime of the device.
#[derive(Clone)]
pub struct RenderDevice {
    backend: Arc<dyn RenderBackend>,
    capabilities: Arc<Capabilities>,
}

impl RenderDevice {
    /// Wraps a backend and caches its capabilities.
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        let capabilities = Arc::new(backend.capabilities());
        log::info!(
            "Render device created: backend {} on '{}'",
            backend.backend_type(),
            capabilities.adapter.name
        );
        Self {
            backend,
            capabilities,
        }
    }

    fn wrap<I: GpuResourceId>(&self, id: I) -> GpuHandle<I> {
        Arc::new(GpuResource {
            id,
            backend: self.backend.clone(),
        })
    }

    /// The backend type.
    pub fn backend_type(&self) -> GraphicsBackendType {
        self.backend.backend_type()
    }

    /// The shading language of the backend.
    pub fn shader_language(&self) -> ShaderLanguage {
        self.backend.shader_language()
    }

    /// The capabilities queried at construction.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The raw backend.
    pub fn backend(&self) -> &Arc<dyn RenderBackend> {
        &self.backend
    }

    /// Compiles a shader.
    pub fn create_shader(&self, source: &ShaderSource<'_>) -> Result<GpuHandle<ShaderId>, ResourceError> {
        self.backend.create_shader(source).map(|id| self.wrap(id))
    }

    /// Recreates a shader from exported bytecode.
    pub fn create_shader_from_bytecode(
        &self,
        shader_type: ShaderType,
        bytecode: &[u8],
    ) -> Result<GpuHandle<ShaderId>, ResourceError> {
        if !self.capabilities.shader_bytecode {
            return Err(ShaderError::BytecodeUnsupported.into());
        }
        self.backend
            .create_shader_from_bytecode(shader_type, bytecode)
            .map(|id| self.wrap(id))
    }

    /// Exports shader bytecode when the backend supports it.
    pub fn shader_bytecode(&self, shader: &GpuResource<ShaderId>) -> Option<Vec<u8>> {
        if !self.capabilities.shader_bytecode {
            return None;
        }
        self.backend.shader_bytecode(shader.id())
    }

    /// Links shaders into a program.
    pub fn create_program(
        &self,
        root_signature: &GpuResource<RootSignatureId>,
        vertex_attributes: &VertexAttributes,
        shaders: &[GpuHandle<ShaderId>],
    ) -> Result<GpuHandle<ProgramId>, ResourceError> {
        let ids: Vec<ShaderId> = shaders.iter().map(|shader| shader.id()).collect();
        self.backend
            .create_program(root_signature.id(), vertex_attributes, &ids)
            .map(|id| self.wrap(id))
    }

    /// Creates a root signature.
    pub fn create_root_signature(
        &self,
        descriptor: &RootSignatureDescriptor,
    ) -> Result<GpuHandle<RootSignatureId>, ResourceError> {
        self.backend
            .create_root_signature(descriptor)
            .map(|id| self.wrap(id))
    }

    /// Creates a pipeline state object.
    pub fn create_pipeline_state(
        &self,
        descriptor: &PipelineStateDescriptor,
    ) -> Result<GpuHandle<PipelineStateId>, ResourceError> {
        self.backend
            .create_pipeline_state(descriptor)
            .map(|id| self.wrap(id))
    }

    /// Creates a uniform buffer, checking the size against the device limit.
    pub fn create_uniform_buffer(
        &self,
        size: u32,
        usage: BufferUsage,
    ) -> Result<GpuHandle<UniformBufferId>, ResourceError> {
        let limit = self.capabilities.maximum_uniform_buffer_size;
        if size > limit {
            return Err(ResourceError::SizeExceedsLimit {
                requested: size,
                limit,
            });
        }
        self.backend
            .create_uniform_buffer(size, usage)
            .map(|id| self.wrap(id))
    }

    /// Creates a texture buffer, checking the size against the device limit.
    pub fn create_texture_buffer(
        &self,
        size: u32,
        format: TextureFormat,
        usage: BufferUsage,
    ) -> Result<GpuHandle<TextureBufferId>, ResourceError> {
        let limit = self.capabilities.maximum_texture_buffer_size;
        if size > limit {
            return Err(ResourceError::SizeExceedsLimit {
                requested: size,
                limit,
            });
        }
        self.backend
            .create_texture_buffer(size, format, usage)
            .map(|id| self.wrap(id))
    }

    /// Creates a 2D texture.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Result<GpuHandle<TextureId>, ResourceError> {
        let limit = self.capabilities.maximum_texture_dimension;
        let largest = descriptor.width.max(descriptor.height);
        if largest > limit {
            return Err(ResourceError::SizeExceedsLimit {
                requested: largest,
                limit,
            });
        }
        self.backend.create_texture(descriptor).map(|id| self.wrap(id))
    }

    /// Creates a sampler state object.
    pub fn create_sampler_state(
        &self,
        state: &SamplerState,
    ) -> Result<GpuHandle<SamplerStateId>, ResourceError> {
        self.backend
            .create_sampler_state(state)
            .map(|id| self.wrap(id))
    }

    /// Creates a framebuffer.
    pub fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<GpuHandle<FramebufferId>, ResourceError> {
        self.backend
            .create_framebuffer(descriptor)
            .map(|id| self.wrap(id))
    }

    /// Submits recorded commands.
    pub fn submit(&self, commands: &CommandBuffer) -> Result<(), RenderError> {
        self.backend.submit(commands)
    }
}

impl fmt::Debug for RenderDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderDevice")
            .field("backend_type", &self.backend.backend_type())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::GpuObject;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        next: AtomicU64,
        released: Mutex<Vec<GpuObject>>,
    }

    impl RecordingBackend {
        fn next_id(&self) -> u64 {
            self.next.fetch_add(1, Ordering::Relaxed) + 1
        }
    }

    impl RenderBackend for RecordingBackend {
        fn backend_type(&self) -> GraphicsBackendType {
            GraphicsBackendType::Headless
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities {
                maximum_uniform_buffer_size: 256,
                shader_bytecode: false,
                ..Default::default()
            }
        }
        fn create_shader(&self, _: &ShaderSource<'_>) -> Result<ShaderId, ResourceError> {
            Ok(ShaderId(self.next_id()))
        }
        fn create_shader_from_bytecode(&self, _: ShaderType, _: &[u8]) -> Result<ShaderId, ResourceError> {
            Ok(ShaderId(self.next_id()))
        }
        fn shader_bytecode(&self, _: ShaderId) -> Option<Vec<u8>> {
            Some(Vec::new())
        }
        fn create_program(
            &self,
            _: RootSignatureId,
            _: &VertexAttributes,
            _: &[ShaderId],
        ) -> Result<ProgramId, ResourceError> {
            Ok(ProgramId(self.next_id()))
        }
        fn create_root_signature(
            &self,
            _: &RootSignatureDescriptor,
        ) -> Result<RootSignatureId, ResourceError> {
            Ok(RootSignatureId(self.next_id()))
        }
        fn create_pipeline_state(
            &self,
            _: &PipelineStateDescriptor,
        ) -> Result<PipelineStateId, ResourceError> {
            Ok(PipelineStateId(self.next_id()))
        }
        fn create_uniform_buffer(&self, _: u32, _: BufferUsage) -> Result<UniformBufferId, ResourceError> {
            Ok(UniformBufferId(self.next_id()))
        }
        fn create_texture_buffer(
            &self,
            _: u32,
            _: TextureFormat,
            _: BufferUsage,
        ) -> Result<TextureBufferId, ResourceError> {
            Ok(TextureBufferId(self.next_id()))
        }
        fn create_texture(&self, _: &TextureDescriptor) -> Result<TextureId, ResourceError> {
            Ok(TextureId(self.next_id()))
        }
        fn create_sampler_state(&self, _: &SamplerState) -> Result<SamplerStateId, ResourceError> {
            Ok(SamplerStateId(self.next_id()))
        }
        fn create_framebuffer(&self, _: &FramebufferDescriptor) -> Result<FramebufferId, ResourceError> {
            Ok(FramebufferId(self.next_id()))
        }
        fn submit(&self, _: &CommandBuffer) -> Result<(), RenderError> {
            Ok(())
        }
        fn release(&self, object: GpuObject) {
            self.released.lock().unwrap().push(object);
        }
    }

    #[test]
    fn last_owner_releases_the_object() {
        let backend = Arc::new(RecordingBackend::default());
        let device = RenderDevice::new(backend.clone());
        let buffer = device.create_uniform_buffer(64, BufferUsage::DynamicDraw).unwrap();
        let shared = buffer.clone();
        drop(buffer);
        assert!(backend.released.lock().unwrap().is_empty());
        let id = shared.id();
        drop(shared);
        assert_eq!(
            backend.released.lock().unwrap().as_slice(),
            &[GpuObject::UniformBuffer(id)]
        );
    }

    #[test]
    fn capability_limits_are_enforced() {
        let device = RenderDevice::new(Arc::new(RecordingBackend::default()));
        assert!(matches!(
            device.create_uniform_buffer(512, BufferUsage::DynamicDraw),
            Err(ResourceError::SizeExceedsLimit { requested: 512, limit: 256 })
        ));
        let shader = device
            .create_shader(&ShaderSource {
                label: "test",
                shader_type: ShaderType::Vertex,
                source_code: "",
            })
            .unwrap();
        assert!(device.shader_bytecode(&shader).is_none());
    }
}
