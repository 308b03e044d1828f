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

//! The capability-set interface every backend variant implements.

use crate::renderer::api::{
    BufferUsage, Capabilities, CommandBuffer, FramebufferDescriptor, FramebufferId, GpuObject,
    GraphicsBackendType, PipelineStateDescriptor, PipelineStateId, ProgramId, RootSignatureDescriptor,
    RootSignatureId, SamplerState, SamplerStateId, ShaderId, ShaderLanguage, ShaderSource,
    ShaderType, TextureBufferId, TextureDescriptor, TextureFormat, TextureId, UniformBufferId,
    VertexAttributes,
};
use crate::renderer::error::{RenderError, ResourceError};

/// The abstract surface of a graphics API translation layer.
///
/// One implementation exists per graphics API. A backend is selected once at
/// startup and used through an `Arc<dyn RenderBackend>`; creation methods may be
/// called from several threads at once, so implementations synchronize internally.
///
/// Objects are released explicitly through [`RenderBackend::release`]. Higher
/// layers never call it directly: they hold
/// [`GpuResource`](crate::renderer::GpuResource) handles that release on drop.
pub trait RenderBackend: Send + Sync {
    /// The graphics API this backend translates to.
    fn backend_type(&self) -> GraphicsBackendType;

    /// The capabilities of the device. Called once by [`RenderDevice`](crate::renderer::RenderDevice).
    fn capabilities(&self) -> Capabilities;

    /// The shading language shader blueprints must be written in.
    fn shader_language(&self) -> ShaderLanguage {
        ShaderLanguage::for_backend(self.backend_type())
    }

    /// Compiles a shader from source.
    fn create_shader(&self, source: &ShaderSource<'_>) -> Result<ShaderId, ResourceError>;

    /// Recreates a shader from bytecode previously returned by [`RenderBackend::shader_bytecode`].
    fn create_shader_from_bytecode(
        &self,
        shader_type: ShaderType,
        bytecode: &[u8],
    ) -> Result<ShaderId, ResourceError>;

    /// Exports the bytecode of a compiled shader, if the backend supports it.
    fn shader_bytecode(&self, shader: ShaderId) -> Option<Vec<u8>>;

    /// Links shaders into a program.
    fn create_program(
        &self,
        root_signature: RootSignatureId,
        vertex_attributes: &VertexAttributes,
        shaders: &[ShaderId],
    ) -> Result<ProgramId, ResourceError>;

    /// Creates a root signature.
    fn create_root_signature(
        &self,
        descriptor: &RootSignatureDescriptor,
    ) -> Result<RootSignatureId, ResourceError>;

    /// Creates a pipeline state object.
    fn create_pipeline_state(
        &self,
        descriptor: &PipelineStateDescriptor,
    ) -> Result<PipelineStateId, ResourceError>;

    /// Creates a uniform buffer of `size` bytes.
    fn create_uniform_buffer(
        &self,
        size: u32,
        usage: BufferUsage,
    ) -> Result<UniformBufferId, ResourceError>;

    /// Creates a texture buffer of `size` bytes whose elements have `format`.
    fn create_texture_buffer(
        &self,
        size: u32,
        format: TextureFormat,
        usage: BufferUsage,
    ) -> Result<TextureBufferId, ResourceError>;

    /// Creates a 2D texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Creates a sampler state object.
    fn create_sampler_state(&self, state: &SamplerState) -> Result<SamplerStateId, ResourceError>;

    /// Creates a framebuffer.
    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, ResourceError>;

    /// Executes recorded commands.
    fn submit(&self, commands: &CommandBuffer) -> Result<(), RenderError>;

    /// Destroys an object. Releasing an unknown object is logged and ignored.
    fn release(&self, object: GpuObject);
}
