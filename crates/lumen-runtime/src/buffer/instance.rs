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

//! Per-draw uniform and texture buffers.

use super::pass::pack_texture_buffer;
use super::resolver::PropertyResolver;
use crate::blueprint::{BlueprintBufferUsage, MaterialBlueprintResource};
use crate::error::PackingError;
use lumen_core::renderer::api::{
    BufferUsage, Command, CommandBuffer, DescriptorResource, TextureBufferId, TextureFormat,
    UniformBufferId,
};
use lumen_core::renderer::{GpuHandle, RenderDevice, ResourceError};

/// Fills the instance buffers of every draw.
///
/// Holds one uniform buffer of `min(requested size, device limit)` bytes and a
/// scratch buffer of the same size, both reused by every draw. Texture buffers
/// are created on first use, one per declaration index.
#[derive(Debug)]
pub struct InstanceBufferManager {
    device: RenderDevice,
    uniform_buffer: GpuHandle<UniformBufferId>,
    scratch: Vec<u8>,
    texture_buffer_size: u32,
    texture_buffers: Vec<GpuHandle<TextureBufferId>>,
    texture_scratch: Vec<u8>,
}

impl InstanceBufferManager {
    /// Creates the instance uniform buffer.
    pub fn new(
        device: &RenderDevice,
        uniform_buffer_size: u32,
        texture_buffer_size: u32,
    ) -> Result<Self, ResourceError> {
        let capabilities = device.capabilities();
        let size = uniform_buffer_size.min(capabilities.maximum_uniform_buffer_size);
        if size < uniform_buffer_size {
            log::info!(
                "Instance uniform buffer clamped from {} to {} bytes",
                uniform_buffer_size,
                size
            );
        }
        let uniform_buffer = device.create_uniform_buffer(size, BufferUsage::DynamicDraw)?;
        Ok(Self {
            device: device.clone(),
            uniform_buffer,
            scratch: vec![0; size as usize],
            texture_buffer_size: texture_buffer_size.min(capabilities.maximum_texture_buffer_size),
            texture_buffers: Vec::new(),
            texture_scratch: Vec::new(),
        })
    }

    /// Size of the uniform buffer in bytes.
    pub fn uniform_buffer_size(&self) -> u32 {
        self.scratch.len() as u32
    }

    fn texture_buffer(&mut self, index: usize) -> Result<&GpuHandle<TextureBufferId>, ResourceError> {
        while self.texture_buffers.len() <= index {
            let buffer = self.device.create_texture_buffer(
                self.texture_buffer_size,
                TextureFormat::R32G32B32A32F,
                BufferUsage::DynamicDraw,
            )?;
            self.texture_buffers.push(buffer);
        }
        Ok(&self.texture_buffers[index])
    }

    /// Packs the instance values of one draw and records their upload and binding.
    ///
    /// `resolver` must carry the instance source of the drawn object. Returns
    /// the packed element.
    pub fn fill_buffer(
        &mut self,
        blueprint: &MaterialBlueprintResource,
        resolver: &PropertyResolver<'_>,
        commands: &mut CommandBuffer,
    ) -> Result<&[u8], PackingError> {
        let mut packed = 0;
        if let Some(declaration) = blueprint.uniform_buffer(BlueprintBufferUsage::Instance) {
            let stride = declaration.layout.element_stride() as usize;
            declaration.layout.pack_element(resolver, &mut self.scratch)?;
            commands.push(Command::CopyUniformBufferData {
                buffer: self.uniform_buffer.id(),
                data: self.scratch[..stride].to_vec(),
            });
            commands.push(Command::SetGraphicsRootDescriptorTable {
                root_parameter_index: declaration.root_parameter_index,
                resource: DescriptorResource::UniformBuffer(self.uniform_buffer.id()),
            });
            packed = stride;
        }

        let declarations = blueprint
            .texture_buffers()
            .iter()
            .filter(|declaration| declaration.usage == BlueprintBufferUsage::Instance);
        for (index, declaration) in declarations.enumerate() {
            let size = pack_texture_buffer(declaration, resolver, &mut self.texture_scratch)?;
            if size > self.texture_buffer_size as usize {
                return Err(PackingError::Overflow {
                    required: size as u32,
                    capacity: self.texture_buffer_size,
                });
            }
            let data = self.texture_scratch[..size].to_vec();
            let buffer = match self.texture_buffer(index) {
                Ok(buffer) => buffer.id(),
                Err(error) => {
                    log::error!(
                        "Cannot create instance texture buffer {} of blueprint {}: {}",
                        index,
                        blueprint.asset_id(),
                        error
                    );
                    continue;
                }
            };
            commands.push(Command::CopyTextureBufferData { buffer, data });
            commands.push(Command::SetGraphicsRootDescriptorTable {
                root_parameter_index: declaration.root_parameter_index,
                resource: DescriptorResource::TextureBuffer(buffer),
            });
        }
        Ok(&self.scratch[..packed])
    }
}
