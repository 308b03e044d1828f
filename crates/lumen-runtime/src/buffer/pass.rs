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

//! Pass uniform and texture buffers.

use super::layout::PACKAGE_SIZE;
use super::resolver::PropertyResolver;
use crate::blueprint::{BlueprintBufferUsage, MaterialBlueprintResource, TextureBufferDeclaration};
use crate::error::PackingError;
use lumen_core::renderer::api::{
    BufferUsage, Command, CommandBuffer, DescriptorResource, TextureBufferId, TextureFormat,
    UniformBufferId,
};
use lumen_core::renderer::{GpuHandle, RenderDevice, ResourceError};
use std::sync::Arc;

/// Resolves the property of a texture buffer into `scratch`, padded to a
/// whole package. Returns the number of bytes written.
pub(super) fn pack_texture_buffer(
    declaration: &TextureBufferDeclaration,
    resolver: &PropertyResolver<'_>,
    scratch: &mut Vec<u8>,
) -> Result<usize, PackingError> {
    let value = resolver.resolve(&declaration.property)?;
    let size = value.value_type().byte_size().div_ceil(PACKAGE_SIZE) * PACKAGE_SIZE;
    scratch.clear();
    scratch.resize(size as usize, 0);
    value.write_bytes(scratch);
    Ok(size as usize)
}

/// Creates the texture buffers of `usage` declared by a blueprint.
pub(super) fn create_texture_buffers(
    device: &RenderDevice,
    blueprint: &MaterialBlueprintResource,
    usage: BlueprintBufferUsage,
    size: u32,
) -> Result<Vec<(TextureBufferDeclaration, GpuHandle<TextureBufferId>)>, ResourceError> {
    let declarations: Vec<_> = blueprint
        .texture_buffers()
        .iter()
        .filter(|declaration| declaration.usage == usage)
        .collect();
    if declarations.is_empty() {
        return Ok(Vec::new());
    }
    let limit = device.capabilities().maximum_texture_buffer_size;
    if limit == 0 {
        log::warn!(
            "Blueprint {} declares {:?} texture buffers the device does not support",
            blueprint.asset_id(),
            usage
        );
        return Ok(Vec::new());
    }
    declarations
        .into_iter()
        .map(|declaration| {
            let buffer = device.create_texture_buffer(
                size.min(limit),
                TextureFormat::R32G32B32A32F,
                BufferUsage::DynamicDraw,
            )?;
            Ok((declaration.clone(), buffer))
        })
        .collect()
}

/// Fills the pass uniform buffer and pass texture buffers of one blueprint.
///
/// Filled once per pass by the owning compositor pass. The scratch buffer is
/// reused by every fill: the bytes returned by [`fill_buffer`] are only valid
/// until the next call.
///
/// [`fill_buffer`]: PassBufferManager::fill_buffer
#[derive(Debug)]
pub struct PassBufferManager {
    blueprint: Arc<MaterialBlueprintResource>,
    uniform_buffer: Option<(u32, GpuHandle<UniformBufferId>)>,
    texture_buffers: Vec<(TextureBufferDeclaration, GpuHandle<TextureBufferId>)>,
    scratch: Vec<u8>,
    texture_scratch: Vec<u8>,
}

impl PassBufferManager {
    /// Creates the GPU buffers of the pass declarations of `blueprint`.
    pub fn new(device: &RenderDevice, blueprint: Arc<MaterialBlueprintResource>) -> Result<Self, ResourceError> {
        let uniform_buffer = match blueprint.uniform_buffer(BlueprintBufferUsage::Pass) {
            Some(declaration) => Some((
                declaration.root_parameter_index,
                device.create_uniform_buffer(declaration.layout.size(), BufferUsage::DynamicDraw)?,
            )),
            None => None,
        };
        let texture_buffers = create_texture_buffers(
            device,
            &blueprint,
            BlueprintBufferUsage::Pass,
            device.capabilities().maximum_texture_buffer_size,
        )?;
        let size = uniform_buffer
            .as_ref()
            .and_then(|_| blueprint.uniform_buffer(BlueprintBufferUsage::Pass))
            .map_or(0, |declaration| declaration.layout.size());
        Ok(Self {
            blueprint,
            uniform_buffer,
            texture_buffers,
            scratch: vec![0; size as usize],
            texture_scratch: Vec::new(),
        })
    }

    /// The blueprint served.
    pub fn blueprint(&self) -> &Arc<MaterialBlueprintResource> {
        &self.blueprint
    }

    /// Returns `true` if the blueprint declares nothing to fill per pass.
    pub fn is_empty(&self) -> bool {
        self.uniform_buffer.is_none() && self.texture_buffers.is_empty()
    }

    /// Packs the pass values and records their upload.
    ///
    /// `resolver` must carry the pass listener. Returns the packed uniform
    /// bytes.
    pub fn fill_buffer(
        &mut self,
        resolver: &PropertyResolver<'_>,
        commands: &mut CommandBuffer,
    ) -> Result<&[u8], PackingError> {
        if let (Some((_, buffer)), Some(declaration)) = (
            &self.uniform_buffer,
            self.blueprint.uniform_buffer(BlueprintBufferUsage::Pass),
        ) {
            declaration.layout.pack(resolver, &mut self.scratch)?;
            commands.push(Command::CopyUniformBufferData {
                buffer: buffer.id(),
                data: self.scratch.clone(),
            });
        }
        for (declaration, buffer) in &self.texture_buffers {
            let size = pack_texture_buffer(declaration, resolver, &mut self.texture_scratch)?;
            commands.push(Command::CopyTextureBufferData {
                buffer: buffer.id(),
                data: self.texture_scratch[..size].to_vec(),
            });
        }
        Ok(&self.scratch)
    }

    /// Records the binding of the pass buffers.
    pub fn bind(&self, commands: &mut CommandBuffer) {
        if let Some((root_parameter_index, buffer)) = &self.uniform_buffer {
            commands.push(Command::SetGraphicsRootDescriptorTable {
                root_parameter_index: *root_parameter_index,
                resource: DescriptorResource::UniformBuffer(buffer.id()),
            });
        }
        for (declaration, buffer) in &self.texture_buffers {
            commands.push(Command::SetGraphicsRootDescriptorTable {
                root_parameter_index: declaration.root_parameter_index,
                resource: DescriptorResource::TextureBuffer(buffer.id()),
            });
        }
    }
}
