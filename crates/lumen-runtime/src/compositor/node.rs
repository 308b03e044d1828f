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

//! Compositor node resources.

use crate::error::CompositorError;
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::format::{
    decode_enum, CompositorNodeFile, CompositorPassRecord, FramebufferRecord,
    RenderTargetTextureRecord, MAX_FRAMEBUFFER_COLOR_TEXTURES,
};
use lumen_core::renderer::api::{ClearFlags, TextureFormat};
use lumen_core::MaterialTechniqueId;
use std::sync::Arc;

/// A render target texture declared by a node.
///
/// A zero width or height follows the output size of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetTextureDeclaration {
    /// The texture asset.
    pub asset_id: AssetId,
    /// Width in texels, zero for the output width.
    pub width: u32,
    /// Height in texels, zero for the output height.
    pub height: u32,
    /// Texel format.
    pub texture_format: TextureFormat,
    /// Whether the texture may be multisampled.
    pub allow_multisample: bool,
}

impl RenderTargetTextureDeclaration {
    fn from_record(record: &RenderTargetTextureRecord) -> Result<Self, CompositorError> {
        Ok(Self {
            asset_id: AssetId::from_raw(record.asset_id),
            width: record.width,
            height: record.height,
            texture_format: decode_enum("texture_format", record.texture_format)?,
            allow_multisample: record.allow_multisample != 0,
        })
    }

    /// Size of the texture for a given output size.
    pub fn resolved_size(&self, output_size: [u32; 2]) -> [u32; 2] {
        [
            if self.width == 0 { output_size[0] } else { self.width },
            if self.height == 0 { output_size[1] } else { self.height },
        ]
    }
}

/// A framebuffer declared by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferDeclaration {
    /// The framebuffer asset.
    pub asset_id: AssetId,
    /// Color render target textures in order.
    pub color_textures: Vec<AssetId>,
    /// Depth-stencil render target texture.
    pub depth_stencil_texture: Option<AssetId>,
}

/// One pass of a compositor target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompositorPass {
    /// Clears the target.
    Clear {
        /// Attachments cleared.
        flags: ClearFlags,
        /// RGBA color.
        color: [f32; 4],
        /// Depth value.
        z: f32,
        /// Stencil value.
        stencil: u32,
    },
    /// Draws the render queue with a technique.
    Scene {
        /// Technique drawn.
        material_technique_id: MaterialTechniqueId,
        /// Smallest render queue index drawn.
        minimum_render_queue_index: u32,
        /// Largest render queue index drawn.
        maximum_render_queue_index: u32,
    },
    /// Draws a full-screen triangle with a material.
    Quad {
        /// The material drawn.
        material_asset_id: AssetId,
        /// Technique drawn.
        material_technique_id: MaterialTechniqueId,
    },
    /// Copies one render target texture into another.
    Copy {
        /// Destination texture.
        destination_texture_asset_id: AssetId,
        /// Source texture.
        source_texture_asset_id: AssetId,
    },
}

impl CompositorPass {
    fn from_record(record: &CompositorPassRecord) -> Self {
        match record {
            CompositorPassRecord::Clear(clear) => CompositorPass::Clear {
                flags: ClearFlags::from_bits_truncate(clear.flags),
                color: clear.color,
                z: clear.z,
                stencil: clear.stencil,
            },
            CompositorPassRecord::Scene(scene) => CompositorPass::Scene {
                material_technique_id: MaterialTechniqueId::from_raw(scene.material_technique_id),
                minimum_render_queue_index: scene.minimum_render_queue_index,
                maximum_render_queue_index: scene.maximum_render_queue_index,
            },
            CompositorPassRecord::Quad(quad) => CompositorPass::Quad {
                material_asset_id: AssetId::from_raw(quad.material_asset_id),
                material_technique_id: MaterialTechniqueId::from_raw(quad.material_technique_id),
            },
            CompositorPassRecord::Copy(copy) => CompositorPass::Copy {
                destination_texture_asset_id: AssetId::from_raw(copy.destination_texture_asset_id),
                source_texture_asset_id: AssetId::from_raw(copy.source_texture_asset_id),
            },
        }
    }
}

/// The passes rendered into one framebuffer. `None` renders into the main target.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorTarget {
    /// Framebuffer rendered into.
    pub framebuffer: Option<AssetId>,
    /// Passes in execution order.
    pub passes: Vec<CompositorPass>,
}

/// A loaded compositor node.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorNodeResource {
    asset_id: AssetId,
    input_channels: Vec<u64>,
    render_target_textures: Vec<RenderTargetTextureDeclaration>,
    framebuffers: Vec<FramebufferDeclaration>,
    targets: Vec<CompositorTarget>,
    output_channels: Vec<u64>,
}

impl CompositorNodeResource {
    /// Builds a node from its compiled bytes.
    ///
    /// Framebuffers may only attach declared render target textures and
    /// targets may only name declared framebuffers.
    pub fn load(asset_id: AssetId, bytes: &[u8]) -> Result<Self, CompositorError> {
        let file = CompositorNodeFile::read(bytes)?;
        Self::from_file(asset_id, &file)
    }

    /// Builds a node from a decoded file.
    pub fn from_file(asset_id: AssetId, file: &CompositorNodeFile) -> Result<Self, CompositorError> {
        let render_target_textures = file
            .render_target_textures
            .iter()
            .map(RenderTargetTextureDeclaration::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        let declared = |texture: AssetId| render_target_textures.iter().any(|rt| rt.asset_id == texture);

        let mut framebuffers = Vec::with_capacity(file.framebuffers.len());
        for record in &file.framebuffers {
            let framebuffer = framebuffer_declaration(record)?;
            for texture in framebuffer
                .color_textures
                .iter()
                .chain(framebuffer.depth_stencil_texture.iter())
            {
                if !declared(*texture) {
                    return Err(CompositorError::UnknownRenderTargetTexture {
                        framebuffer: framebuffer.asset_id,
                        texture: *texture,
                    });
                }
            }
            framebuffers.push(framebuffer);
        }

        let mut targets = Vec::with_capacity(file.targets.len());
        for section in &file.targets {
            let framebuffer = match section.framebuffer_asset_id {
                0 => None,
                raw => {
                    let framebuffer = AssetId::from_raw(raw);
                    if !framebuffers.iter().any(|declared| declared.asset_id == framebuffer) {
                        return Err(CompositorError::UnknownFramebuffer(framebuffer));
                    }
                    Some(framebuffer)
                }
            };
            targets.push(CompositorTarget {
                framebuffer,
                passes: section.passes.iter().map(CompositorPass::from_record).collect(),
            });
        }

        Ok(Self {
            asset_id,
            input_channels: file.input_channels.clone(),
            render_target_textures,
            framebuffers,
            targets,
            output_channels: file.output_channels.clone(),
        })
    }

    /// The node asset.
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// Channels read from the previous node.
    pub fn input_channels(&self) -> &[u64] {
        &self.input_channels
    }

    /// Declared render target textures.
    pub fn render_target_textures(&self) -> &[RenderTargetTextureDeclaration] {
        &self.render_target_textures
    }

    /// A declared render target texture.
    pub fn render_target_texture(&self, asset_id: AssetId) -> Option<&RenderTargetTextureDeclaration> {
        self.render_target_textures
            .iter()
            .find(|declaration| declaration.asset_id == asset_id)
    }

    /// Declared framebuffers.
    pub fn framebuffers(&self) -> &[FramebufferDeclaration] {
        &self.framebuffers
    }

    /// A declared framebuffer.
    pub fn framebuffer(&self, asset_id: AssetId) -> Option<&FramebufferDeclaration> {
        self.framebuffers
            .iter()
            .find(|declaration| declaration.asset_id == asset_id)
    }

    /// Targets in execution order.
    pub fn targets(&self) -> &[CompositorTarget] {
        &self.targets
    }

    /// Channels handed to the next node.
    pub fn output_channels(&self) -> &[u64] {
        &self.output_channels
    }
}

fn framebuffer_declaration(record: &FramebufferRecord) -> Result<FramebufferDeclaration, CompositorError> {
    let number_of_color_textures = record.number_of_color_textures as usize;
    if number_of_color_textures > MAX_FRAMEBUFFER_COLOR_TEXTURES {
        return Err(CompositorError::Format(
            lumen_core::format::FormatError::InvalidValue {
                field: "number_of_color_textures",
                value: number_of_color_textures as i64,
            },
        ));
    }
    Ok(FramebufferDeclaration {
        asset_id: AssetId::from_raw(record.asset_id),
        color_textures: record.color_texture_asset_ids[..number_of_color_textures]
            .iter()
            .map(|raw| AssetId::from_raw(*raw))
            .collect(),
        depth_stencil_texture: match record.depth_stencil_texture_asset_id {
            0 => None,
            raw => Some(AssetId::from_raw(raw)),
        },
    })
}

/// Owns the loaded compositor nodes.
#[derive(Debug, Default)]
pub struct CompositorNodeResourceManager {
    nodes: AHashMap<AssetId, Arc<CompositorNodeResource>>,
}

impl CompositorNodeResourceManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a node, replacing a previous version.
    pub fn load(&mut self, asset_id: AssetId, bytes: &[u8]) -> Result<Arc<CompositorNodeResource>, CompositorError> {
        let node = Arc::new(CompositorNodeResource::load(asset_id, bytes)?);
        if self.nodes.insert(asset_id, node.clone()).is_some() {
            log::info!("Compositor node {} reloaded", asset_id);
        }
        Ok(node)
    }

    /// A node by asset.
    pub fn get(&self, asset_id: AssetId) -> Option<&Arc<CompositorNodeResource>> {
        self.nodes.get(&asset_id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node is loaded.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::format::CompositorTargetSection;

    fn texture(asset_id: u64) -> RenderTargetTextureRecord {
        RenderTargetTextureRecord {
            asset_id,
            width: 0,
            height: 0,
            texture_format: TextureFormat::R16G16B16A16F.as_i32(),
            allow_multisample: 0,
        }
    }

    fn framebuffer(asset_id: u64, color: u64) -> FramebufferRecord {
        let mut color_texture_asset_ids = [0; MAX_FRAMEBUFFER_COLOR_TEXTURES];
        color_texture_asset_ids[0] = color;
        FramebufferRecord {
            asset_id,
            color_texture_asset_ids,
            depth_stencil_texture_asset_id: 0,
            number_of_color_textures: 1,
            reserved: 0,
        }
    }

    #[test]
    fn framebuffers_must_use_declared_textures() {
        let file = CompositorNodeFile {
            render_target_textures: vec![texture(10)],
            framebuffers: vec![framebuffer(20, 11)],
            ..Default::default()
        };
        assert!(matches!(
            CompositorNodeResource::from_file(AssetId::from_raw(1), &file),
            Err(CompositorError::UnknownRenderTargetTexture { .. })
        ));
    }

    #[test]
    fn targets_must_use_declared_framebuffers() {
        let file = CompositorNodeFile {
            render_target_textures: vec![texture(10)],
            framebuffers: vec![framebuffer(20, 10)],
            targets: vec![CompositorTargetSection {
                framebuffer_asset_id: 21,
                passes: Vec::new(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            CompositorNodeResource::from_file(AssetId::from_raw(1), &file),
            Err(CompositorError::UnknownFramebuffer(_))
        ));
    }

    #[test]
    fn zero_sizes_follow_the_output() {
        let declaration = RenderTargetTextureDeclaration::from_record(&texture(10)).unwrap();
        assert_eq!(declaration.resolved_size([640, 480]), [640, 480]);
    }
}
