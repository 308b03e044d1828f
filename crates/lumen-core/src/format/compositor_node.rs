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

//! Compiled compositor node layout.
//!
//! ```text
//! FileHeader
//! CompositorNodeHeader
//! u64 input channel ids          * number_of_input_channels
//! RenderTargetTextureRecord      * number_of_render_target_textures
//! FramebufferRecord              * number_of_framebuffers
//! { CompositorTargetRecord, { PassHeaderRecord, pass body } * number_of_passes } * number_of_targets
//! u64 output channel ids         * number_of_output_channels
//! ```
//!
//! Pass bodies are one of [`ClearPassRecord`], [`ScenePassRecord`],
//! [`QuadPassRecord`] or [`CopyPassRecord`], selected by the pass type of the
//! header. A body size that does not match its type aborts the load.

use super::{decode_enum, AssetFormat, BlobReader, BlobWriter, FormatError};
use bytemuck::{Pod, Zeroable};

crate::lumen_int_enum! {
    /// The kind of a compositor pass.
    pub enum CompositorPassType {
        /// Clears the target.
        Clear = 0,
        /// Draws the render queue of the scene.
        Scene = 1,
        /// Draws a full-screen triangle with a material.
        Quad = 2,
        /// Copies a texture into another.
        Copy = 3,
    }
}

/// Counts of a compositor node file.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Default)]
pub struct CompositorNodeHeader {
    /// Input channels.
    pub number_of_input_channels: u32,
    /// Render target textures.
    pub number_of_render_target_textures: u32,
    /// Framebuffers.
    pub number_of_framebuffers: u32,
    /// Targets.
    pub number_of_targets: u32,
    /// Output channels.
    pub number_of_output_channels: u32,
}

/// A render target texture declared by the node.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RenderTargetTextureRecord {
    /// Asset id under which the texture is published.
    pub asset_id: u64,
    /// Width in texels; zero follows the output width.
    pub width: u32,
    /// Height in texels; zero follows the output height.
    pub height: u32,
    /// `TextureFormat`.
    pub texture_format: i32,
    /// Boolean: allow multisampling.
    pub allow_multisample: u32,
}

/// Maximum number of color textures in a compositor framebuffer.
pub const MAX_FRAMEBUFFER_COLOR_TEXTURES: usize = 8;

/// A framebuffer declared by the node.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FramebufferRecord {
    /// Asset id under which the framebuffer is published.
    pub asset_id: u64,
    /// Color texture asset ids.
    pub color_texture_asset_ids: [u64; MAX_FRAMEBUFFER_COLOR_TEXTURES],
    /// Depth-stencil texture asset id, zero for none.
    pub depth_stencil_texture_asset_id: u64,
    /// Used entries of `color_texture_asset_ids`.
    pub number_of_color_textures: u32,
    /// Padding, zero.
    pub reserved: u32,
}

/// A render target and its pass list.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct CompositorTargetRecord {
    /// Framebuffer asset id, or zero for the workspace output.
    pub framebuffer_asset_id: u64,
    /// Passes following.
    pub number_of_passes: u32,
    /// Padding, zero.
    pub reserved: u32,
}

/// Prefix of every pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PassHeaderRecord {
    /// `CompositorPassType`.
    pub pass_type: i32,
    /// Size of the body following.
    pub number_of_bytes: u32,
}

/// Clears the target.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ClearPassRecord {
    /// `ClearFlags` bits.
    pub flags: u32,
    /// RGBA color.
    pub color: [f32; 4],
    /// Depth value.
    pub z: f32,
    /// Stencil value.
    pub stencil: u32,
}

/// Draws the part of the render queue within a queue index range.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ScenePassRecord {
    /// Technique used to draw every renderable.
    pub material_technique_id: u64,
    /// Inclusive lower render queue index.
    pub minimum_render_queue_index: u32,
    /// Inclusive upper render queue index.
    pub maximum_render_queue_index: u32,
}

/// Draws a full-screen triangle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct QuadPassRecord {
    /// Material asset drawn.
    pub material_asset_id: u64,
    /// Technique of the material used.
    pub material_technique_id: u64,
}

/// Copies one render target texture into another.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct CopyPassRecord {
    /// Destination texture asset id.
    pub destination_texture_asset_id: u64,
    /// Source texture asset id.
    pub source_texture_asset_id: u64,
}

/// A decoded pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompositorPassRecord {
    /// Clear pass.
    Clear(ClearPassRecord),
    /// Scene pass.
    Scene(ScenePassRecord),
    /// Quad pass.
    Quad(QuadPassRecord),
    /// Copy pass.
    Copy(CopyPassRecord),
}

impl CompositorPassRecord {
    /// The pass type tag.
    pub fn pass_type(&self) -> CompositorPassType {
        match self {
            CompositorPassRecord::Clear(_) => CompositorPassType::Clear,
            CompositorPassRecord::Scene(_) => CompositorPassType::Scene,
            CompositorPassRecord::Quad(_) => CompositorPassType::Quad,
            CompositorPassRecord::Copy(_) => CompositorPassType::Copy,
        }
    }

    fn write(&self, writer: &mut BlobWriter) {
        fn body<T: Pod>(writer: &mut BlobWriter, pass_type: CompositorPassType, record: &T) {
            writer
                .write_pod(&PassHeaderRecord {
                    pass_type: pass_type.as_i32(),
                    number_of_bytes: std::mem::size_of::<T>() as u32,
                })
                .write_pod(record);
        }
        match self {
            CompositorPassRecord::Clear(record) => body(writer, self.pass_type(), record),
            CompositorPassRecord::Scene(record) => body(writer, self.pass_type(), record),
            CompositorPassRecord::Quad(record) => body(writer, self.pass_type(), record),
            CompositorPassRecord::Copy(record) => body(writer, self.pass_type(), record),
        }
    }

    fn read(reader: &mut BlobReader<'_>) -> Result<Self, FormatError> {
        let header: PassHeaderRecord = reader.read_pod()?;
        let pass_type: CompositorPassType = decode_enum("pass_type", header.pass_type)?;
        let expected = match pass_type {
            CompositorPassType::Clear => std::mem::size_of::<ClearPassRecord>(),
            CompositorPassType::Scene => std::mem::size_of::<ScenePassRecord>(),
            CompositorPassType::Quad => std::mem::size_of::<QuadPassRecord>(),
            CompositorPassType::Copy => std::mem::size_of::<CopyPassRecord>(),
        };
        if header.number_of_bytes as usize != expected {
            return Err(FormatError::InvalidValue {
                field: "pass number_of_bytes",
                value: header.number_of_bytes as i64,
            });
        }
        Ok(match pass_type {
            CompositorPassType::Clear => CompositorPassRecord::Clear(reader.read_pod()?),
            CompositorPassType::Scene => CompositorPassRecord::Scene(reader.read_pod()?),
            CompositorPassType::Quad => CompositorPassRecord::Quad(reader.read_pod()?),
            CompositorPassType::Copy => CompositorPassRecord::Copy(reader.read_pod()?),
        })
    }
}

/// A target with its passes.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorTargetSection {
    /// Framebuffer asset id, or zero for the workspace output.
    pub framebuffer_asset_id: u64,
    /// Passes in execution order.
    pub passes: Vec<CompositorPassRecord>,
}

/// A compositor node file, record by record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositorNodeFile {
    /// Input channel ids.
    pub input_channels: Vec<u64>,
    /// Render target textures.
    pub render_target_textures: Vec<RenderTargetTextureRecord>,
    /// Framebuffers.
    pub framebuffers: Vec<FramebufferRecord>,
    /// Targets in execution order.
    pub targets: Vec<CompositorTargetSection>,
    /// Output channel ids.
    pub output_channels: Vec<u64>,
}

impl CompositorNodeFile {
    /// Serializes the node.
    pub fn write(&self) -> Vec<u8> {
        let mut writer = BlobWriter::new(AssetFormat::CompositorNode);
        writer
            .write_pod(&CompositorNodeHeader {
                number_of_input_channels: self.input_channels.len() as u32,
                number_of_render_target_textures: self.render_target_textures.len() as u32,
                number_of_framebuffers: self.framebuffers.len() as u32,
                number_of_targets: self.targets.len() as u32,
                number_of_output_channels: self.output_channels.len() as u32,
            })
            .write_pod_slice(&self.input_channels)
            .write_pod_slice(&self.render_target_textures)
            .write_pod_slice(&self.framebuffers);
        for target in &self.targets {
            writer.write_pod(&CompositorTargetRecord {
                framebuffer_asset_id: target.framebuffer_asset_id,
                number_of_passes: target.passes.len() as u32,
                reserved: 0,
            });
            for pass in &target.passes {
                pass.write(&mut writer);
            }
        }
        writer.write_pod_slice(&self.output_channels);
        writer.finish()
    }

    /// Deserializes a node, checking the header first.
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut reader = BlobReader::new(bytes);
        reader.read_header(AssetFormat::CompositorNode)?;
        let header: CompositorNodeHeader = reader.read_pod()?;
        let input_channels = reader.read_pod_vec(header.number_of_input_channels as usize)?;
        let render_target_textures =
            reader.read_pod_vec(header.number_of_render_target_textures as usize)?;
        let framebuffers = reader.read_pod_vec(header.number_of_framebuffers as usize)?;
        let mut targets = Vec::with_capacity(header.number_of_targets as usize);
        for _ in 0..header.number_of_targets {
            let target: CompositorTargetRecord = reader.read_pod()?;
            let passes = (0..target.number_of_passes)
                .map(|_| CompositorPassRecord::read(&mut reader))
                .collect::<Result<Vec<_>, _>>()?;
            targets.push(CompositorTargetSection {
                framebuffer_asset_id: target.framebuffer_asset_id,
                passes,
            });
        }
        let output_channels = reader.read_pod_vec(header.number_of_output_channels as usize)?;
        Ok(Self {
            input_channels,
            render_target_textures,
            framebuffers,
            targets,
            output_channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> CompositorNodeFile {
        CompositorNodeFile {
            input_channels: vec![1],
            render_target_textures: vec![RenderTargetTextureRecord {
                asset_id: 10,
                width: 0,
                height: 0,
                texture_format: 2,
                allow_multisample: 0,
            }],
            framebuffers: vec![],
            targets: vec![CompositorTargetSection {
                framebuffer_asset_id: 0,
                passes: vec![
                    CompositorPassRecord::Clear(ClearPassRecord {
                        flags: 3,
                        color: [0.5, 0.5, 0.5, 1.0],
                        z: 1.0,
                        stencil: 0,
                    }),
                    CompositorPassRecord::Scene(ScenePassRecord {
                        material_technique_id: 7,
                        minimum_render_queue_index: 0,
                        maximum_render_queue_index: 255,
                    }),
                ],
            }],
            output_channels: vec![2],
        }
    }

    #[test]
    fn passes_are_read_in_order() {
        let file = node();
        let read = CompositorNodeFile::read(&file.write()).unwrap();
        assert_eq!(read, file);
        assert_eq!(read.targets[0].passes[1].pass_type(), CompositorPassType::Scene);
    }

    #[test]
    fn pass_body_size_is_checked() {
        let mut bytes = node().write();
        // The first pass header follows the header, one channel id, one texture and the target record.
        let offset = std::mem::size_of::<super::super::FileHeader>()
            + std::mem::size_of::<CompositorNodeHeader>()
            + 8
            + std::mem::size_of::<RenderTargetTextureRecord>()
            + std::mem::size_of::<CompositorTargetRecord>()
            + 4;
        bytes[offset] = 99;
        assert!(matches!(
            CompositorNodeFile::read(&bytes),
            Err(FormatError::InvalidValue { field: "pass number_of_bytes", .. })
        ));
    }
}
