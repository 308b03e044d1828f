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

//! Buffer and texture descriptors.

use super::format::TextureFormat;
use super::ids::TextureId;

crate::lumen_int_enum! {
    /// How often the CPU updates a buffer.
    pub enum BufferUsage {
        /// Written once, used many times.
        StaticDraw = 0,
        /// Written repeatedly, used many times.
        DynamicDraw = 1,
        /// Written once per use.
        StreamDraw = 2,
    }
}

crate::lumen_bitflags! {
    /// Texture creation flags.
    pub struct TextureFlags: u32 {
        /// The texture can be sampled.
        const SHADER_RESOURCE = 1 << 0;
        /// The texture can be rendered into.
        const RENDER_TARGET = 1 << 1;
        /// Mipmaps are generated from the top level.
        const GENERATE_MIPMAPS = 1 << 2;
    }
}

/// Describes a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Creation flags.
    pub flags: TextureFlags,
    /// Samples per texel; one disables multisampling.
    pub number_of_multisamples: u8,
}

/// A framebuffer attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferAttachment {
    /// The attached texture.
    pub texture: TextureId,
    /// Mip level rendered into.
    pub mipmap_index: u32,
}

/// Describes a framebuffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FramebufferDescriptor {
    /// Color attachments in render target order.
    pub color_attachments: Vec<FramebufferAttachment>,
    /// Optional depth-stencil attachment.
    pub depth_stencil_attachment: Option<FramebufferAttachment>,
}
