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

//! Texture and vertex attribute formats.

crate::lumen_int_enum! {
    /// Defines the memory format of texels in a texture or texture buffer.
    pub enum TextureFormat {
        /// One 8-bit unsigned normalized component.
        R8 = 0,
        /// Three 8-bit unsigned normalized components.
        R8G8B8 = 1,
        /// Four 8-bit unsigned normalized components (RGBA).
        R8G8B8A8 = 2,
        /// Four 8-bit unsigned normalized components (RGBA) in the sRGB color space.
        R8G8B8A8Srgb = 3,
        /// Four 8-bit unsigned normalized components (BGRA).
        B8G8R8A8 = 4,
        /// Packed 11/11/10 bit floating point color.
        R11G11B10F = 5,
        /// Four 16-bit float components.
        R16G16B16A16F = 6,
        /// Four 32-bit float components.
        R32G32B32A32F = 7,
        /// One 32-bit unsigned integer component.
        R32Uint = 8,
        /// One 32-bit float component.
        R32Float = 9,
        /// Two 16-bit signed normalized components, used for packed normals.
        R16G16Snorm = 10,
        /// Block compressed RGB (DXT1).
        Bc1 = 11,
        /// Block compressed RGB (DXT1) in the sRGB color space.
        Bc1Srgb = 12,
        /// Block compressed RGBA (DXT5).
        Bc3 = 13,
        /// Block compressed two-channel (normal maps).
        Bc5 = 14,
        /// 32-bit float depth.
        D32Float = 15,
    }
}

impl TextureFormat {
    /// Number of bytes per texel; for block compressed formats, per 4x4 block.
    pub const fn bytes_per_element(self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::R8G8B8 => 3,
            TextureFormat::R8G8B8A8
            | TextureFormat::R8G8B8A8Srgb
            | TextureFormat::B8G8R8A8
            | TextureFormat::R11G11B10F
            | TextureFormat::R32Uint
            | TextureFormat::R32Float
            | TextureFormat::R16G16Snorm
            | TextureFormat::D32Float => 4,
            TextureFormat::R16G16B16A16F => 8,
            TextureFormat::R32G32B32A32F => 16,
            TextureFormat::Bc1 | TextureFormat::Bc1Srgb => 8,
            TextureFormat::Bc3 | TextureFormat::Bc5 => 16,
        }
    }

    /// Returns `true` for block compressed formats.
    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            TextureFormat::Bc1 | TextureFormat::Bc1Srgb | TextureFormat::Bc3 | TextureFormat::Bc5
        )
    }

    /// Returns `true` for depth formats.
    pub const fn is_depth(self) -> bool {
        matches!(self, TextureFormat::D32Float)
    }

    /// Number of bytes of one mip level of a `width` x `height` surface.
    pub const fn surface_size(self, width: u32, height: u32) -> u64 {
        if self.is_compressed() {
            let blocks_x = width.div_ceil(4) as u64;
            let blocks_y = height.div_ceil(4) as u64;
            blocks_x * blocks_y * self.bytes_per_element() as u64
        } else {
            width as u64 * height as u64 * self.bytes_per_element() as u64
        }
    }
}

crate::lumen_int_enum! {
    /// The memory format of a single vertex attribute.
    pub enum VertexAttributeFormat {
        /// One 32-bit float.
        Float1 = 0,
        /// Two 32-bit floats.
        Float2 = 1,
        /// Three 32-bit floats.
        Float3 = 2,
        /// Four 32-bit floats.
        Float4 = 3,
        /// Four 8-bit unsigned normalized components.
        R8G8B8A8Unorm = 4,
        /// Four 8-bit unsigned integers.
        R8G8B8A8Uint = 5,
        /// Two 16-bit signed integers.
        Short2 = 6,
        /// Four 16-bit signed integers.
        Short4 = 7,
        /// One 32-bit unsigned integer.
        Uint1 = 8,
    }
}

impl VertexAttributeFormat {
    /// Size of one attribute value in bytes.
    pub const fn size(self) -> u32 {
        match self {
            VertexAttributeFormat::Float1 => 4,
            VertexAttributeFormat::Float2 => 8,
            VertexAttributeFormat::Float3 => 12,
            VertexAttributeFormat::Float4 => 16,
            VertexAttributeFormat::R8G8B8A8Unorm | VertexAttributeFormat::R8G8B8A8Uint => 4,
            VertexAttributeFormat::Short2 => 4,
            VertexAttributeFormat::Short4 => 8,
            VertexAttributeFormat::Uint1 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_sizes() {
        assert_eq!(TextureFormat::R8G8B8A8.surface_size(4, 4), 64);
        assert_eq!(TextureFormat::Bc1.surface_size(4, 4), 8);
        assert_eq!(TextureFormat::Bc3.surface_size(5, 5), 64);
        assert!(TextureFormat::D32Float.is_depth());
    }
}
