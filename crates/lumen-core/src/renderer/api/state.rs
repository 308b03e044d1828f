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

//! Fixed-function pipeline state: rasterizer, depth-stencil, blend and sampler.
//!
//! Every enum here is integer backed because material properties store these
//! values as plain integers (`FillMode`, `CullMode`, `DepthFunc`...) and the
//! material blueprint applies them on top of its pipeline state template.

use crate::hash::{ContentHash, ContentHasher};
use serde::{Deserialize, Serialize};

crate::lumen_int_enum! {
    /// How polygons are rasterized.
    pub enum FillMode {
        /// Polygons are rendered as outlines.
        Wireframe = 2,
        /// Polygons are filled.
        Solid = 3,
    }
}

crate::lumen_int_enum! {
    /// Which face of a triangle to cull.
    pub enum CullMode {
        /// No culling.
        None = 1,
        /// Cull front-facing triangles.
        Front = 2,
        /// Cull back-facing triangles.
        Back = 3,
    }
}

crate::lumen_int_enum! {
    /// Conservative rasterization toggle.
    pub enum ConservativeRasterizationMode {
        /// Disabled.
        Off = 0,
        /// Enabled.
        On = 1,
    }
}

crate::lumen_int_enum! {
    /// Whether depth values are written.
    pub enum DepthWriteMask {
        /// Depth writes are disabled.
        Zero = 0,
        /// Depth writes are enabled.
        All = 1,
    }
}

crate::lumen_int_enum! {
    /// Comparison function for depth, stencil and comparison samplers.
    pub enum ComparisonFunc {
        /// Never passes.
        Never = 1,
        /// Passes if the new value is less.
        Less = 2,
        /// Passes if equal.
        Equal = 3,
        /// Passes if less or equal.
        LessEqual = 4,
        /// Passes if greater.
        Greater = 5,
        /// Passes if not equal.
        NotEqual = 6,
        /// Passes if greater or equal.
        GreaterEqual = 7,
        /// Always passes.
        Always = 8,
    }
}

crate::lumen_int_enum! {
    /// Operation applied to a stencil value.
    pub enum StencilOp {
        /// Keep the existing value.
        Keep = 1,
        /// Set to zero.
        Zero = 2,
        /// Replace with the reference value.
        Replace = 3,
        /// Increment and clamp.
        IncrSat = 4,
        /// Decrement and clamp.
        DecrSat = 5,
        /// Bitwise invert.
        Invert = 6,
        /// Increment and wrap.
        Incr = 7,
        /// Decrement and wrap.
        Decr = 8,
    }
}

crate::lumen_int_enum! {
    /// A factor in the blend equation.
    pub enum Blend {
        /// `0`
        Zero = 1,
        /// `1`
        One = 2,
        /// Source color.
        SrcColor = 3,
        /// `1 - source color`
        InvSrcColor = 4,
        /// Source alpha.
        SrcAlpha = 5,
        /// `1 - source alpha`
        InvSrcAlpha = 6,
        /// Destination alpha.
        DestAlpha = 7,
        /// `1 - destination alpha`
        InvDestAlpha = 8,
        /// Destination color.
        DestColor = 9,
        /// `1 - destination color`
        InvDestColor = 10,
    }
}

crate::lumen_int_enum! {
    /// How source and destination are combined.
    pub enum BlendOp {
        /// `src + dst`
        Add = 1,
        /// `src - dst`
        Subtract = 2,
        /// `dst - src`
        RevSubtract = 3,
        /// `min(src, dst)`
        Min = 4,
        /// `max(src, dst)`
        Max = 5,
    }
}

crate::lumen_int_enum! {
    /// Texture filtering.
    pub enum FilterMode {
        /// Point sampling everywhere.
        MinMagMipPoint = 0,
        /// Linear minification and magnification, point mip selection.
        MinMagLinearMipPoint = 20,
        /// Trilinear filtering.
        MinMagMipLinear = 21,
        /// Anisotropic filtering.
        Anisotropic = 85,
        /// Trilinear filtering with comparison (shadow maps).
        ComparisonMinMagMipLinear = 149,
    }
}

crate::lumen_int_enum! {
    /// Texture addressing outside of `[0, 1]`.
    pub enum TextureAddressMode {
        /// Repeat.
        Wrap = 1,
        /// Mirrored repeat.
        Mirror = 2,
        /// Clamp to edge.
        Clamp = 3,
        /// Clamp to border color.
        Border = 4,
    }
}

crate::lumen_int_enum! {
    /// How vertices are assembled into primitives.
    pub enum PrimitiveTopology {
        /// Isolated points.
        PointList = 1,
        /// Isolated lines.
        LineList = 2,
        /// Connected line strip.
        LineStrip = 3,
        /// Isolated triangles.
        TriangleList = 4,
        /// Connected triangle strip.
        TriangleStrip = 5,
        /// Patch list with three control points (tessellation).
        PatchList3 = 35,
    }
}

/// Rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterizerState {
    /// Polygon fill mode.
    pub fill_mode: FillMode,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Counter-clockwise winding marks the front face.
    pub front_counter_clockwise: bool,
    /// Constant depth bias.
    pub depth_bias: i32,
    /// Maximum depth bias.
    pub depth_bias_clamp: f32,
    /// Depth bias scaled by the fragment slope.
    pub slope_scaled_depth_bias: f32,
    /// Clip fragments against the depth range.
    pub depth_clip_enable: bool,
    /// Multisample antialiasing.
    pub multisample_enable: bool,
    /// Line antialiasing.
    pub antialiased_line_enable: bool,
    /// Conservative rasterization.
    pub conservative_rasterization_mode: ConservativeRasterizationMode,
    /// Scissor testing.
    pub scissor_enable: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Solid,
            cull_mode: CullMode::Back,
            front_counter_clockwise: false,
            depth_bias: 0,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 0.0,
            depth_clip_enable: true,
            multisample_enable: false,
            antialiased_line_enable: false,
            conservative_rasterization_mode: ConservativeRasterizationMode::Off,
            scissor_enable: false,
        }
    }
}

impl ContentHash for RasterizerState {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write(&self.fill_mode)
            .write(&self.cull_mode)
            .write_bool(self.front_counter_clockwise)
            .write_i32(self.depth_bias)
            .write_f32(self.depth_bias_clamp)
            .write_f32(self.slope_scaled_depth_bias)
            .write_bool(self.depth_clip_enable)
            .write_bool(self.multisample_enable)
            .write_bool(self.antialiased_line_enable)
            .write(&self.conservative_rasterization_mode)
            .write_bool(self.scissor_enable);
    }
}

/// Stencil operations for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthStencilOpDesc {
    /// Applied when the stencil test fails.
    pub stencil_fail_op: StencilOp,
    /// Applied when the stencil test passes and the depth test fails.
    pub stencil_depth_fail_op: StencilOp,
    /// Applied when both tests pass.
    pub stencil_pass_op: StencilOp,
    /// Stencil comparison.
    pub stencil_func: ComparisonFunc,
}

impl Default for DepthStencilOpDesc {
    fn default() -> Self {
        Self {
            stencil_fail_op: StencilOp::Keep,
            stencil_depth_fail_op: StencilOp::Keep,
            stencil_pass_op: StencilOp::Keep,
            stencil_func: ComparisonFunc::Always,
        }
    }
}

impl ContentHash for DepthStencilOpDesc {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write(&self.stencil_fail_op)
            .write(&self.stencil_depth_fail_op)
            .write(&self.stencil_pass_op)
            .write(&self.stencil_func);
    }
}

/// Depth and stencil testing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthStencilState {
    /// Depth testing.
    pub depth_enable: bool,
    /// Depth writes.
    pub depth_write_mask: DepthWriteMask,
    /// Depth comparison.
    pub depth_func: ComparisonFunc,
    /// Stencil testing.
    pub stencil_enable: bool,
    /// Stencil read mask.
    pub stencil_read_mask: u8,
    /// Stencil write mask.
    pub stencil_write_mask: u8,
    /// Front face stencil operations.
    pub front_face: DepthStencilOpDesc,
    /// Back face stencil operations.
    pub back_face: DepthStencilOpDesc,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        // Reversed-Z friendly defaults are left to the blueprint; this mirrors the classic defaults.
        Self {
            depth_enable: true,
            depth_write_mask: DepthWriteMask::All,
            depth_func: ComparisonFunc::Less,
            stencil_enable: false,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            front_face: DepthStencilOpDesc::default(),
            back_face: DepthStencilOpDesc::default(),
        }
    }
}

impl ContentHash for DepthStencilState {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write_bool(self.depth_enable)
            .write(&self.depth_write_mask)
            .write(&self.depth_func)
            .write_bool(self.stencil_enable)
            .write_bytes(&[self.stencil_read_mask, self.stencil_write_mask])
            .write(&self.front_face)
            .write(&self.back_face);
    }
}

/// Blend configuration of one render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderTargetBlendState {
    /// Blending.
    pub blend_enable: bool,
    /// Source color factor.
    pub src_blend: Blend,
    /// Destination color factor.
    pub dest_blend: Blend,
    /// Color operation.
    pub blend_op: BlendOp,
    /// Source alpha factor.
    pub src_blend_alpha: Blend,
    /// Destination alpha factor.
    pub dest_blend_alpha: Blend,
    /// Alpha operation.
    pub blend_op_alpha: BlendOp,
    /// RGBA write mask, one bit per channel.
    pub render_target_write_mask: u8,
}

impl Default for RenderTargetBlendState {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_blend: Blend::One,
            dest_blend: Blend::Zero,
            blend_op: BlendOp::Add,
            src_blend_alpha: Blend::One,
            dest_blend_alpha: Blend::Zero,
            blend_op_alpha: BlendOp::Add,
            render_target_write_mask: 0x0f,
        }
    }
}

impl ContentHash for RenderTargetBlendState {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write_bool(self.blend_enable)
            .write(&self.src_blend)
            .write(&self.dest_blend)
            .write(&self.blend_op)
            .write(&self.src_blend_alpha)
            .write(&self.dest_blend_alpha)
            .write(&self.blend_op_alpha)
            .write_bytes(&[self.render_target_write_mask]);
    }
}

/// Maximum number of simultaneously bound color render targets.
pub const MAX_RENDER_TARGETS: usize = 8;

/// Output merger blend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendState {
    /// Alpha to coverage.
    pub alpha_to_coverage_enable: bool,
    /// Use a different blend state per render target; otherwise target 0 applies to all.
    pub independent_blend_enable: bool,
    /// Per render target blending.
    pub render_target: [RenderTargetBlendState; MAX_RENDER_TARGETS],
}

impl ContentHash for BlendState {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write_bool(self.alpha_to_coverage_enable)
            .write_bool(self.independent_blend_enable);
        for target in &self.render_target {
            hasher.write(target);
        }
    }
}

/// Sampler state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerState {
    /// Filtering.
    pub filter: FilterMode,
    /// U addressing.
    pub address_u: TextureAddressMode,
    /// V addressing.
    pub address_v: TextureAddressMode,
    /// W addressing.
    pub address_w: TextureAddressMode,
    /// Mip LOD bias.
    pub mip_lod_bias: f32,
    /// Maximum anisotropy, used with [`FilterMode::Anisotropic`].
    pub max_anisotropy: u32,
    /// Comparison function for comparison filters.
    pub comparison_func: ComparisonFunc,
    /// Border color.
    pub border_color: [f32; 4],
    /// Smallest mip level.
    pub min_lod: f32,
    /// Largest mip level.
    pub max_lod: f32,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            filter: FilterMode::MinMagMipLinear,
            address_u: TextureAddressMode::Clamp,
            address_v: TextureAddressMode::Clamp,
            address_w: TextureAddressMode::Clamp,
            mip_lod_bias: 0.0,
            max_anisotropy: 16,
            comparison_func: ComparisonFunc::Never,
            border_color: [0.0; 4],
            min_lod: f32::MIN,
            max_lod: f32::MAX,
        }
    }
}

impl ContentHash for SamplerState {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write(&self.filter)
            .write(&self.address_u)
            .write(&self.address_v)
            .write(&self.address_w)
            .write_f32(self.mip_lod_bias)
            .write_u32(self.max_anisotropy)
            .write(&self.comparison_func);
        for channel in self.border_color {
            hasher.write_f32(channel);
        }
        hasher.write_f32(self.min_lod).write_f32(self.max_lod);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of<T: ContentHash>(value: &T) -> u64 {
        let mut hasher = ContentHasher::new();
        hasher.write(value);
        hasher.finish()
    }

    #[test]
    fn state_hash_follows_content() {
        let a = RasterizerState::default();
        let mut b = a;
        assert_eq!(hash_of(&a), hash_of(&b));
        b.cull_mode = CullMode::None;
        assert_ne!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn enums_convert_from_raw_integers() {
        assert_eq!(CullMode::try_from(1), Ok(CullMode::None));
        assert_eq!(ComparisonFunc::try_from(9), Err(9));
        assert_eq!(FilterMode::Anisotropic.as_i32(), 85);
    }
}
