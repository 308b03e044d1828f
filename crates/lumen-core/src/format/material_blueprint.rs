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

//! Compiled material blueprint layout.
//!
//! ```text
//! FileHeader
//! MaterialBlueprintHeader
//! MaterialPropertyRecord       * number_of_properties
//! { RootParameterRecord, DescriptorRangeRecord * number_of_ranges } * number_of_root_parameters
//! VertexAttributeRecord        * number_of_vertex_attributes
//! PipelineStateRecord
//! ShaderBlueprintsRecord
//! { UniformBufferRecord, MaterialPropertyRecord * number_of_element_properties } * number_of_uniform_buffers
//! TextureBufferRecord          * number_of_texture_buffers
//! SamplerStateRecord           * number_of_sampler_states
//! TextureRecord                * number_of_textures
//! ```

use super::{decode_enum, decode_name, encode_name, AssetFormat, BlobReader, BlobWriter, FormatError};
use crate::renderer::api::{
    BlendState, DepthStencilOpDesc, DepthStencilState, DescriptorRange, PipelineStateTemplate,
    RasterizerState, RenderTargetBlendState, SamplerState, TextureFormat, VertexAttribute,
    MAX_RENDER_TARGETS,
};
use bytemuck::{Pod, Zeroable};

/// Size of the inline value storage of a material property record.
pub const MATERIAL_PROPERTY_VALUE_SIZE: usize = 64;

/// Number of shader types a blueprint can provide templates for.
pub const NUMBER_OF_SHADER_TYPES: usize = 5;

/// A material property as stored in blueprints and materials.
///
/// `usage` and `value_type` are raw integers of the runtime's property enums;
/// `value` holds the little-endian value bytes, zero padded.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialPropertyRecord {
    /// Hashed property name.
    pub property_id: u64,
    /// Hashed name of the referenced property for reference usages, otherwise zero.
    pub reference_id: u64,
    /// Property usage.
    pub usage: i32,
    /// Value type.
    pub value_type: i32,
    /// Importance of a shader combination property when choosing a fallback pipeline.
    pub visual_importance: i32,
    /// Largest meaningful value of an integer shader combination property.
    pub maximum_integer_value: i32,
    /// Inline value bytes.
    pub value: [u8; MATERIAL_PROPERTY_VALUE_SIZE],
}

/// Counts of the variable-length sections of a material blueprint.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Default)]
pub struct MaterialBlueprintHeader {
    /// Material properties with their defaults.
    pub number_of_properties: u32,
    /// Root parameters.
    pub number_of_root_parameters: u32,
    /// Vertex attributes.
    pub number_of_vertex_attributes: u32,
    /// Uniform buffers.
    pub number_of_uniform_buffers: u32,
    /// Texture buffers.
    pub number_of_texture_buffers: u32,
    /// Sampler states.
    pub number_of_sampler_states: u32,
    /// Textures.
    pub number_of_textures: u32,
}

/// A root parameter: a descriptor table with `number_of_ranges` ranges following.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RootParameterRecord {
    /// Number of descriptor ranges.
    pub number_of_ranges: u32,
}

/// A descriptor range.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DescriptorRangeRecord {
    /// `DescriptorRangeType` value.
    pub range_type: i32,
    /// Number of descriptors.
    pub number_of_descriptors: u32,
    /// First shader register.
    pub base_shader_register: u32,
    /// `ShaderVisibility` value.
    pub shader_visibility: i32,
    /// Zero-padded register name.
    pub base_shader_register_name: [u8; 32],
}

impl From<&DescriptorRange> for DescriptorRangeRecord {
    fn from(range: &DescriptorRange) -> Self {
        Self {
            range_type: range.range_type.as_i32(),
            number_of_descriptors: range.number_of_descriptors,
            base_shader_register: range.base_shader_register,
            shader_visibility: range.shader_visibility.as_i32(),
            base_shader_register_name: encode_name(&range.base_shader_register_name),
        }
    }
}

impl TryFrom<&DescriptorRangeRecord> for DescriptorRange {
    type Error = FormatError;

    fn try_from(record: &DescriptorRangeRecord) -> Result<Self, FormatError> {
        Ok(Self {
            range_type: decode_enum("range_type", record.range_type)?,
            number_of_descriptors: record.number_of_descriptors,
            base_shader_register: record.base_shader_register,
            base_shader_register_name: decode_name(&record.base_shader_register_name)?,
            shader_visibility: decode_enum("shader_visibility", record.shader_visibility)?,
        })
    }
}

/// A vertex attribute.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct VertexAttributeRecord {
    /// `VertexAttributeFormat` value.
    pub format: i32,
    /// Semantic index.
    pub semantic_index: u32,
    /// Input slot.
    pub input_slot: u32,
    /// Byte offset inside the vertex.
    pub aligned_byte_offset: u32,
    /// Stride of the input slot.
    pub stride_in_bytes: u32,
    /// Zero for per-vertex data.
    pub instances_per_element: u32,
    /// Zero-padded attribute name.
    pub name: [u8; 32],
    /// Zero-padded semantic name.
    pub semantic_name: [u8; 32],
}

impl From<&VertexAttribute> for VertexAttributeRecord {
    fn from(attribute: &VertexAttribute) -> Self {
        Self {
            format: attribute.format.as_i32(),
            semantic_index: attribute.semantic_index,
            input_slot: attribute.input_slot,
            aligned_byte_offset: attribute.aligned_byte_offset,
            stride_in_bytes: attribute.stride_in_bytes,
            instances_per_element: attribute.instances_per_element,
            name: encode_name(&attribute.name),
            semantic_name: encode_name(&attribute.semantic_name),
        }
    }
}

impl TryFrom<&VertexAttributeRecord> for VertexAttribute {
    type Error = FormatError;

    fn try_from(record: &VertexAttributeRecord) -> Result<Self, FormatError> {
        Ok(Self {
            format: decode_enum("vertex_attribute_format", record.format)?,
            name: decode_name(&record.name)?,
            semantic_name: decode_name(&record.semantic_name)?,
            semantic_index: record.semantic_index,
            input_slot: record.input_slot,
            aligned_byte_offset: record.aligned_byte_offset,
            stride_in_bytes: record.stride_in_bytes,
            instances_per_element: record.instances_per_element,
        })
    }
}

/// Rasterizer state with enums stored as integers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RasterizerStateRecord {
    /// `FillMode`.
    pub fill_mode: i32,
    /// `CullMode`.
    pub cull_mode: i32,
    /// Boolean.
    pub front_counter_clockwise: u32,
    /// Constant depth bias.
    pub depth_bias: i32,
    /// Depth bias clamp.
    pub depth_bias_clamp: f32,
    /// Slope scaled depth bias.
    pub slope_scaled_depth_bias: f32,
    /// Boolean.
    pub depth_clip_enable: u32,
    /// Boolean.
    pub multisample_enable: u32,
    /// Boolean.
    pub antialiased_line_enable: u32,
    /// `ConservativeRasterizationMode`.
    pub conservative_rasterization_mode: i32,
    /// Boolean.
    pub scissor_enable: u32,
}

impl From<&RasterizerState> for RasterizerStateRecord {
    fn from(state: &RasterizerState) -> Self {
        Self {
            fill_mode: state.fill_mode.as_i32(),
            cull_mode: state.cull_mode.as_i32(),
            front_counter_clockwise: state.front_counter_clockwise as u32,
            depth_bias: state.depth_bias,
            depth_bias_clamp: state.depth_bias_clamp,
            slope_scaled_depth_bias: state.slope_scaled_depth_bias,
            depth_clip_enable: state.depth_clip_enable as u32,
            multisample_enable: state.multisample_enable as u32,
            antialiased_line_enable: state.antialiased_line_enable as u32,
            conservative_rasterization_mode: state.conservative_rasterization_mode.as_i32(),
            scissor_enable: state.scissor_enable as u32,
        }
    }
}

impl TryFrom<&RasterizerStateRecord> for RasterizerState {
    type Error = FormatError;

    fn try_from(record: &RasterizerStateRecord) -> Result<Self, FormatError> {
        Ok(Self {
            fill_mode: decode_enum("fill_mode", record.fill_mode)?,
            cull_mode: decode_enum("cull_mode", record.cull_mode)?,
            front_counter_clockwise: record.front_counter_clockwise != 0,
            depth_bias: record.depth_bias,
            depth_bias_clamp: record.depth_bias_clamp,
            slope_scaled_depth_bias: record.slope_scaled_depth_bias,
            depth_clip_enable: record.depth_clip_enable != 0,
            multisample_enable: record.multisample_enable != 0,
            antialiased_line_enable: record.antialiased_line_enable != 0,
            conservative_rasterization_mode: decode_enum(
                "conservative_rasterization_mode",
                record.conservative_rasterization_mode,
            )?,
            scissor_enable: record.scissor_enable != 0,
        })
    }
}

/// Stencil operations of one face.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DepthStencilOpRecord {
    /// `StencilOp`.
    pub stencil_fail_op: i32,
    /// `StencilOp`.
    pub stencil_depth_fail_op: i32,
    /// `StencilOp`.
    pub stencil_pass_op: i32,
    /// `ComparisonFunc`.
    pub stencil_func: i32,
}

impl From<&DepthStencilOpDesc> for DepthStencilOpRecord {
    fn from(desc: &DepthStencilOpDesc) -> Self {
        Self {
            stencil_fail_op: desc.stencil_fail_op.as_i32(),
            stencil_depth_fail_op: desc.stencil_depth_fail_op.as_i32(),
            stencil_pass_op: desc.stencil_pass_op.as_i32(),
            stencil_func: desc.stencil_func.as_i32(),
        }
    }
}

impl TryFrom<&DepthStencilOpRecord> for DepthStencilOpDesc {
    type Error = FormatError;

    fn try_from(record: &DepthStencilOpRecord) -> Result<Self, FormatError> {
        Ok(Self {
            stencil_fail_op: decode_enum("stencil_fail_op", record.stencil_fail_op)?,
            stencil_depth_fail_op: decode_enum("stencil_depth_fail_op", record.stencil_depth_fail_op)?,
            stencil_pass_op: decode_enum("stencil_pass_op", record.stencil_pass_op)?,
            stencil_func: decode_enum("stencil_func", record.stencil_func)?,
        })
    }
}

/// Depth-stencil state with enums stored as integers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DepthStencilStateRecord {
    /// Boolean.
    pub depth_enable: u32,
    /// `DepthWriteMask`.
    pub depth_write_mask: i32,
    /// `ComparisonFunc`.
    pub depth_func: i32,
    /// Boolean.
    pub stencil_enable: u32,
    /// Stencil read mask in the low byte.
    pub stencil_read_mask: u32,
    /// Stencil write mask in the low byte.
    pub stencil_write_mask: u32,
    /// Front face.
    pub front_face: DepthStencilOpRecord,
    /// Back face.
    pub back_face: DepthStencilOpRecord,
}

impl From<&DepthStencilState> for DepthStencilStateRecord {
    fn from(state: &DepthStencilState) -> Self {
        Self {
            depth_enable: state.depth_enable as u32,
            depth_write_mask: state.depth_write_mask.as_i32(),
            depth_func: state.depth_func.as_i32(),
            stencil_enable: state.stencil_enable as u32,
            stencil_read_mask: state.stencil_read_mask as u32,
            stencil_write_mask: state.stencil_write_mask as u32,
            front_face: (&state.front_face).into(),
            back_face: (&state.back_face).into(),
        }
    }
}

impl TryFrom<&DepthStencilStateRecord> for DepthStencilState {
    type Error = FormatError;

    fn try_from(record: &DepthStencilStateRecord) -> Result<Self, FormatError> {
        Ok(Self {
            depth_enable: record.depth_enable != 0,
            depth_write_mask: decode_enum("depth_write_mask", record.depth_write_mask)?,
            depth_func: decode_enum("depth_func", record.depth_func)?,
            stencil_enable: record.stencil_enable != 0,
            stencil_read_mask: (record.stencil_read_mask & 0xff) as u8,
            stencil_write_mask: (record.stencil_write_mask & 0xff) as u8,
            front_face: (&record.front_face).try_into()?,
            back_face: (&record.back_face).try_into()?,
        })
    }
}

/// Blending of one render target.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RenderTargetBlendRecord {
    /// Boolean.
    pub blend_enable: u32,
    /// `Blend`.
    pub src_blend: i32,
    /// `Blend`.
    pub dest_blend: i32,
    /// `BlendOp`.
    pub blend_op: i32,
    /// `Blend`.
    pub src_blend_alpha: i32,
    /// `Blend`.
    pub dest_blend_alpha: i32,
    /// `BlendOp`.
    pub blend_op_alpha: i32,
    /// Channel mask in the low four bits.
    pub render_target_write_mask: u32,
}

impl From<&RenderTargetBlendState> for RenderTargetBlendRecord {
    fn from(state: &RenderTargetBlendState) -> Self {
        Self {
            blend_enable: state.blend_enable as u32,
            src_blend: state.src_blend.as_i32(),
            dest_blend: state.dest_blend.as_i32(),
            blend_op: state.blend_op.as_i32(),
            src_blend_alpha: state.src_blend_alpha.as_i32(),
            dest_blend_alpha: state.dest_blend_alpha.as_i32(),
            blend_op_alpha: state.blend_op_alpha.as_i32(),
            render_target_write_mask: state.render_target_write_mask as u32,
        }
    }
}

impl TryFrom<&RenderTargetBlendRecord> for RenderTargetBlendState {
    type Error = FormatError;

    fn try_from(record: &RenderTargetBlendRecord) -> Result<Self, FormatError> {
        Ok(Self {
            blend_enable: record.blend_enable != 0,
            src_blend: decode_enum("src_blend", record.src_blend)?,
            dest_blend: decode_enum("dest_blend", record.dest_blend)?,
            blend_op: decode_enum("blend_op", record.blend_op)?,
            src_blend_alpha: decode_enum("src_blend_alpha", record.src_blend_alpha)?,
            dest_blend_alpha: decode_enum("dest_blend_alpha", record.dest_blend_alpha)?,
            blend_op_alpha: decode_enum("blend_op_alpha", record.blend_op_alpha)?,
            render_target_write_mask: (record.render_target_write_mask & 0x0f) as u8,
        })
    }
}

/// Blend state with enums stored as integers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BlendStateRecord {
    /// Boolean.
    pub alpha_to_coverage_enable: u32,
    /// Boolean.
    pub independent_blend_enable: u32,
    /// Per render target.
    pub render_target: [RenderTargetBlendRecord; MAX_RENDER_TARGETS],
}

impl From<&BlendState> for BlendStateRecord {
    fn from(state: &BlendState) -> Self {
        Self {
            alpha_to_coverage_enable: state.alpha_to_coverage_enable as u32,
            independent_blend_enable: state.independent_blend_enable as u32,
            render_target: state.render_target.each_ref().map(RenderTargetBlendRecord::from),
        }
    }
}

impl TryFrom<&BlendStateRecord> for BlendState {
    type Error = FormatError;

    fn try_from(record: &BlendStateRecord) -> Result<Self, FormatError> {
        let mut render_target = [RenderTargetBlendState::default(); MAX_RENDER_TARGETS];
        for (target, source) in render_target.iter_mut().zip(&record.render_target) {
            *target = source.try_into()?;
        }
        Ok(Self {
            alpha_to_coverage_enable: record.alpha_to_coverage_enable != 0,
            independent_blend_enable: record.independent_blend_enable != 0,
            render_target,
        })
    }
}

/// Value of [`PipelineStateRecord::depth_stencil_format`] when there is no depth buffer.
pub const NO_DEPTH_STENCIL_FORMAT: i32 = -1;

/// The pipeline state template of a blueprint.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PipelineStateRecord {
    /// `PrimitiveTopology`.
    pub primitive_topology: i32,
    /// Color render targets written.
    pub number_of_render_targets: u32,
    /// `TextureFormat` per render target.
    pub render_target_formats: [i32; MAX_RENDER_TARGETS],
    /// `TextureFormat`, or [`NO_DEPTH_STENCIL_FORMAT`].
    pub depth_stencil_format: i32,
    /// Rasterizer template.
    pub rasterizer_state: RasterizerStateRecord,
    /// Depth-stencil template.
    pub depth_stencil_state: DepthStencilStateRecord,
    /// Blend template.
    pub blend_state: BlendStateRecord,
}

impl From<&PipelineStateTemplate> for PipelineStateRecord {
    fn from(template: &PipelineStateTemplate) -> Self {
        Self {
            primitive_topology: template.primitive_topology.as_i32(),
            number_of_render_targets: template.number_of_render_targets,
            render_target_formats: template.render_target_formats.map(TextureFormat::as_i32),
            depth_stencil_format: template
                .depth_stencil_format
                .map_or(NO_DEPTH_STENCIL_FORMAT, TextureFormat::as_i32),
            rasterizer_state: (&template.rasterizer_state).into(),
            depth_stencil_state: (&template.depth_stencil_state).into(),
            blend_state: (&template.blend_state).into(),
        }
    }
}

impl TryFrom<&PipelineStateRecord> for PipelineStateTemplate {
    type Error = FormatError;

    fn try_from(record: &PipelineStateRecord) -> Result<Self, FormatError> {
        if record.number_of_render_targets as usize > MAX_RENDER_TARGETS {
            return Err(FormatError::InvalidValue {
                field: "number_of_render_targets",
                value: record.number_of_render_targets as i64,
            });
        }
        let mut render_target_formats = [TextureFormat::R8G8B8A8; MAX_RENDER_TARGETS];
        for (format, raw) in render_target_formats
            .iter_mut()
            .zip(record.render_target_formats)
            .take(record.number_of_render_targets as usize)
        {
            *format = decode_enum("render_target_format", raw)?;
        }
        let depth_stencil_format = match record.depth_stencil_format {
            NO_DEPTH_STENCIL_FORMAT => None,
            raw => Some(decode_enum("depth_stencil_format", raw)?),
        };
        Ok(Self {
            primitive_topology: decode_enum("primitive_topology", record.primitive_topology)?,
            rasterizer_state: (&record.rasterizer_state).try_into()?,
            depth_stencil_state: (&record.depth_stencil_state).try_into()?,
            blend_state: (&record.blend_state).try_into()?,
            number_of_render_targets: record.number_of_render_targets,
            render_target_formats,
            depth_stencil_format,
        })
    }
}

/// Shader blueprint asset ids per shader type, zero when absent.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Default)]
pub struct ShaderBlueprintsRecord {
    /// Indexed by `ShaderType` value.
    pub asset_ids: [u64; NUMBER_OF_SHADER_TYPES],
}

/// A uniform buffer followed by its element properties.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct UniformBufferRecord {
    /// Root parameter the buffer binds to.
    pub root_parameter_index: u32,
    /// Buffer usage (unknown, material, instance, pass).
    pub buffer_usage: i32,
    /// Number of array elements; the element properties repeat per element.
    pub number_of_elements: u32,
    /// Number of element properties following.
    pub number_of_element_properties: u32,
}

/// A texture buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextureBufferRecord {
    /// Property resolved to fill the buffer.
    pub value: MaterialPropertyRecord,
    /// Root parameter the buffer binds to.
    pub root_parameter_index: u32,
    /// Buffer usage.
    pub buffer_usage: i32,
}

/// A sampler state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SamplerStateRecord {
    /// Root parameter the sampler binds to.
    pub root_parameter_index: u32,
    /// `FilterMode`.
    pub filter: i32,
    /// `TextureAddressMode`.
    pub address_u: i32,
    /// `TextureAddressMode`.
    pub address_v: i32,
    /// `TextureAddressMode`.
    pub address_w: i32,
    /// Mip LOD bias.
    pub mip_lod_bias: f32,
    /// Maximum anisotropy.
    pub max_anisotropy: u32,
    /// `ComparisonFunc`.
    pub comparison_func: i32,
    /// Border color.
    pub border_color: [f32; 4],
    /// Smallest mip level.
    pub min_lod: f32,
    /// Largest mip level.
    pub max_lod: f32,
}

impl SamplerStateRecord {
    /// Builds a record from a sampler state bound at `root_parameter_index`.
    pub fn new(root_parameter_index: u32, state: &SamplerState) -> Self {
        Self {
            root_parameter_index,
            filter: state.filter.as_i32(),
            address_u: state.address_u.as_i32(),
            address_v: state.address_v.as_i32(),
            address_w: state.address_w.as_i32(),
            mip_lod_bias: state.mip_lod_bias,
            max_anisotropy: state.max_anisotropy,
            comparison_func: state.comparison_func.as_i32(),
            border_color: state.border_color,
            min_lod: state.min_lod,
            max_lod: state.max_lod,
        }
    }

    /// Decodes the sampler state.
    pub fn sampler_state(&self) -> Result<SamplerState, FormatError> {
        Ok(SamplerState {
            filter: decode_enum("filter", self.filter)?,
            address_u: decode_enum("address_u", self.address_u)?,
            address_v: decode_enum("address_v", self.address_v)?,
            address_w: decode_enum("address_w", self.address_w)?,
            mip_lod_bias: self.mip_lod_bias,
            max_anisotropy: self.max_anisotropy,
            comparison_func: decode_enum("comparison_func", self.comparison_func)?,
            border_color: self.border_color,
            min_lod: self.min_lod,
            max_lod: self.max_lod,
        })
    }
}

/// A texture slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextureRecord {
    /// Property naming the texture asset, directly or through a reference.
    pub material_property: MaterialPropertyRecord,
    /// Texture used until the referenced one is available.
    pub fallback_texture_asset_id: u64,
    /// Root parameter the texture binds to.
    pub root_parameter_index: u32,
    /// Index into the blueprint sampler states, or `u32::MAX`.
    pub sampler_state_index: u32,
    /// Boolean: sample with sRGB to linear conversion.
    pub rgb_hardware_gamma_correction: u32,
    /// Padding, zero.
    pub reserved: u32,
}

/// A uniform buffer with its element properties.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBufferSection {
    /// The buffer record.
    pub header: UniformBufferRecord,
    /// Element properties in declaration order.
    pub element_properties: Vec<MaterialPropertyRecord>,
}

/// A material blueprint file, record by record.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialBlueprintFile {
    /// Declared material properties with their defaults.
    pub properties: Vec<MaterialPropertyRecord>,
    /// Root parameters, each a list of ranges.
    pub root_parameters: Vec<Vec<DescriptorRangeRecord>>,
    /// Vertex input layout.
    pub vertex_attributes: Vec<VertexAttributeRecord>,
    /// Pipeline state template.
    pub pipeline_state: PipelineStateRecord,
    /// Shader blueprint asset ids.
    pub shader_blueprints: ShaderBlueprintsRecord,
    /// Uniform buffers.
    pub uniform_buffers: Vec<UniformBufferSection>,
    /// Texture buffers.
    pub texture_buffers: Vec<TextureBufferRecord>,
    /// Sampler states.
    pub sampler_states: Vec<SamplerStateRecord>,
    /// Textures.
    pub textures: Vec<TextureRecord>,
}

impl MaterialBlueprintFile {
    /// Serializes the blueprint.
    pub fn write(&self) -> Vec<u8> {
        let mut writer = BlobWriter::new(AssetFormat::MaterialBlueprint);
        writer.write_pod(&MaterialBlueprintHeader {
            number_of_properties: self.properties.len() as u32,
            number_of_root_parameters: self.root_parameters.len() as u32,
            number_of_vertex_attributes: self.vertex_attributes.len() as u32,
            number_of_uniform_buffers: self.uniform_buffers.len() as u32,
            number_of_texture_buffers: self.texture_buffers.len() as u32,
            number_of_sampler_states: self.sampler_states.len() as u32,
            number_of_textures: self.textures.len() as u32,
        });
        writer.write_pod_slice(&self.properties);
        for ranges in &self.root_parameters {
            writer.write_pod(&RootParameterRecord {
                number_of_ranges: ranges.len() as u32,
            });
            writer.write_pod_slice(ranges);
        }
        writer
            .write_pod_slice(&self.vertex_attributes)
            .write_pod(&self.pipeline_state)
            .write_pod(&self.shader_blueprints);
        for uniform_buffer in &self.uniform_buffers {
            let mut header = uniform_buffer.header;
            header.number_of_element_properties = uniform_buffer.element_properties.len() as u32;
            writer
                .write_pod(&header)
                .write_pod_slice(&uniform_buffer.element_properties);
        }
        writer
            .write_pod_slice(&self.texture_buffers)
            .write_pod_slice(&self.sampler_states)
            .write_pod_slice(&self.textures);
        writer.finish()
    }

    /// Deserializes a blueprint, checking the header first.
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut reader = BlobReader::new(bytes);
        reader.read_header(AssetFormat::MaterialBlueprint)?;
        let header: MaterialBlueprintHeader = reader.read_pod()?;
        let properties = reader.read_pod_vec(header.number_of_properties as usize)?;
        let mut root_parameters = Vec::with_capacity(header.number_of_root_parameters as usize);
        for _ in 0..header.number_of_root_parameters {
            let parameter: RootParameterRecord = reader.read_pod()?;
            root_parameters.push(reader.read_pod_vec(parameter.number_of_ranges as usize)?);
        }
        let vertex_attributes = reader.read_pod_vec(header.number_of_vertex_attributes as usize)?;
        let pipeline_state = reader.read_pod()?;
        let shader_blueprints = reader.read_pod()?;
        let mut uniform_buffers = Vec::with_capacity(header.number_of_uniform_buffers as usize);
        for _ in 0..header.number_of_uniform_buffers {
            let uniform_buffer: UniformBufferRecord = reader.read_pod()?;
            let element_properties =
                reader.read_pod_vec(uniform_buffer.number_of_element_properties as usize)?;
            uniform_buffers.push(UniformBufferSection {
                header: uniform_buffer,
                element_properties,
            });
        }
        let texture_buffers = reader.read_pod_vec(header.number_of_texture_buffers as usize)?;
        let sampler_states = reader.read_pod_vec(header.number_of_sampler_states as usize)?;
        let textures = reader.read_pod_vec(header.number_of_textures as usize)?;
        Ok(Self {
            properties,
            root_parameters,
            vertex_attributes,
            pipeline_state,
            shader_blueprints,
            uniform_buffers,
            texture_buffers,
            sampler_states,
            textures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::CullMode;

    #[test]
    fn invalid_enum_values_are_rejected() {
        let mut record = RasterizerStateRecord::from(&RasterizerState::default());
        assert_eq!(
            RasterizerState::try_from(&record).unwrap(),
            RasterizerState::default()
        );
        record.cull_mode = 42;
        assert_eq!(
            RasterizerState::try_from(&record),
            Err(FormatError::InvalidValue {
                field: "cull_mode",
                value: 42
            })
        );
        record.cull_mode = CullMode::Front.as_i32();
        assert_eq!(
            RasterizerState::try_from(&record).unwrap().cull_mode,
            CullMode::Front
        );
    }

    #[test]
    fn pipeline_template_survives_the_record() {
        let mut template = PipelineStateTemplate::default();
        template.depth_stencil_format = None;
        template.blend_state.render_target[0].blend_enable = true;
        let record = PipelineStateRecord::from(&template);
        assert_eq!(PipelineStateTemplate::try_from(&record).unwrap(), template);
    }

    #[test]
    fn truncated_blueprint_fails_to_load() {
        let file = MaterialBlueprintFile {
            properties: vec![MaterialPropertyRecord::zeroed()],
            root_parameters: vec![vec![DescriptorRangeRecord::zeroed(); 2]],
            vertex_attributes: vec![],
            pipeline_state: PipelineStateRecord::zeroed(),
            shader_blueprints: ShaderBlueprintsRecord::default(),
            uniform_buffers: vec![UniformBufferSection {
                header: UniformBufferRecord::zeroed(),
                element_properties: vec![MaterialPropertyRecord::zeroed(); 3],
            }],
            texture_buffers: vec![],
            sampler_states: vec![],
            textures: vec![],
        };
        let bytes = file.write();
        let read = MaterialBlueprintFile::read(&bytes).unwrap();
        assert_eq!(read.root_parameters[0].len(), 2);
        assert_eq!(read.uniform_buffers[0].element_properties.len(), 3);
        assert!(matches!(
            MaterialBlueprintFile::read(&bytes[..bytes.len() - 1]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
