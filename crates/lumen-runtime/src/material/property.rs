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

//! Typed material property values and their usages.

use lumen_core::asset::AssetId;
use lumen_core::format::{FormatError, MaterialPropertyRecord, MATERIAL_PROPERTY_VALUE_SIZE};
use lumen_core::renderer::api::{
    Blend, BlendOp, ComparisonFunc, ConservativeRasterizationMode, CullMode, DepthWriteMask,
    FillMode, FilterMode, TextureAddressMode,
};
use lumen_core::{ContentHash, ContentHasher, PropertyId};

lumen_core::lumen_int_enum! {
    /// The type of a material property value.
    pub enum ValueType {
        /// Invalid.
        Unknown = 0,
        /// Boolean, packed as a 32-bit integer.
        Boolean = 1,
        /// `i32`.
        Integer = 2,
        /// `[i32; 2]`.
        Integer2 = 3,
        /// `[i32; 3]`.
        Integer3 = 4,
        /// `[i32; 4]`.
        Integer4 = 5,
        /// `f32`.
        Float = 6,
        /// `[f32; 2]`.
        Float2 = 7,
        /// `[f32; 3]`.
        Float3 = 8,
        /// `[f32; 4]`.
        Float4 = 9,
        /// Row-major 3x3 matrix.
        Float3_3 = 10,
        /// Row-major 4x4 matrix.
        Float4_4 = 11,
        /// [`FillMode`].
        FillMode = 12,
        /// [`CullMode`].
        CullMode = 13,
        /// [`ConservativeRasterizationMode`].
        ConservativeRasterizationMode = 14,
        /// [`DepthWriteMask`].
        DepthWriteMask = 15,
        /// [`ComparisonFunc`].
        ComparisonFunc = 16,
        /// [`Blend`].
        Blend = 17,
        /// [`BlendOp`].
        BlendOp = 18,
        /// [`FilterMode`].
        FilterMode = 19,
        /// [`TextureAddressMode`].
        TextureAddressMode = 20,
        /// An [`AssetId`] of a texture.
        TextureAssetId = 21,
        /// A [`PropertyId`] of a global material property.
        GlobalMaterialPropertyId = 22,
    }
}

impl ValueType {
    /// Number of bytes a value occupies when packed into a buffer.
    pub const fn byte_size(self) -> u32 {
        match self {
            ValueType::Unknown => 0,
            ValueType::Boolean | ValueType::Integer | ValueType::Float => 4,
            ValueType::Integer2 | ValueType::Float2 => 8,
            ValueType::Integer3 | ValueType::Float3 => 12,
            ValueType::Integer4 | ValueType::Float4 => 16,
            ValueType::Float3_3 => 36,
            ValueType::Float4_4 => 64,
            ValueType::FillMode
            | ValueType::CullMode
            | ValueType::ConservativeRasterizationMode
            | ValueType::DepthWriteMask
            | ValueType::ComparisonFunc
            | ValueType::Blend
            | ValueType::BlendOp
            | ValueType::FilterMode
            | ValueType::TextureAddressMode => 4,
            ValueType::TextureAssetId | ValueType::GlobalMaterialPropertyId => 8,
        }
    }
}

lumen_core::lumen_int_enum! {
    /// How a material property is consumed.
    pub enum Usage {
        /// Unknown usage, ignored.
        Unknown = 0,
        /// A value only read on the CPU.
        Static = 1,
        /// A value packed into uniform buffers.
        ShaderUniform = 2,
        /// A shader combination switch.
        ShaderCombination = 3,
        /// A field of the rasterizer state.
        RasterizerState = 4,
        /// A field of the depth-stencil state.
        DepthStencilState = 5,
        /// A field of the blend state.
        BlendState = 6,
        /// A field of a sampler state.
        SamplerState = 7,
        /// A texture asset.
        TextureReference = 8,
        /// A texture produced by the compositor.
        CompositorTextureReference = 9,
        /// Resolved from the global material property table.
        GlobalReference = 10,
        /// Resolved from the global table, falling back to the stored value.
        GlobalReferenceFallback = 11,
        /// Resolved per pass by the blueprint listener.
        PassReference = 12,
        /// Resolved from the properties of the drawn material.
        MaterialReference = 13,
        /// Resolved per draw from the renderable.
        InstanceReference = 14,
    }
}

impl Usage {
    /// Returns `true` for usages whose value comes from somewhere else.
    pub const fn is_reference(self) -> bool {
        matches!(
            self,
            Usage::GlobalReference
                | Usage::GlobalReferenceFallback
                | Usage::PassReference
                | Usage::MaterialReference
                | Usage::InstanceReference
        )
    }

    /// Returns `true` for usages that shape the pipeline state object.
    pub const fn is_pipeline_state(self) -> bool {
        matches!(
            self,
            Usage::RasterizerState | Usage::DepthStencilState | Usage::BlendState
        )
    }
}

/// A typed material property value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum MaterialPropertyValue {
    Boolean(bool),
    Integer(i32),
    Integer2([i32; 2]),
    Integer3([i32; 3]),
    Integer4([i32; 4]),
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Float3_3([f32; 9]),
    Float4_4([f32; 16]),
    FillMode(FillMode),
    CullMode(CullMode),
    ConservativeRasterizationMode(ConservativeRasterizationMode),
    DepthWriteMask(DepthWriteMask),
    ComparisonFunc(ComparisonFunc),
    Blend(Blend),
    BlendOp(BlendOp),
    FilterMode(FilterMode),
    TextureAddressMode(TextureAddressMode),
    TextureAssetId(AssetId),
    GlobalMaterialPropertyId(PropertyId),
}

fn put_i32s(out: &mut [u8], values: &[i32]) {
    for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

fn put_f32s(out: &mut [u8], values: &[f32]) {
    for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

fn get_i32s<const N: usize>(bytes: &[u8]) -> [i32; N] {
    let mut out = [0; N];
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out
}

fn get_f32s<const N: usize>(bytes: &[u8]) -> [f32; N] {
    let mut out = [0.0; N];
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out
}

fn get_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

fn enum_value<T: TryFrom<i32, Error = i32>>(field: &'static str, bytes: &[u8]) -> Result<T, FormatError> {
    lumen_core::format::decode_enum(field, get_i32s::<1>(bytes)[0])
}

impl MaterialPropertyValue {
    /// The type of the value.
    pub const fn value_type(&self) -> ValueType {
        match self {
            MaterialPropertyValue::Boolean(_) => ValueType::Boolean,
            MaterialPropertyValue::Integer(_) => ValueType::Integer,
            MaterialPropertyValue::Integer2(_) => ValueType::Integer2,
            MaterialPropertyValue::Integer3(_) => ValueType::Integer3,
            MaterialPropertyValue::Integer4(_) => ValueType::Integer4,
            MaterialPropertyValue::Float(_) => ValueType::Float,
            MaterialPropertyValue::Float2(_) => ValueType::Float2,
            MaterialPropertyValue::Float3(_) => ValueType::Float3,
            MaterialPropertyValue::Float4(_) => ValueType::Float4,
            MaterialPropertyValue::Float3_3(_) => ValueType::Float3_3,
            MaterialPropertyValue::Float4_4(_) => ValueType::Float4_4,
            MaterialPropertyValue::FillMode(_) => ValueType::FillMode,
            MaterialPropertyValue::CullMode(_) => ValueType::CullMode,
            MaterialPropertyValue::ConservativeRasterizationMode(_) => {
                ValueType::ConservativeRasterizationMode
            }
            MaterialPropertyValue::DepthWriteMask(_) => ValueType::DepthWriteMask,
            MaterialPropertyValue::ComparisonFunc(_) => ValueType::ComparisonFunc,
            MaterialPropertyValue::Blend(_) => ValueType::Blend,
            MaterialPropertyValue::BlendOp(_) => ValueType::BlendOp,
            MaterialPropertyValue::FilterMode(_) => ValueType::FilterMode,
            MaterialPropertyValue::TextureAddressMode(_) => ValueType::TextureAddressMode,
            MaterialPropertyValue::TextureAssetId(_) => ValueType::TextureAssetId,
            MaterialPropertyValue::GlobalMaterialPropertyId(_) => ValueType::GlobalMaterialPropertyId,
        }
    }

    /// The zero value of a type, or `None` for [`ValueType::Unknown`].
    pub fn default_for(value_type: ValueType) -> Option<Self> {
        let zero = [0u8; MATERIAL_PROPERTY_VALUE_SIZE];
        match value_type {
            ValueType::Unknown => None,
            // Enum types have no zero variant; take the first declared one.
            ValueType::FillMode => Some(Self::FillMode(FillMode::ALL[0])),
            ValueType::CullMode => Some(Self::CullMode(CullMode::ALL[0])),
            ValueType::ConservativeRasterizationMode => Some(Self::ConservativeRasterizationMode(
                ConservativeRasterizationMode::ALL[0],
            )),
            ValueType::DepthWriteMask => Some(Self::DepthWriteMask(DepthWriteMask::ALL[0])),
            ValueType::ComparisonFunc => Some(Self::ComparisonFunc(ComparisonFunc::ALL[0])),
            ValueType::Blend => Some(Self::Blend(Blend::ALL[0])),
            ValueType::BlendOp => Some(Self::BlendOp(BlendOp::ALL[0])),
            ValueType::FilterMode => Some(Self::FilterMode(FilterMode::ALL[0])),
            ValueType::TextureAddressMode => {
                Some(Self::TextureAddressMode(TextureAddressMode::ALL[0]))
            }
            other => Self::from_bytes(other, &zero).ok(),
        }
    }

    /// Writes the little-endian value bytes into `out`, returning the number written.
    ///
    /// `out` must hold at least [`ValueType::byte_size`] bytes.
    pub fn write_bytes(&self, out: &mut [u8]) -> usize {
        let size = self.value_type().byte_size() as usize;
        let out = &mut out[..size];
        match self {
            MaterialPropertyValue::Boolean(value) => put_i32s(out, &[*value as i32]),
            MaterialPropertyValue::Integer(value) => put_i32s(out, &[*value]),
            MaterialPropertyValue::Integer2(value) => put_i32s(out, value),
            MaterialPropertyValue::Integer3(value) => put_i32s(out, value),
            MaterialPropertyValue::Integer4(value) => put_i32s(out, value),
            MaterialPropertyValue::Float(value) => put_f32s(out, &[*value]),
            MaterialPropertyValue::Float2(value) => put_f32s(out, value),
            MaterialPropertyValue::Float3(value) => put_f32s(out, value),
            MaterialPropertyValue::Float4(value) => put_f32s(out, value),
            MaterialPropertyValue::Float3_3(value) => put_f32s(out, value),
            MaterialPropertyValue::Float4_4(value) => put_f32s(out, value),
            MaterialPropertyValue::FillMode(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::CullMode(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::ConservativeRasterizationMode(value) => {
                put_i32s(out, &[value.as_i32()])
            }
            MaterialPropertyValue::DepthWriteMask(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::ComparisonFunc(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::Blend(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::BlendOp(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::FilterMode(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::TextureAddressMode(value) => put_i32s(out, &[value.as_i32()]),
            MaterialPropertyValue::TextureAssetId(value) => {
                out.copy_from_slice(&value.value().to_le_bytes())
            }
            MaterialPropertyValue::GlobalMaterialPropertyId(value) => {
                out.copy_from_slice(&value.value().to_le_bytes())
            }
        }
        size
    }

    /// Decodes a value of `value_type` from little-endian bytes.
    pub fn from_bytes(value_type: ValueType, bytes: &[u8]) -> Result<Self, FormatError> {
        let size = value_type.byte_size() as usize;
        if value_type == ValueType::Unknown || bytes.len() < size {
            return Err(FormatError::InvalidValue {
                field: "value_type",
                value: value_type.as_i32() as i64,
            });
        }
        Ok(match value_type {
            ValueType::Unknown => unreachable!("rejected above"),
            ValueType::Boolean => Self::Boolean(get_i32s::<1>(bytes)[0] != 0),
            ValueType::Integer => Self::Integer(get_i32s::<1>(bytes)[0]),
            ValueType::Integer2 => Self::Integer2(get_i32s(bytes)),
            ValueType::Integer3 => Self::Integer3(get_i32s(bytes)),
            ValueType::Integer4 => Self::Integer4(get_i32s(bytes)),
            ValueType::Float => Self::Float(get_f32s::<1>(bytes)[0]),
            ValueType::Float2 => Self::Float2(get_f32s(bytes)),
            ValueType::Float3 => Self::Float3(get_f32s(bytes)),
            ValueType::Float4 => Self::Float4(get_f32s(bytes)),
            ValueType::Float3_3 => Self::Float3_3(get_f32s(bytes)),
            ValueType::Float4_4 => Self::Float4_4(get_f32s(bytes)),
            ValueType::FillMode => Self::FillMode(enum_value("fill_mode", bytes)?),
            ValueType::CullMode => Self::CullMode(enum_value("cull_mode", bytes)?),
            ValueType::ConservativeRasterizationMode => Self::ConservativeRasterizationMode(
                enum_value("conservative_rasterization_mode", bytes)?,
            ),
            ValueType::DepthWriteMask => Self::DepthWriteMask(enum_value("depth_write_mask", bytes)?),
            ValueType::ComparisonFunc => Self::ComparisonFunc(enum_value("comparison_func", bytes)?),
            ValueType::Blend => Self::Blend(enum_value("blend", bytes)?),
            ValueType::BlendOp => Self::BlendOp(enum_value("blend_op", bytes)?),
            ValueType::FilterMode => Self::FilterMode(enum_value("filter_mode", bytes)?),
            ValueType::TextureAddressMode => {
                Self::TextureAddressMode(enum_value("texture_address_mode", bytes)?)
            }
            ValueType::TextureAssetId => Self::TextureAssetId(AssetId::from_raw(get_u64(bytes))),
            ValueType::GlobalMaterialPropertyId => {
                Self::GlobalMaterialPropertyId(PropertyId::from_raw(get_u64(bytes)))
            }
        })
    }

    /// The value of a shader combination switch: booleans are 0 or 1, integers themselves.
    pub const fn as_combination_value(&self) -> Option<i32> {
        match self {
            MaterialPropertyValue::Boolean(value) => Some(*value as i32),
            MaterialPropertyValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The texture asset of a [`ValueType::TextureAssetId`] value. A zero id means no texture.
    pub fn as_texture_asset_id(&self) -> Option<AssetId> {
        match self {
            MaterialPropertyValue::TextureAssetId(asset_id) if asset_id.value() != 0 => Some(*asset_id),
            _ => None,
        }
    }
}

impl ContentHash for MaterialPropertyValue {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        let mut bytes = [0u8; MATERIAL_PROPERTY_VALUE_SIZE];
        let size = self.write_bytes(&mut bytes);
        hasher.write(&self.value_type()).write_bytes(&bytes[..size]);
    }
}

/// A named material property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialProperty {
    /// Hashed property name.
    pub property_id: PropertyId,
    /// How the property is consumed.
    pub usage: Usage,
    /// The value; for reference usages, the default of the referenced type.
    pub value: MaterialPropertyValue,
    /// The referenced property for reference usages.
    pub reference_id: Option<PropertyId>,
    /// The value was set on this material rather than inherited.
    pub overwritten: bool,
}

impl MaterialProperty {
    /// A property holding a literal value.
    pub fn new(property_id: PropertyId, usage: Usage, value: MaterialPropertyValue) -> Self {
        Self {
            property_id,
            usage,
            value,
            reference_id: None,
            overwritten: false,
        }
    }

    /// A property whose value is resolved through `reference_id` at draw time.
    pub fn reference(
        property_id: PropertyId,
        usage: Usage,
        value_type: ValueType,
        reference_id: PropertyId,
    ) -> Option<Self> {
        Some(Self {
            property_id,
            usage,
            value: MaterialPropertyValue::default_for(value_type)?,
            reference_id: Some(reference_id),
            overwritten: false,
        })
    }

    /// The type of the value.
    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    /// Decodes a record, rejecting unknown usages and value types.
    pub fn from_record(record: &MaterialPropertyRecord) -> Result<Self, FormatError> {
        let usage: Usage = lumen_core::format::decode_enum("usage", record.usage)?;
        let value_type: ValueType = lumen_core::format::decode_enum("value_type", record.value_type)?;
        let value = MaterialPropertyValue::from_bytes(value_type, &record.value)?;
        let reference_id = if usage.is_reference() {
            if record.reference_id == 0 {
                return Err(FormatError::InvalidValue {
                    field: "reference_id",
                    value: 0,
                });
            }
            Some(PropertyId::from_raw(record.reference_id))
        } else {
            None
        };
        Ok(Self {
            property_id: PropertyId::from_raw(record.property_id),
            usage,
            value,
            reference_id,
            overwritten: false,
        })
    }

    /// Encodes the property as a record.
    pub fn to_record(&self, visual_importance: i32, maximum_integer_value: i32) -> MaterialPropertyRecord {
        let mut value = [0u8; MATERIAL_PROPERTY_VALUE_SIZE];
        self.value.write_bytes(&mut value);
        MaterialPropertyRecord {
            property_id: self.property_id.value(),
            reference_id: self.reference_id.map_or(0, PropertyId::value),
            usage: self.usage.as_i32(),
            value_type: self.value_type().as_i32(),
            visual_importance,
            maximum_integer_value,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_follow_gpu_packing() {
        assert_eq!(ValueType::Boolean.byte_size(), 4);
        assert_eq!(ValueType::Float4.byte_size(), 16);
        assert_eq!(ValueType::Float4_4.byte_size(), 64);
        for value_type in ValueType::ALL {
            assert!(value_type.byte_size() as usize <= MATERIAL_PROPERTY_VALUE_SIZE);
        }
    }

    #[test]
    fn record_conversion_keeps_the_value() {
        let property = MaterialProperty::new(
            PropertyId::from_name("DiffuseColor"),
            Usage::ShaderUniform,
            MaterialPropertyValue::Float3([0.25, 0.5, 1.0]),
        );
        let decoded = MaterialProperty::from_record(&property.to_record(0, 0)).unwrap();
        assert_eq!(decoded, property);
    }

    #[test]
    fn references_require_a_target() {
        let property = MaterialProperty::reference(
            PropertyId::from_name("WorldSpaceToClipSpaceMatrix"),
            Usage::PassReference,
            ValueType::Float4_4,
            PropertyId::from_name("@WorldSpaceToClipSpaceMatrix"),
        )
        .unwrap();
        let mut record = property.to_record(0, 0);
        assert_eq!(MaterialProperty::from_record(&record).unwrap(), property);
        record.reference_id = 0;
        assert!(MaterialProperty::from_record(&record).is_err());
    }

    #[test]
    fn enum_values_are_validated() {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&77i32.to_le_bytes());
        assert!(MaterialPropertyValue::from_bytes(ValueType::CullMode, &bytes).is_err());
        bytes.copy_from_slice(&CullMode::None.as_i32().to_le_bytes());
        assert_eq!(
            MaterialPropertyValue::from_bytes(ValueType::CullMode, &bytes).unwrap(),
            MaterialPropertyValue::CullMode(CullMode::None)
        );
    }

    #[test]
    fn combination_values() {
        assert_eq!(MaterialPropertyValue::Boolean(true).as_combination_value(), Some(1));
        assert_eq!(MaterialPropertyValue::Integer(3).as_combination_value(), Some(3));
        assert_eq!(MaterialPropertyValue::Float(1.0).as_combination_value(), None);
    }
}
