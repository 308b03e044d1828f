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

//! The material blueprint resource.

use super::state::apply_state_property;
use crate::buffer::UniformBufferLayout;
use crate::error::BlueprintError;
use crate::material::{MaterialProperties, MaterialProperty, MaterialPropertyValue, Usage};
use crate::shader::{ShaderBlueprintResource, ShaderBlueprintResourceManager, ShaderProperties};
use lumen_core::asset::AssetId;
use lumen_core::format::{decode_enum, MaterialBlueprintFile, NUMBER_OF_SHADER_TYPES};
use lumen_core::renderer::api::{
    DescriptorRange, PipelineStateTemplate, RootParameter, RootSignatureDescriptor,
    RootSignatureId, SamplerState, SamplerStateId, ShaderType, VertexAttribute, VertexAttributes,
};
use lumen_core::renderer::{GpuHandle, RenderDevice};
use lumen_core::PropertyId;
use std::sync::Arc;

lumen_core::lumen_int_enum! {
    /// Which manager fills a uniform or texture buffer.
    pub enum BlueprintBufferUsage {
        /// Not filled by the runtime.
        Unknown = 0,
        /// Per material, filled by the material buffer manager.
        Material = 1,
        /// Per draw, filled by the instance buffer manager.
        Instance = 2,
        /// Per pass, filled by the pass buffer manager.
        Pass = 3,
    }
}

/// Importance data of a shader combination property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderCombinationProperty {
    /// The switch.
    pub property_id: PropertyId,
    /// Higher values are dropped last when looking for a fallback pipeline state.
    pub visual_importance: i32,
    /// Largest meaningful value; larger values are clamped. Zero means unbounded.
    pub maximum_integer_value: i32,
}

/// A declared uniform buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBufferDeclaration {
    /// Root parameter the buffer binds to.
    pub root_parameter_index: u32,
    /// Which manager fills it.
    pub usage: BlueprintBufferUsage,
    /// Layout of its elements.
    pub layout: UniformBufferLayout,
}

/// A declared texture buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBufferDeclaration {
    /// Property resolved to fill the buffer.
    pub property: MaterialProperty,
    /// Root parameter the buffer binds to.
    pub root_parameter_index: u32,
    /// Which manager fills it.
    pub usage: BlueprintBufferUsage,
}

/// A declared sampler state with its GPU object.
#[derive(Debug, Clone)]
pub struct SamplerStateDeclaration {
    /// Root parameter the sampler binds to.
    pub root_parameter_index: u32,
    /// The state.
    pub state: SamplerState,
    /// The GPU object.
    pub sampler_state: GpuHandle<SamplerStateId>,
}

/// A declared texture slot.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDeclaration {
    /// Property naming the texture asset, directly or through a reference.
    pub property: MaterialProperty,
    /// Texture used while the named one is not available.
    pub fallback_texture_asset_id: Option<AssetId>,
    /// Root parameter the texture binds to.
    pub root_parameter_index: u32,
    /// Index into the blueprint sampler states.
    pub sampler_state_index: Option<u32>,
    /// Sample with sRGB to linear conversion.
    pub rgb_hardware_gamma_correction: bool,
}

/// A loaded material blueprint.
///
/// Immutable once built; hot reload replaces the whole resource.
#[derive(Debug, Clone)]
pub struct MaterialBlueprintResource {
    asset_id: AssetId,
    properties: MaterialProperties,
    shader_combination_properties: Vec<ShaderCombinationProperty>,
    root_signature_descriptor: RootSignatureDescriptor,
    root_signature: GpuHandle<RootSignatureId>,
    vertex_attributes: VertexAttributes,
    pipeline_state_template: PipelineStateTemplate,
    shader_blueprints: [Option<Arc<ShaderBlueprintResource>>; NUMBER_OF_SHADER_TYPES],
    uniform_buffers: Vec<UniformBufferDeclaration>,
    texture_buffers: Vec<TextureBufferDeclaration>,
    sampler_states: Vec<SamplerStateDeclaration>,
    textures: Vec<TextureDeclaration>,
    referenced_shader_properties: Vec<PropertyId>,
    state_properties: Vec<MaterialProperty>,
}

fn check_root_parameter(
    section: &'static str,
    index: usize,
    root_parameter_index: u32,
    number_of_root_parameters: usize,
) -> Result<(), BlueprintError> {
    if root_parameter_index as usize >= number_of_root_parameters {
        return Err(BlueprintError::RootParameterOutOfRange {
            section,
            index,
            root_parameter_index,
            number_of_root_parameters,
        });
    }
    Ok(())
}

impl MaterialBlueprintResource {
    /// Builds a blueprint from its compiled file.
    ///
    /// Shader blueprints must be loaded first. Uniform buffer sizes are checked
    /// against the device limit and every root parameter index against the
    /// root signature; any violation fails the whole blueprint.
    pub fn load(
        asset_id: AssetId,
        file: &MaterialBlueprintFile,
        device: &RenderDevice,
        shader_blueprints: &ShaderBlueprintResourceManager,
    ) -> Result<Self, BlueprintError> {
        let mut properties = Vec::with_capacity(file.properties.len());
        let mut shader_combination_properties = Vec::new();
        for record in &file.properties {
            let property = MaterialProperty::from_record(record)?;
            if property.usage == Usage::ShaderCombination {
                shader_combination_properties.push(ShaderCombinationProperty {
                    property_id: property.property_id,
                    visual_importance: record.visual_importance,
                    maximum_integer_value: record.maximum_integer_value,
                });
            }
            properties.push(property);
        }
        shader_combination_properties.sort_by_key(|meta| meta.property_id);

        let root_signature_descriptor = RootSignatureDescriptor {
            parameters: file
                .root_parameters
                .iter()
                .map(|ranges| {
                    Ok(RootParameter {
                        descriptor_ranges: ranges
                            .iter()
                            .map(DescriptorRange::try_from)
                            .collect::<Result<_, _>>()?,
                    })
                })
                .collect::<Result<_, BlueprintError>>()?,
        };
        let number_of_root_parameters = root_signature_descriptor.number_of_parameters();

        let vertex_attributes = VertexAttributes {
            attributes: file
                .vertex_attributes
                .iter()
                .map(VertexAttribute::try_from)
                .collect::<Result<_, _>>()?,
        };
        let pipeline_state_template = PipelineStateTemplate::try_from(&file.pipeline_state)?;

        let mut blueprints: [Option<Arc<ShaderBlueprintResource>>; NUMBER_OF_SHADER_TYPES] =
            Default::default();
        for (slot, raw) in blueprints.iter_mut().zip(file.shader_blueprints.asset_ids) {
            if raw == 0 {
                continue;
            }
            let shader_blueprint_asset_id = AssetId::from_raw(raw);
            *slot = Some(
                shader_blueprints
                    .get(shader_blueprint_asset_id)
                    .ok_or(BlueprintError::ShaderBlueprintNotLoaded(shader_blueprint_asset_id))?,
            );
        }

        let limit = device.capabilities().maximum_uniform_buffer_size;
        let mut uniform_buffers = Vec::with_capacity(file.uniform_buffers.len());
        for (index, section) in file.uniform_buffers.iter().enumerate() {
            check_root_parameter(
                "uniform buffer",
                index,
                section.header.root_parameter_index,
                number_of_root_parameters,
            )?;
            let element_properties = section
                .element_properties
                .iter()
                .map(MaterialProperty::from_record)
                .collect::<Result<Vec<_>, _>>()?;
            let layout =
                UniformBufferLayout::new(element_properties, section.header.number_of_elements);
            if layout.size() > limit {
                return Err(BlueprintError::UniformBufferTooLarge {
                    index,
                    size: layout.size(),
                    limit,
                });
            }
            uniform_buffers.push(UniformBufferDeclaration {
                root_parameter_index: section.header.root_parameter_index,
                usage: decode_enum("buffer_usage", section.header.buffer_usage)?,
                layout,
            });
        }

        let mut texture_buffers = Vec::with_capacity(file.texture_buffers.len());
        for (index, record) in file.texture_buffers.iter().enumerate() {
            check_root_parameter(
                "texture buffer",
                index,
                record.root_parameter_index,
                number_of_root_parameters,
            )?;
            texture_buffers.push(TextureBufferDeclaration {
                property: MaterialProperty::from_record(&record.value)?,
                root_parameter_index: record.root_parameter_index,
                usage: decode_enum("buffer_usage", record.buffer_usage)?,
            });
        }

        let mut sampler_states = Vec::with_capacity(file.sampler_states.len());
        for (index, record) in file.sampler_states.iter().enumerate() {
            check_root_parameter(
                "sampler state",
                index,
                record.root_parameter_index,
                number_of_root_parameters,
            )?;
            let state = record.sampler_state()?;
            sampler_states.push(SamplerStateDeclaration {
                root_parameter_index: record.root_parameter_index,
                state,
                sampler_state: device.create_sampler_state(&state)?,
            });
        }

        let mut textures = Vec::with_capacity(file.textures.len());
        for (index, record) in file.textures.iter().enumerate() {
            check_root_parameter(
                "texture",
                index,
                record.root_parameter_index,
                number_of_root_parameters,
            )?;
            let sampler_state_index = match record.sampler_state_index {
                u32::MAX => None,
                sampler_state_index if sampler_state_index as usize >= sampler_states.len() => {
                    return Err(BlueprintError::SamplerStateOutOfRange {
                        index,
                        sampler_state_index,
                        number_of_sampler_states: sampler_states.len(),
                    })
                }
                sampler_state_index => Some(sampler_state_index),
            };
            textures.push(TextureDeclaration {
                property: MaterialProperty::from_record(&record.material_property)?,
                fallback_texture_asset_id: (record.fallback_texture_asset_id != 0)
                    .then(|| AssetId::from_raw(record.fallback_texture_asset_id)),
                root_parameter_index: record.root_parameter_index,
                sampler_state_index,
                rgb_hardware_gamma_correction: record.rgb_hardware_gamma_correction != 0,
            });
        }

        let mut state_properties = Vec::new();
        for property in properties.iter().filter(|property| property.usage.is_pipeline_state()) {
            let mut scratch = pipeline_state_template.clone();
            if apply_state_property(&mut scratch, property.property_id, &property.value) {
                state_properties.push(*property);
            } else {
                log::warn!(
                    "Blueprint {} declares state property {} which matches no {:?} field",
                    asset_id,
                    property.property_id,
                    property.usage
                );
            }
        }
        state_properties.sort_by_key(|property| property.property_id);

        let root_signature = device.create_root_signature(&root_signature_descriptor)?;
        let mut resource = Self {
            asset_id,
            properties: MaterialProperties::from_properties(properties),
            shader_combination_properties,
            root_signature_descriptor,
            root_signature,
            vertex_attributes,
            pipeline_state_template,
            shader_blueprints: blueprints,
            uniform_buffers,
            texture_buffers,
            sampler_states,
            textures,
            referenced_shader_properties: Vec::new(),
            state_properties,
        };
        resource.update_referenced_shader_properties();
        log::info!(
            "Material blueprint {} loaded: {} properties, {} uniform buffers, {} textures",
            asset_id,
            resource.properties.len(),
            resource.uniform_buffers.len(),
            resource.textures.len()
        );
        Ok(resource)
    }

    fn update_referenced_shader_properties(&mut self) {
        let mut referenced: Vec<PropertyId> = self
            .shader_blueprints
            .iter()
            .flatten()
            .flat_map(|blueprint| blueprint.referenced_properties().iter().copied())
            .collect();
        referenced.sort();
        referenced.dedup();
        self.referenced_shader_properties = referenced;
    }

    /// A copy using the current version of its shader blueprints.
    pub fn with_refreshed_shader_blueprints(&self, shader_blueprints: &ShaderBlueprintResourceManager) -> Self {
        let mut resource = self.clone();
        for slot in resource.shader_blueprints.iter_mut().flatten() {
            if let Some(current) = shader_blueprints.get(slot.asset_id()) {
                *slot = current;
            }
        }
        resource.update_referenced_shader_properties();
        resource
    }

    /// The blueprint asset.
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// Declared properties with their default values.
    pub fn properties(&self) -> &MaterialProperties {
        &self.properties
    }

    /// Shader combination properties with their importance, sorted by id.
    pub fn shader_combination_properties(&self) -> &[ShaderCombinationProperty] {
        &self.shader_combination_properties
    }

    /// The root signature layout.
    pub fn root_signature_descriptor(&self) -> &RootSignatureDescriptor {
        &self.root_signature_descriptor
    }

    /// The root signature object.
    pub fn root_signature(&self) -> &GpuHandle<RootSignatureId> {
        &self.root_signature
    }

    /// Vertex input layout.
    pub fn vertex_attributes(&self) -> &VertexAttributes {
        &self.vertex_attributes
    }

    /// Fixed-function state before material overrides.
    pub fn pipeline_state_template(&self) -> &PipelineStateTemplate {
        &self.pipeline_state_template
    }

    /// Declared state properties that map onto a template field, sorted by id.
    pub fn state_properties(&self) -> &[MaterialProperty] {
        &self.state_properties
    }

    /// The shader blueprint of a shader type.
    pub fn shader_blueprint(&self, shader_type: ShaderType) -> Option<&Arc<ShaderBlueprintResource>> {
        self.shader_blueprints
            .get(shader_type.as_i32() as usize)
            .and_then(Option::as_ref)
    }

    /// Shader types with a shader blueprint, in pipeline order.
    pub fn shader_types(&self) -> impl Iterator<Item = ShaderType> + '_ {
        ShaderType::ALL
            .iter()
            .copied()
            .filter(|shader_type| self.shader_blueprint(*shader_type).is_some())
    }

    /// Returns `true` if one of the shader blueprints is `shader_blueprint_asset_id`.
    pub fn uses_shader_blueprint(&self, shader_blueprint_asset_id: AssetId) -> bool {
        self.shader_blueprints
            .iter()
            .flatten()
            .any(|blueprint| blueprint.asset_id() == shader_blueprint_asset_id)
    }

    /// Declared uniform buffers.
    pub fn uniform_buffers(&self) -> &[UniformBufferDeclaration] {
        &self.uniform_buffers
    }

    /// The first uniform buffer with the given usage.
    pub fn uniform_buffer(&self, usage: BlueprintBufferUsage) -> Option<&UniformBufferDeclaration> {
        self.uniform_buffers.iter().find(|buffer| buffer.usage == usage)
    }

    /// Declared texture buffers.
    pub fn texture_buffers(&self) -> &[TextureBufferDeclaration] {
        &self.texture_buffers
    }

    /// Declared sampler states.
    pub fn sampler_states(&self) -> &[SamplerStateDeclaration] {
        &self.sampler_states
    }

    /// Declared textures.
    pub fn textures(&self) -> &[TextureDeclaration] {
        &self.textures
    }

    /// Switches read by any shader blueprint, sorted.
    pub fn referenced_shader_properties(&self) -> &[PropertyId] {
        &self.referenced_shader_properties
    }

    /// Importance data of a switch.
    pub fn shader_combination_property(&self, property_id: PropertyId) -> Option<&ShaderCombinationProperty> {
        self.shader_combination_properties
            .binary_search_by_key(&property_id, |meta| meta.property_id)
            .ok()
            .map(|index| &self.shader_combination_properties[index])
    }

    /// Reads the shader combination switches of a material, falling back to the
    /// blueprint defaults.
    pub fn shader_properties_for(&self, material: &MaterialProperties) -> ShaderProperties {
        let mut shader_properties = ShaderProperties::new();
        for default in self.properties.with_usage(Usage::ShaderCombination) {
            let value = material
                .get(default.property_id)
                .filter(|property| property.value_type() == default.value_type())
                .map_or(&default.value, |property| &property.value);
            match value.as_combination_value() {
                Some(value) => shader_properties.set(default.property_id, value),
                None => log::warn!(
                    "Shader combination property {} of blueprint {} is a {:?}, expected a boolean or integer",
                    default.property_id,
                    self.asset_id,
                    value.value_type()
                ),
            }
        }
        shader_properties
    }

    /// The blueprint defaults overlaid with the values a material sets.
    /// Material values of another type than the declared one are ignored.
    pub fn effective_properties(&self, material: &MaterialProperties) -> MaterialProperties {
        let mut effective = self.properties.clone();
        for property in material {
            let declared = effective.get(property.property_id).map(MaterialProperty::value_type);
            if declared.map_or(true, |value_type| value_type == property.value_type()) {
                effective.set_property(*property);
            }
        }
        effective
    }

    /// Keeps the switches the shaders read, drops zero values and clamps each
    /// value to its declared maximum.
    pub fn optimize_shader_properties(&self, shader_properties: &ShaderProperties) -> ShaderProperties {
        ShaderProperties::from_pairs(shader_properties.iter().filter_map(|(property_id, value)| {
            if self
                .referenced_shader_properties
                .binary_search(&property_id)
                .is_err()
            {
                return None;
            }
            let maximum = self
                .shader_combination_property(property_id)
                .map_or(0, |meta| meta.maximum_integer_value);
            Some((property_id, if maximum > 0 { value.min(maximum) } else { value }))
        }))
    }

    /// The fixed-function state of a material: the template with the blueprint
    /// defaults and then the material values of every state property applied.
    ///
    /// Also returns the material values that were applied, sorted by id.
    /// State properties matching no template field were dropped at load.
    pub fn pipeline_state_for(
        &self,
        material: &MaterialProperties,
    ) -> (PipelineStateTemplate, Vec<(PropertyId, MaterialPropertyValue)>) {
        let mut template = self.pipeline_state_template.clone();
        let mut overrides = Vec::new();
        for default in &self.state_properties {
            apply_state_property(&mut template, default.property_id, &default.value);
            if let Some(property) = material.get(default.property_id) {
                if property.value != default.value
                    && apply_state_property(&mut template, property.property_id, &property.value)
                {
                    overrides.push((property.property_id, property.value));
                }
            }
        }
        (template, overrides)
    }
}
