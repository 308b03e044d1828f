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

//! Material blueprint sources.

use crate::error::ToolkitError;
use crate::property::PropertyDefinition;
use lumen_core::asset::AssetId;
use lumen_core::format::{
    DescriptorRangeRecord, MaterialBlueprintFile, PipelineStateRecord, SamplerStateRecord,
    ShaderBlueprintsRecord, TextureBufferRecord, TextureRecord, UniformBufferRecord,
    UniformBufferSection, VertexAttributeRecord,
};
use lumen_core::renderer::api::{
    DescriptorRange, PipelineStateTemplate, SamplerState, ShaderType, VertexAttribute,
};
use lumen_runtime::blueprint::BlueprintBufferUsage;
use serde::Deserialize;

/// A material blueprint source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialBlueprintSource {
    /// Material properties with their defaults.
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
    /// Root parameters, each a descriptor table of ranges.
    #[serde(default)]
    pub root_signature: Vec<Vec<DescriptorRange>>,
    /// Vertex input layout.
    #[serde(default)]
    pub vertex_attributes: Vec<VertexAttribute>,
    /// Fixed-function state; omitted fields keep their defaults.
    #[serde(default)]
    pub pipeline_state: PipelineStateTemplate,
    /// Shader blueprint asset names per stage.
    #[serde(default)]
    pub shader_blueprints: ShaderBlueprintsSource,
    /// Uniform buffers.
    #[serde(default)]
    pub uniform_buffers: Vec<UniformBufferSource>,
    /// Texture buffers.
    #[serde(default)]
    pub texture_buffers: Vec<TextureBufferSource>,
    /// Named sampler states.
    #[serde(default)]
    pub sampler_states: Vec<SamplerStateSource>,
    /// Texture slots.
    #[serde(default)]
    pub textures: Vec<TextureSource>,
}

/// Shader blueprint asset names, one optional entry per stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct ShaderBlueprintsSource {
    pub vertex: Option<String>,
    pub tessellation_control: Option<String>,
    pub tessellation_evaluation: Option<String>,
    pub geometry: Option<String>,
    pub fragment: Option<String>,
}

impl ShaderBlueprintsSource {
    fn asset_name(&self, shader_type: ShaderType) -> Option<&str> {
        match shader_type {
            ShaderType::Vertex => self.vertex.as_deref(),
            ShaderType::TessellationControl => self.tessellation_control.as_deref(),
            ShaderType::TessellationEvaluation => self.tessellation_evaluation.as_deref(),
            ShaderType::Geometry => self.geometry.as_deref(),
            ShaderType::Fragment => self.fragment.as_deref(),
        }
    }

    fn to_record(&self) -> Result<ShaderBlueprintsRecord, ToolkitError> {
        let mut record = ShaderBlueprintsRecord::default();
        for shader_type in ShaderType::ALL {
            if let Some(name) = self.asset_name(*shader_type) {
                record.asset_ids[shader_type.as_i32() as usize] =
                    AssetId::from_asset_name(name)?.value();
            }
        }
        Ok(record)
    }
}

fn one() -> u32 {
    1
}

/// A uniform buffer declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniformBufferSource {
    /// Root parameter the buffer binds to.
    pub root_parameter_index: u32,
    /// Which manager fills the buffer.
    pub usage: BlueprintBufferUsage,
    /// Number of elements, one per material slot or instance.
    #[serde(default = "one")]
    pub number_of_elements: u32,
    /// Element properties in packing order.
    pub element_properties: Vec<PropertyDefinition>,
}

/// A texture buffer declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextureBufferSource {
    /// Root parameter the buffer binds to.
    pub root_parameter_index: u32,
    /// Which manager fills the buffer.
    pub usage: BlueprintBufferUsage,
    /// The property resolved into the buffer.
    pub value: PropertyDefinition,
}

/// A named sampler state; state fields sit next to the name.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerStateSource {
    /// Name textures use to pick the sampler.
    pub name: String,
    /// Root parameter the sampler binds to.
    pub root_parameter_index: u32,
    /// The state; omitted fields keep their defaults.
    #[serde(flatten)]
    pub state: SamplerState,
}

/// A texture slot.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextureSource {
    /// Property naming the texture, usually a material reference.
    pub property: PropertyDefinition,
    /// Texture asset bound until the real one is available.
    #[serde(default)]
    pub fallback_texture: Option<String>,
    /// Root parameter the texture binds to.
    pub root_parameter_index: u32,
    /// Name of a declared sampler state.
    #[serde(default)]
    pub sampler_state: Option<String>,
    /// Sample with sRGB to linear conversion.
    #[serde(default)]
    pub rgb_hardware_gamma_correction: bool,
}

impl MaterialBlueprintSource {
    /// Parses a JSON source.
    pub fn parse(source: &str) -> Result<Self, ToolkitError> {
        serde_json::from_str(source).map_err(|source| ToolkitError::Json {
            kind: "material blueprint",
            source,
        })
    }

    /// Asset names of the shader blueprints the blueprint uses.
    pub fn shader_blueprint_names(&self) -> impl Iterator<Item = &str> {
        ShaderType::ALL
            .iter()
            .filter_map(|shader_type| self.shader_blueprints.asset_name(*shader_type))
    }

    /// Builds the compiled file.
    pub fn to_file(&self) -> Result<MaterialBlueprintFile, ToolkitError> {
        let properties = self
            .properties
            .iter()
            .map(PropertyDefinition::to_record)
            .collect::<Result<_, _>>()?;

        let uniform_buffers = self
            .uniform_buffers
            .iter()
            .map(|buffer| {
                let element_properties = buffer
                    .element_properties
                    .iter()
                    .map(PropertyDefinition::to_record)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(UniformBufferSection {
                    header: UniformBufferRecord {
                        root_parameter_index: buffer.root_parameter_index,
                        buffer_usage: buffer.usage.as_i32(),
                        number_of_elements: buffer.number_of_elements,
                        number_of_element_properties: element_properties.len() as u32,
                    },
                    element_properties,
                })
            })
            .collect::<Result<_, ToolkitError>>()?;

        let texture_buffers = self
            .texture_buffers
            .iter()
            .map(|buffer| {
                Ok(TextureBufferRecord {
                    value: buffer.value.to_record()?,
                    root_parameter_index: buffer.root_parameter_index,
                    buffer_usage: buffer.usage.as_i32(),
                })
            })
            .collect::<Result<_, ToolkitError>>()?;

        let textures = self
            .textures
            .iter()
            .map(|texture| self.texture_record(texture))
            .collect::<Result<_, _>>()?;

        Ok(MaterialBlueprintFile {
            properties,
            root_parameters: self
                .root_signature
                .iter()
                .map(|ranges| ranges.iter().map(DescriptorRangeRecord::from).collect())
                .collect(),
            vertex_attributes: self
                .vertex_attributes
                .iter()
                .map(VertexAttributeRecord::from)
                .collect(),
            pipeline_state: PipelineStateRecord::from(&self.pipeline_state),
            shader_blueprints: self.shader_blueprints.to_record()?,
            uniform_buffers,
            texture_buffers,
            sampler_states: self
                .sampler_states
                .iter()
                .map(|sampler| SamplerStateRecord::new(sampler.root_parameter_index, &sampler.state))
                .collect(),
            textures,
        })
    }

    fn texture_record(&self, texture: &TextureSource) -> Result<TextureRecord, ToolkitError> {
        let sampler_state_index = match &texture.sampler_state {
            None => u32::MAX,
            Some(name) => self
                .sampler_states
                .iter()
                .position(|sampler| &sampler.name == name)
                .ok_or_else(|| ToolkitError::UnknownSamplerState {
                    texture: texture.property.name.clone(),
                    sampler_state: name.clone(),
                })? as u32,
        };
        let fallback_texture_asset_id = match &texture.fallback_texture {
            Some(name) => AssetId::from_asset_name(name)?.value(),
            None => 0,
        };
        Ok(TextureRecord {
            material_property: texture.property.to_record()?,
            fallback_texture_asset_id,
            root_parameter_index: texture.root_parameter_index,
            sampler_state_index,
            rgb_hardware_gamma_correction: u32::from(texture.rgb_hardware_gamma_correction),
            reserved: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::api::CullMode;

    const FORWARD: &str = r#"{
        "properties": [
            { "name": "USE_NORMAL_MAP", "usage": "ShaderCombination", "value_type": "Boolean",
              "value": false, "visual_importance": 100, "maximum_integer_value": 1 },
            { "name": "CullMode", "usage": "RasterizerState", "value_type": "CullMode", "value": "Back" }
        ],
        "root_signature": [[
            { "range_type": "Ubv", "number_of_descriptors": 1, "base_shader_register": 0,
              "base_shader_register_name": "PassUniformBuffer", "shader_visibility": "All" }
        ]],
        "pipeline_state": { "rasterizer_state": { "cull_mode": "None" } },
        "shader_blueprints": {
            "vertex": "Example/ShaderBlueprint/Mesh/Vertex",
            "fragment": "Example/ShaderBlueprint/Mesh/Fragment"
        },
        "uniform_buffers": [{
            "root_parameter_index": 0,
            "usage": "Pass",
            "element_properties": [
                { "name": "WorldSpaceToClipSpaceMatrix", "usage": "PassReference",
                  "value_type": "Float4_4", "reference": "@WorldSpaceToClipSpaceMatrix" }
            ]
        }],
        "sampler_states": [{ "name": "Linear", "root_parameter_index": 0, "max_anisotropy": 4 }],
        "textures": [{
            "property": { "name": "NormalMap", "usage": "TextureReference", "value_type": "TextureAssetId",
                          "value": "Lumen/Texture/Default/NormalMap" },
            "root_parameter_index": 0,
            "sampler_state": "Linear"
        }]
    }"#;

    #[test]
    fn sources_compile_into_readable_blueprints() {
        let file = MaterialBlueprintSource::parse(FORWARD).unwrap().to_file().unwrap();
        let read = MaterialBlueprintFile::read(&file.write()).unwrap();
        assert_eq!(read.properties.len(), 2);
        assert_eq!(read.properties[0].visual_importance, 100);
        assert_eq!(read.root_parameters.len(), 1);
        assert_eq!(
            read.shader_blueprints.asset_ids[ShaderType::Fragment.as_i32() as usize],
            AssetId::from_name("Example/ShaderBlueprint/Mesh/Fragment").value()
        );
        assert_eq!(read.shader_blueprints.asset_ids[ShaderType::Geometry.as_i32() as usize], 0);
        assert_eq!(read.uniform_buffers[0].header.number_of_elements, 1);
        assert_eq!(read.textures[0].sampler_state_index, 0);
        assert_eq!(read.sampler_states[0].max_anisotropy, 4);

        let template = PipelineStateTemplate::try_from(&read.pipeline_state).unwrap();
        assert_eq!(template.rasterizer_state.cull_mode, CullMode::None);
    }

    #[test]
    fn textures_must_name_declared_samplers() {
        let source = FORWARD.replace(r#""sampler_state": "Linear""#, r#""sampler_state": "Point""#);
        let result = MaterialBlueprintSource::parse(&source).unwrap().to_file();
        assert!(matches!(
            result,
            Err(ToolkitError::UnknownSamplerState { ref sampler_state, .. }) if sampler_state == "Point"
        ));
    }
}
