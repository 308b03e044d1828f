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

//! Devices and compiled assets shared by the runtime integration tests.

#![allow(dead_code)]

use lumen_core::asset::{AssetId, AssetPackage};
use lumen_core::format::{
    write_shader_source, AssetFormat, ClearPassRecord, CompositorNodeFile, CompositorPassRecord,
    CompositorTargetSection, DescriptorRangeRecord, FramebufferRecord, MaterialBlueprintFile,
    MaterialFile, MaterialPropertyRecord, MaterialTechniqueRecord, PipelineStateRecord,
    RenderTargetTextureRecord, ScenePassRecord, ShaderBlueprintsRecord, UniformBufferRecord,
    UniformBufferSection, MAX_FRAMEBUFFER_COLOR_TEXTURES,
};
use lumen_core::renderer::api::{
    ClearFlags, CullMode, DescriptorRange, DescriptorRangeType, PipelineStateTemplate,
    ShaderType, ShaderVisibility, TextureFormat,
};
use lumen_core::renderer::RenderDevice;
use lumen_core::{MaterialTechniqueId, PropertyId};
use lumen_infra::{HeadlessBackendConfig, HeadlessRenderBackend};
use lumen_runtime::blueprint::BlueprintBufferUsage;
use lumen_runtime::material::{MaterialProperty, MaterialPropertyValue, Usage, ValueType};
use lumen_runtime::{RendererRuntime, RuntimeConfig, RuntimeError};
use std::sync::Arc;

pub const LIGHTING_PIECE: &str = "Example/ShaderPiece/Mesh/Lighting";
pub const VERTEX: &str = "Example/ShaderBlueprint/Mesh/Vertex";
pub const FRAGMENT: &str = "Example/ShaderBlueprint/Mesh/Fragment";
pub const BLUEPRINT: &str = "Example/MaterialBlueprint/Mesh/Forward";
pub const BASE_MATERIAL: &str = "Example/Material/Default/Base";
pub const STONE_MATERIAL: &str = "Example/Material/Default/Stone";
pub const COMPOSITOR_NODE: &str = "Example/CompositorNode/Default/Forward";
pub const HDR_COLOR: &str = "Example/Texture/Compositor/HdrColor";
pub const HDR_DEPTH: &str = "Example/Texture/Compositor/HdrDepth";
pub const HDR_FRAMEBUFFER: &str = "Example/Framebuffer/Compositor/Hdr";

pub const FORWARD: MaterialTechniqueId = MaterialTechniqueId::from_name("Forward");
pub const USE_NORMAL_MAP: PropertyId = PropertyId::from_name("USE_NORMAL_MAP");
pub const USE_DETAIL_MAP: PropertyId = PropertyId::from_name("USE_DETAIL_MAP");
pub const USE_BROKEN_PATH: PropertyId = PropertyId::from_name("USE_BROKEN_PATH");
pub const USE_UNREAD_SWITCH: PropertyId = PropertyId::from_name("USE_UNREAD_SWITCH");
pub const DIFFUSE_COLOR: PropertyId = PropertyId::from_name("DiffuseColor");
pub const CULL_MODE: PropertyId = PropertyId::from_name("CullMode");

/// Text the headless backend refuses to compile.
pub const REJECTED_MARKER: &str = "#error";

pub const LIGHTING_SOURCE: &str = "\
@piece(Lighting)
vec3 lighting(vec3 normal) { return normal; }
@end
";

pub const VERTEX_SOURCE: &str = "void main() { gl_Position = vec4(0.0); }\n";

// USE_DETAIL_MAP is read but changes nothing, so both of its combinations
// share one source.
pub const FRAGMENT_SOURCE: &str = "\
@includepiece(Example/ShaderPiece/Mesh/Lighting)
@insertpiece(Lighting)
@property(USE_NORMAL_MAP)
vec3 normal = sampleNormalMap();
@else
vec3 normal = vec3(0.0, 0.0, 1.0);
@end
@property(USE_DETAIL_MAP)
@end
@property(USE_BROKEN_PATH)
#error unsupported combination
@end
void main() {}
";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn headless(config: HeadlessBackendConfig) -> (Arc<HeadlessRenderBackend>, RenderDevice) {
    let backend = Arc::new(HeadlessRenderBackend::with_config(config));
    let device = RenderDevice::new(backend.clone());
    (backend, device)
}

/// A backend refusing shaders of the broken combination.
pub fn strict_headless() -> (Arc<HeadlessRenderBackend>, RenderDevice) {
    headless(HeadlessBackendConfig {
        reject_shader_marker: Some(REJECTED_MARKER.to_string()),
        ..HeadlessBackendConfig::default()
    })
}

fn record(property: MaterialProperty, visual_importance: i32, maximum_integer_value: i32) -> MaterialPropertyRecord {
    property.to_record(visual_importance, maximum_integer_value)
}

pub fn switch(property_id: PropertyId, visual_importance: i32) -> MaterialPropertyRecord {
    record(
        MaterialProperty::new(
            property_id,
            Usage::ShaderCombination,
            MaterialPropertyValue::Boolean(false),
        ),
        visual_importance,
        1,
    )
}

pub fn uniform(name: &str, value: MaterialPropertyValue) -> MaterialPropertyRecord {
    record(
        MaterialProperty::new(PropertyId::from_name(name), Usage::ShaderUniform, value),
        0,
        0,
    )
}

pub fn reference(name: &str, usage: Usage, value_type: ValueType, target: &str) -> MaterialPropertyRecord {
    let property = MaterialProperty::reference(
        PropertyId::from_name(name),
        usage,
        value_type,
        PropertyId::from_name(target),
    )
    .expect("reference of a known value type");
    record(property, 0, 0)
}

fn uniform_buffer_range(register: u32, name: &str) -> Vec<DescriptorRangeRecord> {
    vec![DescriptorRangeRecord::from(&DescriptorRange {
        range_type: DescriptorRangeType::Ubv,
        number_of_descriptors: 1,
        base_shader_register: register,
        base_shader_register_name: name.to_string(),
        shader_visibility: ShaderVisibility::All,
    })]
}

fn uniform_buffer(
    root_parameter_index: u32,
    usage: BlueprintBufferUsage,
    number_of_elements: u32,
    element_properties: Vec<MaterialPropertyRecord>,
) -> UniformBufferSection {
    UniformBufferSection {
        header: UniformBufferRecord {
            root_parameter_index,
            buffer_usage: usage.as_i32(),
            number_of_elements,
            number_of_element_properties: element_properties.len() as u32,
        },
        element_properties,
    }
}

/// Number of material slots of one material uniform buffer page.
pub const MATERIAL_SLOTS: u32 = 4;

/// Byte size of one packed material: four floats and a float4.
pub const MATERIAL_STRIDE: usize = 32;

/// The forward blueprint: four switches, a culling state, and pass, material
/// and instance uniform buffers.
pub fn blueprint_file() -> MaterialBlueprintFile {
    let mut shader_blueprints = ShaderBlueprintsRecord::default();
    shader_blueprints.asset_ids[ShaderType::Vertex.as_i32() as usize] = AssetId::from_name(VERTEX).value();
    shader_blueprints.asset_ids[ShaderType::Fragment.as_i32() as usize] = AssetId::from_name(FRAGMENT).value();

    let material_element = |name: &str, value_type| reference(name, Usage::MaterialReference, value_type, name);

    MaterialBlueprintFile {
        properties: vec![
            switch(USE_NORMAL_MAP, 100),
            switch(USE_DETAIL_MAP, 10),
            switch(USE_BROKEN_PATH, 0),
            switch(USE_UNREAD_SWITCH, 50),
            uniform("Metallic", MaterialPropertyValue::Float(0.0)),
            uniform("Roughness", MaterialPropertyValue::Float(0.5)),
            uniform("Reflectance", MaterialPropertyValue::Float(0.04)),
            uniform("Opacity", MaterialPropertyValue::Float(1.0)),
            uniform("DiffuseColor", MaterialPropertyValue::Float4([1.0; 4])),
            record(
                MaterialProperty::new(
                    CULL_MODE,
                    Usage::RasterizerState,
                    MaterialPropertyValue::CullMode(CullMode::Back),
                ),
                0,
                0,
            ),
        ],
        root_parameters: vec![
            uniform_buffer_range(0, "PassUniformBuffer"),
            uniform_buffer_range(1, "MaterialUniformBuffer"),
            uniform_buffer_range(2, "InstanceUniformBuffer"),
        ],
        vertex_attributes: Vec::new(),
        pipeline_state: PipelineStateRecord::from(&PipelineStateTemplate::default()),
        shader_blueprints,
        uniform_buffers: vec![
            uniform_buffer(
                0,
                BlueprintBufferUsage::Pass,
                1,
                vec![reference(
                    "WorldSpaceToClipSpaceMatrix",
                    Usage::PassReference,
                    ValueType::Float4_4,
                    "@WorldSpaceToClipSpaceMatrix",
                )],
            ),
            uniform_buffer(
                1,
                BlueprintBufferUsage::Material,
                MATERIAL_SLOTS,
                vec![
                    material_element("Metallic", ValueType::Float),
                    material_element("Roughness", ValueType::Float),
                    material_element("Reflectance", ValueType::Float),
                    material_element("Opacity", ValueType::Float),
                    material_element("DiffuseColor", ValueType::Float4),
                ],
            ),
            uniform_buffer(
                2,
                BlueprintBufferUsage::Instance,
                1,
                vec![
                    reference(
                        "ObjectSpaceToWorldSpaceMatrix",
                        Usage::InstanceReference,
                        ValueType::Float4_4,
                        "@ObjectSpaceToWorldSpaceMatrix",
                    ),
                    reference(
                        "MaterialIndex",
                        Usage::InstanceReference,
                        ValueType::Integer,
                        "@MaterialIndex",
                    ),
                ],
            ),
        ],
        texture_buffers: Vec::new(),
        sampler_states: Vec::new(),
        textures: Vec::new(),
    }
}

pub fn material_file(parent: Option<&str>, properties: &[(PropertyId, Usage, MaterialPropertyValue)]) -> MaterialFile {
    MaterialFile {
        parent_material_asset_id: parent.map_or(0, |name| AssetId::from_name(name).value()),
        techniques: match parent {
            Some(_) => Vec::new(),
            None => vec![MaterialTechniqueRecord {
                material_technique_id: FORWARD.value(),
                material_blueprint_asset_id: AssetId::from_name(BLUEPRINT).value(),
            }],
        },
        properties: properties
            .iter()
            .map(|(property_id, usage, value)| record(MaterialProperty::new(*property_id, *usage, *value), 0, 0))
            .collect(),
    }
}

/// A node clearing an HDR framebuffer and drawing every render queue into it.
pub fn compositor_node_file() -> CompositorNodeFile {
    let mut color_texture_asset_ids = [0; MAX_FRAMEBUFFER_COLOR_TEXTURES];
    color_texture_asset_ids[0] = AssetId::from_name(HDR_COLOR).value();
    CompositorNodeFile {
        input_channels: Vec::new(),
        render_target_textures: vec![
            RenderTargetTextureRecord {
                asset_id: AssetId::from_name(HDR_COLOR).value(),
                width: 0,
                height: 0,
                texture_format: TextureFormat::R16G16B16A16F.as_i32(),
                allow_multisample: 0,
            },
            RenderTargetTextureRecord {
                asset_id: AssetId::from_name(HDR_DEPTH).value(),
                width: 0,
                height: 0,
                texture_format: TextureFormat::D32Float.as_i32(),
                allow_multisample: 0,
            },
        ],
        framebuffers: vec![FramebufferRecord {
            asset_id: AssetId::from_name(HDR_FRAMEBUFFER).value(),
            color_texture_asset_ids,
            depth_stencil_texture_asset_id: AssetId::from_name(HDR_DEPTH).value(),
            number_of_color_textures: 1,
            reserved: 0,
        }],
        targets: vec![CompositorTargetSection {
            framebuffer_asset_id: AssetId::from_name(HDR_FRAMEBUFFER).value(),
            passes: vec![
                CompositorPassRecord::Clear(ClearPassRecord {
                    flags: (ClearFlags::COLOR | ClearFlags::DEPTH).bits(),
                    color: [0.0, 0.0, 0.0, 1.0],
                    z: 1.0,
                    stencil: 0,
                }),
                CompositorPassRecord::Scene(ScenePassRecord {
                    material_technique_id: FORWARD.value(),
                    minimum_render_queue_index: 0,
                    maximum_render_queue_index: u32::MAX,
                }),
            ],
        }],
        output_channels: Vec::new(),
    }
}

/// Every shader and blueprint asset, plus a root material and a child of it.
pub fn package() -> AssetPackage {
    let mut package = AssetPackage::new("Example");
    let mut add = |name: &str, bytes: Vec<u8>| {
        package
            .add_memory_asset(name, bytes)
            .expect("asset names are unique");
    };
    add(LIGHTING_PIECE, write_shader_source(AssetFormat::ShaderPiece, LIGHTING_SOURCE));
    add(VERTEX, write_shader_source(AssetFormat::ShaderBlueprint, VERTEX_SOURCE));
    add(FRAGMENT, write_shader_source(AssetFormat::ShaderBlueprint, FRAGMENT_SOURCE));
    add(BLUEPRINT, blueprint_file().write());
    add(BASE_MATERIAL, material_file(None, &[]).write());
    add(
        STONE_MATERIAL,
        material_file(
            Some(BASE_MATERIAL),
            &[(
                DIFFUSE_COLOR,
                Usage::ShaderUniform,
                MaterialPropertyValue::Float4([0.5, 0.25, 0.125, 1.0]),
            )],
        )
        .write(),
    );
    add(COMPOSITOR_NODE, compositor_node_file().write());
    package
}

/// A runtime with [`package`] mounted and the shaders and blueprint loaded.
pub fn runtime(device: RenderDevice, config: RuntimeConfig) -> Result<RendererRuntime, RuntimeError> {
    let mut runtime = RendererRuntime::new(device, config)?;
    runtime.mount_package(package());
    runtime.load_shader_piece(AssetId::from_name(LIGHTING_PIECE))?;
    runtime.load_shader_blueprint(AssetId::from_name(VERTEX))?;
    runtime.load_shader_blueprint(AssetId::from_name(FRAGMENT))?;
    runtime.load_material_blueprint(AssetId::from_name(BLUEPRINT))?;
    Ok(runtime)
}
