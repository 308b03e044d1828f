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

use lumen_core::asset::AssetId;
use lumen_core::renderer::RenderDevice;
use lumen_core::{MaterialTechniqueId, PropertyId};
use lumen_infra::HeadlessRenderBackend;
use lumen_runtime::material::MaterialPropertyValue;
use lumen_runtime::{RendererRuntime, RuntimeConfig};
use lumen_toolkit::{write_pack, AssetCompiler, PackIndex, ToolkitError};
use std::path::Path;
use std::sync::Arc;

const BLUEPRINT: &str = r#"{
    "properties": [
        { "name": "USE_NORMAL_MAP", "usage": "ShaderCombination", "value_type": "Boolean",
          "visual_importance": 100, "maximum_integer_value": 1 },
        { "name": "DiffuseColor", "usage": "ShaderUniform", "value_type": "Float4",
          "value": [1.0, 1.0, 1.0, 1.0] }
    ],
    "shader_blueprints": {
        "vertex": "Example/ShaderBlueprint/Mesh/Vertex",
        "fragment": "Example/ShaderBlueprint/Mesh/Fragment"
    }
}"#;

fn write(root: &Path, name: &str, contents: &str) -> anyhow::Result<()> {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

fn write_sources(root: &Path) -> anyhow::Result<()> {
    write(
        root,
        "Example/ShaderPiece/Mesh/Normal.shader_piece",
        "float3 sampleNormal() { return float3(0.0, 0.0, 1.0); }",
    )?;
    write(
        root,
        "Example/ShaderBlueprint/Mesh/Vertex.shader_blueprint",
        "void main() {}",
    )?;
    write(
        root,
        "Example/ShaderBlueprint/Mesh/Fragment.shader_blueprint",
        "@includepiece(Example/ShaderPiece/Mesh/Normal)\n@property(USE_NORMAL_MAP)\nnormal\n@end\nvoid main() {}",
    )?;
    write(root, "Example/MaterialBlueprint/Mesh/Forward.material_blueprint", BLUEPRINT)?;
    // The child sorts before its parent and must still compile after it.
    write(
        root,
        "Example/Material/Default/AStone.material",
        r#"{ "parent": "Example/Material/Default/Base", "properties": { "DiffuseColor": [0.5, 0.5, 0.5, 1.0] } }"#,
    )?;
    write(
        root,
        "Example/Material/Default/Base.material",
        r#"{ "techniques": { "Forward": "Example/MaterialBlueprint/Mesh/Forward" },
            "properties": { "USE_NORMAL_MAP": true } }"#,
    )?;
    write(root, "Example/Material/Default/notes.txt", "not an asset")?;
    Ok(())
}

#[test]
fn compiled_packs_load_into_the_runtime() -> anyhow::Result<()> {
    let sources = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_sources(sources.path())?;

    let compiled = AssetCompiler::new().compile_directory(sources.path())?;
    assert_eq!(compiled.len(), 6);
    write_pack("Example", output.path(), &compiled)?;

    let index = PackIndex::read(output.path())?;
    assert_eq!(index.name, "Example");
    assert!(index.entries.windows(2).all(|pair| pair[0].asset_id < pair[1].asset_id));

    let device = RenderDevice::new(Arc::new(HeadlessRenderBackend::new()));
    let mut runtime = RendererRuntime::new(device, RuntimeConfig::default())?;
    runtime.mount_package(index.to_package(output.path())?);
    runtime.load_shader_piece(AssetId::from_name("Example/ShaderPiece/Mesh/Normal"))?;
    runtime.load_shader_blueprint(AssetId::from_name("Example/ShaderBlueprint/Mesh/Vertex"))?;
    runtime.load_shader_blueprint(AssetId::from_name("Example/ShaderBlueprint/Mesh/Fragment"))?;
    runtime.load_material_blueprint(AssetId::from_name("Example/MaterialBlueprint/Mesh/Forward"))?;
    runtime.load_material(AssetId::from_name("Example/Material/Default/Base"))?;
    let child = runtime.load_material(AssetId::from_name("Example/Material/Default/AStone"))?;

    let material = runtime
        .materials()
        .get(child)
        .ok_or_else(|| anyhow::anyhow!("child material missing"))?;
    assert!(material.technique(MaterialTechniqueId::from_name("Forward")).is_some());
    assert_eq!(
        material.properties().value(PropertyId::from_name("USE_NORMAL_MAP")),
        Some(&MaterialPropertyValue::Boolean(true))
    );
    assert_eq!(
        material.properties().value(PropertyId::from_name("DiffuseColor")),
        Some(&MaterialPropertyValue::Float4([0.5, 0.5, 0.5, 1.0]))
    );
    runtime.shutdown()?;
    Ok(())
}

#[test]
fn parent_cycles_are_reported() -> anyhow::Result<()> {
    let sources = tempfile::tempdir()?;
    write(sources.path(), "Example/MaterialBlueprint/Mesh/Forward.material_blueprint", BLUEPRINT)?;
    write(
        sources.path(),
        "Example/Material/Default/A.material",
        r#"{ "parent": "Example/Material/Default/B" }"#,
    )?;
    write(
        sources.path(),
        "Example/Material/Default/B.material",
        r#"{ "parent": "Example/Material/Default/A" }"#,
    )?;
    let result = AssetCompiler::new().compile_directory(sources.path());
    assert!(matches!(
        result,
        Err(ToolkitError::UnresolvedMaterialParents(names)) if names.len() == 2
    ));
    Ok(())
}
