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

mod common;

use common::*;
use lumen_core::asset::AssetId;
use lumen_core::renderer::api::CullMode;
use lumen_infra::HeadlessBackendConfig;
use lumen_runtime::error::MaterialError;
use lumen_runtime::material::{
    MaterialProperties, MaterialPropertyValue, MaterialResourceId, MaterialResourceManager, Usage,
};
use lumen_runtime::pipeline::PipelineStateCache;
use lumen_runtime::{RendererRuntime, RuntimeConfig};
use std::sync::Arc;

fn load(
    runtime: &RendererRuntime,
    materials: &mut MaterialResourceManager,
    name: &str,
) -> anyhow::Result<MaterialResourceId> {
    let asset_id = AssetId::from_name(name);
    let bytes = runtime.assets().read_asset_bytes(asset_id)?;
    Ok(materials.load_material(asset_id, &bytes, runtime.blueprints())?)
}

fn resolve(
    runtime: &RendererRuntime,
    materials: &mut MaterialResourceManager,
    material: MaterialResourceId,
) -> anyhow::Result<Arc<PipelineStateCache>> {
    materials
        .resolve_technique(material, FORWARD, runtime.blueprints(), &MaterialProperties::new(), false)
        .ok_or_else(|| anyhow::anyhow!("material {:?} did not resolve", material))
}

fn diffuse_color(materials: &MaterialResourceManager, material: MaterialResourceId) -> Option<MaterialPropertyValue> {
    materials.get(material)?.properties().value(DIFFUSE_COLOR).copied()
}

#[test]
fn parent_switches_reach_children_until_they_override() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;
    let mut materials = MaterialResourceManager::new();
    let base = load(&runtime, &mut materials, BASE_MATERIAL)?;
    let stone = load(&runtime, &mut materials, STONE_MATERIAL)?;

    let plain = resolve(&runtime, &mut materials, stone)?;
    assert!(plain.signature().shader_properties().is_empty());

    let updated = materials.set_property(
        base,
        USE_NORMAL_MAP,
        Usage::ShaderCombination,
        MaterialPropertyValue::Boolean(true),
    )?;
    assert_eq!(updated, 1);
    let normal_mapped = resolve(&runtime, &mut materials, stone)?;
    assert!(!Arc::ptr_eq(&plain, &normal_mapped));
    assert!(normal_mapped.signature().shader_properties().contains(USE_NORMAL_MAP));
    assert!(Arc::ptr_eq(&resolve(&runtime, &mut materials, base)?, &normal_mapped));

    let updated = materials.set_property(
        stone,
        USE_NORMAL_MAP,
        Usage::ShaderCombination,
        MaterialPropertyValue::Boolean(false),
    )?;
    assert_eq!(updated, 0);
    assert!(Arc::ptr_eq(&resolve(&runtime, &mut materials, stone)?, &plain));
    assert_eq!(runtime.pipeline_state_cache().statistics().builds, 2);
    Ok(())
}

#[test]
fn resetting_a_property_takes_the_parent_value_again() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;
    let mut materials = MaterialResourceManager::new();
    let base = load(&runtime, &mut materials, BASE_MATERIAL)?;
    let stone = load(&runtime, &mut materials, STONE_MATERIAL)?;
    let blue = MaterialPropertyValue::Float4([0.0, 0.0, 1.0, 1.0]);

    assert_eq!(
        materials.set_property(base, DIFFUSE_COLOR, Usage::ShaderUniform, blue)?,
        0
    );
    assert_eq!(
        diffuse_color(&materials, stone),
        Some(MaterialPropertyValue::Float4([0.5, 0.25, 0.125, 1.0]))
    );

    materials.reset_property(stone, DIFFUSE_COLOR)?;
    assert_eq!(diffuse_color(&materials, stone), Some(blue));
    let red = MaterialPropertyValue::Float4([1.0, 0.0, 0.0, 1.0]);
    assert_eq!(
        materials.set_property(base, DIFFUSE_COLOR, Usage::ShaderUniform, red)?,
        1
    );
    assert_eq!(diffuse_color(&materials, stone), Some(red));
    Ok(())
}

#[test]
fn rasterizer_overrides_split_the_pipeline_state() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;
    let mut materials = MaterialResourceManager::new();
    load(&runtime, &mut materials, BASE_MATERIAL)?;
    let stone = load(&runtime, &mut materials, STONE_MATERIAL)?;

    let culled = resolve(&runtime, &mut materials, stone)?;
    assert!(culled.signature().state_overrides().is_empty());
    materials.set_property(
        stone,
        CULL_MODE,
        Usage::RasterizerState,
        MaterialPropertyValue::CullMode(CullMode::None),
    )?;
    let double_sided = resolve(&runtime, &mut materials, stone)?;

    assert_ne!(culled.key(), double_sided.key());
    assert_eq!(double_sided.signature().state_overrides().len(), 1);
    assert_eq!(
        double_sided.signature().shader_properties(),
        culled.signature().shader_properties()
    );
    assert_eq!(backend.statistics().pipeline_states, 2);
    Ok(())
}

#[test]
fn reparenting_into_a_cycle_is_rejected() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;
    let mut materials = MaterialResourceManager::new();
    let base = load(&runtime, &mut materials, BASE_MATERIAL)?;
    let stone = load(&runtime, &mut materials, STONE_MATERIAL)?;
    let pebble = materials.create_child(stone)?;

    let result = materials.set_parent(base, Some(pebble));
    assert!(matches!(
        result,
        Err(MaterialError::Cycle { child, parent }) if child == base && parent == pebble
    ));
    assert_eq!(materials.get(base).and_then(|material| material.parent()), None);
    assert_eq!(materials.get(pebble).and_then(|material| material.parent()), Some(stone));
    Ok(())
}

#[test]
fn children_must_load_after_their_parent() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;
    let mut materials = MaterialResourceManager::new();

    let result = load(&runtime, &mut materials, STONE_MATERIAL);
    let error = result.err().ok_or_else(|| anyhow::anyhow!("stone loaded without its parent"))?;
    assert!(matches!(
        error.downcast_ref::<MaterialError>(),
        Some(MaterialError::ParentNotLoaded { .. })
    ));
    assert!(materials.is_empty());
    Ok(())
}

#[test]
fn destroyed_parents_leave_working_roots() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = runtime(device, RuntimeConfig::default())?;
    let base = runtime.load_material(AssetId::from_name(BASE_MATERIAL))?;
    let stone = runtime.load_material(AssetId::from_name(STONE_MATERIAL))?;

    runtime.destroy_material(base)?;
    assert!(runtime.materials().get(base).is_none());
    assert!(runtime.loaded_asset_kind(AssetId::from_name(BASE_MATERIAL)).is_none());
    let material = runtime
        .materials()
        .get(stone)
        .ok_or_else(|| anyhow::anyhow!("stone destroyed with its parent"))?;
    assert_eq!(material.parent(), None);
    assert!(material.technique(FORWARD).is_some());
    assert_eq!(
        material.properties().value(DIFFUSE_COLOR),
        Some(&MaterialPropertyValue::Float4([0.5, 0.25, 0.125, 1.0]))
    );
    Ok(())
}
