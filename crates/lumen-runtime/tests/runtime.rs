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
use lumen_core::renderer::api::GraphicsBackendType;
use lumen_infra::HeadlessBackendConfig;
use lumen_runtime::config::PipelineStateCacheConfig;
use lumen_runtime::material::{MaterialProperties, MaterialProperty, MaterialPropertyValue, Usage};
use lumen_runtime::pipeline::persistence;
use lumen_runtime::{LoadedAssetKind, RendererRuntime, RuntimeConfig, RuntimeError};
use std::path::Path;
use std::sync::Arc;

fn persistent_config(path: &Path) -> RuntimeConfig {
    RuntimeConfig {
        pipeline_state_cache: PipelineStateCacheConfig {
            cache_file: Some(path.to_path_buf()),
            ..PipelineStateCacheConfig::default()
        },
        ..RuntimeConfig::default()
    }
}

/// Builds the plain and the normal mapped pipeline states.
fn build_pipeline_states(runtime: &RendererRuntime) -> anyhow::Result<()> {
    let blueprint = runtime
        .blueprints()
        .get_by_asset(AssetId::from_name(BLUEPRINT))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("forward blueprint not loaded"))?;
    let normal_mapped = MaterialProperties::from_properties([MaterialProperty::new(
        USE_NORMAL_MAP,
        Usage::ShaderCombination,
        MaterialPropertyValue::Boolean(true),
    )]);
    for material in [MaterialProperties::new(), normal_mapped] {
        let shader_properties = blueprint.shader_properties_for(&material);
        let built = runtime
            .pipeline_state_cache()
            .request(&blueprint, &shader_properties, &material);
        anyhow::ensure!(!built.is_null(), "pipeline state {:#018x} failed", built.key());
    }
    Ok(())
}

#[test]
fn shutdown_persists_the_cache_for_the_next_run() -> anyhow::Result<()> {
    init_logging();
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("cache").join("pipeline_states.bin");

    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let mut first_run = runtime(device, persistent_config(&path))?;
    build_pipeline_states(&first_run)?;
    first_run.shutdown()?;
    assert!(path.exists());

    let (backend, device) = headless(HeadlessBackendConfig::default());
    let mut second_run = runtime(device, persistent_config(&path))?;
    assert_eq!(second_run.warm_up(), 2);
    assert_eq!(second_run.warm_up(), 0);

    let shader_statistics = second_run.pipeline_state_cache().shader_cache().statistics();
    assert_eq!(shader_statistics.compiled, 0);
    assert_eq!(shader_statistics.from_bytecode, 3);
    assert_eq!(backend.statistics().shaders_from_bytecode, 3);
    assert_eq!(backend.statistics().pipeline_states, 2);

    // Requests after warm-up are hits.
    build_pipeline_states(&second_run)?;
    let statistics = second_run.pipeline_state_cache().statistics();
    assert_eq!((statistics.builds, statistics.hits), (2, 2));
    Ok(())
}

#[test]
fn caches_of_another_backend_are_discarded() -> anyhow::Result<()> {
    init_logging();
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("pipeline_states.bin");

    let mut config = persistent_config(&path);
    config.pipeline_state_cache.save_on_shutdown = false;
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let first_run = runtime(device, config)?;
    build_pipeline_states(&first_run)?;
    let snapshot = first_run.pipeline_state_cache().snapshot();
    assert_eq!(snapshot.signatures.len(), 2);
    persistence::save(&path, &snapshot, GraphicsBackendType::Vulkan)?;
    drop(first_run);

    let (backend, device) = headless(HeadlessBackendConfig::default());
    let mut second_run = runtime(device, persistent_config(&path))?;
    assert_eq!(second_run.warm_up(), 0);
    assert_eq!(backend.statistics().pipeline_states, 0);

    // Shutting down replaces the foreign file with a readable one.
    second_run.shutdown()?;
    assert!(persistence::load(&path, GraphicsBackendType::Headless)?.is_some());
    Ok(())
}

#[test]
fn corrupted_caches_are_discarded() -> anyhow::Result<()> {
    init_logging();
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("pipeline_states.bin");
    std::fs::write(&path, b"not a pipeline state cache")?;

    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = runtime(device, persistent_config(&path))?;
    assert_eq!(runtime.warm_up(), 0);
    Ok(())
}

#[test]
fn reloading_a_shader_piece_rebuilds_pipeline_states() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = runtime(device, RuntimeConfig::default())?;
    build_pipeline_states(&runtime)?;
    let before = runtime
        .blueprints()
        .get_by_asset(AssetId::from_name(BLUEPRINT))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("forward blueprint not loaded"))?;
    assert_eq!(runtime.pipeline_state_cache().len(), 2);

    let kind = runtime.reload_asset(AssetId::from_name(LIGHTING_PIECE))?;
    assert_eq!(kind, LoadedAssetKind::ShaderPiece);
    assert!(runtime.pipeline_state_cache().is_empty());
    let after = runtime
        .blueprints()
        .get_by_asset(AssetId::from_name(BLUEPRINT))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("forward blueprint unloaded by the reload"))?;
    assert!(!Arc::ptr_eq(&before, &after));

    build_pipeline_states(&runtime)?;
    assert_eq!(runtime.pipeline_state_cache().statistics().builds, 4);
    Ok(())
}

#[test]
fn reloading_a_material_keeps_its_id() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = runtime(device, RuntimeConfig::default())?;
    runtime.load_material(AssetId::from_name(BASE_MATERIAL))?;
    let stone = runtime.load_material(AssetId::from_name(STONE_MATERIAL))?;

    let kind = runtime.reload_asset(AssetId::from_name(STONE_MATERIAL))?;
    assert_eq!(kind, LoadedAssetKind::Material);
    assert_eq!(runtime.materials().id_of(AssetId::from_name(STONE_MATERIAL)), Some(stone));
    assert_eq!(runtime.materials().len(), 2);
    Ok(())
}

#[test]
fn reloading_an_unknown_asset_fails() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = RendererRuntime::new(device, RuntimeConfig::default())?;
    let missing = AssetId::from_name("Example/Material/Default/Missing");
    assert!(matches!(
        runtime.reload_asset(missing),
        Err(RuntimeError::AssetNotLoaded(asset_id)) if asset_id == missing
    ));
    Ok(())
}
