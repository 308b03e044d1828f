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
use lumen_core::asset::{AssetId, AssetPackage};
use lumen_core::PropertyId;
use lumen_infra::HeadlessBackendConfig;
use lumen_runtime::blueprint::MaterialBlueprintResource;
use lumen_runtime::config::PipelineStateCacheConfig;
use lumen_runtime::material::{MaterialProperties, MaterialProperty, MaterialPropertyValue, Usage};
use lumen_runtime::pipeline::{PipelineStateCache, PipelineStateRequest};
use lumen_runtime::{RendererRuntime, RuntimeConfig};
use std::sync::Arc;
use std::time::Duration;

fn forward_blueprint(runtime: &RendererRuntime) -> anyhow::Result<Arc<MaterialBlueprintResource>> {
    runtime
        .blueprints()
        .get_by_asset(AssetId::from_name(BLUEPRINT))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("forward blueprint not loaded"))
}

fn switches(pairs: &[(PropertyId, bool)]) -> MaterialProperties {
    MaterialProperties::from_properties(pairs.iter().map(|(property_id, value)| {
        MaterialProperty::new(
            *property_id,
            Usage::ShaderCombination,
            MaterialPropertyValue::Boolean(*value),
        )
    }))
}

fn request(runtime: &RendererRuntime, material: &MaterialProperties) -> anyhow::Result<Arc<PipelineStateCache>> {
    let blueprint = forward_blueprint(runtime)?;
    let shader_properties = blueprint.shader_properties_for(material);
    Ok(runtime
        .pipeline_state_cache()
        .request(&blueprint, &shader_properties, material))
}

#[test]
fn switches_the_shaders_never_read_share_an_entry() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;

    let plain = request(&runtime, &MaterialProperties::new())?;
    let unread = request(&runtime, &switches(&[(USE_UNREAD_SWITCH, true)]))?;

    assert!(Arc::ptr_eq(&plain, &unread));
    assert!(!plain.is_null());
    assert!(plain.signature().shader_properties().is_empty());
    let cache = runtime.pipeline_state_cache();
    assert_eq!(cache.len(), 1);
    let statistics = cache.statistics();
    assert_eq!((statistics.misses, statistics.hits, statistics.builds), (1, 1, 1));
    assert_eq!(backend.statistics().pipeline_states, 1);
    Ok(())
}

#[test]
fn concurrent_requests_build_once() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig {
        pipeline_state_creation_delay: Duration::from_millis(50),
        ..HeadlessBackendConfig::default()
    });
    let runtime = runtime(device, RuntimeConfig::default())?;
    let blueprint = forward_blueprint(&runtime)?;
    let material = switches(&[(USE_NORMAL_MAP, true)]);
    let shader_properties = blueprint.shader_properties_for(&material);
    let cache = Arc::clone(runtime.pipeline_state_cache());

    let results: Vec<Arc<PipelineStateCache>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let blueprint = &blueprint;
                let shader_properties = &shader_properties;
                let material = &material;
                scope.spawn(move || cache.request(blueprint, shader_properties, material))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("request thread panicked"))
            .collect()
    });

    assert!(results.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(cache.statistics().builds, 1);
    assert_eq!(backend.statistics().pipeline_states, 1);
    Ok(())
}

#[test]
fn invalidation_drops_every_entry_of_a_blueprint() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;
    let plain = request(&runtime, &MaterialProperties::new())?;
    request(&runtime, &switches(&[(USE_NORMAL_MAP, true)]))?;

    let cache = runtime.pipeline_state_cache();
    assert_eq!(cache.invalidate(AssetId::from_name(BLUEPRINT)), 2);
    assert_eq!(cache.invalidate(AssetId::from_name(BLUEPRINT)), 0);
    assert!(cache.is_empty());

    let rebuilt = request(&runtime, &MaterialProperties::new())?;
    assert!(!Arc::ptr_eq(&plain, &rebuilt));
    assert_eq!(rebuilt.key(), plain.key());
    assert_eq!(cache.statistics().builds, 3);
    Ok(())
}

#[test]
fn failed_combinations_are_cached_as_null() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = strict_headless();
    let runtime = runtime(device, RuntimeConfig::default())?;
    let broken = switches(&[(USE_BROKEN_PATH, true)]);

    let first = request(&runtime, &broken)?;
    assert!(first.is_null());
    assert!(first.pipeline_state().is_none());
    let second = request(&runtime, &broken)?;
    assert!(Arc::ptr_eq(&first, &second));

    let statistics = runtime.pipeline_state_cache().statistics();
    assert_eq!((statistics.builds, statistics.failures), (1, 1));
    assert_eq!(backend.statistics().rejected_shaders, 1);
    assert!(runtime.pipeline_state_cache().signatures().is_empty());

    // Other combinations of the same blueprint are unaffected.
    assert!(!request(&runtime, &MaterialProperties::new())?.is_null());
    Ok(())
}

#[test]
fn identical_generated_sources_compile_once() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig::default());
    let runtime = runtime(device, RuntimeConfig::default())?;

    let without = request(&runtime, &switches(&[(USE_DETAIL_MAP, false)]))?;
    let with = request(&runtime, &switches(&[(USE_DETAIL_MAP, true)]))?;
    assert!(!Arc::ptr_eq(&without, &with));
    assert_eq!(backend.statistics().pipeline_states, 2);

    let statistics = runtime.pipeline_state_cache().shader_cache().statistics();
    assert_eq!(statistics.generated, 3);
    assert_eq!(statistics.compiled, 2);
    assert_eq!(statistics.hits, 1);
    assert_eq!(statistics.source_reuses, 1);

    let shader_ids = |cache: &PipelineStateCache| -> Vec<_> {
        cache.shaders().iter().map(|shader| shader.shader().id()).collect()
    };
    assert_eq!(shader_ids(&without), shader_ids(&with));
    Ok(())
}

#[test]
fn asynchronous_requests_fall_back_to_simpler_combinations() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig {
        pipeline_state_creation_delay: Duration::from_millis(20),
        ..HeadlessBackendConfig::default()
    });
    let config = RuntimeConfig {
        pipeline_state_cache: PipelineStateCacheConfig {
            asynchronous_compilation: true,
            compiler_threads: 1,
            ..PipelineStateCacheConfig::default()
        },
        ..RuntimeConfig::default()
    };
    let runtime = runtime(device, config)?;
    let blueprint = forward_blueprint(&runtime)?;
    let cache = runtime.pipeline_state_cache();

    let plain_material = MaterialProperties::new();
    let plain_properties = blueprint.shader_properties_for(&plain_material);
    let first = cache.request_async(&blueprint, &plain_properties, &plain_material);
    assert!(matches!(first, PipelineStateRequest::Pending { fallback: None }));
    assert!(first.usable().is_none());

    cache.wait_until_idle();
    let PipelineStateRequest::Ready(plain) = cache.request_async(&blueprint, &plain_properties, &plain_material)
    else {
        anyhow::bail!("plain pipeline state not built after waiting");
    };

    let normal_material = switches(&[(USE_NORMAL_MAP, true), (USE_DETAIL_MAP, true)]);
    let normal_properties = blueprint.shader_properties_for(&normal_material);
    let pending = cache.request_async(&blueprint, &normal_properties, &normal_material);
    let PipelineStateRequest::Pending { fallback: Some(fallback) } = &pending else {
        anyhow::bail!("expected a pending request with a fallback, got {:?}", pending);
    };
    assert!(Arc::ptr_eq(fallback, &plain));

    cache.wait_until_idle();
    let PipelineStateRequest::Ready(normal) = cache.request_async(&blueprint, &normal_properties, &normal_material)
    else {
        anyhow::bail!("normal map pipeline state not built after waiting");
    };
    assert!(!Arc::ptr_eq(&normal, &plain));
    assert!(normal.signature().shader_properties().contains(USE_NORMAL_MAP));
    assert_eq!(cache.statistics().builds, 2);
    Ok(())
}

#[test]
fn state_properties_matching_no_field_are_dropped_at_load() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = runtime(device, RuntimeConfig::default())?;
    let unknown_state = PropertyId::from_name("WireframeLineWidth");
    let mut file = blueprint_file();
    file.properties.push(
        MaterialProperty::new(unknown_state, Usage::RasterizerState, MaterialPropertyValue::Boolean(true))
            .to_record(0, 0),
    );
    let asset_name = "Example/MaterialBlueprint/Mesh/ForwardWithUnknownState";
    let mut package = AssetPackage::new("UnknownState");
    package.add_memory_asset(asset_name, file.write())?;
    runtime.mount_package(package);
    runtime.load_material_blueprint(AssetId::from_name(asset_name))?;

    let blueprint = runtime
        .blueprints()
        .get_by_asset(AssetId::from_name(asset_name))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("blueprint with the unknown state not loaded"))?;
    let state_ids: Vec<PropertyId> = blueprint
        .state_properties()
        .iter()
        .map(|property| property.property_id)
        .collect();
    assert_eq!(state_ids, vec![CULL_MODE]);

    let material = MaterialProperties::new();
    let shader_properties = blueprint.shader_properties_for(&material);
    for _ in 0..3 {
        let built = runtime
            .pipeline_state_cache()
            .request(&blueprint, &shader_properties, &material);
        assert!(!built.is_null());
        assert!(built.signature().state_overrides().is_empty());
    }
    assert_eq!(backend.statistics().pipeline_states, 1);
    Ok(())
}
