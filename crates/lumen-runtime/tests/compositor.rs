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
use lumen_core::format::{
    MeshItemRecord, MeshItemSection, SceneFile, SceneNodeRecord, SceneNodeSection, SubMeshRecord,
};
use lumen_core::renderer::api::Command;
use lumen_infra::{HeadlessBackendConfig, HeadlessRenderBackend};
use lumen_core::renderer::api::TextureFormat;
use lumen_runtime::compositor::{
    FramebufferManager, FramebufferSignature, FramebufferTexture, RenderTargetTextureManager,
    RenderTargetTextureSignature,
};
use lumen_runtime::config::PipelineStateCacheConfig;
use lumen_runtime::material::{MaterialPropertyValue, MaterialResourceId, Usage};
use lumen_runtime::render_queue::{RenderQueue, Renderable};
use lumen_runtime::{RendererRuntime, RuntimeConfig};
use std::time::Duration;

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

fn renderable(material: MaterialResourceId, render_queue_index: u32) -> Renderable {
    Renderable {
        mesh_asset_id: AssetId::from_name("Example/Mesh/Default/Cube"),
        material,
        render_queue_index,
        start_index: 0,
        number_of_indices: 36,
        object_space_to_world_space: IDENTITY,
    }
}

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Every uniform buffer upload of the last submission with `size` bytes.
fn uploads(backend: &HeadlessRenderBackend, size: usize) -> Vec<Vec<u8>> {
    backend
        .last_submission()
        .commands()
        .iter()
        .filter_map(|command| match command {
            Command::CopyUniformBufferData { data, .. } if data.len() == size => Some(data.clone()),
            _ => None,
        })
        .collect()
}

fn load_materials(runtime: &mut RendererRuntime) -> anyhow::Result<(MaterialResourceId, MaterialResourceId)> {
    let base = runtime.load_material(AssetId::from_name(BASE_MATERIAL))?;
    let stone = runtime.load_material(AssetId::from_name(STONE_MATERIAL))?;
    runtime.load_compositor_node(AssetId::from_name(COMPOSITOR_NODE))?;
    Ok((base, stone))
}

#[test]
fn scene_passes_sort_draws_and_skip_broken_materials() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = strict_headless();
    let mut runtime = runtime(device, RuntimeConfig::default())?;
    let (base, stone) = load_materials(&mut runtime)?;
    let broken = runtime.materials_mut().create_child(base)?;
    runtime.materials_mut().set_property(
        broken,
        USE_BROKEN_PATH,
        Usage::ShaderCombination,
        MaterialPropertyValue::Boolean(true),
    )?;

    let workspace = runtime.create_workspace(vec![AssetId::from_name(COMPOSITOR_NODE)]);
    runtime
        .workspace_mut(workspace)
        .ok_or_else(|| anyhow::anyhow!("workspace missing"))?
        .set_output_size(1280, 720);

    let mut queue = RenderQueue::new();
    queue.push(renderable(base, 10));
    queue.push(renderable(stone, 0));
    queue.push(renderable(broken, 0));
    let statistics = runtime.render_workspace(workspace, &queue)?;

    assert_eq!(statistics.passes, 2);
    assert_eq!(statistics.draw_calls, 2);
    assert_eq!(statistics.skipped_draws, 1);
    assert_eq!(statistics.pipeline_state_changes, 1);
    let backend_statistics = backend.statistics();
    assert_eq!(backend_statistics.draw_calls, 2);
    assert_eq!(backend_statistics.submissions, 1);
    assert_eq!(backend_statistics.rejected_shaders, 1);

    // Stone takes the first material slot, base the second.
    let pages = uploads(&backend, MATERIAL_SLOTS as usize * MATERIAL_STRIDE);
    let page = pages.last().ok_or_else(|| anyhow::anyhow!("no material page uploaded"))?;
    let stone_slot = floats(&page[..MATERIAL_STRIDE]);
    assert_eq!(stone_slot[..4], [0.0, 0.5, 0.04, 1.0]);
    assert_eq!(stone_slot[4..], [0.5, 0.25, 0.125, 1.0]);
    let base_slot = floats(&page[MATERIAL_STRIDE..2 * MATERIAL_STRIDE]);
    assert_eq!(base_slot[4..], [1.0; 4]);

    // A second frame reuses the render targets.
    let statistics = runtime.render_workspace(workspace, &queue)?;
    assert_eq!(statistics.draw_calls, 2);
    assert_eq!(runtime.framebuffers().len(), 1);
    assert_eq!(runtime.render_targets().len(), 2);
    assert_eq!(backend.statistics().framebuffers, 1);
    Ok(())
}

#[test]
fn workspaces_of_one_size_share_framebuffers() -> anyhow::Result<()> {
    init_logging();
    let (_backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = runtime(device, RuntimeConfig::default())?;
    let (base, _) = load_materials(&mut runtime)?;
    let mut queue = RenderQueue::new();
    queue.push(renderable(base, 0));

    let first = runtime.create_workspace(vec![AssetId::from_name(COMPOSITOR_NODE)]);
    let second = runtime.create_workspace(vec![AssetId::from_name(COMPOSITOR_NODE)]);
    for workspace in [first, second] {
        runtime
            .workspace_mut(workspace)
            .ok_or_else(|| anyhow::anyhow!("workspace missing"))?
            .set_output_size(640, 360);
        runtime.render_workspace(workspace, &queue)?;
    }
    assert_eq!(runtime.framebuffers().len(), 1);

    assert!(runtime.destroy_workspace(first));
    assert_eq!(runtime.framebuffers().len(), 1);
    assert!(runtime.destroy_workspace(second));
    assert_eq!(runtime.framebuffers().len(), 0);
    assert_eq!(runtime.render_targets().len(), 0);
    assert!(!runtime.destroy_workspace(second));
    assert!(runtime.render_workspace(second, &queue).is_err());
    Ok(())
}

#[test]
fn scenes_fill_the_render_queue() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig::default());
    let mut runtime = runtime(device, RuntimeConfig::default())?;
    load_materials(&mut runtime)?;

    let scene = SceneFile {
        nodes: vec![SceneNodeSection {
            node: SceneNodeRecord {
                position: [1.0, 2.0, 3.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
                scale: [1.0; 3],
                number_of_items: 1,
            },
            mesh_items: vec![MeshItemSection {
                mesh: MeshItemRecord {
                    mesh_asset_id: AssetId::from_name("Example/Mesh/Default/Cube").value(),
                    number_of_sub_meshes: 2,
                    render_queue_index: 0,
                },
                sub_meshes: vec![
                    SubMeshRecord {
                        material_asset_id: AssetId::from_name(STONE_MATERIAL).value(),
                        start_index: 0,
                        number_of_indices: 36,
                    },
                    SubMeshRecord {
                        material_asset_id: AssetId::from_name("Example/Material/Default/Missing").value(),
                        start_index: 36,
                        number_of_indices: 12,
                    },
                ],
            }],
        }],
    };
    let mut package = AssetPackage::new("Scenes");
    package.add_memory_asset("Example/Scene/Default/Courtyard", scene.write())?;
    runtime.mount_package(package);
    let scene = runtime.load_scene(AssetId::from_name("Example/Scene/Default/Courtyard"))?;

    let mut queue = RenderQueue::new();
    scene.fill_render_queue(&mut queue);
    assert_eq!(queue.len(), 1);

    let workspace = runtime.create_workspace(vec![AssetId::from_name(COMPOSITOR_NODE)]);
    let statistics = runtime.render_workspace(workspace, &queue)?;
    assert_eq!(statistics.draw_calls, 1);

    // Instance data: the world matrix, then the material slot.
    let instances = uploads(&backend, 80);
    let instance = floats(instances.last().ok_or_else(|| anyhow::anyhow!("no instance data uploaded"))?);
    assert_eq!(instance[12..15], [1.0, 2.0, 3.0]);
    assert_eq!(instance[16].to_bits(), 0);
    Ok(())
}

#[test]
fn pending_pipeline_states_skip_draws_until_built() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig {
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
    let mut runtime = runtime(device, config)?;
    let (base, _) = load_materials(&mut runtime)?;
    let workspace = runtime.create_workspace(vec![AssetId::from_name(COMPOSITOR_NODE)]);
    let mut queue = RenderQueue::new();
    queue.push(renderable(base, 0));

    let statistics = runtime.render_workspace(workspace, &queue)?;
    assert_eq!((statistics.draw_calls, statistics.skipped_draws), (0, 1));
    assert_eq!(statistics.passes, 2);

    runtime.pipeline_state_cache().wait_until_idle();
    let statistics = runtime.render_workspace(workspace, &queue)?;
    assert_eq!((statistics.draw_calls, statistics.skipped_draws), (1, 0));
    assert_eq!(backend.statistics().submissions, 2);
    Ok(())
}

#[test]
fn unreleased_compositor_resources_are_reported() -> anyhow::Result<()> {
    init_logging();
    let (backend, device) = headless(HeadlessBackendConfig::default());
    let mut render_targets = RenderTargetTextureManager::new(device.clone());
    let mut framebuffers = FramebufferManager::new(device);
    let color = FramebufferTexture {
        asset_id: AssetId::from_name("Example/Texture/Compositor/Color"),
        signature: RenderTargetTextureSignature::new(640, 360, TextureFormat::R8G8B8A8, false),
    };
    let signature = FramebufferSignature::new(vec![color], None);

    framebuffers.acquire(&signature, &mut render_targets)?;
    framebuffers.acquire(&signature, &mut render_targets)?;
    assert!(!framebuffers.release(signature.id(), &mut render_targets));
    assert_eq!(framebuffers.report_leaks(), 1);
    assert_eq!(render_targets.report_leaks(), 1);

    assert!(framebuffers.release(signature.id(), &mut render_targets));
    assert_eq!(framebuffers.report_leaks(), 0);
    assert_eq!(render_targets.report_leaks(), 0);
    assert_eq!(backend.statistics().framebuffers, 1);
    Ok(())
}
