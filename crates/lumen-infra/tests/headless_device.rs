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

use lumen_core::renderer::api::{
    BufferUsage, Capabilities, ShaderSource, ShaderType, TextureDescriptor, TextureFlags,
    TextureFormat,
};
use lumen_core::renderer::{RenderDevice, ResourceError, ShaderError};
use lumen_infra::{HeadlessBackendConfig, HeadlessRenderBackend};
use std::sync::Arc;

fn device(config: HeadlessBackendConfig) -> (Arc<HeadlessRenderBackend>, RenderDevice) {
    let backend = Arc::new(HeadlessRenderBackend::with_config(config));
    let device = RenderDevice::new(backend.clone());
    (backend, device)
}

#[test]
fn dropping_the_last_handle_releases_the_object() -> anyhow::Result<()> {
    let (backend, device) = device(HeadlessBackendConfig::default());
    let texture = device.create_texture(&TextureDescriptor {
        width: 64,
        height: 64,
        format: TextureFormat::R8G8B8A8,
        flags: TextureFlags::SHADER_RESOURCE,
        number_of_multisamples: 1,
    })?;
    let shared = texture.clone();
    drop(texture);
    assert_eq!(backend.live_objects(), 1);
    drop(shared);
    assert_eq!(backend.live_objects(), 0);
    assert_eq!(backend.statistics().released, 1);
    Ok(())
}

#[test]
fn shader_bytecode_round_trips_through_the_device() -> anyhow::Result<()> {
    let (backend, device) = device(HeadlessBackendConfig::default());
    let shader = device.create_shader(&ShaderSource {
        label: "Fragment",
        shader_type: ShaderType::Fragment,
        source_code: "void main() {}",
    })?;
    let bytecode = device
        .shader_bytecode(&shader)
        .ok_or_else(|| anyhow::anyhow!("no bytecode exported"))?;
    assert_eq!(bytecode, b"void main() {}");

    let recreated = device.create_shader_from_bytecode(ShaderType::Fragment, &bytecode)?;
    assert_ne!(recreated.id(), shader.id());
    let statistics = backend.statistics();
    assert_eq!(statistics.shaders, 1);
    assert_eq!(statistics.shaders_from_bytecode, 1);
    Ok(())
}

#[test]
fn bytecode_is_refused_when_the_capability_is_off() {
    let (_, device) = device(HeadlessBackendConfig {
        capabilities: Capabilities {
            shader_bytecode: false,
            ..Capabilities::default()
        },
        ..HeadlessBackendConfig::default()
    });
    assert!(matches!(
        device.create_shader_from_bytecode(ShaderType::Vertex, b"void main() {}"),
        Err(ResourceError::Shader(ShaderError::BytecodeUnsupported))
    ));
}

#[test]
fn shaders_containing_the_marker_fail_to_compile() {
    let (backend, device) = device(HeadlessBackendConfig {
        reject_shader_marker: Some("#error".to_string()),
        ..HeadlessBackendConfig::default()
    });
    let result = device.create_shader(&ShaderSource {
        label: "Broken",
        shader_type: ShaderType::Vertex,
        source_code: "#error unsupported combination",
    });
    assert!(matches!(
        result,
        Err(ResourceError::Shader(ShaderError::CompilationError { .. }))
    ));
    assert_eq!(backend.statistics().rejected_shaders, 1);
    assert_eq!(backend.live_objects(), 0);
}

#[test]
fn uniform_buffer_size_is_checked_against_the_limit() {
    let (backend, device) = device(HeadlessBackendConfig::default());
    let limit = device.capabilities().maximum_uniform_buffer_size;
    assert!(device
        .create_uniform_buffer(limit, BufferUsage::DynamicDraw)
        .is_ok());
    assert!(matches!(
        device.create_uniform_buffer(limit + 16, BufferUsage::DynamicDraw),
        Err(ResourceError::SizeExceedsLimit { .. })
    ));
    assert_eq!(backend.statistics().uniform_buffers, 1);
}
