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

//! Built pipeline states.

use super::signature::PipelineStateSignature;
use crate::blueprint::MaterialBlueprintResource;
use crate::shader::{ShaderCache, ShaderCacheManager};
use lumen_core::renderer::api::{
    PipelineStateDescriptor, PipelineStateId, PipelineStateTemplate, ProgramId, RootSignatureId,
};
use lumen_core::renderer::{GpuHandle, RenderDevice};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An immutable pipeline state built for one signature.
///
/// A failed build still produces an entry, with no pipeline state object.
/// Draws using a null entry are skipped.
pub struct PipelineStateCache {
    signature: PipelineStateSignature,
    root_signature: GpuHandle<RootSignatureId>,
    shaders: Vec<ShaderCache>,
    program: Option<GpuHandle<ProgramId>>,
    pipeline_state: Option<GpuHandle<PipelineStateId>>,
}

impl PipelineStateCache {
    /// The signature the entry was built for.
    pub fn signature(&self) -> &PipelineStateSignature {
        &self.signature
    }

    /// The cache key.
    pub fn key(&self) -> u64 {
        self.signature.key()
    }

    /// The root signature of the blueprint.
    pub fn root_signature(&self) -> &GpuHandle<RootSignatureId> {
        &self.root_signature
    }

    /// Shader variants, in pipeline order.
    pub fn shaders(&self) -> &[ShaderCache] {
        &self.shaders
    }

    /// The linked program.
    pub fn program(&self) -> Option<&GpuHandle<ProgramId>> {
        self.program.as_ref()
    }

    /// The pipeline state object, `None` if building failed.
    pub fn pipeline_state(&self) -> Option<&GpuHandle<PipelineStateId>> {
        self.pipeline_state.as_ref()
    }

    /// Returns `true` if building failed.
    pub fn is_null(&self) -> bool {
        self.pipeline_state.is_none()
    }
}

impl fmt::Debug for PipelineStateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStateCache")
            .field("key", &format_args!("{:#018x}", self.key()))
            .field("material_blueprint", &self.signature.material_blueprint_asset_id())
            .field("shaders", &self.shaders.len())
            .field("pipeline_state", &self.pipeline_state.as_ref().map(|handle| handle.id()))
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct BuildCounters {
    pub(crate) builds: AtomicU64,
    pub(crate) failures: AtomicU64,
}

/// Turns a signature into GPU objects.
#[derive(Clone)]
pub(crate) struct PipelineStateBuilder {
    device: RenderDevice,
    shader_cache: Arc<ShaderCacheManager>,
    counters: Arc<BuildCounters>,
}

impl PipelineStateBuilder {
    pub(crate) fn new(device: RenderDevice, shader_cache: Arc<ShaderCacheManager>) -> Self {
        Self {
            device,
            shader_cache,
            counters: Arc::new(BuildCounters::default()),
        }
    }

    pub(crate) fn shader_cache(&self) -> &Arc<ShaderCacheManager> {
        &self.shader_cache
    }

    pub(crate) fn counters(&self) -> &BuildCounters {
        &self.counters
    }

    /// Builds shaders, program and pipeline state object. Never fails: errors
    /// are logged and produce a null entry.
    pub(crate) fn build(
        &self,
        blueprint: &MaterialBlueprintResource,
        signature: PipelineStateSignature,
        template: &PipelineStateTemplate,
    ) -> Arc<PipelineStateCache> {
        self.counters.builds.fetch_add(1, Ordering::Relaxed);
        let mut cache = PipelineStateCache {
            root_signature: blueprint.root_signature().clone(),
            shaders: Vec::new(),
            program: None,
            pipeline_state: None,
            signature,
        };
        let label = format!("{} {:#018x}", blueprint.asset_id(), cache.key());
        log::debug!("Building pipeline state {}", label);

        for shader_type in blueprint.shader_types() {
            let Some(shader_blueprint) = blueprint.shader_blueprint(shader_type) else {
                continue;
            };
            match self.shader_cache.get_or_create(
                shader_blueprint,
                shader_type,
                cache.signature.shader_properties(),
            ) {
                Ok(shader) => cache.shaders.push(shader),
                Err(error) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    log::error!("Pipeline state {}: {} shader: {}", label, shader_type.name(), error);
                    return Arc::new(cache);
                }
            }
        }

        let shaders: Vec<_> = cache.shaders.iter().map(|shader| shader.shader().clone()).collect();
        let program = match self.device.create_program(
            blueprint.root_signature(),
            blueprint.vertex_attributes(),
            &shaders,
        ) {
            Ok(program) => program,
            Err(error) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                log::error!("Pipeline state {}: program linking failed: {}", label, error);
                return Arc::new(cache);
            }
        };

        let descriptor = PipelineStateDescriptor::from_template(
            label.as_str(),
            template,
            blueprint.root_signature().id(),
            program.id(),
            blueprint.vertex_attributes().clone(),
        );
        cache.program = Some(program);
        match self.device.create_pipeline_state(&descriptor) {
            Ok(pipeline_state) => cache.pipeline_state = Some(pipeline_state),
            Err(error) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                log::error!("Pipeline state {}: creation failed: {}", label, error);
            }
        }
        Arc::new(cache)
    }
}
