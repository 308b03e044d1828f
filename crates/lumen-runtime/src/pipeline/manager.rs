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

//! The pipeline state cache manager.

use super::cache::{PipelineStateBuilder, PipelineStateCache};
use super::compiler::PipelineStateCompiler;
use super::persistence::PipelineCacheSnapshot;
use super::signature::PipelineStateSignature;
use crate::blueprint::MaterialBlueprintResource;
use crate::material::MaterialProperties;
use crate::shader::{ShaderCacheManager, ShaderProperties};
use crate::sync::{read, write};
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::renderer::api::PipelineStateTemplate;
use lumen_core::renderer::RenderDevice;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

struct Slot {
    material_blueprint_asset_id: AssetId,
    queued: AtomicBool,
    cell: OnceLock<Arc<PipelineStateCache>>,
}

/// Clears `queued` when a background build ends without filling the slot, so
/// the next asynchronous request queues it again.
struct QueuedBuild(Arc<Slot>);

impl Drop for QueuedBuild {
    fn drop(&mut self) {
        if self.0.cell.get().is_none() {
            self.0.queued.store(false, Ordering::Release);
        }
    }
}

/// The answer to an asynchronous request.
#[derive(Debug, Clone)]
pub enum PipelineStateRequest {
    /// The pipeline state is built, possibly null.
    Ready(Arc<PipelineStateCache>),
    /// The pipeline state is being built in the background.
    Pending {
        /// A ready pipeline state of a simpler shader combination, if any.
        fallback: Option<Arc<PipelineStateCache>>,
    },
}

impl PipelineStateRequest {
    /// The pipeline state to draw with right now: the requested one, else the fallback.
    pub fn usable(&self) -> Option<&Arc<PipelineStateCache>> {
        match self {
            PipelineStateRequest::Ready(cache) => Some(cache),
            PipelineStateRequest::Pending { fallback } => fallback.as_ref(),
        }
        .filter(|cache| !cache.is_null())
    }
}

/// Counters of the pipeline state cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStateCacheStatistics {
    /// Requests answered from the cache.
    pub hits: u64,
    /// Requests that found no built entry.
    pub misses: u64,
    /// Pipeline states built.
    pub builds: u64,
    /// Builds that produced a null entry.
    pub failures: u64,
}

/// Looks up or builds the pipeline states of material blueprints.
///
/// Lookups are safe from any number of threads. For a given key at most one
/// build ever runs: concurrent requests wait for it and receive the same
/// `Arc`. Entries are immutable and only leave the cache through
/// [`PipelineStateCacheManager::invalidate`] or [`PipelineStateCacheManager::clear`].
pub struct PipelineStateCacheManager {
    builder: PipelineStateBuilder,
    slots: RwLock<AHashMap<u64, Arc<Slot>>>,
    compiler: Option<PipelineStateCompiler>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PipelineStateCacheManager {
    /// A manager building on the calling thread.
    pub fn new(device: RenderDevice, shader_cache: Arc<ShaderCacheManager>) -> Self {
        Self {
            builder: PipelineStateBuilder::new(device, shader_cache),
            slots: RwLock::new(AHashMap::new()),
            compiler: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A manager answering [`PipelineStateCacheManager::request_async`] with background builds.
    pub fn with_compiler(
        device: RenderDevice,
        shader_cache: Arc<ShaderCacheManager>,
        compiler: PipelineStateCompiler,
    ) -> Self {
        Self {
            compiler: Some(compiler),
            ..Self::new(device, shader_cache)
        }
    }

    /// The shader cache used by builds.
    pub fn shader_cache(&self) -> &Arc<ShaderCacheManager> {
        self.builder.shader_cache()
    }

    /// The background compiler, if asynchronous compilation is enabled.
    pub fn compiler(&self) -> Option<&PipelineStateCompiler> {
        self.compiler.as_ref()
    }

    fn slot(&self, key: u64, material_blueprint_asset_id: AssetId) -> Arc<Slot> {
        if let Some(slot) = read(&self.slots).get(&key) {
            return Arc::clone(slot);
        }
        let mut slots = write(&self.slots);
        Arc::clone(slots.entry(key).or_insert_with(|| {
            Arc::new(Slot {
                material_blueprint_asset_id,
                queued: AtomicBool::new(false),
                cell: OnceLock::new(),
            })
        }))
    }

    fn ready(&self, key: u64) -> Option<Arc<PipelineStateCache>> {
        read(&self.slots).get(&key).and_then(|slot| slot.cell.get().cloned())
    }

    /// Returns the pipeline state of a material, building it on first request.
    ///
    /// The result may be null when building failed; the failure is cached
    /// until the blueprint is invalidated.
    pub fn request(
        &self,
        blueprint: &MaterialBlueprintResource,
        shader_properties: &ShaderProperties,
        material: &MaterialProperties,
    ) -> Arc<PipelineStateCache> {
        let (signature, template) = PipelineStateSignature::with_template(blueprint, shader_properties, material);
        self.request_signature(blueprint, signature, &template)
    }

    fn request_signature(
        &self,
        blueprint: &MaterialBlueprintResource,
        signature: PipelineStateSignature,
        template: &PipelineStateTemplate,
    ) -> Arc<PipelineStateCache> {
        let slot = self.slot(signature.key(), blueprint.asset_id());
        if let Some(cache) = slot.cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("Pipeline state cache hit {:#018x}", signature.key());
            return Arc::clone(cache);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Arc::clone(
            slot.cell
                .get_or_init(|| self.builder.build(blueprint, signature, template)),
        )
    }

    /// Returns the pipeline state if it is built, otherwise queues a background
    /// build and answers with the closest ready fallback.
    ///
    /// The fallback search drops the least visually important switch, one at a
    /// time, until a ready entry is found. Without a compiler this behaves like
    /// [`PipelineStateCacheManager::request`].
    pub fn request_async(
        &self,
        blueprint: &Arc<MaterialBlueprintResource>,
        shader_properties: &ShaderProperties,
        material: &MaterialProperties,
    ) -> PipelineStateRequest {
        let Some(compiler) = self.compiler.as_ref() else {
            return PipelineStateRequest::Ready(self.request(blueprint, shader_properties, material));
        };
        let (signature, template) = PipelineStateSignature::with_template(blueprint, shader_properties, material);
        let slot = self.slot(signature.key(), blueprint.asset_id());
        if let Some(cache) = slot.cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return PipelineStateRequest::Ready(Arc::clone(cache));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let fallback = self.find_fallback(blueprint, signature.shader_properties(), material);
        if !slot.queued.swap(true, Ordering::AcqRel) {
            let builder = self.builder.clone();
            let blueprint = Arc::clone(blueprint);
            let queued = QueuedBuild(Arc::clone(&slot));
            compiler.submit(move || {
                let QueuedBuild(slot) = &queued;
                slot.cell
                    .get_or_init(|| builder.build(&blueprint, signature, &template));
            });
        }
        PipelineStateRequest::Pending { fallback }
    }

    fn find_fallback(
        &self,
        blueprint: &MaterialBlueprintResource,
        shader_properties: &ShaderProperties,
        material: &MaterialProperties,
    ) -> Option<Arc<PipelineStateCache>> {
        let mut reduced = shader_properties.clone();
        while !reduced.is_empty() {
            let least_important = reduced
                .iter()
                .min_by_key(|(property_id, _)| {
                    let importance = blueprint
                        .shader_combination_property(*property_id)
                        .map_or(i32::MIN, |meta| meta.visual_importance);
                    (importance, *property_id)
                })
                .map(|(property_id, _)| property_id)?;
            reduced.remove(least_important);
            let signature = PipelineStateSignature::new(blueprint, &reduced, material);
            if let Some(cache) = self.ready(signature.key()).filter(|cache| !cache.is_null()) {
                log::trace!(
                    "Pipeline state fallback {:#018x} for blueprint {}",
                    cache.key(),
                    blueprint.asset_id()
                );
                return Some(cache);
            }
        }
        None
    }

    /// Drops every entry of a blueprint. Returns how many were dropped; a
    /// second call in a row drops nothing.
    pub fn invalidate(&self, material_blueprint_asset_id: AssetId) -> usize {
        let mut slots = write(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| slot.material_blueprint_asset_id != material_blueprint_asset_id);
        let dropped = before - slots.len();
        if dropped > 0 {
            log::debug!(
                "Invalidated {} pipeline states of blueprint {}",
                dropped,
                material_blueprint_asset_id
            );
        }
        dropped
    }

    /// Drops every entry.
    pub fn clear(&self) {
        write(&self.slots).clear();
    }

    /// Number of entries, built or being built.
    pub fn len(&self) -> usize {
        read(&self.slots).len()
    }

    /// Returns `true` if the cache holds no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn statistics(&self) -> PipelineStateCacheStatistics {
        let counters = self.builder.counters();
        PipelineStateCacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: counters.builds.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Blocks until queued background builds are done.
    pub fn wait_until_idle(&self) {
        if let Some(compiler) = &self.compiler {
            compiler.wait_until_idle();
        }
    }

    /// Signatures of every successfully built entry, sorted by key.
    pub fn signatures(&self) -> Vec<PipelineStateSignature> {
        let mut signatures: Vec<_> = read(&self.slots)
            .values()
            .filter_map(|slot| slot.cell.get())
            .filter(|cache| !cache.is_null())
            .map(|cache| cache.signature().clone())
            .collect();
        signatures.sort_by_key(PipelineStateSignature::key);
        signatures
    }

    /// Everything worth persisting.
    pub fn snapshot(&self) -> PipelineCacheSnapshot {
        PipelineCacheSnapshot {
            signatures: self.signatures(),
            shader_bytecode: self.shader_cache().export_bytecode(),
        }
    }

    /// Seeds the shader cache with persisted bytecode and rebuilds persisted
    /// signatures whose blueprint `find_blueprint` knows. Returns the number of
    /// pipeline states built.
    pub fn warm_up(
        &self,
        snapshot: PipelineCacheSnapshot,
        find_blueprint: impl Fn(AssetId) -> Option<Arc<MaterialBlueprintResource>>,
    ) -> usize {
        self.shader_cache().load_bytecode(snapshot.shader_bytecode);
        let mut built = 0;
        for persisted in &snapshot.signatures {
            let Some(blueprint) = find_blueprint(persisted.material_blueprint_asset_id()) else {
                log::debug!(
                    "Skipping persisted pipeline state of unloaded blueprint {}",
                    persisted.material_blueprint_asset_id()
                );
                continue;
            };
            let (signature, template) = PipelineStateSignature::with_template(
                &blueprint,
                persisted.shader_properties(),
                &persisted.state_properties(),
            );
            if signature.key() != persisted.key() {
                log::debug!(
                    "Persisted pipeline state {:#018x} of blueprint {} changed key",
                    persisted.key(),
                    blueprint.asset_id()
                );
            }
            if !self.request_signature(&blueprint, signature, &template).is_null() {
                built += 1;
            }
        }
        log::info!(
            "Pipeline state cache warm-up built {} of {} persisted entries",
            built,
            snapshot.signatures.len()
        );
        built
    }
}

impl std::fmt::Debug for PipelineStateCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStateCacheManager")
            .field("entries", &self.len())
            .field("statistics", &self.statistics())
            .field("compiler", &self.compiler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued_slot() -> Arc<Slot> {
        Arc::new(Slot {
            material_blueprint_asset_id: AssetId::from_name("Example/MaterialBlueprint/Mesh/Forward"),
            queued: AtomicBool::new(true),
            cell: OnceLock::new(),
        })
    }

    #[test]
    fn an_interrupted_build_can_be_queued_again() {
        let slot = queued_slot();
        let queued = QueuedBuild(Arc::clone(&slot));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _queued = queued;
            panic!("pipeline state build failed");
        }));
        assert!(result.is_err());
        assert!(slot.cell.get().is_none());
        assert!(!slot.queued.load(Ordering::Acquire));
    }
}
