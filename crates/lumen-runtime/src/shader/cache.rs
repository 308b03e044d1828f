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

//! Compiled shader variants.
//!
//! A shader combination is identified by the shader blueprint, the shader type
//! and the switches that blueprint actually reads. Generated sources are hashed
//! as well: two combinations producing the same text share one compiled shader.
//! Both levels are built at most once, even under concurrent requests.

use super::blueprint::ShaderBlueprintResource;
use super::builder::ShaderBuilder;
use super::piece::ShaderPieceResourceManager;
use super::properties::ShaderProperties;
use crate::error::ShaderCacheError;
use crate::sync::{read, write};
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::hash::ContentHasher;
use lumen_core::renderer::{GpuHandle, RenderDevice, ShaderId, ShaderSource, ShaderType};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

/// Exported bytecode of a compiled shader, keyed by its source hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderBytecode {
    /// Hash of the shader type and generated source.
    pub source_hash: u64,
    /// Stage of the shader.
    pub shader_type: ShaderType,
    /// Backend bytecode.
    pub bytecode: Vec<u8>,
}

/// A compiled shader variant.
#[derive(Debug, Clone)]
pub struct ShaderCache {
    combination_id: u64,
    source_hash: u64,
    shader: GpuHandle<ShaderId>,
}

impl ShaderCache {
    /// Identifier of the combination.
    pub fn combination_id(&self) -> u64 {
        self.combination_id
    }

    /// Hash of the generated source.
    pub fn source_hash(&self) -> u64 {
        self.source_hash
    }

    /// The compiled shader.
    pub fn shader(&self) -> &GpuHandle<ShaderId> {
        &self.shader
    }
}

/// Counters of the shader cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaderCacheStatistics {
    /// Combinations requested and found.
    pub hits: u64,
    /// Combinations generated.
    pub generated: u64,
    /// Shaders compiled from source.
    pub compiled: u64,
    /// Shaders recreated from persisted bytecode.
    pub from_bytecode: u64,
    /// Combinations that reused the shader of an identical source.
    pub source_reuses: u64,
    /// Combinations that failed.
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    generated: AtomicU64,
    compiled: AtomicU64,
    from_bytecode: AtomicU64,
    source_reuses: AtomicU64,
    failures: AtomicU64,
}

type ShaderResult = Result<GpuHandle<ShaderId>, ShaderCacheError>;

struct CombinationSlot {
    shader_blueprint_asset_id: AssetId,
    cell: OnceLock<Result<ShaderCache, ShaderCacheError>>,
}

struct SourceSlot {
    shader_type: ShaderType,
    cell: OnceLock<ShaderResult>,
}

/// Builds and caches shader variants.
pub struct ShaderCacheManager {
    device: RenderDevice,
    pieces: Arc<ShaderPieceResourceManager>,
    combinations: RwLock<AHashMap<u64, Arc<CombinationSlot>>>,
    sources: RwLock<AHashMap<u64, Arc<SourceSlot>>>,
    bytecode: RwLock<AHashMap<u64, ShaderBytecode>>,
    counters: Counters,
}

impl ShaderCacheManager {
    /// Creates an empty cache compiling through `device`.
    pub fn new(device: RenderDevice, pieces: Arc<ShaderPieceResourceManager>) -> Self {
        Self {
            device,
            pieces,
            combinations: RwLock::new(AHashMap::new()),
            sources: RwLock::new(AHashMap::new()),
            bytecode: RwLock::new(AHashMap::new()),
            counters: Counters::default(),
        }
    }

    /// The shader pieces used for `@includepiece`.
    pub fn pieces(&self) -> &Arc<ShaderPieceResourceManager> {
        &self.pieces
    }

    /// The switches of `properties` read by the shader blueprint.
    pub fn relevant_properties(
        shader_blueprint: &ShaderBlueprintResource,
        properties: &ShaderProperties,
    ) -> ShaderProperties {
        let mut relevant = properties.clone();
        relevant.retain(|id, _| shader_blueprint.references(id));
        relevant
    }

    /// Identifier of a combination. Switches the blueprint does not read are ignored.
    pub fn combination_id(
        shader_blueprint: &ShaderBlueprintResource,
        shader_type: ShaderType,
        properties: &ShaderProperties,
    ) -> u64 {
        ContentHasher::new()
            .write(&shader_blueprint.asset_id())
            .write(&shader_type)
            .write(&Self::relevant_properties(shader_blueprint, properties))
            .finish()
    }

    /// Expands the template of a combination.
    pub fn generate_source(
        &self,
        shader_blueprint: &ShaderBlueprintResource,
        properties: &ShaderProperties,
    ) -> Result<String, ShaderCacheError> {
        let relevant = Self::relevant_properties(shader_blueprint, properties);
        Ok(ShaderBuilder::new(&relevant, self.pieces.as_ref()).generate(shader_blueprint.template())?)
    }

    /// Returns the shader of a combination, building it on first request.
    ///
    /// Failures are cached too: a broken combination is not rebuilt until its
    /// shader blueprint is invalidated.
    pub fn get_or_create(
        &self,
        shader_blueprint: &ShaderBlueprintResource,
        shader_type: ShaderType,
        properties: &ShaderProperties,
    ) -> Result<ShaderCache, ShaderCacheError> {
        let combination_id = Self::combination_id(shader_blueprint, shader_type, properties);
        let slot = self.combination_slot(combination_id, shader_blueprint.asset_id());
        let mut built = false;
        let result = slot.cell.get_or_init(|| {
            built = true;
            self.build(combination_id, shader_blueprint, shader_type, properties)
        });
        if !built {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        }
        result.clone()
    }

    fn combination_slot(&self, combination_id: u64, shader_blueprint_asset_id: AssetId) -> Arc<CombinationSlot> {
        if let Some(slot) = read(&self.combinations).get(&combination_id) {
            return slot.clone();
        }
        write(&self.combinations)
            .entry(combination_id)
            .or_insert_with(|| {
                Arc::new(CombinationSlot {
                    shader_blueprint_asset_id,
                    cell: OnceLock::new(),
                })
            })
            .clone()
    }

    fn build(
        &self,
        combination_id: u64,
        shader_blueprint: &ShaderBlueprintResource,
        shader_type: ShaderType,
        properties: &ShaderProperties,
    ) -> Result<ShaderCache, ShaderCacheError> {
        self.counters.generated.fetch_add(1, Ordering::Relaxed);
        let source = self.generate_source(shader_blueprint, properties).inspect_err(|error| {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            log::error!(
                "Shader blueprint {} ({}): {}",
                shader_blueprint.asset_id(),
                shader_type.name(),
                error
            );
        })?;
        let source_hash = ContentHasher::new()
            .write(&shader_type)
            .write_bytes(source.as_bytes())
            .finish();

        let slot = {
            let existing = read(&self.sources).get(&source_hash).cloned();
            match existing {
                Some(slot) => slot,
                None => write(&self.sources)
                    .entry(source_hash)
                    .or_insert_with(|| {
                        Arc::new(SourceSlot {
                            shader_type,
                            cell: OnceLock::new(),
                        })
                    })
                    .clone(),
            }
        };
        let mut compiled_here = false;
        let shader = slot.cell.get_or_init(|| {
            compiled_here = true;
            let label = format!("{} {}", shader_blueprint.asset_id(), shader_type.name());
            self.compile(&label, shader_type, source_hash, &source)
        });
        if !compiled_here {
            self.counters.source_reuses.fetch_add(1, Ordering::Relaxed);
        }
        match shader {
            Ok(shader) => Ok(ShaderCache {
                combination_id,
                source_hash,
                shader: shader.clone(),
            }),
            Err(error) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                Err(error.clone())
            }
        }
    }

    fn compile(&self, label: &str, shader_type: ShaderType, source_hash: u64, source: &str) -> ShaderResult {
        let persisted = read(&self.bytecode).get(&source_hash).cloned();
        if let Some(persisted) = persisted.filter(|entry| entry.shader_type == shader_type) {
            match self
                .device
                .create_shader_from_bytecode(shader_type, &persisted.bytecode)
            {
                Ok(shader) => {
                    self.counters.from_bytecode.fetch_add(1, Ordering::Relaxed);
                    log::trace!("Shader '{}' recreated from bytecode", label);
                    return Ok(shader);
                }
                Err(error) => log::warn!(
                    "Persisted bytecode of shader '{}' rejected, compiling from source: {}",
                    label,
                    error
                ),
            }
        }
        log::debug!("Compiling shader '{}' ({} bytes)", label, source.len());
        match self.device.create_shader(&ShaderSource {
            label,
            shader_type,
            source_code: source,
        }) {
            Ok(shader) => {
                self.counters.compiled.fetch_add(1, Ordering::Relaxed);
                Ok(shader)
            }
            Err(error) => {
                log::error!("Shader '{}' failed to compile: {}", label, error);
                Err(ShaderCacheError::Compilation {
                    label: label.to_string(),
                    details: error.to_string(),
                })
            }
        }
    }

    /// Drops every combination of a shader blueprint. Returns how many were dropped.
    pub fn invalidate(&self, shader_blueprint_asset_id: AssetId) -> usize {
        let mut combinations = write(&self.combinations);
        let before = combinations.len();
        combinations.retain(|_, slot| slot.shader_blueprint_asset_id != shader_blueprint_asset_id);
        let dropped = before - combinations.len();
        if dropped > 0 {
            log::debug!(
                "Invalidated {} shader combinations of {}",
                dropped,
                shader_blueprint_asset_id
            );
        }
        dropped
    }

    /// Drops every combination and compiled source.
    pub fn clear(&self) {
        write(&self.combinations).clear();
        write(&self.sources).clear();
    }

    /// Number of cached combinations.
    pub fn len(&self) -> usize {
        read(&self.combinations).len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes persisted bytecode available to later compilations.
    pub fn load_bytecode(&self, entries: impl IntoIterator<Item = ShaderBytecode>) {
        let mut bytecode = write(&self.bytecode);
        for entry in entries {
            bytecode.insert(entry.source_hash, entry);
        }
    }

    /// Exports the bytecode of every compiled shader the backend can export.
    pub fn export_bytecode(&self) -> Vec<ShaderBytecode> {
        let sources = read(&self.sources);
        let mut entries: Vec<ShaderBytecode> = sources
            .iter()
            .filter_map(|(source_hash, slot)| {
                let shader = slot.cell.get()?.as_ref().ok()?;
                Some(ShaderBytecode {
                    source_hash: *source_hash,
                    shader_type: slot.shader_type,
                    bytecode: self.device.shader_bytecode(shader)?,
                })
            })
            .collect();
        entries.sort_by_key(|entry| entry.source_hash);
        entries
    }

    /// Snapshot of the counters.
    pub fn statistics(&self) -> ShaderCacheStatistics {
        ShaderCacheStatistics {
            hits: self.counters.hits.load(Ordering::Relaxed),
            generated: self.counters.generated.load(Ordering::Relaxed),
            compiled: self.counters.compiled.load(Ordering::Relaxed),
            from_bytecode: self.counters.from_bytecode.load(Ordering::Relaxed),
            source_reuses: self.counters.source_reuses.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ShaderCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderCacheManager")
            .field("combinations", &self.len())
            .field("statistics", &self.statistics())
            .finish()
    }
}
