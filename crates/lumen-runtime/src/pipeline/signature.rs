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

//! Pipeline state cache keys.

use crate::blueprint::MaterialBlueprintResource;
use crate::material::{MaterialProperties, MaterialPropertyValue, Usage, ValueType};
use crate::shader::ShaderProperties;
use lumen_core::asset::AssetId;
use lumen_core::format::MATERIAL_PROPERTY_VALUE_SIZE;
use lumen_core::renderer::api::PipelineStateTemplate;
use lumen_core::{ContentHasher, PropertyId};
use serde::{Deserialize, Serialize};

/// A material value applied on top of the blueprint pipeline state template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOverride {
    /// The state property.
    pub property_id: PropertyId,
    /// Its usage, one of the pipeline state usages.
    pub usage: Usage,
    /// Type of the stored value.
    pub value_type: ValueType,
    /// Little-endian value bytes.
    pub bytes: Vec<u8>,
}

impl StateOverride {
    fn new(property_id: PropertyId, usage: Usage, value: &MaterialPropertyValue) -> Self {
        let mut bytes = vec![0u8; MATERIAL_PROPERTY_VALUE_SIZE];
        let written = value.write_bytes(&mut bytes);
        bytes.truncate(written);
        Self {
            property_id,
            usage,
            value_type: value.value_type(),
            bytes,
        }
    }

    /// The decoded value, `None` when the bytes are malformed.
    pub fn value(&self) -> Option<MaterialPropertyValue> {
        MaterialPropertyValue::from_bytes(self.value_type, &self.bytes).ok()
    }
}

/// Identity of a pipeline state: the blueprint, the optimized shader
/// combination and the hash of the fixed-function state derived from the
/// material.
///
/// Two requests producing equal keys share one cache entry. The signature also
/// keeps the state overrides it was derived from so a persisted signature can
/// be rebuilt in a later run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStateSignature {
    material_blueprint_asset_id: AssetId,
    shader_properties: ShaderProperties,
    state_overrides: Vec<StateOverride>,
    serialized_pipeline_state_hash: u64,
    key: u64,
}

impl PipelineStateSignature {
    /// Computes the signature of a material drawn with `blueprint`.
    ///
    /// `shader_properties` are optimized against the blueprint first, so
    /// switches the shaders never read do not split the cache.
    pub fn new(
        blueprint: &MaterialBlueprintResource,
        shader_properties: &ShaderProperties,
        material: &MaterialProperties,
    ) -> Self {
        Self::with_template(blueprint, shader_properties, material).0
    }

    /// Same as [`PipelineStateSignature::new`], also returning the pipeline state template.
    pub(crate) fn with_template(
        blueprint: &MaterialBlueprintResource,
        shader_properties: &ShaderProperties,
        material: &MaterialProperties,
    ) -> (Self, PipelineStateTemplate) {
        let shader_properties = blueprint.optimize_shader_properties(shader_properties);
        let (template, overrides) = blueprint.pipeline_state_for(material);
        let serialized_pipeline_state_hash = ContentHasher::new().write(&template).finish();
        let key = ContentHasher::new()
            .write(&blueprint.asset_id())
            .write_u64(serialized_pipeline_state_hash)
            .write(&shader_properties)
            .finish();
        let state_overrides = overrides
            .iter()
            .map(|(property_id, value)| {
                let usage = material
                    .get(*property_id)
                    .map_or(Usage::Unknown, |property| property.usage);
                StateOverride::new(*property_id, usage, value)
            })
            .collect();
        let signature = Self {
            material_blueprint_asset_id: blueprint.asset_id(),
            shader_properties,
            state_overrides,
            serialized_pipeline_state_hash,
            key,
        };
        (signature, template)
    }

    /// The cache key.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// The blueprint the pipeline state is built from.
    pub fn material_blueprint_asset_id(&self) -> AssetId {
        self.material_blueprint_asset_id
    }

    /// Optimized shader combination.
    pub fn shader_properties(&self) -> &ShaderProperties {
        &self.shader_properties
    }

    /// Hash of the fixed-function state.
    pub fn serialized_pipeline_state_hash(&self) -> u64 {
        self.serialized_pipeline_state_hash
    }

    /// Material values applied on top of the blueprint template.
    pub fn state_overrides(&self) -> &[StateOverride] {
        &self.state_overrides
    }

    /// The state overrides as material properties, for rebuilding the signature.
    pub fn state_properties(&self) -> MaterialProperties {
        let mut properties = MaterialProperties::new();
        for state_override in &self.state_overrides {
            match state_override.value() {
                Some(value) => {
                    properties.set(state_override.property_id, state_override.usage, value, true);
                }
                None => log::warn!(
                    "Dropping malformed state override {} of blueprint {}",
                    state_override.property_id,
                    self.material_blueprint_asset_id
                ),
            }
        }
        properties
    }
}
