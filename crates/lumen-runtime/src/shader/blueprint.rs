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

//! Shader blueprint assets: templates the shader cache expands into variants.

use super::builder::{PieceSource, ShaderTemplate};
use crate::error::ShaderBuilderError;
use crate::sync::{read, write};
use ahash::{AHashMap, AHashSet};
use lumen_core::asset::AssetId;
use lumen_core::PropertyId;
use std::sync::{Arc, RwLock};

/// A loaded shader blueprint.
#[derive(Debug)]
pub struct ShaderBlueprintResource {
    asset_id: AssetId,
    template: Arc<ShaderTemplate>,
    referenced_properties: Vec<PropertyId>,
    included_pieces: Vec<AssetId>,
}

impl ShaderBlueprintResource {
    /// Builds a resource, collecting the switches read by the template and by
    /// every piece asset it includes, transitively.
    pub fn new(asset_id: AssetId, template: Arc<ShaderTemplate>, pieces: &dyn PieceSource) -> Self {
        let mut referenced_properties = template.referenced_properties();
        let mut included_pieces = Vec::new();
        let mut visited = AHashSet::new();
        let mut pending = template.included_pieces();
        while let Some(piece_id) = pending.pop() {
            if !visited.insert(piece_id) {
                continue;
            }
            included_pieces.push(piece_id);
            match pieces.piece_template(piece_id) {
                Some(piece) => {
                    referenced_properties.extend(piece.referenced_properties());
                    pending.extend(piece.included_pieces());
                }
                None => log::warn!(
                    "Shader blueprint {} includes piece {} which is not loaded",
                    asset_id,
                    piece_id
                ),
            }
        }
        referenced_properties.sort();
        referenced_properties.dedup();
        included_pieces.sort();
        Self {
            asset_id,
            template,
            referenced_properties,
            included_pieces,
        }
    }

    /// The shader blueprint asset.
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// The parsed template.
    pub fn template(&self) -> &ShaderTemplate {
        &self.template
    }

    /// Switches read by the template or its pieces, sorted.
    pub fn referenced_properties(&self) -> &[PropertyId] {
        &self.referenced_properties
    }

    /// Returns `true` if the template reads the switch.
    pub fn references(&self, property_id: PropertyId) -> bool {
        self.referenced_properties.binary_search(&property_id).is_ok()
    }

    /// Piece assets included directly or transitively, sorted.
    pub fn included_pieces(&self) -> &[AssetId] {
        &self.included_pieces
    }
}

/// Keeps shader blueprints by asset id.
#[derive(Debug, Default)]
pub struct ShaderBlueprintResourceManager {
    blueprints: RwLock<AHashMap<AssetId, Arc<ShaderBlueprintResource>>>,
}

impl ShaderBlueprintResourceManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a shader blueprint, replacing a previous version.
    pub fn load(
        &self,
        asset_id: AssetId,
        source: &str,
        pieces: &dyn PieceSource,
    ) -> Result<Arc<ShaderBlueprintResource>, ShaderBuilderError> {
        let template = Arc::new(ShaderTemplate::parse(source)?);
        let resource = Arc::new(ShaderBlueprintResource::new(asset_id, template, pieces));
        log::debug!(
            "Shader blueprint {} loaded, {} referenced properties",
            asset_id,
            resource.referenced_properties.len()
        );
        write(&self.blueprints).insert(asset_id, resource.clone());
        Ok(resource)
    }

    /// Looks a shader blueprint up.
    pub fn get(&self, asset_id: AssetId) -> Option<Arc<ShaderBlueprintResource>> {
        read(&self.blueprints).get(&asset_id).cloned()
    }

    /// Recomputes the references of every blueprint including `piece_id`.
    ///
    /// Returns the affected shader blueprints.
    pub fn refresh_piece(&self, piece_id: AssetId, pieces: &dyn PieceSource) -> Vec<AssetId> {
        let mut blueprints = write(&self.blueprints);
        let mut affected = Vec::new();
        for (asset_id, resource) in blueprints.iter_mut() {
            if resource.included_pieces.binary_search(&piece_id).is_err() {
                continue;
            }
            *resource = Arc::new(ShaderBlueprintResource::new(
                *asset_id,
                resource.template.clone(),
                pieces,
            ));
            affected.push(*asset_id);
        }
        affected.sort();
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::piece::ShaderPieceResourceManager;

    #[test]
    fn references_include_transitive_pieces() {
        let pieces = ShaderPieceResourceManager::new();
        let outer = AssetId::from_name("Example/ShaderPiece/Core/Outer");
        pieces
            .load(
                outer,
                "@includepiece(Example/ShaderPiece/Core/Inner)@piece(O)@value(OUTER)@end",
            )
            .unwrap();
        pieces
            .load(
                AssetId::from_name("Example/ShaderPiece/Core/Inner"),
                "@piece(I)@property(INNER)x@end@end",
            )
            .unwrap();

        let manager = ShaderBlueprintResourceManager::new();
        let id = AssetId::from_name("Example/ShaderBlueprint/Mesh/Vertex");
        let blueprint = manager
            .load(
                id,
                "@includepiece(Example/ShaderPiece/Core/Outer)@property(OWN)@end",
                &pieces,
            )
            .unwrap();
        for name in ["OWN", "OUTER", "INNER"] {
            assert!(blueprint.references(PropertyId::from_name(name)), "{name}");
        }
        assert_eq!(blueprint.included_pieces().len(), 2);
        assert_eq!(manager.refresh_piece(outer, &pieces), vec![id]);
        assert!(manager
            .refresh_piece(AssetId::from_name("Example/ShaderPiece/Core/Other"), &pieces)
            .is_empty());
    }
}
