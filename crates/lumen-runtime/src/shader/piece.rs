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

//! Shader piece assets.

use super::builder::{PieceSource, ShaderTemplate};
use crate::error::ShaderBuilderError;
use crate::sync::{read, write};
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use std::sync::{Arc, RwLock};

/// A loaded shader piece: reusable source defining `@piece` blocks.
#[derive(Debug)]
pub struct ShaderPieceResource {
    asset_id: AssetId,
    template: Arc<ShaderTemplate>,
}

impl ShaderPieceResource {
    /// The piece asset.
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// The parsed source.
    pub fn template(&self) -> &Arc<ShaderTemplate> {
        &self.template
    }
}

/// Keeps parsed shader pieces by asset id.
///
/// Shared with the shader cache, which reads pieces while building variants
/// on compiler threads; reloading a piece replaces it atomically.
#[derive(Debug, Default)]
pub struct ShaderPieceResourceManager {
    pieces: RwLock<AHashMap<AssetId, Arc<ShaderPieceResource>>>,
}

impl ShaderPieceResourceManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a piece, replacing a previous version.
    ///
    /// Returns `true` if the piece was already loaded.
    pub fn load(&self, asset_id: AssetId, source: &str) -> Result<bool, ShaderBuilderError> {
        let resource = Arc::new(ShaderPieceResource {
            asset_id,
            template: Arc::new(ShaderTemplate::parse(source)?),
        });
        let mut pieces = write(&self.pieces);
        let replaced = pieces.insert(asset_id, resource).is_some();
        log::debug!(
            "Shader piece {} {}",
            asset_id,
            if replaced { "reloaded" } else { "loaded" }
        );
        Ok(replaced)
    }

    /// Looks a piece up.
    pub fn get(&self, asset_id: AssetId) -> Option<Arc<ShaderPieceResource>> {
        read(&self.pieces).get(&asset_id).cloned()
    }

    /// Forgets a piece.
    pub fn unload(&self, asset_id: AssetId) -> bool {
        write(&self.pieces).remove(&asset_id).is_some()
    }

    /// Number of loaded pieces.
    pub fn len(&self) -> usize {
        read(&self.pieces).len()
    }

    /// Returns `true` if no piece is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PieceSource for ShaderPieceResourceManager {
    fn piece_template(&self, asset_id: AssetId) -> Option<Arc<ShaderTemplate>> {
        self.get(asset_id).map(|piece| piece.template.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_replaces_the_piece() {
        let manager = ShaderPieceResourceManager::new();
        let id = AssetId::from_name("Example/ShaderPiece/Core/Common");
        assert!(!manager.load(id, "@piece(A)1@end").unwrap());
        let first = manager.piece_template(id).unwrap();
        assert!(manager.load(id, "@piece(A)2@end").unwrap());
        assert_ne!(manager.piece_template(id).unwrap(), first);
        assert_eq!(manager.len(), 1);
        assert!(manager.unload(id));
        assert!(manager.piece_template(id).is_none());
    }

    #[test]
    fn malformed_pieces_are_not_registered() {
        let manager = ShaderPieceResourceManager::new();
        let id = AssetId::from_name("Example/ShaderPiece/Core/Broken");
        assert!(manager.load(id, "@piece(A)").is_err());
        assert!(manager.is_empty());
    }
}
