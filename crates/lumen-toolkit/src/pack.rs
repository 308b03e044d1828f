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

//! Asset packs: compiled blobs on disk plus a binary index.
//!
//! A pack directory holds one file per asset, laid out like the asset names,
//! and an `index.bin` listing every asset. The index is what the runtime
//! mounts as an [`AssetPackage`].

use crate::compiler::CompiledAsset;
use crate::error::ToolkitError;
use lumen_core::asset::{Asset, AssetId, AssetPackage};
use lumen_core::format::AssetFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the pack index inside a pack directory.
pub const INDEX_FILENAME: &str = "index.bin";

/// Extension of compiled asset files.
pub const ASSET_EXTENSION: &str = "asset";

/// One asset of a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackEntry {
    /// The asset name.
    pub asset_name: String,
    /// Raw value of the hashed asset name.
    pub asset_id: u64,
    /// The compiled format.
    pub format: AssetFormat,
    /// File of the asset, relative to the pack directory.
    pub filename: String,
}

/// The index of a pack, sorted by asset id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackIndex {
    /// The pack name, used as the package name when mounted.
    pub name: String,
    /// Every asset of the pack.
    pub entries: Vec<PackEntry>,
}

impl PackIndex {
    /// Reads the index of the pack in `directory`.
    pub fn read(directory: &Path) -> Result<Self, ToolkitError> {
        let path = directory.join(INDEX_FILENAME);
        let bytes = std::fs::read(&path).map_err(|source| ToolkitError::io(&path, source))?;
        let (index, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(index)
    }

    /// Writes the index into `directory`.
    pub fn write(&self, directory: &Path) -> Result<(), ToolkitError> {
        let path = directory.join(INDEX_FILENAME);
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        std::fs::write(&path, bytes).map_err(|source| ToolkitError::io(&path, source))
    }

    /// Builds a file-backed package rooted at `directory`.
    pub fn to_package(&self, directory: impl Into<PathBuf>) -> Result<AssetPackage, ToolkitError> {
        let mut package = AssetPackage::with_root(self.name.clone(), directory);
        for entry in &self.entries {
            package.add_asset(Asset {
                asset_id: AssetId::from_raw(entry.asset_id),
                filename: entry.filename.clone(),
            })?;
        }
        Ok(package)
    }
}

/// Writes `assets` and their index into `output_directory`, creating it if needed.
pub fn write_pack(
    name: &str,
    output_directory: &Path,
    assets: &[CompiledAsset],
) -> Result<PackIndex, ToolkitError> {
    let mut entries = Vec::with_capacity(assets.len());
    for asset in assets {
        let filename = format!("{}.{}", asset.asset_name, ASSET_EXTENSION);
        let path = output_directory.join(&filename);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ToolkitError::io(parent, source))?;
        }
        std::fs::write(&path, &asset.bytes).map_err(|source| ToolkitError::io(&path, source))?;
        entries.push(PackEntry {
            asset_name: asset.asset_name.clone(),
            asset_id: asset.asset_id.value(),
            format: asset.format,
            filename,
        });
    }
    entries.sort_by_key(|entry| entry.asset_id);

    std::fs::create_dir_all(output_directory)
        .map_err(|source| ToolkitError::io(output_directory, source))?;
    let index = PackIndex {
        name: name.to_string(),
        entries,
    };
    index.write(output_directory)?;
    log::info!(
        "Wrote pack '{}' with {} assets to '{}'",
        name,
        index.entries.len(),
        output_directory.display()
    );
    Ok(index)
}
