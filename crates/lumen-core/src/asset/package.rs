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

use super::{Asset, AssetError, AssetId};
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A named, immutable-once-loaded set of assets sorted by id.
///
/// Assets are either read from files below an optional root directory or served
/// from blobs registered in memory (used by tools and tests).
#[derive(Debug, Clone, Default)]
pub struct AssetPackage {
    name: String,
    root: Option<PathBuf>,
    sorted_assets: Vec<Asset>,
    blobs: AHashMap<AssetId, Arc<[u8]>>,
}

impl AssetPackage {
    /// Creates an empty package without a root directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates an empty package whose filenames are resolved below `root`.
    pub fn with_root(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: Some(root.into()),
            ..Default::default()
        }
    }

    /// The package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root directory, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Registers a file-backed asset.
    pub fn add_asset(&mut self, asset: Asset) -> Result<(), AssetError> {
        match self
            .sorted_assets
            .binary_search_by_key(&asset.asset_id, |a| a.asset_id)
        {
            Ok(_) => Err(AssetError::Duplicate {
                asset_id: asset.asset_id,
                filename: asset.filename,
                package: self.name.clone(),
            }),
            Err(position) => {
                self.sorted_assets.insert(position, asset);
                Ok(())
            }
        }
    }

    /// Registers an asset whose compiled bytes live in memory.
    pub fn add_memory_asset(
        &mut self,
        name: &str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<AssetId, AssetError> {
        let asset_id = AssetId::from_name(name);
        self.add_asset(Asset {
            asset_id,
            filename: name.to_string(),
        })?;
        self.blobs.insert(asset_id, bytes.into());
        Ok(asset_id)
    }

    /// Looks up an asset by id.
    pub fn get(&self, asset_id: AssetId) -> Option<&Asset> {
        self.sorted_assets
            .binary_search_by_key(&asset_id, |a| a.asset_id)
            .ok()
            .map(|index| &self.sorted_assets[index])
    }

    /// All assets, sorted by id.
    pub fn assets(&self) -> &[Asset] {
        &self.sorted_assets
    }

    /// Reads the compiled bytes of an asset of this package.
    pub fn read(&self, asset_id: AssetId) -> Result<Arc<[u8]>, AssetError> {
        let asset = self.get(asset_id).ok_or(AssetError::NotFound(asset_id))?;
        if let Some(blob) = self.blobs.get(&asset_id) {
            return Ok(blob.clone());
        }
        let root = self.root.as_ref().ok_or(AssetError::NoBackingData(asset_id))?;
        let path = root.join(&asset.filename);
        std::fs::read(&path)
            .map(Arc::from)
            .map_err(|source| AssetError::Io {
                asset_id,
                path: path.display().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_sorted_by_id() {
        let mut package = AssetPackage::new("Test");
        let names = [
            "Example/Mesh/Default/Cube",
            "Example/Mesh/Default/Sphere",
            "Example/Mesh/Default/Plane",
        ];
        for name in names {
            package.add_memory_asset(name, vec![1u8, 2, 3]).unwrap();
        }
        let ids: Vec<u64> = package.assets().iter().map(|a| a.asset_id.value()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        for name in names {
            assert!(package.get(AssetId::from_name(name)).is_some());
        }
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut package = AssetPackage::new("Test");
        package.add_memory_asset("A/B/C/D", vec![0u8]).unwrap();
        assert!(matches!(
            package.add_memory_asset("A/B/C/D", vec![1u8]),
            Err(AssetError::Duplicate { .. })
        ));
    }

    #[test]
    fn read_without_backing_data_fails() {
        let mut package = AssetPackage::new("Test");
        let asset_id = AssetId::from_name("A/B/C/D");
        package
            .add_asset(Asset {
                asset_id,
                filename: "d.asset".into(),
            })
            .unwrap();
        assert!(matches!(package.read(asset_id), Err(AssetError::NoBackingData(_))));
    }
}
