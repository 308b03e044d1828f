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

use super::{Asset, AssetError, AssetId, AssetPackage};
use std::sync::Arc;

/// Resolves asset ids across every mounted [`AssetPackage`].
///
/// Packages mounted later shadow earlier ones, which lets a patch package
/// override individual assets of a base package.
#[derive(Debug, Default)]
pub struct AssetManager {
    packages: Vec<AssetPackage>,
}

impl AssetManager {
    /// Creates a manager without packages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts a package on top of the already mounted ones.
    pub fn mount(&mut self, package: AssetPackage) {
        log::debug!(
            "AssetManager: mounting package '{}' with {} assets",
            package.name(),
            package.assets().len()
        );
        self.packages.push(package);
    }

    /// Unmounts the package with the given name, returning it.
    pub fn unmount(&mut self, name: &str) -> Option<AssetPackage> {
        let index = self.packages.iter().position(|p| p.name() == name)?;
        Some(self.packages.remove(index))
    }

    /// The mounted packages, in mount order.
    pub fn packages(&self) -> &[AssetPackage] {
        &self.packages
    }

    /// Finds an asset in the most recently mounted package that has it.
    pub fn get(&self, asset_id: AssetId) -> Option<&Asset> {
        self.packages.iter().rev().find_map(|p| p.get(asset_id))
    }

    /// Reads the compiled bytes of an asset.
    pub fn read_asset_bytes(&self, asset_id: AssetId) -> Result<Arc<[u8]>, AssetError> {
        let package = self
            .packages
            .iter()
            .rev()
            .find(|p| p.get(asset_id).is_some())
            .ok_or(AssetError::NotFound(asset_id))?;
        package.read(asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_packages_shadow_earlier_ones() {
        let mut base = AssetPackage::new("Base");
        let id = base.add_memory_asset("Example/Texture/Default/White", vec![1u8]).unwrap();
        let mut patch = AssetPackage::new("Patch");
        patch.add_memory_asset("Example/Texture/Default/White", vec![2u8]).unwrap();

        let mut manager = AssetManager::new();
        manager.mount(base);
        manager.mount(patch);
        assert_eq!(&*manager.read_asset_bytes(id).unwrap(), &[2u8]);

        manager.unmount("Patch");
        assert_eq!(&*manager.read_asset_bytes(id).unwrap(), &[1u8]);
    }

    #[test]
    fn missing_asset_is_reported() {
        let manager = AssetManager::new();
        let id = AssetId::from_name("Example/Texture/Default/Missing");
        assert!(matches!(manager.read_asset_bytes(id), Err(AssetError::NotFound(_))));
    }
}
