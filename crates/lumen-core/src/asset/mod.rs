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

//! Asset identity and asset packages.
//!
//! Assets are referenced everywhere by an [`AssetId`], a stable hash of the asset
//! name. Names follow the scheme `<project>/<asset type>/<category>/<name>`, for
//! example `Example/MaterialBlueprint/Mesh/Forward`. The toolkit and the runtime
//! hash names with the same function, so ids baked into compiled blobs resolve at
//! runtime without a reverse filename index.
//!
//! The key components are:
//! - [`AssetId`]: the hashed identifier.
//! - [`Asset`]: the immutable `{ id, filename }` record owned by a package.
//! - [`AssetPackage`]: a sorted set of assets, optionally backed by in-memory blobs.
//! - [`AssetManager`]: lookup across all mounted packages.

mod manager;
mod package;

pub use manager::*;
pub use package::*;

use crate::hash::{ContentHash, ContentHasher};
use thiserror::Error;

crate::lumen_string_id! {
    /// A stable 64-bit identifier of an asset, hashed from its name.
    pub struct AssetId;
}

impl AssetId {
    /// Hashes a fully qualified asset name after validating its shape.
    ///
    /// The name must consist of exactly four non-empty segments separated by `/`.
    pub fn from_asset_name(name: &str) -> Result<Self, AssetError> {
        validate_asset_name(name)?;
        Ok(Self::from_name(name))
    }
}

impl ContentHash for AssetId {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher.write_u64(self.value());
    }
}

/// Checks that `name` follows `<project>/<asset type>/<category>/<name>`.
pub fn validate_asset_name(name: &str) -> Result<(), AssetError> {
    let segments: Vec<&str> = name.split('/').collect();
    if segments.len() != 4 || segments.iter().any(|s| s.is_empty()) {
        return Err(AssetError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// An immutable asset record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// The hashed identifier.
    pub asset_id: AssetId,
    /// The compiled file, relative to the package root. Kept for diagnostics and loading.
    pub filename: String,
}

/// Errors raised while resolving or reading assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The name does not follow the `<project>/<type>/<category>/<name>` scheme.
    #[error("invalid asset name '{0}', expected '<project>/<asset type>/<category>/<name>'")]
    InvalidName(String),
    /// No mounted package contains the asset.
    #[error("asset {0} not found in any mounted package")]
    NotFound(AssetId),
    /// A package already contains an asset with this id.
    #[error("asset {asset_id} ('{filename}') is already registered in package '{package}'")]
    Duplicate {
        /// The colliding id.
        asset_id: AssetId,
        /// The filename of the rejected asset.
        filename: String,
        /// The package name.
        package: String,
    },
    /// The asset has neither an in-memory blob nor a package root directory.
    #[error("asset {0} has no backing data")]
    NoBackingData(AssetId),
    /// Reading the asset file failed.
    #[error("failed to read asset {asset_id} from '{path}': {source}")]
    Io {
        /// The asset being read.
        asset_id: AssetId,
        /// The resolved path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_names_are_validated() {
        assert!(AssetId::from_asset_name("Example/Material/Character/Stone").is_ok());
        assert!(matches!(
            AssetId::from_asset_name("Example/Material/Stone"),
            Err(AssetError::InvalidName(_))
        ));
        assert!(AssetId::from_asset_name("Example//Character/Stone").is_err());
    }

    #[test]
    fn validated_and_raw_hashing_agree() {
        let name = "Example/Texture/Dynamic/WhiteMap";
        assert_eq!(AssetId::from_asset_name(name).unwrap(), AssetId::from_name(name));
    }
}
