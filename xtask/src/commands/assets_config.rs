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

use serde::Deserialize;
use std::path::PathBuf;

/// The `Assets.toml` manifest.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AssetManifest {
    /// Name of the pack, used as the package name when mounted.
    pub pack_name: String,
    /// Directories scanned for asset sources, compiled in order.
    pub source_directories: Vec<PathBuf>,
    /// Directory receiving the compiled pack.
    pub output_directory: PathBuf,
}

impl Default for AssetManifest {
    /// Compiles `resources/assets` into `.dist/assets`.
    fn default() -> Self {
        Self {
            pack_name: "Example".to_string(),
            source_directories: vec![PathBuf::from("resources/assets")],
            output_directory: PathBuf::from(".dist/assets"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_keys_take_defaults() {
        let manifest: AssetManifest = toml::from_str(r#"source_directories = ["art", "shaders"]"#).unwrap();
        assert_eq!(manifest.source_directories, [PathBuf::from("art"), PathBuf::from("shaders")]);
        assert_eq!(manifest.output_directory, PathBuf::from(".dist/assets"));
        assert_eq!(manifest.pack_name, "Example");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<AssetManifest>("sources = []").is_err());
    }
}
