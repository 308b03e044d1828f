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

use crate::commands::assets_config::AssetManifest;
use crate::helpers::*;
use anyhow::{Context, Result};
use lumen_toolkit::{write_pack, AssetCompiler, CompiledAsset, PackIndex};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Compiles every source directory of the manifest and writes one pack.
pub fn compile(manifest_path: &Path) -> Result<()> {
    print_task_start("Compiling Assets", PACKAGE, MAGENTA);
    let manifest = load_manifest(manifest_path)?;
    let index = compile_manifest(&manifest)?;
    print_success(&format!(
        "Wrote {} assets of pack '{}' to '{}'",
        index.entries.len(),
        index.name,
        manifest.output_directory.display()
    ));
    Ok(())
}

/// Compiles the sources of `manifest` and writes them as a pack.
///
/// One compiler sees every directory, so materials may use blueprints of an
/// earlier directory. Missing directories are skipped with a warning.
pub fn compile_manifest(manifest: &AssetManifest) -> Result<PackIndex> {
    let directories: Vec<&PathBuf> = manifest
        .source_directories
        .iter()
        .filter(|directory| {
            let exists = directory.is_dir();
            if !exists {
                log::warn!("Skipping missing source directory '{}'", directory.display());
            }
            exists
        })
        .collect();
    if directories.is_empty() {
        anyhow::bail!("None of the {} source directories exist", manifest.source_directories.len());
    }

    let mut compiler = AssetCompiler::new();
    let mut compiled: Vec<CompiledAsset> = Vec::new();
    let mut names = HashSet::new();
    for directory in directories {
        let assets = compiler
            .compile_directory(directory)
            .with_context(|| format!("Failed to compile '{}'", directory.display()))?;
        println!(
            "{}🔎 Compiled:{} {} assets from '{}'",
            BOLD,
            RESET,
            assets.len(),
            directory.display()
        );
        for asset in assets {
            if !names.insert(asset.asset_name.clone()) {
                anyhow::bail!("Asset '{}' is defined in more than one source directory", asset.asset_name);
            }
            compiled.push(asset);
        }
    }

    write_pack(&manifest.pack_name, &manifest.output_directory, &compiled).with_context(|| {
        format!("Failed to write pack to '{}'", manifest.output_directory.display())
    })
}

/// Reads the manifest, or the default one if the file does not exist.
fn load_manifest(manifest_path: &Path) -> Result<AssetManifest> {
    if !manifest_path.exists() {
        print_info(&format!("No '{}' found. Using default configuration.", manifest_path.display()));
        return Ok(AssetManifest::default());
    }
    print_info(&format!("Found '{}'. Loading configuration.", manifest_path.display()));
    let text = fs::read_to_string(manifest_path)
        .with_context(|| format!("Failed to read manifest file at '{}'", manifest_path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse TOML from '{}'", manifest_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, name: &str, contents: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn directories_compile_into_one_pack() {
        let root = tempfile::tempdir().unwrap();
        let shaders = root.path().join("shaders");
        let materials = root.path().join("materials");
        write(&shaders, "Example/ShaderBlueprint/Mesh/Vertex.shader_blueprint", "void main() {}");
        write(&shaders, "Example/ShaderBlueprint/Mesh/Fragment.shader_blueprint", "void main() {}");
        write(
            &shaders,
            "Example/MaterialBlueprint/Mesh/Forward.material_blueprint",
            r#"{ "shader_blueprints": {
                    "vertex": "Example/ShaderBlueprint/Mesh/Vertex",
                    "fragment": "Example/ShaderBlueprint/Mesh/Fragment" } }"#,
        );
        write(
            &materials,
            "Example/Material/Default/Base.material",
            r#"{ "techniques": { "Forward": "Example/MaterialBlueprint/Mesh/Forward" } }"#,
        );

        let manifest = AssetManifest {
            pack_name: "Test".to_string(),
            source_directories: vec![shaders, materials, root.path().join("missing")],
            output_directory: root.path().join("pack"),
        };
        let index = compile_manifest(&manifest).unwrap();
        assert_eq!(index.entries.len(), 4);
        assert_eq!(PackIndex::read(&manifest.output_directory).unwrap(), index);
    }

    #[test]
    fn shipped_example_assets_compile() {
        let output = tempfile::tempdir().unwrap();
        let manifest = AssetManifest {
            source_directories: vec![Path::new(env!("CARGO_MANIFEST_DIR")).join("../resources/assets")],
            output_directory: output.path().to_path_buf(),
            ..AssetManifest::default()
        };
        let index = compile_manifest(&manifest).unwrap();
        assert_eq!(index.entries.len(), 8);
        assert!(index.to_package(output.path()).is_ok());
    }

    #[test]
    fn no_existing_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let manifest = AssetManifest {
            source_directories: vec![root.path().join("missing")],
            output_directory: root.path().join("pack"),
            ..AssetManifest::default()
        };
        assert!(compile_manifest(&manifest).is_err());
    }
}
