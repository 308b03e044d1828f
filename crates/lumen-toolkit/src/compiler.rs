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

//! Source kinds and the stateful asset compiler.

use crate::compositor_node::CompositorNodeSource;
use crate::error::ToolkitError;
use crate::material::MaterialSource;
use crate::material_blueprint::MaterialBlueprintSource;
use crate::property::PropertyDefinition;
use crate::scene::SceneSource;
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::format::{write_shader_source, AssetFormat};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The kind of a source file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// `.shader_piece`: shader source text.
    ShaderPiece,
    /// `.shader_blueprint`: shader template text.
    ShaderBlueprint,
    /// `.material_blueprint`: JSON.
    MaterialBlueprint,
    /// `.material`: JSON.
    Material,
    /// `.compositor_node`: JSON.
    CompositorNode,
    /// `.scene`: JSON.
    Scene,
}

impl SourceKind {
    /// Every kind, in the order dependencies must be compiled.
    pub const ALL: [SourceKind; 6] = [
        SourceKind::ShaderPiece,
        SourceKind::ShaderBlueprint,
        SourceKind::MaterialBlueprint,
        SourceKind::Material,
        SourceKind::CompositorNode,
        SourceKind::Scene,
    ];

    /// The file extension, without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            SourceKind::ShaderPiece => "shader_piece",
            SourceKind::ShaderBlueprint => "shader_blueprint",
            SourceKind::MaterialBlueprint => "material_blueprint",
            SourceKind::Material => "material",
            SourceKind::CompositorNode => "compositor_node",
            SourceKind::Scene => "scene",
        }
    }

    /// The compiled asset format.
    pub const fn asset_format(self) -> AssetFormat {
        match self {
            SourceKind::ShaderPiece => AssetFormat::ShaderPiece,
            SourceKind::ShaderBlueprint => AssetFormat::ShaderBlueprint,
            SourceKind::MaterialBlueprint => AssetFormat::MaterialBlueprint,
            SourceKind::Material => AssetFormat::Material,
            SourceKind::CompositorNode => AssetFormat::CompositorNode,
            SourceKind::Scene => AssetFormat::Scene,
        }
    }

    /// The kind of a source path, if its extension is known.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|kind| kind.extension() == extension)
    }
}

/// One source to compile.
#[derive(Debug, Clone, Copy)]
pub struct CompileInput<'a> {
    /// `<project>/<asset type>/<category>/<name>`.
    pub asset_name: &'a str,
    /// The source kind.
    pub kind: SourceKind,
    /// The source text.
    pub source: &'a str,
}

/// A compiled asset blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledAsset {
    /// The asset name.
    pub asset_name: String,
    /// The hashed asset name.
    pub asset_id: AssetId,
    /// The format of `bytes`.
    pub format: AssetFormat,
    /// The compiled bytes, header included.
    pub bytes: Vec<u8>,
}

/// Compiles sources, remembering what materials need from earlier assets.
///
/// Material property values are typed by the declarations of their blueprints,
/// so material blueprints must be compiled before the materials using them, and
/// parent materials before their children. [`AssetCompiler::compile_directory`]
/// takes care of the order.
#[derive(Debug, Default)]
pub struct AssetCompiler {
    blueprint_properties: AHashMap<AssetId, Vec<PropertyDefinition>>,
    material_blueprints: AHashMap<AssetId, Vec<AssetId>>,
}

impl AssetCompiler {
    /// A compiler that has seen no assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles one source.
    pub fn compile(&mut self, input: &CompileInput<'_>) -> Result<CompiledAsset, ToolkitError> {
        let asset_id = AssetId::from_asset_name(input.asset_name)?;
        let format = input.kind.asset_format();
        let bytes = match input.kind {
            SourceKind::ShaderPiece | SourceKind::ShaderBlueprint => {
                write_shader_source(format, input.source)
            }
            SourceKind::MaterialBlueprint => {
                let source = MaterialBlueprintSource::parse(input.source)?;
                let bytes = source.to_file()?.write();
                self.blueprint_properties.insert(asset_id, source.properties);
                bytes
            }
            SourceKind::Material => {
                self.compile_material(asset_id, &MaterialSource::parse(input.source)?)?
            }
            SourceKind::CompositorNode => CompositorNodeSource::parse(input.source)?.to_file()?.write(),
            SourceKind::Scene => SceneSource::parse(input.source)?.to_file()?.write(),
        };
        log::debug!(
            "Compiled {} '{}' ({} bytes)",
            input.kind.extension(),
            input.asset_name,
            bytes.len()
        );
        Ok(CompiledAsset {
            asset_name: input.asset_name.to_string(),
            asset_id,
            format,
            bytes,
        })
    }

    fn compile_material(
        &mut self,
        asset_id: AssetId,
        source: &MaterialSource,
    ) -> Result<Vec<u8>, ToolkitError> {
        for name in source.techniques.values() {
            if !self
                .blueprint_properties
                .contains_key(&AssetId::from_asset_name(name)?)
            {
                return Err(ToolkitError::MissingDependency(name.clone()));
            }
        }
        let mut blueprints = source.blueprint_asset_ids()?;
        if let (Some(parent), Some(parent_name)) = (source.parent_asset_id()?, &source.parent) {
            let inherited = self
                .material_blueprints
                .get(&parent)
                .ok_or_else(|| ToolkitError::MissingDependency(parent_name.clone()))?;
            for blueprint in inherited {
                if !blueprints.contains(blueprint) {
                    blueprints.push(*blueprint);
                }
            }
        }

        let properties = &self.blueprint_properties;
        let file = source.to_file(|name| {
            blueprints
                .iter()
                .filter_map(|blueprint| properties.get(blueprint))
                .flatten()
                .find(|definition| definition.name == name)
        })?;
        self.material_blueprints.insert(asset_id, blueprints);
        Ok(file.write())
    }

    /// Compiles every source below `source_directory`.
    ///
    /// Asset names are the source paths relative to the directory, without
    /// extension. Files with unknown extensions are skipped.
    pub fn compile_directory(
        &mut self,
        source_directory: &Path,
    ) -> Result<Vec<CompiledAsset>, ToolkitError> {
        let mut sources: Vec<(SourceKind, String, PathBuf)> = Vec::new();
        let mut seen: AHashMap<AssetId, PathBuf> = AHashMap::new();
        for entry in WalkDir::new(source_directory) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(kind) = SourceKind::from_path(path) else {
                log::debug!("Skipping '{}', not an asset source", path.display());
                continue;
            };
            let asset_name = asset_name(source_directory, path)
                .ok_or_else(|| ToolkitError::UnknownSourceKind(path.to_path_buf()))?;
            let asset_id = AssetId::from_asset_name(&asset_name)?;
            if let Some(first) = seen.insert(asset_id, path.to_path_buf()) {
                return Err(ToolkitError::DuplicateAsset {
                    name: asset_name,
                    first,
                    second: path.to_path_buf(),
                });
            }
            sources.push((kind, asset_name, path.to_path_buf()));
        }
        sources.sort();

        let mut compiled = Vec::with_capacity(sources.len());
        let mut materials = Vec::new();
        for (kind, asset_name, path) in sources {
            let text = std::fs::read_to_string(&path).map_err(|source| ToolkitError::io(&path, source))?;
            if kind == SourceKind::Material {
                materials.push((asset_name, MaterialSource::parse(&text)?));
                continue;
            }
            if kind > SourceKind::Material {
                compiled.extend(self.compile_materials(std::mem::take(&mut materials))?);
            }
            compiled.push(self.compile(&CompileInput {
                asset_name: &asset_name,
                kind,
                source: &text,
            })?);
        }
        compiled.extend(self.compile_materials(materials)?);
        log::info!(
            "Compiled {} assets from '{}'",
            compiled.len(),
            source_directory.display()
        );
        Ok(compiled)
    }

    /// Compiles materials parents first.
    fn compile_materials(
        &mut self,
        mut pending: Vec<(String, MaterialSource)>,
    ) -> Result<Vec<CompiledAsset>, ToolkitError> {
        let mut compiled = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let pending_ids = pending
                .iter()
                .map(|(name, _)| AssetId::from_asset_name(name))
                .collect::<Result<Vec<_>, _>>()?;
            let mut ready = Vec::new();
            let mut waiting = Vec::new();
            for (asset_name, source) in pending {
                let blocked = source
                    .parent_asset_id()?
                    .is_some_and(|parent| pending_ids.contains(&parent));
                if blocked {
                    waiting.push((asset_name, source));
                } else {
                    ready.push((asset_name, source));
                }
            }
            if ready.is_empty() {
                return Err(ToolkitError::UnresolvedMaterialParents(
                    waiting.into_iter().map(|(name, _)| name).collect(),
                ));
            }
            for (asset_name, source) in ready {
                let asset_id = AssetId::from_asset_name(&asset_name)?;
                let bytes = self.compile_material(asset_id, &source)?;
                log::debug!("Compiled material '{}' ({} bytes)", asset_name, bytes.len());
                compiled.push(CompiledAsset {
                    asset_name,
                    asset_id,
                    format: AssetFormat::Material,
                    bytes,
                });
            }
            pending = waiting;
        }
        Ok(compiled)
    }
}

fn asset_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let segments = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

/// Compiles one source without context from other assets.
///
/// Materials setting properties need the declarations of their blueprints and
/// must go through an [`AssetCompiler`] that compiled those first.
pub fn compile(input: &CompileInput<'_>) -> Result<CompiledAsset, ToolkitError> {
    AssetCompiler::new().compile(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::format::read_shader_source;

    #[test]
    fn kinds_follow_the_extension() {
        assert_eq!(
            SourceKind::from_path(Path::new("Example/Material/Default/Stone.material")),
            Some(SourceKind::Material)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("Example/ShaderBlueprint/Mesh/Vertex.shader_blueprint")),
            Some(SourceKind::ShaderBlueprint)
        );
        assert_eq!(SourceKind::from_path(Path::new("README.md")), None);
    }

    #[test]
    fn shader_sources_are_wrapped_with_a_header() {
        let compiled = compile(&CompileInput {
            asset_name: "Example/ShaderPiece/Mesh/Lighting",
            kind: SourceKind::ShaderPiece,
            source: "float3 lighting() { return float3(1.0); }",
        })
        .unwrap();
        assert_eq!(compiled.format, AssetFormat::ShaderPiece);
        assert_eq!(
            read_shader_source(AssetFormat::ShaderPiece, &compiled.bytes).unwrap(),
            "float3 lighting() { return float3(1.0); }"
        );
    }

    #[test]
    fn materials_need_their_blueprint_first() {
        let mut compiler = AssetCompiler::new();
        let material = CompileInput {
            asset_name: "Example/Material/Default/Stone",
            kind: SourceKind::Material,
            source: r#"{ "techniques": { "Forward": "Example/MaterialBlueprint/Mesh/Forward" } }"#,
        };
        assert!(matches!(
            compiler.compile(&material),
            Err(ToolkitError::MissingDependency(_))
        ));
        compiler
            .compile(&CompileInput {
                asset_name: "Example/MaterialBlueprint/Mesh/Forward",
                kind: SourceKind::MaterialBlueprint,
                source: "{}",
            })
            .unwrap();
        assert!(compiler.compile(&material).is_ok());
    }

    #[test]
    fn asset_names_are_relative_paths_without_extension() {
        let root = Path::new("assets");
        assert_eq!(
            asset_name(root, &root.join("Example").join("Scene").join("Default").join("Room.scene")),
            Some("Example/Scene/Default/Room".to_string())
        );
    }
}
