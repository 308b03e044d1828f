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

//! Scene sources.

use crate::error::ToolkitError;
use lumen_core::asset::AssetId;
use lumen_core::format::{
    MeshItemRecord, MeshItemSection, SceneFile, SceneNodeRecord, SceneNodeSection, SubMeshRecord,
};
use serde::Deserialize;

/// A scene source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneSource {
    /// Scene nodes.
    #[serde(default)]
    pub nodes: Vec<SceneNodeSource>,
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0; 3]
}

/// A scene node: a transform and the items attached to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct SceneNodeSource {
    #[serde(default)]
    pub position: [f32; 3],
    /// Quaternion, `[x, y, z, w]`.
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub items: Vec<MeshItemSource>,
}

/// A mesh item.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct MeshItemSource {
    pub mesh: String,
    #[serde(default)]
    pub render_queue_index: u32,
    pub sub_meshes: Vec<SubMeshSource>,
}

/// A sub-mesh with its material.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct SubMeshSource {
    pub material: String,
    #[serde(default)]
    pub start_index: u32,
    pub number_of_indices: u32,
}

impl SceneSource {
    /// Parses a JSON source.
    pub fn parse(source: &str) -> Result<Self, ToolkitError> {
        serde_json::from_str(source).map_err(|source| ToolkitError::Json {
            kind: "scene",
            source,
        })
    }

    /// Builds the compiled file.
    pub fn to_file(&self) -> Result<SceneFile, ToolkitError> {
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let mesh_items = node
                    .items
                    .iter()
                    .map(|item| {
                        let sub_meshes = item
                            .sub_meshes
                            .iter()
                            .map(|sub_mesh| {
                                Ok(SubMeshRecord {
                                    material_asset_id: AssetId::from_asset_name(&sub_mesh.material)?
                                        .value(),
                                    start_index: sub_mesh.start_index,
                                    number_of_indices: sub_mesh.number_of_indices,
                                })
                            })
                            .collect::<Result<Vec<_>, ToolkitError>>()?;
                        Ok(MeshItemSection {
                            mesh: MeshItemRecord {
                                mesh_asset_id: AssetId::from_asset_name(&item.mesh)?.value(),
                                number_of_sub_meshes: sub_meshes.len() as u32,
                                render_queue_index: item.render_queue_index,
                            },
                            sub_meshes,
                        })
                    })
                    .collect::<Result<Vec<_>, ToolkitError>>()?;
                Ok(SceneNodeSection {
                    node: SceneNodeRecord {
                        position: node.position,
                        rotation: node.rotation,
                        scale: node.scale,
                        number_of_items: mesh_items.len() as u32,
                    },
                    mesh_items,
                })
            })
            .collect::<Result<_, ToolkitError>>()?;
        Ok(SceneFile { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_transforms_are_identity() {
        let source = SceneSource::parse(
            r#"{ "nodes": [{ "items": [{
                "mesh": "Example/Mesh/Default/Cube",
                "sub_meshes": [{ "material": "Example/Material/Default/Stone", "number_of_indices": 36 }]
            }] }] }"#,
        )
        .unwrap();
        let scene = SceneFile::read(&source.to_file().unwrap().write()).unwrap();
        let node = &scene.nodes[0];
        assert_eq!(node.node.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(node.node.scale, [1.0; 3]);
        assert_eq!(
            node.mesh_items[0].sub_meshes[0].material_asset_id,
            AssetId::from_name("Example/Material/Default/Stone").value()
        );
    }
}
