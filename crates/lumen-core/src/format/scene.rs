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

//! Compiled scene layout.
//!
//! ```text
//! FileHeader
//! SceneHeader
//! { SceneNodeRecord, { SceneItemHeader, item body } * number_of_items } * number_of_nodes
//! ```
//!
//! Unknown item types are skipped using their byte count, so newer toolkits can
//! add item kinds without breaking older runtimes.

use super::{AssetFormat, BlobReader, BlobWriter, FormatError};
use crate::hash::hash_str;
use bytemuck::{Pod, Zeroable};

/// Type id of a mesh scene item.
pub const MESH_SCENE_ITEM_TYPE_ID: u64 = hash_str("MeshSceneItem");

/// Counts of a scene file.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Default)]
pub struct SceneHeader {
    /// Nodes following.
    pub number_of_nodes: u32,
}

/// A scene node with its local transform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneNodeRecord {
    /// Translation.
    pub position: [f32; 3],
    /// Rotation quaternion, `xyzw`.
    pub rotation: [f32; 4],
    /// Scale.
    pub scale: [f32; 3],
    /// Items attached to the node.
    pub number_of_items: u32,
}

/// Prefix of every scene item.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SceneItemHeader {
    /// Hashed item type name.
    pub type_id: u64,
    /// Size of the body following.
    pub number_of_bytes: u32,
    /// Padding, zero.
    pub reserved: u32,
}

/// Fixed part of a mesh item body; `SubMeshRecord`s follow.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshItemRecord {
    /// Mesh asset id.
    pub mesh_asset_id: u64,
    /// Sub-meshes following.
    pub number_of_sub_meshes: u32,
    /// Render queue index of every sub-mesh.
    pub render_queue_index: u32,
}

/// One draw range of a mesh with its material.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SubMeshRecord {
    /// Material asset id.
    pub material_asset_id: u64,
    /// First index.
    pub start_index: u32,
    /// Number of indices.
    pub number_of_indices: u32,
}

/// A mesh item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshItemSection {
    /// Fixed part.
    pub mesh: MeshItemRecord,
    /// Draw ranges.
    pub sub_meshes: Vec<SubMeshRecord>,
}

/// A node with its known items.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNodeSection {
    /// Node transform.
    pub node: SceneNodeRecord,
    /// Mesh items.
    pub mesh_items: Vec<MeshItemSection>,
}

/// A scene file, record by record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneFile {
    /// Nodes.
    pub nodes: Vec<SceneNodeSection>,
}

impl SceneFile {
    /// Serializes the scene.
    pub fn write(&self) -> Vec<u8> {
        let mut writer = BlobWriter::new(AssetFormat::Scene);
        writer.write_pod(&SceneHeader {
            number_of_nodes: self.nodes.len() as u32,
        });
        for section in &self.nodes {
            let mut node = section.node;
            node.number_of_items = section.mesh_items.len() as u32;
            writer.write_pod(&node);
            for item in &section.mesh_items {
                let mut mesh = item.mesh;
                mesh.number_of_sub_meshes = item.sub_meshes.len() as u32;
                let number_of_bytes = std::mem::size_of::<MeshItemRecord>()
                    + item.sub_meshes.len() * std::mem::size_of::<SubMeshRecord>();
                writer
                    .write_pod(&SceneItemHeader {
                        type_id: MESH_SCENE_ITEM_TYPE_ID,
                        number_of_bytes: number_of_bytes as u32,
                        reserved: 0,
                    })
                    .write_pod(&mesh)
                    .write_pod_slice(&item.sub_meshes);
            }
        }
        writer.finish()
    }

    /// Deserializes a scene, checking the header first. Unknown items are skipped.
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut reader = BlobReader::new(bytes);
        reader.read_header(AssetFormat::Scene)?;
        let header: SceneHeader = reader.read_pod()?;
        let mut nodes = Vec::with_capacity(header.number_of_nodes as usize);
        for _ in 0..header.number_of_nodes {
            let node: SceneNodeRecord = reader.read_pod()?;
            let mut mesh_items = Vec::new();
            for _ in 0..node.number_of_items {
                let item: SceneItemHeader = reader.read_pod()?;
                if item.type_id != MESH_SCENE_ITEM_TYPE_ID {
                    log::warn!(
                        "Skipping unknown scene item type {:#018x} ({} bytes)",
                        item.type_id,
                        item.number_of_bytes
                    );
                    reader.skip(item.number_of_bytes as usize)?;
                    continue;
                }
                let mesh: MeshItemRecord = reader.read_pod()?;
                let sub_meshes = reader.read_pod_vec(mesh.number_of_sub_meshes as usize)?;
                mesh_items.push(MeshItemSection { mesh, sub_meshes });
            }
            nodes.push(SceneNodeSection { node, mesh_items });
        }
        Ok(Self { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_items_are_skipped() {
        let mut writer = BlobWriter::new(AssetFormat::Scene);
        writer
            .write_pod(&SceneHeader { number_of_nodes: 1 })
            .write_pod(&SceneNodeRecord {
                position: [0.0; 3],
                rotation: [0.0, 0.0, 0.0, 1.0],
                scale: [1.0; 3],
                number_of_items: 2,
            })
            .write_pod(&SceneItemHeader {
                type_id: hash_str("CameraSceneItem"),
                number_of_bytes: 4,
                reserved: 0,
            })
            .write_pod(&0u32)
            .write_pod(&SceneItemHeader {
                type_id: MESH_SCENE_ITEM_TYPE_ID,
                number_of_bytes: 32,
                reserved: 0,
            })
            .write_pod(&MeshItemRecord {
                mesh_asset_id: 5,
                number_of_sub_meshes: 1,
                render_queue_index: 0,
            })
            .write_pod(&SubMeshRecord {
                material_asset_id: 9,
                start_index: 0,
                number_of_indices: 36,
            });
        let scene = SceneFile::read(&writer.finish()).unwrap();
        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.nodes[0].mesh_items.len(), 1);
        assert_eq!(scene.nodes[0].mesh_items[0].sub_meshes[0].material_asset_id, 9);
    }
}
