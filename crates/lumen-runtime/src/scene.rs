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

//! Scene resources: nodes with transforms and the mesh items attached to them.

use crate::blueprint::multiply;
use crate::material::MaterialResourceManager;
use crate::render_queue::{RenderQueue, Renderable};
use lumen_core::asset::AssetId;
use lumen_core::format::{FormatError, SceneFile, SceneNodeRecord};

/// Position, rotation and scale of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation.
    pub position: [f32; 3],
    /// Unit quaternion, `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Per axis scale.
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    fn from_record(record: &SceneNodeRecord) -> Self {
        Self {
            position: record.position,
            rotation: record.rotation,
            scale: record.scale,
        }
    }

    /// Column-major matrix applying scale, then rotation, then translation.
    pub fn to_matrix(&self) -> [f32; 16] {
        let [x, y, z, w] = self.rotation;
        let rotation = [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + z * w),
            2.0 * (x * z - y * w),
            0.0,
            2.0 * (x * y - z * w),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + x * w),
            0.0,
            2.0 * (x * z + y * w),
            2.0 * (y * z - x * w),
            1.0 - 2.0 * (x * x + y * y),
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ];
        let mut scale = [0.0; 16];
        scale[0] = self.scale[0];
        scale[5] = self.scale[1];
        scale[10] = self.scale[2];
        scale[15] = 1.0;
        let mut matrix = multiply(&rotation, &scale);
        matrix[12] = self.position[0];
        matrix[13] = self.position[1];
        matrix[14] = self.position[2];
        matrix
    }
}

/// A node of a loaded scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Local transform.
    pub transform: Transform,
    /// Renderables attached to the node, one per sub-mesh.
    pub renderables: Vec<Renderable>,
}

/// A loaded scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneResource {
    asset_id: AssetId,
    nodes: Vec<SceneNode>,
}

impl SceneResource {
    /// Builds a scene from its compiled bytes.
    ///
    /// Sub-meshes naming a material that is not loaded are skipped with a
    /// warning; the rest of the scene still loads.
    pub fn load(
        asset_id: AssetId,
        bytes: &[u8],
        materials: &MaterialResourceManager,
    ) -> Result<Self, FormatError> {
        let file = SceneFile::read(bytes)?;
        let mut skipped = 0;
        let nodes = file
            .nodes
            .iter()
            .map(|section| {
                let transform = Transform::from_record(&section.node);
                let matrix = transform.to_matrix();
                let mut renderables = Vec::new();
                for item in &section.mesh_items {
                    for sub_mesh in &item.sub_meshes {
                        let material_asset_id = AssetId::from_raw(sub_mesh.material_asset_id);
                        let Some(material) = materials.id_of(material_asset_id) else {
                            log::warn!(
                                "Scene {}: mesh {} uses unloaded material {}",
                                asset_id,
                                AssetId::from_raw(item.mesh.mesh_asset_id),
                                material_asset_id
                            );
                            skipped += 1;
                            continue;
                        };
                        renderables.push(Renderable {
                            mesh_asset_id: AssetId::from_raw(item.mesh.mesh_asset_id),
                            material,
                            render_queue_index: item.mesh.render_queue_index,
                            start_index: sub_mesh.start_index,
                            number_of_indices: sub_mesh.number_of_indices,
                            object_space_to_world_space: matrix,
                        });
                    }
                }
                SceneNode {
                    transform,
                    renderables,
                }
            })
            .collect();
        if skipped > 0 {
            log::warn!("Scene {}: {} sub-meshes skipped", asset_id, skipped);
        }
        Ok(Self { asset_id, nodes })
    }

    /// The scene asset.
    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// Nodes in file order.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Adds every renderable of the scene to `queue`.
    pub fn fill_render_queue(&self, queue: &mut RenderQueue) {
        for renderable in self.nodes.iter().flat_map(|node| &node.renderables) {
            queue.push(*renderable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialProperties;
    use lumen_core::format::{MeshItemRecord, MeshItemSection, SceneNodeSection, SubMeshRecord};

    #[test]
    fn identity_rotation_keeps_scale_and_translation() {
        let transform = Transform {
            position: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [2.0, 3.0, 4.0],
        };
        let matrix = transform.to_matrix();
        assert_eq!(matrix[0], 2.0);
        assert_eq!(matrix[5], 3.0);
        assert_eq!(matrix[10], 4.0);
        assert_eq!(&matrix[12..16], &[1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn sub_meshes_with_unloaded_materials_are_skipped() {
        let mut materials = MaterialResourceManager::new();
        let loaded = AssetId::from_name("Example/Material/Default/Stone");
        let material = materials.create(Some(loaded), &[], MaterialProperties::new());
        let file = SceneFile {
            nodes: vec![SceneNodeSection {
                node: SceneNodeRecord {
                    position: [0.0; 3],
                    rotation: [0.0, 0.0, 0.0, 1.0],
                    scale: [1.0; 3],
                    number_of_items: 1,
                },
                mesh_items: vec![MeshItemSection {
                    mesh: MeshItemRecord {
                        mesh_asset_id: 5,
                        number_of_sub_meshes: 2,
                        render_queue_index: 0,
                    },
                    sub_meshes: vec![
                        SubMeshRecord {
                            material_asset_id: loaded.value(),
                            start_index: 0,
                            number_of_indices: 36,
                        },
                        SubMeshRecord {
                            material_asset_id: 77,
                            start_index: 36,
                            number_of_indices: 12,
                        },
                    ],
                }],
            }],
        };
        let scene = SceneResource::load(AssetId::from_raw(9), &file.write(), &materials).unwrap();
        let mut queue = RenderQueue::new();
        scene.fill_render_queue(&mut queue);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.renderables()[0].material, material);
        assert_eq!(queue.renderables()[0].number_of_indices, 36);
    }
}
