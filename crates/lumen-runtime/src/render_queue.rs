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

//! Renderables and the render queue drawn by scene passes.

use crate::buffer::InstancePropertySource;
use crate::material::{MaterialPropertyValue, MaterialResourceId};
use lumen_core::asset::AssetId;
use lumen_core::PropertyId;

/// Well-known instance reference ids.
pub mod instance_reference {
    use lumen_core::PropertyId;

    /// `Float4_4`, object space to world space.
    pub const OBJECT_SPACE_TO_WORLD_SPACE_MATRIX: PropertyId =
        PropertyId::from_name("@ObjectSpaceToWorldSpaceMatrix");
    /// `Integer`, render queue index of the drawn object.
    pub const RENDER_QUEUE_INDEX: PropertyId = PropertyId::from_name("@RenderQueueIndex");
}

/// A drawable unit: an index range of a mesh drawn with a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    /// Mesh the indices belong to.
    pub mesh_asset_id: AssetId,
    /// Material drawn with.
    pub material: MaterialResourceId,
    /// Ordering bucket; scene passes draw a range of buckets.
    pub render_queue_index: u32,
    /// First index.
    pub start_index: u32,
    /// Number of indices.
    pub number_of_indices: u32,
    /// Column-major object to world matrix.
    pub object_space_to_world_space: [f32; 16],
}

impl InstancePropertySource for Renderable {
    fn instance_property(&self, reference: PropertyId) -> Option<MaterialPropertyValue> {
        match reference {
            instance_reference::OBJECT_SPACE_TO_WORLD_SPACE_MATRIX => {
                Some(MaterialPropertyValue::Float4_4(self.object_space_to_world_space))
            }
            instance_reference::RENDER_QUEUE_INDEX => {
                Some(MaterialPropertyValue::Integer(self.render_queue_index as i32))
            }
            _ => None,
        }
    }
}

/// Renderables grouped by render queue index.
///
/// Insertion keeps the queue ordered by render queue index; within a bucket
/// insertion order is kept. Scene passes further sort their selection by
/// pipeline state.
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    renderables: Vec<Renderable>,
}

impl RenderQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a renderable.
    pub fn push(&mut self, renderable: Renderable) {
        let index = self
            .renderables
            .partition_point(|queued| queued.render_queue_index <= renderable.render_queue_index);
        self.renderables.insert(index, renderable);
    }

    /// Removes every renderable.
    pub fn clear(&mut self) {
        self.renderables.clear();
    }

    /// Number of renderables.
    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty()
    }

    /// Every renderable, ordered by render queue index.
    pub fn renderables(&self) -> &[Renderable] {
        &self.renderables
    }

    /// Renderables whose index lies in `minimum..=maximum`.
    pub fn range(&self, minimum: u32, maximum: u32) -> &[Renderable] {
        let start = self
            .renderables
            .partition_point(|renderable| renderable.render_queue_index < minimum);
        let end = self
            .renderables
            .partition_point(|renderable| renderable.render_queue_index <= maximum);
        &self.renderables[start..end.max(start)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderable(render_queue_index: u32, start_index: u32) -> Renderable {
        Renderable {
            mesh_asset_id: AssetId::from_raw(1),
            material: MaterialResourceId(0),
            render_queue_index,
            start_index,
            number_of_indices: 3,
            object_space_to_world_space: [0.0; 16],
        }
    }

    #[test]
    fn ranges_select_buckets_in_order() {
        let mut queue = RenderQueue::new();
        queue.push(renderable(200, 0));
        queue.push(renderable(0, 1));
        queue.push(renderable(100, 2));
        queue.push(renderable(0, 3));

        let opaque: Vec<u32> = queue.range(0, 99).iter().map(|r| r.start_index).collect();
        assert_eq!(opaque, vec![1, 3]);
        assert_eq!(queue.range(100, 255).len(), 2);
        assert!(queue.range(201, 255).is_empty());
        assert!(queue.range(50, 10).is_empty());
    }
}
