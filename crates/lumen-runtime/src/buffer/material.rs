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

//! Material uniform buffers: one slot per material technique, grouped in pages.

use super::resolver::PropertyResolver;
use crate::blueprint::{BlueprintBufferUsage, MaterialBlueprintResource};
use crate::error::PackingError;
use crate::material::{MaterialProperties, MaterialResource, MaterialResourceId};
use ahash::AHashMap;
use lumen_core::renderer::api::{
    BufferUsage, Command, CommandBuffer, DescriptorResource, UniformBufferId,
};
use lumen_core::renderer::{GpuHandle, RenderDevice};
use lumen_core::{MaterialTechniqueId, PropertyId};
use std::sync::Arc;

/// Instance reference carrying the slot index of the drawn material.
pub const MATERIAL_INDEX: PropertyId = PropertyId::from_name("@MaterialIndex");

/// Where the values of one material technique live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialSlot {
    /// Page holding the slot.
    pub page: u32,
    /// Element index inside the page.
    pub index: u32,
}

#[derive(Debug)]
struct Page {
    buffer: GpuHandle<UniformBufferId>,
    scratch: Vec<u8>,
    dirty: bool,
}

#[derive(Debug, Clone, Copy)]
struct Assignment {
    slot: MaterialSlot,
    change_generation: Option<u64>,
}

/// Packs material properties of one blueprint into paged uniform buffers.
///
/// A slot is repacked only when the material properties changed since it was
/// last packed; pages are uploaded once per frame when dirty.
#[derive(Debug)]
pub struct MaterialBufferManager {
    device: RenderDevice,
    blueprint: Arc<MaterialBlueprintResource>,
    root_parameter_index: u32,
    element_stride: u32,
    slots_per_page: u32,
    pages: Vec<Page>,
    assignments: AHashMap<(MaterialResourceId, MaterialTechniqueId), Assignment>,
    free_slots: Vec<MaterialSlot>,
}

impl MaterialBufferManager {
    /// Returns `None` if the blueprint declares no material uniform buffer.
    ///
    /// A page holds at most `slots_per_page` slots, fewer if the device limit
    /// or the blueprint declaration is smaller.
    pub fn new(
        device: &RenderDevice,
        blueprint: Arc<MaterialBlueprintResource>,
        slots_per_page: u32,
    ) -> Option<Self> {
        let declaration = blueprint.uniform_buffer(BlueprintBufferUsage::Material)?;
        let element_stride = declaration.layout.element_stride().max(1);
        let device_slots = device.capabilities().maximum_uniform_buffer_size / element_stride;
        let slots_per_page = slots_per_page
            .min(device_slots)
            .min(declaration.layout.number_of_elements())
            .max(1);
        Some(Self {
            device: device.clone(),
            root_parameter_index: declaration.root_parameter_index,
            element_stride,
            slots_per_page,
            blueprint,
            pages: Vec::new(),
            assignments: AHashMap::new(),
            free_slots: Vec::new(),
        })
    }

    /// Slots per page.
    pub fn slots_per_page(&self) -> u32 {
        self.slots_per_page
    }

    /// Number of pages allocated.
    pub fn number_of_pages(&self) -> usize {
        self.pages.len()
    }

    /// The slot of a material technique, if it has one.
    pub fn slot(&self, material: MaterialResourceId, technique: MaterialTechniqueId) -> Option<MaterialSlot> {
        self.assignments.get(&(material, technique)).map(|assignment| assignment.slot)
    }

    fn allocate_slot(&mut self) -> Option<MaterialSlot> {
        if let Some(slot) = self.free_slots.pop() {
            return Some(slot);
        }
        let used: usize = self.assignments.len();
        let page = (used as u32) / self.slots_per_page;
        if page as usize >= self.pages.len() {
            let size = self.element_stride * self.slots_per_page;
            let buffer = match self.device.create_uniform_buffer(size, BufferUsage::DynamicDraw) {
                Ok(buffer) => buffer,
                Err(error) => {
                    log::error!(
                        "Cannot create material uniform buffer page for blueprint {}: {}",
                        self.blueprint.asset_id(),
                        error
                    );
                    return None;
                }
            };
            self.pages.push(Page {
                buffer,
                scratch: vec![0; size as usize],
                dirty: false,
            });
        }
        Some(MaterialSlot {
            page,
            index: used as u32 % self.slots_per_page,
        })
    }

    /// Makes sure the values of a material technique are packed in a slot.
    ///
    /// Returns `None` when no page could be allocated.
    pub fn update(
        &mut self,
        material: &MaterialResource,
        technique: MaterialTechniqueId,
        global: &MaterialProperties,
    ) -> Result<Option<MaterialSlot>, PackingError> {
        let key = (material.id(), technique);
        let assignment = match self.assignments.get(&key) {
            Some(assignment) => *assignment,
            None => {
                let Some(slot) = self.allocate_slot() else {
                    return Ok(None);
                };
                let assignment = Assignment {
                    slot,
                    change_generation: None,
                };
                self.assignments.insert(key, assignment);
                assignment
            }
        };
        let generation = material.properties().change_generation();
        if assignment.change_generation == Some(generation) {
            return Ok(Some(assignment.slot));
        }

        let Some(declaration) = self.blueprint.uniform_buffer(BlueprintBufferUsage::Material) else {
            return Ok(Some(assignment.slot));
        };
        let effective = self.blueprint.effective_properties(material.properties());
        let resolver = PropertyResolver::new(global).with_material(&effective);
        let page = &mut self.pages[assignment.slot.page as usize];
        let offset = (assignment.slot.index * self.element_stride) as usize;
        declaration
            .layout
            .pack_element(&resolver, &mut page.scratch[offset..offset + self.element_stride as usize])?;
        page.dirty = true;
        if let Some(assignment) = self.assignments.get_mut(&key) {
            assignment.change_generation = Some(generation);
        }
        log::trace!("Packed material {:?} into {:?}", material.id(), assignment.slot);
        Ok(Some(assignment.slot))
    }

    /// Releases every slot of a material.
    pub fn release(&mut self, material: MaterialResourceId) {
        let mut released = Vec::new();
        self.assignments.retain(|(id, _), assignment| {
            let keep = *id != material;
            if !keep {
                released.push(assignment.slot);
            }
            keep
        });
        self.free_slots.extend(released);
    }

    /// Records the upload of every dirty page.
    pub fn upload(&mut self, commands: &mut CommandBuffer) -> usize {
        let mut uploaded = 0;
        for page in self.pages.iter_mut().filter(|page| page.dirty) {
            commands.push(Command::CopyUniformBufferData {
                buffer: page.buffer.id(),
                data: page.scratch.clone(),
            });
            page.dirty = false;
            uploaded += 1;
        }
        uploaded
    }

    /// Records the binding of the page holding `slot`.
    pub fn bind(&self, slot: MaterialSlot, commands: &mut CommandBuffer) {
        if let Some(page) = self.pages.get(slot.page as usize) {
            commands.push(Command::SetGraphicsRootDescriptorTable {
                root_parameter_index: self.root_parameter_index,
                resource: DescriptorResource::UniformBuffer(page.buffer.id()),
            });
        }
    }
}
