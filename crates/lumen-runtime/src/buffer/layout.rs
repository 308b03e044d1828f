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

//! Uniform buffer layout and packing.
//!
//! Values are laid out in declaration order following constant buffer packing:
//! a value never straddles a 16-byte package. Before placing a value, if the
//! current package is partially used and the value does not fit in what is
//! left, the cursor moves to the next package boundary.

use super::resolver::PropertyResolver;
use crate::error::PackingError;
use crate::material::MaterialProperty;

/// Size of a constant buffer package.
pub const PACKAGE_SIZE: u32 = 16;

/// Places values following the package rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformPacker {
    cursor: u32,
    package_bytes_used: u32,
}

impl UniformPacker {
    /// Starts at offset zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `size` bytes and returns their offset.
    pub fn place(&mut self, size: u32) -> u32 {
        if self.package_bytes_used != 0 && self.package_bytes_used + size > PACKAGE_SIZE {
            self.cursor += PACKAGE_SIZE - self.package_bytes_used;
            self.package_bytes_used = 0;
        }
        let offset = self.cursor;
        self.cursor += size;
        self.package_bytes_used = (self.package_bytes_used + size) % PACKAGE_SIZE;
        offset
    }

    /// Bytes used so far.
    pub fn size(&self) -> u32 {
        self.cursor
    }

    /// Bytes used so far, rounded up to a whole package.
    pub fn padded_size(&self) -> u32 {
        self.cursor.div_ceil(PACKAGE_SIZE) * PACKAGE_SIZE
    }
}

/// A property placed inside a uniform buffer element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformElement {
    /// The declared property; its usage selects the value source.
    pub property: MaterialProperty,
    /// Byte offset inside the element.
    pub offset: u32,
}

/// The layout of a uniform buffer: `number_of_elements` repetitions of the element properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformBufferLayout {
    elements: Vec<UniformElement>,
    element_stride: u32,
    number_of_elements: u32,
}

impl UniformBufferLayout {
    /// Computes the layout of declared element properties.
    pub fn new(properties: impl IntoIterator<Item = MaterialProperty>, number_of_elements: u32) -> Self {
        let mut packer = UniformPacker::new();
        let elements = properties
            .into_iter()
            .map(|property| UniformElement {
                offset: packer.place(property.value_type().byte_size()),
                property,
            })
            .collect();
        Self {
            elements,
            element_stride: packer.padded_size(),
            number_of_elements: number_of_elements.max(1),
        }
    }

    /// Placed properties of one element.
    pub fn elements(&self) -> &[UniformElement] {
        &self.elements
    }

    /// Size of one element, a multiple of [`PACKAGE_SIZE`].
    pub fn element_stride(&self) -> u32 {
        self.element_stride
    }

    /// Number of elements.
    pub fn number_of_elements(&self) -> u32 {
        self.number_of_elements
    }

    /// Total size in bytes.
    pub fn size(&self) -> u32 {
        self.element_stride * self.number_of_elements
    }

    /// Packs one element into `out`, resolving every value through `resolver`.
    ///
    /// Values are copied bit for bit. Bytes between values keep their content.
    pub fn pack_element(&self, resolver: &PropertyResolver<'_>, out: &mut [u8]) -> Result<(), PackingError> {
        if (out.len() as u64) < self.element_stride as u64 {
            return Err(PackingError::Overflow {
                required: self.element_stride,
                capacity: u32::try_from(out.len()).unwrap_or(u32::MAX),
            });
        }
        for element in &self.elements {
            let value = resolver.resolve(&element.property)?;
            value.write_bytes(&mut out[element.offset as usize..]);
        }
        Ok(())
    }

    /// Packs every element into `out`.
    pub fn pack(&self, resolver: &PropertyResolver<'_>, out: &mut [u8]) -> Result<(), PackingError> {
        let size = self.size();
        if (out.len() as u64) < size as u64 {
            return Err(PackingError::Overflow {
                required: size,
                capacity: u32::try_from(out.len()).unwrap_or(u32::MAX),
            });
        }
        if self.element_stride == 0 {
            return Ok(());
        }
        for chunk in out[..size as usize].chunks_exact_mut(self.element_stride as usize) {
            self.pack_element(resolver, chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{MaterialProperties, MaterialPropertyValue, Usage};
    use lumen_core::PropertyId;

    fn uniform(name: &str, value: MaterialPropertyValue) -> MaterialProperty {
        MaterialProperty::new(PropertyId::from_name(name), Usage::ShaderUniform, value)
    }

    #[test]
    fn four_floats_then_a_vector() {
        let layout = UniformBufferLayout::new(
            [
                uniform("A", MaterialPropertyValue::Float(1.0)),
                uniform("B", MaterialPropertyValue::Float(2.0)),
                uniform("C", MaterialPropertyValue::Float(3.0)),
                uniform("D", MaterialPropertyValue::Float(4.0)),
                uniform("E", MaterialPropertyValue::Float4([5.0, 6.0, 7.0, 8.0])),
            ],
            1,
        );
        let offsets: Vec<u32> = layout.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 12, 16]);
        assert_eq!(layout.size(), 32);

        let global = MaterialProperties::new();
        let resolver = PropertyResolver::new(&global);
        let mut bytes = vec![0u8; layout.size() as usize];
        layout.pack(&resolver, &mut bytes).unwrap();
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        assert_eq!(floats, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn values_never_straddle_a_package() {
        let mut packer = UniformPacker::new();
        assert_eq!(packer.place(12), 0);
        assert_eq!(packer.place(8), 16);
        assert_eq!(packer.place(4), 24);
        assert_eq!(packer.place(4), 28);
        assert_eq!(packer.place(64), 32);
        assert_eq!(packer.place(4), 96);
        assert_eq!(packer.padded_size(), 112);
    }

    #[test]
    fn a_small_buffer_is_an_overflow() {
        let layout = UniformBufferLayout::new([uniform("A", MaterialPropertyValue::Float4([0.0; 4]))], 2);
        let global = MaterialProperties::new();
        let mut bytes = vec![0u8; 16];
        assert_eq!(
            layout.pack(&PropertyResolver::new(&global), &mut bytes),
            Err(PackingError::Overflow {
                required: 32,
                capacity: 16
            })
        );
    }

    #[test]
    fn a_small_element_slice_reports_its_length() {
        let layout = UniformBufferLayout::new([uniform("A", MaterialPropertyValue::Float4([0.0; 4]))], 4);
        let global = MaterialProperties::new();
        let mut bytes = vec![0u8; 8];
        assert_eq!(
            layout.pack_element(&PropertyResolver::new(&global), &mut bytes),
            Err(PackingError::Overflow {
                required: 16,
                capacity: 8
            })
        );
    }
}
