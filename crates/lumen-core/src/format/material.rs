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

//! Compiled material layout.
//!
//! ```text
//! FileHeader
//! MaterialHeader
//! MaterialTechniqueRecord * number_of_techniques
//! MaterialPropertyRecord  * number_of_properties
//! ```

use super::{AssetFormat, BlobReader, BlobWriter, FormatError, MaterialPropertyRecord};
use bytemuck::{Pod, Zeroable};

/// Counts of a material file.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable, Default)]
pub struct MaterialHeader {
    /// Asset id of the parent material, zero for none.
    pub parent_material_asset_id: u64,
    /// Techniques following.
    pub number_of_techniques: u32,
    /// Properties following the techniques.
    pub number_of_properties: u32,
}

/// Binds a technique id to a material blueprint.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MaterialTechniqueRecord {
    /// Hashed technique name.
    pub material_technique_id: u64,
    /// Asset id of the material blueprint.
    pub material_blueprint_asset_id: u64,
}

/// A material file, record by record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialFile {
    /// Asset id of the parent material, zero for none.
    pub parent_material_asset_id: u64,
    /// Techniques.
    pub techniques: Vec<MaterialTechniqueRecord>,
    /// Properties overriding the blueprint or parent values.
    pub properties: Vec<MaterialPropertyRecord>,
}

impl MaterialFile {
    /// Serializes the material.
    pub fn write(&self) -> Vec<u8> {
        let mut writer = BlobWriter::new(AssetFormat::Material);
        writer
            .write_pod(&MaterialHeader {
                parent_material_asset_id: self.parent_material_asset_id,
                number_of_techniques: self.techniques.len() as u32,
                number_of_properties: self.properties.len() as u32,
            })
            .write_pod_slice(&self.techniques)
            .write_pod_slice(&self.properties);
        writer.finish()
    }

    /// Deserializes a material, checking the header first.
    pub fn read(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut reader = BlobReader::new(bytes);
        reader.read_header(AssetFormat::Material)?;
        let header: MaterialHeader = reader.read_pod()?;
        Ok(Self {
            parent_material_asset_id: header.parent_material_asset_id,
            techniques: reader.read_pod_vec(header.number_of_techniques as usize)?,
            properties: reader.read_pod_vec(header.number_of_properties as usize)?,
        })
    }
}
