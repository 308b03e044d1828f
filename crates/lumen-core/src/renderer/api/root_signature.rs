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

//! Root signatures: the descriptor-table layout a pipeline expects.

use super::shader::ShaderType;
use crate::hash::{ContentHash, ContentHasher};
use serde::{Deserialize, Serialize};

crate::lumen_int_enum! {
    /// What a descriptor range binds.
    pub enum DescriptorRangeType {
        /// Shader resource view (textures, texture buffers).
        Srv = 0,
        /// Unordered access view.
        Uav = 1,
        /// Uniform buffer view.
        Ubv = 2,
        /// Sampler.
        Sampler = 3,
    }
}

crate::lumen_int_enum! {
    /// Which shader stages can see a root parameter.
    pub enum ShaderVisibility {
        /// Every stage.
        All = 0,
        /// Vertex stage only.
        Vertex = 1,
        /// Tessellation control only.
        TessellationControl = 2,
        /// Tessellation evaluation only.
        TessellationEvaluation = 3,
        /// Geometry stage only.
        Geometry = 4,
        /// Fragment stage only.
        Fragment = 5,
        /// Every stage but the fragment stage.
        AllGraphics = 6,
    }
}

impl ShaderVisibility {
    /// Returns `true` if a shader of `shader_type` sees parameters with this visibility.
    pub const fn includes(self, shader_type: ShaderType) -> bool {
        match self {
            ShaderVisibility::All => true,
            ShaderVisibility::AllGraphics => !matches!(shader_type, ShaderType::Fragment),
            ShaderVisibility::Vertex => matches!(shader_type, ShaderType::Vertex),
            ShaderVisibility::TessellationControl => {
                matches!(shader_type, ShaderType::TessellationControl)
            }
            ShaderVisibility::TessellationEvaluation => {
                matches!(shader_type, ShaderType::TessellationEvaluation)
            }
            ShaderVisibility::Geometry => matches!(shader_type, ShaderType::Geometry),
            ShaderVisibility::Fragment => matches!(shader_type, ShaderType::Fragment),
        }
    }
}

/// A contiguous range of descriptors inside a descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorRange {
    /// What the range binds.
    pub range_type: DescriptorRangeType,
    /// Number of descriptors.
    pub number_of_descriptors: u32,
    /// First shader register.
    pub base_shader_register: u32,
    /// Name used by backends that bind by name (OpenGL).
    pub base_shader_register_name: String,
    /// Stages seeing this range.
    pub shader_visibility: ShaderVisibility,
}

impl ContentHash for DescriptorRange {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write(&self.range_type)
            .write_u32(self.number_of_descriptors)
            .write_u32(self.base_shader_register)
            .write_bytes(self.base_shader_register_name.as_bytes())
            .write(&self.shader_visibility);
    }
}

/// A root parameter. Only descriptor tables are supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RootParameter {
    /// The ranges of the descriptor table.
    pub descriptor_ranges: Vec<DescriptorRange>,
}

/// Layout of every root parameter a pipeline binds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RootSignatureDescriptor {
    /// Root parameters in binding order.
    pub parameters: Vec<RootParameter>,
}

impl RootSignatureDescriptor {
    /// Number of root parameters.
    pub fn number_of_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// Finds the root parameter whose first range binds `range_type` at `register`.
    pub fn find_parameter(&self, range_type: DescriptorRangeType, register: u32) -> Option<u32> {
        self.parameters
            .iter()
            .position(|parameter| {
                parameter.descriptor_ranges.iter().any(|range| {
                    range.range_type == range_type && range.base_shader_register == register
                })
            })
            .map(|index| index as u32)
    }
}

impl ContentHash for RootSignatureDescriptor {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(self.parameters.len() as u32);
        for parameter in &self.parameters {
            hasher.write_u32(parameter.descriptor_ranges.len() as u32);
            for range in &parameter.descriptor_ranges {
                hasher.write(range);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(range_type: DescriptorRangeType, register: u32) -> DescriptorRange {
        DescriptorRange {
            range_type,
            number_of_descriptors: 1,
            base_shader_register: register,
            base_shader_register_name: format!("r{register}"),
            shader_visibility: ShaderVisibility::All,
        }
    }

    #[test]
    fn finds_parameters_by_register() {
        let descriptor = RootSignatureDescriptor {
            parameters: vec![
                RootParameter {
                    descriptor_ranges: vec![range(DescriptorRangeType::Ubv, 0)],
                },
                RootParameter {
                    descriptor_ranges: vec![range(DescriptorRangeType::Srv, 0)],
                },
            ],
        };
        assert_eq!(descriptor.find_parameter(DescriptorRangeType::Srv, 0), Some(1));
        assert_eq!(descriptor.find_parameter(DescriptorRangeType::Sampler, 0), None);
    }

    #[test]
    fn visibility_matches_stages() {
        assert!(ShaderVisibility::AllGraphics.includes(ShaderType::Vertex));
        assert!(!ShaderVisibility::AllGraphics.includes(ShaderType::Fragment));
        assert!(ShaderVisibility::Fragment.includes(ShaderType::Fragment));
    }
}
