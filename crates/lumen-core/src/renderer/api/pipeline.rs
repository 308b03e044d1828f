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

//! Pipeline state descriptors and vertex input layout.

use super::format::{TextureFormat, VertexAttributeFormat};
use super::ids::{ProgramId, RootSignatureId};
use super::state::{
    BlendState, DepthStencilState, PrimitiveTopology, RasterizerState, MAX_RENDER_TARGETS,
};
use crate::hash::{ContentHash, ContentHasher};
use serde::{Deserialize, Serialize};

/// One vertex input attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexAttribute {
    /// Element format.
    pub format: VertexAttributeFormat,
    /// Attribute name as declared in the shader.
    pub name: String,
    /// Semantic name (HLSL style, e.g. `POSITION`).
    pub semantic_name: String,
    /// Semantic index.
    pub semantic_index: u32,
    /// Vertex buffer slot the attribute is fetched from.
    pub input_slot: u32,
    /// Byte offset inside the vertex.
    pub aligned_byte_offset: u32,
    /// Byte stride of the vertex buffer slot.
    pub stride_in_bytes: u32,
    /// Zero for per-vertex data, otherwise instances per element.
    pub instances_per_element: u32,
}

impl ContentHash for VertexAttribute {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write(&self.format)
            .write_bytes(self.name.as_bytes())
            .write_bytes(self.semantic_name.as_bytes())
            .write_u32(self.semantic_index)
            .write_u32(self.input_slot)
            .write_u32(self.aligned_byte_offset)
            .write_u32(self.stride_in_bytes)
            .write_u32(self.instances_per_element);
    }
}

/// The complete vertex input layout of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexAttributes {
    /// Attributes in declaration order.
    pub attributes: Vec<VertexAttribute>,
}

impl VertexAttributes {
    /// The layout used by the compositor's full-screen triangle: a single float2 position.
    pub fn screen_space_triangle() -> Self {
        Self {
            attributes: vec![VertexAttribute {
                format: VertexAttributeFormat::Float2,
                name: "Position".into(),
                semantic_name: "POSITION".into(),
                semantic_index: 0,
                input_slot: 0,
                aligned_byte_offset: 0,
                stride_in_bytes: VertexAttributeFormat::Float2.size(),
                instances_per_element: 0,
            }],
        }
    }
}

impl ContentHash for VertexAttributes {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(self.attributes.len() as u32);
        for attribute in &self.attributes {
            hasher.write(attribute);
        }
    }
}

/// The fixed-function part of a pipeline, as declared by a material blueprint.
///
/// Material properties with rasterizer, depth-stencil or blend usage are applied
/// on top of a copy of the template before a pipeline state is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineStateTemplate {
    /// Primitive assembly.
    pub primitive_topology: PrimitiveTopology,
    /// Rasterizer state.
    pub rasterizer_state: RasterizerState,
    /// Depth-stencil state.
    pub depth_stencil_state: DepthStencilState,
    /// Blend state.
    pub blend_state: BlendState,
    /// Number of color render targets written.
    pub number_of_render_targets: u32,
    /// Formats of the color render targets.
    pub render_target_formats: [TextureFormat; MAX_RENDER_TARGETS],
    /// Depth-stencil format, if any.
    pub depth_stencil_format: Option<TextureFormat>,
}

impl Default for PipelineStateTemplate {
    fn default() -> Self {
        Self {
            primitive_topology: PrimitiveTopology::TriangleList,
            rasterizer_state: RasterizerState::default(),
            depth_stencil_state: DepthStencilState::default(),
            blend_state: BlendState::default(),
            number_of_render_targets: 1,
            render_target_formats: [TextureFormat::R8G8B8A8; MAX_RENDER_TARGETS],
            depth_stencil_format: Some(TextureFormat::D32Float),
        }
    }
}

impl ContentHash for PipelineStateTemplate {
    fn content_hash(&self, hasher: &mut ContentHasher) {
        hasher
            .write(&self.primitive_topology)
            .write(&self.rasterizer_state)
            .write(&self.depth_stencil_state)
            .write(&self.blend_state)
            .write_u32(self.number_of_render_targets);
        for format in &self.render_target_formats {
            hasher.write(format);
        }
        match &self.depth_stencil_format {
            Some(format) => hasher.write_bool(true).write(format),
            None => hasher.write_bool(false),
        };
    }
}

/// Everything a backend needs to build a pipeline state object.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStateDescriptor {
    /// Debug label.
    pub label: String,
    /// The root signature the pipeline binds against.
    pub root_signature: RootSignatureId,
    /// The linked shader program.
    pub program: ProgramId,
    /// Vertex input layout.
    pub vertex_attributes: VertexAttributes,
    /// Primitive assembly.
    pub primitive_topology: PrimitiveTopology,
    /// Rasterizer state.
    pub rasterizer_state: RasterizerState,
    /// Depth-stencil state.
    pub depth_stencil_state: DepthStencilState,
    /// Blend state.
    pub blend_state: BlendState,
    /// Number of color render targets written.
    pub number_of_render_targets: u32,
    /// Formats of the color render targets; only the first `number_of_render_targets` are used.
    pub render_target_formats: [TextureFormat; MAX_RENDER_TARGETS],
    /// Depth-stencil format, if the pipeline tests depth.
    pub depth_stencil_format: Option<TextureFormat>,
}

impl PipelineStateDescriptor {
    /// Combines a fixed-function template with a root signature, a program and a vertex layout.
    pub fn from_template(
        label: impl Into<String>,
        template: &PipelineStateTemplate,
        root_signature: RootSignatureId,
        program: ProgramId,
        vertex_attributes: VertexAttributes,
    ) -> Self {
        Self {
            label: label.into(),
            root_signature,
            program,
            vertex_attributes,
            primitive_topology: template.primitive_topology,
            rasterizer_state: template.rasterizer_state,
            depth_stencil_state: template.depth_stencil_state,
            blend_state: template.blend_state,
            number_of_render_targets: template.number_of_render_targets,
            render_target_formats: template.render_target_formats,
            depth_stencil_format: template.depth_stencil_format,
        }
    }

    /// The formats of the used color render targets.
    pub fn used_render_target_formats(&self) -> &[TextureFormat] {
        let count = (self.number_of_render_targets as usize).min(MAX_RENDER_TARGETS);
        &self.render_target_formats[..count]
    }
}
