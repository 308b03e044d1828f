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

//! Backend types and device capabilities.

use std::fmt;

crate::lumen_int_enum! {
    /// The graphics API a backend translates to.
    pub enum GraphicsBackendType {
        /// Direct3D 9.
        Direct3D9 = 0,
        /// Direct3D 10.
        Direct3D10 = 1,
        /// Direct3D 11.
        Direct3D11 = 2,
        /// Direct3D 12.
        Direct3D12 = 3,
        /// Desktop OpenGL.
        OpenGL = 4,
        /// OpenGL ES 3.
        OpenGLES3 = 5,
        /// Vulkan.
        Vulkan = 6,
        /// A backend that records work without a GPU.
        Headless = 7,
    }
}

impl fmt::Display for GraphicsBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Information about the adapter a backend runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Adapter name, e.g. the GPU model.
    pub name: String,
    /// Driver description, if the backend exposes one.
    pub driver: Option<String>,
}

/// What a backend can do. Queried once when the device is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// The adapter.
    pub adapter: AdapterInfo,
    /// Maximum number of simultaneously bound color render targets.
    pub maximum_number_of_simultaneous_render_targets: u32,
    /// Maximum width or height of a 2D texture.
    pub maximum_texture_dimension: u32,
    /// Maximum size of a uniform buffer in bytes.
    pub maximum_uniform_buffer_size: u32,
    /// Maximum size of a texture buffer in bytes. Zero when texture buffers are unsupported.
    pub maximum_texture_buffer_size: u32,
    /// Maximum number of vertices of a tessellation patch. Zero without tessellation.
    pub maximum_number_of_patch_vertices: u32,
    /// Maximum number of vertices a geometry shader may emit. Zero without geometry shaders.
    pub maximum_number_of_gs_output_vertices: u32,
    /// Instanced draw calls.
    pub draw_instanced: bool,
    /// Base vertex offset in indexed draw calls.
    pub base_vertex: bool,
    /// Compiled shaders can be exported and recreated from bytecode.
    pub shader_bytecode: bool,
    /// Objects may be created from several threads at once.
    pub native_multithreading: bool,
    /// Texture coordinate origin is the upper-left corner.
    pub upper_left_origin: bool,
    /// Clip space depth ranges from zero to one.
    pub zero_to_one_clip_z: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            adapter: AdapterInfo::default(),
            maximum_number_of_simultaneous_render_targets: 8,
            maximum_texture_dimension: 16384,
            maximum_uniform_buffer_size: 64 * 1024,
            maximum_texture_buffer_size: 128 * 1024 * 1024,
            maximum_number_of_patch_vertices: 32,
            maximum_number_of_gs_output_vertices: 1024,
            draw_instanced: true,
            base_vertex: true,
            shader_bytecode: true,
            native_multithreading: true,
            upper_left_origin: true,
            zero_to_one_clip_z: true,
        }
    }
}
