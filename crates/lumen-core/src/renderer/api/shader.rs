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

//! Shader types, languages and source descriptors.

use super::capabilities::GraphicsBackendType;
use serde::{Deserialize, Serialize};

crate::lumen_int_enum! {
    /// A programmable pipeline stage.
    pub enum ShaderType {
        /// Vertex shader.
        Vertex = 0,
        /// Tessellation control (hull) shader.
        TessellationControl = 1,
        /// Tessellation evaluation (domain) shader.
        TessellationEvaluation = 2,
        /// Geometry shader.
        Geometry = 3,
        /// Fragment (pixel) shader.
        Fragment = 4,
    }
}

impl ShaderType {
    /// Lower-case name used in asset sources and logs.
    pub const fn name(self) -> &'static str {
        match self {
            ShaderType::Vertex => "vertex",
            ShaderType::TessellationControl => "tessellation_control",
            ShaderType::TessellationEvaluation => "tessellation_evaluation",
            ShaderType::Geometry => "geometry",
            ShaderType::Fragment => "fragment",
        }
    }
}

/// The shading language a backend consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderLanguage {
    /// HLSL (Direct3D 10 to 12).
    Hlsl,
    /// HLSL shader model 3 (Direct3D 9).
    Hlsl3,
    /// GLSL (OpenGL and Vulkan).
    Glsl,
    /// GLSL ES 3 (OpenGL ES).
    GlslEs3,
    /// Plain text understood by the headless backend.
    Null,
}

impl ShaderLanguage {
    /// The language used by a backend type.
    pub const fn for_backend(backend: GraphicsBackendType) -> Self {
        match backend {
            GraphicsBackendType::Direct3D9 => ShaderLanguage::Hlsl3,
            GraphicsBackendType::Direct3D10
            | GraphicsBackendType::Direct3D11
            | GraphicsBackendType::Direct3D12 => ShaderLanguage::Hlsl,
            GraphicsBackendType::OpenGL | GraphicsBackendType::Vulkan => ShaderLanguage::Glsl,
            GraphicsBackendType::OpenGLES3 => ShaderLanguage::GlslEs3,
            GraphicsBackendType::Headless => ShaderLanguage::Null,
        }
    }

    /// The language name as written in shader blueprint assets.
    pub const fn name(self) -> &'static str {
        match self {
            ShaderLanguage::Hlsl => "HLSL",
            ShaderLanguage::Hlsl3 => "HLSL3",
            ShaderLanguage::Glsl => "GLSL",
            ShaderLanguage::GlslEs3 => "GLSLES3",
            ShaderLanguage::Null => "Null",
        }
    }
}

/// Describes a shader to be compiled from source.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    /// Debug label.
    pub label: &'a str,
    /// The stage the shader runs at.
    pub shader_type: ShaderType,
    /// Source code in the backend's [`ShaderLanguage`].
    pub source_code: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_backend_has_a_language() {
        for backend in GraphicsBackendType::ALL {
            let _ = ShaderLanguage::for_backend(*backend).name();
        }
        assert_eq!(
            ShaderLanguage::for_backend(GraphicsBackendType::Vulkan),
            ShaderLanguage::Glsl
        );
    }
}
