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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::{GraphicsBackendType, PipelineStateId, ShaderId, ShaderType};
use std::fmt;

/// An error related to the compilation or recreation of a shader.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader source failed to compile.
    CompilationError {
        /// A descriptive label for the shader.
        label: String,
        /// The stage being compiled.
        shader_type: ShaderType,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// The backend cannot export or import shader bytecode.
    BytecodeUnsupported,
    /// Bytecode handed to the backend is malformed.
    InvalidBytecode(String),
    /// The requested shader could not be found.
    NotFound {
        /// The ID of the missing shader.
        id: ShaderId,
    },
    /// Linking shaders into a program failed.
    LinkError(String),
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError {
                label,
                shader_type,
                details,
            } => write!(
                f,
                "Shader compilation failed for '{label}' ({} shader): {details}",
                shader_type.name()
            ),
            ShaderError::BytecodeUnsupported => {
                write!(f, "The backend does not support shader bytecode")
            }
            ShaderError::InvalidBytecode(msg) => write!(f, "Invalid shader bytecode: {msg}"),
            ShaderError::NotFound { id } => write!(f, "Shader not found for ID: {id:?}"),
            ShaderError::LinkError(msg) => write!(f, "Shader program linking failed: {msg}"),
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of a pipeline state object.
#[derive(Debug)]
pub enum PipelineError {
    /// The backend rejected the pipeline state descriptor.
    CompilationFailed {
        /// A descriptive label for the pipeline.
        label: String,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// The specified pipeline state ID is not valid.
    InvalidPipelineState {
        /// The ID of the invalid pipeline state.
        id: PipelineStateId,
    },
    /// The root signature referenced by the descriptor is invalid.
    InvalidRootSignature(String),
    /// A color target or depth format is not usable as a render target.
    IncompatibleRenderTarget(String),
    /// A required graphics feature is not supported by the device.
    FeatureNotSupported(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::CompilationFailed { label, details } => {
                write!(f, "Pipeline compilation failed for '{label}': {details}")
            }
            PipelineError::InvalidPipelineState { id } => {
                write!(f, "Invalid pipeline state ID: {id:?}")
            }
            PipelineError::InvalidRootSignature(msg) => {
                write!(f, "Invalid root signature: {msg}")
            }
            PipelineError::IncompatibleRenderTarget(msg) => {
                write!(f, "Incompatible render target format: {msg}")
            }
            PipelineError::FeatureNotSupported(msg) => {
                write!(f, "Feature not supported: {msg}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A pipeline-specific error occurred.
    Pipeline(PipelineError),
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// The requested size exceeds what the backend supports.
    SizeExceedsLimit {
        /// What was requested, in bytes or texels.
        requested: u32,
        /// The backend limit.
        limit: u32,
    },
    /// An error originating from the specific backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::SizeExceedsLimit { requested, limit } => {
                write!(f, "Requested size {requested} exceeds the backend limit of {limit}")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// A high-level error of the rendering device or backend selection.
#[derive(Debug)]
pub enum RenderError {
    /// A failure occurred during the initialization of the backend.
    InitializationFailed(String),
    /// No backend of the preferred list could be created.
    NoSuitableBackend {
        /// The backend types that were attempted, in order.
        attempted: Vec<GraphicsBackendType>,
    },
    /// Submitting recorded commands failed.
    SubmissionFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The graphics device was lost and must be recreated.
    DeviceLost,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::NoSuitableBackend { attempted } => {
                write!(f, "No suitable graphics backend found (attempted {attempted:?})")
            }
            RenderError::SubmissionFailed(msg) => {
                write!(f, "Command buffer submission failed: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationError {
            label: "Forward".to_string(),
            shader_type: ShaderType::Fragment,
            details: "Syntax error at line 5".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader compilation failed for 'Forward' (fragment shader): Syntax error at line 5"
        );
    }

    #[test]
    fn render_error_chains_sources() {
        let shader_err = ShaderError::NotFound { id: ShaderId(7) };
        let res_err: ResourceError = shader_err.into();
        let render_err: RenderError = res_err.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Shader resource error: Shader not found for ID: ShaderId(7)"
        );
        let source = render_err.source();
        assert!(source.is_some());
        assert!(source.and_then(|s| s.source()).is_some());
    }
}
