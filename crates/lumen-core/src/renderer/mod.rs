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

//! Provides the public, backend-agnostic rendering contracts.
//!
//! This module defines the "common language" for all rendering operations: the
//! abstract [`RenderBackend`] capability interface, plain data descriptors
//! (pipeline state, root signature, textures, commands) and the error types.
//! Concrete backend variants live in `lumen-infra` and implement these traits;
//! `lumen-runtime` only ever talks to a backend through a [`RenderDevice`].

pub mod api;
pub mod device;
pub mod error;
pub mod traits;

pub use self::api::*;
pub use self::device::{GpuHandle, GpuResource, RenderDevice};
pub use self::error::{PipelineError, RenderError, ResourceError, ShaderError};
pub use self::traits::{
    BackendFactory, BackendSelectionConfig, BackendSelectionResult, GraphicsBackendSelector,
    RenderBackend,
};
