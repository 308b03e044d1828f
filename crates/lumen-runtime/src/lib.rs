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

//! Resource and runtime layer of Lumen.
//!
//! Materials are trees of property sets resolved against material
//! blueprints. A blueprint turns the shader combination switches and
//! fixed-function properties of a material into a [`pipeline::PipelineStateSignature`],
//! and the [`pipeline::PipelineStateCacheManager`] makes sure each signature is
//! built once and shared. Buffer managers pack pass, material and instance
//! values into uniform buffers following the blueprint declarations, and the
//! [`compositor`] records the passes of a workspace into a command buffer.
//!
//! [`runtime::RendererRuntime`] wires all of it together.

#![warn(missing_docs)]

pub mod blueprint;
pub mod buffer;
pub mod compositor;
pub mod config;
pub mod error;
pub mod material;
pub mod pipeline;
pub mod render_queue;
pub mod runtime;
pub mod scene;
pub mod shader;
mod sync;
pub mod texture;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use runtime::{LoadedAssetKind, RendererRuntime, WorkspaceId};
