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

//! Backend discovery and selection.

use super::render_backend::RenderBackend;
use crate::renderer::api::GraphicsBackendType;
use crate::renderer::error::RenderError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Preferences driving backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSelectionConfig {
    /// Backend types to try, most preferred first.
    pub preferred_backends: Vec<GraphicsBackendType>,
    /// Fall back to any supported backend when no preferred one can be created.
    pub allow_fallback: bool,
}

impl Default for BackendSelectionConfig {
    fn default() -> Self {
        Self {
            preferred_backends: vec![
                GraphicsBackendType::Vulkan,
                GraphicsBackendType::Direct3D12,
                GraphicsBackendType::OpenGL,
                GraphicsBackendType::Headless,
            ],
            allow_fallback: true,
        }
    }
}

/// The outcome of a successful selection.
pub struct BackendSelectionResult {
    /// The created backend.
    pub backend: Arc<dyn RenderBackend>,
    /// Its type.
    pub backend_type: GraphicsBackendType,
    /// Every backend type tried before, including the selected one.
    pub attempted: Vec<GraphicsBackendType>,
}

impl std::fmt::Debug for BackendSelectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSelectionResult")
            .field("backend_type", &self.backend_type)
            .field("attempted", &self.attempted)
            .finish()
    }
}

/// Creates one backend variant.
pub trait BackendFactory: Send + Sync {
    /// The backend type this factory creates.
    fn backend_type(&self) -> GraphicsBackendType;

    /// Returns `true` if the backend can likely be created on this platform.
    fn is_supported(&self) -> bool;

    /// Creates the backend.
    fn create(&self) -> Result<Arc<dyn RenderBackend>, RenderError>;
}

/// Picks the backend used for the lifetime of the runtime.
pub trait GraphicsBackendSelector {
    /// Selects and creates the best available backend for `config`.
    fn select_backend(
        &self,
        config: &BackendSelectionConfig,
    ) -> Result<BackendSelectionResult, RenderError>;

    /// Checks if a backend type is supported on this platform.
    fn is_backend_supported(&self, backend_type: GraphicsBackendType) -> bool;
}
