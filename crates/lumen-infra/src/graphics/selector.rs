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

//! Backend selection over registered factories.

use super::headless::{HeadlessBackendConfig, HeadlessRenderBackend};
use lumen_core::renderer::api::GraphicsBackendType;
use lumen_core::renderer::{
    BackendFactory, BackendSelectionConfig, BackendSelectionResult, GraphicsBackendSelector,
    RenderBackend, RenderError,
};
use std::sync::Arc;

/// Creates [`HeadlessRenderBackend`]s. Always supported.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackendFactory {
    config: HeadlessBackendConfig,
}

impl HeadlessBackendFactory {
    /// A factory creating backends with `config`.
    pub fn new(config: HeadlessBackendConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for HeadlessBackendFactory {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Headless
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self) -> Result<Arc<dyn RenderBackend>, RenderError> {
        Ok(Arc::new(HeadlessRenderBackend::with_config(self.config.clone())))
    }
}

/// Picks the first preferred backend whose factory is registered, supported
/// and creates successfully.
pub struct BackendSelector {
    factories: Vec<Box<dyn BackendFactory>>,
}

impl BackendSelector {
    /// A selector without factories.
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// A selector knowing every backend variant built into this crate.
    pub fn with_default_factories() -> Self {
        let mut selector = Self::new();
        selector.register(Box::new(HeadlessBackendFactory::default()));
        selector
    }

    /// Registers a factory. A later factory for the same backend type wins.
    pub fn register(&mut self, factory: Box<dyn BackendFactory>) {
        let backend_type = factory.backend_type();
        self.factories
            .retain(|registered| registered.backend_type() != backend_type);
        self.factories.push(factory);
    }

    fn factory(&self, backend_type: GraphicsBackendType) -> Option<&dyn BackendFactory> {
        self.factories
            .iter()
            .find(|factory| factory.backend_type() == backend_type)
            .map(|factory| factory.as_ref())
    }

    fn try_create(
        &self,
        backend_type: GraphicsBackendType,
        attempted: &mut Vec<GraphicsBackendType>,
    ) -> Option<Arc<dyn RenderBackend>> {
        if attempted.contains(&backend_type) {
            return None;
        }
        attempted.push(backend_type);
        let Some(factory) = self.factory(backend_type).filter(|factory| factory.is_supported()) else {
            log::debug!("{} backend is not available", backend_type);
            return None;
        };
        match factory.create() {
            Ok(backend) => Some(backend),
            Err(error) => {
                log::warn!("Failed to initialize {} backend: {}", backend_type, error);
                None
            }
        }
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::with_default_factories()
    }
}

impl GraphicsBackendSelector for BackendSelector {
    fn select_backend(
        &self,
        config: &BackendSelectionConfig,
    ) -> Result<BackendSelectionResult, RenderError> {
        log::info!("Selecting a graphics backend among {:?}", config.preferred_backends);
        let mut attempted = Vec::new();
        let fallbacks = self.factories.iter().map(|factory| factory.backend_type());
        let candidates: Vec<_> = if config.allow_fallback {
            config.preferred_backends.iter().copied().chain(fallbacks).collect()
        } else {
            config.preferred_backends.clone()
        };

        for backend_type in candidates {
            if let Some(backend) = self.try_create(backend_type, &mut attempted) {
                log::info!(
                    "Selected {} backend, adapter \"{}\"",
                    backend_type,
                    backend.capabilities().adapter.name
                );
                return Ok(BackendSelectionResult {
                    backend,
                    backend_type,
                    attempted,
                });
            }
        }
        log::error!("No graphics backend could be created, attempted {:?}", attempted);
        Err(RenderError::NoSuitableBackend { attempted })
    }

    fn is_backend_supported(&self, backend_type: GraphicsBackendType) -> bool {
        self.factory(backend_type)
            .is_some_and(|factory| factory.is_supported())
    }
}

impl std::fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend_types: Vec<_> = self
            .factories
            .iter()
            .map(|factory| factory.backend_type())
            .collect();
        f.debug_struct("BackendSelector")
            .field("factories", &backend_types)
            .finish()
    }
}
