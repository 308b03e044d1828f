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

//! Runtime configuration loaded from TOML.
//!
//! ```toml
//! [pipeline_state_cache]
//! asynchronous_compilation = true
//! compiler_threads = 2
//! cache_file = "cache/pipeline_states.bin"
//! save_on_shutdown = true
//!
//! [buffers]
//! instance_uniform_buffer_size = 65536
//! instance_texture_buffer_size = 524288
//! material_slots_per_page = 64
//!
//! [backend]
//! preferred_backends = ["Headless"]
//! allow_fallback = false
//! ```
//!
//! Every key is optional.

use crate::compositor::WorkspaceSettings;
use crate::error::ConfigError;
use lumen_core::renderer::BackendSelectionConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Pipeline state cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineStateCacheConfig {
    /// Build missing pipeline states on worker threads instead of blocking.
    pub asynchronous_compilation: bool,
    /// Number of compiler worker threads; zero builds inline.
    pub compiler_threads: usize,
    /// File the cache is persisted to.
    pub cache_file: Option<PathBuf>,
    /// Write the cache file on shutdown.
    pub save_on_shutdown: bool,
}

impl Default for PipelineStateCacheConfig {
    fn default() -> Self {
        Self {
            asynchronous_compilation: false,
            compiler_threads: 2,
            cache_file: None,
            save_on_shutdown: true,
        }
    }
}

/// Buffer manager settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Requested instance uniform buffer size, clamped to the device limit.
    pub instance_uniform_buffer_size: u32,
    /// Requested instance texture buffer size, clamped to the device limit.
    pub instance_texture_buffer_size: u32,
    /// Material slots per material uniform buffer page.
    pub material_slots_per_page: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        let settings = WorkspaceSettings::default();
        Self {
            instance_uniform_buffer_size: settings.instance_uniform_buffer_size,
            instance_texture_buffer_size: settings.instance_texture_buffer_size,
            material_slots_per_page: settings.material_slots_per_page,
        }
    }
}

impl From<BufferConfig> for WorkspaceSettings {
    fn from(config: BufferConfig) -> Self {
        Self {
            instance_uniform_buffer_size: config.instance_uniform_buffer_size,
            instance_texture_buffer_size: config.instance_texture_buffer_size,
            material_slots_per_page: config.material_slots_per_page,
        }
    }
}

/// The runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Pipeline state cache settings.
    pub pipeline_state_cache: PipelineStateCacheConfig,
    /// Buffer manager settings.
    pub buffers: BufferConfig,
    /// Backend selection settings.
    pub backend: BackendSelectionConfig,
}

impl RuntimeConfig {
    /// Parses a configuration.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a configuration file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(source) => {
                let config = Self::from_toml_str(&source)?;
                log::info!("Runtime configuration loaded from '{}'", path.display());
                Ok(config)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No runtime configuration at '{}', using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Workspace buffer settings.
    pub fn workspace_settings(&self) -> WorkspaceSettings {
        self.buffers.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::api::GraphicsBackendType;

    #[test]
    fn missing_keys_take_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [pipeline_state_cache]
            asynchronous_compilation = true

            [backend]
            preferred_backends = ["Headless"]
            "#,
        )
        .unwrap();
        assert!(config.pipeline_state_cache.asynchronous_compilation);
        assert_eq!(config.pipeline_state_cache.compiler_threads, 2);
        assert_eq!(config.buffers, BufferConfig::default());
        assert_eq!(
            config.backend.preferred_backends,
            vec![GraphicsBackendType::Headless]
        );
        assert!(config.backend.allow_fallback);
    }

    #[test]
    fn unknown_backends_are_rejected() {
        assert!(matches!(
            RuntimeConfig::from_toml_str("[backend]\npreferred_backends = [\"Glide\"]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn a_missing_file_is_the_default_configuration() {
        let directory = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load(directory.path().join("lumen.toml")).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
