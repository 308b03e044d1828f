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

//! Errors raised while compiling sources and writing packs.

use lumen_core::asset::AssetError;
use lumen_runtime::material::ValueType;
use std::path::PathBuf;
use thiserror::Error;

/// An error raised by the toolkit.
#[derive(Debug, Error)]
pub enum ToolkitError {
    /// The source is not valid JSON for its asset kind.
    #[error("malformed {kind} source: {source}")]
    Json {
        /// The asset kind being compiled.
        kind: &'static str,
        /// The parser error.
        #[source]
        source: serde_json::Error,
    },
    /// An asset name does not follow the naming scheme.
    #[error(transparent)]
    Asset(#[from] AssetError),
    /// A property value does not match its declared type.
    #[error("property '{property}' expects a {value_type:?} value: {reason}")]
    InvalidPropertyValue {
        /// The property name.
        property: String,
        /// The declared type.
        value_type: ValueType,
        /// What is wrong with the value.
        reason: String,
    },
    /// A reference usage without a referenced property, or the reverse.
    #[error("property '{0}' must name a reference exactly when its usage is a reference usage")]
    InvalidReference(String),
    /// A material sets a property none of its blueprints declare.
    #[error("material property '{property}' is not declared by any blueprint of the material")]
    UnknownMaterialProperty {
        /// The property name.
        property: String,
    },
    /// A material overrides a property whose blueprint usage is a reference.
    #[error("material property '{0}' is resolved by reference and cannot be overwritten")]
    ReferenceOverride(String),
    /// A material uses a blueprint or parent the compiler has not seen.
    #[error("'{0}' must be compiled before the assets using it")]
    MissingDependency(String),
    /// A texture names an undeclared sampler state.
    #[error("texture '{texture}' uses undeclared sampler state '{sampler_state}'")]
    UnknownSamplerState {
        /// The texture property name.
        texture: String,
        /// The sampler state name.
        sampler_state: String,
    },
    /// A compositor node refers to an undeclared render target texture or framebuffer.
    #[error("compositor node refers to undeclared {kind} '{name}'")]
    UnknownCompositorResource {
        /// "render target texture" or "framebuffer".
        kind: &'static str,
        /// The missing name.
        name: String,
    },
    /// A framebuffer declares more color textures than a framebuffer record holds.
    #[error("framebuffer '{name}' declares {count} color textures, at most {max} are supported")]
    TooManyColorTextures {
        /// The framebuffer name.
        name: String,
        /// Declared color textures.
        count: usize,
        /// The format limit.
        max: usize,
    },
    /// A source file has no known asset extension.
    #[error("'{0}' has no known asset source extension")]
    UnknownSourceKind(PathBuf),
    /// Two sources compile to the same asset.
    #[error("asset '{name}' is produced by both '{first}' and '{second}'")]
    DuplicateAsset {
        /// The asset name.
        name: String,
        /// The first source.
        first: PathBuf,
        /// The second source.
        second: PathBuf,
    },
    /// Materials whose parents form a cycle or are never defined.
    #[error("materials with unresolved parents: {0:?}")]
    UnresolvedMaterialParents(Vec<String>),
    /// File system access failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Walking a source directory failed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    /// The pack index could not be encoded.
    #[error("failed to encode the pack index: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// The pack index could not be decoded.
    #[error("failed to decode the pack index: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

impl ToolkitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
