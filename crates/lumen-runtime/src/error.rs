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

//! Error types of the runtime layer.

use crate::material::{MaterialResourceId, Usage, ValueType};
use crate::runtime::WorkspaceId;
use lumen_core::asset::{AssetError, AssetId};
use lumen_core::format::FormatError;
use lumen_core::renderer::{RenderError, ResourceError};
use lumen_core::PropertyId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing or expanding shader templates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShaderBuilderError {
    /// A directive needing an argument was not followed by `(`.
    #[error("line {line}: '@{directive}' expects an argument in parentheses")]
    MissingArgument {
        /// Directive name.
        directive: &'static str,
        /// Line of the directive.
        line: u32,
    },
    /// The argument parentheses are never closed.
    #[error("line {line}: unterminated argument of '@{directive}'")]
    UnterminatedArgument {
        /// Directive name.
        directive: &'static str,
        /// Line of the directive.
        line: u32,
    },
    /// A block is never closed by `@end`.
    #[error("line {line}: '@{directive}' block is never closed by '@end'")]
    UnterminatedBlock {
        /// Directive opening the block.
        directive: &'static str,
        /// Line of the opening directive.
        line: u32,
    },
    /// An `@else` or `@end` outside of a matching block.
    #[error("line {line}: unexpected '@{directive}'")]
    UnexpectedDirective {
        /// Directive name.
        directive: &'static str,
        /// Line of the directive.
        line: u32,
    },
    /// A malformed `@property` expression.
    #[error("line {line}: invalid expression '{expression}': {reason}")]
    InvalidExpression {
        /// The expression text.
        expression: String,
        /// What went wrong.
        reason: &'static str,
        /// Line of the directive.
        line: u32,
    },
    /// A malformed piece, property or asset name.
    #[error("line {line}: invalid name '{name}' in '@{directive}'")]
    InvalidName {
        /// Directive name.
        directive: &'static str,
        /// The rejected name.
        name: String,
        /// Line of the directive.
        line: u32,
    },
    /// An included piece asset is not loaded.
    #[error("shader piece asset {0} is not loaded")]
    PieceNotFound(AssetId),
    /// Pieces nest deeper than allowed.
    #[error("piece '{name}' nests deeper than {limit} levels")]
    RecursionLimit {
        /// The piece being inserted or included.
        name: String,
        /// The nesting limit.
        limit: u32,
    },
}

/// Errors of the shader cache. Cached with the failed combination, hence `Clone`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShaderCacheError {
    /// The template could not be expanded.
    #[error(transparent)]
    Generation(#[from] ShaderBuilderError),
    /// The backend rejected the generated source.
    #[error("{label}: {details}")]
    Compilation {
        /// Debug label of the shader.
        label: String,
        /// Backend message.
        details: String,
    },
}

/// A material property reference that cannot be turned into a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing provides the referenced value.
    #[error("property {property} ({usage:?}) references {reference}, which nothing provides")]
    Unresolved {
        /// The property being resolved.
        property: PropertyId,
        /// The referenced id.
        reference: PropertyId,
        /// The usage that selected the source.
        usage: Usage,
    },
    /// The resolved value does not have the declared type.
    #[error("property {property} resolved to a {found:?} value, {expected:?} was declared")]
    TypeMismatch {
        /// The property being resolved.
        property: PropertyId,
        /// Declared type.
        expected: ValueType,
        /// Type of the resolved value.
        found: ValueType,
    },
}

/// Errors raised while packing buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackingError {
    /// A value could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The packed data does not fit the buffer.
    #[error("packed data needs {required} bytes, the buffer holds {capacity}")]
    Overflow {
        /// Bytes needed.
        required: u32,
        /// Bytes available.
        capacity: u32,
    },
}

/// Errors raised by material resources.
#[derive(Debug, Error)]
pub enum MaterialError {
    /// The material resource does not exist.
    #[error("material resource {0:?} does not exist")]
    NotFound(MaterialResourceId),
    /// Reparenting would make a material its own ancestor.
    #[error("making {parent:?} the parent of {child:?} would create a cycle")]
    Cycle {
        /// The material being reparented.
        child: MaterialResourceId,
        /// The rejected parent.
        parent: MaterialResourceId,
    },
    /// A technique names a blueprint that is not loaded.
    #[error("material blueprint {0} is not loaded")]
    BlueprintNotLoaded(AssetId),
    /// A material names a parent that is not loaded.
    #[error("material {material} names parent {parent}, which is not loaded")]
    ParentNotLoaded {
        /// The material asset.
        material: AssetId,
        /// The missing parent asset.
        parent: AssetId,
    },
    /// The compiled material is malformed.
    #[error("material {asset}: {source}")]
    Format {
        /// The material asset.
        asset: AssetId,
        /// The decoding error.
        source: FormatError,
    },
}

/// Errors raised while loading material blueprints.
#[derive(Debug, Error)]
pub enum BlueprintError {
    /// The compiled blueprint is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// A referenced asset could not be read.
    #[error(transparent)]
    Asset(#[from] AssetError),
    /// A GPU object could not be created.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// A shader template is malformed.
    #[error(transparent)]
    Shader(#[from] ShaderBuilderError),
    /// A uniform buffer is larger than the device allows.
    #[error("uniform buffer {index} needs {size} bytes, the device allows {limit}")]
    UniformBufferTooLarge {
        /// Index of the uniform buffer.
        index: usize,
        /// Packed size.
        size: u32,
        /// Device limit.
        limit: u32,
    },
    /// A resource binds a root parameter the root signature does not have.
    #[error("{section} {index} binds root parameter {root_parameter_index}, the root signature has {number_of_root_parameters}")]
    RootParameterOutOfRange {
        /// Kind of resource.
        section: &'static str,
        /// Index of the resource.
        index: usize,
        /// The bound root parameter.
        root_parameter_index: u32,
        /// Root parameters declared.
        number_of_root_parameters: usize,
    },
    /// A texture uses a sampler state the blueprint does not declare.
    #[error("texture {index} uses sampler state {sampler_state_index}, the blueprint declares {number_of_sampler_states}")]
    SamplerStateOutOfRange {
        /// Index of the texture.
        index: usize,
        /// The sampler state index.
        sampler_state_index: u32,
        /// Sampler states declared.
        number_of_sampler_states: usize,
    },
    /// A shader blueprint is not loaded.
    #[error("shader blueprint {0} is not loaded")]
    ShaderBlueprintNotLoaded(AssetId),
}

/// Errors raised by the compositor.
#[derive(Debug, Error)]
pub enum CompositorError {
    /// The compiled node is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// A referenced asset could not be read.
    #[error(transparent)]
    Asset(#[from] AssetError),
    /// A GPU object could not be created.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// Submission failed.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Packing a pass buffer failed.
    #[error(transparent)]
    Packing(#[from] PackingError),
    /// A framebuffer names a render target texture the node does not declare.
    #[error("framebuffer {framebuffer} uses undeclared render target texture {texture}")]
    UnknownRenderTargetTexture {
        /// The framebuffer asset id.
        framebuffer: AssetId,
        /// The texture asset id.
        texture: AssetId,
    },
    /// A target names a framebuffer the node does not declare.
    #[error("target renders to undeclared framebuffer {0}")]
    UnknownFramebuffer(AssetId),
    /// The compositor node is not loaded.
    #[error("compositor node {0} is not loaded")]
    NodeNotLoaded(AssetId),
}

/// Errors raised while loading the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but cannot be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// The configuration file.
        path: PathBuf,
        /// The I/O error.
        source: std::io::Error,
    },
    /// The TOML is invalid.
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised while reading or writing the pipeline state cache file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File system error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The file is not a pipeline state cache.
    #[error("not a pipeline state cache file")]
    InvalidHeader,
    /// Written by another format version.
    #[error("pipeline state cache version {found}, expected {expected}")]
    VersionMismatch {
        /// Current version.
        expected: u32,
        /// Version in the file.
        found: u32,
    },
    /// Written for another backend.
    #[error("pipeline state cache was written for backend {found}, expected {expected}")]
    BackendMismatch {
        /// Current backend tag.
        expected: i32,
        /// Backend tag in the file.
        found: i32,
    },
    /// The payload does not match its digest.
    #[error("pipeline state cache payload is corrupted")]
    DigestMismatch,
    /// Payload encoding failed.
    #[error(transparent)]
    Encode(#[from] bincode::error::EncodeError),
    /// Payload decoding failed.
    #[error(transparent)]
    Decode(#[from] bincode::error::DecodeError),
}

/// Top level error of the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Asset lookup or read failure.
    #[error(transparent)]
    Asset(#[from] AssetError),
    /// Malformed compiled asset.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// Material failure.
    #[error(transparent)]
    Material(#[from] MaterialError),
    /// Material blueprint failure.
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
    /// Shader template failure.
    #[error(transparent)]
    ShaderBuilder(#[from] ShaderBuilderError),
    /// Compositor failure.
    #[error(transparent)]
    Compositor(#[from] CompositorError),
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Pipeline state cache file failure.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// Buffer packing failure.
    #[error(transparent)]
    Packing(#[from] PackingError),
    /// Backend failure.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// GPU object creation failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// The asset was never loaded through the runtime.
    #[error("asset {0} is not loaded")]
    AssetNotLoaded(AssetId),
    /// The workspace was destroyed or never created.
    #[error("workspace {0:?} does not exist")]
    WorkspaceNotFound(WorkspaceId),
}
