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

//! Offline asset toolkit of Lumen.
//!
//! Sources are JSON documents (material blueprints, materials, compositor
//! nodes, scenes) or shader text (shader pieces, shader blueprints), told apart
//! by their file extension. [`compile`] turns one source into the binary blob
//! the runtime loads; [`AssetCompiler::compile_directory`] compiles a whole
//! source tree in dependency order and [`pack::write_pack`] writes the blobs
//! with an index the runtime can mount.

#![warn(missing_docs)]

pub mod compiler;
pub mod compositor_node;
pub mod error;
pub mod material;
pub mod material_blueprint;
pub mod pack;
pub mod property;
pub mod scene;

pub use compiler::{compile, AssetCompiler, CompileInput, CompiledAsset, SourceKind};
pub use error::ToolkitError;
pub use pack::{write_pack, PackIndex};
