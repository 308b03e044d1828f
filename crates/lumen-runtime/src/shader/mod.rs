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

//! Shader combinations: switches, templates, pieces and compiled variants.

pub mod blueprint;
pub mod builder;
pub mod cache;
pub mod piece;
pub mod properties;

pub use self::blueprint::{ShaderBlueprintResource, ShaderBlueprintResourceManager};
pub use self::builder::{Expression, NoPieces, Node, PieceSource, ShaderBuilder, ShaderTemplate};
pub use self::cache::{ShaderBytecode, ShaderCache, ShaderCacheManager, ShaderCacheStatistics};
pub use self::piece::{ShaderPieceResource, ShaderPieceResourceManager};
pub use self::properties::ShaderProperties;
