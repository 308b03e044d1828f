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

//! Foundational crate of the Lumen rendering runtime.
//!
//! This crate defines the contracts every other crate builds on:
//! - [`hash`]: stable 64-bit identifiers shared by the toolkit and the runtime.
//! - [`collections`]: the handle table backing every resource manager.
//! - [`asset`]: asset identity, packages and lookup.
//! - [`renderer`]: the backend-agnostic renderer API and the [`renderer::RenderBackend`] trait.
//! - [`format`]: fixed-layout binary asset formats.
//!
//! It contains no policy: no caching, no material logic, no backend.

#![warn(missing_docs)]

pub mod asset;
pub mod collections;
pub mod format;
pub mod hash;
pub mod renderer;
pub mod utils;

pub use hash::{ContentHash, ContentHasher, MaterialTechniqueId, PropertyId};
