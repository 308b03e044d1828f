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

//! Pipeline state caching.
//!
//! A pipeline state is identified by a [`PipelineStateSignature`]: the material
//! blueprint, the optimized shader combination and the hash of the
//! fixed-function state derived from the material. The
//! [`PipelineStateCacheManager`] maps signature keys to immutable
//! [`PipelineStateCache`] entries, building each at most once, either on the
//! requesting thread or on a [`PipelineStateCompiler`] worker. Built signatures
//! and shader bytecode can be persisted and used to warm up the next run.

mod cache;
mod compiler;
mod manager;
pub mod persistence;
mod signature;

pub use self::cache::PipelineStateCache;
pub use self::compiler::PipelineStateCompiler;
pub use self::manager::{PipelineStateCacheManager, PipelineStateCacheStatistics, PipelineStateRequest};
pub use self::persistence::PipelineCacheSnapshot;
pub use self::signature::{PipelineStateSignature, StateOverride};
