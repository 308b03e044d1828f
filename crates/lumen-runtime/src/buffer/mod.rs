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

//! Uniform and texture buffer packing and the per-pass, per-draw and
//! per-material buffer managers.

mod instance;
mod layout;
mod material;
mod pass;
mod resolver;

pub use self::instance::InstanceBufferManager;
pub use self::layout::{UniformBufferLayout, UniformElement, UniformPacker, PACKAGE_SIZE};
pub use self::material::{MaterialBufferManager, MaterialSlot, MATERIAL_INDEX};
pub use self::pass::PassBufferManager;
pub use self::resolver::{InstancePropertySource, PropertyResolver};
