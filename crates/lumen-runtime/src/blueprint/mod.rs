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

//! Material blueprints: shader blueprints plus the fixed pipeline state,
//! root signature and buffer declarations materials are drawn with.

mod listener;
mod manager;
mod resource;
mod state;

pub use self::listener::{
    pass_reference, DefaultMaterialBlueprintResourceListener, MaterialBlueprintResourceListener,
    PassContext,
};
pub(crate) use self::listener::multiply;
pub use self::manager::{MaterialBlueprintResourceId, MaterialBlueprintResourceManager};
pub use self::resource::{
    BlueprintBufferUsage, MaterialBlueprintResource, SamplerStateDeclaration,
    ShaderCombinationProperty, TextureBufferDeclaration, TextureDeclaration,
    UniformBufferDeclaration,
};
pub use self::state::apply_state_property;
