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

//! The compositor: nodes of passes rendered into shared render targets.

mod framebuffer;
mod node;
mod render_target;
mod workspace;

pub use self::framebuffer::{FramebufferManager, FramebufferSignature, FramebufferTexture};
pub use self::node::{
    CompositorNodeResource, CompositorNodeResourceManager, CompositorPass, CompositorTarget,
    FramebufferDeclaration, RenderTargetTextureDeclaration,
};
pub use self::render_target::{
    RenderTargetTextureManager, RenderTargetTextureSignature, RenderTargetTextureSignatureId,
};
pub use self::workspace::{
    CompositorContext, CompositorStatistics, CompositorWorkspaceInstance, WorkspaceSettings,
};
