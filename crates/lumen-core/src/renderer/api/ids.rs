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

//! Opaque handles to objects owned by a [`RenderBackend`](crate::renderer::RenderBackend).

use std::fmt::Debug;
use std::hash::Hash;

/// An opaque backend object id that can be released through [`GpuObject`].
pub trait GpuResourceId: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Wraps the id into the untyped [`GpuObject`] used for release.
    fn into_object(self) -> GpuObject;
}

macro_rules! gpu_ids {
    ($($(#[$doc:meta])* $name:ident => $variant:ident,)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u64);

            impl GpuResourceId for $name {
                fn into_object(self) -> GpuObject {
                    GpuObject::$variant(self)
                }
            }
        )*

        /// Any object a backend can release.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GpuObject {
            $(
                #[allow(missing_docs)]
                $variant($name),
            )*
        }
    };
}

gpu_ids! {
    /// A compiled shader of one shader type.
    ShaderId => Shader,
    /// A linked set of shaders.
    ProgramId => Program,
    /// A root signature (descriptor table layout).
    RootSignatureId => RootSignature,
    /// A pipeline state object.
    PipelineStateId => PipelineState,
    /// A uniform (constant) buffer.
    UniformBufferId => UniformBuffer,
    /// A texture buffer (typed buffer read as a texture).
    TextureBufferId => TextureBuffer,
    /// A texture.
    TextureId => Texture,
    /// A sampler state object.
    SamplerStateId => SamplerState,
    /// A framebuffer bundling color and depth-stencil attachments.
    FramebufferId => Framebuffer,
}
