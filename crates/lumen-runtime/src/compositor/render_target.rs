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

//! Render target textures shared between compositor nodes.

use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::renderer::api::{TextureDescriptor, TextureFlags, TextureFormat, TextureId};
use lumen_core::renderer::{GpuHandle, RenderDevice, ResourceError};
use lumen_core::ContentHasher;

/// Stable id of a [`RenderTargetTextureSignature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderTargetTextureSignatureId(pub u64);

/// Everything that makes two render target textures interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetTextureSignature {
    width: u32,
    height: u32,
    texture_format: TextureFormat,
    allow_multisample: bool,
    id: RenderTargetTextureSignatureId,
}

impl RenderTargetTextureSignature {
    /// Builds a signature; its id is a pure function of the arguments.
    pub fn new(width: u32, height: u32, texture_format: TextureFormat, allow_multisample: bool) -> Self {
        let id = ContentHasher::new()
            .write_u32(width)
            .write_u32(height)
            .write(&texture_format)
            .write_bool(allow_multisample)
            .finish();
        Self {
            width,
            height,
            texture_format,
            allow_multisample,
            id: RenderTargetTextureSignatureId(id),
        }
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel format.
    pub fn texture_format(&self) -> TextureFormat {
        self.texture_format
    }

    /// Whether the texture may be multisampled.
    pub fn allow_multisample(&self) -> bool {
        self.allow_multisample
    }

    /// The content derived id.
    pub fn id(&self) -> RenderTargetTextureSignatureId {
        self.id
    }

    fn descriptor(&self, number_of_multisamples: u8) -> TextureDescriptor {
        let flags = if self.texture_format.is_depth() {
            TextureFlags::RENDER_TARGET
        } else {
            TextureFlags::RENDER_TARGET | TextureFlags::SHADER_RESOURCE
        };
        TextureDescriptor {
            width: self.width,
            height: self.height,
            format: self.texture_format,
            flags,
            number_of_multisamples: if self.allow_multisample {
                number_of_multisamples.max(1)
            } else {
                1
            },
        }
    }
}

#[derive(Debug)]
struct Entry {
    signature: RenderTargetTextureSignature,
    texture: GpuHandle<TextureId>,
    number_of_references: u32,
}

/// Creates render target textures on demand and shares them by asset and signature.
///
/// Two compositor nodes declaring the same render target asset with the same
/// signature use one GPU texture. The texture is dropped with its last
/// reference.
#[derive(Debug)]
pub struct RenderTargetTextureManager {
    device: RenderDevice,
    number_of_multisamples: u8,
    entries: AHashMap<(AssetId, RenderTargetTextureSignatureId), Entry>,
}

impl RenderTargetTextureManager {
    /// Creates an empty manager.
    pub fn new(device: RenderDevice) -> Self {
        Self {
            device,
            number_of_multisamples: 1,
            entries: AHashMap::new(),
        }
    }

    /// Samples used for targets allowing multisampling. Applies to textures created afterwards.
    pub fn set_number_of_multisamples(&mut self, number_of_multisamples: u8) {
        self.number_of_multisamples = number_of_multisamples.max(1);
    }

    /// Returns the texture of `asset_id` with `signature`, creating it on first use.
    pub fn acquire(
        &mut self,
        asset_id: AssetId,
        signature: RenderTargetTextureSignature,
    ) -> Result<GpuHandle<TextureId>, ResourceError> {
        let key = (asset_id, signature.id());
        if let Some(entry) = self.entries.get_mut(&key) {
            debug_assert_eq!(entry.signature, signature);
            entry.number_of_references += 1;
            return Ok(entry.texture.clone());
        }
        let texture = self
            .device
            .create_texture(&signature.descriptor(self.number_of_multisamples))?;
        log::debug!(
            "Created render target texture {} ({}x{} {:?})",
            asset_id,
            signature.width(),
            signature.height(),
            signature.texture_format()
        );
        self.entries.insert(
            key,
            Entry {
                signature,
                texture: texture.clone(),
                number_of_references: 1,
            },
        );
        Ok(texture)
    }

    /// Drops one reference. Returns `true` if the texture was destroyed.
    pub fn release(&mut self, asset_id: AssetId, signature_id: RenderTargetTextureSignatureId) -> bool {
        let key = (asset_id, signature_id);
        let Some(entry) = self.entries.get_mut(&key) else {
            log::error!("Released unknown render target texture {}", asset_id);
            return false;
        };
        entry.number_of_references -= 1;
        if entry.number_of_references > 0 {
            return false;
        }
        self.entries.remove(&key);
        true
    }

    /// Any live texture of `asset_id`.
    pub fn texture(&self, asset_id: AssetId) -> Option<&GpuHandle<TextureId>> {
        self.entries
            .iter()
            .find(|((id, _), _)| *id == asset_id)
            .map(|(_, entry)| &entry.texture)
    }

    /// Number of live textures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no texture is alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logs every texture still referenced and returns how many there are.
    pub fn report_leaks(&self) -> usize {
        for ((asset_id, _), entry) in &self.entries {
            log::error!(
                "Render target texture {} ({}x{}) still has {} references",
                asset_id,
                entry.signature.width(),
                entry.signature.height(),
                entry.number_of_references
            );
        }
        self.entries.len()
    }
}

impl Drop for RenderTargetTextureManager {
    fn drop(&mut self) {
        self.report_leaks();
    }
}
