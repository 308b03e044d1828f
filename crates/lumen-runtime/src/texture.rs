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

//! Texture resources bound by material techniques.

use crate::material::TechniqueTexture;
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::renderer::api::{TextureDescriptor, TextureFlags, TextureFormat, TextureId};
use lumen_core::renderer::{GpuHandle, RenderDevice, ResourceError};

/// Well-known default textures, always available.
pub mod default_texture {
    use lumen_core::asset::AssetId;

    /// 1x1 opaque white.
    pub const WHITE: AssetId = AssetId::from_name("Lumen/Texture/Default/White");
    /// 1x1 opaque black.
    pub const BLACK: AssetId = AssetId::from_name("Lumen/Texture/Default/Black");
    /// 1x1 flat tangent space normal.
    pub const NORMAL_MAP: AssetId = AssetId::from_name("Lumen/Texture/Default/NormalMap");
}

/// Maps texture assets to GPU textures.
///
/// Texture streaming is outside of the runtime: decoded textures and
/// compositor render targets are registered here by asset id.
#[derive(Debug)]
pub struct TextureResourceManager {
    device: RenderDevice,
    textures: AHashMap<AssetId, GpuHandle<TextureId>>,
}

impl TextureResourceManager {
    /// Creates the manager and the default textures.
    pub fn new(device: RenderDevice) -> Result<Self, ResourceError> {
        let mut manager = Self {
            device,
            textures: AHashMap::new(),
        };
        for asset_id in [
            default_texture::WHITE,
            default_texture::BLACK,
            default_texture::NORMAL_MAP,
        ] {
            manager.create(asset_id, 1, 1, TextureFormat::R8G8B8A8)?;
        }
        Ok(manager)
    }

    /// Creates a sampled texture and registers it under `asset_id`.
    pub fn create(
        &mut self,
        asset_id: AssetId,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<GpuHandle<TextureId>, ResourceError> {
        let texture = self.device.create_texture(&TextureDescriptor {
            width,
            height,
            format,
            flags: TextureFlags::SHADER_RESOURCE,
            number_of_multisamples: 1,
        })?;
        self.register(asset_id, texture.clone());
        Ok(texture)
    }

    /// Registers an existing texture, replacing a previous one.
    pub fn register(&mut self, asset_id: AssetId, texture: GpuHandle<TextureId>) {
        if self.textures.insert(asset_id, texture).is_some() {
            log::debug!("Texture {} replaced", asset_id);
        }
    }

    /// Forgets a texture.
    pub fn remove(&mut self, asset_id: AssetId) -> Option<GpuHandle<TextureId>> {
        self.textures.remove(&asset_id)
    }

    /// A texture by asset.
    pub fn get(&self, asset_id: AssetId) -> Option<&GpuHandle<TextureId>> {
        self.textures.get(&asset_id)
    }

    /// The texture to bind for a technique texture: the named texture, else
    /// its fallback, else opaque white.
    pub fn resolve(&self, texture: &TechniqueTexture) -> Option<&GpuHandle<TextureId>> {
        texture
            .texture_asset_id
            .and_then(|asset_id| self.textures.get(&asset_id))
            .or_else(|| {
                texture
                    .fallback_texture_asset_id
                    .and_then(|asset_id| self.textures.get(&asset_id))
            })
            .or_else(|| self.textures.get(&default_texture::WHITE))
    }

    /// Number of textures, defaults included.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Returns `true` if no texture is registered.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
