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

//! Framebuffers shared between compositor nodes.

use super::render_target::{
    RenderTargetTextureManager, RenderTargetTextureSignature, RenderTargetTextureSignatureId,
};
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::renderer::api::{FramebufferAttachment, FramebufferDescriptor, FramebufferId};
use lumen_core::renderer::{GpuHandle, RenderDevice, ResourceError};
use lumen_core::ContentHasher;

/// A render target texture attached to a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferTexture {
    /// The render target texture asset.
    pub asset_id: AssetId,
    /// Its resolved signature.
    pub signature: RenderTargetTextureSignature,
}

/// The attachments of a framebuffer, hashed into a stable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferSignature {
    color_textures: Vec<FramebufferTexture>,
    depth_stencil_texture: Option<FramebufferTexture>,
    id: u64,
}

impl FramebufferSignature {
    /// Builds a signature from the attached textures.
    pub fn new(color_textures: Vec<FramebufferTexture>, depth_stencil_texture: Option<FramebufferTexture>) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.write_u32(color_textures.len() as u32);
        for texture in color_textures.iter().chain(depth_stencil_texture.iter()) {
            hasher
                .write(&texture.asset_id)
                .write_u64(texture.signature.id().0);
        }
        hasher.write_bool(depth_stencil_texture.is_some());
        Self {
            color_textures,
            depth_stencil_texture,
            id: hasher.finish(),
        }
    }

    /// The content derived id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Color attachments in order.
    pub fn color_textures(&self) -> &[FramebufferTexture] {
        &self.color_textures
    }

    /// The depth-stencil attachment.
    pub fn depth_stencil_texture(&self) -> Option<&FramebufferTexture> {
        self.depth_stencil_texture.as_ref()
    }

    fn textures(&self) -> impl Iterator<Item = &FramebufferTexture> {
        self.color_textures.iter().chain(self.depth_stencil_texture.iter())
    }
}

#[derive(Debug)]
struct Entry {
    signature: FramebufferSignature,
    framebuffer: GpuHandle<FramebufferId>,
    number_of_references: u32,
}

/// Creates framebuffers on demand and shares them by signature.
#[derive(Debug)]
pub struct FramebufferManager {
    device: RenderDevice,
    entries: AHashMap<u64, Entry>,
}

impl FramebufferManager {
    /// Creates an empty manager.
    pub fn new(device: RenderDevice) -> Self {
        Self {
            device,
            entries: AHashMap::new(),
        }
    }

    /// Returns the framebuffer of `signature`, creating it and its textures on
    /// first use.
    pub fn acquire(
        &mut self,
        signature: &FramebufferSignature,
        render_targets: &mut RenderTargetTextureManager,
    ) -> Result<GpuHandle<FramebufferId>, ResourceError> {
        if let Some(entry) = self.entries.get_mut(&signature.id()) {
            entry.number_of_references += 1;
            return Ok(entry.framebuffer.clone());
        }

        let mut acquired: Vec<(AssetId, RenderTargetTextureSignatureId)> = Vec::new();
        let mut attachments = Vec::new();
        for texture in signature.textures() {
            match render_targets.acquire(texture.asset_id, texture.signature) {
                Ok(handle) => {
                    acquired.push((texture.asset_id, texture.signature.id()));
                    attachments.push(FramebufferAttachment {
                        texture: handle.id(),
                        mipmap_index: 0,
                    });
                }
                Err(error) => {
                    for (asset_id, signature_id) in acquired {
                        render_targets.release(asset_id, signature_id);
                    }
                    return Err(error);
                }
            }
        }
        let depth_stencil_attachment = signature
            .depth_stencil_texture()
            .and_then(|_| attachments.pop());
        let descriptor = FramebufferDescriptor {
            color_attachments: attachments,
            depth_stencil_attachment,
        };
        let framebuffer = match self.device.create_framebuffer(&descriptor) {
            Ok(framebuffer) => framebuffer,
            Err(error) => {
                for (asset_id, signature_id) in acquired {
                    render_targets.release(asset_id, signature_id);
                }
                return Err(error);
            }
        };
        self.entries.insert(
            signature.id(),
            Entry {
                signature: signature.clone(),
                framebuffer: framebuffer.clone(),
                number_of_references: 1,
            },
        );
        Ok(framebuffer)
    }

    /// Drops one reference; the last one also releases the textures.
    /// Returns `true` if the framebuffer was destroyed.
    pub fn release(&mut self, signature_id: u64, render_targets: &mut RenderTargetTextureManager) -> bool {
        let Some(entry) = self.entries.get_mut(&signature_id) else {
            log::error!("Released unknown framebuffer {:#018x}", signature_id);
            return false;
        };
        entry.number_of_references -= 1;
        if entry.number_of_references > 0 {
            return false;
        }
        if let Some(entry) = self.entries.remove(&signature_id) {
            for texture in entry.signature.textures() {
                render_targets.release(texture.asset_id, texture.signature.id());
            }
        }
        true
    }

    /// Number of live framebuffers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no framebuffer is alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logs every framebuffer still referenced and returns how many there are.
    pub fn report_leaks(&self) -> usize {
        for (signature_id, entry) in &self.entries {
            log::error!(
                "Framebuffer {:#018x} with {} attachments still has {} references",
                signature_id,
                entry.signature.textures().count(),
                entry.number_of_references
            );
        }
        self.entries.len()
    }
}

impl Drop for FramebufferManager {
    fn drop(&mut self) {
        self.report_leaks();
    }
}
