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

//! Compositor node sources.
//!
//! Render target textures and framebuffers are declared with asset names and
//! referenced by those names from framebuffers, targets and passes. A width or
//! height of zero follows the size of the workspace output.

use crate::error::ToolkitError;
use lumen_core::asset::AssetId;
use lumen_core::format::{
    ClearPassRecord, CompositorNodeFile, CompositorPassRecord, CompositorTargetSection,
    CopyPassRecord, FramebufferRecord, QuadPassRecord, RenderTargetTextureRecord, ScenePassRecord,
    MAX_FRAMEBUFFER_COLOR_TEXTURES,
};
use lumen_core::hash::hash_str;
use lumen_core::renderer::api::{ClearFlags, TextureFormat};
use lumen_core::MaterialTechniqueId;
use serde::Deserialize;

/// A compositor node source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositorNodeSource {
    /// Input channel names.
    #[serde(default)]
    pub input_channels: Vec<String>,
    /// Render target textures owned by the node.
    #[serde(default)]
    pub render_target_textures: Vec<RenderTargetTextureSource>,
    /// Framebuffers over those textures.
    #[serde(default)]
    pub framebuffers: Vec<FramebufferSource>,
    /// Targets in execution order.
    #[serde(default)]
    pub targets: Vec<TargetSource>,
    /// Output channel names.
    #[serde(default)]
    pub output_channels: Vec<String>,
}

/// A render target texture.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct RenderTargetTextureSource {
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub texture_format: TextureFormat,
    #[serde(default)]
    pub allow_multisample: bool,
}

/// A framebuffer.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct FramebufferSource {
    pub name: String,
    #[serde(default)]
    pub color_textures: Vec<String>,
    #[serde(default)]
    pub depth_stencil_texture: Option<String>,
}

/// A target: passes rendering into one framebuffer, or the workspace output when none is named.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct TargetSource {
    #[serde(default)]
    pub framebuffer: Option<String>,
    #[serde(default)]
    pub passes: Vec<PassSource>,
}

/// Attachments touched by a clear pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[allow(missing_docs)]
pub enum ClearTarget {
    Color,
    Depth,
    Stencil,
}

fn default_clear() -> Vec<ClearTarget> {
    vec![ClearTarget::Color, ClearTarget::Depth]
}

fn default_z() -> f32 {
    1.0
}

fn all_queues() -> u32 {
    u32::MAX
}

/// A pass, tagged by its `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
#[allow(missing_docs)]
pub enum PassSource {
    Clear {
        #[serde(default = "default_clear")]
        flags: Vec<ClearTarget>,
        #[serde(default)]
        color: [f32; 4],
        #[serde(default = "default_z")]
        z: f32,
        #[serde(default)]
        stencil: u32,
    },
    Scene {
        material_technique: String,
        #[serde(default)]
        minimum_render_queue_index: u32,
        #[serde(default = "all_queues")]
        maximum_render_queue_index: u32,
    },
    Quad {
        material: String,
        material_technique: String,
    },
    Copy {
        destination: String,
        source: String,
    },
}

impl CompositorNodeSource {
    /// Parses a JSON source.
    pub fn parse(source: &str) -> Result<Self, ToolkitError> {
        serde_json::from_str(source).map_err(|source| ToolkitError::Json {
            kind: "compositor node",
            source,
        })
    }

    /// Builds the compiled file.
    pub fn to_file(&self) -> Result<CompositorNodeFile, ToolkitError> {
        let render_target_textures = self
            .render_target_textures
            .iter()
            .map(|texture| {
                Ok(RenderTargetTextureRecord {
                    asset_id: AssetId::from_asset_name(&texture.name)?.value(),
                    width: texture.width,
                    height: texture.height,
                    texture_format: texture.texture_format.as_i32(),
                    allow_multisample: u32::from(texture.allow_multisample),
                })
            })
            .collect::<Result<_, ToolkitError>>()?;

        let framebuffers = self
            .framebuffers
            .iter()
            .map(|framebuffer| self.framebuffer_record(framebuffer))
            .collect::<Result<_, _>>()?;

        let targets = self
            .targets
            .iter()
            .map(|target| {
                let framebuffer_asset_id = match &target.framebuffer {
                    Some(name) => {
                        if !self.framebuffers.iter().any(|declared| &declared.name == name) {
                            return Err(ToolkitError::UnknownCompositorResource {
                                kind: "framebuffer",
                                name: name.clone(),
                            });
                        }
                        AssetId::from_asset_name(name)?.value()
                    }
                    None => 0,
                };
                Ok(CompositorTargetSection {
                    framebuffer_asset_id,
                    passes: target
                        .passes
                        .iter()
                        .map(|pass| self.pass_record(pass))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<_, ToolkitError>>()?;

        Ok(CompositorNodeFile {
            input_channels: self.input_channels.iter().map(|name| hash_str(name)).collect(),
            render_target_textures,
            framebuffers,
            targets,
            output_channels: self.output_channels.iter().map(|name| hash_str(name)).collect(),
        })
    }

    fn texture_asset_id(&self, name: &str) -> Result<u64, ToolkitError> {
        if !self.render_target_textures.iter().any(|texture| texture.name == name) {
            return Err(ToolkitError::UnknownCompositorResource {
                kind: "render target texture",
                name: name.to_string(),
            });
        }
        Ok(AssetId::from_asset_name(name)?.value())
    }

    fn framebuffer_record(&self, framebuffer: &FramebufferSource) -> Result<FramebufferRecord, ToolkitError> {
        if framebuffer.color_textures.len() > MAX_FRAMEBUFFER_COLOR_TEXTURES {
            return Err(ToolkitError::TooManyColorTextures {
                name: framebuffer.name.clone(),
                count: framebuffer.color_textures.len(),
                max: MAX_FRAMEBUFFER_COLOR_TEXTURES,
            });
        }
        let mut color_texture_asset_ids = [0; MAX_FRAMEBUFFER_COLOR_TEXTURES];
        for (slot, name) in color_texture_asset_ids.iter_mut().zip(&framebuffer.color_textures) {
            *slot = self.texture_asset_id(name)?;
        }
        Ok(FramebufferRecord {
            asset_id: AssetId::from_asset_name(&framebuffer.name)?.value(),
            color_texture_asset_ids,
            depth_stencil_texture_asset_id: match &framebuffer.depth_stencil_texture {
                Some(name) => self.texture_asset_id(name)?,
                None => 0,
            },
            number_of_color_textures: framebuffer.color_textures.len() as u32,
            reserved: 0,
        })
    }

    fn pass_record(&self, pass: &PassSource) -> Result<CompositorPassRecord, ToolkitError> {
        Ok(match pass {
            PassSource::Clear {
                flags,
                color,
                z,
                stencil,
            } => {
                let mut clear_flags = ClearFlags::EMPTY;
                for target in flags {
                    clear_flags.insert(match target {
                        ClearTarget::Color => ClearFlags::COLOR,
                        ClearTarget::Depth => ClearFlags::DEPTH,
                        ClearTarget::Stencil => ClearFlags::STENCIL,
                    });
                }
                CompositorPassRecord::Clear(ClearPassRecord {
                    flags: clear_flags.bits(),
                    color: *color,
                    z: *z,
                    stencil: *stencil,
                })
            }
            PassSource::Scene {
                material_technique,
                minimum_render_queue_index,
                maximum_render_queue_index,
            } => CompositorPassRecord::Scene(ScenePassRecord {
                material_technique_id: MaterialTechniqueId::from_name(material_technique).value(),
                minimum_render_queue_index: *minimum_render_queue_index,
                maximum_render_queue_index: *maximum_render_queue_index,
            }),
            PassSource::Quad {
                material,
                material_technique,
            } => CompositorPassRecord::Quad(QuadPassRecord {
                material_asset_id: AssetId::from_asset_name(material)?.value(),
                material_technique_id: MaterialTechniqueId::from_name(material_technique).value(),
            }),
            PassSource::Copy {
                destination,
                source,
            } => CompositorPassRecord::Copy(CopyPassRecord {
                destination_texture_asset_id: self.texture_asset_id(destination)?,
                source_texture_asset_id: self.texture_asset_id(source)?,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE: &str = r#"{
        "input_channels": ["InputRenderTarget"],
        "render_target_textures": [
            { "name": "Example/Texture/Compositor/HdrColor", "texture_format": "R16G16B16A16F" },
            { "name": "Example/Texture/Compositor/Depth", "texture_format": "D32Float" }
        ],
        "framebuffers": [{
            "name": "Example/Framebuffer/Compositor/Hdr",
            "color_textures": ["Example/Texture/Compositor/HdrColor"],
            "depth_stencil_texture": "Example/Texture/Compositor/Depth"
        }],
        "targets": [
            {
                "framebuffer": "Example/Framebuffer/Compositor/Hdr",
                "passes": [
                    { "type": "Clear", "color": [0.5, 0.5, 0.5, 1.0] },
                    { "type": "Scene", "material_technique": "Forward" }
                ]
            },
            {
                "passes": [{ "type": "Quad", "material": "Example/Material/Compositor/ToneMap",
                             "material_technique": "Default" }]
            }
        ],
        "output_channels": ["OutputRenderTarget"]
    }"#;

    #[test]
    fn names_resolve_to_asset_ids() {
        let file = CompositorNodeSource::parse(NODE).unwrap().to_file().unwrap();
        let read = CompositorNodeFile::read(&file.write()).unwrap();
        assert_eq!(read.input_channels, vec![hash_str("InputRenderTarget")]);
        let framebuffer = &read.framebuffers[0];
        assert_eq!(framebuffer.number_of_color_textures, 1);
        assert_eq!(
            framebuffer.depth_stencil_texture_asset_id,
            AssetId::from_name("Example/Texture/Compositor/Depth").value()
        );
        assert_eq!(read.targets[0].framebuffer_asset_id, framebuffer.asset_id);
        assert_eq!(read.targets[1].framebuffer_asset_id, 0);
        match read.targets[0].passes[0] {
            CompositorPassRecord::Clear(clear) => {
                assert_eq!(clear.flags, (ClearFlags::COLOR | ClearFlags::DEPTH).bits());
                assert_eq!(clear.z, 1.0);
            }
            other => panic!("expected a clear pass, found {other:?}"),
        }
        match read.targets[0].passes[1] {
            CompositorPassRecord::Scene(scene) => {
                assert_eq!(scene.maximum_render_queue_index, u32::MAX)
            }
            other => panic!("expected a scene pass, found {other:?}"),
        }
    }

    #[test]
    fn undeclared_textures_are_rejected() {
        let source = NODE.replace(
            r#""depth_stencil_texture": "Example/Texture/Compositor/Depth""#,
            r#""depth_stencil_texture": "Example/Texture/Compositor/Missing""#,
        );
        assert!(matches!(
            CompositorNodeSource::parse(&source).unwrap().to_file(),
            Err(ToolkitError::UnknownCompositorResource { kind: "render target texture", .. })
        ));
    }
}
