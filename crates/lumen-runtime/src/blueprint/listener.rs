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

//! Pass-wide values consumed by pass uniform buffers.

use crate::material::MaterialPropertyValue;
use lumen_core::PropertyId;

/// Well-known pass reference ids.
pub mod pass_reference {
    use lumen_core::PropertyId;

    /// `Float4_4`, world space to clip space.
    pub const WORLD_SPACE_TO_CLIP_SPACE_MATRIX: PropertyId =
        PropertyId::from_name("@WorldSpaceToClipSpaceMatrix");
    /// `Float4_4`, world space to view space.
    pub const WORLD_SPACE_TO_VIEW_SPACE_MATRIX: PropertyId =
        PropertyId::from_name("@WorldSpaceToViewSpaceMatrix");
    /// `Float4_4`, view space to clip space.
    pub const VIEW_SPACE_TO_CLIP_SPACE_MATRIX: PropertyId =
        PropertyId::from_name("@ViewSpaceToClipSpaceMatrix");
    /// `Float2`, viewport size in pixels.
    pub const VIEWPORT_SIZE: PropertyId = PropertyId::from_name("@ViewportSize");
    /// `Float`, seconds since the runtime started.
    pub const GLOBAL_TIME_IN_SECONDS: PropertyId = PropertyId::from_name("@GlobalTimeInSeconds");
}

/// The state of the pass being filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassContext {
    /// Render target size in pixels.
    pub viewport_size: [u32; 2],
    /// Column-major camera view matrix.
    pub world_space_to_view_space: [f32; 16],
    /// Column-major projection matrix.
    pub view_space_to_clip_space: [f32; 16],
    /// Seconds since the runtime started.
    pub global_time_in_seconds: f32,
}

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

impl Default for PassContext {
    fn default() -> Self {
        Self {
            viewport_size: [1, 1],
            world_space_to_view_space: IDENTITY,
            view_space_to_clip_space: IDENTITY,
            global_time_in_seconds: 0.0,
        }
    }
}

/// Multiplies two column-major 4x4 matrices.
pub(crate) fn multiply(lhs: &[f32; 16], rhs: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for column in 0..4 {
        for row in 0..4 {
            out[column * 4 + row] = (0..4).map(|k| lhs[k * 4 + row] * rhs[column * 4 + k]).sum();
        }
    }
    out
}

/// Supplies the values of pass references.
///
/// Called once per pass before the pass uniform buffers are filled.
pub trait MaterialBlueprintResourceListener: Send + Sync {
    /// Captures the state of the pass about to be filled.
    fn begin_fill_pass(&mut self, context: &PassContext);

    /// The value of a pass reference, `None` if unknown.
    fn fill_pass_value(&self, reference: PropertyId) -> Option<MaterialPropertyValue>;
}

/// Listener providing the camera and timing references of [`pass_reference`].
#[derive(Debug, Clone, Default)]
pub struct DefaultMaterialBlueprintResourceListener {
    context: PassContext,
    world_space_to_clip_space: [f32; 16],
}

impl DefaultMaterialBlueprintResourceListener {
    /// Creates a listener with an identity camera.
    pub fn new() -> Self {
        let mut listener = Self::default();
        listener.begin_fill_pass(&PassContext::default());
        listener
    }
}

impl MaterialBlueprintResourceListener for DefaultMaterialBlueprintResourceListener {
    fn begin_fill_pass(&mut self, context: &PassContext) {
        self.context = *context;
        self.world_space_to_clip_space = multiply(
            &context.view_space_to_clip_space,
            &context.world_space_to_view_space,
        );
    }

    fn fill_pass_value(&self, reference: PropertyId) -> Option<MaterialPropertyValue> {
        use pass_reference::*;
        Some(match reference {
            WORLD_SPACE_TO_CLIP_SPACE_MATRIX => {
                MaterialPropertyValue::Float4_4(self.world_space_to_clip_space)
            }
            WORLD_SPACE_TO_VIEW_SPACE_MATRIX => {
                MaterialPropertyValue::Float4_4(self.context.world_space_to_view_space)
            }
            VIEW_SPACE_TO_CLIP_SPACE_MATRIX => {
                MaterialPropertyValue::Float4_4(self.context.view_space_to_clip_space)
            }
            VIEWPORT_SIZE => MaterialPropertyValue::Float2([
                self.context.viewport_size[0] as f32,
                self.context.viewport_size[1] as f32,
            ]),
            GLOBAL_TIME_IN_SECONDS => {
                MaterialPropertyValue::Float(self.context.global_time_in_seconds)
            }
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_matrix_combines_view_and_projection() {
        let mut translation = IDENTITY;
        translation[12] = 3.0;
        let mut scale = IDENTITY;
        scale[0] = 2.0;
        let mut listener = DefaultMaterialBlueprintResourceListener::new();
        listener.begin_fill_pass(&PassContext {
            viewport_size: [640, 480],
            world_space_to_view_space: translation,
            view_space_to_clip_space: scale,
            global_time_in_seconds: 1.5,
        });
        let Some(MaterialPropertyValue::Float4_4(clip)) =
            listener.fill_pass_value(pass_reference::WORLD_SPACE_TO_CLIP_SPACE_MATRIX)
        else {
            panic!("missing clip matrix");
        };
        assert_eq!(clip[0], 2.0);
        assert_eq!(clip[12], 6.0);
        assert_eq!(
            listener.fill_pass_value(pass_reference::VIEWPORT_SIZE),
            Some(MaterialPropertyValue::Float2([640.0, 480.0]))
        );
        assert_eq!(listener.fill_pass_value(PropertyId::from_name("@Unknown")), None);
    }
}
