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

//! Fixed-function state properties applied on top of a pipeline state template.

use crate::material::MaterialPropertyValue as Value;
use lumen_core::renderer::api::{PipelineStateTemplate, MAX_RENDER_TARGETS};
use lumen_core::PropertyId;
use std::sync::OnceLock;

const FILL_MODE: PropertyId = PropertyId::from_name("FillMode");
const CULL_MODE: PropertyId = PropertyId::from_name("CullMode");
const FRONT_COUNTER_CLOCKWISE: PropertyId = PropertyId::from_name("FrontCounterClockwise");
const DEPTH_BIAS: PropertyId = PropertyId::from_name("DepthBias");
const DEPTH_BIAS_CLAMP: PropertyId = PropertyId::from_name("DepthBiasClamp");
const SLOPE_SCALED_DEPTH_BIAS: PropertyId = PropertyId::from_name("SlopeScaledDepthBias");
const DEPTH_CLIP_ENABLE: PropertyId = PropertyId::from_name("DepthClipEnable");
const MULTISAMPLE_ENABLE: PropertyId = PropertyId::from_name("MultisampleEnable");
const ANTIALIASED_LINE_ENABLE: PropertyId = PropertyId::from_name("AntialiasedLineEnable");
const CONSERVATIVE_RASTERIZATION_MODE: PropertyId =
    PropertyId::from_name("ConservativeRasterizationMode");
const SCISSOR_ENABLE: PropertyId = PropertyId::from_name("ScissorEnable");
const DEPTH_ENABLE: PropertyId = PropertyId::from_name("DepthEnable");
const DEPTH_WRITE_MASK: PropertyId = PropertyId::from_name("DepthWriteMask");
const DEPTH_FUNC: PropertyId = PropertyId::from_name("DepthFunc");
const STENCIL_ENABLE: PropertyId = PropertyId::from_name("StencilEnable");
const ALPHA_TO_COVERAGE_ENABLE: PropertyId = PropertyId::from_name("AlphaToCoverageEnable");
const INDEPENDENT_BLEND_ENABLE: PropertyId = PropertyId::from_name("IndependentBlendEnable");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderTargetField {
    BlendEnable,
    SrcBlend,
    DestBlend,
    BlendOp,
    SrcBlendAlpha,
    DestBlendAlpha,
    BlendOpAlpha,
    RenderTargetWriteMask,
}

impl RenderTargetField {
    const ALL: [(Self, &'static str); 8] = [
        (Self::BlendEnable, "BlendEnable"),
        (Self::SrcBlend, "SrcBlend"),
        (Self::DestBlend, "DestBlend"),
        (Self::BlendOp, "BlendOp"),
        (Self::SrcBlendAlpha, "SrcBlendAlpha"),
        (Self::DestBlendAlpha, "DestBlendAlpha"),
        (Self::BlendOpAlpha, "BlendOpAlpha"),
        (Self::RenderTargetWriteMask, "RenderTargetWriteMask"),
    ];
}

/// `RenderTarget[i].Field` ids, sorted for binary search.
fn render_target_properties() -> &'static [(PropertyId, usize, RenderTargetField)] {
    static TABLE: OnceLock<Vec<(PropertyId, usize, RenderTargetField)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = Vec::with_capacity(MAX_RENDER_TARGETS * RenderTargetField::ALL.len());
        for index in 0..MAX_RENDER_TARGETS {
            for (field, name) in RenderTargetField::ALL {
                let id = PropertyId::from_name(&format!("RenderTarget[{index}].{name}"));
                table.push((id, index, field));
            }
        }
        table.sort_by_key(|(id, _, _)| *id);
        table
    })
}

/// Applies a state property to a template.
///
/// Returns `false` when the property name is not a state field or the value
/// has the wrong type; the template is then unchanged.
pub fn apply_state_property(template: &mut PipelineStateTemplate, property_id: PropertyId, value: &Value) -> bool {
    let rasterizer = &mut template.rasterizer_state;
    let depth_stencil = &mut template.depth_stencil_state;
    let blend = &mut template.blend_state;
    match (property_id, *value) {
        (FILL_MODE, Value::FillMode(mode)) => rasterizer.fill_mode = mode,
        (CULL_MODE, Value::CullMode(mode)) => rasterizer.cull_mode = mode,
        (FRONT_COUNTER_CLOCKWISE, Value::Boolean(enable)) => rasterizer.front_counter_clockwise = enable,
        (DEPTH_BIAS, Value::Integer(bias)) => rasterizer.depth_bias = bias,
        (DEPTH_BIAS_CLAMP, Value::Float(clamp)) => rasterizer.depth_bias_clamp = clamp,
        (SLOPE_SCALED_DEPTH_BIAS, Value::Float(bias)) => rasterizer.slope_scaled_depth_bias = bias,
        (DEPTH_CLIP_ENABLE, Value::Boolean(enable)) => rasterizer.depth_clip_enable = enable,
        (MULTISAMPLE_ENABLE, Value::Boolean(enable)) => rasterizer.multisample_enable = enable,
        (ANTIALIASED_LINE_ENABLE, Value::Boolean(enable)) => rasterizer.antialiased_line_enable = enable,
        (CONSERVATIVE_RASTERIZATION_MODE, Value::ConservativeRasterizationMode(mode)) => {
            rasterizer.conservative_rasterization_mode = mode
        }
        (SCISSOR_ENABLE, Value::Boolean(enable)) => rasterizer.scissor_enable = enable,
        (DEPTH_ENABLE, Value::Boolean(enable)) => depth_stencil.depth_enable = enable,
        (DEPTH_WRITE_MASK, Value::DepthWriteMask(mask)) => depth_stencil.depth_write_mask = mask,
        (DEPTH_FUNC, Value::ComparisonFunc(func)) => depth_stencil.depth_func = func,
        (STENCIL_ENABLE, Value::Boolean(enable)) => depth_stencil.stencil_enable = enable,
        (ALPHA_TO_COVERAGE_ENABLE, Value::Boolean(enable)) => blend.alpha_to_coverage_enable = enable,
        (INDEPENDENT_BLEND_ENABLE, Value::Boolean(enable)) => blend.independent_blend_enable = enable,
        _ => {
            let table = render_target_properties();
            let Ok(position) = table.binary_search_by_key(&property_id, |(id, _, _)| *id) else {
                return false;
            };
            let (_, index, field) = table[position];
            let target = &mut blend.render_target[index];
            match (field, *value) {
                (RenderTargetField::BlendEnable, Value::Boolean(enable)) => target.blend_enable = enable,
                (RenderTargetField::SrcBlend, Value::Blend(factor)) => target.src_blend = factor,
                (RenderTargetField::DestBlend, Value::Blend(factor)) => target.dest_blend = factor,
                (RenderTargetField::BlendOp, Value::BlendOp(op)) => target.blend_op = op,
                (RenderTargetField::SrcBlendAlpha, Value::Blend(factor)) => target.src_blend_alpha = factor,
                (RenderTargetField::DestBlendAlpha, Value::Blend(factor)) => target.dest_blend_alpha = factor,
                (RenderTargetField::BlendOpAlpha, Value::BlendOp(op)) => target.blend_op_alpha = op,
                (RenderTargetField::RenderTargetWriteMask, Value::Integer(mask)) => {
                    target.render_target_write_mask = (mask & 0x0f) as u8
                }
                _ => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::api::{Blend, CullMode};

    #[test]
    fn rasterizer_and_depth_fields() {
        let mut template = PipelineStateTemplate::default();
        assert!(apply_state_property(&mut template, CULL_MODE, &Value::CullMode(CullMode::None)));
        assert!(apply_state_property(&mut template, DEPTH_ENABLE, &Value::Boolean(false)));
        assert_eq!(template.rasterizer_state.cull_mode, CullMode::None);
        assert!(!template.depth_stencil_state.depth_enable);
    }

    #[test]
    fn render_target_fields() {
        let mut template = PipelineStateTemplate::default();
        let id = PropertyId::from_name("RenderTarget[2].SrcBlend");
        assert!(apply_state_property(&mut template, id, &Value::Blend(Blend::SrcAlpha)));
        assert_eq!(template.blend_state.render_target[2].src_blend, Blend::SrcAlpha);
        assert_eq!(template.blend_state.render_target[0].src_blend, Blend::One);
    }

    #[test]
    fn mismatches_leave_the_template_alone() {
        let mut template = PipelineStateTemplate::default();
        assert!(!apply_state_property(&mut template, CULL_MODE, &Value::Integer(1)));
        assert!(!apply_state_property(
            &mut template,
            PropertyId::from_name("Roughness"),
            &Value::Float(0.5)
        ));
        assert_eq!(template, PipelineStateTemplate::default());
    }
}
