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

//! Material property definitions as written in JSON sources.
//!
//! A definition names the property, its usage and value type, and either a
//! literal value or, for reference usages, the referenced property:
//!
//! ```json
//! { "name": "DiffuseColor", "usage": "ShaderUniform", "value_type": "Float4", "value": [1.0, 1.0, 1.0, 1.0] }
//! { "name": "WorldSpaceToClipSpaceMatrix", "usage": "PassReference", "value_type": "Float4_4",
//!   "reference": "@WorldSpaceToClipSpaceMatrix" }
//! ```
//!
//! Scalars may be written without brackets. Enum-typed values use the variant
//! name, texture values an asset name and global property ids a property name.

use crate::error::ToolkitError;
use lumen_core::asset::AssetId;
use lumen_core::format::MaterialPropertyRecord;
use lumen_core::PropertyId;
use lumen_runtime::material::{MaterialProperty, MaterialPropertyValue, ValueType, Usage};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// A material property as declared in a material blueprint source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDefinition {
    /// The property name, hashed into its id.
    pub name: String,
    /// How the property is consumed.
    pub usage: Usage,
    /// The value type.
    pub value_type: ValueType,
    /// The literal value; the zero value of the type when absent.
    #[serde(default)]
    pub value: Option<Value>,
    /// The referenced property name, required for reference usages.
    #[serde(default)]
    pub reference: Option<String>,
    /// Fallback ordering of shader combination properties.
    #[serde(default)]
    pub visual_importance: i32,
    /// Clamp of shader combination properties, zero for none.
    #[serde(default)]
    pub maximum_integer_value: i32,
}

impl PropertyDefinition {
    /// The hashed property id.
    pub fn property_id(&self) -> PropertyId {
        PropertyId::from_name(&self.name)
    }

    /// Builds the typed property.
    pub fn to_property(&self) -> Result<MaterialProperty, ToolkitError> {
        let property_id = self.property_id();
        match (self.usage.is_reference(), &self.reference) {
            (true, Some(reference)) => {
                let mut property = MaterialProperty::reference(
                    property_id,
                    self.usage,
                    self.value_type,
                    PropertyId::from_name(reference),
                )
                .ok_or_else(|| self.invalid("the value type is unknown"))?;
                if let Some(value) = &self.value {
                    property.value = parse_value(&self.name, self.value_type, value)?;
                }
                Ok(property)
            }
            (false, None) => {
                let value = match &self.value {
                    Some(value) => parse_value(&self.name, self.value_type, value)?,
                    None => MaterialPropertyValue::default_for(self.value_type)
                        .ok_or_else(|| self.invalid("the value type is unknown"))?,
                };
                Ok(MaterialProperty::new(property_id, self.usage, value))
            }
            _ => Err(ToolkitError::InvalidReference(self.name.clone())),
        }
    }

    /// Builds the compiled record.
    pub fn to_record(&self) -> Result<MaterialPropertyRecord, ToolkitError> {
        Ok(self
            .to_property()?
            .to_record(self.visual_importance, self.maximum_integer_value))
    }

    fn invalid(&self, reason: &str) -> ToolkitError {
        ToolkitError::InvalidPropertyValue {
            property: self.name.clone(),
            value_type: self.value_type,
            reason: reason.to_string(),
        }
    }
}

/// Parses a JSON value as a value of `value_type`.
pub fn parse_value(
    property: &str,
    value_type: ValueType,
    value: &Value,
) -> Result<MaterialPropertyValue, ToolkitError> {
    let parsed = match value_type {
        ValueType::Unknown => Err("the value type is unknown".to_string()),
        ValueType::Boolean => match value {
            Value::Bool(flag) => Ok(MaterialPropertyValue::Boolean(*flag)),
            other => components::<i32, 1>(other, int).map(|[v]| MaterialPropertyValue::Boolean(v != 0)),
        },
        ValueType::Integer => components::<i32, 1>(value, int).map(|[v]| MaterialPropertyValue::Integer(v)),
        ValueType::Integer2 => components(value, int).map(MaterialPropertyValue::Integer2),
        ValueType::Integer3 => components(value, int).map(MaterialPropertyValue::Integer3),
        ValueType::Integer4 => components(value, int).map(MaterialPropertyValue::Integer4),
        ValueType::Float => components::<f32, 1>(value, float).map(|[v]| MaterialPropertyValue::Float(v)),
        ValueType::Float2 => components(value, float).map(MaterialPropertyValue::Float2),
        ValueType::Float3 => components(value, float).map(MaterialPropertyValue::Float3),
        ValueType::Float4 => components(value, float).map(MaterialPropertyValue::Float4),
        ValueType::Float3_3 => components(value, float).map(MaterialPropertyValue::Float3_3),
        ValueType::Float4_4 => components(value, float).map(MaterialPropertyValue::Float4_4),
        ValueType::FillMode => named(value).map(MaterialPropertyValue::FillMode),
        ValueType::CullMode => named(value).map(MaterialPropertyValue::CullMode),
        ValueType::ConservativeRasterizationMode => {
            named(value).map(MaterialPropertyValue::ConservativeRasterizationMode)
        }
        ValueType::DepthWriteMask => named(value).map(MaterialPropertyValue::DepthWriteMask),
        ValueType::ComparisonFunc => named(value).map(MaterialPropertyValue::ComparisonFunc),
        ValueType::Blend => named(value).map(MaterialPropertyValue::Blend),
        ValueType::BlendOp => named(value).map(MaterialPropertyValue::BlendOp),
        ValueType::FilterMode => named(value).map(MaterialPropertyValue::FilterMode),
        ValueType::TextureAddressMode => named(value).map(MaterialPropertyValue::TextureAddressMode),
        ValueType::TextureAssetId => match value.as_str() {
            Some(name) => {
                return Ok(MaterialPropertyValue::TextureAssetId(AssetId::from_asset_name(name)?))
            }
            None => Err("expected a texture asset name".to_string()),
        },
        ValueType::GlobalMaterialPropertyId => value
            .as_str()
            .map(|name| MaterialPropertyValue::GlobalMaterialPropertyId(PropertyId::from_name(name)))
            .ok_or_else(|| "expected a global material property name".to_string()),
    };
    parsed.map_err(|reason| ToolkitError::InvalidPropertyValue {
        property: property.to_string(),
        value_type,
        reason,
    })
}

fn int(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|v| i32::try_from(v).ok())
}

fn float(value: &Value) -> Option<f32> {
    value.as_f64().map(|v| v as f32)
}

fn components<T: Copy + Default, const N: usize>(
    value: &Value,
    component: fn(&Value) -> Option<T>,
) -> Result<[T; N], String> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        scalar if N == 1 => std::slice::from_ref(scalar),
        other => return Err(format!("expected an array of {N} numbers, found {other}")),
    };
    if items.len() != N {
        return Err(format!("expected {N} components, found {}", items.len()));
    }
    let mut out = [T::default(); N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = component(item).ok_or_else(|| format!("{item} is not a valid component"))?;
    }
    Ok(out)
}

fn named<T: DeserializeOwned>(value: &Value) -> Result<T, String> {
    T::deserialize(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::api::CullMode;
    use serde_json::json;

    fn definition(source: Value) -> PropertyDefinition {
        serde_json::from_value(source).unwrap()
    }

    #[test]
    fn literal_values_follow_the_declared_type() {
        let property = definition(json!({
            "name": "DiffuseColor",
            "usage": "ShaderUniform",
            "value_type": "Float4",
            "value": [1.0, 0.5, 0.25, 1.0]
        }))
        .to_property()
        .unwrap();
        assert_eq!(property.property_id, PropertyId::from_name("DiffuseColor"));
        assert_eq!(property.value, MaterialPropertyValue::Float4([1.0, 0.5, 0.25, 1.0]));

        let cull = parse_value("CullMode", ValueType::CullMode, &json!("Front")).unwrap();
        assert_eq!(cull, MaterialPropertyValue::CullMode(CullMode::Front));

        let switch = parse_value("USE_NORMAL_MAP", ValueType::Boolean, &json!(1)).unwrap();
        assert_eq!(switch, MaterialPropertyValue::Boolean(true));
    }

    #[test]
    fn missing_values_take_the_zero_value() {
        let property = definition(json!({
            "name": "Roughness",
            "usage": "ShaderUniform",
            "value_type": "Float"
        }))
        .to_property()
        .unwrap();
        assert_eq!(property.value, MaterialPropertyValue::Float(0.0));
    }

    #[test]
    fn references_are_required_exactly_for_reference_usages() {
        let property = definition(json!({
            "name": "WorldSpaceToClipSpaceMatrix",
            "usage": "PassReference",
            "value_type": "Float4_4",
            "reference": "@WorldSpaceToClipSpaceMatrix"
        }))
        .to_property()
        .unwrap();
        assert_eq!(
            property.reference_id,
            Some(PropertyId::from_name("@WorldSpaceToClipSpaceMatrix"))
        );

        let missing = definition(json!({
            "name": "WorldSpaceToClipSpaceMatrix",
            "usage": "PassReference",
            "value_type": "Float4_4"
        }));
        assert!(matches!(missing.to_property(), Err(ToolkitError::InvalidReference(_))));
    }

    #[test]
    fn malformed_values_name_the_property() {
        let result = parse_value("DiffuseColor", ValueType::Float3, &json!([1.0, 2.0]));
        assert!(matches!(
            result,
            Err(ToolkitError::InvalidPropertyValue { ref property, .. }) if property == "DiffuseColor"
        ));
        assert!(parse_value("Albedo", ValueType::TextureAssetId, &json!("NotAnAssetName")).is_err());
    }
}
