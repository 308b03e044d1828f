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

//! Material sources.
//!
//! ```json
//! {
//!     "parent": "Example/Material/Default/Stone",
//!     "techniques": { "Forward": "Example/MaterialBlueprint/Mesh/Forward" },
//!     "properties": { "USE_NORMAL_MAP": true, "DiffuseColor": [0.5, 0.5, 0.5, 1.0] }
//! }
//! ```
//!
//! Property values carry no type; the usage and value type come from the
//! declaration in one of the material's blueprints, including those inherited
//! from the parent.

use crate::error::ToolkitError;
use crate::property::{parse_value, PropertyDefinition};
use lumen_core::asset::AssetId;
use lumen_core::format::{MaterialFile, MaterialTechniqueRecord};
use lumen_core::MaterialTechniqueId;
use lumen_runtime::material::MaterialProperty;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A material source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialSource {
    /// Parent material asset name.
    #[serde(default)]
    pub parent: Option<String>,
    /// Technique name to material blueprint asset name.
    #[serde(default)]
    pub techniques: BTreeMap<String, String>,
    /// Property name to value.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl MaterialSource {
    /// Parses a JSON source.
    pub fn parse(source: &str) -> Result<Self, ToolkitError> {
        serde_json::from_str(source).map_err(|source| ToolkitError::Json {
            kind: "material",
            source,
        })
    }

    /// The parent material, if any.
    pub fn parent_asset_id(&self) -> Result<Option<AssetId>, ToolkitError> {
        self.parent
            .as_deref()
            .map(AssetId::from_asset_name)
            .transpose()
            .map_err(ToolkitError::from)
    }

    /// Blueprint assets of the techniques declared by this material.
    pub fn blueprint_asset_ids(&self) -> Result<Vec<AssetId>, ToolkitError> {
        self.techniques
            .values()
            .map(|name| AssetId::from_asset_name(name).map_err(ToolkitError::from))
            .collect()
    }

    /// Builds the compiled file, typing each value through `declaration`.
    pub fn to_file<'a>(
        &self,
        declaration: impl Fn(&str) -> Option<&'a PropertyDefinition>,
    ) -> Result<MaterialFile, ToolkitError> {
        let techniques = self
            .techniques
            .iter()
            .map(|(technique, blueprint)| {
                Ok(MaterialTechniqueRecord {
                    material_technique_id: MaterialTechniqueId::from_name(technique).value(),
                    material_blueprint_asset_id: AssetId::from_asset_name(blueprint)?.value(),
                })
            })
            .collect::<Result<_, ToolkitError>>()?;

        let properties = self
            .properties
            .iter()
            .map(|(name, value)| {
                let definition =
                    declaration(name).ok_or_else(|| ToolkitError::UnknownMaterialProperty {
                        property: name.clone(),
                    })?;
                if definition.usage.is_reference() {
                    return Err(ToolkitError::ReferenceOverride(name.clone()));
                }
                let property = MaterialProperty::new(
                    definition.property_id(),
                    definition.usage,
                    parse_value(name, definition.value_type, value)?,
                );
                Ok(property.to_record(definition.visual_importance, definition.maximum_integer_value))
            })
            .collect::<Result<_, ToolkitError>>()?;

        Ok(MaterialFile {
            parent_material_asset_id: self.parent_asset_id()?.map_or(0, AssetId::value),
            techniques,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::PropertyId;
    use lumen_runtime::material::{MaterialPropertyValue, Usage, ValueType};

    fn declarations() -> Vec<PropertyDefinition> {
        serde_json::from_str(
            r#"[
                { "name": "USE_NORMAL_MAP", "usage": "ShaderCombination", "value_type": "Boolean" },
                { "name": "Exposure", "usage": "GlobalReference", "value_type": "Float",
                  "reference": "GlobalExposure" }
            ]"#,
        )
        .unwrap()
    }

    fn lookup<'a>(
        declarations: &'a [PropertyDefinition],
    ) -> impl Fn(&str) -> Option<&'a PropertyDefinition> + 'a {
        move |name| declarations.iter().find(|definition| definition.name == name)
    }

    #[test]
    fn values_are_typed_by_the_blueprint_declaration() {
        let declarations = declarations();
        let source = MaterialSource::parse(
            r#"{
                "parent": "Example/Material/Default/Base",
                "techniques": { "Forward": "Example/MaterialBlueprint/Mesh/Forward" },
                "properties": { "USE_NORMAL_MAP": true }
            }"#,
        )
        .unwrap();
        let file = source.to_file(lookup(&declarations)).unwrap();
        assert_eq!(
            file.parent_material_asset_id,
            AssetId::from_name("Example/Material/Default/Base").value()
        );
        assert_eq!(
            file.techniques[0].material_technique_id,
            MaterialTechniqueId::from_name("Forward").value()
        );
        let property = MaterialProperty::from_record(&file.properties[0]).unwrap();
        assert_eq!(property.property_id, PropertyId::from_name("USE_NORMAL_MAP"));
        assert_eq!(property.usage, Usage::ShaderCombination);
        assert_eq!(property.value, MaterialPropertyValue::Boolean(true));
        assert_eq!(property.value_type(), ValueType::Boolean);
    }

    #[test]
    fn undeclared_and_reference_properties_are_rejected() {
        let declarations = declarations();
        let unknown = MaterialSource::parse(r#"{ "properties": { "Metallic": 1.0 } }"#).unwrap();
        assert!(matches!(
            unknown.to_file(lookup(&declarations)),
            Err(ToolkitError::UnknownMaterialProperty { .. })
        ));

        let reference = MaterialSource::parse(r#"{ "properties": { "Exposure": 2.0 } }"#).unwrap();
        assert!(matches!(
            reference.to_file(lookup(&declarations)),
            Err(ToolkitError::ReferenceOverride(_))
        ));
    }
}
