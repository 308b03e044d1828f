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

//! Turning declared properties into concrete values.

use crate::blueprint::MaterialBlueprintResourceListener;
use crate::error::ResolveError;
use crate::material::{MaterialProperties, MaterialProperty, MaterialPropertyValue, Usage};
use lumen_core::PropertyId;

/// Per-draw values supplied by the drawn object, for example its transform.
pub trait InstancePropertySource {
    /// The value of an instance reference, if the object provides it.
    fn instance_property(&self, reference: PropertyId) -> Option<MaterialPropertyValue>;
}

/// Resolves property values from the sources active at the time of packing.
///
/// Resolution order:
/// 1. [`Usage::InstanceReference`]: the instance source.
/// 2. [`Usage::GlobalReference`]: the global material properties.
/// 3. [`Usage::GlobalReferenceFallback`]: the global material properties, else the stored value.
/// 4. [`Usage::PassReference`]: the pass listener.
/// 5. [`Usage::MaterialReference`]: the properties of the drawn material.
/// 6. Anything else: the stored value.
///
/// A reference nothing provides is an error, never a silent zero.
#[derive(Clone, Copy)]
pub struct PropertyResolver<'a> {
    global: &'a MaterialProperties,
    pass: Option<&'a dyn MaterialBlueprintResourceListener>,
    instance: Option<&'a dyn InstancePropertySource>,
    material: Option<&'a MaterialProperties>,
}

impl<'a> PropertyResolver<'a> {
    /// A resolver knowing the global properties only.
    pub fn new(global: &'a MaterialProperties) -> Self {
        Self {
            global,
            pass: None,
            instance: None,
            material: None,
        }
    }

    /// Adds the pass listener.
    pub fn with_pass(mut self, pass: &'a dyn MaterialBlueprintResourceListener) -> Self {
        self.pass = Some(pass);
        self
    }

    /// Adds the instance source.
    pub fn with_instance(mut self, instance: &'a dyn InstancePropertySource) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Adds the material properties.
    pub fn with_material(mut self, material: &'a MaterialProperties) -> Self {
        self.material = Some(material);
        self
    }

    /// Resolves a property to a value of its declared type.
    pub fn resolve(&self, property: &MaterialProperty) -> Result<MaterialPropertyValue, ResolveError> {
        let reference = property.reference_id.unwrap_or(property.property_id);
        let unresolved = || ResolveError::Unresolved {
            property: property.property_id,
            reference,
            usage: property.usage,
        };
        let value = match property.usage {
            Usage::InstanceReference => self
                .instance
                .and_then(|instance| instance.instance_property(reference))
                .ok_or_else(unresolved)?,
            Usage::GlobalReference => *self.global.value(reference).ok_or_else(unresolved)?,
            Usage::GlobalReferenceFallback => {
                self.global.value(reference).copied().unwrap_or(property.value)
            }
            Usage::PassReference => self
                .pass
                .and_then(|pass| pass.fill_pass_value(reference))
                .ok_or_else(unresolved)?,
            Usage::MaterialReference => *self
                .material
                .and_then(|material| material.value(reference))
                .ok_or_else(unresolved)?,
            _ => property.value,
        };
        if value.value_type() != property.value_type() {
            return Err(ResolveError::TypeMismatch {
                property: property.property_id,
                expected: property.value_type(),
                found: value.value_type(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::ValueType;

    struct Transform;

    impl InstancePropertySource for Transform {
        fn instance_property(&self, reference: PropertyId) -> Option<MaterialPropertyValue> {
            (reference == PropertyId::from_name("@ObjectSpaceToWorldSpaceMatrix"))
                .then_some(MaterialPropertyValue::Float4_4([1.0; 16]))
        }
    }

    fn reference(name: &str, usage: Usage, value_type: ValueType, target: &str) -> MaterialProperty {
        MaterialProperty::reference(
            PropertyId::from_name(name),
            usage,
            value_type,
            PropertyId::from_name(target),
        )
        .unwrap()
    }

    #[test]
    fn instance_references_come_from_the_instance() {
        let global = MaterialProperties::new();
        let property = reference(
            "ObjectSpaceToWorldSpaceMatrix",
            Usage::InstanceReference,
            ValueType::Float4_4,
            "@ObjectSpaceToWorldSpaceMatrix",
        );
        let resolver = PropertyResolver::new(&global);
        assert!(matches!(
            resolver.resolve(&property),
            Err(ResolveError::Unresolved { .. })
        ));
        let transform = Transform;
        assert_eq!(
            resolver.with_instance(&transform).resolve(&property),
            Ok(MaterialPropertyValue::Float4_4([1.0; 16]))
        );
    }

    #[test]
    fn global_references_and_fallbacks() {
        let mut global = MaterialProperties::new();
        let strict = reference("Exposure", Usage::GlobalReference, ValueType::Float, "GlobalExposure");
        let mut lenient = strict;
        lenient.usage = Usage::GlobalReferenceFallback;
        lenient.value = MaterialPropertyValue::Float(1.0);

        let resolver = PropertyResolver::new(&global);
        assert!(resolver.resolve(&strict).is_err());
        assert_eq!(resolver.resolve(&lenient), Ok(MaterialPropertyValue::Float(1.0)));

        global.set(
            PropertyId::from_name("GlobalExposure"),
            Usage::Static,
            MaterialPropertyValue::Float(2.0),
            false,
        );
        let resolver = PropertyResolver::new(&global);
        assert_eq!(resolver.resolve(&strict), Ok(MaterialPropertyValue::Float(2.0)));
        assert_eq!(resolver.resolve(&lenient), Ok(MaterialPropertyValue::Float(2.0)));
    }

    #[test]
    fn resolved_types_are_checked() {
        let mut global = MaterialProperties::new();
        global.set(
            PropertyId::from_name("GlobalExposure"),
            Usage::Static,
            MaterialPropertyValue::Integer(2),
            false,
        );
        let property = reference("Exposure", Usage::GlobalReference, ValueType::Float, "GlobalExposure");
        assert_eq!(
            PropertyResolver::new(&global).resolve(&property),
            Err(ResolveError::TypeMismatch {
                property: PropertyId::from_name("Exposure"),
                expected: ValueType::Float,
                found: ValueType::Integer,
            })
        );
    }

    #[test]
    fn material_references_read_the_material() {
        let global = MaterialProperties::new();
        let mut material = MaterialProperties::new();
        material.set(
            PropertyId::from_name("DiffuseColor"),
            Usage::ShaderUniform,
            MaterialPropertyValue::Float3([1.0, 0.5, 0.25]),
            false,
        );
        let property = reference("Color", Usage::MaterialReference, ValueType::Float3, "DiffuseColor");
        assert_eq!(
            PropertyResolver::new(&global)
                .with_material(&material)
                .resolve(&property),
            Ok(MaterialPropertyValue::Float3([1.0, 0.5, 0.25]))
        );
    }
}
