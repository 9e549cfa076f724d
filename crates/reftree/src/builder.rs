// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fluent registration API for structured types.

use crate::registry::{
    FieldAttrs, FieldDescriptor, RegistryError, TypeDescriptor, TypeRegistry,
};

impl TypeRegistry {
    /// Start registering a structured type under the given name.
    ///
    /// Finish the chain with [`TypeBuilder::register`].
    pub fn build(&mut self, name: impl Into<String>) -> TypeBuilder<'_> {
        TypeBuilder {
            registry: self,
            name: name.into(),
            base: None,
            fields: Vec::new(),
        }
    }
}

/// Builder for one structured [`TypeDescriptor`].
///
/// # Example
///
/// ```
/// use reftree::TypeRegistry;
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .build("BaseClassTest")
///     .field("T1", "Int32")
///     .field("T2", "Int32")
///     .register()
///     .unwrap();
/// registry
///     .build("ChildClassTest")
///     .base("BaseClassTest")
///     .field("T3", "Int32")
///     .field("T4", "Int32")
///     .register()
///     .unwrap();
///
/// assert!(registry.is_type("ChildClassTest", "BaseClassTest"));
/// ```
#[derive(Debug)]
pub struct TypeBuilder<'r> {
    registry: &'r mut TypeRegistry,
    name: String,
    base: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl TypeBuilder<'_> {
    /// Set the single-inheritance base type.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add a plain field.
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor::new(name, type_name));
        self
    }

    /// Add a plain field with attributes.
    pub fn field_attr(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        attrs: FieldAttrs,
    ) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, type_name).attrs(attrs));
        self
    }

    /// Add a polymorphic, nullable pointer field.
    pub fn pointer_field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, type_name).pointer());
        self
    }

    /// Add a sequence field of the given element type.
    pub fn sequence_field(mut self, name: impl Into<String>, element: impl Into<String>) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, element).sequence());
        self
    }

    /// Add a sequence field whose elements are polymorphic pointers.
    pub fn pointer_sequence_field(
        mut self,
        name: impl Into<String>,
        element: impl Into<String>,
    ) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, element).pointer().sequence());
        self
    }

    /// Add a map field keyed by `key_type` with values of `value_type`.
    pub fn map_field(
        mut self,
        name: impl Into<String>,
        key_type: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, value_type).map(key_type));
        self
    }

    /// Add a map field whose values are polymorphic pointers.
    pub fn pointer_map_field(
        mut self,
        name: impl Into<String>,
        key_type: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, value_type).pointer().map(key_type));
        self
    }

    /// Add a fully specified field descriptor. Escape hatch for
    /// combinations the convenience methods do not cover (e.g. an inline
    /// pointer sequence).
    pub fn field_desc(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Apply attributes to the most recently added field.
    pub fn with_attrs(mut self, attrs: FieldAttrs) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.attrs = attrs;
        }
        self
    }

    /// Register the assembled descriptor.
    pub fn register(self) -> Result<(), RegistryError> {
        self.registry
            .register(TypeDescriptor::structured(self.name, self.base, self.fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Container;
    use crate::value::Value;

    #[test]
    fn builds_inherited_type() {
        let mut registry = TypeRegistry::new();
        registry
            .build("Base")
            .field("T1", "Int32")
            .field("T2", "Int32")
            .register()
            .expect("register Base");
        registry
            .build("Child")
            .base("Base")
            .field("T3", "Int32")
            .register()
            .expect("register Child");

        let child = registry.get("Child").expect("descriptor").clone();
        assert_eq!(child.base.as_deref(), Some("Base"));
        let names: Vec<_> = registry
            .ordered_fields(&child)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn builds_container_fields() {
        let mut registry = TypeRegistry::new();
        registry
            .build("Base")
            .field("T1", "Int32")
            .register()
            .expect("register Base");
        registry
            .build("Holder")
            .field("Number", "Int32")
            .field_attr("HexNumber", "Int32", FieldAttrs::HEX)
            .pointer_sequence_field("Vector", "Base")
            .with_attrs(FieldAttrs::INLINE)
            .pointer_map_field("Map", "Int8", "Base")
            .register()
            .expect("register Holder");

        let holder = registry.get("Holder").expect("descriptor");
        let vector = holder
            .own_fields()
            .iter()
            .find(|f| f.name == "Vector")
            .expect("Vector field");
        assert!(vector.pointer);
        assert!(vector.attrs.inline);
        assert_eq!(vector.container, Some(Container::Sequence));

        let map = holder
            .own_fields()
            .iter()
            .find(|f| f.name == "Map")
            .expect("Map field");
        assert_eq!(
            map.container,
            Some(Container::Map { key_type: "Int8".to_string() })
        );
    }

    #[test]
    fn transient_field_kept_out_of_wire_order_only() {
        let mut registry = TypeRegistry::new();
        registry
            .build("WithCache")
            .field("Kept", "Int32")
            .field_attr("Cache", "Int32", FieldAttrs::TRANSIENT)
            .register()
            .expect("register");

        // The descriptor keeps the field; the backends skip it.
        let desc = registry.get("WithCache").expect("descriptor");
        assert_eq!(desc.own_fields().len(), 2);
        assert!(desc.own_fields()[1].attrs.transient);

        // Defaults are still materialized for transient fields.
        let value = registry.instantiate("WithCache").expect("instance");
        let obj = value.as_object().expect("object");
        assert_eq!(obj.get("Cache").and_then(Value::as_i32), Some(0));
    }
}
