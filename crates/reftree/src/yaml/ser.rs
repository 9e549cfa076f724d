// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry-driven serializer for the tree backend.

use std::path::Path;

use crate::node::Node;
use crate::registry::{Container, FieldAttrs, FieldDescriptor, ScalarKind, TypeRegistry};
use crate::value::Value;
use crate::yaml::{emit, YamlError};

/// Serializes object graphs into a multi-document YAML stream.
///
/// Each [`serialize`](Self::serialize) call appends one document. The
/// document root always carries a `!TypeName` tag with the value's
/// runtime type; inside a document only pointer values are tagged.
#[derive(Debug)]
pub struct YamlSerializer<'r> {
    registry: &'r TypeRegistry,
    documents: Vec<Node>,
}

impl<'r> YamlSerializer<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, documents: Vec::new() }
    }

    /// Append one document for `value`, declared as type `declared`.
    ///
    /// On error nothing is appended and the stream built so far is kept.
    pub fn serialize(&mut self, value: &Value, declared: &str) -> Result<&mut Self, YamlError> {
        let node = self.node_for(value, declared, true, &FieldAttrs::NONE)?;
        self.documents.push(node);
        Ok(self)
    }

    /// The documents built so far.
    pub fn documents(&self) -> &[Node] {
        &self.documents
    }

    /// Drop all documents built so far.
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Render the stream as YAML text.
    pub fn to_yaml(&self) -> String {
        emit::emit_documents(&self.documents)
    }

    /// Write the stream to a file.
    pub fn output(&self, path: impl AsRef<Path>) -> Result<(), YamlError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_yaml()).map_err(|err| {
            log::error!("Failed to write {}: {}", path.display(), err);
            YamlError::Io(err)
        })
    }

    fn node_for(
        &self,
        value: &Value,
        declared: &str,
        tagged: bool,
        attrs: &FieldAttrs,
    ) -> Result<Node, YamlError> {
        if value.is_null() {
            return Ok(Node::null());
        }
        // Objects carry their runtime type; scalars are whatever the
        // field declares.
        let runtime = match value.as_object() {
            Some(obj) => obj.type_name(),
            None => declared,
        };
        let descriptor = self
            .registry
            .get(runtime)
            .ok_or_else(|| YamlError::UnknownType(runtime.to_string()))?
            .clone();
        if runtime != declared
            && self.registry.contains(declared)
            && !self.registry.is_type(runtime, declared)
        {
            return Err(YamlError::NotASubtype {
                runtime: runtime.to_string(),
                declared: declared.to_string(),
            });
        }
        // A derived instance in a plain slot still needs its tag, or the
        // reader would rebuild it as the declared type.
        let tagged = tagged || runtime != declared;

        if let Some(codec) = descriptor.codec() {
            let text = (codec.to_text)(value, attrs).ok_or_else(|| YamlError::ValueMismatch {
                type_name: descriptor.name.clone(),
                found: value.kind_name(),
            })?;
            let node = match codec.kind {
                // Free-form text must come back as text, not as whatever
                // the parser resolves it to.
                ScalarKind::Text | ScalarKind::Opaque => Node::text(text),
                _ => Node::scalar(text),
            };
            return Ok(if tagged { node.with_tag(&descriptor.name) } else { node });
        }

        let obj = value.as_object().ok_or_else(|| YamlError::ValueMismatch {
            type_name: descriptor.name.clone(),
            found: value.kind_name(),
        })?;
        let mut entries = Vec::new();
        for field in self.registry.ordered_fields(&descriptor) {
            if field.attrs.transient {
                continue;
            }
            let Some(slot) = obj.get(&field.name) else {
                log::debug!("{}.{} absent on instance, skipped", descriptor.name, field.name);
                continue;
            };
            entries.push((field.name.clone(), self.field_node(slot, field)?));
        }
        let node = Node::map(entries);
        Ok(if tagged { node.with_tag(&descriptor.name) } else { node })
    }

    fn field_node(&self, value: &Value, field: &FieldDescriptor) -> Result<Node, YamlError> {
        match &field.container {
            Some(Container::Sequence) => {
                let items = value.as_seq().ok_or_else(|| YamlError::ValueMismatch {
                    type_name: field.type_name.clone(),
                    found: value.kind_name(),
                })?;
                let nodes = items
                    .iter()
                    .map(|item| self.node_for(item, &field.type_name, field.pointer, &field.attrs))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node::seq(nodes, field.attrs.inline))
            }
            Some(Container::Map { key_type }) => {
                let entries = value.as_map().ok_or_else(|| YamlError::ValueMismatch {
                    type_name: field.type_name.clone(),
                    found: value.kind_name(),
                })?;
                let mut nodes = Vec::with_capacity(entries.len());
                for (key, val) in entries {
                    nodes.push(Node::map(vec![
                        ("Key".to_string(), self.node_for(key, key_type, false, &field.attrs)?),
                        (
                            "Value".to_string(),
                            self.node_for(val, &field.type_name, field.pointer, &field.attrs)?,
                        ),
                    ]));
                }
                Ok(Node::seq(nodes, field.attrs.inline))
            }
            None => self.node_for(value, &field.type_name, field.pointer, &field.attrs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldDescriptor;
    use crate::value::Object;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .build("BaseClassTest")
            .field("T1", "Int32")
            .field("T2", "Int32")
            .register()
            .expect("register BaseClassTest");
        registry
            .build("ChildClassTest")
            .base("BaseClassTest")
            .field("T3", "Int32")
            .field("T4", "Int32")
            .register()
            .expect("register ChildClassTest");
        registry
            .build("ContainerTest")
            .field("Number", "Int32")
            .field_attr("HexNumber", "Int32", FieldAttrs::HEX)
            .field_desc(
                FieldDescriptor::new("Vector", "BaseClassTest")
                    .pointer()
                    .sequence()
                    .attrs(FieldAttrs::INLINE),
            )
            .pointer_map_field("Map", "Int8", "BaseClassTest")
            .register()
            .expect("register ContainerTest");
        registry
    }

    #[test]
    fn root_document_is_tagged() {
        let registry = registry();
        let value = registry.instantiate("ChildClassTest").expect("instance");

        let mut ser = YamlSerializer::new(&registry);
        ser.serialize(&value, "BaseClassTest").expect("serialize");
        let text = ser.to_yaml();
        assert!(text.starts_with("--- !ChildClassTest\n"), "{}", text);
        assert!(text.contains("T1: 0\n"));
        assert!(text.contains("T4: 0\n"));
    }

    #[test]
    fn hex_field_renders_hexadecimal() {
        let registry = registry();
        let mut value = registry.instantiate("ContainerTest").expect("instance");
        if let Some(obj) = value.as_object_mut() {
            obj.set("Number", 50i32).set("HexNumber", 100i32);
        }

        let mut ser = YamlSerializer::new(&registry);
        ser.serialize(&value, "ContainerTest").expect("serialize");
        let text = ser.to_yaml();
        assert!(text.contains("Number: 50\n"), "{}", text);
        assert!(text.contains("HexNumber: 0x64\n"), "{}", text);
    }

    #[test]
    fn inline_pointer_sequence_uses_flow_with_tags() {
        let registry = registry();
        let mut child = Object::new("ChildClassTest");
        child.set("T1", 1i32).set("T2", 2i32).set("T3", 3i32).set("T4", 4i32);
        let mut value = registry.instantiate("ContainerTest").expect("instance");
        if let Some(obj) = value.as_object_mut() {
            obj.set("Vector", Value::Seq(vec![Value::Object(child), Value::Null]));
        }

        let mut ser = YamlSerializer::new(&registry);
        ser.serialize(&value, "ContainerTest").expect("serialize");
        let text = ser.to_yaml();
        assert!(
            text.contains("Vector: [!ChildClassTest {T1: 1, T2: 2, T3: 3, T4: 4}, ~]\n"),
            "{}",
            text
        );
    }

    #[test]
    fn map_field_emits_key_value_composites() {
        let registry = registry();
        let mut base = Object::new("BaseClassTest");
        base.set("T1", 26i32).set("T2", 0i32);
        let mut value = registry.instantiate("ContainerTest").expect("instance");
        if let Some(obj) = value.as_object_mut() {
            obj.set("Map", Value::Map(vec![(Value::I8(13), Value::Object(base))]));
        }

        let mut ser = YamlSerializer::new(&registry);
        ser.serialize(&value, "ContainerTest").expect("serialize");
        let text = ser.to_yaml();
        assert!(text.contains("Map:\n  - Key: 13\n"), "{}", text);
        assert!(text.contains("Value: !BaseClassTest\n"), "{}", text);
    }

    #[test]
    fn transient_fields_are_skipped() {
        let mut registry = TypeRegistry::new();
        registry
            .build("WithCache")
            .field("Kept", "Int32")
            .field_attr("Cache", "Int32", FieldAttrs::TRANSIENT)
            .register()
            .expect("register");
        let value = registry.instantiate("WithCache").expect("instance");

        let mut ser = YamlSerializer::new(&registry);
        ser.serialize(&value, "WithCache").expect("serialize");
        let text = ser.to_yaml();
        assert!(text.contains("Kept: 0\n"));
        assert!(!text.contains("Cache"));
    }

    #[test]
    fn derived_value_in_a_plain_slot_is_tagged() {
        let mut registry = registry();
        registry
            .build("Holder")
            .field("Inner", "BaseClassTest")
            .register()
            .expect("register Holder");
        let mut inner = Object::new("ChildClassTest");
        inner.set("T1", 1i32).set("T2", 2i32).set("T3", 3i32).set("T4", 4i32);
        let mut value = registry.instantiate("Holder").expect("instance");
        if let Some(obj) = value.as_object_mut() {
            obj.set("Inner", Value::Object(inner));
        }

        let mut ser = YamlSerializer::new(&registry);
        ser.serialize(&value, "Holder").expect("serialize");
        let text = ser.to_yaml();
        assert!(text.contains("Inner: !ChildClassTest\n"), "{}", text);
        assert!(text.contains("T3: 3\n"), "{}", text);
    }

    #[test]
    fn number_like_string_values_stay_quoted() {
        let mut registry = TypeRegistry::new();
        registry
            .build("Labelled")
            .field("Label", "String")
            .register()
            .expect("register Labelled");
        let mut value = registry.instantiate("Labelled").expect("instance");
        if let Some(obj) = value.as_object_mut() {
            obj.set("Label", "0x64");
        }

        let mut ser = YamlSerializer::new(&registry);
        ser.serialize(&value, "Labelled").expect("serialize");
        let text = ser.to_yaml();
        assert!(text.contains("Label: \"0x64\"\n"), "{}", text);
    }

    #[test]
    fn unregistered_runtime_type_is_an_error() {
        let registry = registry();
        let value = Value::Object(Object::new("Ghost"));
        let mut ser = YamlSerializer::new(&registry);
        let err = ser.serialize(&value, "BaseClassTest").expect_err("unknown type");
        assert!(matches!(err, YamlError::UnknownType(_)));
        assert!(ser.documents().is_empty());
    }
}
