// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry-driven deserializer for the tree backend.

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use crate::node::Node;
use crate::registry::{Container, TypeRegistry};
use crate::resolve::{resolve_concrete, Resolution};
use crate::value::{Object, Value};
use crate::yaml::{load, YamlError};

/// One recoverable problem found while reading a document.
///
/// The path is dotted from the document root (`$`), with `[i]` for
/// container indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Reads object graphs back out of a multi-document YAML stream.
///
/// Every `deserialize_*` call consumes exactly one document, even when it
/// fails, so a bad document never wedges the stream. Local mismatches
/// inside a document (unparseable scalar, wrong shape, bad map entry) are
/// recorded as [`Issue`]s and the affected slot keeps its default.
#[derive(Debug)]
pub struct YamlDeserializer<'r> {
    registry: &'r TypeRegistry,
    documents: VecDeque<Node>,
    issues: Vec<Issue>,
}

impl<'r> YamlDeserializer<'r> {
    /// Parse a stream from text. A malformed stream is logged and yields
    /// an already-ended deserializer, it is not an error here.
    pub fn from_str(registry: &'r TypeRegistry, text: &str) -> Self {
        let documents = match load::parse_documents(text) {
            Ok(docs) => docs.into(),
            Err(err) => {
                log::error!("Failed to parse document stream: {}", err);
                VecDeque::new()
            }
        };
        Self { registry, documents, issues: Vec::new() }
    }

    /// Parse a stream from a file.
    pub fn from_path(registry: &'r TypeRegistry, path: impl AsRef<Path>) -> Result<Self, YamlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            log::error!("Failed to read {}: {}", path.display(), err);
            YamlError::Io(err)
        })?;
        Ok(Self::from_str(registry, &text))
    }

    /// Whether every document has been consumed.
    pub fn is_stream_ended(&self) -> bool {
        self.documents.is_empty()
    }

    /// Take the issues recorded by the most recent `deserialize_*` call.
    pub fn take_issues(&mut self) -> Vec<Issue> {
        std::mem::take(&mut self.issues)
    }

    /// Read the next document into an existing instance.
    ///
    /// The document's root tag may morph `target` into any registered
    /// descendant of `declared`. Fields the document does not mention are
    /// left as they are.
    pub fn deserialize_into(&mut self, declared: &str, target: &mut Value) -> Result<(), YamlError> {
        self.issues.clear();
        let doc = self.documents.pop_front().ok_or(YamlError::StreamEnded)?;
        match resolve_concrete(self.registry, doc.tag.as_deref(), declared) {
            Resolution::Concrete(_) => {
                self.populate(target, &doc, declared, "$");
                Ok(())
            }
            Resolution::Unknown => Err(YamlError::UnknownType(declared.to_string())),
        }
    }

    /// Read the next document into a newly allocated instance.
    ///
    /// The concrete type comes from the root tag, falling back to
    /// `declared` when the tag is absent or unusable.
    pub fn deserialize_ptr(&mut self, declared: &str) -> Result<Value, YamlError> {
        self.issues.clear();
        let doc = self.documents.pop_front().ok_or(YamlError::StreamEnded)?;
        if doc.is_null() {
            return Err(YamlError::EmptyDocument);
        }
        let descriptor = resolve_concrete(self.registry, doc.tag.as_deref(), declared)
            .ok()
            .ok_or_else(|| YamlError::UnknownType(declared.to_string()))?;
        let mut value = self
            .registry
            .instantiate(&descriptor.name)
            .ok_or_else(|| YamlError::UnknownType(descriptor.name.clone()))?;
        self.populate(&mut value, &doc, &descriptor.name, "$");
        Ok(value)
    }

    fn issue(&mut self, path: &str, message: String) {
        log::warn!("{}: {}", path, message);
        self.issues.push(Issue { path: path.to_string(), message });
    }

    /// Read one node into `target`, resolving the node's tag against the
    /// declared type. All failures below this point are recoverable.
    fn populate(&mut self, target: &mut Value, node: &Node, declared: &str, path: &str) {
        let registry = self.registry;
        let Some(descriptor) = resolve_concrete(registry, node.tag.as_deref(), declared).ok()
        else {
            self.issue(path, format!("unknown type {}", declared));
            return;
        };

        if let Some(codec) = descriptor.codec() {
            match node.as_scalar() {
                Some(text) => match (codec.from_text)(text) {
                    Some(value) => *target = value,
                    None => {
                        self.issue(path, format!("cannot parse {:?} as {}", text, descriptor.name))
                    }
                },
                None => self.issue(path, format!("expected a {} scalar", descriptor.name)),
            }
            return;
        }

        if node.as_map().is_none() {
            self.issue(path, format!("expected a mapping for {}", descriptor.name));
            return;
        }

        // Morph to the resolved concrete type when the instance does not
        // match; a matching instance is filled in place so unmentioned
        // fields keep their values.
        if target.as_object().map(Object::type_name) != Some(descriptor.name.as_str()) {
            match registry.instantiate(&descriptor.name) {
                Some(fresh) => *target = fresh,
                None => {
                    self.issue(path, format!("cannot instantiate {}", descriptor.name));
                    return;
                }
            }
        }

        for field in registry.ordered_fields(&descriptor) {
            if field.attrs.transient {
                continue;
            }
            let Some(child) = node.child(&field.name) else {
                continue;
            };
            let field_path = format!("{}.{}", path, field.name);

            // A hand-built instance may be missing slots; default them in
            // before descending.
            if target
                .as_object()
                .map(|obj| !obj.contains(&field.name))
                .unwrap_or(true)
            {
                let Some(default) = registry.default_field_value(field) else {
                    continue;
                };
                let Some(obj) = target.as_object_mut() else {
                    return;
                };
                obj.set(field.name.clone(), default);
            }

            let replacement = match &field.container {
                Some(Container::Sequence) => match child.as_seq() {
                    Some(items) => {
                        let mut out = Vec::with_capacity(items.len());
                        for (i, item) in items.iter().enumerate() {
                            let item_path = format!("{}[{}]", field_path, i);
                            out.push(self.element_value(
                                item,
                                &field.type_name,
                                field.pointer,
                                &item_path,
                            ));
                        }
                        Some(Value::Seq(out))
                    }
                    None => {
                        self.issue(&field_path, "expected a sequence".to_string());
                        None
                    }
                },
                Some(Container::Map { key_type }) => match child.as_seq() {
                    Some(entries) => {
                        let mut out = Vec::with_capacity(entries.len());
                        for (i, entry) in entries.iter().enumerate() {
                            let entry_path = format!("{}[{}]", field_path, i);
                            let (Some(key_node), Some(value_node)) =
                                (entry.child("Key"), entry.child("Value"))
                            else {
                                self.issue(&entry_path, "map entry missing Key or Value".to_string());
                                continue;
                            };
                            let key = self.element_value(
                                key_node,
                                key_type,
                                false,
                                &format!("{}.Key", entry_path),
                            );
                            let value = self.element_value(
                                value_node,
                                &field.type_name,
                                field.pointer,
                                &format!("{}.Value", entry_path),
                            );
                            out.push((key, value));
                        }
                        Some(Value::Map(out))
                    }
                    None => {
                        self.issue(&field_path, "expected a sequence of map entries".to_string());
                        None
                    }
                },
                None if field.pointer => {
                    if child.is_null() {
                        Some(Value::Null)
                    } else {
                        Some(self.element_value(child, &field.type_name, true, &field_path))
                    }
                }
                None => {
                    // Plain field: recurse in place.
                    if let Some(slot) =
                        target.as_object_mut().and_then(|obj| obj.get_mut(&field.name))
                    {
                        self.populate(slot, child, &field.type_name, &field_path);
                    }
                    None
                }
            };

            if let Some(value) = replacement {
                if let Some(obj) = target.as_object_mut() {
                    obj.set(field.name.clone(), value);
                }
            }
        }
    }

    /// Build a fresh value for a container element or pointer target.
    /// Null on anything unresolvable, with an issue recorded.
    fn element_value(
        &mut self,
        node: &Node,
        declared: &str,
        pointer: bool,
        path: &str,
    ) -> Value {
        if pointer && node.is_null() {
            return Value::Null;
        }
        let Some(descriptor) = resolve_concrete(self.registry, node.tag.as_deref(), declared).ok()
        else {
            self.issue(path, format!("unknown type {}", declared));
            return Value::Null;
        };
        let Some(mut value) = self.registry.instantiate(&descriptor.name) else {
            self.issue(path, format!("cannot instantiate {}", descriptor.name));
            return Value::Null;
        };
        self.populate(&mut value, node, &descriptor.name, path);
        value
    }
}
