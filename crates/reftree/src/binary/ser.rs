// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry-driven binary encoder.

use std::path::Path;
use std::sync::Arc;

use crate::binary::BinaryError;
use crate::registry::{
    Container, FieldAttrs, FieldDescriptor, ScalarCodec, ScalarKind, TypeDescriptor, TypeRegistry,
};
use crate::value::Value;

/// Encodes object graphs into a flat binary stream.
///
/// Each [`serialize`](Self::serialize) call appends one document: a
/// runtime type tag followed by the payload. Documents abut with no
/// separator; the payload length is implied by the registrations.
#[derive(Debug)]
pub struct BinarySerializer<'r> {
    registry: &'r TypeRegistry,
    buffer: Vec<u8>,
}

impl<'r> BinarySerializer<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, buffer: Vec::new() }
    }

    /// Append one document for `value`, declared as type `declared`.
    ///
    /// On error the buffer is rolled back to the previous document
    /// boundary.
    pub fn serialize(&mut self, value: &Value, declared: &str) -> Result<&mut Self, BinaryError> {
        let start = self.buffer.len();
        match self.write_document(value, declared) {
            Ok(()) => Ok(self),
            Err(err) => {
                self.buffer.truncate(start);
                Err(err)
            }
        }
    }

    /// The bytes built so far.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the serializer, returning the stream.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Drop everything built so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Write the stream to a file.
    pub fn output(&self, path: impl AsRef<Path>) -> Result<(), BinaryError> {
        let path = path.as_ref();
        std::fs::write(path, &self.buffer).map_err(|err| {
            log::error!("Failed to write {}: {}", path.display(), err);
            BinaryError::Io(err)
        })
    }

    fn descriptor(&self, name: &str) -> Option<&'r Arc<TypeDescriptor>> {
        self.registry.get(name)
    }

    fn write_document(&mut self, value: &Value, declared: &str) -> Result<(), BinaryError> {
        let descriptor = self.resolve_runtime(value, declared)?;
        self.write_str(&descriptor.name);
        self.encode(value, descriptor, &FieldAttrs::NONE)
    }

    /// Descriptor for the value's runtime type, checked against the
    /// declared type. Objects carry their own type name; everything else
    /// uses the declaration.
    fn resolve_runtime(
        &self,
        value: &Value,
        declared: &str,
    ) -> Result<&'r Arc<TypeDescriptor>, BinaryError> {
        let runtime = match value.as_object() {
            Some(obj) => obj.type_name(),
            None => declared,
        };
        let descriptor = self
            .descriptor(runtime)
            .ok_or_else(|| BinaryError::UnknownType(runtime.to_string()))?;
        if runtime != declared
            && self.registry.contains(declared)
            && !self.registry.is_type(runtime, declared)
        {
            return Err(BinaryError::NotASubtype {
                runtime: runtime.to_string(),
                declared: declared.to_string(),
            });
        }
        Ok(descriptor)
    }

    fn encode(
        &mut self,
        value: &Value,
        descriptor: &'r TypeDescriptor,
        attrs: &FieldAttrs,
    ) -> Result<(), BinaryError> {
        if let Some(codec) = descriptor.codec() {
            return self.encode_scalar(value, codec, attrs, &descriptor.name);
        }
        let obj = value.as_object().ok_or_else(|| BinaryError::ValueMismatch {
            type_name: descriptor.name.clone(),
            found: value.kind_name(),
        })?;
        let registry = self.registry;
        for field in registry.ordered_fields(descriptor) {
            if field.attrs.transient {
                continue;
            }
            match obj.get(&field.name) {
                Some(slot) => self.encode_field(slot, field)?,
                None => {
                    // Every field has a wire slot; an absent field
                    // encodes as its default.
                    let default = registry
                        .default_field_value(field)
                        .ok_or_else(|| BinaryError::UnknownType(field.type_name.clone()))?;
                    self.encode_field(&default, field)?;
                }
            }
        }
        Ok(())
    }

    fn encode_field(&mut self, value: &Value, field: &FieldDescriptor) -> Result<(), BinaryError> {
        match &field.container {
            Some(Container::Sequence) => {
                let items = value.as_seq().ok_or_else(|| BinaryError::ValueMismatch {
                    type_name: field.type_name.clone(),
                    found: value.kind_name(),
                })?;
                self.write_u32(items.len() as u32);
                for item in items {
                    self.encode_element(item, &field.type_name, field.pointer, &field.attrs)?;
                }
                Ok(())
            }
            Some(Container::Map { key_type }) => {
                let entries = value.as_map().ok_or_else(|| BinaryError::ValueMismatch {
                    type_name: field.type_name.clone(),
                    found: value.kind_name(),
                })?;
                self.write_u32(entries.len() as u32);
                for (key, val) in entries {
                    self.encode_element(key, key_type, false, &field.attrs)?;
                    self.encode_element(val, &field.type_name, field.pointer, &field.attrs)?;
                }
                Ok(())
            }
            None => self.encode_element(value, &field.type_name, field.pointer, &field.attrs),
        }
    }

    fn encode_element(
        &mut self,
        value: &Value,
        declared: &str,
        pointer: bool,
        attrs: &FieldAttrs,
    ) -> Result<(), BinaryError> {
        if pointer {
            if value.is_null() {
                self.buffer.push(0);
                return Ok(());
            }
            self.buffer.push(1);
            let descriptor = self.resolve_runtime(value, declared)?;
            self.write_str(&descriptor.name);
            return self.encode(value, descriptor, attrs);
        }
        // A plain slot has no tag position, so a derived instance would
        // come back sliced to the declared fields. Refuse it.
        if let Some(runtime) = value.as_object().map(|obj| obj.type_name()) {
            if runtime != declared {
                return Err(BinaryError::TagRequired {
                    runtime: runtime.to_string(),
                    declared: declared.to_string(),
                });
            }
        }
        let descriptor = self
            .descriptor(declared)
            .ok_or_else(|| BinaryError::UnknownType(declared.to_string()))?;
        self.encode(value, descriptor, attrs)
    }

    fn encode_scalar(
        &mut self,
        value: &Value,
        codec: &ScalarCodec,
        attrs: &FieldAttrs,
        type_name: &str,
    ) -> Result<(), BinaryError> {
        let mismatch = || BinaryError::ValueMismatch {
            type_name: type_name.to_string(),
            found: value.kind_name(),
        };
        match codec.kind {
            ScalarKind::Bool => self.buffer.push(value.as_bool().ok_or_else(mismatch)? as u8),
            ScalarKind::I8 => self.buffer.push(value.as_i8().ok_or_else(mismatch)? as u8),
            ScalarKind::I16 => self
                .buffer
                .extend_from_slice(&value.as_i16().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::I32 => self
                .buffer
                .extend_from_slice(&value.as_i32().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::I64 => self
                .buffer
                .extend_from_slice(&value.as_i64().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::U8 => self.buffer.push(value.as_u8().ok_or_else(mismatch)?),
            ScalarKind::U16 => self
                .buffer
                .extend_from_slice(&value.as_u16().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::U32 => self
                .buffer
                .extend_from_slice(&value.as_u32().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::U64 => self
                .buffer
                .extend_from_slice(&value.as_u64().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::F32 => self
                .buffer
                .extend_from_slice(&value.as_f32().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::F64 => self
                .buffer
                .extend_from_slice(&value.as_f64().ok_or_else(mismatch)?.to_le_bytes()),
            ScalarKind::Text | ScalarKind::Opaque => {
                let text = (codec.to_text)(value, attrs).ok_or_else(mismatch)?;
                self.write_str(&text);
            }
        }
        Ok(())
    }

    fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_str(&mut self, text: &str) {
        self.write_u32(text.len() as u32);
        self.buffer.extend_from_slice(text.as_bytes());
    }
}
