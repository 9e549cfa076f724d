// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry-driven binary decoder.

use std::path::Path;
use std::sync::Arc;

use crate::binary::BinaryError;
use crate::registry::{Container, FieldDescriptor, ScalarCodec, ScalarKind, TypeDescriptor, TypeRegistry};
use crate::value::Value;

/// Decodes object graphs back out of a flat binary stream.
///
/// The cursor only moves forward. A framing error (truncation, unknown
/// tag, bad UTF-8) ends the stream, since the position of the next
/// document can no longer be determined.
#[derive(Debug)]
pub struct BinaryDeserializer<'r> {
    registry: &'r TypeRegistry,
    buffer: Vec<u8>,
    offset: usize,
}

impl<'r> BinaryDeserializer<'r> {
    pub fn from_bytes(registry: &'r TypeRegistry, bytes: impl Into<Vec<u8>>) -> Self {
        Self { registry, buffer: bytes.into(), offset: 0 }
    }

    pub fn from_path(registry: &'r TypeRegistry, path: impl AsRef<Path>) -> Result<Self, BinaryError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| {
            log::error!("Failed to read {}: {}", path.display(), err);
            BinaryError::Io(err)
        })?;
        Ok(Self::from_bytes(registry, bytes))
    }

    /// Whether every document has been consumed (or the stream was ended
    /// by a framing error).
    pub fn is_stream_ended(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    /// Read the next document into an existing instance.
    pub fn deserialize_into(&mut self, declared: &str, target: &mut Value) -> Result<(), BinaryError> {
        let value = self.guarded(declared)?;
        *target = value;
        Ok(())
    }

    /// Read the next document into a newly allocated instance.
    pub fn deserialize_ptr(&mut self, declared: &str) -> Result<Value, BinaryError> {
        self.guarded(declared)
    }

    fn guarded(&mut self, declared: &str) -> Result<Value, BinaryError> {
        let result = self.decode_document(declared);
        if matches!(
            result,
            Err(BinaryError::Truncated { .. })
                | Err(BinaryError::UnknownType(_))
                | Err(BinaryError::InvalidText(_))
        ) {
            self.offset = self.buffer.len();
        }
        result
    }

    fn descriptor(&self, name: &str) -> Option<&'r Arc<TypeDescriptor>> {
        self.registry.get(name)
    }

    fn decode_document(&mut self, declared: &str) -> Result<Value, BinaryError> {
        if self.is_stream_ended() {
            return Err(BinaryError::StreamEnded);
        }
        let tag = self.read_str()?;
        let descriptor = self
            .descriptor(&tag)
            .ok_or(BinaryError::UnknownType(tag))?;
        let value = self.decode_value(descriptor)?;
        // The payload is consumed either way; an incompatible document
        // leaves the cursor at the next document boundary.
        if !self.registry.is_type(&descriptor.name, declared) {
            return Err(BinaryError::NotASubtype {
                runtime: descriptor.name.clone(),
                declared: declared.to_string(),
            });
        }
        Ok(value)
    }

    fn decode_value(&mut self, descriptor: &'r TypeDescriptor) -> Result<Value, BinaryError> {
        if let Some(codec) = descriptor.codec() {
            return self.decode_scalar(codec, &descriptor.name);
        }
        let registry = self.registry;
        let mut value = registry
            .instantiate(&descriptor.name)
            .ok_or_else(|| BinaryError::UnknownType(descriptor.name.clone()))?;
        for field in registry.ordered_fields(descriptor) {
            if field.attrs.transient {
                continue;
            }
            let slot = self.decode_field(field)?;
            if let Some(obj) = value.as_object_mut() {
                obj.set(field.name.clone(), slot);
            }
        }
        Ok(value)
    }

    fn decode_field(&mut self, field: &FieldDescriptor) -> Result<Value, BinaryError> {
        match &field.container {
            Some(Container::Sequence) => {
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.decode_element(&field.type_name, field.pointer)?);
                }
                Ok(Value::Seq(items))
            }
            Some(Container::Map { key_type }) => {
                let count = self.read_count()?;
                let mut entries = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    let key = self.decode_element(key_type, false)?;
                    let value = self.decode_element(&field.type_name, field.pointer)?;
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            }
            None => self.decode_element(&field.type_name, field.pointer),
        }
    }

    fn decode_element(&mut self, declared: &str, pointer: bool) -> Result<Value, BinaryError> {
        if pointer {
            if self.read_u8()? == 0 {
                return Ok(Value::Null);
            }
            let tag = self.read_str()?;
            let descriptor = self
                .descriptor(&tag)
                .ok_or_else(|| BinaryError::UnknownType(tag.clone()))?;
            if self.registry.contains(declared) && !self.registry.is_type(&tag, declared) {
                return Err(BinaryError::NotASubtype {
                    runtime: tag,
                    declared: declared.to_string(),
                });
            }
            return self.decode_value(descriptor);
        }
        let descriptor = self
            .descriptor(declared)
            .ok_or_else(|| BinaryError::UnknownType(declared.to_string()))?;
        self.decode_value(descriptor)
    }

    fn decode_scalar(&mut self, codec: &ScalarCodec, type_name: &str) -> Result<Value, BinaryError> {
        Ok(match codec.kind {
            ScalarKind::Bool => Value::Bool(self.read_u8()? != 0),
            ScalarKind::I8 => Value::I8(self.read_u8()? as i8),
            ScalarKind::I16 => Value::I16(i16::from_le_bytes(self.read_array()?)),
            ScalarKind::I32 => Value::I32(i32::from_le_bytes(self.read_array()?)),
            ScalarKind::I64 => Value::I64(i64::from_le_bytes(self.read_array()?)),
            ScalarKind::U8 => Value::U8(self.read_u8()?),
            ScalarKind::U16 => Value::U16(u16::from_le_bytes(self.read_array()?)),
            ScalarKind::U32 => Value::U32(u32::from_le_bytes(self.read_array()?)),
            ScalarKind::U64 => Value::U64(u64::from_le_bytes(self.read_array()?)),
            ScalarKind::F32 => Value::F32(f32::from_le_bytes(self.read_array()?)),
            ScalarKind::F64 => Value::F64(f64::from_le_bytes(self.read_array()?)),
            ScalarKind::Text | ScalarKind::Opaque => {
                let text = self.read_str()?;
                (codec.from_text)(&text).ok_or_else(|| BinaryError::ValueMismatch {
                    type_name: type_name.to_string(),
                    found: "text",
                })?
            }
        })
    }

    fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BinaryError> {
        if self.remaining() < N {
            return Err(BinaryError::Truncated { need: N, have: self.remaining() });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, BinaryError> {
        self.read_array::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Result<u32, BinaryError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Container count. Elements can be zero-width (an empty struct), so
    /// the count is not checked against the remaining bytes; allocation
    /// is capped at the call sites and a corrupt count runs out of buffer
    /// on the first element that needs bytes.
    fn read_count(&mut self) -> Result<usize, BinaryError> {
        Ok(self.read_u32()? as usize)
    }

    fn read_str(&mut self) -> Result<String, BinaryError> {
        let len = self.read_u32()? as usize;
        if self.remaining() < len {
            return Err(BinaryError::Truncated { need: len, have: self.remaining() });
        }
        let bytes = &self.buffer[self.offset..self.offset + len];
        let text = std::str::from_utf8(bytes)
            .map_err(BinaryError::InvalidText)?
            .to_string();
        self.offset += len;
        Ok(text)
    }
}
