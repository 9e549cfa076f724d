// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary backend.
//!
//! Same descriptor-driven walk as the tree backend, flattened onto a
//! byte stream: no field names, no alignment, little-endian scalars.
//! Strings and type tags are `u32` length plus UTF-8 bytes. A pointer
//! slot is one presence byte, then tag and payload when set. The wire
//! is only self-describing at polymorphic boundaries, so reader and
//! writer must share the same registrations.

mod de;
mod ser;

pub use de::BinaryDeserializer;
pub use ser::BinarySerializer;

use std::fmt;

/// Errors surfaced by the binary backend.
///
/// Unlike the tree backend there is no recoverable middle ground: without
/// field names a bad byte poisons everything after it, so any framing
/// error ends the stream.
#[derive(Debug)]
pub enum BinaryError {
    /// A type name with no registry entry.
    UnknownType(String),
    /// The value's runtime type does not derive from the declared type.
    NotASubtype { runtime: String, declared: String },
    /// A derived instance in a slot with no tag position on the wire.
    TagRequired { runtime: String, declared: String },
    /// A value that does not match its type's expected shape.
    ValueMismatch { type_name: String, found: &'static str },
    /// The buffer ended before the current item.
    Truncated { need: usize, have: usize },
    /// A tag or string slot holding invalid UTF-8.
    InvalidText(std::str::Utf8Error),
    /// A read past the last document in the stream.
    StreamEnded,
    Io(std::io::Error),
}

impl fmt::Display for BinaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "Unknown type: {}", name),
            Self::NotASubtype { runtime, declared } => {
                write!(f, "{} is not derived from {}", runtime, declared)
            }
            Self::TagRequired { runtime, declared } => {
                write!(
                    f,
                    "{} in a plain {} slot needs a tag, which this slot cannot carry",
                    runtime, declared
                )
            }
            Self::ValueMismatch { type_name, found } => {
                write!(f, "Expected a {} value, found {}", type_name, found)
            }
            Self::Truncated { need, have } => {
                write!(f, "Buffer truncated: need {} bytes, have {}", need, have)
            }
            Self::InvalidText(err) => write!(f, "Invalid UTF-8 in string slot: {}", err),
            Self::StreamEnded => write!(f, "Document stream is ended"),
            Self::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for BinaryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidText(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BinaryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
