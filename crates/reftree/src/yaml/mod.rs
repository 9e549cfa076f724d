// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable tree backend.
//!
//! Serializes registered object graphs into a multi-document YAML stream
//! and back. Runtime type tags are emitted as local `!TypeName` tags on
//! document roots and pointer values; everything else is carried by
//! position and field name, so hand-edited files with missing fields
//! still load.

mod de;
mod emit;
mod load;
mod ser;

pub use de::{Issue, YamlDeserializer};
pub use load::parse_documents;
pub use ser::YamlSerializer;

use std::fmt;

/// Errors surfaced by the tree backend.
///
/// Local schema mismatches inside a document are not errors; they are
/// recorded as [`Issue`]s on the deserializer and the affected field keeps
/// its default.
#[derive(Debug)]
pub enum YamlError {
    /// A type name with no registry entry where one is required.
    UnknownType(String),
    /// The value's runtime type does not derive from the declared type.
    NotASubtype { runtime: String, declared: String },
    /// A value that does not match its type's expected shape.
    ValueMismatch { type_name: String, found: &'static str },
    /// A read past the last document in the stream.
    StreamEnded,
    /// A null document where an instance was required.
    EmptyDocument,
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl fmt::Display for YamlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "Unknown type: {}", name),
            Self::NotASubtype { runtime, declared } => {
                write!(f, "{} is not derived from {}", runtime, declared)
            }
            Self::ValueMismatch { type_name, found } => {
                write!(f, "Expected a {} value, found {}", type_name, found)
            }
            Self::StreamEnded => write!(f, "Document stream is ended"),
            Self::EmptyDocument => write!(f, "Document is empty"),
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for YamlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for YamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml::Error> for YamlError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err)
    }
}
