// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry-driven reflective serialization.
//!
//! `reftree` serializes object graphs without compile-time knowledge of
//! their types. A [`TypeRegistry`] holds runtime descriptors: type name,
//! single-inheritance base, ordered fields with container shape and
//! attributes, and scalar codecs at the leaves. The same descriptor walk
//! drives two backends:
//!
//! - a human-readable YAML tree backend ([`YamlSerializer`] /
//!   [`YamlDeserializer`]) tolerant of hand edits and missing fields,
//! - a compact binary backend ([`BinarySerializer`] /
//!   [`BinaryDeserializer`]) with positional, length-implied framing.
//!
//! Polymorphism works through runtime type tags: document roots and
//! pointer values carry the instance's concrete type name on the wire,
//! and the reader resolves it against the declared type, morphing the
//! target into the registered descendant.
//!
//! # Example
//!
//! ```
//! use reftree::{TypeRegistry, Value, YamlDeserializer, YamlSerializer};
//!
//! let mut registry = TypeRegistry::new();
//! registry
//!     .build("Enemy")
//!     .field("Name", "String")
//!     .field("Health", "Int32")
//!     .register()?;
//!
//! let mut enemy = registry.instantiate("Enemy").unwrap();
//! if let Some(obj) = enemy.as_object_mut() {
//!     obj.set("Name", "goblin").set("Health", 30i32);
//! }
//!
//! let mut ser = YamlSerializer::new(&registry);
//! ser.serialize(&enemy, "Enemy")?;
//! let text = ser.to_yaml();
//! assert!(text.starts_with("--- !Enemy\n"));
//!
//! let mut de = YamlDeserializer::from_str(&registry, &text);
//! let loaded = de.deserialize_ptr("Enemy")?;
//! assert_eq!(loaded, enemy);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod builder;
pub mod node;
pub mod registry;
pub mod resolve;
pub mod store;
pub mod value;
pub mod yaml;

pub use binary::{BinaryDeserializer, BinaryError, BinarySerializer};
pub use builder::TypeBuilder;
pub use node::{Node, NodeBody};
pub use registry::{
    Container, FieldAttrs, FieldDescriptor, RegistryError, ScalarCodec, ScalarKind,
    TypeDescriptor, TypeKind, TypeRegistry,
};
pub use resolve::{resolve_concrete, Resolution};
pub use store::{ObjectStore, StoreError};
pub use value::{Object, Value};
pub use yaml::{Issue, YamlDeserializer, YamlError, YamlSerializer};
