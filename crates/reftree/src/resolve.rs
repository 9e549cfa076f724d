// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime type resolution at polymorphic boundaries.

use std::sync::Arc;

use crate::registry::{TypeDescriptor, TypeRegistry};

/// Outcome of resolving a wire tag against a declared type.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A usable concrete descriptor was found.
    Concrete(Arc<TypeDescriptor>),
    /// Neither the tag nor the declared type names a registered type.
    Unknown,
}

impl Resolution {
    /// The resolved descriptor, if any.
    pub fn ok(self) -> Option<Arc<TypeDescriptor>> {
        match self {
            Self::Concrete(desc) => Some(desc),
            Self::Unknown => None,
        }
    }
}

/// Pick the concrete type for one polymorphic slot.
///
/// Applies at every boundary where a runtime tag may appear: document
/// roots and pointer fields. The tag wins when it names a registered type
/// that derives from the declared type; it also wins when the declared
/// type itself is unregistered, since the tag is then the only usable
/// type information. In every other case the declared type is used, so an
/// unknown or incompatible tag falls back instead of failing.
pub fn resolve_concrete(
    registry: &TypeRegistry,
    tag: Option<&str>,
    declared: &str,
) -> Resolution {
    if let Some(tag) = tag {
        if let Some(desc) = registry.get(tag) {
            if registry.is_type(tag, declared) || !registry.contains(declared) {
                return Resolution::Concrete(desc.clone());
            }
            log::debug!(
                "Tag {} does not derive from {}, using declared type",
                tag,
                declared
            );
        } else {
            log::debug!("Unknown type tag {}, using declared type {}", tag, declared);
        }
    }
    match registry.get(declared) {
        Some(desc) => Resolution::Concrete(desc.clone()),
        None => Resolution::Unknown,
    }
}
