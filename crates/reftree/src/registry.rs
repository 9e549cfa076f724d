// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime type registry: descriptors, field attributes, scalar codecs.
//!
//! The registry substitutes for compile-time reflection. Types are
//! registered once at startup and stay immutable for the run; both
//! serialization backends consult the same descriptors for field order,
//! container shape and scalar conversion.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Object, Value};

/// Errors raised while populating a [`TypeRegistry`].
#[derive(Debug)]
pub enum RegistryError {
    DuplicateType(String),
    UnknownBase { ty: String, base: String },
    UnknownFieldType { ty: String, field: String, field_type: String },
    UnknownKeyType { ty: String, field: String, key_type: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateType(name) => write!(f, "Type already registered: {}", name),
            Self::UnknownBase { ty, base } => {
                write!(f, "Base type of {} is not registered: {}", ty, base)
            }
            Self::UnknownFieldType { ty, field, field_type } => {
                write!(f, "Field {}.{} has unregistered type: {}", ty, field, field_type)
            }
            Self::UnknownKeyType { ty, field, key_type } => {
                write!(f, "Map field {}.{} has unregistered key type: {}", ty, field, key_type)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Wire-level shape of a scalar type.
///
/// Drives the fixed-width binary encoding; the tree backend always goes
/// through the textual codec functions instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Text,
    /// Custom codec; round-trips as length-prefixed text on the binary wire.
    Opaque,
}

/// Scalar conversion functions for a leaf type.
///
/// Plain `fn` pointers keep conversion deterministic and side-effect-free;
/// a type carrying a codec is always emitted in scalar form, never
/// traversed field-by-field.
#[derive(Clone, Copy)]
pub struct ScalarCodec {
    pub kind: ScalarKind,
    /// Render a value as scalar text. `None` on a value/type mismatch.
    pub to_text: fn(&Value, &FieldAttrs) -> Option<String>,
    /// Parse scalar text back into a value. `None` on unparseable input.
    pub from_text: fn(&str) -> Option<Value>,
    /// Default-constructed instance of the type.
    pub default: fn() -> Value,
}

impl fmt::Debug for ScalarCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCodec").field("kind", &self.kind).finish()
    }
}

impl PartialEq for ScalarCodec {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && std::ptr::fn_addr_eq(self.to_text, other.to_text)
            && std::ptr::fn_addr_eq(self.from_text, other.from_text)
            && std::ptr::fn_addr_eq(self.default, other.default)
    }
}

/// Field attribute flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldAttrs {
    /// Render integer scalars as hexadecimal literals.
    pub hex: bool,
    /// Request compact (flow) layout for a container in the tree backend.
    pub inline: bool,
    /// Exclude the field from serialization entirely.
    pub transient: bool,
}

impl FieldAttrs {
    pub const NONE: Self = Self { hex: false, inline: false, transient: false };
    pub const HEX: Self = Self { hex: true, inline: false, transient: false };
    pub const INLINE: Self = Self { hex: false, inline: true, transient: false };
    pub const TRANSIENT: Self = Self { hex: false, inline: false, transient: true };
}

/// Container shape of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    /// Plain ordered sequence of the field's declared type.
    Sequence,
    /// Key/value map; entries serialize as `{Key, Value}` composites in
    /// insertion order.
    Map { key_type: String },
}

/// One member of a structured type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name; also the wire key in the tree backend.
    pub name: String,
    /// Declared type of the value (element/value type for containers).
    pub type_name: String,
    /// Polymorphic, nullable reference: serialized with a runtime type tag.
    pub pointer: bool,
    pub container: Option<Container>,
    pub attrs: FieldAttrs,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            pointer: false,
            container: None,
            attrs: FieldAttrs::NONE,
        }
    }

    pub fn pointer(mut self) -> Self {
        self.pointer = true;
        self
    }

    pub fn sequence(mut self) -> Self {
        self.container = Some(Container::Sequence);
        self
    }

    pub fn map(mut self, key_type: impl Into<String>) -> Self {
        self.container = Some(Container::Map { key_type: key_type.into() });
        self
    }

    pub fn attrs(mut self, attrs: FieldAttrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Structural kind of a registered type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Leaf type with a textual codec; scalar form always wins over
    /// structural form.
    Scalar(ScalarCodec),
    /// Structured type with own (non-inherited) fields in declared order.
    Struct(Vec<FieldDescriptor>),
}

/// A registered type: name, optional single-inheritance base, and kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub base: Option<String>,
    pub kind: TypeKind,
}

impl TypeDescriptor {
    pub fn scalar(name: impl Into<String>, codec: ScalarCodec) -> Self {
        Self { name: name.into(), base: None, kind: TypeKind::Scalar(codec) }
    }

    pub fn structured(
        name: impl Into<String>,
        base: Option<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        Self { name: name.into(), base, kind: TypeKind::Struct(fields) }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar(_))
    }

    /// The scalar codec, if this is a leaf type.
    pub fn codec(&self) -> Option<&ScalarCodec> {
        match &self.kind {
            TypeKind::Scalar(c) => Some(c),
            TypeKind::Struct(_) => None,
        }
    }

    /// Own (non-inherited) fields in declared order.
    pub fn own_fields(&self) -> &[FieldDescriptor] {
        match &self.kind {
            TypeKind::Struct(fields) => fields,
            TypeKind::Scalar(_) => &[],
        }
    }
}

/// The runtime catalogue of type descriptors.
///
/// Read-only during any serialize/deserialize call; populate it fully at
/// startup. Each test builds its own instance, there is no process-wide
/// singleton to tear down.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create a registry with no registrations at all.
    pub fn empty() -> Self {
        Self { types: HashMap::new() }
    }

    /// Create a registry pre-populated with the built-in scalar types:
    /// `Bool`, `Int8`..`Int64`, `Uint8`..`Uint64`, `Float32`, `Float64`,
    /// `String`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (name, codec) in builtin_scalars() {
            // Fresh registry, names are distinct by construction.
            let _ = registry.register_scalar(name, codec);
        }
        registry
    }

    /// Register a scalar (leaf) type under the given name.
    pub fn register_scalar(
        &mut self,
        name: impl Into<String>,
        codec: ScalarCodec,
    ) -> Result<(), RegistryError> {
        self.register(TypeDescriptor::scalar(name, codec))
    }

    /// Register a complete descriptor.
    ///
    /// The base type and every non-pointer field type (and map key type)
    /// must already be registered; pointer targets may be registered later,
    /// which also permits self-referential pointer fields.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), RegistryError> {
        if self.types.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateType(descriptor.name));
        }
        if let Some(base) = &descriptor.base {
            if !self.types.contains_key(base) {
                return Err(RegistryError::UnknownBase {
                    ty: descriptor.name,
                    base: base.clone(),
                });
            }
        }
        for field in descriptor.own_fields() {
            if !field.pointer && !self.types.contains_key(&field.type_name) {
                return Err(RegistryError::UnknownFieldType {
                    ty: descriptor.name.clone(),
                    field: field.name.clone(),
                    field_type: field.type_name.clone(),
                });
            }
            if let Some(Container::Map { key_type }) = &field.container {
                if !self.types.contains_key(key_type) {
                    return Err(RegistryError::UnknownKeyType {
                        ty: descriptor.name.clone(),
                        field: field.name.clone(),
                        key_type: key_type.clone(),
                    });
                }
            }
        }
        self.types
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Look up a descriptor by type name.
    pub fn get(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    /// Whether a type name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Ancestor-or-self check: does `name` name `ancestor` or a type
    /// derived from it through the base chain?
    pub fn is_type(&self, name: &str, ancestor: &str) -> bool {
        let mut current = self.get(name);
        while let Some(desc) = current {
            if desc.name == ancestor {
                return true;
            }
            current = desc.base.as_deref().and_then(|b| self.get(b));
        }
        false
    }

    /// All fields of a type in wire order: inherited fields first
    /// (outermost base down), then own fields, each in declared order.
    pub fn ordered_fields<'a>(&'a self, descriptor: &'a TypeDescriptor) -> Vec<&'a FieldDescriptor> {
        let mut chain = Vec::new();
        let mut current = Some(descriptor);
        while let Some(desc) = current {
            chain.push(desc);
            current = desc
                .base
                .as_deref()
                .and_then(|b| self.get(b))
                .map(Arc::as_ref);
        }
        chain
            .iter()
            .rev()
            .flat_map(|desc| desc.own_fields())
            .collect()
    }

    /// Allocate a default-constructed instance of the named type
    /// (the registry's `Factory.New`).
    ///
    /// Scalars get their codec default; structured types get an [`Object`]
    /// holding defaults for every field (incl. inherited): empty containers
    /// and null pointers.
    pub fn instantiate(&self, name: &str) -> Option<Value> {
        let descriptor = self.get(name)?.clone();
        match &descriptor.kind {
            TypeKind::Scalar(codec) => Some((codec.default)()),
            TypeKind::Struct(_) => {
                let mut obj = Object::new(&descriptor.name);
                for field in self.ordered_fields(&descriptor) {
                    obj.set(field.name.clone(), self.default_field_value(field)?);
                }
                Some(Value::Object(obj))
            }
        }
    }

    /// Default value for one field slot.
    pub(crate) fn default_field_value(&self, field: &FieldDescriptor) -> Option<Value> {
        match &field.container {
            Some(Container::Sequence) => Some(Value::Seq(Vec::new())),
            Some(Container::Map { .. }) => Some(Value::Map(Vec::new())),
            None if field.pointer => Some(Value::Null),
            None => self.instantiate(&field.type_name),
        }
    }

    /// Iterate over registered descriptors (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in scalar codecs
// ---------------------------------------------------------------------------

macro_rules! int_codec_fns {
    ($to:ident, $from:ident, $def:ident, $ty:ty, $uty:ty, $as:ident, $variant:ident) => {
        fn $to(v: &Value, attrs: &FieldAttrs) -> Option<String> {
            let n = v.$as()?;
            if attrs.hex {
                Some(format!("{:#X}", n as $uty))
            } else {
                Some(n.to_string())
            }
        }

        fn $from(s: &str) -> Option<Value> {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                return <$uty>::from_str_radix(hex, 16)
                    .ok()
                    .map(|u| Value::$variant(u as $ty));
            }
            s.parse::<$ty>().ok().map(Value::$variant)
        }

        fn $def() -> Value {
            Value::$variant(0)
        }
    };
}

int_codec_fns!(i8_to_text, i8_from_text, i8_default, i8, u8, as_i8, I8);
int_codec_fns!(i16_to_text, i16_from_text, i16_default, i16, u16, as_i16, I16);
int_codec_fns!(i32_to_text, i32_from_text, i32_default, i32, u32, as_i32, I32);
int_codec_fns!(i64_to_text, i64_from_text, i64_default, i64, u64, as_i64, I64);
int_codec_fns!(u8_to_text, u8_from_text, u8_default, u8, u8, as_u8, U8);
int_codec_fns!(u16_to_text, u16_from_text, u16_default, u16, u16, as_u16, U16);
int_codec_fns!(u32_to_text, u32_from_text, u32_default, u32, u32, as_u32, U32);
int_codec_fns!(u64_to_text, u64_from_text, u64_default, u64, u64, as_u64, U64);

macro_rules! float_codec_fns {
    ($to:ident, $from:ident, $def:ident, $ty:ty, $as:ident, $variant:ident) => {
        fn $to(v: &Value, _attrs: &FieldAttrs) -> Option<String> {
            v.$as().map(|n| n.to_string())
        }

        fn $from(s: &str) -> Option<Value> {
            s.trim().parse::<$ty>().ok().map(Value::$variant)
        }

        fn $def() -> Value {
            Value::$variant(0.0)
        }
    };
}

float_codec_fns!(f32_to_text, f32_from_text, f32_default, f32, as_f32, F32);
float_codec_fns!(f64_to_text, f64_from_text, f64_default, f64, as_f64, F64);

fn bool_to_text(v: &Value, _attrs: &FieldAttrs) -> Option<String> {
    v.as_bool().map(|b| b.to_string())
}

fn bool_from_text(s: &str) -> Option<Value> {
    match s.trim() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

fn bool_default() -> Value {
    Value::Bool(false)
}

fn string_to_text(v: &Value, _attrs: &FieldAttrs) -> Option<String> {
    v.as_str().map(str::to_string)
}

fn string_from_text(s: &str) -> Option<Value> {
    Some(Value::String(s.to_string()))
}

fn string_default() -> Value {
    Value::String(String::new())
}

fn builtin_scalars() -> [(&'static str, ScalarCodec); 12] {
    use ScalarKind as K;
    [
        ("Bool", ScalarCodec { kind: K::Bool, to_text: bool_to_text, from_text: bool_from_text, default: bool_default }),
        ("Int8", ScalarCodec { kind: K::I8, to_text: i8_to_text, from_text: i8_from_text, default: i8_default }),
        ("Int16", ScalarCodec { kind: K::I16, to_text: i16_to_text, from_text: i16_from_text, default: i16_default }),
        ("Int32", ScalarCodec { kind: K::I32, to_text: i32_to_text, from_text: i32_from_text, default: i32_default }),
        ("Int64", ScalarCodec { kind: K::I64, to_text: i64_to_text, from_text: i64_from_text, default: i64_default }),
        ("Uint8", ScalarCodec { kind: K::U8, to_text: u8_to_text, from_text: u8_from_text, default: u8_default }),
        ("Uint16", ScalarCodec { kind: K::U16, to_text: u16_to_text, from_text: u16_from_text, default: u16_default }),
        ("Uint32", ScalarCodec { kind: K::U32, to_text: u32_to_text, from_text: u32_from_text, default: u32_default }),
        ("Uint64", ScalarCodec { kind: K::U64, to_text: u64_to_text, from_text: u64_from_text, default: u64_default }),
        ("Float32", ScalarCodec { kind: K::F32, to_text: f32_to_text, from_text: f32_from_text, default: f32_default }),
        ("Float64", ScalarCodec { kind: K::F64, to_text: f64_to_text, from_text: f64_from_text, default: f64_default }),
        ("String", ScalarCodec { kind: K::Text, to_text: string_to_text, from_text: string_from_text, default: string_default }),
    ]
}
