// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named object store with file-backed save and load.
//!
//! A thin ownership layer over the serialization machinery: objects live
//! here under unique names, and whole objects move between the store and
//! YAML files. Iteration follows insertion order so saved streams are
//! deterministic.

use std::fmt;
use std::path::Path;

use crate::registry::TypeRegistry;
use crate::value::{Object, Value};
use crate::yaml::{YamlDeserializer, YamlError, YamlSerializer};

/// Errors surfaced by the [`ObjectStore`].
#[derive(Debug)]
pub enum StoreError {
    /// An object with this name already exists.
    Duplicate(String),
    /// No object with this name exists.
    Missing(String),
    /// The stored value is not a structured object.
    NotAnObject(String),
    /// A loaded object has no usable name.
    Unnamed,
    Yaml(YamlError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate(name) => write!(f, "Object name collision: {}", name),
            Self::Missing(name) => write!(f, "No object named {}", name),
            Self::NotAnObject(name) => write!(f, "Object {} is not structured", name),
            Self::Unnamed => write!(f, "Loaded object has no name"),
            Self::Yaml(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Yaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<YamlError> for StoreError {
    fn from(err: YamlError) -> Self {
        Self::Yaml(err)
    }
}

/// Owns named object instances.
///
/// Names are unique; adding under a taken name is refused and the
/// original object is kept.
#[derive(Debug, Default)]
pub struct ObjectStore {
    entries: Vec<(String, Value)>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object under a unique name. Returns `false` (and drops
    /// nothing from the store) when the name is taken.
    pub fn add(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if self.contains(&name) {
            log::error!("Object name collision: {}", name);
            return false;
        }
        self.entries.push((name, value));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Remove an object, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Save one named object to its own file.
    pub fn save_object(
        &self,
        registry: &TypeRegistry,
        name: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), StoreError> {
        let value = self
            .get(name)
            .ok_or_else(|| StoreError::Missing(name.to_string()))?;
        let declared = value
            .as_object()
            .map(Object::type_name)
            .ok_or_else(|| StoreError::NotAnObject(name.to_string()))?;
        let mut ser = YamlSerializer::new(registry);
        ser.serialize(value, declared)?;
        ser.output(path)?;
        Ok(())
    }

    /// Save every object, in insertion order, into one stream.
    pub fn save_all(&self, registry: &TypeRegistry, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let mut ser = YamlSerializer::new(registry);
        for (name, value) in self.iter() {
            let declared = value
                .as_object()
                .map(Object::type_name)
                .ok_or_else(|| StoreError::NotAnObject(name.to_string()))?;
            ser.serialize(value, declared)?;
        }
        ser.output(path)?;
        Ok(())
    }

    /// Load one object from a file and take ownership of it.
    ///
    /// With `name: None` the object names itself through its `Name`
    /// field; an unnamed or colliding object is dropped. Returns the name
    /// the object was stored under.
    pub fn load_object(
        &mut self,
        registry: &TypeRegistry,
        path: impl AsRef<Path>,
        declared: &str,
        name: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut de = YamlDeserializer::from_path(registry, path)?;
        self.adopt(&mut de, declared, name)
    }

    /// Load every document from a file, skipping the ones that fail.
    /// Returns the names stored, in stream order.
    pub fn load_all(
        &mut self,
        registry: &TypeRegistry,
        path: impl AsRef<Path>,
        declared: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut de = YamlDeserializer::from_path(registry, path)?;
        let mut names = Vec::new();
        while !de.is_stream_ended() {
            match self.adopt(&mut de, declared, None) {
                Ok(name) => names.push(name),
                Err(err) => log::warn!("Skipping object: {}", err),
            }
        }
        Ok(names)
    }

    /// Read the next document from an open stream into the store.
    pub fn deserialize_object(
        &mut self,
        de: &mut YamlDeserializer<'_>,
        declared: &str,
    ) -> Result<String, StoreError> {
        self.adopt(de, declared, None)
    }

    fn adopt(
        &mut self,
        de: &mut YamlDeserializer<'_>,
        declared: &str,
        name: Option<&str>,
    ) -> Result<String, StoreError> {
        let value = de.deserialize_ptr(declared)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => value
                .as_object()
                .and_then(|obj| obj.get("Name"))
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .ok_or(StoreError::Unnamed)?,
        };
        if !self.add(name.clone(), value) {
            return Err(StoreError::Duplicate(name));
        }
        Ok(name)
    }
}
