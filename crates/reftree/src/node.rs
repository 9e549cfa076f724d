// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend-neutral document tree.
//!
//! The tree backend serializes into these nodes and parses back out of
//! them; the emitter and loader in `yaml` are the only code that touches
//! concrete YAML syntax. Scalars are untyped text here, the registry's
//! codecs give them meaning.

/// One node in a document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Runtime type tag, rendered as a local `!Tag` in the tree backend.
    pub tag: Option<String>,
    pub body: NodeBody,
}

/// Structural content of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    /// Scalar text, conversion deferred to the scalar codecs.
    /// `text_only` marks free-form string content that must survive as a
    /// string: the emitter quotes it whenever a parser would otherwise
    /// resolve it to a number, bool or null.
    Scalar { text: String, text_only: bool },
    /// Ordered items; `flow` requests compact single-line layout.
    Seq { items: Vec<Node>, flow: bool },
    /// Named entries in emission order.
    Map(Vec<(String, Node)>),
    /// Explicit null (an unset pointer).
    Null,
}

impl Node {
    /// Scalar backed by a typed codec; the declared type restores its
    /// meaning on load.
    pub fn scalar(text: impl Into<String>) -> Self {
        Self { tag: None, body: NodeBody::Scalar { text: text.into(), text_only: false } }
    }

    /// Free-form string scalar.
    pub fn text(text: impl Into<String>) -> Self {
        Self { tag: None, body: NodeBody::Scalar { text: text.into(), text_only: true } }
    }

    pub fn seq(items: Vec<Node>, flow: bool) -> Self {
        Self { tag: None, body: NodeBody::Seq { items, flow } }
    }

    pub fn map(entries: Vec<(String, Node)>) -> Self {
        Self { tag: None, body: NodeBody::Map(entries) }
    }

    pub fn null() -> Self {
        Self { tag: None, body: NodeBody::Null }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.body, NodeBody::Null)
    }

    /// Scalar text, if this node is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match &self.body {
            NodeBody::Scalar { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Sequence items, if this node is a sequence.
    pub fn as_seq(&self) -> Option<&[Node]> {
        match &self.body {
            NodeBody::Seq { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Map entries, if this node is a mapping.
    pub fn as_map(&self) -> Option<&[(String, Node)]> {
        match &self.body {
            NodeBody::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a map entry by key.
    pub fn child(&self, key: &str) -> Option<&Node> {
        self.as_map()?
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, node)| node)
    }
}
