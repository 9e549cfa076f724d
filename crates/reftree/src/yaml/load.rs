// SPDX-License-Identifier: Apache-2.0 OR MIT

//! YAML text to node tree.
//!
//! Parsing goes through `serde_yaml` so the loader accepts anything a
//! conformant YAML parser does, not only the emitter's own output.
//! Scalars come back as text; typed interpretation happens later against
//! the registry.

use serde::Deserialize;

use crate::node::Node;

/// Parse a multi-document stream into node trees.
pub fn parse_documents(text: &str) -> Result<Vec<Node>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(doc)?;
        documents.push(from_yaml(value));
    }
    Ok(documents)
}

fn from_yaml(value: serde_yaml::Value) -> Node {
    use serde_yaml::Value as Y;
    match value {
        Y::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            from_yaml(tagged.value).with_tag(tag.trim_start_matches('!'))
        }
        Y::Null => Node::null(),
        Y::Bool(b) => Node::scalar(b.to_string()),
        Y::Number(n) => Node::scalar(n.to_string()),
        Y::String(s) => Node::text(s),
        Y::Sequence(items) => Node::seq(items.into_iter().map(from_yaml).collect(), false),
        Y::Mapping(mapping) => Node::map(
            mapping
                .into_iter()
                .map(|(key, value)| (key_text(&key), from_yaml(value)))
                .collect(),
        ),
    }
}

fn key_text(key: &serde_yaml::Value) -> String {
    use serde_yaml::Value as Y;
    match key {
        Y::String(s) => s.clone(),
        Y::Bool(b) => b.to_string(),
        Y::Number(n) => n.to_string(),
        other => {
            log::warn!("Non-scalar mapping key ignored: {:?}", other);
            String::new()
        }
    }
}
