// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree to YAML text.
//!
//! Hand-rolled so the serializer keeps full control over local tags,
//! flow layout and hex scalars. The output is plain YAML 1.2 that any
//! conformant parser reads back.

use crate::node::{Node, NodeBody};

/// Render a document stream. Each document starts with `---`.
pub fn emit_documents(documents: &[Node]) -> String {
    let mut out = String::new();
    for doc in documents {
        emit_document(&mut out, doc);
    }
    out
}

fn emit_document(out: &mut String, doc: &Node) {
    out.push_str("---");
    if let Some(tag) = &doc.tag {
        out.push_str(" !");
        out.push_str(tag);
    }
    match &doc.body {
        NodeBody::Map(entries) if !entries.is_empty() => {
            out.push('\n');
            for (key, node) in entries {
                write_map_entry(out, key, node, 0);
            }
        }
        NodeBody::Seq { items, flow: false } if !items.is_empty() => {
            out.push('\n');
            for item in items {
                write_seq_item(out, item, 0);
            }
        }
        body => {
            out.push(' ');
            write_flow_body(out, body);
            out.push('\n');
        }
    }
}

fn write_map_entry(out: &mut String, key: &str, node: &Node, indent: usize) {
    push_indent(out, indent);
    write_entry(out, key, node, indent);
}

/// Write `key: value` with the cursor already at the key column.
/// `indent` is the logical indent of the entry itself.
fn write_entry(out: &mut String, key: &str, node: &Node, indent: usize) {
    out.push_str(key);
    out.push(':');
    if let Some(tag) = &node.tag {
        out.push_str(" !");
        out.push_str(tag);
    }
    match &node.body {
        NodeBody::Map(entries) if !entries.is_empty() => {
            out.push('\n');
            for (child_key, child) in entries {
                write_map_entry(out, child_key, child, indent + 1);
            }
        }
        NodeBody::Seq { items, flow: false } if !items.is_empty() => {
            out.push('\n');
            for item in items {
                write_seq_item(out, item, indent + 1);
            }
        }
        body => {
            out.push(' ');
            write_flow_body(out, body);
            out.push('\n');
        }
    }
}

fn write_seq_item(out: &mut String, item: &Node, indent: usize) {
    push_indent(out, indent);
    out.push('-');
    if let Some(tag) = &item.tag {
        out.push_str(" !");
        out.push_str(tag);
    }
    match &item.body {
        NodeBody::Map(entries) if !entries.is_empty() => {
            if item.tag.is_some() {
                // Tag occupies the dash line, entries go below.
                out.push('\n');
                for (key, child) in entries {
                    write_map_entry(out, key, child, indent + 1);
                }
            } else {
                // Compact form: first entry shares the dash line.
                out.push(' ');
                write_entry(out, &entries[0].0, &entries[0].1, indent + 1);
                for (key, child) in &entries[1..] {
                    write_map_entry(out, key, child, indent + 1);
                }
            }
        }
        NodeBody::Seq { items, flow: false } if !items.is_empty() => {
            out.push('\n');
            for child in items {
                write_seq_item(out, child, indent + 1);
            }
        }
        body => {
            out.push(' ');
            write_flow_body(out, body);
            out.push('\n');
        }
    }
}

fn write_flow(out: &mut String, node: &Node) {
    if let Some(tag) = &node.tag {
        out.push('!');
        out.push_str(tag);
        out.push(' ');
    }
    write_flow_body(out, &node.body);
}

fn write_flow_body(out: &mut String, body: &NodeBody) {
    match body {
        NodeBody::Scalar { text, text_only } => push_scalar(out, text, *text_only),
        NodeBody::Null => out.push('~'),
        NodeBody::Seq { items, .. } => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_flow(out, item);
            }
            out.push(']');
        }
        NodeBody::Map(entries) => {
            out.push('{');
            for (i, (key, node)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                write_flow(out, node);
            }
            out.push('}');
        }
    }
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn push_scalar(out: &mut String, text: &str, text_only: bool) {
    if plain_safe(text) && !(text_only && resolves_non_string(text)) {
        out.push_str(text);
    } else {
        push_quoted(out, text);
    }
}

/// Whether scalar text survives unquoted in both block and flow context.
/// Quoting is harmless to typed scalars (the declared type restores the
/// value from the text), so this stays conservative.
fn plain_safe(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if matches!(
        text,
        "~" | "null" | "Null" | "NULL" | "true" | "True" | "TRUE" | "false" | "False" | "FALSE"
    ) {
        return false;
    }
    text.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+' | '/'))
}

/// Whether a parser would resolve this text to something other than a
/// string. Free-form text that trips this must be quoted, or it comes
/// back normalized (`0x64` -> `100`) before any codec sees it.
fn resolves_non_string(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    if body.parse::<f64>().is_ok() {
        return true;
    }
    // Radix integer forms.
    body.len() > 2
        && (body.starts_with("0x")
            || body.starts_with("0X")
            || body.starts_with("0o")
            || body.starts_with("0b"))
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_document_with_nested_block() {
        let doc = Node::map(vec![
            ("Number".to_string(), Node::scalar("50")),
            (
                "Inner".to_string(),
                Node::map(vec![("X".to_string(), Node::scalar("1"))]),
            ),
        ])
        .with_tag("ContainerTest");

        let text = emit_documents(&[doc]);
        assert_eq!(
            text,
            "--- !ContainerTest\nNumber: 50\nInner:\n  X: 1\n"
        );
    }

    #[test]
    fn flow_sequence_with_tagged_items() {
        let doc = Node::map(vec![(
            "Vector".to_string(),
            Node::seq(
                vec![
                    Node::map(vec![("T1".to_string(), Node::scalar("0"))]).with_tag("Child"),
                    Node::null(),
                ],
                true,
            ),
        )]);

        let text = emit_documents(&[doc]);
        assert_eq!(text, "---\nVector: [!Child {T1: 0}, ~]\n");
    }

    #[test]
    fn block_sequence_of_composites() {
        let doc = Node::map(vec![(
            "Map".to_string(),
            Node::seq(
                vec![Node::map(vec![
                    ("Key".to_string(), Node::scalar("13")),
                    ("Value".to_string(), Node::scalar("26")),
                ])],
                false,
            ),
        )]);

        let text = emit_documents(&[doc]);
        assert_eq!(text, "---\nMap:\n  - Key: 13\n    Value: 26\n");
    }

    #[test]
    fn empty_containers_render_inline() {
        let doc = Node::map(vec![
            ("Items".to_string(), Node::seq(Vec::new(), false)),
            ("Ref".to_string(), Node::null()),
        ]);

        let text = emit_documents(&[doc]);
        assert_eq!(text, "---\nItems: []\nRef: ~\n");
    }

    #[test]
    fn risky_scalars_are_quoted() {
        let doc = Node::map(vec![
            ("A".to_string(), Node::scalar("true")),
            ("B".to_string(), Node::scalar("hello world")),
            ("C".to_string(), Node::scalar("")),
        ]);

        let text = emit_documents(&[doc]);
        assert_eq!(text, "---\nA: \"true\"\nB: \"hello world\"\nC: \"\"\n");
    }

    #[test]
    fn number_like_text_is_quoted() {
        let doc = Node::map(vec![
            ("A".to_string(), Node::text("0x64")),
            ("B".to_string(), Node::text("1e5")),
            ("C".to_string(), Node::text("-3.5")),
            ("D".to_string(), Node::text("goblin")),
        ]);

        let text = emit_documents(&[doc]);
        assert_eq!(
            text,
            "---\nA: \"0x64\"\nB: \"1e5\"\nC: \"-3.5\"\nD: goblin\n"
        );
    }

    #[test]
    fn typed_scalars_stay_plain() {
        let doc = Node::map(vec![
            ("Number".to_string(), Node::scalar("50")),
            ("HexNumber".to_string(), Node::scalar("0x64")),
        ]);

        let text = emit_documents(&[doc]);
        assert_eq!(text, "---\nNumber: 50\nHexNumber: 0x64\n");
    }
}
