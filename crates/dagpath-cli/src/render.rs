//! Text and JSON rendering of decoded nodes.
//!
//! Links render as `{"/": "<address>"}`; byte strings as hex under
//! `"bytes"`, so binary content survives the round through JSON.

use dagpath_types::{Link, Node, Value};
use serde_json::{Map, Value as Json, json};

pub fn node_to_json(node: &Node) -> Json {
    match node {
        Node::Dag(dag) => json!({
            "links": dag.links.iter().map(|l| {
                let mut entry = link_to_json(&l.link);
                if let Json::Object(fields) = &mut entry {
                    fields.insert("name".into(), Json::String(l.name.clone()));
                }
                entry
            }).collect::<Vec<_>>(),
            "data": dag.data.as_deref().map(hex::encode),
        }),
        Node::Value(value) => value_to_json(value),
        Node::Bytes(bytes) => json!({ "bytes": hex::encode(bytes) }),
        Node::Directory(dir) => {
            let entries: Map<String, Json> = dir
                .entries
                .iter()
                .map(|(name, link)| (name.clone(), link_to_json(link)))
                .collect();
            json!({ "entries": entries })
        }
    }
}

pub fn link_to_json(link: &Link) -> Json {
    let mut fields = Map::new();
    fields.insert("/".into(), Json::String(link.address.to_string()));
    if let Some(size) = link.size {
        fields.insert("size".into(), json!(size));
    }
    if let Some(target) = link.target {
        fields.insert("target".into(), Json::String(target.name().into()));
    }
    Json::Object(fields)
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => json!(i),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => json!({ "bytes": hex::encode(b) }),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Link(link) => link_to_json(link),
    }
}

/// One-screen human summary of a node.
pub fn node_summary(node: &Node) -> String {
    match node {
        Node::Dag(dag) => {
            let mut out = format!(
                "dag-node: {} link{}, {} data bytes",
                dag.links.len(),
                if dag.links.len() == 1 { "" } else { "s" },
                dag.data.as_ref().map_or(0, Vec::len)
            );
            for l in &dag.links {
                out.push_str(&format!("\n  {:?} -> {}", l.name, l.link.address));
            }
            out
        }
        Node::Value(value) => format!(
            "{}: {}",
            value.kind_name(),
            value_to_json(value)
        ),
        Node::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => format!("bytes ({} bytes): {text}", bytes.len()),
            Err(_) => format!("bytes ({} bytes): {}", bytes.len(), hex::encode(bytes)),
        },
        Node::Directory(dir) => {
            let mut out = format!("directory: {} entries", dir.len());
            for (name, link) in &dir.entries {
                out.push_str(&format!("\n  {name} -> {}", link.address));
            }
            out
        }
    }
}
