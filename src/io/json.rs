//! JSON graph and membership readers.
//!
//! Two graph shapes are accepted: a bare array of `{source, target,
//! weight?}` links, or an object `{nodes, links}` where nodes are ids or
//! `{id, size?}` objects. Ids may be JSON strings or numbers; numbers are
//! normalized to their decimal text.

use serde_json::Value;

use crate::error::{ClusterError, Result};
use crate::evaluate::MembershipLabel;
use crate::input::{InputGraph, InputLink, InputNode};

pub fn parse_json_graph(text: &str) -> Result<InputGraph> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ClusterError::Input(format!("malformed JSON: {e}")))?;
    match value {
        Value::Array(items) => {
            let mut graph = InputGraph::default();
            for item in &items {
                graph.links.push(link_from_value(item)?);
            }
            Ok(graph)
        }
        Value::Object(object) => {
            let mut graph = InputGraph::default();
            if let Some(nodes) = object.get("nodes") {
                let nodes = nodes
                    .as_array()
                    .ok_or_else(|| ClusterError::Input("`nodes` must be an array".into()))?;
                for node in nodes {
                    graph.nodes.push(node_from_value(node)?);
                }
            }
            if let Some(links) = object.get("links") {
                let links = links
                    .as_array()
                    .ok_or_else(|| ClusterError::Input("`links` must be an array".into()))?;
                for link in links {
                    graph.links.push(link_from_value(link)?);
                }
            }
            Ok(graph)
        }
        _ => Err(ClusterError::Input(
            "expected a JSON array of links or a {nodes, links} object".into(),
        )),
    }
}

/// Parses a `{nodeId: communityId}` object; community ids may be integers
/// or strings.
pub fn parse_membership(
    text: &str,
) -> Result<std::collections::BTreeMap<String, MembershipLabel>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ClusterError::Input(format!("malformed membership JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| ClusterError::Input("membership must be a JSON object".into()))?;
    let mut membership = std::collections::BTreeMap::new();
    for (id, label) in object {
        let label = match label {
            Value::Number(n) => MembershipLabel::Number(n.as_i64().ok_or_else(|| {
                ClusterError::Input(format!("community id for `{id}` must be an integer"))
            })?),
            Value::String(s) => MembershipLabel::Text(s.clone()),
            _ => {
                return Err(ClusterError::Input(format!(
                    "community id for `{id}` must be a number or string"
                )))
            }
        };
        membership.insert(id.clone(), label);
    }
    Ok(membership)
}

fn id_from_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ClusterError::Input(format!(
            "node id must be a string or number, got {value}"
        ))),
    }
}

fn node_from_value(value: &Value) -> Result<InputNode> {
    match value {
        Value::Object(object) => {
            let id = object
                .get("id")
                .ok_or_else(|| ClusterError::Input("node object missing `id`".into()))?;
            Ok(InputNode {
                id: id_from_value(id)?,
                size: number_field(object, "size")?,
            })
        }
        other => Ok(InputNode {
            id: id_from_value(other)?,
            size: None,
        }),
    }
}

fn link_from_value(value: &Value) -> Result<InputLink> {
    let object = value
        .as_object()
        .ok_or_else(|| ClusterError::Input(format!("link must be an object, got {value}")))?;
    let source = object
        .get("source")
        .ok_or_else(|| ClusterError::Input("link missing `source`".into()))?;
    let target = object
        .get("target")
        .ok_or_else(|| ClusterError::Input("link missing `target`".into()))?;
    Ok(InputLink {
        source: id_from_value(source)?,
        target: id_from_value(target)?,
        weight: number_field(object, "weight")?,
    })
}

fn number_field(
    object: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<f64>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| ClusterError::Input(format!("`{key}` must be a number, got {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_link_array_with_numeric_ids() {
        let graph = parse_json_graph(r#"[{"source": 0, "target": 1, "weight": 2.5}]"#).unwrap();
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].source, "0");
        assert_eq!(graph.links[0].weight, Some(2.5));
        assert_eq!(graph.node_ids(), vec!["0", "1"]);
    }

    #[test]
    fn parses_nodes_links_object() {
        let graph = parse_json_graph(
            r#"{"nodes": ["a", {"id": "b", "size": 3}], "links": [{"source": "a", "target": "b"}]}"#,
        )
        .unwrap();
        assert_eq!(graph.nodes[1].size, Some(3.0));
        assert_eq!(graph.links[0].weight, None);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_json_graph("not json").is_err());
        assert!(parse_json_graph("42").is_err());
        assert!(parse_json_graph(r#"[{"source": "a"}]"#).is_err());
        assert!(parse_json_graph(r#"[{"source": "a", "target": "b", "weight": "x"}]"#).is_err());
    }

    #[test]
    fn parses_membership_labels() {
        let membership = parse_membership(r#"{"a": 0, "b": "blue"}"#).unwrap();
        assert_eq!(membership["a"], MembershipLabel::Number(0));
        assert_eq!(membership["b"], MembershipLabel::Text("blue".into()));
        assert!(parse_membership(r#"{"a": 1.5}"#).is_err());
        assert!(parse_membership("[]").is_err());
    }
}
