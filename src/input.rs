//! Input graph model: string-identified nodes and weighted links, plus the
//! multilayer aggregation that flattens several layers into one dense edge
//! list ready for the [`crate::network::Network`] adapter.

use std::collections::{HashMap, HashSet};

use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Reads an effective weight off a link.
pub type LinkWeightFn = fn(&InputLink) -> f64;
/// Reads an effective size off a node.
pub type NodeSizeFn = fn(&InputNode) -> f64;

pub(crate) fn default_link_weight(link: &InputLink) -> f64 {
    link.weight.unwrap_or(1.0)
}

pub(crate) fn default_node_size(node: &InputNode) -> f64 {
    node.size.unwrap_or(1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLink {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// A graph as supplied by callers: nodes are optional (link endpoints
/// declare nodes implicitly), links carry optional weights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputGraph {
    #[serde(default)]
    pub nodes: Vec<InputNode>,
    #[serde(default)]
    pub links: Vec<InputLink>,
}

impl InputGraph {
    pub fn add_node(&mut self, id: &str, size: f64) {
        self.nodes.push(InputNode {
            id: id.to_string(),
            size: Some(size),
        });
    }

    pub fn add_link(&mut self, source: &str, target: &str, weight: f64) {
        self.links.push(InputLink {
            source: source.to_string(),
            target: target.to_string(),
            weight: Some(weight),
        });
    }

    pub fn from_links(links: &[(&str, &str)]) -> Self {
        let mut graph = Self::default();
        for &(a, b) in links {
            graph.links.push(InputLink {
                source: a.to_string(),
                target: b.to_string(),
                weight: None,
            });
        }
        graph
    }

    pub fn from_weighted_links(links: &[(&str, &str, f64)]) -> Self {
        let mut graph = Self::default();
        for &(a, b, w) in links {
            graph.add_link(a, b, w);
        }
        graph
    }

    /// Converts a petgraph graph: node weights become sizes, edge weights
    /// become link weights, ids are the decimal node indices.
    pub fn from_petgraph<Ty: petgraph::EdgeType>(graph: &petgraph::Graph<f64, f64, Ty>) -> Self {
        let mut out = Self::default();
        for index in graph.node_indices() {
            out.nodes.push(InputNode {
                id: index.index().to_string(),
                size: Some(graph[index]),
            });
        }
        for edge in graph.edge_references() {
            out.links.push(InputLink {
                source: edge.source().index().to_string(),
                target: edge.target().index().to_string(),
                weight: Some(*edge.weight()),
            });
        }
        out
    }

    /// Node ids in declaration order: the `nodes` list first, then link
    /// endpoints not declared there, in first-seen order.
    pub fn node_ids(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ids = Vec::new();
        for node in &self.nodes {
            if seen.insert(&node.id) {
                ids.push(node.id.clone());
            }
        }
        for link in &self.links {
            for id in [&link.source, &link.target] {
                if seen.insert(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }
}

/// One layer of a multilayer input.
#[derive(Clone, Copy)]
pub struct Layer<'a> {
    pub graph: &'a InputGraph,
    /// Multiplier applied to every link weight of this layer.
    pub weight: f64,
    pub link_weight: Option<LinkWeightFn>,
    pub node_size: Option<NodeSizeFn>,
}

impl<'a> Layer<'a> {
    pub fn new(graph: &'a InputGraph) -> Self {
        Self {
            graph,
            weight: 1.0,
            link_weight: None,
            node_size: None,
        }
    }

    pub fn weighted(graph: &'a InputGraph, weight: f64) -> Self {
        Self {
            weight,
            ..Self::new(graph)
        }
    }
}

/// Dense-indexed flattening of one or more layers.
pub(crate) struct BaseGraph {
    pub names: Vec<String>,
    pub index_of: HashMap<String, usize>,
    pub sizes: Vec<f64>,
    pub edges: Vec<(usize, usize, f64)>,
}

/// Indexes node ids densely (caller-supplied order, else the first layer's
/// declaration order), verifies all layers share the node set, and sums
/// per-layer weighted links. Exact-zero aggregate edges are omitted.
pub(crate) fn index_layers(
    layers: &[Layer<'_>],
    node_order: Option<&[String]>,
    fallback_link_weight: Option<LinkWeightFn>,
    fallback_node_size: Option<NodeSizeFn>,
) -> Result<BaseGraph> {
    if layers.is_empty() {
        return Err(ClusterError::Input("at least one layer is required".into()));
    }
    let first = &layers[0];

    let names: Vec<String> = match node_order {
        Some(ids) => ids.to_vec(),
        None => first.graph.node_ids(),
    };
    let mut index_of = HashMap::with_capacity(names.len());
    for (i, id) in names.iter().enumerate() {
        if index_of.insert(id.clone(), i).is_some() {
            return Err(ClusterError::Input(format!("duplicate node id `{id}`")));
        }
    }

    for (layer_no, layer) in layers.iter().enumerate() {
        let ids = layer.graph.node_ids();
        for id in &ids {
            if !index_of.contains_key(id) {
                return Err(ClusterError::Input(format!(
                    "layer {layer_no} has node `{id}` absent from the shared node order"
                )));
            }
        }
        if ids.len() != names.len() {
            return Err(ClusterError::Input(format!(
                "layer {layer_no} covers {} of {} nodes",
                ids.len(),
                names.len()
            )));
        }
    }

    let node_size = first.node_size.or(fallback_node_size).unwrap_or(default_node_size);
    let declared: HashMap<&str, &InputNode> = first
        .graph
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect();
    let sizes: Vec<f64> = names
        .iter()
        .map(|id| match declared.get(id.as_str()) {
            Some(node) => node_size(node),
            None => node_size(&InputNode {
                id: id.clone(),
                size: None,
            }),
        })
        .collect();

    let mut aggregated: std::collections::BTreeMap<(usize, usize), f64> =
        std::collections::BTreeMap::new();
    for layer in layers {
        let link_weight = layer
            .link_weight
            .or(fallback_link_weight)
            .unwrap_or(default_link_weight);
        for link in &layer.graph.links {
            let source = index_of[&link.source];
            let target = index_of[&link.target];
            *aggregated.entry((source, target)).or_insert(0.0) += layer.weight * link_weight(link);
        }
    }
    let edges: Vec<(usize, usize, f64)> = aggregated
        .into_iter()
        .filter(|&(_, w)| w != 0.0)
        .map(|((a, b), w)| (a, b, w))
        .collect();

    Ok(BaseGraph {
        names,
        index_of,
        sizes,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_nodes_follow_declared_ones() {
        let mut graph = InputGraph::from_links(&[("b", "c"), ("a", "b")]);
        graph.nodes.push(InputNode {
            id: "a".into(),
            size: Some(2.0),
        });
        assert_eq!(graph.node_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn multilayer_sums_weighted_links() {
        let one = InputGraph::from_weighted_links(&[("a", "b", 1.0)]);
        let two = InputGraph::from_weighted_links(&[("a", "b", 2.0), ("b", "a", 1.0)]);
        let layers = [Layer::new(&one), Layer::weighted(&two, 0.5)];
        let base = index_layers(&layers, None, None, None).unwrap();
        assert_eq!(base.names, vec!["a", "b"]);
        assert_eq!(base.edges, vec![(0, 1, 2.0), (1, 0, 0.5)]);
    }

    #[test]
    fn multilayer_zero_sum_edges_are_omitted() {
        let one = InputGraph::from_weighted_links(&[("a", "b", 1.0), ("b", "a", 1.0)]);
        let two = InputGraph::from_weighted_links(&[("a", "b", -1.0), ("b", "a", 2.0)]);
        let layers = [Layer::new(&one), Layer::new(&two)];
        let base = index_layers(&layers, None, None, None).unwrap();
        assert_eq!(base.edges, vec![(1, 0, 3.0)]);
    }

    #[test]
    fn mismatched_layer_node_sets_fail() {
        let one = InputGraph::from_links(&[("a", "b")]);
        let two = InputGraph::from_links(&[("a", "c")]);
        let layers = [Layer::new(&one), Layer::new(&two)];
        assert!(matches!(
            index_layers(&layers, None, None, None),
            Err(ClusterError::Input(_))
        ));
    }

    #[test]
    fn node_order_must_cover_the_graph() {
        let graph = InputGraph::from_links(&[("a", "b")]);
        let layers = [Layer::new(&graph)];
        let order = vec!["a".to_string()];
        assert!(matches!(
            index_layers(&layers, Some(&order), None, None),
            Err(ClusterError::Input(_))
        ));
    }

    #[test]
    fn petgraph_conversion_carries_weights_and_sizes() {
        let mut graph = petgraph::graph::UnGraph::<f64, f64>::new_undirected();
        let a = graph.add_node(1.0);
        let b = graph.add_node(3.0);
        graph.add_edge(a, b, 2.5);
        let input = InputGraph::from_petgraph(&graph);
        assert_eq!(input.nodes.len(), 2);
        assert_eq!(input.nodes[1].size, Some(3.0));
        assert_eq!(input.links[0].weight, Some(2.5));
        assert_eq!(input.node_ids(), vec!["0", "1"]);
    }
}
