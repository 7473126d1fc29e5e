//! Quality evaluation for externally supplied memberships.
//!
//! One O(N+E) edge scan aggregates per-community strengths, sizes, and
//! internal weight keyed by the raw (possibly non-contiguous) community
//! ids, then applies the same per-community closed forms the detector
//! uses. Summation runs in sorted key order so results are bit-stable.

use std::collections::BTreeMap;

use crate::error::{ClusterError, Result};
use crate::input::{index_layers, InputGraph, Layer};
use crate::network::Network;
use crate::quality::{community_term, CommunityAggregate, CpmMode, QualityKind};
use crate::Options;

/// A community label as supplied by callers: numeric, or text that is
/// parsed as an integer when possible and FNV-1a hashed otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipLabel {
    Number(i64),
    Text(String),
}

impl From<i64> for MembershipLabel {
    fn from(value: i64) -> Self {
        MembershipLabel::Number(value)
    }
}

impl From<&str> for MembershipLabel {
    fn from(value: &str) -> Self {
        MembershipLabel::Text(value.to_string())
    }
}

impl MembershipLabel {
    fn resolve(&self) -> i64 {
        match self {
            MembershipLabel::Number(n) => *n,
            MembershipLabel::Text(s) => s
                .parse::<i64>()
                .unwrap_or_else(|_| i64::from(fnv1a32(s))),
        }
    }
}

/// 32-bit FNV-1a; the deterministic hash applied to non-numeric labels.
pub(crate) fn fnv1a32(text: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in text.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Quality of `membership` over `graph` under `options`.
///
/// Strict mode fails on any node missing from the membership; otherwise
/// missing nodes become fresh singleton communities.
pub fn evaluate_quality(
    graph: &InputGraph,
    membership: &BTreeMap<String, MembershipLabel>,
    options: &Options,
    strict: bool,
) -> Result<f64> {
    let layer = Layer::new(graph);
    let base = index_layers(
        std::slice::from_ref(&layer),
        None,
        options.link_weight,
        options.node_size,
    )?;
    let net = Network::from_weighted_edges(base.sizes, &base.edges, options.directed);

    let mut next_free = membership
        .values()
        .map(MembershipLabel::resolve)
        .max()
        .map_or(0, |max| max + 1);
    let mut labels = Vec::with_capacity(base.names.len());
    for name in &base.names {
        match membership.get(name) {
            Some(label) => labels.push(label.resolve()),
            None if strict => return Err(ClusterError::MissingMembership(name.clone())),
            None => {
                labels.push(next_free);
                next_free += 1;
            }
        }
    }

    Ok(membership_quality(
        &net,
        &labels,
        options.quality,
        options.resolution,
        options.cpm_mode,
    ))
}

/// Shared aggregation core: quality of per-node labels over a built network.
pub(crate) fn membership_quality(
    net: &Network,
    labels: &[i64],
    kind: QualityKind,
    resolution: f64,
    cpm_mode: CpmMode,
) -> f64 {
    let mut aggregates: BTreeMap<i64, CommunityAggregate> = BTreeMap::new();
    for node in 0..net.node_count() {
        let label = labels[node];
        let agg = aggregates.entry(label).or_default();
        agg.node_count += 1;
        agg.total_size += net.size(node);
        agg.out_strength += net.out_strength(node);
        agg.in_strength += net.in_strength(node);
        for (neighbor, weight) in net.out_neighbors(node) {
            if neighbor == node || labels[neighbor] == label {
                agg.internal_weight += weight;
            }
        }
    }
    let m = net.total_weight();
    aggregates
        .values()
        .map(|agg| community_term(agg, kind, net.is_directed(), resolution, cpm_mode, m))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect_clusters;

    fn labelled(pairs: &[(&str, MembershipLabel)]) -> BTreeMap<String, MembershipLabel> {
        pairs
            .iter()
            .map(|(id, label)| (id.to_string(), label.clone()))
            .collect()
    }

    #[test]
    fn fnv1a32_known_vectors() {
        assert_eq!(fnv1a32(""), 0x811c_9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c_292c);
    }

    #[test]
    fn numeric_text_labels_parse_and_match_numbers() {
        let graph = InputGraph::from_links(&[("a", "b"), ("b", "c")]);
        let by_number = labelled(&[
            ("a", 0.into()),
            ("b", 0.into()),
            ("c", 7.into()),
        ]);
        let by_text = labelled(&[
            ("a", "0".into()),
            ("b", "0".into()),
            ("c", "7".into()),
        ]);
        let options = Options::default();
        let lhs = evaluate_quality(&graph, &by_number, &options, true).unwrap();
        let rhs = evaluate_quality(&graph, &by_text, &options, true).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn hashed_text_labels_group_consistently() {
        let graph = InputGraph::from_links(&[("a", "b"), ("b", "c")]);
        let membership = labelled(&[
            ("a", "left".into()),
            ("b", "left".into()),
            ("c", "right".into()),
        ]);
        let ints = labelled(&[
            ("a", i64::from(fnv1a32("left")).into()),
            ("b", i64::from(fnv1a32("left")).into()),
            ("c", i64::from(fnv1a32("right")).into()),
        ]);
        let options = Options::default();
        let lhs = evaluate_quality(&graph, &membership, &options, true).unwrap();
        let rhs = evaluate_quality(&graph, &ints, &options, true).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn strict_mode_requires_full_coverage() {
        let graph = InputGraph::from_links(&[("a", "b")]);
        let membership = labelled(&[("a", 0.into())]);
        let options = Options::default();
        let err = evaluate_quality(&graph, &membership, &options, true).unwrap_err();
        assert!(matches!(err, ClusterError::MissingMembership(id) if id == "b"));
        // Non-strict mode treats the unmapped node as its own singleton.
        assert!(evaluate_quality(&graph, &membership, &options, false).is_ok());
    }

    #[test]
    fn round_trips_detected_membership() {
        let mut graph = InputGraph::default();
        for (a, b) in [("a", "b"), ("b", "c"), ("a", "c"), ("d", "e"), ("e", "f"), ("d", "f")] {
            graph.add_link(a, b, 1.0);
        }
        graph.add_link("c", "d", 1.0);
        let options = Options::default();
        let clusters = detect_clusters(&graph, &options).unwrap();
        let membership: BTreeMap<String, MembershipLabel> = clusters
            .node_ids()
            .iter()
            .zip(clusters.membership())
            .map(|(id, &c)| (id.clone(), MembershipLabel::Number(c as i64)))
            .collect();
        let evaluated = evaluate_quality(&graph, &membership, &options, true).unwrap();
        assert!((evaluated - clusters.quality()).abs() <= 1e-9 * clusters.quality().abs().max(1.0));
    }
}
