//! End-to-end detection scenarios on small hand-built graphs.

use std::collections::BTreeMap;

use graph_communities::{
    detect_clusters, evaluate_quality, CandidateStrategy, CpmMode, InputGraph, MembershipLabel,
    Options, QualityKind,
};

fn clique(graph: &mut InputGraph, ids: &[&str]) {
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            graph.add_link(a, b, 1.0);
        }
    }
}

fn directed_clique(graph: &mut InputGraph, ids: &[&str]) {
    for a in ids {
        for b in ids {
            if a != b {
                graph.add_link(a, b, 1.0);
            }
        }
    }
}

fn bridged_cliques(side: usize) -> InputGraph {
    let ids: Vec<String> = (0..2 * side).map(|i| i.to_string()).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut graph = InputGraph::default();
    clique(&mut graph, &refs[..side]);
    clique(&mut graph, &refs[side..]);
    graph.add_link(&refs[side - 1], &refs[side], 1.0);
    graph
}

fn same_class(clusters: &graph_communities::Clusters, ids: &[&str]) -> bool {
    let first = clusters.class_of(ids[0]);
    ids.iter().all(|id| clusters.class_of(id) == first)
}

#[test]
fn two_four_cliques_with_bridge_split_in_two() {
    let graph = bridged_cliques(4);
    let options = Options {
        random_seed: 1,
        ..Options::default()
    };
    let clusters = detect_clusters(&graph, &options).unwrap();
    assert_eq!(clusters.community_count(), 2);
    assert!(same_class(&clusters, &["0", "1", "2", "3"]));
    assert!(same_class(&clusters, &["4", "5", "6", "7"]));
    assert_ne!(clusters.class_of("0"), clusters.class_of("4"));
}

#[test]
fn cpm_resolution_controls_community_count() {
    let graph = bridged_cliques(4);
    let coarse = detect_clusters(
        &graph,
        &Options {
            quality: QualityKind::Cpm,
            resolution: 0.01,
            ..Options::default()
        },
    )
    .unwrap();
    let fine = detect_clusters(
        &graph,
        &Options {
            quality: QualityKind::Cpm,
            resolution: 10.0,
            ..Options::default()
        },
    )
    .unwrap();
    assert!(coarse.community_count() <= fine.community_count());
}

#[test]
fn fixed_nodes_stay_with_their_cliques() {
    let graph = bridged_cliques(4);
    let options = Options {
        fixed_nodes: Some(["3".to_string(), "4".to_string()].into()),
        ..Options::default()
    };
    let clusters = detect_clusters(&graph, &options).unwrap();
    assert!(same_class(&clusters, &["0", "1", "2", "3"]));
    assert!(same_class(&clusters, &["4", "5", "6", "7"]));
    assert_ne!(clusters.class_of("3"), clusters.class_of("4"));
}

#[test]
fn directed_triangles_with_one_way_bridge() {
    let mut graph = InputGraph::default();
    directed_clique(&mut graph, &["0", "1", "2"]);
    directed_clique(&mut graph, &["3", "4", "5"]);
    graph.add_link("2", "3", 1.0);
    let options = Options {
        directed: true,
        random_seed: 2,
        ..Options::default()
    };
    let clusters = detect_clusters(&graph, &options).unwrap();
    assert_eq!(clusters.community_count(), 2);
    assert!(same_class(&clusters, &["0", "1", "2"]));
    assert!(same_class(&clusters, &["3", "4", "5"]));
    assert_ne!(clusters.class_of("0"), clusters.class_of("3"));
}

#[test]
fn community_size_cap_blocks_bridge_merge() {
    let graph = bridged_cliques(3);
    let options = Options {
        max_community_size: Some(3.0),
        ..Options::default()
    };
    let clusters = detect_clusters(&graph, &options).unwrap();
    assert_eq!(clusters.community_count(), 2);
    assert!(same_class(&clusters, &["0", "1", "2"]));
    assert!(same_class(&clusters, &["3", "4", "5"]));
}

#[test]
fn heavy_self_loop_keeps_cpm_nodes_apart() {
    let mut graph = InputGraph::default();
    graph.add_link("a", "a", 5.0);
    graph.add_link("a", "b", 0.1);
    graph.add_link("b", "a", 0.1);
    let options = Options {
        quality: QualityKind::Cpm,
        resolution: 1.0,
        ..Options::default()
    };
    let clusters = detect_clusters(&graph, &options).unwrap();
    assert_eq!(clusters.community_count(), 2);
    assert_ne!(clusters.class_of("a"), clusters.class_of("b"));
}

#[test]
fn chain_of_three_five_cliques_yields_three_communities() {
    let ids: Vec<String> = (0..15).map(|i| i.to_string()).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut graph = InputGraph::default();
    clique(&mut graph, &refs[0..5]);
    clique(&mut graph, &refs[5..10]);
    clique(&mut graph, &refs[10..15]);
    graph.add_link("4", "5", 1.0);
    graph.add_link("9", "10", 1.0);
    let options = Options {
        refine: true,
        ..Options::default()
    };
    let clusters = detect_clusters(&graph, &options).unwrap();
    assert_eq!(clusters.community_count(), 3);
    assert!(same_class(&clusters, &refs[0..5]));
    assert!(same_class(&clusters, &refs[5..10]));
    assert!(same_class(&clusters, &refs[10..15]));
}

#[test]
fn identical_seeds_give_identical_results() {
    let graph = bridged_cliques(4);
    for strategy in [
        CandidateStrategy::Neighbors,
        CandidateStrategy::Random,
        CandidateStrategy::RandomNeighbor,
    ] {
        let options = Options {
            candidate_strategy: strategy,
            random_seed: 9,
            ..Options::default()
        };
        let first = detect_clusters(&graph, &options).unwrap();
        let second = detect_clusters(&graph, &options).unwrap();
        assert_eq!(first.membership(), second.membership());
        assert_eq!(first.quality().to_bits(), second.quality().to_bits());
    }
}

#[test]
fn evaluate_round_trips_detect_quality() {
    let graph = bridged_cliques(4);
    for (kind, cpm_mode) in [
        (QualityKind::Modularity, CpmMode::Unit),
        (QualityKind::Cpm, CpmMode::Unit),
        (QualityKind::Cpm, CpmMode::SizeAware),
    ] {
        let options = Options {
            quality: kind,
            resolution: 0.3,
            cpm_mode,
            ..Options::default()
        };
        let clusters = detect_clusters(&graph, &options).unwrap();
        let exported = clusters.to_json();
        let membership: BTreeMap<String, MembershipLabel> = exported["membership"]
            .as_object()
            .unwrap()
            .iter()
            .map(|(id, c)| (id.clone(), MembershipLabel::Number(c.as_i64().unwrap())))
            .collect();
        let evaluated = evaluate_quality(&graph, &membership, &options, true).unwrap();
        let expected = clusters.quality();
        assert!(
            (evaluated - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "{kind:?}/{cpm_mode:?}: {evaluated} vs {expected}"
        );
    }
}

#[test]
fn multilayer_aggregation_matches_flat_graph() {
    // Splitting each clique's edges across two layers with weights that sum
    // to the flat weights must give the same partition.
    let flat = bridged_cliques(4);
    let mut half = InputGraph::default();
    for link in &flat.links {
        half.add_link(&link.source, &link.target, 0.5);
    }
    let layers = [
        graph_communities::Layer::weighted(&half, 1.0),
        graph_communities::Layer::weighted(&half, 1.0),
    ];
    let options = Options::default();
    let from_layers = graph_communities::detect_clusters_layers(&layers, None, &options).unwrap();
    let from_flat = detect_clusters(&flat, &options).unwrap();
    assert_eq!(from_layers.membership(), from_flat.membership());
    assert_eq!(from_layers.quality().to_bits(), from_flat.quality().to_bits());
}
