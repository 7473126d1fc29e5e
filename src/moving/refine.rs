//! Leiden-style refinement: re-optimizes from singletons inside the macro
//! communities a greedy pass produced, splitting badly merged ones.

use rand::Rng;

use crate::moving::{LocalMoving, RefineScope};
use crate::network::Network;
use crate::partition::Partition;

/// Builds a fresh singleton partition and runs the local-move loop with
/// candidates restricted to communities founded inside the node's macro
/// community (its assignment in `coarse`). Fresh singletons are never
/// created. The result subdivides each macro community into one or more
/// refined communities and replaces `coarse` for coarsening.
pub(crate) fn refine_partition<R: Rng>(
    net: &Network,
    coarse: &Partition,
    mover: &LocalMoving,
    rng: &mut R,
    fixed: Option<&[bool]>,
) -> Partition {
    let n = net.node_count();
    let mut refined = Partition::singletons(net);

    let macro_of_node: Vec<usize> = (0..n).map(|v| coarse.community_of(v)).collect();
    // Refinement community i is founded by node i, so it starts out in
    // node i's macro community; constrained moves keep this invariant.
    let macro_of_community = macro_of_node.clone();
    let scope = RefineScope {
        macro_of_node: &macro_of_node,
        macro_of_community: &macro_of_community,
    };

    let mover = LocalMoving {
        allow_new_community: false,
        ..mover.clone()
    };
    mover.run(net, &mut refined, rng, fixed, Some(&scope));
    refined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moving::{CandidateStrategy, Objective};
    use crate::partition::Relabel;
    use crate::quality::QualityKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn refinement_splits_disconnected_macro_communities() {
        // Two triangles with no bridge, forced into one macro community.
        let edges = [
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
            (3, 5, 1.0),
        ];
        let net = Network::from_weighted_edges(vec![1.0; 6], &edges, false);
        let mut coarse = Partition::singletons(&net);
        for node in 1..6 {
            coarse.accumulate_neighbors(&net, node);
            coarse.move_node(&net, node, 0);
        }
        coarse.compact(&net, Relabel::SizeOrdered);
        assert_eq!(coarse.community_count(), 1);

        let mover = LocalMoving {
            objective: Objective {
                kind: QualityKind::Cpm,
                resolution: 0.5,
            },
            strategy: CandidateStrategy::Neighbors,
            allow_new_community: false,
            max_community_size: None,
            max_passes: 20,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut refined = refine_partition(&net, &coarse, &mover, &mut rng, None);
        refined.compact(&net, Relabel::SizeOrdered);
        assert_eq!(refined.community_count(), 2);
        assert_eq!(refined.community_of(0), refined.community_of(2));
        assert_ne!(refined.community_of(0), refined.community_of(3));
    }

    #[test]
    fn refinement_never_crosses_macro_boundaries() {
        // One 4-clique split across two macro communities: refinement must
        // not rejoin them even though modularity would improve.
        let edges = [
            (0, 1, 1.0),
            (0, 2, 1.0),
            (0, 3, 1.0),
            (1, 2, 1.0),
            (1, 3, 1.0),
            (2, 3, 1.0),
        ];
        let net = Network::from_weighted_edges(vec![1.0; 4], &edges, false);
        let mut coarse = Partition::singletons(&net);
        coarse.accumulate_neighbors(&net, 1);
        coarse.move_node(&net, 1, 0);
        coarse.accumulate_neighbors(&net, 3);
        coarse.move_node(&net, 3, 2);
        coarse.compact(&net, Relabel::KeepOrder);

        let mover = LocalMoving {
            objective: Objective {
                kind: QualityKind::Modularity,
                resolution: 1.0,
            },
            strategy: CandidateStrategy::Neighbors,
            allow_new_community: false,
            max_community_size: None,
            max_passes: 20,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let refined = refine_partition(&net, &coarse, &mover, &mut rng, None);
        let macro_of = |v: usize| coarse.community_of(v);
        for v in 0..4 {
            for u in 0..4 {
                if refined.community_of(v) == refined.community_of(u) {
                    assert_eq!(macro_of(v), macro_of(u));
                }
            }
        }
    }
}
