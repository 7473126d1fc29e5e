//! Randomized greedy local-move search.
//!
//! Sweeps nodes in a shuffled order and moves each to the candidate
//! community with the best positive quality gain, repeating until a full
//! pass produces no improvement or the pass budget runs out.

mod refine;

pub(crate) use refine::refine_partition;

use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::network::Network;
use crate::partition::Partition;
use crate::quality::QualityKind;

/// Gains at or below this threshold never trigger a move.
pub(crate) const MIN_GAIN: f64 = 1e-12;

/// How move targets are enumerated for each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateStrategy {
    /// Communities touched by the node's edges (plus its own).
    Neighbors,
    /// Every non-empty community.
    All,
    /// Communities of randomly drawn nodes.
    Random,
    /// Communities of randomly drawn neighbors.
    RandomNeighbor,
}

impl CandidateStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStrategy::Neighbors => "neighbors",
            CandidateStrategy::All => "all",
            CandidateStrategy::Random => "random",
            CandidateStrategy::RandomNeighbor => "random-neighbor",
        }
    }
}

impl FromStr for CandidateStrategy {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neighbors" => Ok(CandidateStrategy::Neighbors),
            "all" => Ok(CandidateStrategy::All),
            "random" => Ok(CandidateStrategy::Random),
            "random-neighbor" => Ok(CandidateStrategy::RandomNeighbor),
            other => Err(ClusterError::UnknownOption {
                option: "candidateStrategy",
                value: other.to_string(),
            }),
        }
    }
}

/// Objective evaluated by the move loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Objective {
    pub kind: QualityKind,
    pub resolution: f64,
}

impl Objective {
    /// Gain of moving `node` into `community`; non-finite values clamp to 0
    /// so the sweep keeps making monotone progress.
    pub fn gain(&self, net: &Network, part: &Partition, node: usize, community: usize) -> f64 {
        let gain = match self.kind {
            QualityKind::Modularity if net.is_directed() => {
                part.delta_modularity_directed(net, node, community)
            }
            QualityKind::Modularity => part.delta_modularity_undirected(net, node, community),
            QualityKind::Cpm => part.delta_cpm(net, node, community, self.resolution),
        };
        if gain.is_finite() {
            gain
        } else {
            0.0
        }
    }
}

/// Restricts refinement moves to communities founded inside the node's
/// macro community.
pub(crate) struct RefineScope<'a> {
    pub macro_of_node: &'a [usize],
    pub macro_of_community: &'a [usize],
}

impl RefineScope<'_> {
    #[inline]
    fn admits(&self, node: usize, community: usize) -> bool {
        self.macro_of_community[community] == self.macro_of_node[node]
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LocalMoving {
    pub objective: Objective,
    pub strategy: CandidateStrategy,
    pub allow_new_community: bool,
    pub max_community_size: Option<f64>,
    pub max_passes: usize,
}

impl LocalMoving {
    /// Runs sweeps over `part` until quiescence. Returns whether any move
    /// was applied. `fixed` marks immobile nodes (finest level only);
    /// `scope` is set during refinement and also disables fresh singletons.
    pub fn run<R: Rng>(
        &self,
        net: &Network,
        part: &mut Partition,
        rng: &mut R,
        fixed: Option<&[bool]>,
        scope: Option<&RefineScope<'_>>,
    ) -> bool {
        let n = net.node_count();
        if n == 0 {
            return false;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut candidates: Vec<usize> = Vec::new();
        let mut updated = false;
        for _pass in 0..self.max_passes {
            let mut improved = false;
            for &node in &order {
                if fixed.is_some_and(|mask| mask[node]) {
                    continue;
                }
                part.accumulate_neighbors(net, node);
                let current = part.community_of(node);

                candidates.clear();
                match self.strategy {
                    CandidateStrategy::Neighbors => {
                        candidates.extend_from_slice(part.candidates());
                    }
                    CandidateStrategy::All => {
                        candidates.extend(
                            (0..part.community_count()).filter(|&c| part.node_count_of(c) > 0),
                        );
                    }
                    CandidateStrategy::Random => {
                        for _ in 0..trial_budget(part.candidates().len()) {
                            let pick = rng.random_range(0..n);
                            candidates.push(part.community_of(pick));
                        }
                    }
                    CandidateStrategy::RandomNeighbor => {
                        for _ in 0..trial_budget(part.candidates().len()) {
                            if let Some(neighbor) = net.random_out_neighbor(node, rng) {
                                candidates.push(part.community_of(neighbor));
                            }
                        }
                    }
                }

                let size = net.size(node);
                let mut best_community = current;
                let mut best_gain = 0.0;
                for &community in &candidates {
                    if community == current {
                        continue;
                    }
                    if let Some(scope) = scope {
                        if !scope.admits(node, community) {
                            continue;
                        }
                    }
                    if let Some(cap) = self.max_community_size {
                        if part.total_size_of(community) + size > cap {
                            continue;
                        }
                    }
                    let gain = self.objective.gain(net, part, node, community);
                    if gain > best_gain {
                        best_gain = gain;
                        best_community = community;
                    }
                }

                if self.allow_new_community && scope.is_none() {
                    let fresh = part.community_count();
                    let gain = self.objective.gain(net, part, node, fresh);
                    if gain > best_gain {
                        best_gain = gain;
                        best_community = fresh;
                    }
                }

                if best_gain > MIN_GAIN && best_community != current {
                    part.move_node(net, node, best_community);
                    improved = true;
                    updated = true;
                }
            }
            if !improved {
                break;
            }
        }
        updated
    }
}

/// Random strategies draw this many candidates, with replacement.
#[inline]
fn trial_budget(candidate_count: usize) -> usize {
    candidate_count.clamp(1, 10)
}
