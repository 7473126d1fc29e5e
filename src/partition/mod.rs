//! Mutable partition over one [`Network`] level.
//!
//! Owns the node→community map, the per-community aggregates (member count,
//! total size, strengths, internal edge weight) and the per-node scratch
//! accumulators that make a quality delta O(degree). The only mutators are
//! [`Partition::move_node`] and [`Partition::compact`]; everything else is a
//! read-only view.
//!
//! Internal edge weight convention: undirected communities count each
//! internal unordered pair twice (once per stored direction) and member
//! self-loops once; directed communities count each internal directed edge
//! once and self-loops once. Scratch accumulators exclude the self-loop of
//! the node under evaluation; the move operator carries it explicitly.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::network::Network;
use crate::quality::{community_term, CommunityAggregate, CpmMode, QualityKind};

/// Renumbering policy for [`Partition::compact`].
#[derive(Debug, Clone, Copy)]
pub enum Relabel<'a> {
    /// Sort by (total size desc, member count desc, old id asc).
    SizeOrdered,
    /// Keep ascending old-id order.
    KeepOrder,
    /// Ascend by the mapped value of the old id; unmapped ids come last,
    /// ties fall back to the size ordering.
    FromMap(&'a BTreeMap<usize, usize>),
}

#[derive(Debug, Clone)]
pub struct Partition {
    directed: bool,
    node_community: Vec<usize>,
    community_count: usize,
    node_counts: Vec<usize>,
    total_sizes: Vec<f64>,
    internal_weights: Vec<f64>,
    out_strengths: Vec<f64>,
    in_strengths: Vec<f64>, // empty in undirected mode
    // Scratch for the node currently under evaluation. Slots outside
    // `candidates` are kept zeroed so reads of untouched communities are 0.
    candidates: Vec<usize>,
    is_candidate: Vec<bool>,
    weight_to: Vec<f64>,   // undirected neighbor weight / directed out-to
    weight_from: Vec<f64>, // directed in-from; empty in undirected mode
}

impl Partition {
    /// Fresh partition with every node in its own community.
    pub fn singletons(net: &Network) -> Self {
        let n = net.node_count();
        let directed = net.is_directed();
        Self {
            directed,
            node_community: (0..n).collect(),
            community_count: n,
            node_counts: vec![1; n],
            total_sizes: (0..n).map(|v| net.size(v)).collect(),
            internal_weights: (0..n).map(|v| net.self_loop(v)).collect(),
            out_strengths: (0..n).map(|v| net.out_strength(v)).collect(),
            in_strengths: if directed {
                (0..n).map(|v| net.in_strength(v)).collect()
            } else {
                Vec::new()
            },
            candidates: Vec::new(),
            is_candidate: vec![false; n],
            weight_to: vec![0.0; n],
            weight_from: if directed { vec![0.0; n] } else { Vec::new() },
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_community.len()
    }

    /// Number of community slots, empty ones included.
    #[inline]
    pub fn community_count(&self) -> usize {
        self.community_count
    }

    #[inline]
    pub fn community_of(&self, node: usize) -> usize {
        self.node_community[node]
    }

    #[inline]
    pub fn node_count_of(&self, community: usize) -> usize {
        self.node_counts[community]
    }

    #[inline]
    pub fn total_size_of(&self, community: usize) -> f64 {
        self.total_sizes[community]
    }

    #[inline]
    pub fn internal_weight_of(&self, community: usize) -> f64 {
        self.internal_weights[community]
    }

    #[inline]
    pub fn out_strength_of(&self, community: usize) -> f64 {
        self.out_strengths[community]
    }

    #[inline]
    pub fn in_strength_of(&self, community: usize) -> f64 {
        if self.directed {
            self.in_strengths[community]
        } else {
            self.out_strengths[community]
        }
    }

    /// Walks `node`'s incident edges and fills the per-community scratch
    /// accumulators, clearing the previous node's scratch first (O(previous
    /// candidates)). The node's own community is always touched so "stay"
    /// is a valid candidate even for isolated nodes. Self-loops are skipped.
    ///
    /// Returns the number of candidate communities.
    pub fn accumulate_neighbors(&mut self, net: &Network, node: usize) -> usize {
        for &c in &self.candidates {
            self.is_candidate[c] = false;
            self.weight_to[c] = 0.0;
            if self.directed {
                self.weight_from[c] = 0.0;
            }
        }
        self.candidates.clear();

        self.touch(self.node_community[node]);
        for (neighbor, weight) in net.out_neighbors(node) {
            if neighbor == node {
                continue;
            }
            let c = self.node_community[neighbor];
            self.touch(c);
            self.weight_to[c] += weight;
        }
        if self.directed {
            for (neighbor, weight) in net.in_neighbors(node) {
                if neighbor == node {
                    continue;
                }
                let c = self.node_community[neighbor];
                self.touch(c);
                self.weight_from[c] += weight;
            }
        }
        self.candidates.len()
    }

    #[inline]
    fn touch(&mut self, community: usize) {
        if !self.is_candidate[community] {
            self.is_candidate[community] = true;
            self.candidates.push(community);
        }
    }

    /// Candidate communities of the last accumulated node, in edge-walk
    /// order with the node's own community first.
    #[inline]
    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    #[inline]
    fn scratch_to(&self, community: usize) -> f64 {
        if community < self.weight_to.len() {
            self.weight_to[community]
        } else {
            0.0
        }
    }

    #[inline]
    fn scratch_from(&self, community: usize) -> f64 {
        if community < self.weight_from.len() {
            self.weight_from[community]
        } else {
            0.0
        }
    }

    #[inline]
    fn slot_f64(values: &[f64], community: usize) -> f64 {
        values.get(community).copied().unwrap_or(0.0)
    }

    /// Modularity gain of moving `node` into `community` on an undirected
    /// network. Exact: equals the global quality difference the move would
    /// produce. Requires [`Self::accumulate_neighbors`] for `node`.
    pub fn delta_modularity_undirected(&self, net: &Network, node: usize, community: usize) -> f64 {
        let old = self.node_community[node];
        if community == old {
            return 0.0;
        }
        let m2 = net.total_weight();
        if m2 == 0.0 {
            return 0.0;
        }
        let k = net.out_strength(node);
        let w_new = self.scratch_to(community);
        let w_old = self.weight_to[old];
        let tot_new = Self::slot_f64(&self.out_strengths, community);
        // Strength of the old community with the node virtually removed.
        let tot_old = self.out_strengths[old] - k;
        2.0 * ((w_new - w_old) / m2 - k * (tot_new - tot_old) / (m2 * m2))
    }

    /// Leicht–Newman modularity gain on a directed network. Exact under the
    /// same contract as [`Self::delta_modularity_undirected`].
    pub fn delta_modularity_directed(&self, net: &Network, node: usize, community: usize) -> f64 {
        let old = self.node_community[node];
        if community == old {
            return 0.0;
        }
        let m = net.total_weight();
        if m == 0.0 {
            return 0.0;
        }
        let k_out = net.out_strength(node);
        let k_in = net.in_strength(node);
        let out_new = self.scratch_to(community);
        let in_new = self.scratch_from(community);
        let out_old = self.weight_to[old];
        let in_old = self.weight_from[old];
        let t_new = Self::slot_f64(&self.in_strengths, community);
        let f_new = Self::slot_f64(&self.out_strengths, community);
        let t_old = self.in_strengths[old] - k_in;
        let f_old = self.out_strengths[old] - k_out;
        (in_new + out_new - in_old - out_old) / m
            - (k_out * (t_new - t_old) + k_in * (f_new - f_old)) / (m * m)
    }

    /// CPM gain with resolution `gamma`, against the size-aware penalty.
    /// `total_sizes[old]` still counts the node at evaluation time, which
    /// the closed form relies on. Exact like the modularity deltas.
    pub fn delta_cpm(&self, net: &Network, node: usize, community: usize, gamma: f64) -> f64 {
        let old = self.node_community[node];
        if community == old {
            return 0.0;
        }
        let (w_new, w_old) = if self.directed {
            (
                self.scratch_to(community) + self.scratch_from(community),
                self.weight_to[old] + self.weight_from[old],
            )
        } else {
            // Undirected internal weight counts both stored directions.
            (
                2.0 * self.scratch_to(community),
                2.0 * self.weight_to[old],
            )
        };
        let size = net.size(node);
        let s_new = Self::slot_f64(&self.total_sizes, community);
        let s_old = self.total_sizes[old];
        (w_new - w_old) - gamma * size * (s_new - s_old + size)
    }

    /// Moves `node` into `new_community`, atomically maintaining every
    /// aggregate. `new_community == community_count()` appends a fresh
    /// zero-initialized slot. No-op returning `false` when the node already
    /// lives there.
    ///
    /// Requires the scratch filled by [`Self::accumulate_neighbors`] for
    /// this node, with no interleaved moves since.
    pub fn move_node(&mut self, net: &Network, node: usize, new_community: usize) -> bool {
        assert!(
            new_community <= self.community_count,
            "community id {new_community} out of range (count {})",
            self.community_count
        );
        if new_community == self.community_count {
            self.append_slot();
        }
        let old = self.node_community[node];
        if new_community == old {
            return false;
        }

        let size = net.size(node);
        let loop_weight = net.self_loop(node);
        let k_out = net.out_strength(node);

        self.node_counts[old] -= 1;
        self.total_sizes[old] -= size;
        self.out_strengths[old] -= k_out;
        self.node_counts[new_community] += 1;
        self.total_sizes[new_community] += size;
        self.out_strengths[new_community] += k_out;

        if self.directed {
            let k_in = net.in_strength(node);
            self.in_strengths[old] -= k_in;
            self.in_strengths[new_community] += k_in;
            self.internal_weights[old] -= self.weight_to[old] + self.weight_from[old] + loop_weight;
            self.internal_weights[new_community] +=
                self.weight_to[new_community] + self.weight_from[new_community] + loop_weight;
        } else {
            self.internal_weights[old] -= 2.0 * self.weight_to[old] + loop_weight;
            self.internal_weights[new_community] +=
                2.0 * self.weight_to[new_community] + loop_weight;
        }

        self.node_community[node] = new_community;
        true
    }

    fn append_slot(&mut self) {
        let needed = self.community_count + 1;
        if needed > self.node_counts.len() {
            let grown = ((self.node_counts.len() as f64 * 1.5).ceil() as usize).max(needed);
            self.node_counts.resize(grown, 0);
            self.total_sizes.resize(grown, 0.0);
            self.internal_weights.resize(grown, 0.0);
            self.out_strengths.resize(grown, 0.0);
            self.is_candidate.resize(grown, false);
            self.weight_to.resize(grown, 0.0);
            if self.directed {
                self.in_strengths.resize(grown, 0.0);
                self.weight_from.resize(grown, 0.0);
            }
        }
        self.community_count = needed;
    }

    /// Drops empty slots and renumbers communities to `0..Q'` per `mode`,
    /// then rebuilds every aggregate with a single O(N+E) scan into
    /// exact-size arrays. Must run after each local-move phase.
    pub fn compact(&mut self, net: &Network, mode: Relabel<'_>) {
        let by_size = |a: usize, b: usize| -> Ordering {
            self.total_sizes[b]
                .partial_cmp(&self.total_sizes[a])
                .unwrap_or(Ordering::Equal)
                .then(self.node_counts[b].cmp(&self.node_counts[a]))
                .then(a.cmp(&b))
        };

        let mut occupied: Vec<usize> = (0..self.community_count)
            .filter(|&c| self.node_counts[c] > 0)
            .collect();
        match mode {
            Relabel::SizeOrdered => occupied.sort_by(|&a, &b| by_size(a, b)),
            Relabel::KeepOrder => {}
            Relabel::FromMap(map) => occupied.sort_by(|&a, &b| match (map.get(&a), map.get(&b)) {
                (Some(x), Some(y)) => x.cmp(y).then(by_size(a, b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => by_size(a, b),
            }),
        }

        let mut remap = vec![usize::MAX; self.community_count];
        for (new_id, &old_id) in occupied.iter().enumerate() {
            remap[old_id] = new_id;
        }
        for community in self.node_community.iter_mut() {
            debug_assert!(remap[*community] != usize::MAX);
            *community = remap[*community];
        }
        self.community_count = occupied.len();
        self.rebuild_aggregates(net);
    }

    fn rebuild_aggregates(&mut self, net: &Network) {
        let q = self.community_count;
        self.node_counts = vec![0; q];
        self.total_sizes = vec![0.0; q];
        self.internal_weights = vec![0.0; q];
        self.out_strengths = vec![0.0; q];
        if self.directed {
            self.in_strengths = vec![0.0; q];
        }
        for node in 0..net.node_count() {
            let c = self.node_community[node];
            self.node_counts[c] += 1;
            self.total_sizes[c] += net.size(node);
            self.out_strengths[c] += net.out_strength(node);
            if self.directed {
                self.in_strengths[c] += net.in_strength(node);
            }
            for (neighbor, weight) in net.out_neighbors(node) {
                if neighbor == node || self.node_community[neighbor] == c {
                    self.internal_weights[c] += weight;
                }
            }
        }
        self.candidates.clear();
        self.is_candidate = vec![false; q];
        self.weight_to = vec![0.0; q];
        if self.directed {
            self.weight_from = vec![0.0; q];
        }
    }

    /// Member node indices per community.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.community_count];
        for (node, &community) in self.node_community.iter().enumerate() {
            groups[community].push(node);
        }
        groups
    }

    pub fn membership(&self) -> &[usize] {
        &self.node_community
    }

    fn aggregate_of(&self, community: usize) -> CommunityAggregate {
        CommunityAggregate {
            internal_weight: self.internal_weights[community],
            out_strength: self.out_strengths[community],
            in_strength: self.in_strength_of(community),
            node_count: self.node_counts[community],
            total_size: self.total_sizes[community],
        }
    }

    /// Global quality of the current assignment, summed in community order.
    pub fn quality(
        &self,
        net: &Network,
        kind: QualityKind,
        resolution: f64,
        cpm_mode: CpmMode,
    ) -> f64 {
        let m = net.total_weight();
        (0..self.community_count)
            .map(|c| {
                community_term(
                    &self.aggregate_of(c),
                    kind,
                    self.directed,
                    resolution,
                    cpm_mode,
                    m,
                )
            })
            .sum()
    }
}
