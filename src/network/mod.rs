//! Dense weighted graph adapter used at every coarsening level.
//!
//! Nodes live at indices `0..N`. Adjacency is flat CSR (`ptr`/`adj`/`weights`)
//! with per-node strengths and self-loop weights precomputed at build time;
//! the structure is read-only after construction.
//!
//! Undirected construction aggregates input edges per unordered pair and
//! averages when both directions were supplied, so the total weight is the
//! same whether callers provide one or both directions. Each surviving pair
//! is stored symmetrically (once per endpoint); self-loops are stored once.

use std::collections::BTreeMap;

use rand::Rng;

use crate::partition::Partition;

#[derive(Debug, Clone)]
pub struct Network {
    directed: bool,
    sizes: Vec<f64>,
    loops: Vec<f64>,
    out_ptr: Vec<usize>,
    out_adj: Vec<usize>,
    out_weights: Vec<f64>,
    // Populated only in directed mode; undirected reads mirror `out`.
    in_ptr: Vec<usize>,
    in_adj: Vec<usize>,
    in_weights: Vec<f64>,
    out_strengths: Vec<f64>,
    in_strengths: Vec<f64>,
    total_weight: f64,
}

impl Network {
    /// Builds the adapter from dense-indexed weighted edges.
    ///
    /// `sizes.len()` fixes the node count; every edge endpoint must be below
    /// it. Duplicate directed edges are kept as parallel contributions;
    /// duplicate undirected supplies collapse per the pair-averaging rule.
    pub fn from_weighted_edges(
        sizes: Vec<f64>,
        edges: &[(usize, usize, f64)],
        directed: bool,
    ) -> Self {
        let n = sizes.len();
        let mut loops = vec![0.0; n];
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];

        if directed {
            let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
            for &(a, b, w) in edges {
                if a == b {
                    loops[a] += w;
                }
                adjacency[a].push((b, w));
                incoming[b].push((a, w));
            }
            let (out_ptr, out_adj, out_weights) = flatten(adjacency);
            let (in_ptr, in_adj, in_weights) = flatten(incoming);
            let out_strengths = strengths(&out_ptr, &out_weights, n);
            let in_strengths = strengths(&in_ptr, &in_weights, n);
            let total_weight = out_strengths.iter().sum();
            Self {
                directed,
                sizes,
                loops,
                out_ptr,
                out_adj,
                out_weights,
                in_ptr,
                in_adj,
                in_weights,
                out_strengths,
                in_strengths,
                total_weight,
            }
        } else {
            // Per unordered pair {a<b}: weight sum plus which directions the
            // input supplied. Both directions present means the caller gave a
            // symmetric listing, so the stored weight is the average.
            let mut pairs: BTreeMap<(usize, usize), (f64, bool, bool)> = BTreeMap::new();
            for &(a, b, w) in edges {
                if a == b {
                    loops[a] += w;
                    continue;
                }
                let key = if a < b { (a, b) } else { (b, a) };
                let entry = pairs.entry(key).or_insert((0.0, false, false));
                entry.0 += w;
                if a < b {
                    entry.1 = true;
                } else {
                    entry.2 = true;
                }
            }
            for (&(a, b), &(sum, seen_ab, seen_ba)) in &pairs {
                let directions = usize::from(seen_ab) + usize::from(seen_ba);
                let w = sum / directions.max(1) as f64;
                adjacency[a].push((b, w));
                adjacency[b].push((a, w));
            }
            for (i, &w) in loops.iter().enumerate() {
                if w != 0.0 {
                    adjacency[i].push((i, w));
                }
            }
            for list in adjacency.iter_mut() {
                list.sort_by_key(|&(neighbor, _)| neighbor);
            }
            let (out_ptr, out_adj, out_weights) = flatten(adjacency);
            let out_strengths = strengths(&out_ptr, &out_weights, n);
            let total_weight = out_strengths.iter().sum();
            Self {
                directed,
                sizes,
                loops,
                out_ptr,
                out_adj,
                out_weights,
                in_ptr: Vec::new(),
                in_adj: Vec::new(),
                in_weights: Vec::new(),
                in_strengths: Vec::new(),
                out_strengths,
                total_weight,
            }
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    #[inline]
    pub fn size(&self, node: usize) -> f64 {
        self.sizes[node]
    }

    #[inline]
    pub fn self_loop(&self, node: usize) -> f64 {
        self.loops[node]
    }

    #[inline]
    pub fn out_strength(&self, node: usize) -> f64 {
        self.out_strengths[node]
    }

    #[inline]
    pub fn in_strength(&self, node: usize) -> f64 {
        if self.directed {
            self.in_strengths[node]
        } else {
            self.out_strengths[node]
        }
    }

    /// Total weight M = Σ k_out. Each undirected non-loop pair contributes
    /// twice, each self-loop once.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    #[inline]
    pub fn out_degree(&self, node: usize) -> usize {
        self.out_ptr[node + 1] - self.out_ptr[node]
    }

    pub fn out_neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.out_ptr[node]..self.out_ptr[node + 1];
        self.out_adj[range.clone()]
            .iter()
            .copied()
            .zip(self.out_weights[range].iter().copied())
    }

    /// Incoming adjacency; identical to the outgoing list when undirected.
    pub fn in_neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (ptr, adj, weights) = if self.directed {
            (&self.in_ptr, &self.in_adj, &self.in_weights)
        } else {
            (&self.out_ptr, &self.out_adj, &self.out_weights)
        };
        let range = ptr[node]..ptr[node + 1];
        adj[range.clone()]
            .iter()
            .copied()
            .zip(weights[range].iter().copied())
    }

    pub fn random_out_neighbor<R: Rng>(&self, node: usize, rng: &mut R) -> Option<usize> {
        let degree = self.out_degree(node);
        if degree == 0 {
            return None;
        }
        let pick = self.out_ptr[node] + rng.random_range(0..degree);
        Some(self.out_adj[pick])
    }

    /// Contracts each community into a super-node: node size is the
    /// community's total size, and every stored edge is re-keyed to its
    /// endpoint communities with weights summed. Emission order is the
    /// sorted key order, keeping downstream behavior bit-identical.
    pub fn aggregate(&self, partition: &Partition) -> Network {
        let q = partition.community_count();
        let mut sizes = vec![0.0; q];
        for c in 0..q {
            sizes[c] = partition.total_size_of(c);
        }

        let mut memo: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for node in 0..self.node_count() {
            let source = partition.community_of(node);
            for (neighbor, weight) in self.out_neighbors(node) {
                let target = partition.community_of(neighbor);
                *memo.entry((source, target)).or_insert(0.0) += weight;
            }
        }
        let edges: Vec<(usize, usize, f64)> =
            memo.into_iter().map(|((a, b), w)| (a, b, w)).collect();
        Network::from_weighted_edges(sizes, &edges, self.directed)
    }
}

fn flatten(adjacency: Vec<Vec<(usize, f64)>>) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
    let n = adjacency.len();
    let total: usize = adjacency.iter().map(Vec::len).sum();
    let mut ptr = Vec::with_capacity(n + 1);
    let mut adj = Vec::with_capacity(total);
    let mut weights = Vec::with_capacity(total);
    ptr.push(0);
    for list in adjacency {
        for (neighbor, weight) in list {
            adj.push(neighbor);
            weights.push(weight);
        }
        ptr.push(adj.len());
    }
    (ptr, adj, weights)
}

fn strengths(ptr: &[usize], weights: &[f64], n: usize) -> Vec<f64> {
    (0..n)
        .map(|node| weights[ptr[node]..ptr[node + 1]].iter().sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_single_direction_is_symmetrized() {
        let net = Network::from_weighted_edges(vec![1.0; 3], &[(0, 1, 2.0), (1, 2, 3.0)], false);
        assert_eq!(net.out_strength(0), 2.0);
        assert_eq!(net.out_strength(1), 5.0);
        assert_eq!(net.out_strength(2), 3.0);
        assert_eq!(net.total_weight(), 10.0);
        let neighbors: Vec<_> = net.out_neighbors(1).collect();
        assert_eq!(neighbors, vec![(0, 2.0), (2, 3.0)]);
    }

    #[test]
    fn undirected_double_supply_averages() {
        // Both directions supplied: stored weight is the average, so the
        // total matches what a single-direction listing would produce.
        let net =
            Network::from_weighted_edges(vec![1.0; 2], &[(0, 1, 2.0), (1, 0, 4.0)], false);
        let neighbors: Vec<_> = net.out_neighbors(0).collect();
        assert_eq!(neighbors, vec![(1, 3.0)]);
        assert_eq!(net.total_weight(), 6.0);
    }

    #[test]
    fn self_loops_count_once_in_strength_and_total() {
        let net = Network::from_weighted_edges(vec![1.0; 2], &[(0, 0, 5.0), (0, 1, 1.0)], false);
        assert_eq!(net.self_loop(0), 5.0);
        assert_eq!(net.out_strength(0), 6.0);
        assert_eq!(net.total_weight(), 7.0);
    }

    #[test]
    fn directed_keeps_edges_as_supplied() {
        let net = Network::from_weighted_edges(
            vec![1.0; 3],
            &[(0, 1, 1.0), (1, 0, 4.0), (2, 2, 2.0)],
            true,
        );
        assert_eq!(net.out_strength(0), 1.0);
        assert_eq!(net.in_strength(0), 4.0);
        assert_eq!(net.out_strength(2), 2.0);
        assert_eq!(net.in_strength(2), 2.0);
        assert_eq!(net.total_weight(), 7.0);
        let incoming: Vec<_> = net.in_neighbors(1).collect();
        assert_eq!(incoming, vec![(0, 1.0)]);
    }
}
