//! Outer multi-level driver: local moves, optional refinement, renumbering,
//! coarsening, and the original→final membership mapping.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{ClusterError, Result};
use crate::evaluate::membership_quality;
use crate::input::{index_layers, BaseGraph, InputGraph, Layer, LinkWeightFn, NodeSizeFn};
use crate::moving::{refine_partition, CandidateStrategy, LocalMoving, Objective};
use crate::network::Network;
use crate::partition::{Partition, Relabel};
use crate::quality::{CpmMode, QualityKind};

/// Community renumbering policy applied after each level's move phase.
#[derive(Debug, Clone, Default)]
pub enum PreserveLabels {
    /// Renumber by community size (largest first).
    #[default]
    Renumber,
    /// Keep ascending old-id order.
    Stable,
    /// Order labels by the mapped value of the old community id; unmapped
    /// ids come last.
    Assigned(BTreeMap<usize, usize>),
}

/// Detection options. Defaults follow the documented table.
#[derive(Debug, Clone)]
pub struct Options {
    pub quality: QualityKind,
    /// γ for CPM; modularity ignores it.
    pub resolution: f64,
    pub directed: bool,
    pub random_seed: u64,
    pub candidate_strategy: CandidateStrategy,
    pub allow_new_community: bool,
    /// Upper bound on a community's total size; moves that would exceed it
    /// are skipped.
    pub max_community_size: Option<f64>,
    /// Leiden refinement pass per level.
    pub refine: bool,
    /// Node ids immobile at the finest level.
    pub fixed_nodes: Option<BTreeSet<String>>,
    pub preserve_labels: PreserveLabels,
    pub link_weight: Option<LinkWeightFn>,
    pub node_size: Option<NodeSizeFn>,
    pub max_levels: usize,
    pub max_local_passes: usize,
    /// Penalty flavour reported by `quality()`; the search itself always
    /// optimizes the size-aware form.
    pub cpm_mode: CpmMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            quality: QualityKind::Modularity,
            resolution: 1.0,
            directed: false,
            random_seed: 42,
            candidate_strategy: CandidateStrategy::Neighbors,
            allow_new_community: false,
            max_community_size: None,
            refine: true,
            fixed_nodes: None,
            preserve_labels: PreserveLabels::default(),
            link_weight: None,
            node_size: None,
            max_levels: 50,
            max_local_passes: 20,
            cpm_mode: CpmMode::Unit,
        }
    }
}

impl Options {
    fn to_meta(&self) -> serde_json::Value {
        let preserve_labels = match &self.preserve_labels {
            PreserveLabels::Renumber => json!(false),
            PreserveLabels::Stable => json!(true),
            PreserveLabels::Assigned(map) => {
                let by_label: BTreeMap<String, usize> =
                    map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
                json!(by_label)
            }
        };
        let fixed_nodes = self
            .fixed_nodes
            .as_ref()
            .map(|ids| ids.iter().cloned().collect::<Vec<_>>());
        json!({
            "quality": self.quality.as_str(),
            "resolution": self.resolution,
            "directed": self.directed,
            "randomSeed": self.random_seed,
            "candidateStrategy": self.candidate_strategy.as_str(),
            "allowNewCommunity": self.allow_new_community,
            "maxCommunitySize": self.max_community_size,
            "refine": self.refine,
            "fixedNodes": fixed_nodes,
            "preserveLabels": preserve_labels,
            "maxLevels": self.max_levels,
            "maxLocalPasses": self.max_local_passes,
            "cpmMode": self.cpm_mode.as_str(),
        })
    }

    fn relabel(&self) -> Relabel<'_> {
        match &self.preserve_labels {
            PreserveLabels::Renumber => Relabel::SizeOrdered,
            PreserveLabels::Stable => Relabel::KeepOrder,
            PreserveLabels::Assigned(map) => Relabel::FromMap(map),
        }
    }
}

/// Per-level summary kept for result metadata.
#[derive(Debug, Clone, Copy)]
pub struct LevelSummary {
    pub nodes: usize,
    pub communities: usize,
}

/// Detection result: the final membership over the original nodes.
#[derive(Debug, Clone)]
pub struct Clusters {
    node_ids: Vec<String>,
    index_of: HashMap<String, usize>,
    membership: Vec<usize>,
    community_count: usize,
    quality: f64,
    levels: Vec<LevelSummary>,
    options_meta: serde_json::Value,
}

impl Clusters {
    /// Community id of a node, by its original id.
    pub fn class_of(&self, id: &str) -> Option<usize> {
        self.index_of.get(id).map(|&i| self.membership[i])
    }

    /// Final community id per node, in input node order.
    pub fn membership(&self) -> &[usize] {
        &self.membership
    }

    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    /// Member node ids per community.
    pub fn communities(&self) -> Vec<Vec<&str>> {
        let mut groups = vec![Vec::new(); self.community_count];
        for (i, &c) in self.membership.iter().enumerate() {
            groups[c].push(self.node_ids[i].as_str());
        }
        groups
    }

    pub fn community_count(&self) -> usize {
        self.community_count
    }

    /// Quality of the final membership, evaluated on the finest graph.
    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn levels(&self) -> &[LevelSummary] {
        &self.levels
    }

    /// `{membership, meta: {levels, quality, options}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let membership: serde_json::Map<String, serde_json::Value> = self
            .node_ids
            .iter()
            .zip(&self.membership)
            .map(|(id, &c)| (id.clone(), json!(c)))
            .collect();
        json!({
            "membership": membership,
            "meta": {
                "levels": self.levels.len(),
                "quality": self.quality,
                "options": self.options_meta,
            }
        })
    }
}

/// Detects communities in a single graph.
pub fn detect_clusters(graph: &InputGraph, options: &Options) -> Result<Clusters> {
    let layer = Layer::new(graph);
    detect_clusters_layers(std::slice::from_ref(&layer), None, options)
}

/// Detects communities in a multilayer input. All layers must cover the
/// same node-id set; `node_order`, when given, fixes the dense indexing
/// shared by every layer.
pub fn detect_clusters_layers(
    layers: &[Layer<'_>],
    node_order: Option<&[String]>,
    options: &Options,
) -> Result<Clusters> {
    let base = index_layers(layers, node_order, options.link_weight, options.node_size)?;
    run_detection(base, options)
}

fn run_detection(base: BaseGraph, options: &Options) -> Result<Clusters> {
    if base.edges.iter().any(|&(_, _, w)| w < 0.0) {
        warn!("negative edge weights present; modularity's null model may not apply");
    }

    let fixed_mask = match &options.fixed_nodes {
        Some(ids) => {
            let mut mask = vec![false; base.names.len()];
            for id in ids {
                let index = base.index_of.get(id).ok_or_else(|| {
                    ClusterError::Input(format!("fixed node `{id}` is not in the graph"))
                })?;
                mask[*index] = true;
            }
            Some(mask)
        }
        None => None,
    };

    let base_net = Network::from_weighted_edges(base.sizes, &base.edges, options.directed);
    let mover = LocalMoving {
        objective: Objective {
            kind: options.quality,
            resolution: options.resolution,
        },
        strategy: options.candidate_strategy,
        allow_new_community: options.allow_new_community,
        max_community_size: options.max_community_size,
        max_passes: options.max_local_passes,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(options.random_seed);

    let mut network = base_net.clone();
    let mut original_to_current: Vec<usize> = (0..base_net.node_count()).collect();
    let mut levels = Vec::new();
    let mut final_count = base_net.node_count();

    for level in 0..options.max_levels {
        let mut part = Partition::singletons(&network);
        let fixed = if level == 0 {
            fixed_mask.as_deref()
        } else {
            None
        };
        mover.run(&network, &mut part, &mut rng, fixed, None);
        part.compact(&network, options.relabel());
        if options.refine {
            let mut refined = refine_partition(&network, &part, &mover, &mut rng, fixed);
            refined.compact(&network, options.relabel());
            part = refined;
        }

        levels.push(LevelSummary {
            nodes: network.node_count(),
            communities: part.community_count(),
        });
        for slot in original_to_current.iter_mut() {
            *slot = part.community_of(*slot);
        }
        final_count = part.community_count();
        debug!(
            level,
            nodes = network.node_count(),
            communities = final_count,
            "level complete"
        );

        if part.community_count() == network.node_count() {
            break;
        }
        network = network.aggregate(&part);
    }

    let labels: Vec<i64> = original_to_current.iter().map(|&c| c as i64).collect();
    let quality = membership_quality(
        &base_net,
        &labels,
        options.quality,
        options.resolution,
        options.cpm_mode,
    );

    Ok(Clusters {
        node_ids: base.names,
        index_of: base.index_of,
        membership: original_to_current,
        community_count: final_count,
        quality,
        levels,
        options_meta: options.to_meta(),
    })
}
