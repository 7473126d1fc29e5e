//! Quality objectives and their per-community closed forms.
//!
//! Both the mutable partition and the edge-scan evaluator reduce a
//! community to a [`CommunityAggregate`] and sum [`community_term`] over
//! all communities, so the two paths cannot drift apart.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Objective maximized by the local-move search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityKind {
    /// Newman modularity (Leicht–Newman variant on directed graphs).
    Modularity,
    /// Constant Potts Model with a resolution parameter.
    Cpm,
}

impl QualityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityKind::Modularity => "modularity",
            QualityKind::Cpm => "cpm",
        }
    }
}

impl FromStr for QualityKind {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modularity" => Ok(QualityKind::Modularity),
            "cpm" => Ok(QualityKind::Cpm),
            other => Err(ClusterError::UnknownOption {
                option: "quality",
                value: other.to_string(),
            }),
        }
    }
}

/// Penalty flavour reported by CPM quality. The local-move deltas always
/// optimize the size-aware form; with unit node sizes the two coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpmMode {
    #[serde(rename = "unit")]
    Unit,
    #[serde(rename = "size-aware")]
    SizeAware,
}

impl CpmMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CpmMode::Unit => "unit",
            CpmMode::SizeAware => "size-aware",
        }
    }
}

impl FromStr for CpmMode {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unit" => Ok(CpmMode::Unit),
            "size-aware" => Ok(CpmMode::SizeAware),
            other => Err(ClusterError::UnknownOption {
                option: "cpmMode",
                value: other.to_string(),
            }),
        }
    }
}

/// Accumulated view of one community.
///
/// `internal_weight` follows the storage convention of the partition:
/// undirected internal pairs contribute twice (once per stored direction),
/// directed internal edges once, member self-loops once in both modes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommunityAggregate {
    pub internal_weight: f64,
    pub out_strength: f64,
    pub in_strength: f64,
    pub node_count: usize,
    pub total_size: f64,
}

/// Contribution of one community to the global quality.
pub fn community_term(
    agg: &CommunityAggregate,
    kind: QualityKind,
    directed: bool,
    resolution: f64,
    cpm_mode: CpmMode,
    total_weight: f64,
) -> f64 {
    match kind {
        QualityKind::Modularity => {
            let m = total_weight;
            if m == 0.0 {
                return 0.0;
            }
            if directed {
                agg.internal_weight / m - (agg.out_strength * agg.in_strength) / (m * m)
            } else {
                let d = agg.out_strength / m;
                agg.internal_weight / m - d * d
            }
        }
        QualityKind::Cpm => {
            let penalty = match cpm_mode {
                CpmMode::Unit => {
                    let n = agg.node_count as f64;
                    n * (n - 1.0) / 2.0
                }
                CpmMode::SizeAware => agg.total_size * (agg.total_size - 1.0) / 2.0,
            };
            agg.internal_weight - resolution * penalty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modularity_zero_weight_graph_scores_zero() {
        let agg = CommunityAggregate {
            node_count: 3,
            total_size: 3.0,
            ..Default::default()
        };
        let q = community_term(&agg, QualityKind::Modularity, false, 1.0, CpmMode::Unit, 0.0);
        assert_eq!(q, 0.0);
    }

    #[test]
    fn cpm_unit_and_size_aware_agree_for_unit_sizes() {
        let agg = CommunityAggregate {
            internal_weight: 6.0,
            node_count: 4,
            total_size: 4.0,
            ..Default::default()
        };
        let unit = community_term(&agg, QualityKind::Cpm, false, 0.5, CpmMode::Unit, 13.0);
        let sized = community_term(&agg, QualityKind::Cpm, false, 0.5, CpmMode::SizeAware, 13.0);
        assert_eq!(unit, sized);
        assert_eq!(unit, 6.0 - 0.5 * 6.0);
    }

    #[test]
    fn option_values_parse() {
        assert_eq!("cpm".parse::<QualityKind>().unwrap(), QualityKind::Cpm);
        assert_eq!("size-aware".parse::<CpmMode>().unwrap(), CpmMode::SizeAware);
        assert!("potts".parse::<QualityKind>().is_err());
    }
}
