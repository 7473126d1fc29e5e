//! Multi-level community detection for weighted graphs.
//!
//! Implements the Louvain method with an optional Leiden-style refinement
//! pass, over three quality objectives: undirected modularity, directed
//! (Leicht–Newman) modularity, and the Constant Potts Model with a
//! resolution parameter. Supports fixed nodes, size-bounded communities,
//! and multilayer input aggregated by weighted edge summation.
//!
//! Detection is single-threaded and fully deterministic: the same graph,
//! options, and seed always produce bit-identical memberships.
//!
//! ```
//! use graph_communities::{detect_clusters, InputGraph, Options};
//!
//! let mut graph = InputGraph::default();
//! for (a, b) in [("a", "b"), ("b", "c"), ("a", "c"), ("d", "e"), ("e", "f"), ("d", "f")] {
//!     graph.add_link(a, b, 1.0);
//! }
//! graph.add_link("c", "d", 0.2);
//!
//! let clusters = detect_clusters(&graph, &Options::default()).unwrap();
//! assert_eq!(clusters.community_count(), 2);
//! assert_eq!(clusters.class_of("a"), clusters.class_of("b"));
//! ```

pub mod detect;
pub mod error;
pub mod evaluate;
pub mod input;
pub mod io;
pub mod moving;
pub mod network;
pub mod partition;
pub mod quality;

pub use detect::{
    detect_clusters, detect_clusters_layers, Clusters, LevelSummary, Options, PreserveLabels,
};
pub use error::{ClusterError, Result};
pub use evaluate::{evaluate_quality, MembershipLabel};
pub use input::{InputGraph, InputLink, InputNode, Layer, LinkWeightFn, NodeSizeFn};
pub use moving::CandidateStrategy;
pub use quality::{CpmMode, QualityKind};
