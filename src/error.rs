use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors surfaced by graph construction, detection, and evaluation.
///
/// All failures are fail-fast: nothing attempts recovery mid-level.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Malformed or inconsistent input: empty layer lists, mismatched
    /// multilayer node sets, unknown node ids, unparseable graph data.
    #[error("invalid input: {0}")]
    Input(String),

    /// Strict evaluation encountered a node with no community assignment.
    #[error("node `{0}` has no community assignment")]
    MissingMembership(String),

    /// An option value outside the accepted set.
    #[error("unknown value `{value}` for option `{option}`")]
    UnknownOption {
        option: &'static str,
        value: String,
    },
}
