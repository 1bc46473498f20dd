use thiserror::Error;

/// Errors surfaced by graph construction and decoding.
///
/// Invariant violations inside the engine (negative radius, time running
/// backwards, a same-region interaction reaching the dispatcher) are bugs,
/// not conditions, and panic with context instead of appearing here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchingError {
    #[error("node {node} exceeds the number of nodes in the graph ({num_nodes})")]
    InvalidNodeIndex { node: usize, num_nodes: usize },

    #[error("decode called before any edges were added to the graph")]
    GraphNotInitialized,

    #[error("no perfect matching: odd number of detection events with no reachable boundary")]
    NoPerfectMatching,

    #[error("graph has {num_observables} observables but masks are limited to 64 bits")]
    TooManyObservables { num_observables: usize },

    #[error("detector error model: {0}")]
    Dem(#[from] DemError),
}

/// Errors from parsing detector-error-model text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemError {
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("invalid probability: {0}")]
    InvalidProbability(String),

    #[error("invalid detector id: {0}")]
    InvalidDetectorId(String),

    #[error("invalid observable id: {0}")]
    InvalidObservableId(String),

    #[error("unbalanced braces in repeat block")]
    UnbalancedRepeat,
}
