//! Probabilistic inference over intention networks.
//!
//! The rest of the crate only sees the [`BeliefSolver`] trait: given a
//! network, return P(node = 1) for every node and the joint (1,1) probability
//! for every potential. Two solvers ship with the crate:
//!
//! - [`LoopyBeliefPropagation`]: message passing, works at any scene size
//! - [`ExactSolver`]: brute-force enumeration, for small networks and tests
//!
//! Scores default to sum-product marginals. Set `mode = "max_product"` to rank
//! by max-marginals instead; that reproduces the ordering of MAP-style
//! recognizers that run max-product belief propagation.

pub mod bp;
pub mod exact;

use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::InferError;
use crate::graph::IntentionNetwork;

pub use bp::LoopyBeliefPropagation;
pub use exact::ExactSolver;

/// Result type for inference operations.
pub type InferResult<T> = std::result::Result<T, InferError>;

/// Semiring used to combine messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Marginal probabilities.
    #[default]
    SumProduct,
    /// Normalized max-marginals, as used for MAP-style ranking.
    MaxProduct,
}

/// Which built-in solver to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    #[default]
    Loopy,
    Exact,
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub kind: SolverKind,
    pub mode: InferenceMode,
    /// Largest message change still counted as converged.
    pub tolerance: f64,
    /// Sweep cap for loopy propagation.
    pub max_iterations: usize,
    /// Weight of the previous message in each update, in `[0, 1)`.
    pub damping: f64,
    /// Free-variable cap for exact enumeration.
    pub max_exact_variables: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::default(),
            mode: InferenceMode::default(),
            tolerance: 1e-8,
            max_iterations: 10_000,
            damping: 0.0,
            max_exact_variables: exact::DEFAULT_MAX_VARIABLES,
        }
    }
}

impl SolverConfig {
    /// Instantiate the configured solver.
    pub fn build(&self) -> Box<dyn BeliefSolver> {
        match self.kind {
            SolverKind::Loopy => Box::new(LoopyBeliefPropagation::new(self.clone())),
            SolverKind::Exact => Box::new(ExactSolver::new(self.mode, self.max_exact_variables)),
        }
    }
}

/// Solved beliefs for one network.
///
/// Indexed by the network's node and edge indices; only valid for the network
/// (and evidence) they were computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Beliefs {
    nodes: Vec<[f64; 2]>,
    pairs: Vec<[f64; 4]>,
    /// Sweeps performed (1 for exact enumeration).
    pub iterations: usize,
    /// Whether messages settled within tolerance.
    pub converged: bool,
}

impl Beliefs {
    pub fn new(nodes: Vec<[f64; 2]>, pairs: Vec<[f64; 4]>, iterations: usize, converged: bool) -> Self {
        Self {
            nodes,
            pairs,
            iterations,
            converged,
        }
    }

    /// P(node = 1).
    pub fn node(&self, idx: NodeIndex) -> Option<f64> {
        self.nodes.get(idx.index()).map(|m| m[1])
    }

    /// Full node marginal `[P(0), P(1)]`.
    pub fn node_marginal(&self, idx: NodeIndex) -> Option<[f64; 2]> {
        self.nodes.get(idx.index()).copied()
    }

    /// Joint P(first = 1, second = 1) for a potential.
    pub fn pair(&self, edge: EdgeIndex) -> Option<f64> {
        self.pairs.get(edge.index()).map(|m| m[3])
    }

    /// Full joint marginal of a potential, indexed `first + 2 * second`.
    pub fn pair_marginal(&self, edge: EdgeIndex) -> Option<[f64; 4]> {
        self.pairs.get(edge.index()).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

/// A discrete solver for pairwise binary networks.
///
/// Implementations must honour node evidence and may be called repeatedly on
/// the same network after potentials or evidence change.
pub trait BeliefSolver: Send + Sync {
    /// Human-readable name for diagnostics and tracing.
    fn name(&self) -> &str;

    /// Solve the network.
    fn solve(&self, network: &IntentionNetwork) -> InferResult<Beliefs>;
}

impl fmt::Debug for dyn BeliefSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeliefSolver({})", self.name())
    }
}

/// Unary factor implied by a node's evidence.
pub(crate) fn evidence_factor(evidence: Option<bool>) -> [f64; 2] {
    match evidence {
        None => [1.0, 1.0],
        Some(false) => [1.0, 0.0],
        Some(true) => [0.0, 1.0],
    }
}

/// Scale to unit sum; `None` when there is no mass.
pub(crate) fn normalized<const N: usize>(values: [f64; N]) -> Option<[f64; N]> {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        Some(values.map(|v| v / sum))
    } else {
        None
    }
}
