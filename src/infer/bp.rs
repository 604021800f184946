//! Loopy belief propagation for pairwise binary networks.
//!
//! Messages are updated sequentially in edge order, each one normalized, until
//! the largest change in a sweep drops below the tolerance or the sweep cap is
//! reached. On tree-shaped networks (a single instance) the result is exact.

use crate::error::InferError;
use crate::graph::IntentionNetwork;

use super::{
    evidence_factor, normalized, BeliefSolver, Beliefs, InferResult, InferenceMode, SolverConfig,
};

/// Sum-product (or max-product) message passing.
#[derive(Debug, Clone, Default)]
pub struct LoopyBeliefPropagation {
    config: SolverConfig,
}

impl LoopyBeliefPropagation {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

/// Flattened view of a network: unary factors, edges, and incidence lists.
struct Layout {
    labels: Vec<String>,
    unary: Vec<[f64; 2]>,
    /// `(first, second, table)` per edge.
    edges: Vec<(usize, usize, [f64; 4])>,
    /// Per node: `(edge, node_is_first)`.
    incident: Vec<Vec<(usize, bool)>>,
}

impl Layout {
    fn new(network: &IntentionNetwork) -> InferResult<Self> {
        let mut labels = Vec::with_capacity(network.node_count());
        let mut unary = Vec::with_capacity(network.node_count());
        for (_, node) in network.nodes() {
            labels.push(node.label.clone());
            unary.push(evidence_factor(node.evidence));
        }

        let mut edges = Vec::with_capacity(network.potential_count());
        let mut incident = vec![Vec::new(); labels.len()];
        for (edge, potential) in network.potentials() {
            let (first, second) = network.endpoints(edge)?;
            let e = edges.len();
            incident[first.index()].push((e, true));
            incident[second.index()].push((e, false));
            edges.push((first.index(), second.index(), potential.table));
        }

        Ok(Self {
            labels,
            unary,
            edges,
            incident,
        })
    }
}

/// `messages[e][0]` flows first → second, `messages[e][1]` second → first.
type Messages = Vec<[[f64; 2]; 2]>;

fn incoming(messages: &Messages, edge: usize, node_is_first: bool) -> [f64; 2] {
    if node_is_first {
        messages[edge][1]
    } else {
        messages[edge][0]
    }
}

/// Unary factor times every incoming message except the one along `skip`.
fn cavity(layout: &Layout, messages: &Messages, node: usize, skip: Option<usize>) -> [f64; 2] {
    let mut acc = layout.unary[node];
    for &(edge, is_first) in &layout.incident[node] {
        if Some(edge) == skip {
            continue;
        }
        let m = incoming(messages, edge, is_first);
        acc[0] *= m[0];
        acc[1] *= m[1];
    }
    acc
}

impl LoopyBeliefPropagation {
    fn combine(&self, a: f64, b: f64) -> f64 {
        match self.config.mode {
            InferenceMode::SumProduct => a + b,
            InferenceMode::MaxProduct => a.max(b),
        }
    }

    /// Recompute the message leaving `source` along `edge`; returns the change.
    fn update(
        &self,
        layout: &Layout,
        messages: &mut Messages,
        edge: usize,
        source_is_first: bool,
    ) -> InferResult<f64> {
        let (first, second, table) = layout.edges[edge];
        let source = if source_is_first { first } else { second };
        let cav = cavity(layout, messages, source, Some(edge));

        let mut out = [0.0; 2];
        for (target_state, slot) in out.iter_mut().enumerate() {
            let term = |source_state: usize| {
                let idx = if source_is_first {
                    source_state + 2 * target_state
                } else {
                    target_state + 2 * source_state
                };
                cav[source_state] * table[idx]
            };
            *slot = self.combine(term(0), term(1));
        }

        let fresh = normalized(out).ok_or_else(|| InferError::Degenerate {
            node: layout.labels[source].clone(),
        })?;

        let dir = if source_is_first { 0 } else { 1 };
        let old = messages[edge][dir];
        let alpha = self.config.damping;
        let damped = if alpha > 0.0 {
            normalized([
                (1.0 - alpha) * fresh[0] + alpha * old[0],
                (1.0 - alpha) * fresh[1] + alpha * old[1],
            ])
            .unwrap_or(fresh)
        } else {
            fresh
        };

        messages[edge][dir] = damped;
        Ok((damped[0] - old[0]).abs().max((damped[1] - old[1]).abs()))
    }
}

impl BeliefSolver for LoopyBeliefPropagation {
    fn name(&self) -> &str {
        "loopy-bp"
    }

    fn solve(&self, network: &IntentionNetwork) -> InferResult<Beliefs> {
        let layout = Layout::new(network)?;
        let mut messages: Messages = vec![[[0.5, 0.5]; 2]; layout.edges.len()];

        let mut iterations = 0;
        let mut converged = layout.edges.is_empty();
        while !converged && iterations < self.config.max_iterations {
            iterations += 1;
            let mut delta: f64 = 0.0;
            for edge in 0..layout.edges.len() {
                delta = delta.max(self.update(&layout, &mut messages, edge, true)?);
                delta = delta.max(self.update(&layout, &mut messages, edge, false)?);
            }
            converged = delta < self.config.tolerance;
        }

        if !converged {
            tracing::warn!(
                iterations,
                tolerance = self.config.tolerance,
                "belief propagation did not converge"
            );
        }

        let mut nodes = Vec::with_capacity(layout.unary.len());
        for node in 0..layout.unary.len() {
            let belief = normalized(cavity(&layout, &messages, node, None)).ok_or_else(|| {
                InferError::Degenerate {
                    node: layout.labels[node].clone(),
                }
            })?;
            nodes.push(belief);
        }

        let mut pairs = Vec::with_capacity(layout.edges.len());
        for (edge, &(first, second, table)) in layout.edges.iter().enumerate() {
            let a = cavity(&layout, &messages, first, Some(edge));
            let b = cavity(&layout, &messages, second, Some(edge));
            let joint = [
                a[0] * b[0] * table[0],
                a[1] * b[0] * table[1],
                a[0] * b[1] * table[2],
                a[1] * b[1] * table[3],
            ];
            let joint = normalized(joint).ok_or_else(|| InferError::Degenerate {
                node: layout.labels[first].clone(),
            })?;
            pairs.push(joint);
        }

        tracing::debug!(
            solver = self.name(),
            iterations,
            converged,
            nodes = nodes.len(),
            "beliefs computed"
        );
        Ok(Beliefs::new(nodes, pairs, iterations, converged))
    }
}
