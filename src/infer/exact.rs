//! Exact inference by enumerating every joint assignment.
//!
//! Exponential in the number of unobserved nodes, so the variable count is
//! capped. Intended for single-object scenes, tests, and checking the loopy
//! solver.

use crate::error::InferError;
use crate::graph::IntentionNetwork;

use super::{normalized, BeliefSolver, Beliefs, InferResult, InferenceMode};

/// Default cap on free (unobserved) variables.
pub const DEFAULT_MAX_VARIABLES: usize = 20;

/// Brute-force enumeration solver.
#[derive(Debug, Clone)]
pub struct ExactSolver {
    mode: InferenceMode,
    max_variables: usize,
}

impl Default for ExactSolver {
    fn default() -> Self {
        Self::new(InferenceMode::SumProduct, DEFAULT_MAX_VARIABLES)
    }
}

impl ExactSolver {
    pub fn new(mode: InferenceMode, max_variables: usize) -> Self {
        Self {
            mode,
            max_variables,
        }
    }
}

impl BeliefSolver for ExactSolver {
    fn name(&self) -> &str {
        "exact"
    }

    fn solve(&self, network: &IntentionNetwork) -> InferResult<Beliefs> {
        let mut labels = Vec::with_capacity(network.node_count());
        let mut state = Vec::with_capacity(network.node_count());
        let mut free = Vec::new();
        for (idx, node) in network.nodes() {
            labels.push(node.label.clone());
            state.push(node.evidence.unwrap_or(false));
            if node.evidence.is_none() {
                free.push(idx.index());
            }
        }
        if free.len() > self.max_variables {
            return Err(InferError::TooLarge {
                variables: free.len(),
                max: self.max_variables,
            });
        }

        let mut edges = Vec::with_capacity(network.potential_count());
        for (edge, potential) in network.potentials() {
            let (first, second) = network.endpoints(edge)?;
            edges.push((first.index(), second.index(), potential.table));
        }

        let combine = |acc: &mut f64, w: f64| match self.mode {
            InferenceMode::SumProduct => *acc += w,
            InferenceMode::MaxProduct => *acc = acc.max(w),
        };

        let mut node_acc = vec![[0.0f64; 2]; labels.len()];
        let mut pair_acc = vec![[0.0f64; 4]; edges.len()];

        for mask in 0u64..(1u64 << free.len()) {
            for (bit, &node) in free.iter().enumerate() {
                state[node] = mask & (1 << bit) != 0;
            }

            let weight: f64 = edges
                .iter()
                .map(|&(a, b, table)| table[state[a] as usize + 2 * state[b] as usize])
                .product();
            if weight == 0.0 {
                continue;
            }

            for (node, acc) in node_acc.iter_mut().enumerate() {
                combine(&mut acc[state[node] as usize], weight);
            }
            for (&(a, b, _), acc) in edges.iter().zip(pair_acc.iter_mut()) {
                combine(&mut acc[state[a] as usize + 2 * state[b] as usize], weight);
            }
        }

        let nodes = node_acc
            .into_iter()
            .enumerate()
            .map(|(node, acc)| {
                normalized(acc).ok_or_else(|| InferError::Degenerate {
                    node: labels[node].clone(),
                })
            })
            .collect::<InferResult<Vec<_>>>()?;
        let pairs = pair_acc
            .into_iter()
            .zip(&edges)
            .map(|(acc, &(a, _, _))| {
                normalized(acc).ok_or_else(|| InferError::Degenerate {
                    node: labels[a].clone(),
                })
            })
            .collect::<InferResult<Vec<_>>>()?;

        tracing::debug!(
            solver = self.name(),
            free = free.len(),
            "beliefs enumerated"
        );
        Ok(Beliefs::new(nodes, pairs, 1, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AffordanceCatalog, Category};
    use crate::graph::SceneGraphBuilder;
    use crate::scene::Scene;
    use crate::store::{CompatibilityStore, CooccurrenceCounts};

    #[test]
    fn rejects_networks_over_the_cap() {
        let catalog = AffordanceCatalog::standard();
        let store = CompatibilityStore::new(&catalog, 1.0);
        let mut counts = CooccurrenceCounts::new();
        let graph = SceneGraphBuilder::new(&catalog, &store)
            .build(&Scene::one_of_each(), &mut counts)
            .unwrap();
        let err = ExactSolver::default().solve(&graph.network).unwrap_err();
        assert!(matches!(err, InferError::TooLarge { max: 20, .. }));
    }

    #[test]
    fn proximity_marginal_matches_far_ratio() {
        let catalog = AffordanceCatalog::standard();
        let store = CompatibilityStore::new(&catalog, 1.0);
        let mut counts = CooccurrenceCounts::new();
        let graph = SceneGraphBuilder::new(&catalog, &store)
            .build(&Scene::from_pairs([("Box", 0.3), ("Carton", 0.3)]), &mut counts)
            .unwrap();
        let beliefs = ExactSolver::default().solve(&graph.network).unwrap();
        let boxed = graph.book.instance_named("Box1").unwrap();
        assert!((beliefs.node(boxed.object).unwrap() - 1.0).abs() < 1e-12);
        assert!((beliefs.node(boxed.proximity).unwrap() - 0.3 / 0.32).abs() < 1e-12);
        assert_eq!(graph.book.instances_of(Category::Carton).len(), 1);
    }
}
