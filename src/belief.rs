//! Belief extraction: per-action, per-object and per-pair scores for a
//! built scene.
//!
//! Scores come either from a solver ([`BeliefLists::from_beliefs`]) or from
//! running co-occurrence counts ([`BeliefLists::from_counts`]). Neither path
//! touches the network or the bookkeeping.

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::catalog::{Action, Category};
use crate::error::GraphError;
use crate::graph::{GraphResult, IntentionNetwork, NodeKind};
use crate::infer::Beliefs;
use crate::store::CooccurrenceCounts;

/// Where candidate scores come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefSource {
    /// Solver marginals.
    #[default]
    Inferred,
    /// Co-occurrence frequencies.
    Frequency,
    /// Every candidate scores the same.
    Uniform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionBelief {
    pub node: NodeIndex,
    pub action: Action,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBelief {
    pub node: NodeIndex,
    pub category: Category,
    pub name: String,
    pub score: f64,
}

/// Belief in one object-action potential.
#[derive(Debug, Clone, PartialEq)]
pub struct PairBelief {
    pub potential: EdgeIndex,
    pub object: ObjectBelief,
    pub action: ActionBelief,
    pub score: f64,
}

/// Scores for every action node, object node and object-action potential,
/// in network index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeliefLists {
    pub actions: Vec<ActionBelief>,
    pub objects: Vec<ObjectBelief>,
    pub pairs: Vec<PairBelief>,
}

impl BeliefLists {
    /// Score with solver output: P(node = 1) and P(1, 1).
    pub fn from_beliefs(network: &IntentionNetwork, beliefs: &Beliefs) -> GraphResult<Self> {
        Self::collect(
            network,
            |idx, _| {
                beliefs
                    .node(idx)
                    .ok_or(GraphError::NodeNotFound { index: idx.index() })
            },
            |idx, _| {
                beliefs
                    .node(idx)
                    .ok_or(GraphError::NodeNotFound { index: idx.index() })
            },
            |edge| {
                beliefs
                    .pair(edge)
                    .ok_or(GraphError::NodeNotFound { index: edge.index() })
            },
        )
    }

    /// Score with co-occurrence frequencies.
    ///
    /// Actions score `count(action) / total`, objects `count(category) / total`
    /// and every pair `1 / total`. An empty table scores everything zero.
    pub fn from_counts(network: &IntentionNetwork, counts: &CooccurrenceCounts) -> GraphResult<Self> {
        let total = counts.total();
        let pair_score = if total == 0 { 0.0 } else { 1.0 / total as f64 };
        Self::collect(
            network,
            |_, kind| match kind {
                NodeKind::Action(action) => Ok(counts.action_frequency(*action)),
                _ => Ok(0.0),
            },
            |_, kind| match kind {
                NodeKind::Object { category, .. } => Ok(counts.category_frequency(*category)),
                _ => Ok(0.0),
            },
            |_| Ok(pair_score),
        )
    }

    /// Score every candidate `score`.
    pub fn uniform(network: &IntentionNetwork, score: f64) -> GraphResult<Self> {
        Self::collect(network, |_, _| Ok(score), |_, _| Ok(score), |_| Ok(score))
    }

    fn collect(
        network: &IntentionNetwork,
        action_score: impl Fn(NodeIndex, &NodeKind) -> GraphResult<f64>,
        object_score: impl Fn(NodeIndex, &NodeKind) -> GraphResult<f64>,
        pair_score: impl Fn(EdgeIndex) -> GraphResult<f64>,
    ) -> GraphResult<Self> {
        let mut lists = Self::default();

        for (idx, node) in network.nodes() {
            match &node.kind {
                NodeKind::Action(action) => lists.actions.push(ActionBelief {
                    node: idx,
                    action: *action,
                    score: action_score(idx, &node.kind)?,
                }),
                NodeKind::Object { category, instance } => lists.objects.push(ObjectBelief {
                    node: idx,
                    category: *category,
                    name: instance.clone(),
                    score: object_score(idx, &node.kind)?,
                }),
                NodeKind::Proximity { .. } => {}
            }
        }

        for (edge, potential) in network.compatibility_potentials() {
            let (object_node, action_node) = network.endpoints(edge)?;
            let object = lists
                .objects
                .iter()
                .find(|o| o.node == object_node)
                .cloned()
                .ok_or(GraphError::NodeNotFound {
                    index: object_node.index(),
                })?;
            let action = lists
                .actions
                .iter()
                .find(|a| a.node == action_node)
                .cloned()
                .ok_or(GraphError::NodeNotFound {
                    index: action_node.index(),
                })?;
            debug_assert_eq!(potential.pair(), Some((object.category, action.action)));
            lists.pairs.push(PairBelief {
                potential: edge,
                object,
                action,
                score: pair_score(edge)?,
            });
        }

        Ok(lists)
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.actions.len() + self.objects.len() + self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
