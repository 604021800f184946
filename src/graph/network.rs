//! Arena-backed intention network.
//!
//! Uses a `petgraph` undirected graph for the structure and a hash map for
//! action-node de-duplication.

use std::collections::HashMap;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};

use crate::catalog::{Action, Category};
use crate::error::GraphError;

use super::{Node, NodeKind, Potential};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Pairwise binary network over action, object and proximity variables.
///
/// Node and edge indices are stable for the life of the network; nothing is
/// ever removed.
#[derive(Debug, Clone, Default)]
pub struct IntentionNetwork {
    graph: UnGraph<Node, Potential>,
    /// Action → its unique node.
    action_index: HashMap<Action, NodeIndex>,
}

impl IntentionNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the node for `action`, creating it on first use.
    pub fn add_action(&mut self, action: Action) -> NodeIndex {
        if let Some(&idx) = self.action_index.get(&action) {
            return idx;
        }
        let idx = self.graph.add_node(Node {
            label: action.name().to_string(),
            kind: NodeKind::Action(action),
            evidence: None,
        });
        self.action_index.insert(action, idx);
        idx
    }

    /// Node for `action`, if the network has one.
    pub fn action_node(&self, action: Action) -> Option<NodeIndex> {
        self.action_index.get(&action).copied()
    }

    /// Add an object-instance node.
    pub fn add_object(&mut self, category: Category, instance: impl Into<String>) -> NodeIndex {
        let instance = instance.into();
        self.graph.add_node(Node {
            label: instance.clone(),
            kind: NodeKind::Object { category, instance },
            evidence: None,
        })
    }

    /// Add the proximity node for an existing object node.
    pub fn add_proximity(&mut self, object: NodeIndex) -> GraphResult<NodeIndex> {
        let label = format!("{} distance", self.node(object)?.label);
        Ok(self.graph.add_node(Node {
            label,
            kind: NodeKind::Proximity {
                object: object.index(),
            },
            evidence: None,
        }))
    }

    /// Connect two nodes with a potential. `first` is the low bit of the
    /// table index.
    pub fn add_potential(
        &mut self,
        first: NodeIndex,
        second: NodeIndex,
        potential: Potential,
    ) -> GraphResult<EdgeIndex> {
        self.node(first)?;
        self.node(second)?;
        Ok(self.graph.add_edge(first, second, potential))
    }

    pub fn node(&self, idx: NodeIndex) -> GraphResult<&Node> {
        self.graph
            .node_weight(idx)
            .ok_or(GraphError::NodeNotFound { index: idx.index() })
    }

    pub fn potential(&self, edge: EdgeIndex) -> GraphResult<&Potential> {
        self.graph
            .edge_weight(edge)
            .ok_or(GraphError::NodeNotFound { index: edge.index() })
    }

    /// `(first, second)` endpoints of a potential, in insertion order.
    pub fn endpoints(&self, edge: EdgeIndex) -> GraphResult<(NodeIndex, NodeIndex)> {
        self.graph
            .edge_endpoints(edge)
            .ok_or(GraphError::NodeNotFound { index: edge.index() })
    }

    /// Replace the table of an existing potential.
    pub fn set_table(&mut self, edge: EdgeIndex, table: [f64; 4]) -> GraphResult<()> {
        let potential = self
            .graph
            .edge_weight_mut(edge)
            .ok_or(GraphError::NodeNotFound { index: edge.index() })?;
        potential.table = table;
        Ok(())
    }

    /// Clamp a node to an observed state.
    pub fn observe(&mut self, idx: NodeIndex, state: bool) -> GraphResult<()> {
        let node = self
            .graph
            .node_weight_mut(idx)
            .ok_or(GraphError::NodeNotFound { index: idx.index() })?;
        node.evidence = Some(state);
        tracing::debug!(node = %node.label, state, "evidence observed");
        Ok(())
    }

    /// Remove evidence from one node.
    pub fn clear_evidence(&mut self, idx: NodeIndex) -> GraphResult<()> {
        let node = self
            .graph
            .node_weight_mut(idx)
            .ok_or(GraphError::NodeNotFound { index: idx.index() })?;
        node.evidence = None;
        Ok(())
    }

    /// Remove evidence from every node.
    pub fn clear_all_evidence(&mut self) {
        for node in self.graph.node_weights_mut() {
            node.evidence = None;
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn potential_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Action nodes in index order.
    pub fn action_nodes(&self) -> impl Iterator<Item = (NodeIndex, Action)> + '_ {
        self.nodes().filter_map(|(idx, n)| n.action().map(|a| (idx, a)))
    }

    /// Object nodes in index order.
    pub fn object_nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes().filter(|(_, n)| n.is_object())
    }

    /// All potentials in index order.
    pub fn potentials(&self) -> impl Iterator<Item = (EdgeIndex, &Potential)> {
        self.graph
            .edge_indices()
            .map(move |edge| (edge, &self.graph[edge]))
    }

    /// Object-action potentials in index order.
    pub fn compatibility_potentials(&self) -> impl Iterator<Item = (EdgeIndex, &Potential)> {
        self.potentials().filter(|(_, p)| p.is_compatibility())
    }

    /// Graphviz DOT rendering.
    pub fn to_dot(&self) -> String {
        let body = Dot::with_config(&self.graph, &[Config::GraphContentOnly]);
        format!("graph intention {{\n{body}}}\n")
    }
}
