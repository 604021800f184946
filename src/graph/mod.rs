//! Intention network: the pairwise binary model built for one scene.
//!
//! Every node is a binary variable:
//!
//! - **Action** nodes: "the person intends to perform this action"; one per
//!   distinct action in the scene, shared by every instance that affords it
//! - **Object** nodes: "the person intends to use this instance"
//! - **Proximity** nodes: the instance's closeness to the observer
//!
//! Every edge carries a [`Potential`]: a 4-entry table over the joint state
//! of its two endpoints. The table is indexed `first + 2 * second`, where
//! `first` and `second` are the endpoints in the order the edge was added.
//! Object-action edges always put the object first, so their tables line up
//! with [`CompatibilityCell`](crate::store::CompatibilityCell).

pub mod builder;
pub mod network;

use serde::{Deserialize, Serialize};

use crate::catalog::{Action, Category};

pub use builder::{InstanceInfo, SceneBook, SceneGraph, SceneGraphBuilder};
pub use network::{GraphResult, IntentionNetwork};
pub use petgraph::graph::{EdgeIndex, NodeIndex};

/// What a network node stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Action(Action),
    Object { category: Category, instance: String },
    /// Proximity of the object node at the given graph index.
    Proximity { object: usize },
}

/// A binary variable in the intention network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Human-readable label: the action name, the instance name, or
    /// `"<instance> distance"`.
    pub label: String,
    pub kind: NodeKind,
    /// Hard evidence clamping this variable, if observed.
    pub evidence: Option<bool>,
}

impl Node {
    pub fn action(&self) -> Option<Action> {
        match self.kind {
            NodeKind::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self.kind {
            NodeKind::Object { category, .. } => Some(category),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, NodeKind::Object { .. })
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, NodeKind::Action(_))
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.evidence {
            Some(state) => write!(f, "{} = {}", self.label, state as u8),
            None => f.write_str(&self.label),
        }
    }
}

/// What an edge potential encodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PotentialKind {
    /// Learned object-action compatibility, copied from the template store.
    Compatibility { category: Category, action: Action },
    /// Object-proximity coupling derived from the observed distance.
    Proximity { ratio: f64, near: bool },
}

/// A pairwise potential table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Potential {
    pub kind: PotentialKind,
    pub table: [f64; 4],
}

impl Potential {
    /// Value for the joint state of the two endpoints.
    pub fn value(&self, first: bool, second: bool) -> f64 {
        self.table[first as usize + 2 * second as usize]
    }

    /// The (category, action) pair of a compatibility potential.
    pub fn pair(&self) -> Option<(Category, Action)> {
        match self.kind {
            PotentialKind::Compatibility { category, action } => Some((category, action)),
            PotentialKind::Proximity { .. } => None,
        }
    }

    pub fn is_compatibility(&self) -> bool {
        self.pair().is_some()
    }

    /// Near/far proximity table for `ratio = distance / max_distance`.
    pub fn proximity(ratio: f64, near: bool) -> Self {
        let table = if near {
            [1.0 - ratio, ratio, ratio, 1.0 - ratio]
        } else {
            [ratio, 1.0 - ratio, 1.0 - ratio, ratio]
        };
        Self {
            kind: PotentialKind::Proximity { ratio, near },
            table,
        }
    }
}

impl std::fmt::Display for Potential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.table;
        match self.kind {
            PotentialKind::Compatibility { category, action } => {
                write!(f, "{action}|{category} [{a:.3} {b:.3} {c:.3} {d:.3}]")
            }
            PotentialKind::Proximity { near, .. } => {
                let tag = if near { "near" } else { "far" };
                write!(f, "{tag} [{a:.3} {b:.3} {c:.3} {d:.3}]")
            }
        }
    }
}
