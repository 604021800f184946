//! Export types for serializing engine state.
//!
//! These types provide human-readable, label-resolved representations of
//! templates, candidates and networks suitable for JSON export.

use serde::{Deserialize, Serialize};

use crate::graph::{IntentionNetwork, NodeKind, PotentialKind};
use crate::infer::Beliefs;
use crate::query::QueryCandidate;
use crate::store::CompatibilityStore;

/// Exported template cell, normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellExport {
    pub category: String,
    pub action: String,
    /// Values in joint-state order (0,0), (1,0), (0,1), (1,1).
    pub values: [f64; 4],
}

impl CellExport {
    /// Every cell of a store, in index order.
    pub fn from_store(store: &CompatibilityStore) -> Vec<Self> {
        store
            .iter()
            .map(|(category, action, cell)| Self {
                category: category.to_string(),
                action: action.to_string(),
                values: cell.normalized(),
            })
            .collect()
    }
}

/// Exported query candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateExport {
    pub id: usize,
    /// `action`, `object`, or `full`.
    pub kind: String,
    pub question: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Instance name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

impl From<&QueryCandidate> for CandidateExport {
    fn from(c: &QueryCandidate) -> Self {
        Self {
            id: c.id,
            kind: c.kind().to_string(),
            question: c.question(),
            score: c.score,
            action: c.action().map(|a| a.action.to_string()),
            object: c.object().map(|o| o.name.clone()),
        }
    }
}

/// Exported network node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExport {
    pub index: usize,
    pub label: String,
    /// `action`, `object`, or `proximity`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<bool>,
    /// P(node = 1), when beliefs were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub belief: Option<f64>,
}

/// Exported pairwise potential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialExport {
    pub index: usize,
    pub first: usize,
    pub second: usize,
    /// `compatibility`, `near`, or `far`.
    pub kind: String,
    pub table: [f64; 4],
    /// Joint P(1, 1), when beliefs were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub belief: Option<f64>,
}

/// Exported intention network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkExport {
    pub nodes: Vec<NodeExport>,
    pub potentials: Vec<PotentialExport>,
}

impl NetworkExport {
    pub fn from_network(network: &IntentionNetwork, beliefs: Option<&Beliefs>) -> Self {
        let nodes = network
            .nodes()
            .map(|(idx, node)| NodeExport {
                index: idx.index(),
                label: node.label.clone(),
                kind: match node.kind {
                    NodeKind::Action(_) => "action",
                    NodeKind::Object { .. } => "object",
                    NodeKind::Proximity { .. } => "proximity",
                }
                .to_string(),
                evidence: node.evidence,
                belief: beliefs.and_then(|b| b.node(idx)),
            })
            .collect();

        let potentials = network
            .potentials()
            .filter_map(|(edge, potential)| {
                let (first, second) = network.endpoints(edge).ok()?;
                Some(PotentialExport {
                    index: edge.index(),
                    first: first.index(),
                    second: second.index(),
                    kind: match potential.kind {
                        PotentialKind::Compatibility { .. } => "compatibility",
                        PotentialKind::Proximity { near: true, .. } => "near",
                        PotentialKind::Proximity { near: false, .. } => "far",
                    }
                    .to_string(),
                    table: potential.table,
                    belief: beliefs.and_then(|b| b.pair(edge)),
                })
            })
            .collect();

        Self { nodes, potentials }
    }
}
