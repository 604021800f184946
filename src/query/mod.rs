//! Query candidates: the yes/no questions the engine can ask.
//!
//! - [`QueryCandidate`]: one question with its score and network references
//! - [`rank::QueryRanker`]: orders candidates under a [`rank::RankPolicy`]
//! - [`session::QuerySession`]: the interactive ask/answer/prune loop

pub mod rank;
pub mod session;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::belief::BeliefLists;
use crate::catalog::{Action, Category};

pub use rank::{QueryRanker, RankPolicy, TieBreak};
pub use session::{Intention, IntentOracle, Outcome, QuerySession, SessionState};

/// An action node a candidate asks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    pub node: NodeIndex,
    pub action: Action,
}

/// An object instance a candidate asks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub node: NodeIndex,
    pub category: Category,
    /// Instance name, e.g. `Box1`.
    pub name: String,
}

/// What a candidate asks about.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTarget {
    /// "Do you want to <action> something?"
    Action(ActionRef),
    /// "Do you want to use the <object>?"
    Object(ObjectRef),
    /// "Do you want to <action> <object>?"
    Full {
        action: ActionRef,
        object: ObjectRef,
        potential: EdgeIndex,
    },
}

/// Which variant a candidate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CandidateKind {
    Action,
    Object,
    Full,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CandidateKind::Action => "action",
            CandidateKind::Object => "object",
            CandidateKind::Full => "full",
        })
    }
}

/// A scored question. `id` is unique within the list it was built in.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCandidate {
    pub id: usize,
    pub score: f64,
    pub target: QueryTarget,
}

impl QueryCandidate {
    pub fn kind(&self) -> CandidateKind {
        match self.target {
            QueryTarget::Action(_) => CandidateKind::Action,
            QueryTarget::Object(_) => CandidateKind::Object,
            QueryTarget::Full { .. } => CandidateKind::Full,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self.target, QueryTarget::Full { .. })
    }

    /// The action this candidate involves, if any.
    pub fn action(&self) -> Option<&ActionRef> {
        match &self.target {
            QueryTarget::Action(action) | QueryTarget::Full { action, .. } => Some(action),
            QueryTarget::Object(_) => None,
        }
    }

    /// The object instance this candidate involves, if any.
    pub fn object(&self) -> Option<&ObjectRef> {
        match &self.target {
            QueryTarget::Object(object) | QueryTarget::Full { object, .. } => Some(object),
            QueryTarget::Action(_) => None,
        }
    }

    /// The question put to the user.
    pub fn question(&self) -> String {
        match &self.target {
            QueryTarget::Full { action, object, .. } => {
                format!("Do you want to {} {}?", action.action.phrase(), object.name)
            }
            QueryTarget::Object(object) => format!("Do you want to use the {}?", object.name),
            QueryTarget::Action(action) => {
                format!("Do you want to {} something?", action.action.phrase())
            }
        }
    }
}

/// Build one candidate per action, object and object-action pair, numbered
/// in that order.
pub fn candidates_from(lists: &BeliefLists) -> Vec<QueryCandidate> {
    let mut out = Vec::with_capacity(lists.len());

    for a in &lists.actions {
        out.push(QueryCandidate {
            id: out.len(),
            score: a.score,
            target: QueryTarget::Action(ActionRef {
                node: a.node,
                action: a.action,
            }),
        });
    }
    for o in &lists.objects {
        out.push(QueryCandidate {
            id: out.len(),
            score: o.score,
            target: QueryTarget::Object(ObjectRef {
                node: o.node,
                category: o.category,
                name: o.name.clone(),
            }),
        });
    }
    for p in &lists.pairs {
        out.push(QueryCandidate {
            id: out.len(),
            score: p.score,
            target: QueryTarget::Full {
                action: ActionRef {
                    node: p.action.node,
                    action: p.action.action,
                },
                object: ObjectRef {
                    node: p.object.node,
                    category: p.object.category,
                    name: p.object.name.clone(),
                },
                potential: p.potential,
            },
        });
    }

    out
}

#[cfg(test)]
pub(crate) mod testing {
    //! Hand-built candidates for ranking and session tests.

    use super::*;

    pub fn action(id: usize, node: usize, action: Action, score: f64) -> QueryCandidate {
        QueryCandidate {
            id,
            score,
            target: QueryTarget::Action(ActionRef {
                node: NodeIndex::new(node),
                action,
            }),
        }
    }

    pub fn object(id: usize, node: usize, category: Category, name: &str, score: f64) -> QueryCandidate {
        QueryCandidate {
            id,
            score,
            target: QueryTarget::Object(ObjectRef {
                node: NodeIndex::new(node),
                category,
                name: name.to_string(),
            }),
        }
    }

    pub fn full(id: usize, a: &QueryCandidate, o: &QueryCandidate, score: f64) -> QueryCandidate {
        QueryCandidate {
            id,
            score,
            target: QueryTarget::Full {
                action: a.action().cloned().unwrap(),
                object: o.object().cloned().unwrap(),
                potential: EdgeIndex::new(id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn questions_use_templates() {
        let drink = action(0, 0, Action::Drink, 0.5);
        let grasp = action(1, 1, Action::Grasp, 0.5);
        let cup = object(2, 2, Category::Cup, "Cup1", 0.5);

        assert_eq!(drink.question(), "Do you want to Drink from something?");
        assert_eq!(grasp.question(), "Do you want to Grasp something?");
        assert_eq!(cup.question(), "Do you want to use the Cup1?");
        assert_eq!(
            full(3, &drink, &cup, 0.5).question(),
            "Do you want to Drink from Cup1?"
        );
        assert_eq!(
            full(4, &grasp, &cup, 0.5).question(),
            "Do you want to Grasp Cup1?"
        );
    }

    #[test]
    fn accessors_follow_variant() {
        let grasp = action(0, 0, Action::Grasp, 0.5);
        let cup = object(1, 1, Category::Cup, "Cup1", 0.5);
        let both = full(2, &grasp, &cup, 0.5);

        assert!(grasp.object().is_none());
        assert!(cup.action().is_none());
        assert_eq!(both.action().unwrap().action, Action::Grasp);
        assert_eq!(both.object().unwrap().name, "Cup1");
        assert_eq!(both.kind(), CandidateKind::Full);
    }
}
