//! The interactive question/answer loop for one scene.
//!
//! ```text
//!   Active ──select_query──▶ Proposed ──evaluate(yes, Full)──▶ Resolved
//!                              │  ▲
//!                              │  └── evaluate(prune, candidates left)
//!                              └──── evaluate(prune, none left) ──▶ Exhausted
//!   Active | Proposed ──cancel──▶ Cancelled
//! ```
//!
//! The proposal is always the head of the live candidate list.

use serde::Serialize;

use crate::catalog::{Action, Category};
use crate::error::QueryError;
use crate::learn::TemplateLearner;
use crate::store::CompatibilityStore;

use super::{QueryCandidate, QueryTarget};

/// Result type for session operations.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// A confirmed object-action intention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intention {
    pub category: Category,
    pub action: Action,
    /// Instance name, e.g. `Box1`.
    pub object: String,
}

impl std::fmt::Display for Intention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action.phrase(), self.object)
    }
}

/// Where a session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No proposal yet.
    Active,
    /// The head candidate has been put to the user.
    Proposed,
    Resolved(Intention),
    /// Every candidate was pruned without a confirmation.
    Exhausted,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Resolved(_) | SessionState::Exhausted | SessionState::Cancelled
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Active => f.write_str("active"),
            SessionState::Proposed => f.write_str("proposed"),
            SessionState::Resolved(intention) => write!(f, "resolved ({intention})"),
            SessionState::Exhausted => f.write_str("exhausted"),
            SessionState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// What one answer led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Candidates remain; the new proposal is [`QuerySession::current`].
    Continue,
    Resolved(Intention),
    Exhausted,
}

/// Interactive pruning over a ranked candidate list.
#[derive(Debug, Clone)]
pub struct QuerySession {
    candidates: Vec<QueryCandidate>,
    state: SessionState,
    asked: usize,
    initial: usize,
}

impl QuerySession {
    /// Start a session over an already-ranked list.
    pub fn new(candidates: Vec<QueryCandidate>) -> Self {
        let initial = candidates.len();
        Self {
            candidates,
            state: SessionState::Active,
            asked: 0,
            initial,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Live candidates, head first.
    pub fn candidates(&self) -> &[QueryCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Answers evaluated so far.
    pub fn asked(&self) -> usize {
        self.asked
    }

    /// Candidate count the session started with.
    pub fn initial_len(&self) -> usize {
        self.initial
    }

    /// The candidate currently put to the user, if any.
    pub fn current(&self) -> Option<&QueryCandidate> {
        match self.state {
            SessionState::Proposed => self.candidates.first(),
            _ => None,
        }
    }

    /// Propose the head candidate.
    pub fn select_query(&mut self) -> QueryResult<&QueryCandidate> {
        if self.state.is_terminal() {
            return Err(QueryError::SessionClosed {
                state: self.state.to_string(),
            });
        }
        if self.candidates.is_empty() {
            return Err(QueryError::NoCandidates);
        }
        self.state = SessionState::Proposed;
        let head = &self.candidates[0];
        tracing::debug!(id = head.id, question = %head.question(), "query proposed");
        Ok(head)
    }

    /// Apply the user's answer to the current proposal and prune.
    ///
    /// Accepting a Full candidate resolves the session and reinforces the
    /// confirmed template in `store`.
    pub fn evaluate(&mut self, accepted: bool, store: &mut CompatibilityStore) -> QueryResult<Outcome> {
        if self.state.is_terminal() {
            return Err(QueryError::SessionClosed {
                state: self.state.to_string(),
            });
        }
        if self.candidates.is_empty() {
            return Err(QueryError::NoCandidates);
        }
        if self.state != SessionState::Proposed {
            return Err(QueryError::NoProposal);
        }

        self.asked += 1;
        let current = self.candidates[0].clone();
        tracing::debug!(
            id = current.id,
            accepted,
            remaining = self.candidates.len(),
            "answer received"
        );

        match (&current.target, accepted) {
            (QueryTarget::Full { action, object, .. }, true) => {
                let intention = Intention {
                    category: object.category,
                    action: action.action,
                    object: object.name.clone(),
                };
                TemplateLearner::observe(store, object.category, action.action);
                tracing::info!(%intention, asked = self.asked, "intention resolved");
                self.state = SessionState::Resolved(intention.clone());
                return Ok(Outcome::Resolved(intention));
            }
            (QueryTarget::Action(action), true) => {
                self.candidates
                    .retain(|c| c.is_full() && c.action().is_some_and(|a| a.node == action.node));
            }
            (QueryTarget::Object(object), true) => {
                self.candidates
                    .retain(|c| c.is_full() && c.object().is_some_and(|o| o.node == object.node));
            }
            (QueryTarget::Full { action, object, .. }, false) => {
                self.candidates.retain(|c| {
                    c.id != current.id
                        && match &c.target {
                            QueryTarget::Object(o) => o.node != object.node,
                            QueryTarget::Action(a) => a.node != action.node,
                            QueryTarget::Full { .. } => true,
                        }
                });
            }
            (QueryTarget::Action(action), false) => {
                self.candidates
                    .retain(|c| c.action().is_none_or(|a| a.node != action.node));
            }
            (QueryTarget::Object(object), false) => {
                self.candidates
                    .retain(|c| c.object().is_none_or(|o| o.node != object.node));
            }
        }

        if self.candidates.is_empty() {
            tracing::info!(asked = self.asked, "candidates exhausted");
            self.state = SessionState::Exhausted;
            Ok(Outcome::Exhausted)
        } else {
            self.state = SessionState::Proposed;
            Ok(Outcome::Continue)
        }
    }

    /// Abort the session. The store is not touched.
    pub fn cancel(&mut self) -> QueryResult<()> {
        if self.state.is_terminal() {
            return Err(QueryError::SessionClosed {
                state: self.state.to_string(),
            });
        }
        tracing::info!(asked = self.asked, "session cancelled");
        self.state = SessionState::Cancelled;
        Ok(())
    }

    /// Drive the session to a terminal state with an oracle's answers.
    pub fn run(
        &mut self,
        oracle: &IntentOracle,
        store: &mut CompatibilityStore,
    ) -> QueryResult<Outcome> {
        loop {
            let answer = oracle.answer(self.select_query()?);
            match self.evaluate(answer, store)? {
                Outcome::Continue => continue,
                terminal => return Ok(terminal),
            }
        }
    }
}

/// Answers candidates on behalf of a user with a known intention.
///
/// Full candidates are accepted only for the exact (instance, action);
/// partial candidates are accepted when they agree with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentOracle {
    /// Target instance name, e.g. `Box1`.
    pub object: String,
    pub action: Action,
}

impl IntentOracle {
    pub fn new(object: impl Into<String>, action: Action) -> Self {
        Self {
            object: object.into(),
            action,
        }
    }

    pub fn answer(&self, candidate: &QueryCandidate) -> bool {
        match &candidate.target {
            QueryTarget::Full { action, object, .. } => {
                action.action == self.action && object.name == self.object
            }
            QueryTarget::Action(action) => action.action == self.action,
            QueryTarget::Object(object) => object.name == self.object,
        }
    }
}
