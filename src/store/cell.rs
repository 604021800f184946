//! Compatibility cells: the 4-state potential for one (category, action) pair.

use serde::{Deserialize, Serialize};

/// Floating tolerance for "sums to one" checks.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-9;

/// Joint binary state of (object-present, action-performed).
///
/// The discriminant is the table index: `object + 2 * action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointState {
    /// (0, 0)
    Neither = 0,
    /// (1, 0)
    ObjectOnly = 1,
    /// (0, 1)
    ActionOnly = 2,
    /// (1, 1)
    Both = 3,
}

impl JointState {
    /// All states in table order.
    pub const ALL: [JointState; 4] = [
        JointState::Neither,
        JointState::ObjectOnly,
        JointState::ActionOnly,
        JointState::Both,
    ];

    /// Table index of this state.
    pub fn index(self) -> usize {
        self as usize
    }

    /// State for the given (object, action) assignment.
    pub fn from_states(object: bool, action: bool) -> Self {
        match (object, action) {
            (false, false) => JointState::Neither,
            (true, false) => JointState::ObjectOnly,
            (false, true) => JointState::ActionOnly,
            (true, true) => JointState::Both,
        }
    }
}

/// A learned object-action compatibility template.
///
/// Values are non-negative. They are kept raw in memory (the learner adds
/// to them without renormalizing) and normalized on every read that feeds a
/// network and on every save.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityCell([f64; 4]);

impl CompatibilityCell {
    /// Prior every cell is reset to, before normalization.
    pub const DEFAULT_PRIOR: [f64; 4] = [0.0, 0.0, 0.0, 5.0];

    /// Wrap raw values.
    pub fn new(values: [f64; 4]) -> Self {
        Self(values)
    }

    /// A cell holding [`Self::DEFAULT_PRIOR`].
    pub fn default_prior() -> Self {
        Self(Self::DEFAULT_PRIOR)
    }

    /// Raw, possibly unnormalized values.
    pub fn values(&self) -> [f64; 4] {
        self.0
    }

    /// Raw value for one joint state.
    pub fn get(&self, state: JointState) -> f64 {
        self.0[state.index()]
    }

    /// Add `amount` to one joint state.
    pub fn add(&mut self, state: JointState, amount: f64) {
        self.0[state.index()] += amount;
    }

    /// Sum of the raw values.
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Values scaled to sum to one.
    ///
    /// A zero-mass cell normalizes to the uniform distribution.
    pub fn normalized(&self) -> [f64; 4] {
        normalize4(self.0)
    }

    /// Normalize in place.
    pub fn normalize(&mut self) {
        self.0 = self.normalized();
    }

    /// Whether the raw values already sum to one.
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= NORMALIZATION_TOLERANCE
    }
}

impl Default for CompatibilityCell {
    fn default() -> Self {
        Self::default_prior()
    }
}

/// Scale a 4-vector to unit sum; zero mass becomes uniform.
pub fn normalize4(values: [f64; 4]) -> [f64; 4] {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        values.map(|v| v / sum)
    } else {
        [0.25; 4]
    }
}
