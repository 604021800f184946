//! Running co-occurrence counts of (category, action) pairs across scenes.
//!
//! Every object-action potential created during graph construction bumps the
//! matching counter. The frequency belief strategy turns these counts into
//! scores.

use serde::{Deserialize, Serialize};

use crate::catalog::{Action, Category};

/// Per-(category, action) occurrence counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooccurrenceCounts {
    counts: [[u64; Action::COUNT]; Category::COUNT],
}

impl CooccurrenceCounts {
    /// Create an all-zero counter table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `(category, action)`.
    pub fn record(&mut self, category: Category, action: Action) {
        self.counts[category.index()][action.index()] += 1;
    }

    /// Occurrences of one pair.
    pub fn count(&self, category: Category, action: Action) -> u64 {
        self.counts[category.index()][action.index()]
    }

    /// Occurrences of `action` across all categories.
    pub fn action_count(&self, action: Action) -> u64 {
        self.counts.iter().map(|row| row[action.index()]).sum()
    }

    /// Occurrences of `category` across all actions.
    pub fn category_count(&self, category: Category) -> u64 {
        self.counts[category.index()].iter().sum()
    }

    /// Total recorded occurrences.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Share of all occurrences that involve `action`; zero when nothing is recorded.
    pub fn action_frequency(&self, action: Action) -> f64 {
        ratio(self.action_count(action), self.total())
    }

    /// Share of all occurrences that involve `category`; zero when nothing is recorded.
    pub fn category_frequency(&self, category: Category) -> f64 {
        ratio(self.category_count(category), self.total())
    }

    /// Reset every counter to zero.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
