//! Affordance catalog: the fixed object categories, actions, and which actions
//! each category supports.
//!
//! This is authored knowledge and never changes at runtime. Everything that
//! needs to know "can a Tube be poured from?" asks an [`AffordanceCatalog`].

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Result type for catalog lookups.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// An object category the system can recognize in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Bottle,
    Bowl,
    Box,
    Can,
    Carton,
    Cup,
    Mug,
    SprayCan,
    Tin,
    Tube,
    Tub,
}

impl Category {
    /// All categories in index order.
    pub const ALL: [Category; 11] = [
        Category::Bottle,
        Category::Bowl,
        Category::Box,
        Category::Can,
        Category::Carton,
        Category::Cup,
        Category::Mug,
        Category::SprayCan,
        Category::Tin,
        Category::Tube,
        Category::Tub,
    ];

    /// Number of categories.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable index used by the template file format.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a category by its file-format index.
    pub fn from_index(index: usize) -> CatalogResult<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(CatalogError::CategoryIndex {
                index,
                max: Self::COUNT,
            })
    }

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Category::Bottle => "Bottle",
            Category::Bowl => "Bowl",
            Category::Box => "Box",
            Category::Can => "Can",
            Category::Carton => "Carton",
            Category::Cup => "Cup",
            Category::Mug => "Mug",
            Category::SprayCan => "SprayCan",
            Category::Tin => "Tin",
            Category::Tube => "Tube",
            Category::Tub => "Tub",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    /// Parse a category name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CatalogError::UnknownCategory {
                label: trimmed.to_string(),
            })
    }
}

/// An action a person may perform on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Drink,
    Grasp,
    Move,
    Open,
    Pour,
    Push,
    Squeeze,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; 7] = [
        Action::Drink,
        Action::Grasp,
        Action::Move,
        Action::Open,
        Action::Pour,
        Action::Push,
        Action::Squeeze,
    ];

    /// Number of actions.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable index used by the template file format.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up an action by its file-format index.
    pub fn from_index(index: usize) -> CatalogResult<Self> {
        Self::ALL.get(index).copied().ok_or(CatalogError::ActionIndex {
            index,
            max: Self::COUNT,
        })
    }

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Action::Drink => "Drink",
            Action::Grasp => "Grasp",
            Action::Move => "Move",
            Action::Open => "Open",
            Action::Pour => "Pour",
            Action::Push => "Push",
            Action::Squeeze => "Squeeze",
        }
    }

    /// The verb phrase used in questions ("Drink from", "Pour from", "Grasp").
    pub fn phrase(self) -> String {
        match self {
            Action::Drink | Action::Pour => format!("{} from", self.name()),
            _ => self.name().to_string(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = CatalogError;

    /// Parse an action name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CatalogError::UnknownAction {
                label: trimmed.to_string(),
            })
    }
}

/// Mapping from every category to the ordered set of actions it affords.
///
/// Immutable after construction. [`AffordanceCatalog::standard`] holds the
/// household-object table the templates are authored against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffordanceCatalog {
    affordances: BTreeMap<Category, Vec<Action>>,
}

impl AffordanceCatalog {
    /// The standard household-object affordance table.
    pub fn standard() -> Self {
        use Action::*;

        Self::from_table([
            (Category::Bottle, vec![Drink, Grasp, Move, Open, Pour]),
            (Category::Bowl, vec![Grasp, Move, Push]),
            (Category::Box, vec![Grasp, Move, Open, Push]),
            (Category::Can, vec![Drink, Grasp, Move, Pour]),
            (Category::Carton, vec![Grasp, Move, Open, Pour]),
            (Category::Cup, vec![Drink, Grasp, Move]),
            (Category::Mug, vec![Drink, Grasp, Move]),
            (Category::SprayCan, vec![Grasp]),
            (Category::Tin, vec![Grasp, Move, Open, Pour]),
            (Category::Tube, vec![Grasp, Squeeze]),
            (Category::Tub, vec![Grasp, Open, Push]),
        ])
    }

    /// Build a catalog from an explicit table.
    ///
    /// Duplicate actions within a category are dropped, keeping first-seen
    /// order. Categories missing from the table afford nothing.
    pub fn from_table(table: impl IntoIterator<Item = (Category, Vec<Action>)>) -> Self {
        let mut affordances = BTreeMap::new();
        for (category, actions) in table {
            let mut ordered: Vec<Action> = Vec::with_capacity(actions.len());
            for action in actions {
                if !ordered.contains(&action) {
                    ordered.push(action);
                }
            }
            affordances.insert(category, ordered);
        }
        Self { affordances }
    }

    /// Actions afforded by `category`, in authored order.
    pub fn affords(&self, category: Category) -> &[Action] {
        self.affordances
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `category` affords `action`.
    pub fn permits(&self, category: Category, action: Action) -> bool {
        self.affords(category).contains(&action)
    }

    /// Every permitted (category, action) pair, ordered by category then action index.
    pub fn pairs(&self) -> impl Iterator<Item = (Category, Action)> + '_ {
        self.affordances.iter().flat_map(|(&category, actions)| {
            let mut sorted = actions.clone();
            sorted.sort();
            sorted.into_iter().map(move |action| (category, action))
        })
    }

    /// Number of permitted pairs.
    pub fn pair_count(&self) -> usize {
        self.affordances.values().map(Vec::len).sum()
    }

    /// Categories that afford `action`.
    pub fn categories_for(&self, action: Action) -> Vec<Category> {
        self.affordances
            .iter()
            .filter(|(_, actions)| actions.contains(&action))
            .map(|(&category, _)| category)
            .collect()
    }
}

impl Default for AffordanceCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
