//! Persistent knowledge for intent-probe.
//!
//! - [`CompatibilityStore`]: learned per-(category, action) templates plus the
//!   learning rate, backed by a plain-text file
//! - [`CompatibilityCell`]: one 4-state template
//! - [`CooccurrenceCounts`]: running pair frequencies for count-based ranking
//!
//! The store is an owned value. Whoever holds it (normally the
//! [`Engine`](crate::engine::Engine)) is the single writer; learning borrows it
//! mutably and persistence happens explicitly through [`CompatibilityStore::save`].

pub mod cell;
pub mod counts;

use std::collections::BTreeMap;
use std::path::Path;

use crate::catalog::{Action, AffordanceCatalog, Category};
use crate::error::StoreError;

pub use cell::{CompatibilityCell, JointState, NORMALIZATION_TOLERANCE};
pub use counts::CooccurrenceCounts;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Learning rate used when none is configured.
pub const DEFAULT_LEARNING_RATE: f64 = 1.0;

/// Table of compatibility templates, one per permitted (category, action) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityStore {
    cells: BTreeMap<(Category, Action), CompatibilityCell>,
    learning_rate: f64,
}

impl CompatibilityStore {
    /// Create a store holding the default prior for every pair `catalog` permits.
    pub fn new(catalog: &AffordanceCatalog, learning_rate: f64) -> Self {
        let cells = catalog
            .pairs()
            .map(|pair| (pair, CompatibilityCell::default_prior()))
            .collect();
        Self {
            cells,
            learning_rate,
        }
    }

    /// Reset every cell to [`CompatibilityCell::DEFAULT_PRIOR`].
    pub fn reset_to_default(&mut self) {
        for cell in self.cells.values_mut() {
            *cell = CompatibilityCell::default_prior();
        }
        tracing::info!(cells = self.cells.len(), "template store reset to default prior");
    }

    /// The learning rate λ added on every confirmed intention.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Change the learning rate.
    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Raw cell for a pair, if the pair is permitted.
    pub fn cell(&self, category: Category, action: Action) -> Option<&CompatibilityCell> {
        self.cells.get(&(category, action))
    }

    /// Normalized template for a pair, if the pair is permitted.
    pub fn potential(&self, category: Category, action: Action) -> Option<[f64; 4]> {
        self.cell(category, action).map(CompatibilityCell::normalized)
    }

    /// Replace the cell for a permitted pair. Returns `false` (and changes
    /// nothing) when the pair has no cell.
    pub fn set_cell(&mut self, category: Category, action: Action, cell: CompatibilityCell) -> bool {
        match self.cells.get_mut(&(category, action)) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => {
                tracing::warn!(%category, %action, "ignoring template write for unafforded pair");
                false
            }
        }
    }

    /// Add λ to the (1,1) entry of a pair's cell without renormalizing.
    ///
    /// Unafforded pairs are a no-op with a warning.
    pub fn increment(&mut self, category: Category, action: Action) -> bool {
        let rate = self.learning_rate;
        match self.cells.get_mut(&(category, action)) {
            Some(cell) => {
                cell.add(JointState::Both, rate);
                tracing::debug!(
                    %category,
                    %action,
                    both = cell.get(JointState::Both),
                    "template incremented"
                );
                true
            }
            None => {
                tracing::warn!(%category, %action, "invalid pair provided for template update");
                false
            }
        }
    }

    /// [`increment`](Self::increment) addressed by file-format indices.
    ///
    /// Out-of-range indices are a no-op with a warning.
    pub fn increment_by_index(&mut self, category_index: usize, action_index: usize) -> bool {
        match (
            Category::from_index(category_index),
            Action::from_index(action_index),
        ) {
            (Ok(category), Ok(action)) => self.increment(category, action),
            _ => {
                tracing::warn!(
                    category_index,
                    action_index,
                    "invalid indices provided for template update"
                );
                false
            }
        }
    }

    /// Iterate cells in (category, action) index order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, Action, &CompatibilityCell)> {
        self.cells.iter().map(|(&(c, a), cell)| (c, a, cell))
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the store has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Parse the text format, starting from the default prior for every
    /// permitted pair and overwriting the pairs present in `text`.
    ///
    /// Values are normalized as they are read.
    pub fn parse(text: &str, catalog: &AffordanceCatalog, learning_rate: f64) -> StoreResult<Self> {
        let mut store = Self::new(catalog, learning_rate);
        for (line, raw) in numbered_lines(text) {
            let (category, action, cell) = parse_entry(line, raw, catalog)?;
            store.cells.insert((category, action), cell);
        }
        Ok(store)
    }

    /// Parse the text format, skipping (and logging) every line that fails to
    /// parse. Returns the store and the number of skipped lines.
    pub fn parse_lenient(
        text: &str,
        catalog: &AffordanceCatalog,
        learning_rate: f64,
    ) -> (Self, usize) {
        let mut store = Self::new(catalog, learning_rate);
        let mut skipped = 0;
        for (line, raw) in numbered_lines(text) {
            match parse_entry(line, raw, catalog) {
                Ok((category, action, cell)) => {
                    store.cells.insert((category, action), cell);
                }
                Err(e) => {
                    tracing::warn!(line, error = %e, "skipping template line");
                    skipped += 1;
                }
            }
        }
        (store, skipped)
    }

    /// Render the text format with every cell normalized.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (category, action, cell) in self.iter() {
            let [v0, v1, v2, v3] = cell.normalized();
            out.push_str(&format!(
                "{:>3} {:>10} {:>3} {:>10} {:>19.16} {:>19.16} {:>19.16} {:>19.16}\n",
                category.index(),
                category.name(),
                action.index(),
                action.name(),
                v0,
                v1,
                v2,
                v3
            ));
        }
        out
    }

    /// Load a store file strictly: any I/O or format problem is an error.
    pub fn load(path: &Path, catalog: &AffordanceCatalog, learning_rate: f64) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::parse(&text, catalog, learning_rate)?;
        tracing::info!(path = %path.display(), cells = store.len(), "template store loaded");
        Ok(store)
    }

    /// Load a store file leniently.
    ///
    /// A missing or unreadable file yields the default prior. Lines that fail
    /// to parse are skipped with a warning, so the remaining templates survive
    /// the next save.
    pub fn load_or_default(path: &Path, catalog: &AffordanceCatalog, learning_rate: f64) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "unable to read template store, continuing with default prior"
                );
                return Self::new(catalog, learning_rate);
            }
        };
        let (store, skipped) = Self::parse_lenient(&text, catalog, learning_rate);
        tracing::info!(
            path = %path.display(),
            cells = store.len(),
            skipped,
            "template store loaded"
        );
        store
    }

    /// Write the store, normalized, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, self.render()).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), cells = self.len(), "template store saved");
        Ok(())
    }
}

/// Non-blank lines with their 1-based numbers.
fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(idx, raw)| (idx + 1, raw))
}

/// Parse one template line and check the pair against the catalog.
fn parse_entry(
    line: usize,
    raw: &str,
    catalog: &AffordanceCatalog,
) -> StoreResult<(Category, Action, CompatibilityCell)> {
    let (category, action, cell) = parse_line(line, raw)?;
    if !catalog.permits(category, action) {
        return Err(StoreError::NotAfforded {
            line,
            category: category.to_string(),
            action: action.to_string(),
        });
    }
    Ok((category, action, cell))
}

/// Parse one non-blank template line into a normalized cell.
fn parse_line(line: usize, raw: &str) -> StoreResult<(Category, Action, CompatibilityCell)> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.len() != 8 {
        return Err(StoreError::Parse {
            line,
            message: format!("expected 8 fields, found {}", fields.len()),
        });
    }

    let parse_index = |field: &str, what: &str| {
        field.parse::<usize>().map_err(|_| StoreError::Parse {
            line,
            message: format!("{what} index \"{field}\" is not a number"),
        })
    };
    let category_index = parse_index(fields[0], "category")?;
    let action_index = parse_index(fields[2], "action")?;

    let category: Category = fields[1].parse().map_err(|e| StoreError::Parse {
        line,
        message: format!("{e}"),
    })?;
    let action: Action = fields[3].parse().map_err(|e| StoreError::Parse {
        line,
        message: format!("{e}"),
    })?;
    if category.index() != category_index {
        return Err(StoreError::Parse {
            line,
            message: format!("category index {category_index} does not match \"{category}\""),
        });
    }
    if action.index() != action_index {
        return Err(StoreError::Parse {
            line,
            message: format!("action index {action_index} does not match \"{action}\""),
        });
    }

    let mut values = [0.0; 4];
    for (slot, field) in values.iter_mut().zip(&fields[4..]) {
        let value: f64 = field.parse().map_err(|_| StoreError::Parse {
            line,
            message: format!("value \"{field}\" is not a number"),
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(StoreError::Parse {
                line,
                message: format!("value {value} must be finite and non-negative"),
            });
        }
        *slot = value;
    }
    let cell = CompatibilityCell::new(values);
    if cell.sum() <= 0.0 {
        return Err(StoreError::Parse {
            line,
            message: "values sum to zero".into(),
        });
    }

    let mut cell = cell;
    cell.normalize();
    Ok((category, action, cell))
}
