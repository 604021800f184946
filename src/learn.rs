//! Template learning: folding confirmed intentions back into the store.
//!
//! Two independent paths:
//!
//! - **single observation**: a confirmed (category, action) adds λ to the
//!   (1,1) entry of its cell; nothing is renormalized until the store is saved
//! - **batch average**: for every category seen in a scene, the per-instance
//!   potentials recorded during construction are averaged and blended 50/50
//!   with the stored template

use crate::catalog::{Action, Category};
use crate::graph::SceneBook;
use crate::store::{CompatibilityCell, CompatibilityStore};

/// Weight of the scene average when blending with the stored template.
pub const BATCH_BLEND: f64 = 0.5;

/// Stateless update rules over a [`CompatibilityStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateLearner;

impl TemplateLearner {
    /// Record one confirmed intention. Unafforded pairs are ignored with a
    /// warning; returns whether the store changed.
    pub fn observe(store: &mut CompatibilityStore, category: Category, action: Action) -> bool {
        let changed = store.increment(category, action);
        if changed {
            tracing::info!(
                %category,
                %action,
                learning_rate = store.learning_rate(),
                "template reinforced"
            );
        }
        changed
    }

    /// [`observe`](Self::observe) addressed by file-format indices.
    pub fn observe_by_index(
        store: &mut CompatibilityStore,
        category_index: usize,
        action_index: usize,
    ) -> bool {
        store.increment_by_index(category_index, action_index)
    }

    /// Blend each category's scene-average potentials into the store.
    ///
    /// Returns the number of cells rewritten.
    pub fn batch_average(store: &mut CompatibilityStore, book: &SceneBook) -> usize {
        let mut updated = 0;
        let categories: Vec<Category> = book.categories().collect();

        for category in categories {
            let Some(per_action) = book.accumulated(category) else {
                continue;
            };
            for (&action, tables) in per_action {
                if tables.is_empty() {
                    continue;
                }
                let Some(stored) = store.potential(category, action) else {
                    continue;
                };

                let n = tables.len() as f64;
                let mut mean = [0.0; 4];
                for table in tables {
                    for (m, v) in mean.iter_mut().zip(table) {
                        *m += v;
                    }
                }

                let mut blended = [0.0; 4];
                for ((b, m), s) in blended.iter_mut().zip(mean).zip(stored) {
                    *b = BATCH_BLEND * (m / n) + (1.0 - BATCH_BLEND) * s;
                }
                if store.set_cell(category, action, CompatibilityCell::new(blended)) {
                    updated += 1;
                }
            }
        }

        tracing::info!(updated, "templates updated from scene averages");
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AffordanceCatalog;
    use crate::graph::SceneGraphBuilder;
    use crate::scene::Scene;
    use crate::store::{CooccurrenceCounts, JointState};

    #[test]
    fn observe_adds_learning_rate_once() {
        let catalog = AffordanceCatalog::standard();
        let mut store = CompatibilityStore::new(&catalog, 0.5);
        let before = store.cell(Category::Box, Action::Grasp).unwrap().get(JointState::Both);
        assert!(TemplateLearner::observe(&mut store, Category::Box, Action::Grasp));
        let after = store.cell(Category::Box, Action::Grasp).unwrap().get(JointState::Both);
        assert!((after - before - 0.5).abs() < 1e-12);
        assert!(!TemplateLearner::observe(&mut store, Category::Cup, Action::Squeeze));
        assert!(!TemplateLearner::observe_by_index(&mut store, 99, 0));
    }

    #[test]
    fn batch_average_blends_with_stored_template() {
        let catalog = AffordanceCatalog::standard();
        let mut store = CompatibilityStore::new(&catalog, 1.0);
        store.set_cell(Category::Box, Action::Open, CompatibilityCell::new([1.0, 1.0, 1.0, 1.0]));

        let mut counts = CooccurrenceCounts::new();
        let graph = SceneGraphBuilder::new(&catalog, &store)
            .build(&Scene::from_pairs([("Box", 0.2), ("Box", 0.4)]), &mut counts)
            .unwrap();

        // Change the stored template after construction; the blend uses both.
        store.set_cell(Category::Box, Action::Open, CompatibilityCell::new([0.0, 0.0, 0.0, 1.0]));
        let updated = TemplateLearner::batch_average(&mut store, &graph.book);
        assert_eq!(updated, 4);

        let open = store.cell(Category::Box, Action::Open).unwrap().values();
        assert_eq!(open, [0.125, 0.125, 0.125, 0.625]);
        let grasp = store.cell(Category::Box, Action::Grasp).unwrap().values();
        assert_eq!(grasp, [0.0, 0.0, 0.0, 1.0]);
        // Categories absent from the scene are untouched.
        assert_eq!(
            store.cell(Category::Cup, Action::Drink).unwrap().values(),
            CompatibilityCell::DEFAULT_PRIOR
        );
    }
}
