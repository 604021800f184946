//! Scene → intention network construction.
//!
//! Observations are validated up front, sorted by distance, and instantiated
//! nearest first. Instance names are the category name plus a per-category
//! counter (`Box1`, `Box2`, ...), assigned in that sorted order.

use std::collections::BTreeMap;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::catalog::{Action, AffordanceCatalog, Category};
use crate::error::GraphError;
use crate::scene::Scene;
use crate::store::{CompatibilityCell, CompatibilityStore, CooccurrenceCounts};

use super::network::{GraphResult, IntentionNetwork};
use super::{Potential, PotentialKind};

/// Added to the largest observed distance so the farthest object keeps a
/// proximity ratio below one.
pub const DISTANCE_MARGIN: f64 = 0.02;

/// Bookkeeping for one instantiated object.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    pub name: String,
    pub category: Category,
    pub distance: f64,
    pub object: NodeIndex,
    pub proximity: NodeIndex,
}

/// Per-scene bookkeeping produced alongside the network.
#[derive(Debug, Clone, Default)]
pub struct SceneBook {
    instances: Vec<InstanceInfo>,
    by_category: BTreeMap<Category, Vec<NodeIndex>>,
    /// Per category, per action: every instance's potential, in instance order.
    accumulator: BTreeMap<Category, BTreeMap<Action, Vec<[f64; 4]>>>,
    max_distance: f64,
    threshold: f64,
}

impl SceneBook {
    /// Instances in construction (nearest-first) order.
    pub fn instances(&self) -> &[InstanceInfo] {
        &self.instances
    }

    /// Instance whose object node is `object`.
    pub fn instance(&self, object: NodeIndex) -> Option<&InstanceInfo> {
        self.instances.iter().find(|i| i.object == object)
    }

    /// Instance with the given name (e.g. `"Box1"`).
    pub fn instance_named(&self, name: &str) -> Option<&InstanceInfo> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Object nodes of one category.
    pub fn instances_of(&self, category: Category) -> &[NodeIndex] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Categories with at least one instance.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.by_category.keys().copied()
    }

    /// Per-instance potentials recorded for one category, grouped by action.
    pub fn accumulated(&self, category: Category) -> Option<&BTreeMap<Action, Vec<[f64; 4]>>> {
        self.accumulator.get(&category)
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// A built network together with its bookkeeping.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub network: IntentionNetwork,
    pub book: SceneBook,
}

impl SceneGraph {
    /// Re-copy every object-action potential from the store.
    ///
    /// The accumulator keeps the construction-time values.
    pub fn refresh(&mut self, store: &CompatibilityStore) -> GraphResult<usize> {
        let updates: Vec<(EdgeIndex, [f64; 4])> = self
            .network
            .compatibility_potentials()
            .filter_map(|(edge, p)| {
                let (category, action) = p.pair()?;
                store.potential(category, action).map(|t| (edge, t))
            })
            .collect();
        let refreshed = updates.len();
        for (edge, table) in updates {
            self.network.set_table(edge, table)?;
        }
        tracing::debug!(refreshed, "potentials refreshed from template store");
        Ok(refreshed)
    }
}

/// Builds the intention network for a scene.
pub struct SceneGraphBuilder<'a> {
    catalog: &'a AffordanceCatalog,
    store: &'a CompatibilityStore,
}

impl<'a> SceneGraphBuilder<'a> {
    pub fn new(catalog: &'a AffordanceCatalog, store: &'a CompatibilityStore) -> Self {
        Self { catalog, store }
    }

    /// Build the network for `scene`, recording one co-occurrence per
    /// object-action potential in `counts`.
    ///
    /// Fails before creating any node if the scene is empty, names an
    /// unknown category, or holds a non-positive distance.
    pub fn build(&self, scene: &Scene, counts: &mut CooccurrenceCounts) -> GraphResult<SceneGraph> {
        if scene.is_empty() {
            return Err(GraphError::EmptyScene);
        }

        let mut validated: Vec<(Category, f64)> = Vec::with_capacity(scene.len());
        for (position, obs) in scene.observations().iter().enumerate() {
            let category: Category =
                obs.label
                    .parse()
                    .map_err(|_| GraphError::UnknownCategory {
                        position,
                        label: obs.label.clone(),
                    })?;
            if !(obs.distance.is_finite() && obs.distance > 0.0) {
                return Err(GraphError::InvalidDistance {
                    position,
                    label: obs.label.clone(),
                    distance: obs.distance,
                });
            }
            validated.push((category, obs.distance));
        }
        validated.sort_by(|a, b| a.1.total_cmp(&b.1));

        let max_distance = validated
            .iter()
            .map(|&(_, d)| d)
            .fold(f64::MIN, f64::max)
            + DISTANCE_MARGIN;
        let threshold = max_distance / 2.0;

        let mut network = IntentionNetwork::new();
        let mut book = SceneBook {
            max_distance,
            threshold,
            ..SceneBook::default()
        };
        let mut ordinals: BTreeMap<Category, usize> = BTreeMap::new();

        for (category, distance) in validated {
            let ordinal = ordinals.entry(category).or_insert(0);
            *ordinal += 1;
            let name = format!("{}{}", category.name(), ordinal);

            let actions = self.catalog.affords(category);
            let action_nodes: Vec<(Action, NodeIndex)> = actions
                .iter()
                .map(|&action| (action, network.add_action(action)))
                .collect();
            let object = network.add_object(category, name.clone());
            let proximity = network.add_proximity(object)?;

            for (action, action_node) in action_nodes {
                let table = self
                    .store
                    .potential(category, action)
                    .unwrap_or_else(|| CompatibilityCell::default_prior().normalized());
                network.add_potential(
                    object,
                    action_node,
                    Potential {
                        kind: PotentialKind::Compatibility { category, action },
                        table,
                    },
                )?;
                counts.record(category, action);
                book.accumulator
                    .entry(category)
                    .or_default()
                    .entry(action)
                    .or_default()
                    .push(table);
            }

            let ratio = distance / max_distance;
            network.add_potential(
                object,
                proximity,
                Potential::proximity(ratio, distance < threshold),
            )?;

            book.by_category.entry(category).or_default().push(object);
            book.instances.push(InstanceInfo {
                name,
                category,
                distance,
                object,
                proximity,
            });
        }

        tracing::info!(
            instances = book.instances.len(),
            nodes = network.node_count(),
            potentials = network.potential_count(),
            max_distance,
            threshold,
            "intention network built"
        );

        Ok(SceneGraph { network, book })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    fn build(scene: &Scene) -> GraphResult<SceneGraph> {
        let catalog = AffordanceCatalog::standard();
        let store = CompatibilityStore::new(&catalog, 1.0);
        let mut counts = CooccurrenceCounts::new();
        SceneGraphBuilder::new(&catalog, &store).build(scene, &mut counts)
    }

    #[test]
    fn box_and_carton_share_action_nodes() {
        let graph = build(&Scene::from_pairs([("Box", 0.3), ("Carton", 0.3)])).unwrap();
        let net = &graph.network;

        // Box: Grasp Move Open Push; Carton adds Pour.
        assert_eq!(net.action_nodes().count(), 5);
        assert_eq!(net.object_nodes().count(), 2);
        assert_eq!(net.node_count(), 5 + 2 + 2);
        assert_eq!(net.compatibility_potentials().count(), 4 + 4);
        assert_eq!(net.potential_count(), 8 + 2);
    }

    #[test]
    fn far_objects_use_far_formula() {
        let graph = build(&Scene::from_pairs([("Box", 0.3), ("Carton", 0.3)])).unwrap();
        assert!((graph.book.max_distance() - 0.32).abs() < 1e-12);
        assert!((graph.book.threshold() - 0.16).abs() < 1e-12);

        let d = 0.3 / 0.32;
        for (_, p) in graph.network.potentials() {
            if let PotentialKind::Proximity { ratio, near } = p.kind {
                assert!(!near);
                assert!((ratio - d).abs() < 1e-12);
                assert!((p.table[0] - d).abs() < 1e-12);
                assert!((p.table[1] - (1.0 - d)).abs() < 1e-12);
                assert!((p.table[3] - d).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn instances_are_named_nearest_first() {
        let graph =
            build(&Scene::from_pairs([("Box", 0.6), ("Cup", 0.1), ("Box", 0.2)])).unwrap();
        let names: Vec<&str> = graph
            .book
            .instances()
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, ["Cup1", "Box1", "Box2"]);
        assert_eq!(graph.book.instances_of(Category::Box).len(), 2);

        let cup = graph.book.instance_named("Cup1").unwrap();
        assert!(matches!(
            graph.network.node(cup.object).unwrap().kind,
            NodeKind::Object { category: Category::Cup, .. }
        ));
        // Cup at 0.1 is below threshold 0.31.
        let near = graph
            .network
            .potentials()
            .filter(|(_, p)| matches!(p.kind, PotentialKind::Proximity { near: true, .. }))
            .count();
        assert_eq!(near, 2);
    }

    #[test]
    fn accumulator_holds_one_potential_per_instance() {
        let graph = build(&Scene::from_pairs([("Box", 0.6), ("Box", 0.2)])).unwrap();
        let acc = graph.book.accumulated(Category::Box).unwrap();
        assert_eq!(acc.len(), 4);
        assert!(acc.values().all(|v| v.len() == 2));
        assert!(graph.book.accumulated(Category::Cup).is_none());
    }

    #[test]
    fn construction_records_cooccurrences() {
        let catalog = AffordanceCatalog::standard();
        let store = CompatibilityStore::new(&catalog, 1.0);
        let mut counts = CooccurrenceCounts::new();
        SceneGraphBuilder::new(&catalog, &store)
            .build(&Scene::from_pairs([("Cup", 0.4), ("Mug", 0.5)]), &mut counts)
            .unwrap();
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.action_count(Action::Drink), 2);
    }

    #[test]
    fn invalid_scenes_fail_before_construction() {
        assert!(matches!(build(&Scene::new()), Err(GraphError::EmptyScene)));
        assert!(matches!(
            build(&Scene::from_pairs([("Box", 0.3), ("Plate", 0.2)])),
            Err(GraphError::UnknownCategory { position: 1, .. })
        ));
        assert!(matches!(
            build(&Scene::from_pairs([("Box", 0.0)])),
            Err(GraphError::InvalidDistance { position: 0, .. })
        ));
    }

    #[test]
    fn refresh_copies_updated_templates() {
        let catalog = AffordanceCatalog::standard();
        let mut store = CompatibilityStore::new(&catalog, 1.0);
        let mut counts = CooccurrenceCounts::new();
        let mut graph = SceneGraphBuilder::new(&catalog, &store)
            .build(&Scene::from_pairs([("Tube", 0.4)]), &mut counts)
            .unwrap();

        store.set_cell(
            Category::Tube,
            Action::Squeeze,
            CompatibilityCell::new([1.0, 1.0, 1.0, 1.0]),
        );
        assert_eq!(graph.refresh(&store).unwrap(), 2);
        let squeeze = graph
            .network
            .compatibility_potentials()
            .find(|(_, p)| p.pair() == Some((Category::Tube, Action::Squeeze)))
            .map(|(_, p)| p.table)
            .unwrap();
        assert_eq!(squeeze, [0.25; 4]);
    }
}
