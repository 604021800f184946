//! End-to-end integration tests for the intent-probe engine.
//!
//! These tests drive whole scenes through construction, inference, ranking
//! and the interactive session, checking pruning, termination and the
//! template reinforcement that follows a confirmed intention.

use intent_probe::belief::BeliefSource;
use intent_probe::catalog::{Action, Category};
use intent_probe::engine::{Engine, EngineConfig};
use intent_probe::error::{GraphError, IntentError};
use intent_probe::graph::PotentialKind;
use intent_probe::infer::{SolverConfig, SolverKind};
use intent_probe::query::{IntentOracle, Outcome, QueryTarget, RankPolicy, SessionState};
use intent_probe::scene::Scene;
use intent_probe::store::{CompatibilityCell, JointState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn test_engine() -> Engine {
    Engine::new(EngineConfig {
        seed: Some(3),
        ..Default::default()
    })
    .unwrap()
}

fn box_and_carton() -> Scene {
    Scene::from_pairs([("Box", 0.3), ("Carton", 0.3)])
}

#[test]
fn box_and_carton_network_shape() {
    let mut engine = test_engine();
    let graph = engine.build(&box_and_carton()).unwrap();

    // Grasp, Move, Open are shared; Push (Box) and Pour (Carton) are not.
    assert_eq!(graph.network.action_nodes().count(), 5);
    assert_eq!(graph.network.object_nodes().count(), 2);
    assert_eq!(graph.network.node_count(), 9);
    assert_eq!(graph.network.potential_count(), 10);

    assert!((graph.book.max_distance() - 0.32).abs() < 1e-12);
    assert!((graph.book.threshold() - 0.16).abs() < 1e-12);

    let d = 0.3 / 0.32;
    let proximity: Vec<_> = graph
        .network
        .potentials()
        .filter(|(_, p)| matches!(p.kind, PotentialKind::Proximity { .. }))
        .collect();
    assert_eq!(proximity.len(), 2);
    for (_, potential) in proximity {
        assert!(matches!(potential.kind, PotentialKind::Proximity { near: false, .. }));
        let expected = [d, 1.0 - d, 1.0 - d, d];
        for (got, want) in potential.table.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }
}

#[test]
fn near_objects_get_the_near_table() {
    let mut engine = test_engine();
    let graph = engine
        .build(&Scene::from_pairs([("Cup", 0.1), ("Tin", 0.9)]))
        .unwrap();

    let cup = graph.book.instance_named("Cup1").unwrap();
    let tin = graph.book.instance_named("Tin1").unwrap();
    let kinds: Vec<_> = graph
        .network
        .potentials()
        .filter_map(|(edge, p)| match p.kind {
            PotentialKind::Proximity { near, .. } => {
                let (object, _) = graph.network.endpoints(edge).unwrap();
                Some((object, near))
            }
            PotentialKind::Compatibility { .. } => None,
        })
        .collect();
    assert!(kinds.contains(&(cup.object, true)));
    assert!(kinds.contains(&(tin.object, false)));
}

#[test]
fn empty_scene_is_rejected() {
    let mut engine = test_engine();
    let err = engine.prepare(&Scene::new()).unwrap_err();
    assert!(matches!(err, IntentError::Graph(GraphError::EmptyScene)));
}

#[test]
fn accepting_an_action_leaves_only_its_full_candidates() {
    let mut engine = test_engine();
    let oracle = IntentOracle::new("Carton1", Action::Open);
    let (_, mut session) = engine.start_session(&box_and_carton()).unwrap();

    loop {
        let current = session.select_query().unwrap().clone();
        let accepted = oracle.answer(&current);
        let outcome = engine.evaluate(&mut session, accepted).unwrap();

        if accepted {
            if let QueryTarget::Action(action) = &current.target {
                assert!(session.candidates().iter().all(|c| {
                    c.is_full() && c.action().is_some_and(|a| a.node == action.node)
                }));
            }
            if let QueryTarget::Object(object) = &current.target {
                assert!(session.candidates().iter().all(|c| {
                    c.is_full() && c.object().is_some_and(|o| o.node == object.node)
                }));
            }
        }
        if outcome != Outcome::Continue {
            assert!(matches!(outcome, Outcome::Resolved(ref i) if i.object == "Carton1"));
            break;
        }
    }
}

#[test]
fn random_answers_always_terminate() {
    let mut rng = StdRng::seed_from_u64(99);
    let scene = Scene::from_pairs([("Bottle", 0.2), ("Cup", 0.5), ("Box", 0.7), ("Bottle", 0.9)]);

    for _ in 0..25 {
        let mut engine = test_engine();
        let (_, mut session) = engine.start_session(&scene).unwrap();
        let initial = session.initial_len();

        let outcome = loop {
            session.select_query().unwrap();
            match engine.evaluate(&mut session, rng.gen_bool(0.3)).unwrap() {
                Outcome::Continue => assert!(session.asked() < initial),
                terminal => break terminal,
            }
        };

        assert!(session.asked() <= initial);
        assert!(session.state().is_terminal());
        match outcome {
            Outcome::Resolved(_) => assert!(matches!(session.state(), SessionState::Resolved(_))),
            _ => assert_eq!(session.state(), &SessionState::Exhausted),
        }
    }
}

#[test]
fn oracle_for_absent_object_exhausts() {
    let mut engine = test_engine();
    let prepared = engine.prepare(&box_and_carton()).unwrap();
    let mut session = prepared.session();

    let oracle = IntentOracle::new("Mug1", Action::Drink);
    let outcome = session.run(&oracle, engine.store_mut()).unwrap();
    assert_eq!(outcome, Outcome::Exhausted);
    assert!(session.asked() <= prepared.candidates.len());
    assert!(session.select_query().is_err());
}

#[test]
fn confirming_grasp_box_adds_learning_rate() {
    let mut engine = Engine::new(EngineConfig {
        learning_rate: 0.5,
        seed: Some(1),
        ..Default::default()
    })
    .unwrap();
    let before = engine
        .store()
        .cell(Category::Box, Action::Grasp)
        .unwrap()
        .get(JointState::Both);

    let prepared = engine.prepare(&box_and_carton()).unwrap();
    let mut session = prepared.session();
    let outcome = session
        .run(&IntentOracle::new("Box1", Action::Grasp), engine.store_mut())
        .unwrap();

    let Outcome::Resolved(intention) = outcome else {
        panic!("expected a resolution, got {outcome:?}");
    };
    assert_eq!(intention.category, Category::Box);
    assert_eq!(intention.action, Action::Grasp);

    let after = engine
        .store()
        .cell(Category::Box, Action::Grasp)
        .unwrap()
        .get(JointState::Both);
    assert!((after - before - 0.5).abs() < 1e-12);

    // Other templates are untouched.
    assert_eq!(
        engine.store().cell(Category::Carton, Action::Grasp).unwrap().values(),
        CompatibilityCell::DEFAULT_PRIOR
    );
}

#[test]
fn cancelled_session_leaves_store_alone() {
    let mut engine = test_engine();
    let before = engine.store().render();
    let (_, mut session) = engine.start_session(&box_and_carton()).unwrap();
    session.select_query().unwrap();
    engine.evaluate(&mut session, false).unwrap();
    session.cancel().unwrap();

    assert_eq!(session.state(), &SessionState::Cancelled);
    assert!(engine.evaluate(&mut session, true).is_err());
    assert_eq!(engine.store().render(), before);
}

#[test]
fn every_belief_source_yields_the_same_candidate_set() {
    let scene = Scene::from_pairs([("Tube", 0.4), ("Tub", 0.6)]);
    let mut sizes = Vec::new();
    for source in [BeliefSource::Inferred, BeliefSource::Frequency, BeliefSource::Uniform] {
        let mut engine = Engine::new(EngineConfig {
            belief_source: source,
            seed: Some(5),
            ..Default::default()
        })
        .unwrap();
        let prepared = engine.prepare(&scene).unwrap();
        assert_eq!(prepared.beliefs.is_some(), source == BeliefSource::Inferred);
        sizes.push(prepared.candidates.len());
    }
    // Grasp, Squeeze, Open, Push + Tube1, Tub1 + 2 + 3 pairs
    assert_eq!(sizes, vec![11, 11, 11]);
}

#[test]
fn exact_and_loopy_agree_on_a_tree() {
    let scene = Scene::from_pairs([("Tube", 0.4)]);
    let mut scores = Vec::new();
    for kind in [SolverKind::Loopy, SolverKind::Exact] {
        let mut engine = Engine::new(EngineConfig {
            seed: Some(5),
            rank_policy: RankPolicy::Unranked,
            solver: SolverConfig {
                kind,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let graph = engine.build(&scene).unwrap();
        let beliefs = engine.infer(&graph).unwrap();
        let marginals: Vec<f64> = graph
            .network
            .nodes()
            .map(|(idx, _)| beliefs.node(idx).unwrap())
            .collect();
        scores.push(marginals);
    }
    for (loopy, exact) in scores[0].iter().zip(&scores[1]) {
        assert!((loopy - exact).abs() < 1e-6, "{loopy} vs {exact}");
    }
}

#[test]
fn batch_learning_then_resolving_in_a_second_scene() {
    let mut engine = test_engine();
    let mut graph = engine.build(&box_and_carton()).unwrap();
    let updated = engine.learn_from_scene(&mut graph).unwrap();
    assert_eq!(updated, 8);

    let prepared = engine.prepare(&Scene::from_pairs([("Carton", 0.5)])).unwrap();
    let mut session = prepared.session();
    let outcome = session
        .run(&IntentOracle::new("Carton1", Action::Pour), engine.store_mut())
        .unwrap();
    assert!(matches!(outcome, Outcome::Resolved(ref i) if i.action == Action::Pour));
}
