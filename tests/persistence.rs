//! Persistence tests for templates, scene lists and configuration.
//!
//! These tests verify that learned templates survive an engine restart
//! (persist + reopen cycle) and that every file format round-trips.

use std::path::Path;

use intent_probe::catalog::{Action, AffordanceCatalog, Category};
use intent_probe::config::FileConfig;
use intent_probe::engine::{Engine, EngineConfig};
use intent_probe::error::StoreError;
use intent_probe::paths::IntentPaths;
use intent_probe::query::{IntentOracle, Outcome, RankPolicy};
use intent_probe::scene::{Scene, SceneList};
use intent_probe::store::{CompatibilityCell, CompatibilityStore};

fn persistent_engine(store: &Path) -> Engine {
    Engine::new(EngineConfig {
        store_path: Some(store.to_path_buf()),
        seed: Some(17),
        ..Default::default()
    })
    .unwrap()
}

fn assert_close(got: [f64; 4], want: [f64; 4]) {
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-12, "{got:?} != {want:?}");
    }
}

#[test]
fn store_round_trip_is_normalized() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("templates.map");
    let catalog = AffordanceCatalog::standard();

    let mut store = CompatibilityStore::new(&catalog, 1.0);
    store.set_cell(Category::Tin, Action::Pour, CompatibilityCell::new([1.0, 2.0, 3.0, 4.0]));
    store.save(&path).unwrap();

    let loaded = CompatibilityStore::load(&path, &catalog, 1.0).unwrap();
    assert_eq!(loaded.len(), 36);
    assert_close(
        loaded.cell(Category::Tin, Action::Pour).unwrap().values(),
        [0.1, 0.2, 0.3, 0.4],
    );
    assert_close(
        loaded.cell(Category::Tin, Action::Open).unwrap().values(),
        [0.0, 0.0, 0.0, 1.0],
    );
    for (_, _, cell) in loaded.iter() {
        assert!(cell.is_normalized());
    }
}

#[test]
fn strict_load_of_missing_file_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = CompatibilityStore::load(
        &dir.path().join("absent.map"),
        &AffordanceCatalog::standard(),
        1.0,
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[test]
fn malformed_store_falls_back_to_prior() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("templates.map");
    std::fs::write(&path, "  2        Box   1      Grasp  not-a-number\n").unwrap();

    let catalog = AffordanceCatalog::standard();
    assert!(CompatibilityStore::load(&path, &catalog, 1.0).is_err());

    let store = CompatibilityStore::load_or_default(&path, &catalog, 1.0);
    assert_eq!(store, CompatibilityStore::new(&catalog, 1.0));
}

#[test]
fn learned_template_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("data").join("templates.map");

    // First session: resolve (Grasp, Box1) and persist.
    {
        let mut engine = persistent_engine(&path);
        engine
            .store_mut()
            .set_cell(Category::Box, Action::Grasp, CompatibilityCell::new([1.0, 1.0, 1.0, 1.0]));

        let prepared = engine
            .prepare(&Scene::from_pairs([("Box", 0.3), ("Carton", 0.3)]))
            .unwrap();
        let mut session = prepared.session();
        let outcome = session
            .run(&IntentOracle::new("Box1", Action::Grasp), engine.store_mut())
            .unwrap();
        assert!(matches!(outcome, Outcome::Resolved(_)));
        engine.persist().unwrap();
    }

    // Second session: the reinforced template is read back normalized.
    {
        let engine = persistent_engine(&path);
        assert_close(
            engine.store().cell(Category::Box, Action::Grasp).unwrap().values(),
            [0.2, 0.2, 0.2, 0.4],
        );
    }
}

#[test]
fn reset_then_persist_restores_prior_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("templates.map");

    {
        let mut engine = persistent_engine(&path);
        engine
            .store_mut()
            .set_cell(Category::Cup, Action::Drink, CompatibilityCell::new([3.0, 0.0, 0.0, 1.0]));
        engine.persist().unwrap();
    }
    {
        let mut engine = persistent_engine(&path);
        assert_close(
            engine.store().cell(Category::Cup, Action::Drink).unwrap().values(),
            [0.75, 0.0, 0.0, 0.25],
        );
        engine.reset_templates();
        engine.persist().unwrap();
    }

    let engine = persistent_engine(&path);
    assert_close(
        engine.store().cell(Category::Cup, Action::Drink).unwrap().values(),
        [0.0, 0.0, 0.0, 1.0],
    );
}

#[test]
fn scene_list_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("scenes").join("kitchen.txt");

    let list = SceneList::new(vec![
        Scene::from_pairs([("Box", 0.3), ("Carton", 0.45)]),
        Scene::from_pairs([("Mug", 0.125)]),
        Scene::from_pairs([("Bottle", 1.5), ("Bottle", 0.75), ("SprayCan", 2.0)]),
    ]);
    list.save(&path).unwrap();

    let loaded = SceneList::load(&path).unwrap();
    assert_eq!(loaded, list);
    assert_eq!(loaded.get(2).unwrap().len(), 3);
    assert!(loaded.get(3).is_err());
}

#[test]
fn scene_list_file_drives_a_session() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("scenes.txt");
    std::fs::write(
        &path,
        "2\n\n0\n1\n       Tube 0.5\n\n1\n2\n        Cup 0.2\n        Tin 0.6\n\n",
    )
    .unwrap();

    let list = SceneList::load(&path).unwrap();
    let mut engine = Engine::new(EngineConfig {
        seed: Some(2),
        rank_policy: RankPolicy::Count,
        ..Default::default()
    })
    .unwrap();

    let prepared = engine.prepare(list.get(1).unwrap()).unwrap();
    let mut session = prepared.session();
    let outcome = session
        .run(&IntentOracle::new("Tin1", Action::Open), engine.store_mut())
        .unwrap();
    assert!(matches!(outcome, Outcome::Resolved(ref i) if i.object == "Tin1"));
}

#[test]
fn config_file_configures_engine() {
    let dir = tempfile::TempDir::new().unwrap();
    let paths = IntentPaths::under(dir.path());
    paths.ensure_dirs().unwrap();

    let file = FileConfig {
        learning_rate: 2.0,
        rank_policy: RankPolicy::Unranked,
        seed: Some(4),
        ..FileConfig::default()
    };
    file.save(&paths.config_file()).unwrap();

    let loaded = FileConfig::load_or_default(&paths.config_file()).unwrap();
    assert_eq!(loaded, file);

    let mut engine = Engine::new(loaded.to_engine_config(&paths)).unwrap();
    assert_eq!(engine.store().learning_rate(), 2.0);

    let prepared = engine.prepare(&Scene::from_pairs([("Bowl", 0.4)])).unwrap();
    let mut session = prepared.session();
    session
        .run(&IntentOracle::new("Bowl1", Action::Push), engine.store_mut())
        .unwrap();
    engine.persist().unwrap();
    assert!(paths.store_file().exists());
}
