// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # intent-probe
//!
//! Interactive object-action intention recognition. Given the objects visible
//! in a scene and their distances, intent-probe builds a pairwise probabilistic
//! model, ranks yes/no questions by belief, and prunes them against the user's
//! answers until one (object, action) pair is confirmed. Confirmed pairs are
//! folded back into persistent templates for the next scene.
//!
//! ## Architecture
//!
//! - **Catalog** (`catalog`): categories, actions and the affordance table
//! - **Store** (`store`): learned compatibility templates and co-occurrence counts
//! - **Graph** (`graph`): intention network (petgraph arena) and scene construction
//! - **Inference** (`infer`): `BeliefSolver` trait with loopy BP and exact solvers
//! - **Queries** (`query`): candidates, ranking policies and the interactive session
//! - **Learning** (`learn`): single-observation and batch-average template updates
//!
//! ## Library usage
//!
//! ```no_run
//! use intent_probe::engine::{Engine, EngineConfig};
//! use intent_probe::query::Outcome;
//! use intent_probe::scene::Scene;
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! let scene = Scene::from_pairs([("Box", 0.3), ("Carton", 0.45)]);
//! let (_, mut session) = engine.start_session(&scene).unwrap();
//!
//! loop {
//!     let question = session.select_query().unwrap().question();
//!     let accepted = question == "Do you want to Open Box1?";
//!     match engine.evaluate(&mut session, accepted).unwrap() {
//!         Outcome::Continue => continue,
//!         outcome => break println!("{outcome:?}"),
//!     }
//! }
//! ```

pub mod belief;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod infer;
pub mod learn;
pub mod paths;
pub mod query;
pub mod scene;
pub mod store;
