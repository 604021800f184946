//! Engine facade: top-level API for intent-probe.
//!
//! The `Engine` owns the affordance catalog, the template store, the running
//! co-occurrence counts, the solver and the ranker, and wires one scene
//! through the pipeline:
//!
//! ```text
//! scene → SceneGraphBuilder → BeliefSolver → BeliefLists → QueryRanker → QuerySession
//!                                                                           │
//!                  CompatibilityStore ◀── TemplateLearner ◀─────────────────┘
//! ```

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::belief::{BeliefLists, BeliefSource};
use crate::catalog::AffordanceCatalog;
use crate::error::{EngineError, IntentResult};
use crate::graph::{SceneGraph, SceneGraphBuilder};
use crate::infer::{BeliefSolver, Beliefs, SolverConfig};
use crate::learn::TemplateLearner;
use crate::query::{candidates_from, Outcome, QueryCandidate, QueryRanker, QuerySession, RankPolicy, TieBreak};
use crate::scene::Scene;
use crate::store::{CompatibilityStore, CooccurrenceCounts, DEFAULT_LEARNING_RATE};

/// Configuration for the intent-probe engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Template store file. `None` for memory-only mode.
    pub store_path: Option<PathBuf>,
    /// Amount added to a template's (1,1) entry per confirmed intention.
    pub learning_rate: f64,
    pub belief_source: BeliefSource,
    pub rank_policy: RankPolicy,
    pub tie_break: TieBreak,
    /// RNG seed for tie-breaks and shuffling; entropy when `None`.
    pub seed: Option<u64>,
    pub solver: SolverConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            learning_rate: DEFAULT_LEARNING_RATE,
            belief_source: BeliefSource::default(),
            rank_policy: RankPolicy::default(),
            tie_break: TieBreak::default(),
            seed: None,
            solver: SolverConfig::default(),
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), EngineError> {
        let invalid = |message: &str| {
            Err(EngineError::InvalidConfig {
                message: message.to_string(),
            })
        };
        if !(self.learning_rate.is_finite() && self.learning_rate >= 0.0) {
            return invalid("learning_rate must be a finite, non-negative number");
        }
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            return invalid("solver.tolerance must be > 0");
        }
        if self.solver.max_iterations == 0 {
            return invalid("solver.max_iterations must be > 0");
        }
        if !(0.0..1.0).contains(&self.solver.damping) {
            return invalid("solver.damping must lie in [0, 1)");
        }
        if self.solver.max_exact_variables > 30 {
            return invalid("solver.max_exact_variables must be at most 30");
        }
        Ok(())
    }
}

/// A scene carried through construction, scoring and ranking.
#[derive(Debug, Clone)]
pub struct PreparedScene {
    pub graph: SceneGraph,
    /// Solver output, when the belief source is [`BeliefSource::Inferred`].
    pub beliefs: Option<Beliefs>,
    /// Ranked candidates.
    pub candidates: Vec<QueryCandidate>,
}

impl PreparedScene {
    /// Start an interactive session over the ranked candidates.
    pub fn session(&self) -> QuerySession {
        QuerySession::new(self.candidates.clone())
    }
}

/// The intent-probe engine.
pub struct Engine {
    config: EngineConfig,
    catalog: AffordanceCatalog,
    store: CompatibilityStore,
    counts: CooccurrenceCounts,
    solver: Box<dyn BeliefSolver>,
    ranker: QueryRanker,
}

impl Engine {
    /// Create an engine with the standard catalog and the configured solver.
    ///
    /// A configured store file is loaded leniently: if it is missing or
    /// malformed the engine starts from the default prior.
    pub fn new(config: EngineConfig) -> IntentResult<Self> {
        let solver = config.solver.build();
        Self::with_solver(config, solver)
    }

    /// Create an engine around a caller-supplied solver.
    pub fn with_solver(config: EngineConfig, solver: Box<dyn BeliefSolver>) -> IntentResult<Self> {
        config.validate()?;
        let catalog = AffordanceCatalog::standard();

        let store = match &config.store_path {
            Some(path) => CompatibilityStore::load_or_default(path, &catalog, config.learning_rate),
            None => CompatibilityStore::new(&catalog, config.learning_rate),
        };

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let ranker = QueryRanker::new(config.rank_policy, config.tie_break, rng);

        tracing::info!(
            solver = solver.name(),
            pairs = catalog.pair_count(),
            learning_rate = config.learning_rate,
            belief_source = ?config.belief_source,
            rank_policy = ?config.rank_policy,
            persistent = config.store_path.is_some(),
            "initializing intent-probe engine"
        );

        Ok(Self {
            config,
            catalog,
            store,
            counts: CooccurrenceCounts::new(),
            solver,
            ranker,
        })
    }

    /// Build the intention network for a scene, recording co-occurrences.
    pub fn build(&mut self, scene: &Scene) -> IntentResult<SceneGraph> {
        let builder = SceneGraphBuilder::new(&self.catalog, &self.store);
        Ok(builder.build(scene, &mut self.counts)?)
    }

    /// Solve a built network.
    pub fn infer(&self, graph: &SceneGraph) -> IntentResult<Beliefs> {
        let beliefs = self.solver.solve(&graph.network)?;
        tracing::info!(
            solver = self.solver.name(),
            iterations = beliefs.iterations,
            converged = beliefs.converged,
            "scene solved"
        );
        Ok(beliefs)
    }

    /// Score a built scene from the configured belief source.
    pub fn score(&self, graph: &SceneGraph) -> IntentResult<(BeliefLists, Option<Beliefs>)> {
        match self.config.belief_source {
            BeliefSource::Inferred => {
                let beliefs = self.infer(graph)?;
                let lists = BeliefLists::from_beliefs(&graph.network, &beliefs)?;
                Ok((lists, Some(beliefs)))
            }
            BeliefSource::Frequency => Ok((
                BeliefLists::from_counts(&graph.network, &self.counts)?,
                None,
            )),
            BeliefSource::Uniform => Ok((BeliefLists::uniform(&graph.network, 1.0)?, None)),
        }
    }

    /// Order candidates under the configured policy.
    pub fn rank(&mut self, candidates: &mut Vec<QueryCandidate>) {
        self.ranker.rank(candidates);
    }

    /// Build, score and rank one scene.
    pub fn prepare(&mut self, scene: &Scene) -> IntentResult<PreparedScene> {
        let graph = self.build(scene)?;
        let (lists, beliefs) = self.score(&graph)?;
        let mut candidates = candidates_from(&lists);
        self.rank(&mut candidates);
        tracing::info!(
            candidates = candidates.len(),
            policy = ?self.ranker.policy(),
            "scene prepared"
        );
        Ok(PreparedScene {
            graph,
            beliefs,
            candidates,
        })
    }

    /// Prepare a scene and open a session over it.
    pub fn start_session(&mut self, scene: &Scene) -> IntentResult<(PreparedScene, QuerySession)> {
        let prepared = self.prepare(scene)?;
        let session = prepared.session();
        Ok((prepared, session))
    }

    /// Apply an answer to a session, reinforcing the store on resolution.
    pub fn evaluate(&mut self, session: &mut QuerySession, accepted: bool) -> IntentResult<Outcome> {
        Ok(session.evaluate(accepted, &mut self.store)?)
    }

    /// Batch-average the scene's potentials into the store, then refresh the
    /// scene's network from the updated templates.
    pub fn learn_from_scene(&mut self, graph: &mut SceneGraph) -> IntentResult<usize> {
        let updated = TemplateLearner::batch_average(&mut self.store, &graph.book);
        graph.refresh(&self.store)?;
        Ok(updated)
    }

    /// Unranked candidates over the whole catalog: one instance of every
    /// category, every afforded pair. Independent of any scene and of the
    /// running counts.
    pub fn catalog_candidates(&mut self) -> IntentResult<Vec<QueryCandidate>> {
        let mut scratch = CooccurrenceCounts::new();
        let graph = SceneGraphBuilder::new(&self.catalog, &self.store)
            .build(&Scene::one_of_each(), &mut scratch)?;
        let lists = BeliefLists::uniform(&graph.network, 1.0)?;
        let mut candidates = candidates_from(&lists);
        self.ranker.rank_with(RankPolicy::Unranked, &mut candidates);
        Ok(candidates)
    }

    /// Write the store to the configured path.
    pub fn persist(&self) -> IntentResult<()> {
        let path = self
            .config
            .store_path
            .as_ref()
            .ok_or(EngineError::NoStorePath)?;
        self.store.save(path)?;
        Ok(())
    }

    /// Reset every template to the default prior (in memory).
    pub fn reset_templates(&mut self) {
        self.store.reset_to_default();
    }

    pub fn catalog(&self) -> &AffordanceCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &CompatibilityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CompatibilityStore {
        &mut self.store
    }

    pub fn counts(&self) -> &CooccurrenceCounts {
        &self.counts
    }

    pub fn solver(&self) -> &dyn BeliefSolver {
        self.solver.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Summary of the engine state.
    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            solver: self.solver.name().to_string(),
            categories: crate::catalog::Category::COUNT,
            pairs: self.catalog.pair_count(),
            learning_rate: self.store.learning_rate(),
            observed_pairs: self.counts.total(),
            store_path: self.config.store_path.clone(),
        }
    }
}

/// Summary returned by [`Engine::info`].
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub solver: String,
    pub categories: usize,
    pub pairs: usize,
    pub learning_rate: f64,
    pub observed_pairs: u64,
    pub store_path: Option<PathBuf>,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "intent-probe engine info")?;
        writeln!(f, "  solver:         {}", self.solver)?;
        writeln!(f, "  categories:     {}", self.categories)?;
        writeln!(f, "  pairs:          {}", self.pairs)?;
        writeln!(f, "  learning rate:  {}", self.learning_rate)?;
        writeln!(f, "  observed pairs: {}", self.observed_pairs)?;
        match &self.store_path {
            Some(path) => writeln!(f, "  store:          {}", path.display())?,
            None => writeln!(f, "  store:          (memory only)")?,
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("solver", &self.solver.name())
            .field("cells", &self.store.len())
            .field("observed_pairs", &self.counts.total())
            .finish()
    }
}
