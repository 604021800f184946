//! Rich diagnostic error types for the intent-probe engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::paths::PathError;

/// Top-level error type for the intent-probe engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum IntentError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infer(#[from] InferError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("unknown object category: \"{label}\"")]
    #[diagnostic(
        code(intent::catalog::unknown_category),
        help(
            "Valid categories are: Bottle, Bowl, Box, Can, Carton, Cup, Mug, \
             SprayCan, Tin, Tube, Tub."
        )
    )]
    UnknownCategory { label: String },

    #[error("unknown action: \"{label}\"")]
    #[diagnostic(
        code(intent::catalog::unknown_action),
        help("Valid actions are: Drink, Grasp, Move, Open, Pour, Push, Squeeze.")
    )]
    UnknownAction { label: String },

    #[error("category index {index} out of range (0..{max})")]
    #[diagnostic(
        code(intent::catalog::category_index),
        help("Category indices run from 0 (Bottle) to 10 (Tub).")
    )]
    CategoryIndex { index: usize, max: usize },

    #[error("action index {index} out of range (0..{max})")]
    #[diagnostic(
        code(intent::catalog::action_index),
        help("Action indices run from 0 (Drink) to 6 (Squeeze).")
    )]
    ActionIndex { index: usize, max: usize },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error on template store {path}: {source}")]
    #[diagnostic(
        code(intent::store::io),
        help(
            "A filesystem operation failed. Check that the store file exists, \
             its directory is writable, and the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template line {line}: {message}")]
    #[diagnostic(
        code(intent::store::parse),
        help(
            "Each line must read `categoryIndex categoryName actionIndex actionName v0 v1 v2 v3` \
             with non-negative values that do not all equal zero."
        )
    )]
    Parse { line: usize, message: String },

    #[error("template line {line}: {category} does not afford {action}")]
    #[diagnostic(
        code(intent::store::not_afforded),
        help(
            "The store only holds cells for pairs the affordance catalog permits. \
             Remove the line or reset the templates."
        )
    )]
    NotAfforded {
        line: usize,
        category: String,
        action: String,
    },
}

// ---------------------------------------------------------------------------
// Scene errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SceneError {
    #[error("I/O error on scene list {path}: {source}")]
    #[diagnostic(
        code(intent::scene::io),
        help("Check that the scene-list file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scene list line {line}: {message}")]
    #[diagnostic(
        code(intent::scene::malformed),
        help(
            "A scene list starts with the session count, then for every session an index \
             line, an object-count line, and one `name distance` line per object."
        )
    )]
    Malformed { line: usize, message: String },

    #[error("scene list line {line}: distance {distance} for \"{label}\" is not positive")]
    #[diagnostic(
        code(intent::scene::distance),
        help("Distances must be positive, finite numbers; smaller means closer.")
    )]
    NonPositiveDistance {
        line: usize,
        label: String,
        distance: f64,
    },

    #[error("scene list ended after {found} of {expected} sessions")]
    #[diagnostic(
        code(intent::scene::truncated),
        help("The session count on the first line does not match the sessions present.")
    )]
    Truncated { expected: usize, found: usize },

    #[error("scene index {index} out of range: list holds {len} scenes")]
    #[diagnostic(
        code(intent::scene::index),
        help("Scene indices are zero-based.")
    )]
    IndexOutOfRange { index: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("observation {position} names unknown category \"{label}\"")]
    #[diagnostic(
        code(intent::graph::unknown_category),
        help(
            "Every observation label must be a catalog category. No network was built; \
             fix the scene and retry."
        )
    )]
    UnknownCategory { position: usize, label: String },

    #[error("observation {position} (\"{label}\") has invalid distance {distance}")]
    #[diagnostic(
        code(intent::graph::distance),
        help("Distances must be positive, finite numbers.")
    )]
    InvalidDistance {
        position: usize,
        label: String,
        distance: f64,
    },

    #[error("cannot build an intention network from an empty scene")]
    #[diagnostic(
        code(intent::graph::empty_scene),
        help("Provide at least one observation.")
    )]
    EmptyScene,

    #[error("node {index} does not exist in the intention network")]
    #[diagnostic(
        code(intent::graph::node_not_found),
        help("Node indices are only valid for the network that produced them.")
    )]
    NodeNotFound { index: usize },
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InferError {
    #[error("exact inference over {variables} variables exceeds the limit of {max}")]
    #[diagnostic(
        code(intent::infer::too_large),
        help(
            "Exact enumeration is exponential in the variable count. Use loopy belief \
             propagation for larger scenes."
        )
    )]
    TooLarge { variables: usize, max: usize },

    #[error("inconsistent evidence: node \"{node}\" has zero total belief")]
    #[diagnostic(
        code(intent::infer::degenerate),
        help(
            "The observations and potentials assign zero probability to every state of this \
             node. Clear conflicting evidence or reset the templates."
        )
    )]
    Degenerate { node: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("no query candidates remain")]
    #[diagnostic(
        code(intent::query::no_candidates),
        help("Check `QuerySession::is_empty()` before selecting or evaluating a query.")
    )]
    NoCandidates,

    #[error("no query has been proposed yet")]
    #[diagnostic(
        code(intent::query::no_proposal),
        help("Call `select_query()` before `evaluate()`.")
    )]
    NoProposal,

    #[error("session already finished: {state}")]
    #[diagnostic(
        code(intent::query::closed),
        help("Start a new session for the next scene.")
    )]
    SessionClosed { state: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(intent::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("no template store path configured")]
    #[diagnostic(
        code(intent::engine::no_store_path),
        help("Set `store_path` in the configuration to persist learned templates.")
    )]
    NoStorePath,
}

/// Convenience alias for functions returning intent-probe results.
pub type IntentResult<T> = std::result::Result<T, IntentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_converts_to_intent_error() {
        let err = GraphError::EmptyScene;
        let top: IntentError = err.into();
        assert!(matches!(top, IntentError::Graph(GraphError::EmptyScene)));
    }

    #[test]
    fn infer_error_wraps_graph_error() {
        let err: InferError = GraphError::NodeNotFound { index: 7 }.into();
        assert!(matches!(
            err,
            InferError::Graph(GraphError::NodeNotFound { index: 7 })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = SceneError::NonPositiveDistance {
            line: 4,
            label: "Box".into(),
            distance: -0.5,
        };
        let msg = format!("{err}");
        assert!(msg.contains("line 4"));
        assert!(msg.contains("Box"));
        assert!(msg.contains("-0.5"));
    }
}
