//! Error taxonomy.
//!
//! Definition errors are raised while a [`crate::Primitive`] (or the [`crate::Domain`] it is
//! defined against) is being built and never afterwards. Evaluation errors are raised by
//! binding and evaluation; an inapplicable grounding is not an error and is reported as
//! `Ok(false)` / `Ok(None)` instead.

use thiserror::Error;

/// A malformed domain or action schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("type {0} not defined")]
    UndefinedType(String),

    #[error("token {0} not defined")]
    UnknownOperator(String),

    #[error("empty expression")]
    EmptyExpression,

    #[error("parameter {parameter} referenced by {predicate} is not declared by {primitive}")]
    DanglingParameter {
        primitive: String,
        predicate: String,
        parameter: String,
    },

    #[error("parameter {parameter} declared twice by {primitive}")]
    DuplicateParameter { primitive: String, parameter: String },

    #[error("malformed parameter list for {primitive}: {reason}")]
    MalformedParameters { primitive: String, reason: String },

    #[error("predicate {predicate} takes {expected} arguments, {found} given")]
    ArityMismatch {
        predicate: String,
        expected: usize,
        found: usize,
    },

    #[error("primitive {0} defined twice")]
    DuplicatePrimitive(String),
}

/// Failure while binding or evaluating a grounding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("{primitive} takes {expected} arguments, {found} given")]
    MalformedCall {
        primitive: String,
        expected: usize,
        found: usize,
    },

    #[error("object {0} not defined")]
    UnknownObject(String),

    #[error("{0} not defined")]
    UndefinedPredicate(String),

    #[error("primitive {0} not defined")]
    UnknownPrimitive(String),

    #[error("evaluation task failed: {0}")]
    Join(String),
}

/// Failure reading or writing the state archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Sled(#[from] sled::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("corrupt archive key {0}")]
    CorruptKey(String),
}

/// Failure loading a JSON domain schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
