//! Grounding and applicability of STRIPS-style planning primitives.
//!
//! This crate defines:
//! - [`Domain`]: the type table, typed objects and predicate signatures.
//! - [`State`]: a copy-on-write snapshot of the facts true in the world.
//! - [`Primitive`]: a typed action schema that binds arguments, checks its AND/OR precondition
//!   against a state and produces the successor state.
//! - [`Engine`]: a library of primitives defined against one domain.
//!
//! Evaluation never modifies a state. Applying a primitive returns a new snapshot, so callers may
//! branch over alternative groundings of the same predecessor, including from several threads
//! (see [`frontier`]).

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

pub mod archive;
pub mod domain;
pub mod error;
pub mod expression;
pub mod facts;
pub mod frontier;
pub mod primitive;
pub mod schema;

pub use archive::{ArchivedState, StateArchive, STATE_ARCHIVE_PATH};
pub use domain::{normalize, Domain, TypeRegistry};
pub use error::{ArchiveError, DefinitionError, EvaluationError, SchemaError};
pub use expression::{Effect, Expression, Literal, Term};
pub use facts::{Fact, State, StateView};
pub use primitive::{Binding, Parameter, Primitive};
pub use schema::{ActionSchema, DomainSchema};

/// A grounding of one primitive: its name and argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grounding {
    pub primitive: String,
    pub arguments: Vec<String>,
}

/// Primitives defined against a shared domain.
pub struct Engine {
    domain: Arc<Domain>,
    primitives: BTreeMap<String, Arc<Primitive>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("primitives", &self.primitives.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Engine {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain: Arc::new(domain),
            primitives: BTreeMap::new(),
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Defines a primitive. Names are unique after normalization.
    pub fn define<S: AsRef<str>>(
        &mut self,
        name: &str,
        parameter_tokens: &[S],
        precondition: Expression,
        effects: Vec<Effect>,
    ) -> Result<Arc<Primitive>, DefinitionError> {
        let key = normalize(name);
        if self.primitives.contains_key(&key) {
            return Err(DefinitionError::DuplicatePrimitive(key));
        }

        let primitive = Arc::new(Primitive::new(
            name,
            &*self.domain,
            parameter_tokens,
            precondition,
            effects,
        )?);
        info!(
            target: "strips",
            primitive = %key,
            parameters = primitive.parameters().len(),
            effects = primitive.effects().len(),
            "primitive defined"
        );
        self.primitives.insert(key, Arc::clone(&primitive));
        Ok(primitive)
    }

    pub fn primitive(&self, name: &str) -> Result<&Arc<Primitive>, EvaluationError> {
        let key = normalize(name);
        self.primitives
            .get(&key)
            .ok_or(EvaluationError::UnknownPrimitive(key))
    }

    pub fn primitives(&self) -> impl Iterator<Item = &Arc<Primitive>> {
        self.primitives.values()
    }

    /// Whether primitive `name`, grounded with `arguments`, may fire in `state`.
    pub fn is_applicable<S: AsRef<str>>(
        &self,
        name: &str,
        state: &State,
        arguments: &[S],
    ) -> Result<bool, EvaluationError> {
        self.primitive(name)?
            .evaluate(&*self.domain, state, arguments)
    }

    /// The successor of `state`, or `None` when the grounding is inapplicable.
    pub fn apply<S: AsRef<str>>(
        &self,
        name: &str,
        state: &State,
        arguments: &[S],
    ) -> Result<Option<State>, EvaluationError> {
        self.primitive(name)?
            .apply(&*self.domain, state, arguments)
    }

    /// Every applicable grounding of every primitive in `state`.
    pub fn applicable(&self, state: &State) -> Result<Vec<Grounding>, EvaluationError> {
        let mut out = Vec::new();
        for primitive in self.primitives.values() {
            for arguments in primitive.groundings(&self.domain, state)? {
                out.push(Grounding {
                    primitive: primitive.name().to_string(),
                    arguments,
                });
            }
        }
        Ok(out)
    }

    /// Evaluates `candidates` for primitive `name` in parallel against one snapshot.
    pub async fn evaluate_frontier(
        &self,
        name: &str,
        state: Arc<State>,
        candidates: Vec<Vec<String>>,
    ) -> Result<Vec<bool>, EvaluationError> {
        let primitive = Arc::clone(self.primitive(name)?);
        frontier::evaluate_candidates(primitive, Arc::clone(&self.domain), state, candidates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (Engine, State) {
        let mut domain = Domain::new();
        domain.declare_type("robot").declare_type("room");
        domain.declare_predicate("at", &["robot", "room"]).unwrap();
        domain.declare_predicate("connected", &["room", "room"]).unwrap();
        domain.declare_object("robot1", "robot").unwrap();
        for room in ["roomA", "roomB", "roomC"] {
            domain.declare_object(room, "room").unwrap();
        }

        let mut state = domain.initial_state();
        state.insert("at", ["robot1", "roomA"]).unwrap();
        state.insert("connected", ["roomA", "roomB"]).unwrap();
        state.insert("connected", ["roomB", "roomC"]).unwrap();

        let mut engine = Engine::new(domain);
        engine
            .define(
                "move",
                &["?r", "-", "robot", "?from", "-", "room", "?to", "-", "room"],
                Expression::and([
                    Expression::literal("at", ["?r", "?from"]),
                    Expression::literal("connected", ["?from", "?to"]),
                ]),
                vec![
                    Effect::remove("at", ["?r", "?from"]),
                    Effect::add("at", ["?r", "?to"]),
                ],
            )
            .unwrap();
        (engine, state)
    }

    #[test]
    fn move_then_move_again() {
        let (engine, state) = engine();

        assert!(engine.is_applicable("move", &state, &["robot1", "roomA", "roomB"]).unwrap());
        assert!(!engine.is_applicable("move", &state, &["robot1", "roomB", "roomC"]).unwrap());

        let state = engine
            .apply("move", &state, &["robot1", "roomA", "roomB"])
            .unwrap()
            .unwrap();
        assert!(engine.is_applicable("move", &state, &["robot1", "roomB", "roomC"]).unwrap());
    }

    #[test]
    fn applicable_lists_every_grounding() {
        let (engine, state) = engine();
        assert_eq!(
            engine.applicable(&state).unwrap(),
            vec![Grounding {
                primitive: "MOVE".to_string(),
                arguments: vec!["robot1".into(), "roomA".into(), "roomB".into()],
            }]
        );
    }

    #[test]
    fn unknown_and_duplicate_primitives() {
        let (mut engine, state) = engine();
        assert_eq!(
            engine.is_applicable("fly", &state, &["robot1"]),
            Err(EvaluationError::UnknownPrimitive("FLY".to_string()))
        );

        let err = engine
            .define("Move", &["?r", "-", "robot"], Expression::and([]), vec![])
            .unwrap_err();
        assert_eq!(err, DefinitionError::DuplicatePrimitive("MOVE".to_string()));
    }

    #[tokio::test]
    async fn frontier_matches_sequential_evaluation() {
        let (engine, state) = engine();
        let rooms = ["roomA", "roomB", "roomC"];
        let candidates: Vec<Vec<String>> = rooms
            .into_iter()
            .flat_map(|from| {
                rooms
                    .into_iter()
                    .map(move |to| vec!["robot1".to_string(), from.to_string(), to.to_string()])
            })
            .collect();

        let sequential: Vec<bool> = candidates
            .iter()
            .map(|args| engine.is_applicable("move", &state, args.as_slice()).unwrap())
            .collect();
        let parallel = engine
            .evaluate_frontier("move", Arc::new(state), candidates)
            .await
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn applied_states_can_be_archived() {
        let (engine, state) = engine();
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("failed to open temporary sled db");
        let archive = StateArchive::from_db(db);

        archive.record("init", &state).unwrap();
        let next = engine
            .apply("move", &state, &["robot1", "roomA", "roomB"])
            .unwrap()
            .unwrap();
        archive.record("move robot1 roomA roomB", &next).unwrap();

        let history = archive.history(0).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].state, state);
        assert_eq!(history[1].state, next);
    }
}
