//! JSON description of a domain, its action schemas and an initial state.
//!
//! ```json
//! {
//!   "types": ["robot", "room"],
//!   "objects": { "robot1": "robot", "roomA": "room" },
//!   "predicates": { "at": ["robot", "room"] },
//!   "actions": [{
//!     "name": "move",
//!     "parameters": ["?r", "-", "robot", "?from", "-", "room", "?to", "-", "room"],
//!     "precondition": ["and", ["at", "?r", "?from"]],
//!     "effect": ["and", ["not", ["at", "?r", "?from"]], ["at", "?r", "?to"]]
//!   }],
//!   "init": [["at", "robot1", "roomA"]]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{DefinitionError, SchemaError};
use crate::expression::{Effect, Expression, Term};
use crate::facts::State;
use crate::Engine;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSchema {
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub objects: BTreeMap<String, String>,
    #[serde(default)]
    pub predicates: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub actions: Vec<ActionSchema>,
    /// Initial facts, each written `[predicate, object...]`.
    #[serde(default)]
    pub init: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSchema {
    pub name: String,
    pub parameters: Vec<String>,
    pub precondition: Term,
    #[serde(default = "no_effects")]
    pub effect: Term,
}

fn no_effects() -> Term {
    Term::List(Vec::new())
}

impl DomainSchema {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn domain(&self) -> Result<Domain, DefinitionError> {
        let mut domain = Domain::new();
        for type_name in &self.types {
            domain.declare_type(type_name);
        }
        for (object, type_name) in &self.objects {
            domain.declare_object(object, type_name)?;
        }
        for (predicate, argument_types) in &self.predicates {
            domain.declare_predicate(predicate, argument_types.as_slice())?;
        }
        Ok(domain)
    }

    /// Builds an engine with every action defined, plus the initial state.
    pub fn into_engine(self) -> Result<(Engine, State), SchemaError> {
        let domain = self.domain()?;
        let mut state = domain.initial_state();
        for fact in &self.init {
            let (predicate, objects) = fact.split_first().ok_or(DefinitionError::EmptyExpression)?;
            state.insert(predicate, objects.iter().cloned())?;
        }

        let mut engine = Engine::new(domain);
        for action in &self.actions {
            engine.define(
                &action.name,
                action.parameters.as_slice(),
                Expression::parse(&action.precondition)?,
                Effect::parse_list(&action.effect)?,
            )?;
        }
        Ok((engine, state))
    }
}
