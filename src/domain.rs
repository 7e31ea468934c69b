//! Types, objects and predicate signatures of a planning domain.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;
use crate::facts::State;

/// Canonical spelling of type, predicate and primitive names.
///
/// Applied once when a name enters the engine; every later comparison is exact.
pub fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Read access to the type table and the object → type lookup.
pub trait TypeRegistry {
    fn type_exists(&self, type_name: &str) -> bool;

    /// The (normalized) type of `object`, or `None` for an unknown object.
    fn object_type(&self, object: &str) -> Option<&str>;

    /// Declared argument count of `predicate`, when the registry knows the predicate.
    fn predicate_arity(&self, _predicate: &str) -> Option<usize> {
        None
    }
}

/// In-memory domain: type table, typed objects and predicate signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    types: BTreeSet<String>,
    objects: BTreeMap<String, String>,
    predicates: BTreeMap<String, Vec<String>>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_type(&mut self, type_name: &str) -> &mut Self {
        self.types.insert(normalize(type_name));
        self
    }

    pub fn declare_object(&mut self, object: &str, type_name: &str) -> Result<(), DefinitionError> {
        let type_name = self.require_type(type_name)?;
        self.objects.insert(object.to_string(), type_name);
        Ok(())
    }

    pub fn declare_predicate<S: AsRef<str>>(
        &mut self,
        predicate: &str,
        argument_types: &[S],
    ) -> Result<(), DefinitionError> {
        let argument_types = argument_types
            .iter()
            .map(|t| self.require_type(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.predicates.insert(normalize(predicate), argument_types);
        Ok(())
    }

    fn require_type(&self, type_name: &str) -> Result<String, DefinitionError> {
        let normalized = normalize(type_name);
        if self.types.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(DefinitionError::UndefinedType(normalized))
        }
    }

    /// Objects whose type is `type_name`, in identifier order.
    pub fn objects_of_type<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let type_name = normalize(type_name);
        self.objects
            .iter()
            .filter(move |(_, t)| **t == type_name)
            .map(|(o, _)| o.as_str())
    }

    pub fn predicate_signature(&self, predicate: &str) -> Option<&[String]> {
        self.predicates.get(&normalize(predicate)).map(Vec::as_slice)
    }

    /// An empty state whose schema declares every predicate of this domain.
    pub fn initial_state(&self) -> State {
        let mut state = State::new();
        for predicate in self.predicates.keys() {
            state.declare(predicate);
        }
        state
    }
}

impl TypeRegistry for Domain {
    fn type_exists(&self, type_name: &str) -> bool {
        self.types.contains(&normalize(type_name))
    }

    fn object_type(&self, object: &str) -> Option<&str> {
        self.objects.get(object).map(String::as_str)
    }

    fn predicate_arity(&self, predicate: &str) -> Option<usize> {
        self.predicates.get(&normalize(predicate)).map(Vec::len)
    }
}
