//! World-state facts.
//!
//! A [`State`] maps each declared predicate to the set of ground tuples currently true for it.
//! Fact sets are shared between snapshots and copied only when one snapshot writes to them, so
//! cloning a state to branch over alternative groundings is cheap.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::normalize;
use crate::error::EvaluationError;

/// A ground tuple of object identifiers.
pub type Fact = Vec<String>;

/// Read access to a state, as needed by precondition evaluation.
pub trait StateView {
    /// Facts stored under `predicate`, or `None` when the predicate was never declared.
    ///
    /// Implementations accept any spelling of the predicate name.
    fn facts_for(&self, predicate: &str) -> Option<&BTreeSet<Fact>>;

    fn predicate_declared(&self, predicate: &str) -> bool {
        self.facts_for(predicate).is_some()
    }

    /// Whether `tuple` is stored under `predicate`.
    fn holds(&self, predicate: &str, tuple: &[String]) -> Result<bool, EvaluationError> {
        self.facts_for(predicate)
            .map(|facts| facts.contains(tuple))
            .ok_or_else(|| EvaluationError::UndefinedPredicate(normalize(predicate)))
    }
}

/// A snapshot of the world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    predicates: BTreeMap<String, Arc<BTreeSet<Fact>>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `predicate` to the schema. Existing facts are kept.
    pub fn declare(&mut self, predicate: &str) -> &mut Self {
        self.predicates.entry(normalize(predicate)).or_default();
        self
    }

    /// Inserts a fact in place. Returns whether the fact was new.
    pub fn insert<I, S>(&mut self, predicate: &str, tuple: I) -> Result<bool, EvaluationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tuple: Fact = tuple.into_iter().map(Into::into).collect();
        let facts = self.facts_mut(predicate)?;
        if facts.contains(&tuple) {
            return Ok(false);
        }
        Ok(Arc::make_mut(facts).insert(tuple))
    }

    /// Removes a fact in place. Returns whether the fact was present.
    pub fn remove<I, S>(&mut self, predicate: &str, tuple: I) -> Result<bool, EvaluationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tuple: Fact = tuple.into_iter().map(Into::into).collect();
        let facts = self.facts_mut(predicate)?;
        if !facts.contains(&tuple) {
            return Ok(false);
        }
        Ok(Arc::make_mut(facts).remove(&tuple))
    }

    /// A new snapshot with `tuple` added; `self` is left untouched.
    pub fn with_fact_added<I, S>(&self, predicate: &str, tuple: I) -> Result<State, EvaluationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.insert(predicate, tuple)?;
        Ok(next)
    }

    /// A new snapshot with `tuple` removed; `self` is left untouched.
    pub fn with_fact_removed<I, S>(&self, predicate: &str, tuple: I) -> Result<State, EvaluationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.remove(predicate, tuple)?;
        Ok(next)
    }

    /// Number of facts across all predicates.
    pub fn len(&self) -> usize {
        self.predicates.values().map(|facts| facts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn predicates(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    fn facts_mut(&mut self, predicate: &str) -> Result<&mut Arc<BTreeSet<Fact>>, EvaluationError> {
        let predicate = normalize(predicate);
        match self.predicates.get_mut(&predicate) {
            Some(facts) => Ok(facts),
            None => Err(EvaluationError::UndefinedPredicate(predicate)),
        }
    }
}

impl StateView for State {
    fn facts_for(&self, predicate: &str) -> Option<&BTreeSet<Fact>> {
        self.predicates.get(&normalize(predicate)).map(Arc::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(items: &[&str]) -> Fact {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn insert_and_remove_are_idempotent() {
        let mut state = State::new();
        state.declare("at");

        assert!(state.insert("at", ["robot1", "roomA"]).unwrap());
        assert!(!state.insert("at", ["robot1", "roomA"]).unwrap());
        assert_eq!(state.len(), 1);

        assert!(state.remove("at", ["robot1", "roomA"]).unwrap());
        assert!(!state.remove("at", ["robot1", "roomA"]).unwrap());
        assert!(state.is_empty());
        assert!(state.predicate_declared("AT"));
    }

    #[test]
    fn undeclared_predicate_is_an_error() {
        let mut state = State::new();
        let err = state.insert("at", ["robot1", "roomA"]).unwrap_err();
        assert_eq!(err, EvaluationError::UndefinedPredicate("AT".to_string()));
        assert_eq!(
            state.holds("AT", &fact(&["robot1"])).unwrap_err(),
            EvaluationError::UndefinedPredicate("AT".to_string())
        );
    }

    #[test]
    fn lookups_accept_the_declared_spelling() {
        let mut state = State::new();
        state.declare("at");
        state.insert("at", ["robot1", "roomA"]).unwrap();

        assert!(state.predicate_declared("at"));
        assert_eq!(state.holds("at", &fact(&["robot1", "roomA"])), Ok(true));
        assert_eq!(state.facts_for("At").map(|facts| facts.len()), Some(1));
        assert_eq!(
            state.holds("free", &fact(&["roomA"])),
            Err(EvaluationError::UndefinedPredicate("FREE".to_string()))
        );
    }

    #[test]
    fn declared_predicate_without_facts_does_not_hold() {
        let mut state = State::new();
        state.declare("at");
        assert_eq!(state.holds("AT", &fact(&["robot1", "roomA"])), Ok(false));
    }

    #[test]
    fn holds_requires_positional_equality() {
        let mut state = State::new();
        state.declare("connected");
        state.insert("connected", ["roomA", "roomB"]).unwrap();

        assert_eq!(state.holds("CONNECTED", &fact(&["roomA", "roomB"])), Ok(true));
        assert_eq!(state.holds("CONNECTED", &fact(&["roomB", "roomA"])), Ok(false));
        assert_eq!(state.holds("CONNECTED", &fact(&["roomA"])), Ok(false));
    }

    #[test]
    fn persistent_updates_leave_the_source_snapshot_untouched() {
        let mut base = State::new();
        base.declare("at");
        base.insert("at", ["robot1", "roomA"]).unwrap();

        let moved = base
            .with_fact_removed("at", ["robot1", "roomA"])
            .and_then(|s| s.with_fact_added("at", ["robot1", "roomB"]))
            .unwrap();

        assert_eq!(base.holds("AT", &fact(&["robot1", "roomA"])), Ok(true));
        assert_eq!(base.holds("AT", &fact(&["robot1", "roomB"])), Ok(false));
        assert_eq!(moved.holds("AT", &fact(&["robot1", "roomA"])), Ok(false));
        assert_eq!(moved.holds("AT", &fact(&["robot1", "roomB"])), Ok(true));
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = State::new();
        state.declare("at").declare("free");
        state.insert("at", ["robot1", "roomA"]).unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
