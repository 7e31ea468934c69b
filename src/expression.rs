//! Precondition expressions and effects.
//!
//! Both are read from s-expression token trees ([`Term`]), e.g.
//! `["and", ["at", "?r", "?from"], ["or", ["free", "?to"], ["open", "?to"]]]`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::normalize;
use crate::error::DefinitionError;

/// Connectives this engine recognizes as operators but does not evaluate.
const UNSUPPORTED_CONNECTIVES: &[&str] = &["not", "imply", "forall", "exists", "when"];

/// An s-expression token tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    Atom(String),
    List(Vec<Term>),
}

impl Term {
    pub fn atom(token: impl Into<String>) -> Self {
        Term::Atom(token.into())
    }

    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        Term::List(items.into_iter().collect())
    }

    fn as_atom(&self) -> Option<&str> {
        match self {
            Term::Atom(token) => Some(token),
            Term::List(_) => None,
        }
    }
}

impl From<&str> for Term {
    fn from(token: &str) -> Self {
        Term::atom(token)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(token) => f.write_str(token),
            Term::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A predicate applied to parameter names, e.g. `(at ?obj ?loc)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub predicate: String,
    pub parameters: Vec<String>,
}

impl Literal {
    pub fn new<I, S>(predicate: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicate: normalize(predicate),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    fn parse(items: &[Term]) -> Result<Self, DefinitionError> {
        let (head, rest) = items.split_first().ok_or(DefinitionError::EmptyExpression)?;
        let predicate = head
            .as_atom()
            .ok_or_else(|| DefinitionError::UnknownOperator(head.to_string()))?;
        let parameters = rest
            .iter()
            .map(|term| {
                term.as_atom()
                    .map(str::to_string)
                    .ok_or_else(|| DefinitionError::UnknownOperator(term.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            predicate: normalize(predicate),
            parameters,
        })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate)?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str(")")
    }
}

/// Boolean structure of a precondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Literal(Literal),
}

impl Expression {
    pub fn and(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Or(children.into_iter().collect())
    }

    pub fn literal<I, S>(predicate: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expression::Literal(Literal::new(predicate, parameters))
    }

    /// Reads a precondition. The root must be an `and` or `or` form.
    pub fn parse(term: &Term) -> Result<Self, DefinitionError> {
        let items = match term {
            Term::Atom(token) => return Err(DefinitionError::UnknownOperator(token.clone())),
            Term::List(items) => items,
        };
        let head = items.first().ok_or(DefinitionError::EmptyExpression)?;
        match head.as_atom().map(str::to_lowercase).as_deref() {
            Some("and") | Some("or") => Self::parse_nested(term),
            _ => Err(DefinitionError::UnknownOperator(head.to_string())),
        }
    }

    fn parse_nested(term: &Term) -> Result<Self, DefinitionError> {
        let items = match term {
            Term::Atom(token) => return Err(DefinitionError::UnknownOperator(token.clone())),
            Term::List(items) => items,
        };
        let head = items.first().ok_or(DefinitionError::EmptyExpression)?;
        let Some(token) = head.as_atom() else {
            return Err(DefinitionError::UnknownOperator(head.to_string()));
        };
        let children = || {
            items[1..]
                .iter()
                .map(Self::parse_nested)
                .collect::<Result<Vec<_>, _>>()
        };
        match token.to_lowercase().as_str() {
            "and" => Ok(Expression::And(children()?)),
            "or" => Ok(Expression::Or(children()?)),
            op if UNSUPPORTED_CONNECTIVES.contains(&op) => {
                Err(DefinitionError::UnknownOperator(token.to_string()))
            }
            _ => Literal::parse(items).map(Expression::Literal),
        }
    }

    /// Every literal of the tree, depth first.
    pub fn literals(&self) -> Vec<&Literal> {
        let mut out = Vec::new();
        self.collect_literals(&mut out);
        out
    }

    fn collect_literals<'a>(&'a self, out: &mut Vec<&'a Literal>) {
        match self {
            Expression::And(children) | Expression::Or(children) => {
                for child in children {
                    child.collect_literals(out);
                }
            }
            Expression::Literal(literal) => out.push(literal),
        }
    }
}

/// A state change declared by a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Add(Literal),
    Remove(Literal),
}

impl Effect {
    pub fn add<I, S>(predicate: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Effect::Add(Literal::new(predicate, parameters))
    }

    pub fn remove<I, S>(predicate: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Effect::Remove(Literal::new(predicate, parameters))
    }

    pub fn literal(&self) -> &Literal {
        match self {
            Effect::Add(literal) | Effect::Remove(literal) => literal,
        }
    }

    /// Reads an effect list: `(and e1 e2 ...)`, a single effect, or `()` for none.
    ///
    /// Each effect is a literal (add) or `(not literal)` (remove).
    pub fn parse_list(term: &Term) -> Result<Vec<Self>, DefinitionError> {
        let items = match term {
            Term::Atom(token) => return Err(DefinitionError::UnknownOperator(token.clone())),
            Term::List(items) => items,
        };
        match items.first().and_then(Term::as_atom) {
            None if items.is_empty() => Ok(Vec::new()),
            Some(head) if head.eq_ignore_ascii_case("and") => {
                items[1..].iter().map(Self::parse).collect()
            }
            _ => Ok(vec![Self::parse(term)?]),
        }
    }

    fn parse(term: &Term) -> Result<Self, DefinitionError> {
        let items = match term {
            Term::Atom(token) => return Err(DefinitionError::UnknownOperator(token.clone())),
            Term::List(items) => items,
        };
        let head = items.first().ok_or(DefinitionError::EmptyExpression)?;
        let Some(token) = head.as_atom() else {
            return Err(DefinitionError::UnknownOperator(head.to_string()));
        };
        match token.to_lowercase().as_str() {
            "not" => match &items[1..] {
                [Term::List(inner)] => Literal::parse(inner).map(Effect::Remove),
                _ => Err(DefinitionError::UnknownOperator(term.to_string())),
            },
            op if op == "and" || op == "or" || UNSUPPORTED_CONNECTIVES.contains(&op) => {
                Err(DefinitionError::UnknownOperator(token.to_string()))
            }
            _ => Literal::parse(items).map(Effect::Add),
        }
    }
}
