//! Typed action schemas and their grounding.
//!
//! A [`Primitive`] is built once from a schema: its parameter list is decoded and type-checked,
//! and every parameter reference in the precondition and effects is resolved to a parameter
//! position. Grounding then binds an argument list positionally ([`Primitive::bind`]), checks the
//! precondition against a state ([`Binding::holds`]) and, when the caller commits, produces the
//! successor state ([`Binding::apply_effects`]).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{normalize, Domain, TypeRegistry};
use crate::error::{DefinitionError, EvaluationError};
use crate::expression::{Effect, Expression, Literal};
use crate::facts::{Fact, State, StateView};

/// Separator between parameter names and their type in a parameter token list.
pub const TYPE_SEPARATOR: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

/// A literal whose parameter references were resolved to argument positions.
#[derive(Debug, Clone)]
struct Template {
    predicate: String,
    slots: Vec<usize>,
}

#[derive(Debug, Clone)]
enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Holds(Template),
}

#[derive(Debug, Clone)]
enum Change {
    Add(Template),
    Remove(Template),
}

/// A typed action schema.
#[derive(Debug, Clone)]
pub struct Primitive {
    name: String,
    parameters: Vec<Parameter>,
    precondition: Expression,
    effects: Vec<Effect>,
    condition: Condition,
    changes: Vec<Change>,
}

impl Primitive {
    /// Builds a primitive from its schema.
    ///
    /// `parameter_tokens` is a flat list such as `["?r", "-", "robot", "?from", "-", "room"]`;
    /// several names may share one type (`["?from", "?to", "-", "room"]`).
    pub fn new<R, S>(
        name: &str,
        registry: &R,
        parameter_tokens: &[S],
        precondition: Expression,
        effects: Vec<Effect>,
    ) -> Result<Self, DefinitionError>
    where
        R: TypeRegistry + ?Sized,
        S: AsRef<str>,
    {
        let name = normalize(name);
        let parameters = parse_parameters(&name, registry, parameter_tokens)?;
        let compiler = Compiler {
            primitive: &name,
            parameters: &parameters,
            registry,
        };
        let condition = compiler.condition(&precondition)?;
        let changes = effects
            .iter()
            .map(|effect| match effect {
                Effect::Add(literal) => compiler.template(literal).map(Change::Add),
                Effect::Remove(literal) => compiler.template(literal).map(Change::Remove),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            parameters,
            precondition,
            effects,
            condition,
            changes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn precondition(&self) -> &Expression {
        &self.precondition
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Binds `arguments` to the parameters by position.
    ///
    /// Returns `Ok(None)` when an argument's type differs from its parameter's type; that
    /// grounding is simply inapplicable. A wrong argument count or an unknown object is an error.
    pub fn bind<'a, R, S>(
        &'a self,
        registry: &R,
        arguments: &'a [S],
    ) -> Result<Option<Binding<'a>>, EvaluationError>
    where
        R: TypeRegistry + ?Sized,
        S: AsRef<str>,
    {
        if arguments.len() != self.parameters.len() {
            return Err(EvaluationError::MalformedCall {
                primitive: self.name.clone(),
                expected: self.parameters.len(),
                found: arguments.len(),
            });
        }

        let object_types = arguments
            .iter()
            .map(|argument| {
                let argument = argument.as_ref();
                registry
                    .object_type(argument)
                    .ok_or_else(|| EvaluationError::UnknownObject(argument.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (parameter, object_type) in self.parameters.iter().zip(object_types) {
            if object_type != parameter.type_name {
                debug!(
                    target: "strips",
                    primitive = %self.name,
                    parameter = %parameter.name,
                    expected = %parameter.type_name,
                    found = %object_type,
                    "argument type mismatch"
                );
                return Ok(None);
            }
        }

        Ok(Some(Binding {
            primitive: self,
            arguments: arguments.iter().map(|argument| argument.as_ref()).collect(),
        }))
    }

    /// Whether the grounding `arguments` may fire in `state`. Never changes `state`.
    #[tracing::instrument(level = "debug", target = "strips", skip_all, fields(primitive = %self.name))]
    pub fn evaluate<R, V, S>(&self, registry: &R, state: &V, arguments: &[S]) -> Result<bool, EvaluationError>
    where
        R: TypeRegistry + ?Sized,
        V: StateView + ?Sized,
        S: AsRef<str>,
    {
        match self.bind(registry, arguments)? {
            Some(binding) => binding.holds(state),
            None => Ok(false),
        }
    }

    /// The successor of `state` under the grounding `arguments`, or `None` when the grounding is
    /// inapplicable. `state` itself is left untouched.
    #[tracing::instrument(level = "debug", target = "strips", skip_all, fields(primitive = %self.name))]
    pub fn apply<R, S>(&self, registry: &R, state: &State, arguments: &[S]) -> Result<Option<State>, EvaluationError>
    where
        R: TypeRegistry + ?Sized,
        S: AsRef<str>,
    {
        let Some(binding) = self.bind(registry, arguments)? else {
            return Ok(None);
        };
        if !binding.holds(state)? {
            return Ok(None);
        }
        binding.apply_effects(state).map(Some)
    }

    /// Every type-correct argument tuple over the domain's objects whose grounding holds in
    /// `state`, in object order.
    pub fn groundings<V>(&self, domain: &Domain, state: &V) -> Result<Vec<Vec<String>>, EvaluationError>
    where
        V: StateView + ?Sized,
    {
        let mut candidates: Vec<Vec<&str>> = vec![Vec::new()];
        for parameter in &self.parameters {
            let objects: Vec<&str> = domain.objects_of_type(&parameter.type_name).collect();
            candidates = candidates
                .into_iter()
                .flat_map(|prefix| {
                    objects.iter().map(move |object| {
                        let mut next = prefix.clone();
                        next.push(*object);
                        next
                    })
                })
                .collect();
        }

        let mut applicable = Vec::new();
        for candidate in candidates {
            if self.evaluate(domain, state, candidate.as_slice())? {
                applicable.push(candidate.into_iter().map(str::to_string).collect());
            }
        }
        Ok(applicable)
    }
}

/// Parameter name → object assignment for one grounding.
///
/// Borrowed from the call that produced it; it cannot outlive the argument list.
#[derive(Debug, Clone)]
pub struct Binding<'a> {
    primitive: &'a Primitive,
    arguments: Vec<&'a str>,
}

impl<'a> Binding<'a> {
    pub fn primitive(&self) -> &'a Primitive {
        self.primitive
    }

    /// The object bound to `parameter`.
    pub fn get(&self, parameter: &str) -> Option<&'a str> {
        self.primitive
            .parameters
            .iter()
            .position(|p| p.name == parameter)
            .map(|i| self.arguments[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.primitive
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .zip(self.arguments.iter().copied())
    }

    /// Evaluates the precondition against `state`.
    ///
    /// Every predicate the precondition mentions must be declared by `state`, whether or not
    /// evaluation would reach it.
    pub fn holds<V>(&self, state: &V) -> Result<bool, EvaluationError>
    where
        V: StateView + ?Sized,
    {
        require_declared(&self.primitive.condition, state)?;
        let holds = self.check(&self.primitive.condition, state)?;
        debug!(
            target: "strips",
            primitive = %self.primitive.name,
            arguments = ?self.arguments,
            holds,
            "precondition evaluated"
        );
        Ok(holds)
    }

    fn check<V>(&self, condition: &Condition, state: &V) -> Result<bool, EvaluationError>
    where
        V: StateView + ?Sized,
    {
        match condition {
            Condition::And(children) => {
                for child in children {
                    if !self.check(child, state)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                for child in children {
                    if self.check(child, state)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Holds(template) => state.holds(&template.predicate, &self.ground(template)),
        }
    }

    /// Applies every effect in declaration order to a copy of `state`.
    ///
    /// Adding a present fact and removing an absent one are no-ops.
    pub fn apply_effects(&self, state: &State) -> Result<State, EvaluationError> {
        let mut next = state.clone();
        for change in &self.primitive.changes {
            match change {
                Change::Add(template) => {
                    next.insert(&template.predicate, self.ground(template))?;
                }
                Change::Remove(template) => {
                    next.remove(&template.predicate, self.ground(template))?;
                }
            }
        }
        debug!(
            target: "strips",
            primitive = %self.primitive.name,
            arguments = ?self.arguments,
            effects = self.primitive.changes.len(),
            "effects applied"
        );
        Ok(next)
    }

    fn ground(&self, template: &Template) -> Fact {
        template
            .slots
            .iter()
            .map(|&slot| self.arguments[slot].to_string())
            .collect()
    }
}

fn require_declared<V>(condition: &Condition, state: &V) -> Result<(), EvaluationError>
where
    V: StateView + ?Sized,
{
    match condition {
        Condition::And(children) | Condition::Or(children) => children
            .iter()
            .try_for_each(|child| require_declared(child, state)),
        Condition::Holds(template) if !state.predicate_declared(&template.predicate) => {
            Err(EvaluationError::UndefinedPredicate(template.predicate.clone()))
        }
        Condition::Holds(_) => Ok(()),
    }
}

fn parse_parameters<R, S>(
    primitive: &str,
    registry: &R,
    tokens: &[S],
) -> Result<Vec<Parameter>, DefinitionError>
where
    R: TypeRegistry + ?Sized,
    S: AsRef<str>,
{
    let malformed = |reason: String| DefinitionError::MalformedParameters {
        primitive: primitive.to_string(),
        reason,
    };

    let mut parameters: Vec<Parameter> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut tokens = tokens.iter().map(AsRef::as_ref);

    while let Some(token) = tokens.next() {
        if token != TYPE_SEPARATOR {
            pending.push(token);
            continue;
        }
        let type_token = tokens
            .next()
            .ok_or_else(|| malformed(format!("missing type after '{TYPE_SEPARATOR}'")))?;
        if pending.is_empty() {
            return Err(malformed(format!("type {type_token} has no parameter")));
        }
        let type_name = normalize(type_token);
        if !registry.type_exists(&type_name) {
            return Err(DefinitionError::UndefinedType(type_name));
        }
        for name in pending.drain(..) {
            if parameters.iter().any(|p| p.name == name) {
                return Err(DefinitionError::DuplicateParameter {
                    primitive: primitive.to_string(),
                    parameter: name.to_string(),
                });
            }
            parameters.push(Parameter {
                name: name.to_string(),
                type_name: type_name.clone(),
            });
        }
    }

    if !pending.is_empty() {
        return Err(malformed(format!("untyped parameters {}", pending.join(" "))));
    }
    Ok(parameters)
}

struct Compiler<'a, R: ?Sized> {
    primitive: &'a str,
    parameters: &'a [Parameter],
    registry: &'a R,
}

impl<R: TypeRegistry + ?Sized> Compiler<'_, R> {
    fn condition(&self, expression: &Expression) -> Result<Condition, DefinitionError> {
        let children = |children: &[Expression]| {
            children
                .iter()
                .map(|child| self.condition(child))
                .collect::<Result<Vec<_>, _>>()
        };
        match expression {
            Expression::And(items) => children(items).map(Condition::And),
            Expression::Or(items) => children(items).map(Condition::Or),
            Expression::Literal(literal) => self.template(literal).map(Condition::Holds),
        }
    }

    fn template(&self, literal: &Literal) -> Result<Template, DefinitionError> {
        let predicate = normalize(&literal.predicate);
        if let Some(expected) = self.registry.predicate_arity(&predicate) {
            if expected != literal.parameters.len() {
                return Err(DefinitionError::ArityMismatch {
                    predicate,
                    expected,
                    found: literal.parameters.len(),
                });
            }
        }
        let slots = literal
            .parameters
            .iter()
            .map(|reference| {
                self.parameters
                    .iter()
                    .position(|p| &p.name == reference)
                    .ok_or_else(|| DefinitionError::DanglingParameter {
                        primitive: self.primitive.to_string(),
                        predicate: predicate.clone(),
                        parameter: reference.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Template { predicate, slots })
    }
}
