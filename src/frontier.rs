//! Parallel evaluation of alternative groundings against one shared snapshot.
//!
//! Each candidate runs on tokio's blocking pool. The primitive, domain and state are shared
//! read-only behind `Arc`s; bindings are created and dropped inside each task.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use crate::domain::Domain;
use crate::error::EvaluationError;
use crate::facts::State;
use crate::primitive::Primitive;

/// Evaluates every candidate argument list. Outcomes are returned in candidate order.
///
/// The first error aborts the whole batch.
pub async fn evaluate_candidates(
    primitive: Arc<Primitive>,
    domain: Arc<Domain>,
    state: Arc<State>,
    candidates: Vec<Vec<String>>,
) -> Result<Vec<bool>, EvaluationError> {
    let outcomes = fan_out(candidates, move |arguments| {
        primitive.evaluate(&*domain, &*state, arguments.as_slice())
    })
    .await?;
    debug!(
        target: "strips",
        candidates = outcomes.len(),
        applicable = outcomes.iter().filter(|o| **o).count(),
        "frontier evaluated"
    );
    Ok(outcomes)
}

/// Successor states for every candidate, `None` where the grounding is inapplicable.
///
/// Every successor is an independent snapshot; `state` is never modified.
pub async fn successors(
    primitive: Arc<Primitive>,
    domain: Arc<Domain>,
    state: Arc<State>,
    candidates: Vec<Vec<String>>,
) -> Result<Vec<Option<State>>, EvaluationError> {
    fan_out(candidates, move |arguments| {
        primitive.apply(&*domain, &*state, arguments.as_slice())
    })
    .await
}

async fn fan_out<T, F>(candidates: Vec<Vec<String>>, job: F) -> Result<Vec<T>, EvaluationError>
where
    T: Send + 'static,
    F: Fn(Vec<String>) -> Result<T, EvaluationError> + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let mut tasks = JoinSet::new();
    let total = candidates.len();

    for (index, arguments) in candidates.into_iter().enumerate() {
        let job = Arc::clone(&job);
        tasks.spawn_blocking(move || (index, job(arguments)));
    }

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = joined.map_err(|e| EvaluationError::Join(e.to_string()))?;
        slots[index] = Some(outcome?);
    }

    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| EvaluationError::Join("missing outcome".to_string())))
        .collect()
}
