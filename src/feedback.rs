//! Recording whether a refined prompt actually solved the problem.

use crate::error::Result;
use crate::refine::RefinementKind;
use crate::store::{EffectiveSolution, RefinementStore};

/// Chars of the problem kept as the solution's problem type
pub const PROBLEM_TYPE_CHARS: usize = 100;
pub const WORKED_SOLUTION: &str = "Refinement worked: the AI solved the problem with this prompt";

/// What the user reported after trying a refined prompt
#[derive(Debug, Clone)]
pub struct Outcome {
    pub project_id: String,
    pub problem: String,
    /// The prompt that was tried
    pub prompt: String,
    pub kind: RefinementKind,
    /// Stored refinement to update, when known
    pub refinement_id: Option<String>,
    pub worked: bool,
}

/// Update the stored refinement and, on success, remember the solution
pub async fn record_outcome(store: &dyn RefinementStore, outcome: &Outcome) -> Result<()> {
    if let Some(ref id) = outcome.refinement_id {
        store.mark_resolved(id, outcome.worked).await?;
    }

    if !outcome.worked {
        tracing::debug!(project = %outcome.project_id, "refinement did not work; nothing to remember");
        return Ok(());
    }

    let solution = EffectiveSolution {
        id: None,
        project_id: outcome.project_id.clone(),
        problem_type: outcome.problem.trim().chars().take(PROBLEM_TYPE_CHARS).collect(),
        context: outcome.prompt.clone(),
        solution: WORKED_SOLUTION.to_string(),
        kind: outcome.kind.to_string(),
        times_used: 1,
        success_rate: 100,
    };
    store.insert_solution(&solution).await?;
    tracing::info!(project = %outcome.project_id, "effective solution recorded");
    Ok(())
}
