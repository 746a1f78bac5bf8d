use crate::error::WorkflowError;
use crate::types::WorkflowState;

/// Validates a workflow transition against the state table.
pub fn validate_transition(from: WorkflowState, to: WorkflowState) -> Result<(), WorkflowError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: WorkflowState) -> Vec<WorkflowState> {
    use WorkflowState::*;
    match from {
        Idle => vec![Planning],
        Planning => vec![Generating, Failed],
        Generating => vec![Validating, Failed],
        // Generating again means a repair round.
        Validating => vec![Deployed, Generating, Failed],
        // Deployed -> Failed is a crash reported from production.
        Deployed => vec![Idle, Failed],
        Failed => vec![Idle],
    }
}

fn allowed(from: WorkflowState, to: WorkflowState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
