use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::agents::AgentRegistry;
use crate::engine::parallel::ParallelExecutor;
use crate::types::{RunId, StepContext, StepResult, WorkflowStep};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("step {step} depends on step {dependency}, but the workflow has only {total} steps")]
    InvalidDependency {
        step: usize,
        dependency: usize,
        total: usize,
    },
}

/// Aggregate outcome of one workflow run.
#[derive(Debug, Serialize)]
pub struct WorkflowReport {
    pub workflow: String,
    pub success: bool,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub total_steps: usize,
    pub waves_executed: usize,
    pub results: Vec<StepResult>,
    pub error: Option<String>,
}

/// Runs a dependency graph of steps in ordered waves.
///
/// Each wave is the set of steps whose dependencies have all completed and
/// none have failed; the whole wave runs concurrently through the parallel
/// fan-out, and no step of the next wave starts before the wave settles.
/// When no step is ready while steps remain, scheduling stops and the
/// unresolved steps are reported as not executed. That covers both cyclic
/// graphs and steps orphaned by an upstream failure; the two cases are
/// reported identically.
pub struct WorkflowExecutor {
    parallel: ParallelExecutor,
}

impl WorkflowExecutor {
    pub fn new(agents: Arc<AgentRegistry>) -> Self {
        Self {
            parallel: ParallelExecutor::new(agents),
        }
    }

    pub async fn execute(
        &self,
        name: &str,
        steps: &[WorkflowStep],
    ) -> Result<WorkflowReport, WorkflowError> {
        for (idx, step) in steps.iter().enumerate() {
            for &dep in &step.depends_on {
                if dep >= steps.len() {
                    return Err(WorkflowError::InvalidDependency {
                        step: idx,
                        dependency: dep,
                        total: steps.len(),
                    });
                }
            }
        }

        let run_id = RunId::new_v4();
        log::info!(
            "workflow '{}' ({}): executing {} steps",
            name,
            run_id,
            steps.len()
        );

        let mut results: HashMap<usize, StepResult> = HashMap::new();
        let mut completed: HashSet<usize> = HashSet::new();
        let mut failed: HashSet<usize> = HashSet::new();
        let mut waves_executed = 0;

        while completed.len() + failed.len() < steps.len() {
            let ready = ready_steps(steps, &completed, &failed);

            if ready.is_empty() {
                let remaining: Vec<usize> = (0..steps.len())
                    .filter(|i| !completed.contains(i) && !failed.contains(i))
                    .collect();
                log::error!(
                    "workflow '{}': no runnable steps remain, unresolved: {:?}",
                    name,
                    remaining
                );
                break;
            }

            waves_executed += 1;
            log::info!(
                "workflow '{}': wave {} executing steps {:?}",
                name,
                waves_executed,
                ready
            );

            let batch = ready
                .iter()
                .map(|&idx| {
                    let step = &steps[idx];
                    let mut context = StepContext::new();
                    for &dep in &step.depends_on {
                        if let Some(dep_result) = results.get(&dep) {
                            context.insert(
                                format!("step_{dep}_result"),
                                serde_json::to_value(dep_result).unwrap_or_default(),
                            );
                        }
                    }
                    let context = (!context.is_empty()).then_some(context);
                    (idx, step.agent.clone(), step.task.clone(), context)
                })
                .collect();

            for (idx, result) in self.parallel.fan_out(batch).await {
                if result.is_success() {
                    completed.insert(idx);
                } else {
                    log::warn!(
                        "workflow '{}': step {} failed: {:?}",
                        name,
                        idx,
                        result.error
                    );
                    failed.insert(idx);
                }
                results.insert(idx, result);
            }
        }

        let ordered: Vec<StepResult> = (0..steps.len())
            .map(|idx| {
                results
                    .remove(&idx)
                    .unwrap_or_else(|| StepResult::not_executed(&steps[idx].agent))
            })
            .collect();

        let success = failed.is_empty() && completed.len() == steps.len();
        let error = (!failed.is_empty()).then(|| format!("{} steps failed", failed.len()));

        log::info!(
            "workflow '{}' {}: {}/{} steps succeeded in {} waves",
            name,
            if success { "completed" } else { "finished with errors" },
            completed.len(),
            steps.len(),
            waves_executed
        );

        Ok(WorkflowReport {
            workflow: name.to_string(),
            success,
            completed_steps: completed.len(),
            failed_steps: failed.len(),
            total_steps: steps.len(),
            waves_executed,
            results: ordered,
            error,
        })
    }
}

/// Steps not yet resolved whose dependencies all completed and none failed.
fn ready_steps(
    steps: &[WorkflowStep],
    completed: &HashSet<usize>,
    failed: &HashSet<usize>,
) -> Vec<usize> {
    steps
        .iter()
        .enumerate()
        .filter(|(idx, _)| !completed.contains(idx) && !failed.contains(idx))
        .filter(|(_, step)| {
            step.depends_on.iter().all(|dep| completed.contains(dep))
                && !step.depends_on.iter().any(|dep| failed.contains(dep))
        })
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(agent: &str, deps: &[usize]) -> WorkflowStep {
        WorkflowStep {
            agent: agent.to_string(),
            task: "task".to_string(),
            depends_on: deps.to_vec(),
        }
    }

    #[test]
    fn test_ready_steps_skips_unmet_dependencies() {
        let steps = vec![step("vault", &[]), step("aws", &[0]), step("mcp", &[1])];
        let completed = HashSet::new();
        let failed = HashSet::new();

        assert_eq!(ready_steps(&steps, &completed, &failed), vec![0]);
    }

    #[test]
    fn test_ready_steps_excludes_failed_dependents() {
        let steps = vec![step("vault", &[]), step("aws", &[0])];
        let completed = HashSet::new();
        let failed: HashSet<usize> = [0].into_iter().collect();

        assert!(ready_steps(&steps, &completed, &failed).is_empty());
    }
}
