use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::agents::AgentRegistry;
use crate::types::{StepContext, StepResult};

/// An independent task submitted for concurrent execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub agent: String,
    pub task: String,
}

/// Aggregate outcome of one parallel batch.
#[derive(Debug, Serialize)]
pub struct ParallelReport {
    pub success: bool,
    pub total_tasks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<StepResult>,
}

/// Fans a batch of tasks out to agents concurrently and fans the results
/// back in. One task's fault never disturbs the others.
pub struct ParallelExecutor {
    agents: Arc<AgentRegistry>,
}

impl ParallelExecutor {
    pub fn new(agents: Arc<AgentRegistry>) -> Self {
        Self { agents }
    }

    pub async fn execute(&self, tasks: Vec<TaskSpec>) -> ParallelReport {
        let total_tasks = tasks.len();
        log::info!("executing {} tasks in parallel", total_tasks);

        let batch = tasks
            .into_iter()
            .enumerate()
            .map(|(idx, spec)| (idx, spec.agent, spec.task, None))
            .collect();

        let results: Vec<StepResult> = self
            .fan_out(batch)
            .await
            .into_iter()
            .map(|(_, result)| result)
            .collect();

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = total_tasks - succeeded;

        log::info!(
            "parallel execution complete: {} succeeded, {} failed",
            succeeded,
            failed
        );

        ParallelReport {
            success: failed == 0,
            total_tasks,
            succeeded,
            failed,
            results,
        }
    }

    /// Run one indexed batch concurrently. Delegation errors, agent faults,
    /// and join faults are all folded into that entry's result.
    pub(crate) async fn fan_out(
        &self,
        batch: Vec<(usize, String, String, Option<StepContext>)>,
    ) -> Vec<(usize, StepResult)> {
        let mut meta = Vec::with_capacity(batch.len());
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, agent_name, task, context) in batch {
            let agents = Arc::clone(&self.agents);
            let name = agent_name.clone();

            meta.push((idx, agent_name));
            handles.push(tokio::spawn(async move {
                match agents.resolve(&name) {
                    Ok(agent) => match agent.run(&task, context.as_ref()).await {
                        Ok(res) => StepResult {
                            agent: name,
                            success: res.success,
                            output: res.output,
                            data: res.data,
                            error: res.error,
                        },
                        Err(e) => StepResult::failure(&name, format!("{e:#}")),
                    },
                    Err(e) => StepResult::failure(&name, e.to_string()),
                }
            }));
        }

        let settled = join_all(handles).await;

        meta.into_iter()
            .zip(settled)
            .map(|((idx, agent_name), joined)| {
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => StepResult::failure(&agent_name, format!("task aborted: {e}")),
                };
                (idx, result)
            })
            .collect()
    }
}
