use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single step in a workflow.
///
/// A step's identity is its index in the submitted step list; `depends_on`
/// holds indices of steps that must complete before this one runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub agent: String,
    pub task: String,
    #[serde(default)]
    pub depends_on: Vec<usize>,
}

/// A named workflow: an ordered list of steps forming a dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workflow file {}", path.display()))?;
        let workflow: Workflow = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse workflow file {}", path.display()))?;
        Ok(workflow)
    }
}

/// The recorded outcome of one workflow step or parallel task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub agent: String,
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    /// Sentinel for a step the scheduler never reached.
    pub fn not_executed(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
            success: false,
            output: String::new(),
            data: Value::Null,
            error: Some("Not executed".to_string()),
        }
    }

    pub fn failure(agent: &str, error: impl Into<String>) -> Self {
        Self {
            agent: agent.to_string(),
            success: false,
            output: String::new(),
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    /// A step counts as succeeded when its agent reported success or
    /// surfaced no error at all.
    pub fn is_success(&self) -> bool {
        self.success || self.error.is_none()
    }
}
