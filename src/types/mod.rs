pub mod lease;
pub mod step;

pub use lease::Lease;
pub use step::{StepResult, Workflow, WorkflowStep};

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

pub type RunId = Uuid;

/// Context handed to a step: dependency results keyed `step_<idx>_result`.
pub type StepContext = HashMap<String, Value>;
