pub mod parallel;
pub mod workflow;

pub use parallel::{ParallelExecutor, ParallelReport, TaskSpec};
pub use workflow::{WorkflowError, WorkflowExecutor, WorkflowReport};
