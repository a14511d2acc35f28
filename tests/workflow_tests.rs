use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use convoy::agents::echo::EchoAgent;
use convoy::agents::{Agent, AgentRegistry, AgentResult};
use convoy::engine::{ParallelExecutor, TaskSpec, WorkflowError, WorkflowExecutor};
use convoy::types::{StepContext, Workflow, WorkflowStep};

/// Succeeds and records the order in which tasks started.
struct RecordingAgent {
    name: String,
    started: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Agent for RecordingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, task: &str, _context: Option<&StepContext>) -> Result<AgentResult> {
        self.started.lock().unwrap().push(task.to_string());
        Ok(AgentResult::ok(task))
    }
}

/// Always reports a failed result.
struct FailingAgent {
    name: String,
}

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _task: &str, _context: Option<&StepContext>) -> Result<AgentResult> {
        Ok(AgentResult::fail("access denied"))
    }
}

/// Surfaces a hard fault instead of a structured result.
struct ErroringAgent {
    name: String,
}

#[async_trait]
impl Agent for ErroringAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _task: &str, _context: Option<&StepContext>) -> Result<AgentResult> {
        Err(anyhow!("connection reset"))
    }
}

fn step(agent: &str, task: &str, deps: &[usize]) -> WorkflowStep {
    WorkflowStep {
        agent: agent.to_string(),
        task: task.to_string(),
        depends_on: deps.to_vec(),
    }
}

fn echo_registry() -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    for name in ["aws", "vault", "mcp"] {
        registry.register(name, Arc::new(EchoAgent::new(name)));
    }
    Arc::new(registry)
}

#[tokio::test]
async fn test_diamond_workflow_executes_in_three_waves() {
    let started: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let mut registry = AgentRegistry::new();
    for name in ["aws", "vault", "mcp"] {
        registry.register(
            name,
            Arc::new(RecordingAgent {
                name: name.to_string(),
                started: started.clone(),
            }),
        );
    }

    let steps = vec![
        step("vault", "check credentials", &[]),
        step("aws", "list S3", &[0]),
        step("aws", "list EC2", &[0]),
        step("mcp", "summarize", &[1, 2]),
    ];

    let executor = WorkflowExecutor::new(Arc::new(registry));
    let report = executor.execute("diamond", &steps).await.unwrap();

    assert!(report.success);
    assert_eq!(report.waves_executed, 3);
    assert_eq!(report.completed_steps, 4);
    assert_eq!(report.failed_steps, 0);
    assert!(report.error.is_none());

    // Dependencies resolve before dependents start.
    let order = started.lock().unwrap().clone();
    let pos = |task: &str| order.iter().position(|t| t == task).unwrap();
    assert!(pos("check credentials") < pos("list S3"));
    assert!(pos("check credentials") < pos("list EC2"));
    assert!(pos("list S3") < pos("summarize"));
    assert!(pos("list EC2") < pos("summarize"));
}

#[tokio::test]
async fn test_independent_steps_run_in_first_wave() {
    let steps = vec![
        step("aws", "list S3", &[]),
        step("aws", "list EC2", &[]),
        step("vault", "status", &[]),
    ];

    let executor = WorkflowExecutor::new(echo_registry());
    let report = executor.execute("fanout", &steps).await.unwrap();

    assert!(report.success);
    assert_eq!(report.waves_executed, 1);
    assert_eq!(report.completed_steps, 3);
}

#[tokio::test]
async fn test_failed_step_orphans_its_dependents() {
    let mut registry = AgentRegistry::new();
    registry.register("vault", Arc::new(EchoAgent::new("vault")));
    registry.register(
        "aws",
        Arc::new(FailingAgent {
            name: "aws".to_string(),
        }),
    );
    registry.register("mcp", Arc::new(EchoAgent::new("mcp")));

    let steps = vec![
        step("vault", "check credentials", &[]),
        step("aws", "create bucket", &[0]),
        step("mcp", "report bucket", &[1]),
        step("mcp", "report creds", &[0]),
    ];

    let executor = WorkflowExecutor::new(Arc::new(registry));
    let report = executor.execute("orphaned", &steps).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.completed_steps, 2);
    assert_eq!(report.failed_steps, 1);
    assert_eq!(report.error.as_deref(), Some("1 steps failed"));

    assert_eq!(report.results[1].error.as_deref(), Some("access denied"));
    assert_eq!(report.results[2].error.as_deref(), Some("Not executed"));
    assert!(report.results[3].success);
}

#[tokio::test]
async fn test_agent_fault_does_not_abort_wave_siblings() {
    let mut registry = AgentRegistry::new();
    registry.register(
        "aws",
        Arc::new(ErroringAgent {
            name: "aws".to_string(),
        }),
    );
    registry.register("vault", Arc::new(EchoAgent::new("vault")));

    let steps = vec![
        step("aws", "list S3", &[]),
        step("vault", "status", &[]),
    ];

    let executor = WorkflowExecutor::new(Arc::new(registry));
    let report = executor.execute("isolation", &steps).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.failed_steps, 1);
    assert!(report.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("connection reset"));
    assert!(report.results[1].is_success());
}

#[tokio::test]
async fn test_out_of_range_dependency_is_rejected_before_scheduling() {
    let steps = vec![step("aws", "list S3", &[5])];

    let executor = WorkflowExecutor::new(echo_registry());
    let err = executor.execute("invalid", &steps).await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::InvalidDependency {
            step: 0,
            dependency: 5,
            total: 1,
        }
    ));
}

#[tokio::test]
async fn test_self_dependency_reported_as_unresolved() {
    let steps = vec![step("aws", "list S3", &[0])];

    let executor = WorkflowExecutor::new(echo_registry());
    let report = executor.execute("cyclic", &steps).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.waves_executed, 0);
    assert_eq!(report.failed_steps, 0);
    assert!(report.error.is_none());
    assert_eq!(report.results[0].error.as_deref(), Some("Not executed"));
}

#[tokio::test]
async fn test_dependency_results_are_fed_as_context() {
    let steps = vec![
        step("vault", "check credentials", &[]),
        step("aws", "list S3", &[0]),
    ];

    let executor = WorkflowExecutor::new(echo_registry());
    let report = executor.execute("context", &steps).await.unwrap();

    assert!(report.success);
    assert_eq!(report.results[1].data["context_keys"][0], "step_0_result");
    assert_eq!(report.results[0].data["context_keys"], serde_json::json!([]));
}

#[tokio::test]
async fn test_parallel_isolates_every_kind_of_fault() {
    let mut registry = AgentRegistry::new();
    registry.register("vault", Arc::new(EchoAgent::new("vault")));
    registry.register(
        "aws",
        Arc::new(ErroringAgent {
            name: "aws".to_string(),
        }),
    );
    registry.register(
        "mcp",
        Arc::new(FailingAgent {
            name: "mcp".to_string(),
        }),
    );

    let tasks = vec![
        TaskSpec {
            agent: "vault".to_string(),
            task: "status".to_string(),
        },
        TaskSpec {
            agent: "aws".to_string(),
            task: "list S3".to_string(),
        },
        TaskSpec {
            agent: "mcp".to_string(),
            task: "list tools".to_string(),
        },
        TaskSpec {
            agent: "github".to_string(),
            task: "git status".to_string(),
        },
    ];

    let executor = ParallelExecutor::new(Arc::new(registry));
    let report = executor.execute(tasks).await;

    assert!(!report.success);
    assert_eq!(report.total_tasks, 4);
    assert_eq!(report.succeeded + report.failed, 4);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.results.len(), 4);
    assert_eq!(
        report.results[3].error.as_deref(),
        Some("agent 'github' not configured")
    );
}

#[tokio::test]
async fn test_parallel_all_success() {
    let tasks = vec![
        TaskSpec {
            agent: "aws".to_string(),
            task: "list S3".to_string(),
        },
        TaskSpec {
            agent: "vault".to_string(),
            task: "status".to_string(),
        },
    ];

    let executor = ParallelExecutor::new(echo_registry());
    let report = executor.execute(tasks).await;

    assert!(report.success);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_workflow_file_roundtrip() {
    let yaml = r#"
name: provision
steps:
  - agent: vault
    task: check credentials
  - agent: aws
    task: create bucket
    depends_on: [0]
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let workflow = Workflow::from_file(file.path()).unwrap();
    assert_eq!(workflow.name, "provision");
    assert_eq!(workflow.steps.len(), 2);
    assert!(workflow.steps[0].depends_on.is_empty());
    assert_eq!(workflow.steps[1].depends_on, vec![0]);

    let executor = WorkflowExecutor::new(echo_registry());
    let report = executor
        .execute(&workflow.name, &workflow.steps)
        .await
        .unwrap();
    assert!(report.success);
    assert_eq!(report.waves_executed, 2);
}

#[tokio::test]
async fn test_empty_workflow_succeeds_with_zero_waves() {
    let executor = WorkflowExecutor::new(echo_registry());
    let report = executor.execute("empty", &[]).await.unwrap();

    assert!(report.success);
    assert_eq!(report.waves_executed, 0);
    assert_eq!(report.total_steps, 0);
}
