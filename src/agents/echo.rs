use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::agents::{Agent, AgentResult};
use crate::types::StepContext;

/// Trivial agent that succeeds and echoes its task back, reporting which
/// context keys it was handed. Stands in for real capability providers in
/// the demo binary and in tests.
pub struct EchoAgent {
    name: String,
}

impl EchoAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, task: &str, context: Option<&StepContext>) -> Result<AgentResult> {
        let mut context_keys: Vec<String> = context
            .map(|ctx| ctx.keys().cloned().collect())
            .unwrap_or_default();
        context_keys.sort();

        Ok(AgentResult::ok(task).with_data(json!({ "context_keys": context_keys })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_agent_reports_context_keys() {
        let agent = EchoAgent::new("aws");

        let mut context = StepContext::new();
        context.insert("step_0_result".to_string(), json!({"success": true}));

        let result = agent.run("list buckets", Some(&context)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "list buckets");
        assert_eq!(result.data["context_keys"][0], "step_0_result");
    }
}
