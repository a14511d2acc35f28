pub mod echo;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::StepContext;

/// Outcome of a single agent invocation.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub success: bool,
    pub output: String,
    pub data: Value,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: Value::Null,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            data: Value::Null,
            error: Some(error.into()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A capability provider: executes a task description, optionally given
/// dependency context, and reports a structured result.
///
/// The executors are polymorphic over this trait and never branch on the
/// concrete implementation beyond resolving it by name.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, task: &str, context: Option<&StepContext>) -> Result<AgentResult>;
}

/// Requested agent is not registered.
#[derive(Debug, Error)]
#[error("agent '{0}' not configured")]
pub struct DelegationError(pub String);

/// Symbolic name → agent lookup, resolved once at composition time.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, agent: Arc<dyn Agent>) {
        let key = key.into();
        log::debug!("registered agent '{}'", key);
        self.agents.insert(key, agent);
    }

    pub fn resolve(&self, key: &str) -> Result<Arc<dyn Agent>, DelegationError> {
        self.agents
            .get(key)
            .cloned()
            .ok_or_else(|| DelegationError(key.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
