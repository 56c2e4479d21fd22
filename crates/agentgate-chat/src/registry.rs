//! Per-model agent cache.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::agent::{AgentFactory, AgentHandle};

/// Lazily builds and caches one agent per model name.
///
/// Lookups run concurrently. Creation holds the entry's shard lock, so two
/// callers racing on the same new model build exactly one agent.
pub struct AgentRegistry {
    default_model: String,
    factory: Arc<dyn AgentFactory>,
    agents: DashMap<String, AgentHandle>,
}

impl AgentRegistry {
    pub fn new(default_model: impl Into<String>, factory: Arc<dyn AgentFactory>) -> Self {
        Self {
            default_model: default_model.into(),
            factory,
            agents: DashMap::new(),
        }
    }

    /// Model used when a caller does not name one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The requested model, or the default when absent or blank.
    pub fn resolve_model(&self, model_name: Option<&str>) -> String {
        model_name
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str())
            .to_string()
    }

    /// Get the cached agent for a model, creating it on first use.
    pub fn get_agent(&self, model_name: Option<&str>) -> AgentHandle {
        let model = self.resolve_model(model_name);

        if let Some(agent) = self.agents.get(&model) {
            return agent.value().clone();
        }

        self.agents
            .entry(model.clone())
            .or_insert_with(|| {
                info!("Initializing agent with model: {}", model);
                self.factory.create(&model)
            })
            .value()
            .clone()
    }

    /// Number of cached agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Names of cached models, sorted.
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.agents.iter().map(|e| e.key().clone()).collect();
        models.sort();
        models
    }
}
