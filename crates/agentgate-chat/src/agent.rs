//! Agent abstraction and output normalization.
//!
//! Agents return text in several shapes. [`AgentOutput`] names each of them
//! and the helpers here turn any of them into plain text or a delta.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::error::AgentError;

/// Boxed stream of agent outputs.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentOutput, AgentError>> + Send>>;

/// Shared handle to a configured agent.
pub type AgentHandle = Arc<dyn Agent>;

/// An LLM-backed agent bound to one model.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Model this agent talks to.
    fn model(&self) -> &str;

    /// Run the prompt to completion.
    async fn run(&self, prompt: &str) -> Result<AgentOutput, AgentError>;

    /// Run the prompt and stream partial outputs.
    async fn run_stream(&self, prompt: &str) -> Result<AgentStream, AgentError>;
}

/// Builds agents for a model name.
pub trait AgentFactory: Send + Sync {
    fn create(&self, model: &str) -> AgentHandle;
}

/// Shapes an agent may return, either whole or per stream step.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// Plain text.
    Text(String),
    /// Object carrying `content`.
    ///
    /// In streams the content may be cumulative (everything so far) or
    /// incremental (just the new piece), and the shape does not say which.
    /// [`DeltaTracker`] reads content that extends the emitted text as
    /// cumulative. A repeated incremental piece, such as `"ha"` twice, is
    /// therefore emitted once while `run` would return `"haha"`.
    Content { content: String },
    /// Object carrying only the new `delta`.
    Delta { delta: String },
    /// Sequence of outputs, concatenated in order.
    Items(Vec<AgentOutput>),
    /// Anything else; stringified.
    Other(Value),
}

impl AgentOutput {
    /// Classify a loosely-typed JSON value.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => AgentOutput::Text(s),
            Value::Array(items) => {
                AgentOutput::Items(items.into_iter().map(AgentOutput::from_json).collect())
            }
            Value::Object(ref map) => {
                if let Some(Value::String(delta)) = map.get("delta") {
                    AgentOutput::Delta {
                        delta: delta.clone(),
                    }
                } else if let Some(Value::String(content)) = map.get("content") {
                    AgentOutput::Content {
                        content: content.clone(),
                    }
                } else {
                    AgentOutput::Other(value)
                }
            }
            other => AgentOutput::Other(other),
        }
    }

    /// Flatten into a single text string.
    pub fn into_text(self) -> String {
        match self {
            AgentOutput::Text(text) => text,
            AgentOutput::Content { content } => content,
            AgentOutput::Delta { delta } => delta,
            AgentOutput::Items(items) => items.into_iter().map(AgentOutput::into_text).collect(),
            AgentOutput::Other(value) => stringify(value),
        }
    }
}

impl From<String> for AgentOutput {
    fn from(text: String) -> Self {
        AgentOutput::Text(text)
    }
}

impl From<&str> for AgentOutput {
    fn from(text: &str) -> Self {
        AgentOutput::Text(text.to_string())
    }
}

fn stringify(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Turns a sequence of agent outputs into incremental deltas.
///
/// Tracks the text emitted so far. A `Content` output that extends that
/// text yields only the new suffix; any other `Content` is treated as new
/// text on its own.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    emitted: String,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta for the next output. Empty means nothing new.
    pub fn delta(&mut self, output: AgentOutput) -> String {
        let delta = match output {
            AgentOutput::Content { content } => match content.strip_prefix(self.emitted.as_str()) {
                Some(suffix) if !self.emitted.is_empty() => suffix.to_string(),
                _ => content,
            },
            AgentOutput::Items(items) => {
                let mut combined = String::new();
                for item in items {
                    let part = self.delta(item);
                    combined.push_str(&part);
                }
                // Parts were already recorded by the recursive calls.
                return combined;
            }
            other => other.into_text(),
        };
        self.emitted.push_str(&delta);
        delta
    }

    /// Full text emitted so far.
    pub fn text(&self) -> &str {
        &self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(AgentOutput::from_json(json!("hi")), AgentOutput::Text("hi".into()));
        assert_eq!(
            AgentOutput::from_json(json!({"delta": "d", "content": "c"})),
            AgentOutput::Delta { delta: "d".into() }
        );
        assert_eq!(
            AgentOutput::from_json(json!({"content": "c"})),
            AgentOutput::Content { content: "c".into() }
        );
        assert_eq!(AgentOutput::from_json(json!(42)), AgentOutput::Other(json!(42)));
        assert!(matches!(
            AgentOutput::from_json(json!({"other": 1})),
            AgentOutput::Other(_)
        ));
    }

    #[test]
    fn test_into_text() {
        assert_eq!(AgentOutput::from("plain").into_text(), "plain");
        assert_eq!(
            AgentOutput::Items(vec![
                AgentOutput::Text("a".into()),
                AgentOutput::Delta { delta: "b".into() },
                AgentOutput::Content { content: "c".into() },
            ])
            .into_text(),
            "abc"
        );
        assert_eq!(AgentOutput::Other(json!({"x": 1})).into_text(), r#"{"x":1}"#);
        assert_eq!(AgentOutput::Other(Value::Null).into_text(), "");
    }

    #[test]
    fn test_delta_tracker_cumulative_content() {
        let mut tracker = DeltaTracker::new();
        assert_eq!(tracker.delta(AgentOutput::Content { content: "Hel".into() }), "Hel");
        assert_eq!(tracker.delta(AgentOutput::Content { content: "Hello".into() }), "lo");
        assert_eq!(tracker.delta(AgentOutput::Content { content: "Hello".into() }), "");
        assert_eq!(tracker.text(), "Hello");
    }

    #[test]
    fn test_delta_tracker_incremental_content() {
        let mut tracker = DeltaTracker::new();
        assert_eq!(tracker.delta(AgentOutput::Content { content: "One ".into() }), "One ");
        assert_eq!(tracker.delta(AgentOutput::Content { content: "two".into() }), "two");
        assert_eq!(tracker.text(), "One two");
    }

    #[test]
    fn test_delta_tracker_repeated_content_reads_as_cumulative() {
        let mut tracker = DeltaTracker::new();
        assert_eq!(tracker.delta(AgentOutput::Content { content: "ha".into() }), "ha");
        assert_eq!(tracker.delta(AgentOutput::Content { content: "ha".into() }), "");
        assert_eq!(tracker.text(), "ha");

        // Deltas are never deduplicated.
        assert_eq!(tracker.delta(AgentOutput::Delta { delta: "ha".into() }), "ha");
        assert_eq!(tracker.text(), "haha");
    }

    #[test]
    fn test_delta_tracker_mixed_shapes() {
        let mut tracker = DeltaTracker::new();
        assert_eq!(tracker.delta(AgentOutput::Text("a".into())), "a");
        assert_eq!(tracker.delta(AgentOutput::Delta { delta: "b".into() }), "b");
        assert_eq!(tracker.delta(AgentOutput::Delta { delta: String::new() }), "");
        assert_eq!(
            tracker.delta(AgentOutput::Items(vec!["c".into(), "d".into()])),
            "cd"
        );
        assert_eq!(tracker.delta(AgentOutput::Other(json!(7))), "7");
        assert_eq!(tracker.text(), "abcd7");
    }

    #[test]
    fn test_factory_builds_named_agent() {
        struct Named(String);

        #[async_trait]
        impl Agent for Named {
            fn model(&self) -> &str {
                &self.0
            }
            async fn run(&self, _prompt: &str) -> Result<AgentOutput, AgentError> {
                Ok(AgentOutput::Text(self.0.clone()))
            }
            async fn run_stream(&self, _prompt: &str) -> Result<AgentStream, AgentError> {
                Err(AgentError::Other("unsupported".into()))
            }
        }

        struct NamedFactory;

        impl AgentFactory for NamedFactory {
            fn create(&self, model: &str) -> AgentHandle {
                Arc::new(Named(model.to_string()))
            }
        }

        let agent = NamedFactory.create("gpt-4");
        assert_eq!(agent.model(), "gpt-4");
    }
}
