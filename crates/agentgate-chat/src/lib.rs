//! Chat adapters in front of an LLM-backed agent.
//!
//! The registry hands out one agent per model name. The service layer
//! validates input, retries non-streaming calls and turns agent output into
//! incremental chunks for streaming.

pub mod agent;
pub mod error;
pub mod providers;
pub mod registry;
pub mod service;
pub mod stream;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{Agent, AgentFactory, AgentHandle, AgentOutput, AgentStream, DeltaTracker};
pub use error::{AgentError, ChatError};
pub use providers::{OpenAiAgent, OpenAiAgentFactory};
pub use registry::AgentRegistry;
pub use service::{ChatService, RetryPolicy};
pub use stream::ChunkStream;
pub use types::*;
