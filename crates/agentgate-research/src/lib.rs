//! Research queries answered by an LLM agent grounded in fresh web search.

pub mod agent;
pub mod exa;
pub mod service;
pub mod types;

pub use agent::{ResearchAgent, ResearchAgentFactory, WebSearch};
pub use exa::{ExaClient, SearchOptions, SearchResult};
pub use service::{ResearchReply, ResearchService};
pub use types::{ResearchRequest, ResearchResponse};
