//! Shared application state.

use std::sync::Arc;

use reqwest::Client;

use agentgate_chat::{AgentRegistry, ChatService, OpenAiAgentFactory};
use agentgate_core::GatewayConfig;
use agentgate_research::{ExaClient, ResearchAgentFactory, ResearchService};

/// State shared by every route handler.
pub struct AppState {
    pub config: GatewayConfig,
    pub chat: ChatService,
    pub research: ResearchService,
}

impl AppState {
    pub fn new(config: GatewayConfig, chat: ChatService, research: ResearchService) -> Self {
        Self {
            config,
            chat,
            research,
        }
    }

    /// Wire the production services from configuration.
    ///
    /// Research is disabled when no Exa key is configured.
    pub fn from_config(config: GatewayConfig) -> Self {
        let client = Client::new();

        let chat_factory = Arc::new(OpenAiAgentFactory::new(
            client.clone(),
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
        ));
        let chat = ChatService::new(Arc::new(AgentRegistry::new(
            config.model_name.clone(),
            chat_factory,
        )))
        .with_retry(config.retry.into())
        .with_stream_buffer(config.stream_buffer);

        let research = match &config.exa_api_key {
            Some(exa_key) => {
                let search = Arc::new(ExaClient::new(client.clone(), exa_key.clone()));
                let factory = Arc::new(ResearchAgentFactory::new(
                    client,
                    config.openai_base_url.clone(),
                    config.openai_api_key.clone(),
                    search,
                ));
                ResearchService::new(Arc::new(AgentRegistry::new(
                    config.model_name.clone(),
                    factory,
                )))
                .with_stream_buffer(config.stream_buffer)
            }
            None => ResearchService::disabled(
                config.model_name.clone(),
                "Research is not configured: EXA_API_KEY is not set",
            ),
        };

        Self::new(config, chat, research)
    }
}
