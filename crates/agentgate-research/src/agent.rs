//! Search-augmented research agent.
//!
//! Each run searches the web for the query first, then asks the LLM to write
//! a report grounded in the sources it found.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use agentgate_chat::providers::system_prompt;
use agentgate_chat::{
    Agent, AgentError, AgentFactory, AgentHandle, AgentOutput, AgentStream, OpenAiAgent,
};

use crate::exa::{ExaClient, SearchOptions, SearchResult};

pub const RESEARCH_DESCRIPTION: &str = "You are a distinguished research analyst specializing in \
synthesizing information from multiple sources. Your expertise lies in creating clear, factual \
reports that combine academic rigor with engaging narrative.";

pub const RESEARCH_INSTRUCTIONS: &str = "\
1. Begin by reviewing the search results to gather comprehensive information
2. Analyze and cross-reference sources for accuracy and relevance
3. Structure your findings in a clear, logical format
4. Include only verifiable facts with proper citations
5. Create an engaging narrative that guides through complex topics";

pub const RESEARCH_EXPECTED_OUTPUT: &str = "\
A professional research report in markdown format:

# {Topic Title}

## Key Findings
{Major discoveries or developments with citations}

## Analysis
{Detailed analysis of the findings}

## Sources
{Numbered list of sources with relevant quotes}";

/// Characters of source text quoted into the prompt.
const SOURCE_EXCERPT_CHARS: usize = 800;

/// Web search used to ground research.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, AgentError>;
}

#[async_trait]
impl WebSearch for ExaClient {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, AgentError> {
        ExaClient::search(self, query, options).await
    }
}

/// Agent that searches before answering.
pub struct ResearchAgent {
    search: Arc<dyn WebSearch>,
    llm: AgentHandle,
    num_results: usize,
}

impl ResearchAgent {
    pub fn new(search: Arc<dyn WebSearch>, llm: AgentHandle) -> Self {
        Self {
            search,
            llm,
            num_results: SearchOptions::default().num_results,
        }
    }

    pub fn with_num_results(mut self, n: usize) -> Self {
        self.num_results = n;
        self
    }

    /// Search options for today's run.
    fn options(&self) -> SearchOptions {
        SearchOptions {
            num_results: self.num_results,
            search_type: "keyword".into(),
            start_published_date: Some(chrono::Utc::now().format("%Y-%m-%d").to_string()),
            ..SearchOptions::default()
        }
    }

    async fn grounded_prompt(&self, query: &str) -> Result<String, AgentError> {
        let results = self.search.search(query, &self.options()).await?;
        info!("Research search returned {} sources", results.len());
        Ok(build_prompt(query, &results))
    }
}

/// Research system prompt.
pub fn research_system_prompt() -> String {
    let instructions = format!(
        "{}\n\nExpected output:\n{}",
        RESEARCH_INSTRUCTIONS, RESEARCH_EXPECTED_OUTPUT
    );
    system_prompt(RESEARCH_DESCRIPTION, Some(&instructions), true)
}

/// User prompt with the query and numbered sources.
pub fn build_prompt(query: &str, results: &[SearchResult]) -> String {
    let mut prompt = format!("Research query: {}\n\n", query.trim());

    if results.is_empty() {
        prompt.push_str("No search results were found. Say so, and answer from general knowledge.");
        return prompt;
    }

    prompt.push_str("Search results:\n");
    for (i, result) in results.iter().enumerate() {
        let title = result.title.as_deref().unwrap_or("Untitled");
        prompt.push_str(&format!("\n[{}] {}\nURL: {}\n", i + 1, title, result.url));
        if let Some(date) = &result.published_date {
            prompt.push_str(&format!("Published: {}\n", date));
        }
        if let Some(author) = &result.author {
            prompt.push_str(&format!("Author: {}\n", author));
        }
        if let Some(text) = &result.text {
            let excerpt = truncate_chars(text.trim(), SOURCE_EXCERPT_CHARS);
            prompt.push_str(&format!("Excerpt: {}\n", excerpt));
        }
    }
    prompt.push_str("\nCite sources by their bracketed number.");
    prompt
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl Agent for ResearchAgent {
    fn model(&self) -> &str {
        self.llm.model()
    }

    async fn run(&self, prompt: &str) -> Result<AgentOutput, AgentError> {
        let grounded = self.grounded_prompt(prompt).await?;
        debug!("Running research prompt ({} chars)", grounded.len());
        self.llm.run(&grounded).await
    }

    async fn run_stream(&self, prompt: &str) -> Result<AgentStream, AgentError> {
        let grounded = self.grounded_prompt(prompt).await?;
        debug!("Streaming research prompt ({} chars)", grounded.len());
        self.llm.run_stream(&grounded).await
    }
}

/// Builds research agents over an OpenAI-compatible API and Exa.
pub struct ResearchAgentFactory {
    client: Client,
    base_url: String,
    api_key: String,
    search: Arc<dyn WebSearch>,
}

impl ResearchAgentFactory {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            search,
        }
    }
}

impl AgentFactory for ResearchAgentFactory {
    fn create(&self, model: &str) -> AgentHandle {
        let llm = OpenAiAgent::new(
            self.client.clone(),
            self.base_url.clone(),
            self.api_key.clone(),
            model,
        )
        .with_system_prompt(research_system_prompt());
        Arc::new(ResearchAgent::new(self.search.clone(), Arc::new(llm)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use agentgate_chat::testing::FakeAgent;
    use std::sync::Mutex;

    /// Search double returning canned results.
    pub struct FakeSearch {
        pub results: Result<Vec<SearchResult>, AgentError>,
        pub seen: Mutex<Vec<(String, SearchOptions)>>,
    }

    impl FakeSearch {
        pub fn with(results: Result<Vec<SearchResult>, AgentError>) -> Self {
            Self {
                results,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(
            &self,
            query: &str,
            options: &SearchOptions,
        ) -> Result<Vec<SearchResult>, AgentError> {
            self.seen
                .lock()
                .unwrap()
                .push((query.to_string(), options.clone()));
            self.results.clone()
        }
    }

    pub fn hit(title: &str, url: &str, text: &str) -> SearchResult {
        SearchResult {
            title: Some(title.into()),
            url: url.into(),
            published_date: Some("2026-10-17".into()),
            author: None,
            text: Some(text.into()),
        }
    }

    #[test]
    fn test_build_prompt_numbers_sources() {
        let prompt = build_prompt(
            " quantum computing ",
            &[
                hit("Qubits", "https://a.example", "Error rates fell."),
                SearchResult {
                    title: None,
                    url: "https://b.example".into(),
                    published_date: None,
                    author: Some("Ada".into()),
                    text: None,
                },
            ],
        );
        assert!(prompt.starts_with("Research query: quantum computing\n"));
        assert!(prompt.contains(
            "[1] Qubits\nURL: https://a.example\nPublished: 2026-10-17\nExcerpt: Error rates fell."
        ));
        assert!(prompt.contains("[2] Untitled\nURL: https://b.example\nAuthor: Ada\n"));
    }

    #[test]
    fn test_build_prompt_without_results() {
        let prompt = build_prompt("q", &[]);
        assert!(prompt.contains("No search results were found"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("hi", 5), "hi");
    }

    #[test]
    fn test_system_prompt_mentions_report_layout() {
        let prompt = research_system_prompt();
        assert!(prompt.starts_with(RESEARCH_DESCRIPTION));
        assert!(prompt.contains("## Key Findings"));
        assert!(prompt.ends_with("Use markdown to format your answers."));
    }

    #[tokio::test]
    async fn test_run_grounds_prompt_in_search() {
        let search = Arc::new(FakeSearch::with(Ok(vec![hit("T", "https://t", "body")])));
        let llm = Arc::new(FakeAgent::new("o3-mini"));
        let agent = ResearchAgent::new(search.clone(), llm.clone()).with_num_results(3);

        assert_eq!(agent.model(), "o3-mini");
        let output = agent.run("rust").await.unwrap();
        assert!(output.into_text().starts_with("echo: Research query: rust"));

        let seen = search.seen.lock().unwrap();
        assert_eq!(seen[0].0, "rust");
        assert_eq!(seen[0].1.num_results, 3);
        assert_eq!(seen[0].1.search_type, "keyword");
        assert_eq!(seen[0].1.start_published_date.as_ref().map(|d| d.len()), Some(10));
        assert!(llm.prompts()[0].contains("[1] T"));
    }

    #[tokio::test]
    async fn test_search_failure_is_agent_failure() {
        let search = Arc::new(FakeSearch::with(Err(AgentError::Search("quota".into()))));
        let llm = Arc::new(FakeAgent::new("o3-mini"));
        let agent = ResearchAgent::new(search, llm.clone());

        assert_eq!(agent.run("q").await.unwrap_err(), AgentError::Search("quota".into()));
        assert!(agent.run_stream("q").await.is_err());
        assert_eq!(llm.runs(), 0);
        assert_eq!(llm.stream_runs(), 0);
    }

    #[test]
    fn test_factory_binds_model() {
        let search = Arc::new(FakeSearch::with(Ok(Vec::new())));
        let factory = ResearchAgentFactory::new(Client::new(), "http://localhost/v1", "sk", search);
        assert_eq!(factory.create("o3-mini").model(), "o3-mini");
    }
}
