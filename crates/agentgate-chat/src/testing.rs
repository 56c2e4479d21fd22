//! Fake agents and factories for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::agent::{Agent, AgentFactory, AgentHandle, AgentOutput, AgentStream};
use crate::error::AgentError;

/// Agent with scripted replies.
///
/// `run` pops from the reply queue and falls back to echoing the prompt
/// once it is empty. `run_stream` replays the stream script, or splits the
/// echo into words when no script was set.
pub struct FakeAgent {
    model: String,
    replies: Mutex<VecDeque<Result<AgentOutput, AgentError>>>,
    stream_script: Mutex<Option<Vec<Result<AgentOutput, AgentError>>>>,
    stream_start_error: Mutex<Option<AgentError>>,
    runs: AtomicUsize,
    stream_runs: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeAgent {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            replies: Mutex::new(VecDeque::new()),
            stream_script: Mutex::new(None),
            stream_start_error: Mutex::new(None),
            runs: AtomicUsize::new(0),
            stream_runs: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply for the next `run`.
    pub fn push_reply(&self, reply: Result<AgentOutput, AgentError>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Queue `n` failures with messages `failure 1..=n`.
    pub fn fail_times(&self, n: usize) -> &Self {
        for i in 1..=n {
            self.push_reply(Err(AgentError::Other(format!("failure {}", i))));
        }
        self
    }

    pub fn set_stream(&self, items: Vec<Result<AgentOutput, AgentError>>) -> &Self {
        *self.stream_script.lock().unwrap() = Some(items);
        self
    }

    pub fn fail_stream_start(&self, error: AgentError) -> &Self {
        *self.stream_start_error.lock().unwrap() = Some(error);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn stream_runs(&self) -> usize {
        self.stream_runs.load(Ordering::SeqCst)
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn echo(&self, prompt: &str) -> String {
        format!("echo: {}", prompt)
    }
}

#[async_trait]
impl Agent for FakeAgent {
    fn model(&self) -> &str {
        &self.model
    }

    async fn run(&self, prompt: &str) -> Result<AgentOutput, AgentError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(AgentOutput::Text(self.echo(prompt))))
    }

    async fn run_stream(&self, prompt: &str) -> Result<AgentStream, AgentError> {
        self.stream_runs.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(e) = self.stream_start_error.lock().unwrap().clone() {
            return Err(e);
        }
        let items = match self.stream_script.lock().unwrap().clone() {
            Some(items) => items,
            None => self
                .echo(prompt)
                .split_inclusive(' ')
                .map(|w| Ok(AgentOutput::Delta { delta: w.to_string() }))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Factory that counts how many agents it built.
pub struct CountingFactory {
    created: AtomicUsize,
    build: Box<dyn Fn(&str) -> AgentHandle + Send + Sync>,
}

impl CountingFactory {
    pub fn new(build: impl Fn(&str) -> AgentHandle + Send + Sync + 'static) -> Self {
        Self {
            created: AtomicUsize::new(0),
            build: Box::new(build),
        }
    }

    /// Builds echoing [`FakeAgent`]s.
    pub fn echo() -> Self {
        Self::new(|model: &str| -> AgentHandle { Arc::new(FakeAgent::new(model)) })
    }

    /// Always hands out the given agent.
    pub fn fixed(agent: Arc<FakeAgent>) -> Self {
        Self::new(move |_: &str| -> AgentHandle { agent.clone() })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl AgentFactory for CountingFactory {
    fn create(&self, model: &str) -> AgentHandle {
        self.created.fetch_add(1, Ordering::SeqCst);
        // Widen the race window for concurrent first-use tests.
        std::thread::sleep(std::time::Duration::from_millis(5));
        (self.build)(model)
    }
}
