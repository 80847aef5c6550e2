use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::error::{Error, Result};

pub mod gemini;
pub mod openai;

pub use gemini::Gemini;
pub use openai::OpenAi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Ask the backend to answer with a single JSON object.
    pub json_output: bool,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Return the assistant's reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    fn name(&self) -> &str;
}

/// Ordered list of backends. The first request walks the list until one
/// answers; that backend is then used for every later request.
pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmProvider>>,
    selected: OnceLock<usize>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::Config("no language-model backend configured".into()));
        }
        Ok(Self {
            providers,
            selected: OnceLock::new(),
        })
    }

    /// Gemini first, OpenAI as fallback, skipping any without a key.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
        if let Some(key) = &config.gemini_api_key {
            providers.push(Arc::new(Gemini::new(key.clone(), config.gemini_model.clone())?));
        }
        if let Some(key) = &config.openai_api_key {
            providers.push(Arc::new(OpenAi::new(key.clone(), config.openai_model.clone())?));
        }
        Self::new(providers)
    }

    /// Name of the backend in use, once one has been chosen.
    pub fn selected(&self) -> Option<&str> {
        self.selected.get().map(|&idx| self.providers[idx].name())
    }
}

#[async_trait]
impl LlmProvider for ProviderChain {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Some(&idx) = self.selected.get() {
            return self.providers[idx].complete(request).await;
        }

        let mut last_error = None;
        for (idx, provider) in self.providers.iter().enumerate() {
            match provider.complete(request).await {
                Ok(reply) => {
                    if self.selected.set(idx).is_ok() {
                        tracing::info!(provider = provider.name(), "using language-model backend");
                    }
                    return Ok(reply);
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), "backend failed, trying next: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::BackendsExhausted(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    fn name(&self) -> &str {
        self.selected().unwrap_or("chain")
    }
}
