use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, LlmProvider, Role};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER: &str = "gemini";

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct Gemini {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn build_request(request: &CompletionRequest) -> GenerateRequest {
    let system: Vec<Part> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| Part {
            text: m.content.clone(),
        })
        .collect();

    let contents = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: Some(if m.role == Role::Assistant { "model" } else { "user" }.to_string()),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    GenerateRequest {
        system_instruction: (!system.is_empty()).then_some(Content {
            role: None,
            parts: system,
        }),
        contents,
        generation_config: GenerationConfig {
            response_mime_type: request.json_output.then_some("application/json"),
            temperature: request.temperature,
        },
    }
}

#[async_trait]
impl LlmProvider for Gemini {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let backend = |message: String| Error::Backend {
            provider: PROVIDER.into(),
            message,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(request))
            .send()
            .await
            .map_err(|e| backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend(format!("{status}: {body}")));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| backend(e.to_string()))?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(backend("empty response".into()));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
