//! Gemini adapter for text generation, image description and embeddings.
//!
//! Talks to the Generative Language REST API directly over reqwest.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EmbeddingModel, GenerativeModel};
use crate::config::DEFAULT_MODEL_API_BASE;
use crate::domain::ImagePayload;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

/// Gemini REST client bound to one model
pub struct GeminiClient {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            api_key,
            model,
            DEFAULT_MODEL_API_BASE.to_string(),
        )
    }

    /// Share an existing HTTP client (connection pool)
    pub fn with_client(
        client: reqwest::Client,
        api_key: String,
        model: String,
        api_base: String,
    ) -> Self {
        Self {
            api_key,
            model,
            api_base,
            client,
        }
    }

    /// Build a model method URL; the key travels in a header, never here
    fn method_url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, method)
    }

    /// Attach the API key to a request
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(API_KEY_HEADER, self.api_key.as_str())
    }

    /// List the models this key can use (raw provider JSON)
    pub async fn list_models(&self) -> Result<Value> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("Failed to list Gemini models")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini model listing failed ({}): {}", status, text);
        }

        response
            .json()
            .await
            .context("Failed to parse Gemini model listing")
    }
}

/// Join every text part of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        anyhow::bail!("Gemini blocked the request: {}", reason);
    }

    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    Ok(parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join(""))
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, image: Option<&ImagePayload>) -> Result<String> {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        if let Some(image) = image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: image.data().to_string(),
                },
            });
        }

        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .authorized(self.client.post(self.method_url("generateContent")))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to call Gemini model '{}'", self.model))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini generateContent failed ({}): {}", status, text);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        extract_text(body)
    }
}

#[async_trait]
impl EmbeddingModel for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .authorized(self.client.post(self.method_url("embedContent")))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to call Gemini embedding model '{}'", self.model))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini embedContent failed ({}): {}", status, text);
        }

        let body: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse Gemini embedding response")?;

        Ok(body.embedding.values)
    }
}
