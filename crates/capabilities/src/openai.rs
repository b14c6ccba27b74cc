//! Clients for OpenAI-compatible `/embeddings` and `/chat/completions`
//! endpoints.
//!
//! [`OpenAiEmbedder`] implements [`Embedder`]; [`OpenAiChat`] implements
//! the three LLM-backed text capabilities. Neither retries on its own:
//! callers wrap each call in a [`RetryPolicy`](crate::retry::RetryPolicy).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use takeone_core::script::{parse_actions_json, ScriptAction};
use takeone_core::search::clean_expansion_lines;

use crate::embedder::{check_dimension, Embedder};
use crate::error::CapabilityError;
use crate::http::parse_response;
use crate::text::{Expander, ScriptParser, Translator};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_client(&self) -> Result<reqwest::Client, CapabilityError> {
        if self.api_key.trim().is_empty() {
            return Err(CapabilityError::Unavailable(
                "missing OpenAI API key".to_string(),
            ));
        }
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedder backed by the `/embeddings` endpoint.
///
/// The requested `dimensions` is sent with every request and each returned
/// vector is checked against it.
#[derive(Debug)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &OpenAiConfig, dimension: usize) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: config.build_client()?,
            endpoint: format!("{}/embeddings", config.base_url),
            api_key: config.api_key.clone(),
            model: config.embedding_model.clone(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| CapabilityError::Malformed("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimension,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let mut parsed: EmbeddingResponse = parse_response(response).await?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(CapabilityError::Malformed(format!(
                "{} embeddings returned for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        parsed
            .data
            .into_iter()
            .map(|entry| -> Result<Vec<f32>, CapabilityError> {
                check_dimension(&entry.embedding, self.dimension)?;
                Ok(entry.embedding)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

const TRANSLATE_PROMPT: &str = "You translate film scripts and footage search \
queries. Translate the user's text into the requested language. If it is already \
in that language, return it unchanged. Transliterate names where needed, keep line \
breaks and ordering, and reply with the translation only.";

const EXPAND_PROMPT: &str = "You help people search a library of video footage. \
Given a search query, write alternative phrasings that keep its meaning but use \
synonyms, related visual terms and different levels of detail. Reply with one \
phrasing per line and nothing else.";

const SCRIPT_PROMPT: &str = "You are a film production assistant. Break the \
user's script into the ordered visual actions an editor would need footage for. \
Each action must be one specific, visually searchable description. Reply with a \
JSON array only, for example: [{\"sequence\": 1, \"action\": \"person walking \
down a street\", \"description\": \"establishing shot\"}]";

/// Chat-completions client implementing [`Translator`], [`Expander`] and
/// [`ScriptParser`].
#[derive(Debug)]
pub struct OpenAiChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &OpenAiConfig) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: config.build_client()?,
            endpoint: format!("{}/chat/completions", config.base_url),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
        })
    }

    /// Send one system + user exchange and return the reply text.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CapabilityError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let parsed: ChatResponse = parse_response(response).await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CapabilityError::Malformed("empty chat completion".to_string()))
    }
}

#[async_trait]
impl Translator for OpenAiChat {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, CapabilityError> {
        let user = format!("Target language: {target_language}\n\n{text}");
        self.complete(TRANSLATE_PROMPT, &user, 0.2, 2048).await
    }
}

#[async_trait]
impl Expander for OpenAiChat {
    async fn expand(
        &self,
        query: &str,
        max_alternatives: usize,
    ) -> Result<Vec<String>, CapabilityError> {
        let user = format!("Write {max_alternatives} alternative phrasings for: {query}");
        let reply = self.complete(EXPAND_PROMPT, &user, 0.7, 500).await?;
        Ok(clean_expansion_lines(&reply))
    }
}

#[async_trait]
impl ScriptParser for OpenAiChat {
    async fn parse(&self, script: &str) -> Result<Vec<ScriptAction>, CapabilityError> {
        let reply = self.complete(SCRIPT_PROMPT, script, 0.3, 2048).await?;
        parse_actions_json(&reply).map_err(|e| CapabilityError::Malformed(e.to_string()))
    }
}
