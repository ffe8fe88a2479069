use crate::error::QueryError;
use crate::index::ScoredChunk;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

/// Refusal contract baked into the prompt: with no supporting context the
/// model must answer with this phrase instead of fabricating content.
pub const REFUSAL_PHRASE: &str = "The answer is not available in the context";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROMPT_TEMPLATE: &str = "\
Answer the question as detailed as possible from the provided context.
If the answer is not in the provided context, just say \"The answer is not available in the context\", do not provide the wrong answer.

Context:
{context}

Question:
{question}

Answer:
";

pub fn render_prompt(chunks: &[ScoredChunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|scored| scored.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    PROMPT_TEMPLATE
        .replace("{context}", &context)
        .replace("{question}", question)
}

static GREETING_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Pure greetings get a conversational reply without touching the index.
pub fn is_greeting(question: &str) -> bool {
    let pattern = GREETING_PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(hi|hello|hey|howdy|greetings|good\s+(morning|afternoon|evening))\s*[!.,]*\s*$",
        )
        .expect("greeting pattern is valid")
    });
    pattern.is_match(question)
}

pub fn greeting_reply() -> String {
    "Hello! Upload and process some documents, then ask me anything about them.".to_string()
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError>;
}

/// Hosted Gemini chat completions over the `generateContent` endpoint,
/// retried through the shared policy.
pub struct GeminiChat {
    client: Arc<Client>,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl GeminiChat {
    pub fn new(
        client: Arc<Client>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            retry,
        }
    }

    /// Points the client at a different base URL, for mock servers.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, QueryError> {
        let response = self
            .client
            .post(self.generate_url())
            .json(&json!({
                "contents": [ { "parts": [ { "text": prompt } ] } ],
                "generationConfig": { "temperature": self.temperature },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(QueryError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| QueryError::Provider {
                status: status.as_u16(),
                detail: "response has no candidate text".to_string(),
            })
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError> {
        self.retry
            .run("chat completion", || self.generate_once(prompt))
            .await
    }
}
