//! An OpenAI-compatible HTTP provider (`spec.md` §9's "external oracle").
//!
//! Talks to any server implementing the `/chat/completions` and
//! `/embeddings` endpoints of the OpenAI API — this covers OpenAI itself as
//! well as the many self-hosted runners (Ollama, vLLM, LM Studio, ...) that
//! mirror the same wire shape. No other component ever sees these request/
//! response structs; they stay private to this module.

use crate::{ChatMessage, LlmError, LlmProvider, LlmResult, ProviderMetadata, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Connection details for one OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    /// `None` disables `embed()`, returning `ProviderUnavailable`.
    pub embedding_model: Option<String>,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, chat_model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            embedding_model: Some("text-embedding-3-small".to_string()),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// `LlmProvider` backed by an OpenAI-compatible HTTP endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
    cancelled: Arc<AtomicBool>,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client construction with static config cannot fail");
        Self { client, config, cancelled: Arc::new(AtomicBool::new(false)) }
    }

    fn check_cancelled(&self) -> LlmResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(LlmError::Cancelled);
        }
        Ok(())
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> LlmResult<String> {
        self.check_cancelled()?;

        let wire_messages =
            messages.iter().map(|m| WireMessage { role: wire_role(m.role), content: &m.content }).collect();

        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: wire_messages,
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let response = raise_for_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("malformed chat response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("chat response had no choices".to_string()))
    }
}

async fn raise_for_status(response: reqwest::Response) -> LlmResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    if status.as_u16() == 401 || status.as_u16() == 403 {
        Err(LlmError::Authentication(message))
    } else if status.as_u16() == 429 {
        Err(LlmError::RateLimited(message))
    } else if status.as_u16() >= 500 {
        Err(LlmError::ProviderUnavailable(message))
    } else {
        Err(LlmError::InvalidResponse(message))
    }
}

fn classify_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else if err.is_connect() {
        LlmError::ProviderUnavailable(err.to_string())
    } else {
        LlmError::Other(err.to_string())
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_sql(&self, prompt: &str) -> LlmResult<crate::SqlGeneration> {
        let messages = [
            ChatMessage::system(
                "You translate natural-language questions into a single SQL statement. \
                 Respond with a JSON object {\"sql\": \"...\", \"rationale\": \"...\"} and \
                 nothing else.",
            ),
            ChatMessage::user(prompt),
        ];

        let content = self.chat(&messages, true).await?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| LlmError::InvalidResponse(format!("non-JSON sql generation: {e}")))?;

        let sql = value
            .get("sql")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LlmError::InvalidResponse("response missing `sql` field".to_string()))?
            .to_string();
        let rationale = value.get("rationale").and_then(|v| v.as_str()).unwrap_or_default().to_string();

        Ok(crate::SqlGeneration { sql, rationale })
    }

    async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        schema_hint: &str,
    ) -> LlmResult<serde_json::Value> {
        let mut with_hint = Vec::with_capacity(messages.len() + 1);
        with_hint.extend_from_slice(messages);
        with_hint.push(ChatMessage::system(format!(
            "Respond with JSON only, matching this shape:\n{schema_hint}"
        )));

        let content = self.chat(&with_hint, true).await?;
        serde_json::from_str(&content)
            .map_err(|e| LlmError::InvalidResponse(format!("malformed structured response: {e}")))
    }

    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        let Some(model) = self.config.embedding_model.as_deref() else {
            return Err(LlmError::ProviderUnavailable("no embedding model configured".to_string()));
        };

        self.check_cancelled()?;

        let request = EmbeddingRequest { model, input: text };
        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let response = raise_for_status(response).await?;
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("malformed embedding response: {e}")))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("embedding response had no data".to_string()))
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("openai-compatible", self.config.chat_model.clone())
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}
