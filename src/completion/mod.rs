//! Chat completion forwarding (OpenAI-compatible API)

use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::config::OpenAiSection;
use crate::{Error, Result};

pub mod sse;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Lazy sequence of completion fragments.
///
/// Single consumption; dropping it closes the provider response.
pub type TextStream = BoxStream<'static, Result<String>>;

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [OutboundMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: InboundMessage,
}

#[derive(Deserialize)]
struct InboundMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the inference provider's chat completions endpoint
pub struct CompletionClient {
    http: Client,
    chat_url: Url,
    default_model: String,
}

impl CompletionClient {
    pub fn new(api_key: &str, base_url: &str, default_model: impl Into<String>) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid openai base url: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path().trim_end_matches('/'));
            base_url.set_path(&path);
        }
        let chat_url = base_url
            .join(CHAT_COMPLETIONS_PATH)
            .map_err(|e| Error::config(format!("invalid openai base url: {}", e)))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| Error::config(format!("invalid openai api key: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::internal(format!("failed to build openai client: {}", e)))?;

        Ok(Self {
            http,
            chat_url,
            default_model: default_model.into(),
        })
    }

    /// Build a client when an API key is configured.
    pub fn from_config(config: &OpenAiSection) -> Result<Option<Self>> {
        match config.api_key.as_deref() {
            Some(api_key) => {
                Self::new(api_key, &config.base_url, config.default_model.clone()).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Send `prompt` as a single user message and return the first choice's text.
    pub async fn complete(&self, prompt: &str, model: &str) -> Result<String> {
        let response = self.send(prompt, model, false).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("invalid completion response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| Error::provider("completion response contained no choices"))
    }

    /// Streaming variant of [`complete`](Self::complete).
    ///
    /// The request is sent before returning, so a rejected request fails here
    /// rather than inside the stream.
    pub async fn complete_stream(&self, prompt: &str, model: &str) -> Result<TextStream> {
        let response = self.send(prompt, model, true).await?;
        Ok(sse::text_fragments(response.bytes_stream()).boxed())
    }

    async fn send(&self, prompt: &str, model: &str, stream: bool) -> Result<Response> {
        let payload = ChatCompletionRequest {
            model,
            messages: [OutboundMessage {
                role: "user",
                content: prompt,
            }],
            stream,
        };

        tracing::debug!(model, stream, "Forwarding completion request");

        let response = self
            .http
            .post(self.chat_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::provider(format!("openai request error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(format!(
                "openai returned status {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}
