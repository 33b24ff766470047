use crate::error::{AugmentError, Result};
use crate::prompt::{GenerationRequest, awards_request, plot_request};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const SYSTEM_PROMPT: &str = "You summarise movie franchise metadata. \
Only use the information supplied by the user and answer without commentary.";

/// Anything that can turn a prompt into text.
pub trait TextGenerator {
    fn generate(&self, request: &GenerationRequest) -> impl Future<Output = Result<String>> + Send;
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint, which is
/// what local GPT4All and Ollama servers expose.
pub struct ChatClient {
    client: Client,
    endpoint: Url,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, 60)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| AugmentError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let endpoint = base
            .join("v1/chat/completions")
            .map_err(|e| AugmentError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent("reelsort/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            model: "Meta-Llama-3-8B-Instruct.Q4_0.gguf".to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for ChatClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AugmentError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AugmentError::ParseError(e.to_string()))?;
        debug!(
            "Generator answered in {} ms",
            started.elapsed().as_millis()
        );

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AugmentError::EmptyResponse)
    }
}

/// Produces the optional augmented text fields of a franchise.
///
/// Any failure collapses to `None`; no text is made up locally.
pub struct Augmentor<G> {
    generator: G,
}

impl<G: TextGenerator> Augmentor<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub async fn franchise_plot(&self, plots: &[String]) -> Option<String> {
        let request = plot_request(plots)?;
        self.run(&request, "plot").await
    }

    pub async fn franchise_awards(&self, awards: &[String]) -> Option<String> {
        let request = awards_request(awards)?;
        self.run(&request, "awards").await
    }

    async fn run(&self, request: &GenerationRequest, field: &str) -> Option<String> {
        match self.generator.generate(request).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!("Generator returned nothing for {}", field);
                None
            }
            Err(e) => {
                warn!("Could not augment {}: {}", field, e);
                None
            }
        }
    }
}
