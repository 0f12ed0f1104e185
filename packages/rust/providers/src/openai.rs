//! OpenAI-compatible chat-completions adapter.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use waterauditor_shared::{
    AuditError, OpenAiConfig, ReasoningRequest, ReasoningService, Result, SampleImage, Stage,
};

use crate::{build_client, status_error, transport_error};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Reasoning service backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiReasoning {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    vision_model: String,
    composer_model: String,
    timeout_secs: u64,
}

impl OpenAiReasoning {
    /// Create an adapter from config and a resolved API key.
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            composer_model: config.composer_model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Model used for a stage.
    fn model_for(&self, stage: Stage) -> &str {
        match stage {
            Stage::VisualAnalysis => &self.vision_model,
            Stage::ReportComposition => &self.composer_model,
            Stage::RiskMapping | Stage::ResourceResearch => &self.model,
        }
    }
}

impl ReasoningService for OpenAiReasoning {
    #[instrument(skip_all, fields(stage = request.stage.as_str()))]
    async fn complete(&self, request: &ReasoningRequest<'_>) -> Result<String> {
        let image_url = request.image.map(data_url);
        let body = build_request(self.model_for(request.stage), request, image_url);

        debug!(
            model = body.model,
            prompt_len = request.prompt.len(),
            has_image = request.image.is_some(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.endpoint, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(status_error(&self.endpoint, response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AuditError::Provider(format!("{}: invalid response body: {e}", self.endpoint))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                AuditError::Provider(format!("{}: response contained no content", self.endpoint))
            })?;

        debug!(len = text.len(), "chat completion received");
        Ok(text)
    }
}

/// Build the chat request: system instructions, then the user prompt with
/// an optional image part.
fn build_request<'a>(
    model: &'a str,
    request: &'a ReasoningRequest<'_>,
    image_url: Option<String>,
) -> ChatRequest<'a> {
    let user_content = match image_url {
        Some(url) => MessageContent::Parts(vec![
            ContentPart::Text {
                text: &request.prompt,
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url },
            },
        ]),
        None => MessageContent::Text(&request.prompt),
    };

    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(request.instructions),
            },
            ChatMessage {
                role: "user",
                content: user_content,
            },
        ],
        response_format: ResponseFormat {
            kind: "json_object",
        },
    }
}

/// Encode an image as a base64 `data:` URL.
fn data_url(image: &SampleImage) -> String {
    format!(
        "data:{};base64,{}",
        image.kind().mime_type(),
        STANDARD.encode(image.bytes())
    )
}
