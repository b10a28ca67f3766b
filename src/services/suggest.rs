use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Descriptions shorter than this are rejected before reaching the model
pub const MIN_PROMPT_LEN: usize = 10;

const SYSTEM_PROMPT: &str = "You suggest movies. Reply with the title of the single movie \
that best matches the user's description and nothing else.";

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    pub movie_title: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieSuggester: Send + Sync {
    /// Returns one movie title matching a free-text description
    async fn suggest(&self, prompt: &str) -> AppResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Any OpenAI-compatible chat completion server
pub struct ChatCompletionSuggester {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionSuggester {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> AppResult<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

#[async_trait::async_trait]
impl MovieSuggester for ChatCompletionSuggester {
    async fn suggest(&self, prompt: &str) -> AppResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Chat completion returned status {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|title| title.trim().trim_matches('"').to_string())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| AppError::ExternalApi("Chat completion returned no title".to_string()))
    }
}

/// Used when no completion server is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSuggester;

#[async_trait::async_trait]
impl MovieSuggester for DisabledSuggester {
    async fn suggest(&self, _prompt: &str) -> AppResult<String> {
        Err(AppError::ExternalApi(
            "No movie suggester is configured".to_string(),
        ))
    }
}

/// Validates the description and asks the suggester for a title
pub async fn suggest_movie(
    suggester: Arc<dyn MovieSuggester>,
    prompt: &str,
) -> AppResult<SuggestResponse> {
    let prompt = prompt.trim();
    if prompt.chars().count() < MIN_PROMPT_LEN {
        return Err(AppError::InvalidInput(
            "Please provide a more detailed description.".to_string(),
        ));
    }

    match suggester.suggest(prompt).await {
        Ok(movie_title) => Ok(SuggestResponse { movie_title }),
        Err(e) => {
            tracing::error!(error = %e, "Movie suggestion failed");
            Err(AppError::ExternalApi(
                "AI failed to suggest a movie. Please try again.".to_string(),
            ))
        }
    }
}
