// Image API client (OpenAI-compatible /images/generations)

use crate::size::size_for;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use studio_core::domain::{Artifact, GenerationParams};
use studio_core::port::{GenerationError, GenerationService};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-image-1";

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Upper bound for the `count` parameter
const MAX_IMAGES_PER_REQUEST: u64 = 4;

/// Connection settings for the image endpoint
#[derive(Debug, Clone)]
pub struct ImageApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Canned instructions prepended to every user prompt
    pub style_prefix: Option<String>,
}

impl Default for ImageApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            style_prefix: None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u64,
    size: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ImageResponse {
    fn into_artifacts(self) -> Vec<Artifact> {
        self.data
            .into_iter()
            .filter_map(|image| match (image.url, image.b64_json) {
                (Some(url), _) => Some(Artifact::new(url)),
                (None, Some(b64)) => Some(
                    Artifact::new(format!("data:image/png;base64,{}", b64))
                        .with_mime_type("image/png"),
                ),
                (None, None) => None,
            })
            .collect()
    }
}

// Pull the provider's message out of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn map_status(status: u16, body: &str) -> GenerationError {
    let message = error_message(body);
    match status {
        400 => GenerationError::Rejected(message),
        401 | 403 => GenerationError::Unauthorized(message),
        429 => GenerationError::RateLimited(message),
        _ => GenerationError::Request(format!("status {}: {}", status, message)),
    }
}

fn map_http_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Request(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        GenerationError::Request(format!("Connection error: {}", error))
    } else {
        GenerationError::Request(format!("HTTP error: {}", error))
    }
}

/// Image generation client
pub struct ImageApiClient {
    client: Client,
    config: ImageApiConfig,
}

impl ImageApiClient {
    pub fn new(config: ImageApiConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/images/generations",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(&self, prompt: &str, params: &GenerationParams) -> ImageRequest {
        let prompt = match &self.config.style_prefix {
            Some(prefix) if !prefix.trim().is_empty() => format!("{}\n\n{}", prefix.trim(), prompt),
            _ => prompt.to_string(),
        };

        let n = params
            .as_value()
            .get("count")
            .and_then(|v| v.as_u64())
            .unwrap_or(1)
            .clamp(1, MAX_IMAGES_PER_REQUEST);

        // gpt-image models always answer with base64 and reject the field
        let response_format = self
            .config
            .model
            .starts_with("dall-e")
            .then_some("b64_json");

        ImageRequest {
            model: self.config.model.clone(),
            prompt,
            n,
            size: size_for(&self.config.model, params.get_str("aspect_ratio")),
            response_format,
        }
    }
}

#[async_trait]
impl GenerationService for ImageApiClient {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Vec<Artifact>, GenerationError> {
        let request = self.build_request(prompt, params);
        let url = self.endpoint();

        debug!(
            url = %url,
            model = %request.model,
            size = %request.size,
            n = request.n,
            "Sending image generation request"
        );

        let mut builder = self.client.post(&url).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }
        let response = builder.send().await.map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status.as_u16(), &body));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(parsed.into_artifacts())
    }
}
