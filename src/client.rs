use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::capability::{Analyzer, IdeaSource, ImageFetcher, ImageGenerator};
use crate::config::{clamp_idea_count, GeminiConfig};
use crate::error::{AnalysisError, ExplorationError, FetchError, GenerationError};
use crate::types::{EncodedImage, FetchedImage, Idea};
use crate::{parser, prompt};

/// Async client for the Gemini `generateContent` REST API.
///
/// One client serves all three capabilities (analysis, idea exploration and
/// image generation) and doubles as the fetch transport for remote images.
/// None of the calls retry; failures propagate immediately.
///
/// # Example
/// ```no_run
/// use latent_explorer::{codec, Analyzer, GeminiClient, GeminiConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GeminiClient::new(GeminiConfig::new("my-api-key"));
/// let image = codec::encode(&std::fs::read("photo.png")?, "image/png")?;
/// let analysis = client.analyze(&image).await?;
/// println!("{}", analysis);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

/// Transport-level failure shared by all three capabilities.
#[derive(Debug)]
enum CallError {
    Unreachable { endpoint: String, message: String },
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value, CallError> {
        let url = self.url(model);
        debug!(model, "sending generateContent request");

        let resp = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Unreachable {
                endpoint: self.config.endpoint.clone(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(CallError::Api { status, body: text });
        }

        resp.json()
            .await
            .map_err(|e| CallError::InvalidResponse(e.to_string()))
    }
}

fn image_part(image: &EncodedImage) -> Value {
    json!({"inlineData": {"mimeType": image.mime_type, "data": image.data}})
}

fn ideas_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "description": {"type": "STRING"},
                "suggestedPrompt": {"type": "STRING"}
            },
            "required": ["description", "suggestedPrompt"],
            "propertyOrdering": ["description", "suggestedPrompt"]
        }
    })
}

impl Analyzer for GeminiClient {
    async fn analyze(&self, image: &EncodedImage) -> Result<String, AnalysisError> {
        let body = json!({
            "contents": [{
                "parts": [{"text": prompt::analysis_directive()}, image_part(image)]
            }]
        });
        let resp = self
            .generate_content(&self.config.analysis_model, &body)
            .await?;
        parser::analysis_from_response(&resp)
    }
}

impl IdeaSource for GeminiClient {
    async fn explore(&self, image: &EncodedImage, count: usize) -> Result<Vec<Idea>, ExplorationError> {
        let count = clamp_idea_count(count);
        let body = json!({
            "contents": [{
                "parts": [{"text": prompt::exploration_directive(count)}, image_part(image)]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": ideas_schema(),
            }
        });
        let resp = self.generate_content(&self.config.idea_model, &body).await?;
        parser::ideas_from_response(&resp, count)
    }
}

impl ImageGenerator for GeminiClient {
    async fn generate(
        &self,
        source: Option<&EncodedImage>,
        prompt: &str,
    ) -> Result<EncodedImage, GenerationError> {
        let mut parts = Vec::new();
        if let Some(image) = source {
            parts.push(image_part(image));
        }
        parts.push(json!({"text": prompt}));

        let body = json!({
            "contents": [{"parts": parts}],
            "generationConfig": {"responseModalities": ["IMAGE"]}
        });
        let resp = self.generate_content(&self.config.image_model, &body).await?;
        parser::image_from_response(&resp)
    }
}

impl ImageFetcher for GeminiClient {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.http.fetch(url).await
    }
}

impl From<CallError> for AnalysisError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Unreachable { endpoint, message } => {
                AnalysisError::Unreachable { endpoint, message }
            }
            CallError::Api { status, body } => AnalysisError::Api { status, body },
            CallError::InvalidResponse(msg) => AnalysisError::InvalidResponse(msg),
        }
    }
}

impl From<CallError> for ExplorationError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Unreachable { endpoint, message } => {
                ExplorationError::Unreachable { endpoint, message }
            }
            CallError::Api { status, body } => ExplorationError::Api { status, body },
            CallError::InvalidResponse(msg) => ExplorationError::InvalidResponse(msg),
        }
    }
}

impl From<CallError> for GenerationError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Unreachable { endpoint, message } => {
                GenerationError::Unreachable { endpoint, message }
            }
            CallError::Api { status, body } => GenerationError::Api { status, body },
            CallError::InvalidResponse(msg) => GenerationError::InvalidResponse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_per_model() {
        let client = GeminiClient::new(GeminiConfig::new("k").endpoint("http://localhost:9000/"));
        assert_eq!(
            client.url("gemini-2.5-flash-image"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn image_part_shape() {
        let part = image_part(&EncodedImage::new("image/webp", "UklGRg=="));
        assert_eq!(part["inlineData"]["mimeType"], "image/webp");
        assert_eq!(part["inlineData"]["data"], "UklGRg==");
    }

    #[test]
    fn ideas_schema_requires_both_fields() {
        let schema = ideas_schema();
        assert_eq!(schema["type"], "ARRAY");
        let required: Vec<&str> = schema
            .pointer("/items/required")
            .and_then(|v| v.as_array())
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["description", "suggestedPrompt"]);
    }

    #[test]
    fn call_errors_keep_their_class() {
        let err: GenerationError = CallError::Api {
            status: 429,
            body: "quota".into(),
        }
        .into();
        assert_eq!(
            err,
            GenerationError::Api {
                status: 429,
                body: "quota".into()
            }
        );

        let err: ExplorationError = CallError::Unreachable {
            endpoint: "http://x".into(),
            message: "refused".into(),
        }
        .into();
        assert!(matches!(err, ExplorationError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_reported_as_such() {
        let client = GeminiClient::new(
            GeminiConfig::new("k")
                .endpoint("http://127.0.0.1:9")
                .timeout(std::time::Duration::from_secs(2)),
        );
        let image = EncodedImage::new("image/png", "AAAA");
        let err = client.analyze(&image).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Unreachable { .. }), "{err:?}");
    }
}
